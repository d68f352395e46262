//! Submits local PDFs for ingestion: for each file, uploads the PDF to the
//! configured PDF bucket under its bare file name, builds a [`Task`] in
//! `PENDING` state, and publishes it to the task queue. This is the
//! producer side of the queue, which the rest of this workspace only
//! describes from the consumer's point of view.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};

use docprep_core::{Document, IngestError, Task};
use docprep_queue::{BrokerConnection, TaskPublisher};
use docprep_storage::ObjectStore;

/// Default `docType` stamped on a producer-built document. The producer has
/// no way to know a document's real type, so `"paper"` is used as the
/// baseline case.
pub const DEFAULT_DOC_TYPE: &str = "paper";

/// Per-submission overrides. All fields default to the system-wide default
/// (task type `"default"`, destination collection chosen by the consumer)
/// when left `None`.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    pub task_type: Option<String>,
    pub destination_collection: Option<String>,
}

fn file_name_of(path: &Path) -> Result<String, IngestError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| IngestError::MalformedEnvelope(format!("not a file path: {}", path.display())))
}

fn title_from_file_name(file_name: &str) -> String {
    match file_name.rfind('.') {
        Some(idx) => file_name[..idx].to_string(),
        None => file_name.to_string(),
    }
}

fn build_document(file_name: String) -> Document {
    let title = title_from_file_name(&file_name);
    Document {
        title,
        authors: Vec::new(),
        keywords: Vec::new(),
        file_name,
        doc_type: DEFAULT_DOC_TYPE.to_string(),
        bucket: None,
        publication_date: None,
        language: None,
    }
}

/// Uploads `path` to `pdf_bucket` under its bare file name, builds a
/// `PENDING` task for it, and publishes that task to the queue. Returns the
/// published task.
pub async fn submit_file(
    storage: &dyn ObjectStore,
    connection: &BrokerConnection,
    pdf_bucket: &str,
    path: &Path,
    options: SubmitOptions,
) -> Result<Task, IngestError> {
    let file_name = file_name_of(path)?;
    let document = build_document(file_name);

    storage.upload(path, &document.file_name, Some(pdf_bucket)).await?;

    let mut task = Task::new(document, Utc::now());
    if let Some(task_type) = options.task_type {
        task.task_type = task_type;
    }
    task.destination_collection = options.destination_collection;

    TaskPublisher::new(connection).publish(&task).await?;
    info!(task_id = %task.task_id, file_name = %task.document.file_name, "submitted task");
    Ok(task)
}

/// Submits every `.pdf` file directly inside `dir` (no recursion), in
/// directory-listing order. One file's failure does not stop the rest;
/// each entry's outcome is reported independently.
pub async fn submit_directory(
    storage: &dyn ObjectStore,
    connection: &BrokerConnection,
    pdf_bucket: &str,
    dir: &Path,
    options: SubmitOptions,
) -> Result<Vec<(PathBuf, Result<Task, IngestError>)>, IngestError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| IngestError::StorageUnavailable(e.to_string()))?;

    let mut results = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| IngestError::StorageUnavailable(e.to_string()))?
    {
        let path = entry.path();
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            continue;
        }

        let outcome = submit_file(storage, connection, pdf_bucket, &path, options.clone()).await;
        if let Err(e) = &outcome {
            warn!(path = %path.display(), error = %e, "failed to submit document");
        }
        results.push((path, outcome));
    }
    Ok(results)
}
