//! Document parsing: turns a downloaded PDF into `[PAGE][n][PAGE]`-annotated text.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use docprep_core::IngestError;
use docprep_storage::ObjectStore;

/// Converts a PDF on disk into page-annotated text. Implementations may
/// consult `storage` (e.g. to fetch auxiliary layout models); the reference
/// implementation treats parsing itself as an opaque, swappable unit — OCR,
/// layout detection and similar internals are not this crate's concern.
///
/// As a side effect, `parse` uploads the produced text to `{stem}/text.txt`
/// in the preprocessed bucket (and, in a full layout/OCR backend, the
/// figure/table/formula artifacts alongside it), so a later task for the
/// same document can take the cache-skip path instead of re-parsing.
#[async_trait]
pub trait Parser: Send + Sync {
    async fn parse(&self, pdf_path: &Path, stem: &str) -> Result<String, IngestError>;

    /// Replaces the storage backend this parser consults, if any.
    fn set_storage(&self, storage: Arc<dyn ObjectStore>);
}

/// Parser stand-in used until a real layout/OCR backend is wired in. Reads
/// the PDF bytes and emits a single page marker wrapping a UTF-8-lossy
/// decode, so the rest of the pipeline (chunking, page extraction) behaves
/// identically to a real parser's output shape.
pub struct PlaceholderParser {
    storage: parking_lot::RwLock<Option<Arc<dyn ObjectStore>>>,
}

impl PlaceholderParser {
    #[must_use]
    pub fn new(storage: Option<Arc<dyn ObjectStore>>) -> Self {
        Self {
            storage: parking_lot::RwLock::new(storage),
        }
    }
}

#[async_trait]
impl Parser for PlaceholderParser {
    async fn parse(&self, pdf_path: &Path, stem: &str) -> Result<String, IngestError> {
        let bytes = tokio::fs::read(pdf_path)
            .await
            .map_err(|e| IngestError::StorageUnavailable(e.to_string()))?;
        if bytes.is_empty() {
            return Err(IngestError::ParseEmpty);
        }
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let text = format!("{text}[PAGE][1][PAGE]");

        if let Some(storage) = self.storage.read().clone() {
            let scratch_dir = pdf_path.parent().unwrap_or_else(|| Path::new("."));
            let local_text = scratch_dir.join("text.txt");
            tokio::fs::write(&local_text, &text)
                .await
                .map_err(|e| IngestError::StorageUnavailable(e.to_string()))?;
            storage
                .upload(&local_text, &format!("{stem}/text.txt"), None)
                .await?;
        }

        Ok(text)
    }

    fn set_storage(&self, storage: Arc<dyn ObjectStore>) {
        *self.storage.write() = Some(storage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docprep_storage::{BucketPolicy, LocalStorage};
    use tempfile::tempdir;

    #[tokio::test]
    async fn empty_file_yields_parse_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.pdf");
        tokio::fs::write(&path, b"").await.unwrap();
        let parser = PlaceholderParser::new(None);
        let err = parser.parse(&path, "empty").await.unwrap_err();
        assert!(matches!(err, IngestError::ParseEmpty));
    }

    #[tokio::test]
    async fn non_empty_file_yields_page_marked_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        tokio::fs::write(&path, b"hello").await.unwrap();
        let parser = PlaceholderParser::new(None);
        let text = parser.parse(&path, "doc").await.unwrap();
        assert!(text.contains("[PAGE][1][PAGE]"));
    }

    #[tokio::test]
    async fn without_storage_no_upload_is_attempted_and_parse_still_succeeds() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        tokio::fs::write(&path, b"hello").await.unwrap();
        let parser = PlaceholderParser::new(None);
        assert!(parser.parse(&path, "doc").await.is_ok());
    }

    #[tokio::test]
    async fn parsing_uploads_the_produced_text_to_stem_text_txt_in_the_preprocessed_bucket() {
        let store_dir = tempdir().unwrap();
        let storage: Arc<dyn ObjectStore> = Arc::new(LocalStorage::new(
            store_dir.path(),
            BucketPolicy::new("pdfs", "prep"),
        ));

        let scratch_dir = tempdir().unwrap();
        let path = scratch_dir.path().join("a.pdf");
        tokio::fs::write(&path, b"hello").await.unwrap();

        let parser = PlaceholderParser::new(Some(storage.clone()));
        let text = parser.parse(&path, "papers/a").await.unwrap();

        assert!(storage.exists("papers/a/text.txt", None).await.unwrap());
        let uploaded = store_dir.path().join("prep/papers/a/text.txt");
        let uploaded_text = tokio::fs::read_to_string(&uploaded).await.unwrap();
        assert_eq!(uploaded_text, text);
    }
}
