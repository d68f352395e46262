//! The pipeline trait and its default PDF implementation.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use docprep_core::{Document, IngestError, PipelineRow};
use docprep_models::ModelLoader;
use docprep_storage::{ObjectStore, VectorStore};

/// A chunk/embedding pair produced by [`Pipeline::process`].
pub type ProcessOutput = (Vec<String>, Vec<Vec<f32>>);

/// Transforms a document into chunks and embeddings, then stores them.
/// Implementations combine a parser, a chunker and an embedder (from the
/// shared [`ModelLoader`]) however they see fit; [`Pipeline::store_embedding`]
/// has a default that writes rows to the vector store, which most pipelines
/// should not need to override.
#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn process(&self, doc: &Document) -> Result<ProcessOutput, IngestError>;

    /// This pipeline's preferred destination collection, if it has one.
    /// The worker resolves the collection a task is stored into as
    /// `task.destination_collection`, else this, else the consumer's
    /// configured default; most pipelines have no opinion and keep the
    /// default `None`.
    fn destination_collection(&self) -> Option<&str> {
        None
    }

    async fn store_embedding(
        &self,
        doc: &Document,
        chunks: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        vector_store: &(dyn VectorStore),
        collection_name: &str,
        partition_name: &str,
    ) -> Result<(), IngestError> {
        if chunks.is_empty() {
            return Ok(());
        }
        let metadata = doc.to_metadata();
        let rows: Vec<PipelineRow> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| PipelineRow {
                embedding,
                chunk,
                metadata: metadata.clone(),
                page: 1,
            })
            .collect();

        vector_store.ensure_collection(collection_name).await?;
        vector_store
            .ensure_partition(collection_name, partition_name)
            .await?;
        vector_store.insert(collection_name, partition_name, rows).await
    }
}

fn temp_dir_for(stem: &str) -> PathBuf {
    std::env::temp_dir().join(format!("docprep_{stem}"))
}

/// The default pipeline: reuses previously parsed text if present in the
/// preprocessed bucket, otherwise downloads the PDF and runs the full
/// parse → chunk → embed path. The scratch directory is removed on every
/// exit path, success or failure.
pub struct DefaultPdfPipeline {
    model_loader: Arc<ModelLoader>,
    object_store: Arc<dyn ObjectStore>,
    destination_collection: Option<String>,
}

impl DefaultPdfPipeline {
    #[must_use]
    pub fn new(
        model_loader: Arc<ModelLoader>,
        object_store: Arc<dyn ObjectStore>,
        destination_collection: Option<String>,
    ) -> Self {
        Self {
            model_loader,
            object_store,
            destination_collection,
        }
    }

    async fn process_cached_text(&self, temp_dir: &PathBuf, object_name: &str) -> Result<ProcessOutput, IngestError> {
        let local_text = temp_dir.join("text.txt");
        self.object_store
            .download(object_name, &local_text, None)
            .await?;
        let text = tokio::fs::read_to_string(&local_text)
            .await
            .map_err(|e| IngestError::StorageUnavailable(e.to_string()))?;

        let chunker = self.model_loader.get_chunker(docprep_models::STRATEGY_SEMANTIC_API);
        let embedder = self.model_loader.embedder();
        let chunks = chunker.chunk(&text).await?;
        let embeddings = embedder.generate_embeddings(&chunks).await?;
        Ok((chunks, embeddings))
    }

    async fn process_from_pdf(
        &self,
        temp_dir: &PathBuf,
        doc: &Document,
    ) -> Result<ProcessOutput, IngestError> {
        let local_name = doc
            .file_name
            .rsplit('/')
            .next()
            .unwrap_or(&doc.file_name)
            .to_string();
        let local_pdf = temp_dir.join(&local_name);
        self.object_store
            .download(&doc.file_name, &local_pdf, doc.bucket.as_deref())
            .await?;

        let parser = self.model_loader.get_parser(Some(self.object_store.clone()));
        let chunker = self.model_loader.get_chunker(docprep_models::STRATEGY_SEMANTIC_API);
        let embedder = self.model_loader.embedder();

        let text = parser.parse(&local_pdf, doc.stem()).await?;
        let chunks = chunker.chunk(&text).await?;
        let embeddings = embedder.generate_embeddings(&chunks).await?;
        Ok((chunks, embeddings))
    }
}

#[async_trait]
impl Pipeline for DefaultPdfPipeline {
    fn destination_collection(&self) -> Option<&str> {
        self.destination_collection.as_deref()
    }

    async fn process(&self, doc: &Document) -> Result<ProcessOutput, IngestError> {
        let stem = doc.stem();
        let parsed_text_object = format!("{stem}/text.txt");
        let temp_dir = temp_dir_for(stem);
        tokio::fs::create_dir_all(&temp_dir)
            .await
            .map_err(|e| IngestError::StorageUnavailable(e.to_string()))?;

        let cached = self.object_store.exists(&parsed_text_object, None).await?;
        let result = if cached {
            self.process_cached_text(&temp_dir, &parsed_text_object).await
        } else {
            self.process_from_pdf(&temp_dir, doc).await
        };

        let _ = tokio::fs::remove_dir_all(&temp_dir).await;
        result
    }
}

/// A debug pipeline that performs no processing, logging the document's
/// file name and returning empty chunk/embedding sequences.
pub struct PrintFilenamePipeline;

#[async_trait]
impl Pipeline for PrintFilenamePipeline {
    async fn process(&self, doc: &Document) -> Result<ProcessOutput, IngestError> {
        tracing::info!(file_name = %doc.file_name, "print-filename pipeline invoked");
        Ok((Vec::new(), Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docprep_core::Document;
    use docprep_storage::{BucketPolicy, LocalStorage};
    use tempfile::tempdir;

    fn doc(file_name: &str) -> Document {
        Document {
            title: "t".to_string(),
            authors: Vec::new(),
            keywords: Vec::new(),
            file_name: file_name.to_string(),
            doc_type: "paper".to_string(),
            bucket: None,
            publication_date: None,
            language: None,
        }
    }

    #[tokio::test]
    async fn print_filename_pipeline_returns_empty_output() {
        let pipeline = PrintFilenamePipeline;
        let (chunks, embeddings) = pipeline.process(&doc("a.pdf")).await.unwrap();
        assert!(chunks.is_empty());
        assert!(embeddings.is_empty());
    }

    #[tokio::test]
    async fn default_pipeline_detects_cached_text_and_fails_the_whole_task_on_chunker_error() {
        // This pipeline always chunks through the LLM backend, even on the
        // cache-hit path. With no reachable LLM endpoint the chunk step
        // fails, and per the error-propagation contract that failure must
        // surface as a whole-task failure rather than silently degrading.
        let dir = tempdir().unwrap();
        let storage: Arc<dyn ObjectStore> = Arc::new(LocalStorage::new(
            dir.path(),
            BucketPolicy::new("pdfs", "prep"),
        ));

        let cached_text = dir.path().join("cached.txt");
        tokio::fs::write(&cached_text, "Sentence one. Sentence two. Sentence three. Sentence four.")
            .await
            .unwrap();
        storage.upload(&cached_text, "paper/text.txt", None).await.unwrap();

        let model_loader = Arc::new(ModelLoader::new(docprep_models::LlmChunkerConfig {
            api_base: "http://127.0.0.1:0".to_string(),
            api_key: "k".to_string(),
            model_name: "m".to_string(),
        }));

        let pipeline = DefaultPdfPipeline::new(model_loader, storage, None);
        let err = pipeline.process(&doc("paper.pdf")).await.unwrap_err();
        assert!(matches!(err, IngestError::Chunker(_)));
    }

    #[tokio::test]
    async fn full_parse_path_uploads_text_txt_so_a_later_task_can_take_the_cache_skip_path() {
        let dir = tempdir().unwrap();
        let storage: Arc<dyn ObjectStore> = Arc::new(LocalStorage::new(
            dir.path(),
            BucketPolicy::new("pdfs", "prep"),
        ));

        let source_pdf = dir.path().join("source.pdf");
        tokio::fs::write(&source_pdf, b"hello").await.unwrap();
        storage.upload(&source_pdf, "paper.pdf", None).await.unwrap();

        let model_loader = Arc::new(ModelLoader::new(docprep_models::LlmChunkerConfig {
            api_base: "http://127.0.0.1:0".to_string(),
            api_key: "k".to_string(),
            model_name: "m".to_string(),
        }));

        let pipeline = DefaultPdfPipeline::new(model_loader, storage.clone(), None);
        // The LLM chunker has no reachable endpoint, so the overall task
        // still fails — but the parser's upload happens before that, so
        // the artifact it produces must survive regardless.
        let err = pipeline.process(&doc("paper.pdf")).await.unwrap_err();
        assert!(matches!(err, IngestError::Chunker(_)));

        assert!(storage.exists("paper/text.txt", None).await.unwrap());
    }

    #[tokio::test]
    async fn default_pipeline_cleans_up_its_scratch_directory_on_failure() {
        let dir = tempdir().unwrap();
        let storage: Arc<dyn ObjectStore> = Arc::new(LocalStorage::new(
            dir.path(),
            BucketPolicy::new("pdfs", "prep"),
        ));
        let model_loader = Arc::new(ModelLoader::new(docprep_models::LlmChunkerConfig {
            api_base: "http://127.0.0.1:0".to_string(),
            api_key: "k".to_string(),
            model_name: "m".to_string(),
        }));

        let pipeline = DefaultPdfPipeline::new(model_loader, storage, None);
        let d = doc("missing.pdf");
        let err = pipeline.process(&d).await.unwrap_err();
        assert!(matches!(err, IngestError::NotFound(_)));
        assert!(!temp_dir_for(d.stem()).exists());
    }
}
