//! The bounded worker pool that dispatches received tasks to the pipeline
//! registry without blocking the broker I/O path, and the cross-thread
//! completion hand-off consumers use to decide ack/nack and the next
//! status message.

pub mod dispatch;
pub mod pool;

pub use dispatch::{Completion, Outcome, WorkItem};
pub use pool::{WorkerPool, DEFAULT_SHUTDOWN_GRACE};

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use docprep_core::{Document, IngestError, Task};
    use docprep_models::{LlmChunkerConfig, ModelLoader};
    use docprep_pipeline::{DefaultPdfPipeline, Pipeline, ProcessOutput, Registry};
    use docprep_core::PipelineRow;
    use docprep_storage::{BucketPolicy, LocalStorage, ObjectStore, VectorStore};
    use tokio::sync::{mpsc, Barrier};

    use super::*;

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

    fn registry() -> Arc<Registry> {
        let storage: Arc<dyn ObjectStore> = Arc::new(LocalStorage::new(
            std::env::temp_dir(),
            BucketPolicy::new("pdfs", "prep"),
        ));
        let model_loader = Arc::new(ModelLoader::new(LlmChunkerConfig {
            api_base: "http://127.0.0.1:0".to_string(),
            api_key: "k".to_string(),
            model_name: "m".to_string(),
        }));
        let default_pipeline = Arc::new(DefaultPdfPipeline::new(model_loader, storage, None));
        Arc::new(Registry::new(default_pipeline))
    }

    /// An in-memory vector store used only to assert insert calls happened;
    /// see docprep-storage's `MilvusClient` for the real HTTP implementation.
    struct RecordingVectorStore {
        inserted_rows: std::sync::Mutex<Vec<PipelineRow>>,
    }

    impl RecordingVectorStore {
        fn new() -> Self {
            Self {
                inserted_rows: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl VectorStore for RecordingVectorStore {
        async fn ensure_collection(&self, _collection: &str) -> Result<(), IngestError> {
            Ok(())
        }

        async fn ensure_partition(&self, _collection: &str, _partition: &str) -> Result<(), IngestError> {
            Ok(())
        }

        async fn insert(
            &self,
            _collection: &str,
            _partition: &str,
            rows: Vec<PipelineRow>,
        ) -> Result<(), IngestError> {
            self.inserted_rows.lock().unwrap().extend(rows);
            Ok(())
        }

        async fn search(
            &self,
            _query: &[f32],
            _top_k: usize,
            _collection: &str,
            _partition: &str,
        ) -> Result<Vec<docprep_storage::VectorHit>, IngestError> {
            Ok(Vec::new())
        }
    }

    /// A pipeline that blocks on a shared barrier before returning, used to
    /// observe how many tasks are concurrently in flight (the in-process
    /// check on prefetch bounding concurrency, since a live broker isn't available
    /// in a unit test).
    struct BarrierPipeline {
        barrier: Arc<Barrier>,
        in_flight: Arc<AtomicUsize>,
        max_observed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Pipeline for BarrierPipeline {
        async fn process(&self, _doc: &Document) -> Result<ProcessOutput, IngestError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_observed.fetch_max(now, Ordering::SeqCst);
            self.barrier.wait().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok((vec!["chunk".to_string()], vec![vec![0.0; 4]]))
        }
    }

    #[tokio::test]
    async fn completion_reports_done_for_the_zero_chunk_pipeline() {
        let registry = registry();
        let vector_store: Arc<dyn VectorStore> = Arc::new(RecordingVectorStore::new());
        let (completion_tx, mut completion_rx) = mpsc::channel(4);
        let pool = WorkerPool::new(
            2,
            registry,
            vector_store,
            "documents".to_string(),
            "_default".to_string(),
            completion_tx,
        );

        let task = Task::new(doc("a.pdf"), chrono::Utc::now());
        pool.submit(WorkItem::new(task, "tag-1")).await.unwrap();

        let completion = completion_rx.recv().await.unwrap();
        assert_eq!(completion.handle, "tag-1");
        // No PDF exists on disk, so the default pipeline fails the download
        // step; the outcome must still surface, never panic the worker.
        assert!(!completion.outcome.is_done());

        pool.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn at_most_pool_size_tasks_are_concurrently_in_flight() {
        let n = 2;
        let barrier = Arc::new(Barrier::new(n));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_observed = Arc::new(AtomicUsize::new(0));

        let pipeline: Arc<dyn Pipeline> = Arc::new(BarrierPipeline {
            barrier: barrier.clone(),
            in_flight: in_flight.clone(),
            max_observed: max_observed.clone(),
        });
        let registry = Arc::new(Registry::new(Arc::new(DefaultPdfPipeline::new(
            Arc::new(ModelLoader::new(LlmChunkerConfig {
                api_base: "http://127.0.0.1:0".to_string(),
                api_key: "k".to_string(),
                model_name: "m".to_string(),
            })),
            Arc::new(LocalStorage::new(
                std::env::temp_dir(),
                BucketPolicy::new("pdfs", "prep"),
            )),
            None,
        ))));
        registry.add_entry("barrier", Arc::new(move || pipeline.clone()));

        let vector_store: Arc<dyn VectorStore> = Arc::new(RecordingVectorStore::new());
        let (completion_tx, mut completion_rx) = mpsc::channel(8);
        let pool = WorkerPool::new(
            n,
            registry,
            vector_store,
            "documents".to_string(),
            "_default".to_string(),
            completion_tx,
        );

        for i in 0..3 {
            let mut task = Task::new(doc(&format!("{i}.pdf")), chrono::Utc::now());
            task.task_type = "barrier".to_string();
            pool.submit(WorkItem::new(task, i)).await.unwrap();
        }

        for _ in 0..3 {
            let completion = completion_rx.recv().await.unwrap();
            assert!(completion.outcome.is_done());
        }
        pool.shutdown(Duration::from_secs(1)).await;

        assert!(max_observed.load(Ordering::SeqCst) <= n);
    }
}
