//! The bounded worker pool: N long-lived tasks pulling from a single
//! rendezvous channel, each resolving a pipeline from the registry,
//! running it, and reporting the outcome back on a shared completion
//! channel. Workers never touch the broker directly — only the consumer
//! that owns the completion channel's receiving end does that.

use std::sync::Arc;
use std::time::Duration;

use docprep_core::{IngestError, Task};
use docprep_pipeline::Registry;
use docprep_storage::VectorStore;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::dispatch::{Completion, Outcome, WorkItem};

/// Default grace period a shutting-down pool waits for in-flight work
/// before abandoning it.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// A bounded pool of `workers` tasks, each capable of running exactly one
/// pipeline at a time. `submit` is a blocking rendezvous: with a channel of
/// capacity `workers`, the broker naturally back-pressures once every
/// worker is busy.
pub struct WorkerPool<H: Send + 'static> {
    sender: Option<mpsc::Sender<WorkItem<H>>>,
    handles: Vec<JoinHandle<()>>,
}

impl<H: Send + 'static> WorkerPool<H> {
    /// Spawns `workers` long-lived tasks sharing one input channel of the
    /// same capacity, and one completion sender clone each.
    pub fn new(
        workers: usize,
        registry: Arc<Registry>,
        vector_store: Arc<dyn VectorStore>,
        default_collection: String,
        default_partition: String,
        completion_tx: mpsc::Sender<Completion<H>>,
    ) -> Self {
        let workers = workers.max(1);
        let (tx, rx) = mpsc::channel(workers);
        let rx = Arc::new(Mutex::new(rx));

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let rx = rx.clone();
            let registry = registry.clone();
            let vector_store = vector_store.clone();
            let default_collection = default_collection.clone();
            let default_partition = default_partition.clone();
            let completion_tx = completion_tx.clone();

            handles.push(tokio::spawn(async move {
                worker_loop(
                    id,
                    rx,
                    registry,
                    vector_store,
                    default_collection,
                    default_partition,
                    completion_tx,
                )
                .await;
            }));
        }

        Self {
            sender: Some(tx),
            handles,
        }
    }

    /// Submits one delivery for processing. Blocks (without starving the
    /// broker I/O task, since this is an async rendezvous) until a worker
    /// slot frees up. Returns an error if the pool has begun shutting down.
    pub async fn submit(&self, item: WorkItem<H>) -> Result<(), IngestError> {
        match &self.sender {
            Some(sender) => sender
                .send(item)
                .await
                .map_err(|_| IngestError::Broker("worker pool is shut down".to_string())),
            None => Err(IngestError::Broker("worker pool is shut down".to_string())),
        }
    }

    /// Refuses new submissions, waits up to `grace` for outstanding work to
    /// finish, then returns, abandoning any survivors without joining them
    /// (the broker will redeliver their deliveries to another consumer).
    pub async fn shutdown(mut self, grace: Duration) {
        // Dropping the sender closes the channel; workers finish their
        // current item, see an empty+closed channel, and exit.
        self.sender = None;
        let joins = std::mem::take(&mut self.handles);
        let all = futures::future::join_all(joins);
        if tokio::time::timeout(grace, all).await.is_err() {
            warn!("worker pool shutdown grace period elapsed; abandoning in-flight work");
        } else {
            info!("worker pool drained cleanly");
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn worker_loop<H: Send + 'static>(
    id: usize,
    rx: Arc<Mutex<mpsc::Receiver<WorkItem<H>>>>,
    registry: Arc<Registry>,
    vector_store: Arc<dyn VectorStore>,
    default_collection: String,
    default_partition: String,
    completion_tx: mpsc::Sender<Completion<H>>,
) {
    loop {
        let item = {
            let mut guard = rx.lock().await;
            guard.recv().await
        };
        let Some(WorkItem { task, handle }) = item else {
            break;
        };

        let outcome = run_task(&task, &registry, vector_store.as_ref(), &default_collection, &default_partition).await;
        if completion_tx
            .send(Completion { handle, outcome })
            .await
            .is_err()
        {
            error!(worker = id, "completion channel closed; dropping result");
            break;
        }
    }
    info!(worker = id, "worker exiting");
}

/// Resolves the pipeline and destination collection for `task`, runs it,
/// and stores the resulting rows. Never panics or propagates: every error
/// path is captured into `Outcome::Failed`.
async fn run_task(
    task: &Task,
    registry: &Registry,
    vector_store: &dyn VectorStore,
    default_collection: &str,
    default_partition: &str,
) -> Outcome {
    let task_type = task.task_type();
    let pipeline = registry.get(task_type);

    let collection = task
        .destination_collection
        .as_deref()
        .or_else(|| pipeline.destination_collection())
        .unwrap_or(default_collection)
        .to_string();

    info!(
        task_id = %task.task_id,
        task_type,
        collection = %collection,
        "dispatching task to pipeline"
    );

    let result = async {
        let (chunks, embeddings) = pipeline.process(&task.document).await?;
        if chunks.len() != embeddings.len() {
            return Err(IngestError::Embedder(format!(
                "chunk/embedding length mismatch: {} chunks, {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        pipeline
            .store_embedding(
                &task.document,
                chunks,
                embeddings,
                vector_store,
                &collection,
                default_partition,
            )
            .await
    }
    .await;

    match result {
        Ok(()) => Outcome::Done,
        Err(e) => {
            error!(task_id = %task.task_id, error = %e, stage = e.stage(), "task failed");
            Outcome::Failed(e)
        }
    }
}
