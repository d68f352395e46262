//! Builds the concrete dependency graph for each subcommand and runs it.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tracing::info;

use docprep_config::AppConfig;
use docprep_models::{LlmChunkerConfig, ModelLoader};
use docprep_pipeline::{DefaultPdfPipeline, Registry};
use docprep_producer::SubmitOptions;
use docprep_queue::{BrokerConnection, TaskConsumer};
use docprep_storage::{BucketPolicy, CollectionSchema, MilvusClient, MilvusConfig, ObjectStore, S3Config, S3Storage, VectorStore};
use docprep_worker::WorkerPool;

fn bucket_policy(config: &AppConfig) -> BucketPolicy {
    BucketPolicy::new(
        config.object_store.pdf_bucket.clone(),
        config.object_store.preprocessed_bucket.clone(),
    )
}

fn object_store(config: &AppConfig) -> Arc<dyn ObjectStore> {
    let s3_config = S3Config {
        endpoint: config.object_store.endpoint.clone(),
        access_key: config.object_store.access_key.clone(),
        secret_key: config.object_store.secret_key.clone(),
        region: "us-east-1".to_string(),
        allow_http: true,
    };
    Arc::new(S3Storage::new(s3_config, bucket_policy(config)))
}

fn vector_store(config: &AppConfig) -> Arc<dyn VectorStore> {
    let milvus_config = MilvusConfig {
        host: config.milvus.host.clone(),
        port: config.milvus.port,
        token: config.milvus.token(),
        db_name: config.milvus.db.clone(),
        schema: CollectionSchema::default(),
    };
    Arc::new(MilvusClient::new(milvus_config))
}

/// Connects to the broker, builds the worker pool and pipeline registry,
/// and runs the consumer loop until Ctrl-C is received.
pub async fn run_consume(config: AppConfig, workers_override: Option<usize>) -> Result<()> {
    let workers = workers_override.unwrap_or(config.broker.consumer_workers).max(1);

    let object_store = object_store(&config);
    let vector_store = vector_store(&config);

    let model_loader = Arc::new(ModelLoader::new(LlmChunkerConfig {
        api_base: config.model_loader.llm_api_base.clone(),
        api_key: config.model_loader.llm_api_key.clone(),
        model_name: config.model_loader.llm_model_name.clone(),
    }));
    model_loader.preload_all(Some(object_store.clone()));

    let default_pipeline = Arc::new(DefaultPdfPipeline::new(model_loader, object_store, None));
    let registry = Arc::new(Registry::new(default_pipeline));

    let (completion_tx, completion_rx) = mpsc::channel(workers);
    let pool = WorkerPool::new(
        workers,
        registry,
        vector_store,
        config.milvus.default_collection.clone(),
        config.milvus.default_partition.clone(),
        completion_tx.clone(),
    );

    let connection = Arc::new(BrokerConnection::new(
        config.broker.amqp_uri(),
        config.broker.task_queue.clone(),
        config.broker.result_queue.clone(),
    ));
    let consumer = TaskConsumer::new(connection);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("interrupt received; shutting down");
        let _ = shutdown_tx.send(());
    });

    consumer
        .run(pool, completion_tx, completion_rx, workers as u16, shutdown_rx)
        .await
        .context("consumer loop failed")
}

/// Submits `path` (a file or a directory of PDFs) to the task queue.
pub async fn run_produce(
    config: AppConfig,
    path: &Path,
    task_type: Option<String>,
    collection: Option<String>,
) -> Result<()> {
    let object_store = object_store(&config);
    let connection = BrokerConnection::new(
        config.broker.amqp_uri(),
        config.broker.task_queue.clone(),
        config.broker.result_queue.clone(),
    );
    let options = SubmitOptions {
        task_type,
        destination_collection: collection,
    };

    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;

    if metadata.is_dir() {
        let results = docprep_producer::submit_directory(
            object_store.as_ref(),
            &connection,
            &config.object_store.pdf_bucket,
            path,
            options,
        )
        .await
        .context("failed to submit directory")?;

        let (ok, failed): (Vec<_>, Vec<_>) = results.iter().partition(|(_, r)| r.is_ok());
        info!(submitted = ok.len(), failed = failed.len(), "directory submission complete");
        for (path, result) in &results {
            if let Err(e) = result {
                tracing::warn!(path = %path.display(), error = %e, "submission failed");
            }
        }
    } else {
        let task = docprep_producer::submit_file(
            object_store.as_ref(),
            &connection,
            &config.object_store.pdf_bucket,
            path,
            options,
        )
        .await
        .context("failed to submit document")?;
        info!(task_id = %task.task_id, "document submitted");
    }

    connection.close().await;
    Ok(())
}
