//! Drives the broker event loop: declares the consumer, parses each
//! delivery into a [`Task`], publishes the `PROCESSING` status, hands the
//! task to the worker pool, and — without ever blocking this loop on
//! pipeline work — drains worker completions to ack/nack and publish the
//! terminal status. This task is the sole owner of the broker channel;
//! nothing else in the process calls `ack`/`nack`/`basic_publish`.

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use lapin::acker::Acker;
use lapin::options::{BasicCancelOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions};
use lapin::types::FieldTable;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};
use uuid::Uuid;

use docprep_core::{IngestError, Task, TaskStatus, TaskStatusMessage};
use docprep_worker::{Completion, Outcome, WorkItem, WorkerPool, DEFAULT_SHUTDOWN_GRACE};

use crate::connection::BrokerConnection;
use crate::publisher::ResultPublisher;

/// Everything a worker's completion needs to finish a delivery: the
/// broker's acker, and enough of the original task to build the terminal
/// status message without having to hand the whole `Task` back.
pub struct DeliveryHandle {
    acker: Acker,
    task_id: Uuid,
}

/// Drives one consumer loop against `connection`'s task queue, dispatching
/// into `pool`.
pub struct TaskConsumer {
    connection: Arc<BrokerConnection>,
}

impl TaskConsumer {
    #[must_use]
    pub fn new(connection: Arc<BrokerConnection>) -> Self {
        Self { connection }
    }

    /// Runs until `shutdown` resolves (or the broker cancels the
    /// consumer), then drains outstanding work up to
    /// [`DEFAULT_SHUTDOWN_GRACE`] and closes the connection.
    pub async fn run(
        &self,
        pool: WorkerPool<DeliveryHandle>,
        completion_tx: mpsc::Sender<Completion<DeliveryHandle>>,
        mut completion_rx: mpsc::Receiver<Completion<DeliveryHandle>>,
        workers: u16,
        mut shutdown: oneshot::Receiver<()>,
    ) -> Result<(), IngestError> {
        // `completion_tx` is only needed by the pool's workers; dropping
        // this crate's extra handle here means the channel finally closes
        // once every worker has exited.
        drop(completion_tx);

        let channel = self.connection.channel().await?;
        channel
            .basic_qos(workers, BasicQosOptions::default())
            .await
            .map_err(|e| IngestError::Broker(e.to_string()))?;

        let consumer_tag = "docprep-worker";
        let mut consumer = channel
            .basic_consume(
                self.connection.task_queue(),
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| IngestError::Broker(e.to_string()))?;

        info!(queue = %self.connection.task_queue(), prefetch = workers, "consumer started");

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("shutdown requested; cancelling consumer and draining in-flight work");
                    if let Err(e) = channel.basic_cancel(consumer_tag, BasicCancelOptions::default()).await {
                        warn!(error = %e, "failed to cancel consumer during shutdown");
                    }
                    break;
                }

                delivery = consumer.next() => {
                    match delivery {
                        Some(Ok(delivery)) => {
                            self.handle_delivery(&pool, delivery.data, delivery.acker).await;
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "error receiving delivery; will reconnect on next broker call");
                        }
                        None => {
                            warn!("consumer stream ended (broker cancelled us); shutting down");
                            break;
                        }
                    }
                }

                completion = completion_rx.recv() => {
                    match completion {
                        Some(c) => self.finish_delivery(c).await,
                        None => break,
                    }
                }
            }
        }

        // Let the pool finish outstanding work (or time out) concurrently
        // with draining whatever completions it produces in the meantime.
        let shutdown_join = tokio::spawn(pool.shutdown(DEFAULT_SHUTDOWN_GRACE));
        tokio::pin!(shutdown_join);
        let mut completions_open = true;
        loop {
            tokio::select! {
                completion = completion_rx.recv(), if completions_open => {
                    match completion {
                        Some(c) => self.finish_delivery(c).await,
                        None => completions_open = false,
                    }
                }
                result = &mut shutdown_join => {
                    if let Err(e) = result {
                        error!(error = %e, "worker pool shutdown task panicked");
                    }
                    break;
                }
            }
        }
        // Final, non-blocking drain of anything buffered after the pool
        // finished joining.
        while let Ok(c) = completion_rx.try_recv() {
            self.finish_delivery(c).await;
        }

        self.connection.close().await;
        Ok(())
    }

    async fn handle_delivery(&self, pool: &WorkerPool<DeliveryHandle>, body: Vec<u8>, acker: Acker) {
        let mut task: Task = match serde_json::from_slice(&body) {
            Ok(task) => task,
            Err(e) => {
                warn!(error = %e, "malformed task envelope; nacking without requeue");
                if let Err(e) = acker
                    .nack(BasicNackOptions {
                        multiple: false,
                        requeue: false,
                    })
                    .await
                {
                    error!(error = %e, "failed to nack malformed delivery");
                }
                return;
            }
        };

        if task.mark_processing(Utc::now()).is_err() {
            warn!(task_id = %task.task_id, "task was not in PENDING on receipt; treating as malformed");
            if let Err(e) = acker
                .nack(BasicNackOptions {
                    multiple: false,
                    requeue: false,
                })
                .await
            {
                error!(error = %e, "failed to nack malformed delivery");
            }
            return;
        }

        if let Some(message) = task.status_message() {
            ResultPublisher::new(&self.connection).publish(&message).await;
        }

        let handle = DeliveryHandle {
            acker,
            task_id: task.task_id,
        };
        if let Err(e) = pool.submit(WorkItem::new(task, handle)).await {
            error!(error = %e, "worker pool refused submission; delivery will be redelivered by the broker");
        }
    }

    async fn finish_delivery(&self, completion: Completion<DeliveryHandle>) {
        let Completion { handle, outcome } = completion;
        let finished_at = Utc::now();
        let status = if outcome.is_done() {
            TaskStatus::Done
        } else {
            TaskStatus::Failed
        };
        if let Outcome::Failed(e) = &outcome {
            warn!(task_id = %handle.task_id, error = %e, stage = e.stage(), "task finished with FAILED status");
        }

        let message = TaskStatusMessage {
            task_id: handle.task_id.to_string(),
            status,
            date_time: finished_at,
        };
        ResultPublisher::new(&self.connection).publish(&message).await;

        let ack_result = if outcome.is_done() {
            handle.acker.ack(lapin::options::BasicAckOptions::default()).await
        } else {
            handle
                .acker
                .nack(BasicNackOptions {
                    multiple: false,
                    requeue: false,
                })
                .await
        };
        if let Err(e) = ack_result {
            error!(task_id = %handle.task_id, error = %e, "failed to ack/nack delivery");
        }
    }
}
