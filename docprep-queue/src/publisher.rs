//! Publishes `TaskStatusMessage` envelopes to the result queue. Publication
//! is best-effort: a lost publish is tolerated and never retried from
//! this layer.

use lapin::options::BasicPublishOptions;
use lapin::BasicProperties;
use tracing::error;

use docprep_core::{IngestError, Task, TaskStatusMessage};

use crate::connection::BrokerConnection;

/// Delivery mode 2 ("persistent").
const PERSISTENT_DELIVERY_MODE: u8 = 2;

/// Publishes status transitions to the result queue over the default
/// exchange, routed by queue name.
pub struct ResultPublisher<'a> {
    connection: &'a BrokerConnection,
}

impl<'a> ResultPublisher<'a> {
    #[must_use]
    pub fn new(connection: &'a BrokerConnection) -> Self {
        Self { connection }
    }

    /// Publishes one status message. Errors are logged, not propagated:
    /// the consumer never retries a lost publish.
    pub async fn publish(&self, message: &TaskStatusMessage) {
        let body = match serde_json::to_vec(message) {
            Ok(body) => body,
            Err(e) => {
                error!(task_id = %message.task_id, error = %e, "failed to encode status message");
                return;
            }
        };

        let channel = match self.connection.channel().await {
            Ok(channel) => channel,
            Err(e) => {
                error!(task_id = %message.task_id, error = %e, "broker unavailable; status message dropped");
                return;
            }
        };

        let result = channel
            .basic_publish(
                "",
                self.connection.result_queue(),
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default().with_delivery_mode(PERSISTENT_DELIVERY_MODE),
            )
            .await;

        if let Err(e) = result {
            error!(task_id = %message.task_id, error = %e, "status message publish failed");
        }
    }
}

/// Publishes new `Task` envelopes to the task queue. Unlike
/// [`ResultPublisher`], a producer's publish failure is the caller's
/// problem to retry or report, so it propagates the error instead of
/// swallowing it.
pub struct TaskPublisher<'a> {
    connection: &'a BrokerConnection,
}

impl<'a> TaskPublisher<'a> {
    #[must_use]
    pub fn new(connection: &'a BrokerConnection) -> Self {
        Self { connection }
    }

    /// Publishes one task in `PENDING` state.
    pub async fn publish(&self, task: &Task) -> Result<(), IngestError> {
        let body = serde_json::to_vec(task)
            .map_err(|e| IngestError::MalformedEnvelope(e.to_string()))?;

        let channel = self.connection.channel().await?;
        channel
            .basic_publish(
                "",
                self.connection.task_queue(),
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default().with_delivery_mode(PERSISTENT_DELIVERY_MODE),
            )
            .await
            .map_err(|e| IngestError::Broker(e.to_string()))?;
        Ok(())
    }
}
