//! The AMQP 0.9.1 broker adapter: a single long-lived connection, durable
//! queue declaration, a prefetch-bounded task consumer, and the result-queue
//! status publisher.

pub mod connection;
pub mod consumer;
pub mod publisher;

pub use connection::{BrokerConnection, HEARTBEAT_SECS};
pub use consumer::{DeliveryHandle, TaskConsumer};
pub use publisher::{ResultPublisher, TaskPublisher};
