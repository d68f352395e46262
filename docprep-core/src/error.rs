//! Tagged error taxonomy shared by every stage of the ingestion worker.
//! Consumer and pipeline code pattern-match on these variants to decide
//! between ack/nack and which status message to emit.

use thiserror::Error;

/// Errors that can occur while driving a task through the ingestion pipeline.
///
/// Every variant maps to exactly one outcome at the consumer boundary: a
/// `MalformedEnvelope` short-circuits before any status is published, every
/// other variant surfaces as a `FAILED` status transition plus a negative
/// acknowledgement.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The delivery body could not be parsed as a task envelope.
    #[error("malformed task envelope: {0}")]
    MalformedEnvelope(String),

    /// The object store or vector store could not be reached.
    #[error("storage backend unavailable: {0}")]
    StorageUnavailable(String),

    /// A requested object was absent where one was required to exist.
    #[error("object not found: {0}")]
    NotFound(String),

    /// The parser produced no text for a document.
    #[error("parse produced an empty result")]
    ParseEmpty,

    /// The chunker stage failed.
    #[error("chunker error: {0}")]
    Chunker(String),

    /// The embedder stage failed.
    #[error("embedder error: {0}")]
    Embedder(String),

    /// The vector store rejected an insert, search, or schema operation.
    #[error("vector store error: {0}")]
    VectorStore(String),

    /// The broker connection or channel failed.
    #[error("broker error: {0}")]
    Broker(String),
}

impl IngestError {
    /// Name of the stage that produced the error, used for log correlation.
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::MalformedEnvelope(_) => "envelope",
            Self::StorageUnavailable(_) | Self::NotFound(_) => "storage",
            Self::ParseEmpty => "parse",
            Self::Chunker(_) => "chunk",
            Self::Embedder(_) => "embed",
            Self::VectorStore(_) => "vector_store",
            Self::Broker(_) => "broker",
        }
    }
}

/// Result alias used throughout the ingestion worker crates.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Invariant violations raised while transitioning a [`crate::task::Task`] between states.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskStateError {
    /// A `PROCESSING` transition was attempted on a task that already left `PENDING`.
    #[error("task {0} already left PENDING")]
    AlreadyStarted(uuid::Uuid),

    /// A terminal transition was attempted on a task not currently `PROCESSING`.
    #[error("task {0} is not in PROCESSING")]
    NotProcessing(uuid::Uuid),

    /// A terminal transition was attempted on a task that already finished.
    #[error("task {0} already finished")]
    AlreadyFinished(uuid::Uuid),
}
