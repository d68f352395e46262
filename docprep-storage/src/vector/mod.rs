//! The Milvus-style vector store client: collection/partition lifecycle,
//! row insertion with page-marker stripping, and similarity search.

pub mod milvus;

use async_trait::async_trait;
use docprep_core::{IngestError, PipelineRow};
use serde::{Deserialize, Serialize};

/// The schema this service's collections use. `dim` and `metric` are fixed
/// per the collection contract; `nlist` configures the HNSW build.
#[derive(Debug, Clone, Copy)]
pub struct CollectionSchema {
    pub dim: usize,
    pub nlist: usize,
}

impl Default for CollectionSchema {
    fn default() -> Self {
        Self { dim: 768, nlist: 128 }
    }
}

/// A single similarity-search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub id: i64,
    pub chunk: String,
    pub metadata: serde_json::Value,
    pub page: i64,
    pub score: f32,
}

/// Vector-store capability the pipeline depends on: ensure collection and
/// partition exist, insert rows, and run COSINE similarity search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Creates `collection` with the fixed schema and an HNSW(COSINE) index
    /// if it does not already exist. A lost creation race (an
    /// "already exists" response) is downgraded to success.
    async fn ensure_collection(&self, collection: &str) -> Result<(), IngestError>;

    /// Creates `partition` within `collection` if it does not already
    /// exist, with the same idempotent-race handling as
    /// [`Self::ensure_collection`].
    async fn ensure_partition(&self, collection: &str, partition: &str) -> Result<(), IngestError>;

    /// Inserts `rows` into `collection`/`partition`. Callers are expected to
    /// have already called [`Self::ensure_collection`] and
    /// [`Self::ensure_partition`].
    async fn insert(
        &self,
        collection: &str,
        partition: &str,
        rows: Vec<PipelineRow>,
    ) -> Result<(), IngestError>;

    /// Runs a COSINE similarity search, returning up to `top_k` hits ordered
    /// by descending score.
    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        collection: &str,
        partition: &str,
    ) -> Result<Vec<VectorHit>, IngestError>;
}
