//! Object storage (PDFs, derived text artifacts) and vector storage
//! (embeddings, chunk rows) backends used by the ingestion pipeline.

pub mod object;
pub mod vector;

pub use object::local::LocalStorage;
pub use object::s3::{S3Config, S3Storage};
pub use object::{BucketPolicy, ObjectStore};
pub use vector::milvus::{MilvusClient, MilvusConfig};
pub use vector::{CollectionSchema, VectorHit, VectorStore};
