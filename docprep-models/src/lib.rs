//! Parser, chunker and embedder abstractions, plus the per-process
//! [`ModelLoader`] that lazily constructs and caches one instance of each.

pub mod chunker;
pub mod embedder;
pub mod loader;
pub mod parser;

pub use chunker::{Chunker, LlmChunker, LlmChunkerConfig, SentenceChunker, STRATEGY_SEMANTIC_API};
pub use embedder::{Embedder, HashEmbedder, EMBEDDING_DIM};
pub use loader::ModelLoader;
pub use parser::{Parser, PlaceholderParser};
