//! Embedding generation: turns chunk text into fixed-dimension float vectors.

use async_trait::async_trait;
use docprep_core::IngestError;

pub const EMBEDDING_DIM: usize = 768;

/// Generates embeddings for one or more chunks. The model invoked behind
/// this trait (transformer inference, API call, whatever) is opaque; callers
/// only depend on one embedding vector of [`EMBEDDING_DIM`] floats per input.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError>;

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, IngestError> {
        let mut result = self
            .generate_embeddings(std::slice::from_ref(&text.to_string()))
            .await?;
        result
            .pop()
            .ok_or_else(|| IngestError::Embedder("no embedding produced".to_string()))
    }
}

/// Deterministic, model-free embedder stand-in. Hashes each text into a
/// normalized pseudo-embedding so downstream storage and search code can be
/// exercised without a real inference backend.
pub struct HashEmbedder;

#[async_trait]
impl Embedder for HashEmbedder {
    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
        if texts.is_empty() || texts.iter().all(|t| t.trim().is_empty()) {
            return Ok(Vec::new());
        }

        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let mut vector = vec![0.0f32; EMBEDDING_DIM];
            for (i, byte) in text.bytes().enumerate() {
                let slot = i % EMBEDDING_DIM;
                vector[slot] += f32::from(byte);
            }
            let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
            if norm > 0.0 {
                for v in &mut vector {
                    *v /= norm;
                }
            }
            out.push(vector);
        }
        Ok(out)
    }
}
