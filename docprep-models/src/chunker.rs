//! Text chunking: splits parsed document text into an ordered sequence of
//! chunk strings. Markers embedded in the text may be redistributed across
//! chunk boundaries but are never discarded.

use async_trait::async_trait;
use docprep_core::IngestError;

pub const STRATEGY_SEMANTIC_API: &str = "semantic_api";

const MIN_CHUNK_INPUT_LEN: usize = 16;

/// Splits text into chunks. The chunking algorithm itself is an opaque,
/// swappable unit: callers only depend on chunk ordering and the
/// byte-preservation guarantee.
#[async_trait]
pub trait Chunker: Send + Sync {
    async fn chunk(&self, text: &str) -> Result<Vec<String>, IngestError>;
}

fn split_into_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?' | '\u{3002}') {
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        sentences.push(current);
    }
    sentences
}

/// A cheap, dependency-free chunker that groups runs of sentences.
pub struct SentenceChunker;

#[async_trait]
impl Chunker for SentenceChunker {
    async fn chunk(&self, text: &str) -> Result<Vec<String>, IngestError> {
        if text.len() < MIN_CHUNK_INPUT_LEN {
            return Ok(Vec::new());
        }

        let sentences = split_into_sentences(text);
        if sentences.len() <= 3 {
            return Ok(vec![text.to_string()]);
        }

        let per_chunk = (sentences.len() / 2).clamp(7, 10);
        let mut chunks = Vec::new();
        let mut current = String::new();
        for (i, sentence) in sentences.iter().enumerate() {
            current.push_str(sentence);
            if (i + 1) % per_chunk == 0 || i == sentences.len() - 1 {
                chunks.push(std::mem::take(&mut current));
            }
        }
        Ok(chunks)
    }
}

/// Configuration for the LLM-backed chunker's OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct LlmChunkerConfig {
    pub api_base: String,
    pub api_key: String,
    pub model_name: String,
}

/// Delegates chunk-boundary selection to an LLM reached over an
/// OpenAI-compatible chat completion endpoint.
pub struct LlmChunker {
    config: LlmChunkerConfig,
    http: reqwest::Client,
}

impl LlmChunker {
    #[must_use]
    pub fn new(config: LlmChunkerConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    async fn call_api(&self, text: &str) -> Result<Vec<String>, IngestError> {
        let body = serde_json::json!({
            "model": self.config.model_name,
            "messages": [
                { "role": "system", "content": "Split the following text into semantically coherent chunks. Return one chunk per line." },
                { "role": "user", "content": text },
            ],
        });
        let resp = self
            .http
            .post(format!("{}/chat/completions", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| IngestError::Chunker(e.to_string()))?;
        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| IngestError::Chunker(e.to_string()))?;
        let content = value
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| IngestError::Chunker("empty completion".to_string()))?;
        Ok(content
            .lines()
            .map(str::to_string)
            .filter(|l| !l.trim().is_empty())
            .collect())
    }
}

#[async_trait]
impl Chunker for LlmChunker {
    async fn chunk(&self, text: &str) -> Result<Vec<String>, IngestError> {
        if text.len() < MIN_CHUNK_INPUT_LEN {
            return Ok(Vec::new());
        }
        self.call_api(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn short_text_yields_no_chunks() {
        let chunker = SentenceChunker;
        assert!(chunker.chunk("hi").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn few_sentences_returns_single_chunk() {
        let chunker = SentenceChunker;
        let text = "One sentence. Another one. And a third one.";
        let chunks = chunker.chunk(text).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text);
    }

    #[tokio::test]
    async fn many_sentences_are_grouped_into_several_chunks() {
        let chunker = SentenceChunker;
        let sentence = "This is a sentence. ";
        let text = sentence.repeat(30);
        let chunks = chunker.chunk(&text).await.unwrap();
        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), text);
    }
}
