//! Per-process model loader: lazily constructs and caches the parser, both
//! chunker variants, and the embedder, guarding first construction with a
//! mutex and double-checked publication.

use std::sync::Arc;

use docprep_storage::ObjectStore;
use parking_lot::RwLock;
use tracing::info;

use crate::chunker::{Chunker, LlmChunker, LlmChunkerConfig, SentenceChunker, STRATEGY_SEMANTIC_API};
use crate::embedder::{Embedder, HashEmbedder};
use crate::parser::{Parser, PlaceholderParser};

/// Lazily-initialised, shared instances of every model this service depends
/// on. One `ModelLoader` is constructed per process and handed to every
/// worker; construction races are resolved so exactly one instance of each
/// model is ever built. [`Self::clear_cache`] disposes of all of them, used
/// on shutdown.
pub struct ModelLoader {
    parser: RwLock<Option<Arc<dyn Parser>>>,
    sentence_chunker: RwLock<Option<Arc<dyn Chunker>>>,
    llm_chunker: RwLock<Option<Arc<dyn Chunker>>>,
    llm_chunker_config: LlmChunkerConfig,
    embedder: RwLock<Option<Arc<dyn Embedder>>>,
}

impl ModelLoader {
    #[must_use]
    pub fn new(llm_chunker_config: LlmChunkerConfig) -> Self {
        info!("model loader initialised");
        Self {
            parser: RwLock::new(None),
            sentence_chunker: RwLock::new(None),
            llm_chunker: RwLock::new(None),
            llm_chunker_config,
            embedder: RwLock::new(None),
        }
    }

    /// Returns the parser instance, updating its storage reference if it was
    /// already constructed.
    pub fn get_parser(&self, storage: Option<Arc<dyn ObjectStore>>) -> Arc<dyn Parser> {
        if let Some(parser) = self.parser.read().clone() {
            if let Some(storage) = storage {
                parser.set_storage(storage);
            }
            return parser;
        }

        let mut guard = self.parser.write();
        if let Some(parser) = guard.clone() {
            if let Some(storage) = storage {
                parser.set_storage(storage);
            }
            return parser;
        }

        info!("parser instance loaded");
        let parser: Arc<dyn Parser> = Arc::new(PlaceholderParser::new(storage));
        *guard = Some(parser.clone());
        parser
    }

    fn get_or_init_chunker(
        slot: &RwLock<Option<Arc<dyn Chunker>>>,
        build: impl FnOnce() -> Arc<dyn Chunker>,
    ) -> Arc<dyn Chunker> {
        if let Some(chunker) = slot.read().clone() {
            return chunker;
        }
        let mut guard = slot.write();
        if let Some(chunker) = guard.clone() {
            return chunker;
        }
        let chunker = build();
        *guard = Some(chunker.clone());
        chunker
    }

    fn get_sentence_chunker(&self) -> Arc<dyn Chunker> {
        Self::get_or_init_chunker(&self.sentence_chunker, || {
            info!("sentence chunker instance loaded");
            Arc::new(SentenceChunker)
        })
    }

    fn get_llm_chunker(&self) -> Arc<dyn Chunker> {
        Self::get_or_init_chunker(&self.llm_chunker, || {
            info!("llm chunker instance loaded");
            Arc::new(LlmChunker::new(self.llm_chunker_config.clone()))
        })
    }

    /// Selects a chunker by strategy name. `"semantic_api"` selects the LLM
    /// chunker; any other value selects the sentence chunker.
    #[must_use]
    pub fn get_chunker(&self, strategy: &str) -> Arc<dyn Chunker> {
        if strategy == STRATEGY_SEMANTIC_API {
            self.get_llm_chunker()
        } else {
            self.get_sentence_chunker()
        }
    }

    #[must_use]
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        if let Some(embedder) = self.embedder.read().clone() {
            return embedder;
        }
        let mut guard = self.embedder.write();
        if let Some(embedder) = guard.clone() {
            return embedder;
        }
        info!("embedder instance loaded");
        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder);
        *guard = Some(embedder.clone());
        embedder
    }

    /// Eagerly builds every model instance. Called once at process startup.
    pub fn preload_all(&self, storage: Option<Arc<dyn ObjectStore>>) {
        info!("preloading all models");
        let _ = self.get_parser(storage);
        let _ = self.get_sentence_chunker();
        let _ = self.get_llm_chunker();
        let _ = self.embedder();
        info!("all models preloaded");
    }

    /// Disposes of every cached instance. Used on shutdown.
    pub fn clear_cache(&self) {
        info!("clearing model cache");
        *self.parser.write() = None;
        *self.sentence_chunker.write() = None;
        *self.llm_chunker.write() = None;
        *self.embedder.write() = None;
    }
}
