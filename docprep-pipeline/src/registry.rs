//! Maps a task's `taskType` to the pipeline that should process it.

use std::collections::HashMap;
use std::sync::Arc;

use docprep_core::DEFAULT_TASK_TYPE;
use parking_lot::RwLock;

use crate::pipeline::{DefaultPdfPipeline, Pipeline, PrintFilenamePipeline};

const PRINT_FILENAME_TASK_TYPE: &str = "print-filename";

type Constructor = Arc<dyn Fn() -> Arc<dyn Pipeline> + Send + Sync>;

/// `taskType -> Pipeline` registry. `"default"` is always registered;
/// [`Registry::get`] never fails, falling back to the default pipeline's
/// constructor for unknown task types.
pub struct Registry {
    entries: RwLock<HashMap<String, Constructor>>,
    default_constructor: Constructor,
}

impl Registry {
    /// Builds a registry pre-populated with `"default"` (the full PDF
    /// pipeline built from `default_pipeline`) and `"print-filename"` (the
    /// debug pipeline).
    #[must_use]
    pub fn new(default_pipeline: Arc<DefaultPdfPipeline>) -> Self {
        let default_constructor: Constructor = {
            let pipeline = default_pipeline;
            Arc::new(move || pipeline.clone() as Arc<dyn Pipeline>)
        };

        let mut entries: HashMap<String, Constructor> = HashMap::new();
        entries.insert(DEFAULT_TASK_TYPE.to_string(), default_constructor.clone());
        entries.insert(
            PRINT_FILENAME_TASK_TYPE.to_string(),
            Arc::new(|| Arc::new(PrintFilenamePipeline) as Arc<dyn Pipeline>),
        );

        Self {
            entries: RwLock::new(entries),
            default_constructor,
        }
    }

    /// Registers (or replaces) the constructor for `task_type`.
    pub fn add_entry(&self, task_type: impl Into<String>, constructor: Constructor) {
        self.entries.write().insert(task_type.into(), constructor);
    }

    /// Resolves `task_type` to a pipeline instance. Falls back to the
    /// default pipeline for an unregistered task type; never panics.
    #[must_use]
    pub fn get(&self, task_type: &str) -> Arc<dyn Pipeline> {
        match self.entries.read().get(task_type) {
            Some(constructor) => constructor(),
            None => (self.default_constructor)(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docprep_models::{LlmChunkerConfig, ModelLoader};
    use docprep_storage::{BucketPolicy, LocalStorage, ObjectStore};

    fn registry() -> Registry {
        let storage: Arc<dyn ObjectStore> = Arc::new(LocalStorage::new(
            std::env::temp_dir(),
            BucketPolicy::new("pdfs", "prep"),
        ));
        let model_loader = Arc::new(ModelLoader::new(LlmChunkerConfig {
            api_base: "http://127.0.0.1:0".to_string(),
            api_key: "k".to_string(),
            model_name: "m".to_string(),
        }));
        let default_pipeline = Arc::new(DefaultPdfPipeline::new(model_loader, storage, None));
        Registry::new(default_pipeline)
    }

    #[test]
    fn unknown_task_type_falls_back_to_default_pipeline_instead_of_panicking() {
        let registry = registry();
        let _pipeline = registry.get("some-task-type-nobody-registered");
    }

    #[test]
    fn print_filename_is_registered_out_of_the_box() {
        let registry = registry();
        let _pipeline = registry.get(PRINT_FILENAME_TASK_TYPE);
    }

    #[test]
    fn custom_entries_can_be_added() {
        let registry = registry();
        registry.add_entry("custom", Arc::new(|| Arc::new(PrintFilenamePipeline) as Arc<dyn Pipeline>));
        let _pipeline = registry.get("custom");
    }
}
