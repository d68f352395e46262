//! The document-processing pipeline contract, its default PDF
//! implementation, and the task-type registry that dispatches to one.

pub mod pipeline;
pub mod registry;

pub use pipeline::{DefaultPdfPipeline, Pipeline, PrintFilenamePipeline, ProcessOutput};
pub use registry::Registry;
