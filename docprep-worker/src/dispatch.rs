//! The cross-thread hand-off shapes: what goes into the bounded submit
//! channel and what comes back out of the completion channel.

use docprep_core::{IngestError, Task};

/// One delivery, paired with an opaque handle the consumer uses to later
/// ack/nack it. `H` is deliberately generic: this crate has no notion of an
/// AMQP delivery tag, only that the consumer needs its handle back
/// unchanged alongside the outcome.
pub struct WorkItem<H> {
    pub task: Task,
    pub handle: H,
}

impl<H> WorkItem<H> {
    #[must_use]
    pub fn new(task: Task, handle: H) -> Self {
        Self { task, handle }
    }
}

/// What a pipeline run produced, from the consumer's point of view.
#[derive(Debug)]
pub enum Outcome {
    Done,
    Failed(IngestError),
}

impl Outcome {
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Sent back on the completion channel once a worker finishes a `WorkItem`.
pub struct Completion<H> {
    pub handle: H,
    pub outcome: Outcome,
}
