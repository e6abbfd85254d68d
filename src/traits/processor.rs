use crate::errors::PipelineError;
use crate::model::{Channel, Message, Task};

/// Stage logic bound to a task.
///
/// Lifecycle: `start` once, `receive` any number of times, `done` once. The framework
/// never runs two `receive` calls for the same task concurrently.
///
/// `receive` owns the message: it must either forward it with [`Channel::send`] or
/// release it before returning. Returning an error is fatal for the pipeline.
pub trait Processor: Send {
    /// Resolve and cache output sinks. Must be idempotent.
    fn start(&mut self, _task: &Task) -> Result<(), PipelineError> {
        Ok(())
    }

    fn receive(&mut self, channel: &Channel, message: Message) -> Result<(), PipelineError>;

    fn done(&mut self, _task: &Task) -> Result<(), PipelineError> {
        Ok(())
    }

    fn name(&self) -> &'static str;
}
