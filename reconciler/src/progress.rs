use crate::batch::BatchSummary;
use shared::MovementResult;

/// Progress reporting for a batch run.
/// Frontends implement this to surface status to users.
pub trait Progress: Send {
    /// Called at the start with the number of inputs.
    fn begin(&mut self, _total: usize) {}

    /// Free-form status line for human eyes.
    fn log(&mut self, _msg: &str) {}

    /// Called after every input, whether it was looked up or not.
    fn item_done(&mut self, _done: usize, _total: usize, _result: &MovementResult) {}

    /// Called once at the end, cancelled or not.
    fn finish(&mut self, _summary: &BatchSummary) {}
}

/// A no-op progress sink.
pub struct NullProgress;
impl Progress for NullProgress {}
