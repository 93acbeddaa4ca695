use reconciler::{BatchSummary, Progress};
use shared::MovementResult;
use tracing::{info, warn};

/// Reports batch progress through the log.
#[derive(Debug, Default)]
pub struct LogProgress;

impl Progress for LogProgress {
    fn begin(&mut self, total: usize) {
        info!(total, "starting batch");
    }

    fn log(&mut self, msg: &str) {
        info!("{msg}");
    }

    fn item_done(&mut self, done: usize, total: usize, result: &MovementResult) {
        let tier = result.tier.map_or("none", |t| t.as_str());
        if result.is_failure() {
            warn!(
                process_number = %result.process_number,
                tier,
                "[{done}/{total}] {}",
                result.description
            );
        } else {
            info!(
                process_number = %result.process_number,
                tier,
                "[{done}/{total}] {} {}",
                result.date,
                result.description
            );
        }
    }

    fn finish(&mut self, summary: &BatchSummary) {
        info!(
            total = summary.total,
            invalid = summary.invalid,
            primary = summary.primary,
            secondary = summary.secondary,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "batch finished"
        );
    }
}
