use crate::metrics_defs;
use crate::orchestrator::{PrimaryTier, Reconciler, SecondaryTier};
use crate::progress::Progress;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use shared::{counter, gauge};
use shared::{Credentials, MovementResult, ProcessNumber, Sentinel, Tier};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatchConfig {
    /// Pause after each looked-up number before the next one starts.
    pub pause_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig { pause_ms: 2000 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub invalid: usize,
    pub primary: usize,
    pub secondary: usize,
    /// Results whose description is an error sentinel. Cancelled inputs are counted here too.
    pub failed: usize,
    pub cancelled: usize,
}

impl BatchSummary {
    fn record(&mut self, result: &MovementResult) {
        match result.description.sentinel() {
            Some(Sentinel::InvalidNumber) => self.invalid += 1,
            Some(Sentinel::Cancelled) => self.cancelled += 1,
            _ => {}
        }
        match result.tier {
            Some(Tier::Primary) => self.primary += 1,
            Some(Tier::Secondary) => self.secondary += 1,
            None => {}
        }
        if result.is_failure() {
            self.failed += 1;
        }
    }
}

pub struct BatchReport {
    pub results: Vec<MovementResult>,
    pub summary: BatchSummary,
}

/// Resolves a list of process numbers one after another, in input order.
///
/// Produces exactly one result per input. Invalid numbers are recorded without
/// querying either portal; once cancelled, the remaining valid numbers are
/// recorded as cancelled.
pub struct BatchRunner<P, S> {
    reconciler: Reconciler<P, S>,
    pause: Duration,
    cancelled: Arc<AtomicBool>,
}

impl<P: PrimaryTier, S: SecondaryTier> BatchRunner<P, S> {
    pub fn new(reconciler: Reconciler<P, S>, config: &BatchConfig) -> Self {
        BatchRunner {
            reconciler,
            pause: Duration::from_millis(config.pause_ms),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Setting the returned flag stops the run before the next lookup starts.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub async fn run(
        &self,
        numbers: Vec<ProcessNumber>,
        credentials: Option<&Credentials>,
        progress: &mut dyn Progress,
    ) -> BatchReport {
        let total = numbers.len();
        let mut results = Vec::with_capacity(total);
        let mut summary = BatchSummary {
            total,
            ..Default::default()
        };

        info!(total, "batch started");
        progress.begin(total);

        for (index, process_number) in numbers.into_iter().enumerate() {
            let position = index + 1;
            let result = if !process_number.is_valid() {
                counter!(metrics_defs::BATCH_ITEMS, "validity" => "invalid").increment(1);
                progress.log(&format!("[{position}/{total}] {process_number}: invalid process number, skipped"));
                MovementResult::invalid(process_number)
            } else if self.cancelled.load(Ordering::SeqCst) {
                counter!(metrics_defs::BATCH_ITEMS, "validity" => "cancelled").increment(1);
                MovementResult::unresolved(process_number, Sentinel::Cancelled)
            } else {
                counter!(metrics_defs::BATCH_ITEMS, "validity" => "valid").increment(1);
                progress.log(&format!("[{position}/{total}] looking up {process_number}"));
                let lookup = self.reconciler.resolve(&process_number, credentials);
                let result = match AssertUnwindSafe(lookup).catch_unwind().await {
                    Ok(result) => result,
                    Err(_) => {
                        error!(process_number = %process_number, "lookup panicked");
                        MovementResult::unresolved(process_number.clone(), Sentinel::General)
                    }
                };
                if position < total && !self.pause.is_zero() {
                    tokio::time::sleep(self.pause).await;
                }
                result
            };

            if result.is_failure() {
                warn!(process_number = %result.process_number, description = %result.description, "lookup failed");
            }
            summary.record(&result);
            progress.item_done(position, total, &result);
            gauge!(metrics_defs::BATCH_REMAINING).set((total - position) as f64);
            results.push(result);
        }

        if summary.cancelled > 0 {
            warn!(cancelled = summary.cancelled, "batch cancelled before completion");
        }
        info!(
            total = summary.total,
            invalid = summary.invalid,
            primary = summary.primary,
            secondary = summary.secondary,
            failed = summary.failed,
            "batch finished"
        );
        progress.finish(&summary);

        BatchReport { results, summary }
    }
}
