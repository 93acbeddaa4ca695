//! Decides which portal answers for each process number and runs whole batches.

pub mod batch;
pub mod credentials;
pub mod metrics_defs;
pub mod orchestrator;
pub mod progress;
pub mod tabular;

pub use batch::{BatchConfig, BatchReport, BatchRunner, BatchSummary};
pub use credentials::{
    CredentialError, CredentialStore, EnvCredentialStore, FallbackCredentialStore,
    FileCredentialStore,
};
pub use metrics_defs::ALL_METRICS;
pub use orchestrator::{PrimaryTier, Reconciler, SecondaryTier};
pub use progress::{NullProgress, Progress};
pub use tabular::{TabularError, read_process_numbers, write_results, write_results_file};
