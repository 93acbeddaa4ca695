use crate::metrics_defs;
use async_trait::async_trait;
use projudi::{Launcher, Projudi};
use saj::{PrimaryOutcome, SajClient};
use shared::counter;
use shared::{Credentials, MovementResult, ProcessNumber, Resolution, Tier};
use tracing::info;

/// The cheap, stateless portal consulted first.
#[async_trait]
pub trait PrimaryTier: Send + Sync {
    async fn fetch(&self, process_number: &ProcessNumber) -> PrimaryOutcome;
}

/// The fallback portal. Returns a terminal answer for every call.
#[async_trait]
pub trait SecondaryTier: Send + Sync {
    async fn fetch_via_automation(
        &self,
        process_number: &ProcessNumber,
        credentials: Option<&Credentials>,
    ) -> Resolution;
}

#[async_trait]
impl PrimaryTier for SajClient {
    async fn fetch(&self, process_number: &ProcessNumber) -> PrimaryOutcome {
        SajClient::fetch(self, process_number).await
    }
}

#[async_trait]
impl<L: Launcher> SecondaryTier for Projudi<L> {
    async fn fetch_via_automation(
        &self,
        process_number: &ProcessNumber,
        credentials: Option<&Credentials>,
    ) -> Resolution {
        Projudi::fetch_via_automation(self, process_number, credentials).await
    }
}

/// Picks the tier that answers for a process number.
///
/// Whichever tier produces the terminal answer owns the whole result; nothing
/// read by SAJ is carried into an escalated lookup.
pub struct Reconciler<P, S> {
    primary: P,
    secondary: S,
}

impl<P: PrimaryTier, S: SecondaryTier> Reconciler<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Reconciler { primary, secondary }
    }

    pub async fn resolve(
        &self,
        process_number: &ProcessNumber,
        credentials: Option<&Credentials>,
    ) -> MovementResult {
        if !process_number.is_valid() {
            info!(process_number = %process_number, "invalid process number, not queried");
            counter!(metrics_defs::RESOLUTIONS, "tier" => "none").increment(1);
            return MovementResult::invalid(process_number.clone());
        }

        let (tier, resolution) = match self.primary.fetch(process_number).await {
            PrimaryOutcome::Terminal(resolution) => (Tier::Primary, resolution),
            PrimaryOutcome::Escalate(reason) => {
                info!(process_number = %process_number, %reason, "escalating to PROJUDI");
                let resolution = self
                    .secondary
                    .fetch_via_automation(process_number, credentials)
                    .await;
                (Tier::Secondary, resolution)
            }
        };

        info!(
            process_number = %process_number,
            tier = tier.as_str(),
            date = %resolution.date,
            description = %resolution.description,
            "process resolved"
        );
        counter!(metrics_defs::RESOLUTIONS, "tier" => tier.as_str()).increment(1);
        MovementResult::from_resolution(process_number.clone(), tier, resolution)
    }
}
