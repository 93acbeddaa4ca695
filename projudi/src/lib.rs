//! PROJUDI lookup through browser automation.
//!
//! Every call to [`Projudi::fetch_via_automation`] owns one browser session from
//! launch to close. The session is closed exactly once whatever the outcome,
//! panics included, and every failure is reported as a sentinel in the
//! returned [`Resolution`].

pub mod automation;
pub mod backoff;
pub mod config;
pub mod errors;
pub mod extract;
pub mod metrics_defs;
pub mod pages;
#[cfg(any(test, feature = "testutils"))]
pub mod testutils;
pub mod webdriver;

pub use automation::{Automation, Stage};
pub use backoff::Backoff;
pub use config::Config;
pub use errors::AutomationError;
pub use metrics_defs::ALL_METRICS;
pub use pages::{Launcher, Portal, WebDriverLauncher, WebDriverPortal};

use futures::FutureExt;
use shared::{counter, histogram};
use shared::{Credentials, ProcessNumber, Resolution, Sentinel};
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{error, info, warn};
use webdriver::WebDriverError;

pub struct Projudi<L = WebDriverLauncher> {
    launcher: L,
    backoff: Backoff,
}

impl Projudi<WebDriverLauncher> {
    pub fn new(config: Config) -> Result<Self, WebDriverError> {
        let backoff = config.movements_backoff.clone();
        Ok(Projudi {
            launcher: WebDriverLauncher::new(config)?,
            backoff,
        })
    }
}

impl<L: Launcher> Projudi<L> {
    pub fn with_launcher(launcher: L, backoff: Backoff) -> Self {
        Projudi { launcher, backoff }
    }

    pub async fn fetch_via_automation(
        &self,
        process_number: &ProcessNumber,
        credentials: Option<&Credentials>,
    ) -> Resolution {
        let Some(credentials) = credentials.filter(|c| c.is_complete()) else {
            warn!(process_number = %process_number, "PROJUDI credentials not provided, skipping browser session");
            counter!(metrics_defs::SKIPPED).increment(1);
            return Resolution::failure(Sentinel::CredentialsNotProvided);
        };

        info!(process_number = %process_number, "querying PROJUDI");
        let started = Instant::now();

        let mut portal = match self.launcher.launch().await {
            Ok(portal) => portal,
            Err(e) => {
                error!(process_number = %process_number, error = %e, "could not start a browser session");
                counter!(metrics_defs::SESSIONS, "outcome" => "launch_failed").increment(1);
                return Resolution::failure(e.sentinel());
            }
        };

        let outcome = AssertUnwindSafe(
            Automation::new(&mut portal, &self.backoff, process_number).run(credentials),
        )
        .catch_unwind()
        .await;

        if let Err(e) = portal.close().await {
            warn!(process_number = %process_number, error = %e, "failed to close browser session");
        }
        histogram!(metrics_defs::SESSION_DURATION).record(started.elapsed().as_secs_f64());

        let resolution = match outcome {
            Ok(Ok(resolution)) => resolution,
            Ok(Err(e)) => {
                error!(process_number = %process_number, error = %e, "PROJUDI lookup failed");
                Resolution::failure(e.sentinel())
            }
            Err(_) => {
                error!(process_number = %process_number, "PROJUDI lookup panicked");
                Resolution::failure(Sentinel::General)
            }
        };

        let outcome = resolution.reason().map_or("resolved", |s| s.code());
        counter!(metrics_defs::SESSIONS, "outcome" => outcome).increment(1);
        resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Field;
    use std::time::Duration;
    use crate::testutils::{CONFIDENTIAL_ROW, Calls, Script, ScriptedLauncher};

    const NUMBER: &str = "0000123-45.2020.8.04.0001";

    async fn fetch(script: Script, credentials: Option<Credentials>) -> (Resolution, Calls) {
        let launcher = ScriptedLauncher::new(script);
        let calls = launcher.calls();
        let projudi = Projudi::with_launcher(launcher, Backoff::fixed(3, Duration::ZERO));
        let resolution = projudi
            .fetch_via_automation(&ProcessNumber::new(NUMBER), credentials.as_ref())
            .await;
        (resolution, calls)
    }

    fn valid() -> Option<Credentials> {
        Some(Credentials::new("user", "secret"))
    }

    #[tokio::test]
    async fn test_missing_credentials_never_launch() {
        for credentials in [None, Some(Credentials::new("", "")), Some(Credentials::new("user", ""))] {
            let (resolution, calls) = fetch(Script::default(), credentials).await;
            assert_eq!(
                resolution,
                Resolution::failure(Sentinel::CredentialsNotProvided)
            );
            assert_eq!(calls.launches(), 0);
            assert_eq!(calls.closes(), 0);
        }
    }

    #[tokio::test]
    async fn test_session_closed_once_for_every_outcome() {
        let scripts = [
            (Script::default(), None),
            (
                Script {
                    login_error: Some("Login inválido".into()),
                    ..Script::default()
                },
                Some(Sentinel::InvalidCredentials),
            ),
            (
                Script {
                    no_records: true,
                    ..Script::default()
                },
                Some(Sentinel::ProcessNotFound),
            ),
            (
                Script {
                    row: None,
                    ..Script::default()
                },
                Some(Sentinel::ProcessNotListed),
            ),
            (
                Script {
                    row: Some(CONFIDENTIAL_ROW.into()),
                    ..Script::default()
                },
                Some(Sentinel::Confidential),
            ),
            (
                Script {
                    tables: vec![None],
                    ..Script::default()
                },
                Some(Sentinel::MovementsTableNotFound),
            ),
            (
                Script {
                    panic_on_search: true,
                    ..Script::default()
                },
                Some(Sentinel::General),
            ),
            (
                Script {
                    close_fails: true,
                    ..Script::default()
                },
                None,
            ),
        ];

        for (script, expected) in scripts {
            let (resolution, calls) = fetch(script.clone(), valid()).await;
            assert_eq!(resolution.reason(), expected, "{script:?}");
            assert_eq!(calls.launches(), 1);
            assert_eq!(calls.closes(), 1, "{script:?}");
        }
    }

    #[tokio::test]
    async fn test_confidential_row() {
        let (resolution, _) = fetch(
            Script {
                row: Some(CONFIDENTIAL_ROW.into()),
                ..Script::default()
            },
            valid(),
        )
        .await;
        assert_eq!(
            resolution,
            Resolution::found(
                Field::Missing(Sentinel::NotAvailable),
                Field::Missing(Sentinel::Confidential),
                Field::Missing(Sentinel::NotAvailable),
            )
        );
    }

    #[tokio::test]
    async fn test_launch_failure() {
        let (resolution, calls) = fetch(
            Script {
                launch_fails: true,
                ..Script::default()
            },
            valid(),
        )
        .await;
        assert_eq!(resolution, Resolution::failure(Sentinel::WebDriver));
        assert_eq!(calls.launches(), 1);
        assert_eq!(calls.closes(), 0);
    }
}
