use crate::backoff::Backoff;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_PORTAL_URL: &str = "https://projudi.tjam.jus.br/projudi/";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://127.0.0.1:9515";

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub portal_url: String,
    /// A running WebDriver server, e.g. chromedriver.
    pub webdriver_url: String,
    pub headless: bool,
    pub browser_args: Vec<String>,
    /// Bound on every condition-based wait unless a more specific one applies.
    pub element_wait_ms: u64,
    /// How long to look for the "no records" marker after a search.
    pub marker_wait_ms: u64,
    /// Per-attempt wait for the movements table.
    pub movements_wait_ms: u64,
    pub poll_interval_ms: u64,
    /// Upper bound on a single WebDriver command, session creation included.
    pub command_timeout_ms: u64,
    pub delays: SettleDelays,
    pub movements_backoff: Backoff,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            portal_url: DEFAULT_PORTAL_URL.into(),
            webdriver_url: DEFAULT_WEBDRIVER_URL.into(),
            headless: true,
            browser_args: [
                "--window-size=1920,1080",
                "--disable-gpu",
                "--disable-dev-shm-usage",
                "--no-sandbox",
                "--disable-extensions",
                "--log-level=3",
            ]
            .map(String::from)
            .to_vec(),
            element_wait_ms: 30_000,
            marker_wait_ms: 3_000,
            movements_wait_ms: 45_000,
            poll_interval_ms: 250,
            command_timeout_ms: 60_000,
            delays: SettleDelays::default(),
            movements_backoff: Backoff::default(),
        }
    }
}

impl Config {
    pub fn element_wait(&self) -> Duration {
        Duration::from_millis(self.element_wait_ms)
    }

    pub fn marker_wait(&self) -> Duration {
        Duration::from_millis(self.marker_wait_ms)
    }

    pub fn movements_wait(&self) -> Duration {
        Duration::from_millis(self.movements_wait_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

/// Fixed pauses that let the portal's scripts catch up after an action.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SettleDelays {
    pub login_ms: u64,
    pub menu_ms: u64,
    pub frame_ms: u64,
    pub fill_ms: u64,
    pub search_ms: u64,
    pub detail_ms: u64,
}

impl Default for SettleDelays {
    fn default() -> Self {
        SettleDelays {
            login_ms: 3000,
            menu_ms: 2000,
            frame_ms: 1000,
            fill_ms: 1000,
            search_ms: 3000,
            detail_ms: 3000,
        }
    }
}

impl SettleDelays {
    /// All delays set to zero.
    pub fn none() -> Self {
        SettleDelays {
            login_ms: 0,
            menu_ms: 0,
            frame_ms: 0,
            fill_ms: 0,
            search_ms: 0,
            detail_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: Config = serde_yaml::from_str("headless: false").unwrap();
        assert!(!config.headless);
        assert_eq!(config.movements_wait(), Duration::from_secs(45));
        assert_eq!(config.delays.login_ms, 3000);
        assert_eq!(config.movements_backoff.max_attempts, 3);
        assert_eq!(config.command_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_nested_overrides() {
        let yaml = r#"
            delays:
              search_ms: 500
            movements_backoff:
              max_attempts: 5
        "#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.delays.search_ms, 500);
        assert_eq!(config.delays.menu_ms, 2000);
        assert_eq!(config.movements_backoff.max_attempts, 5);
        assert_eq!(config.movements_backoff.base_delay_ms, 2000);
    }
}
