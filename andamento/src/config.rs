use reconciler::BatchConfig;
use reconciler::credentials::{DEFAULT_PASSWORD_VAR, DEFAULT_USERNAME_VAR};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive. `RUST_LOG` takes precedence when set.
    pub level: String,
    pub sentry_dsn: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".into(),
            sentry_dsn: None,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
    #[serde(default = "default_metrics_prefix")]
    pub prefix: String,
}

fn default_metrics_prefix() -> String {
    "andamento".into()
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Plain-text fallback file. Defaults to the platform config directory.
    pub file: Option<PathBuf>,
    pub username_var: String,
    pub password_var: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        CredentialsConfig {
            file: None,
            username_var: DEFAULT_USERNAME_VAR.into(),
            password_var: DEFAULT_PASSWORD_VAR.into(),
        }
    }
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub metrics: Option<MetricsConfig>,
    pub saj: saj::Config,
    pub projudi: projudi::Config,
    pub batch: BatchConfig,
    pub credentials: CredentialsConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }

    /// Defaults apply when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Config::from_file(path),
            None => Ok(Config::default()),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    #[test]
    fn full_config() {
        let yaml = r#"
            logging:
                level: debug
                sentry_dsn: https://key@sentry.example.com/1
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            saj:
                timeout_secs: 10
            projudi:
                webdriver_url: http://chromedriver:4444
                headless: false
                movements_backoff:
                    max_attempts: 4
            batch:
                pause_ms: 500
            credentials:
                file: /var/lib/andamento/credentials.yaml
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.metrics,
            Some(MetricsConfig {
                statsd_host: "127.0.0.1".into(),
                statsd_port: 8125,
                prefix: "andamento".into(),
            })
        );
        assert_eq!(config.saj.timeout_secs, 10);
        assert_eq!(config.saj.base_url, saj::config::DEFAULT_BASE_URL);
        assert_eq!(config.projudi.webdriver_url, "http://chromedriver:4444");
        assert!(!config.projudi.headless);
        assert_eq!(config.projudi.movements_backoff.max_attempts, 4);
        assert_eq!(config.batch.pause_ms, 500);
        assert_eq!(
            config.credentials.file,
            Some(PathBuf::from("/var/lib/andamento/credentials.yaml"))
        );
        assert_eq!(config.credentials.username_var, DEFAULT_USERNAME_VAR);
    }

    #[test]
    fn sections_default_when_absent() {
        let tmp = write_tmp_file("logging:\n    level: warn\n");
        let config = Config::from_file(tmp.path()).expect("load config");

        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.metrics, None);
        assert_eq!(config.projudi, projudi::Config::default());
        assert_eq!(config.batch.pause_ms, 2000);
        assert_eq!(Config::load(None).expect("defaults").saj.timeout_secs, 30);
    }

    #[test]
    fn parse_error() {
        let tmp = write_tmp_file("batch: [1, 2");
        assert!(matches!(
            Config::from_file(tmp.path()),
            Err(ConfigError::ParseError(_))
        ));
        assert!(matches!(
            Config::from_file(Path::new("/nonexistent/andamento.yaml")),
            Err(ConfigError::LoadError(_))
        ));
    }
}
