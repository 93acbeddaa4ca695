use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://consultasaj.tjam.jus.br/cpopg/show.do";

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Lookup page. The process number is appended as the `processo.numero` query parameter.
    pub base_url: String,
    /// Applies to the whole request, body included.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: 30,
            user_agent: concat!("andamento/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("timeout_secs: 5").unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }
}
