//! Client for the public SAJ (TJAM) process lookup.
//!
//! A lookup either settles the process ([`PrimaryOutcome::Terminal`]) or reports
//! why PROJUDI has to be consulted instead ([`PrimaryOutcome::Escalate`]).
//! Transport problems never surface as errors: they become escalations.

pub mod config;
pub mod metrics_defs;
mod page;

pub use config::Config;
pub use metrics_defs::ALL_METRICS;
pub use page::inspect_page;

use shared::counter;
use shared::{ProcessNumber, Resolution};
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum SajError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("could not build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EscalationReason {
    /// The request failed before a status was received.
    Connection(String),
    Status(u16),
    Transferred,
    NoMovements,
    MovementsUnavailable,
}

impl EscalationReason {
    /// Short tag used for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationReason::Connection(_) => "connection",
            EscalationReason::Status(_) => "status",
            EscalationReason::Transferred => "transferred",
            EscalationReason::NoMovements => "no_movements",
            EscalationReason::MovementsUnavailable => "movements_unavailable",
        }
    }
}

impl fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EscalationReason::Connection(e) => write!(f, "connection error ({e})"),
            EscalationReason::Status(code) => write!(f, "HTTP status {code}"),
            EscalationReason::Transferred => f.write_str("process transferred to PROJUDI"),
            EscalationReason::NoMovements => f.write_str("no movements listed"),
            EscalationReason::MovementsUnavailable => f.write_str("movements could not be read"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrimaryOutcome {
    Terminal(Resolution),
    Escalate(EscalationReason),
}

pub struct SajClient {
    client: reqwest::Client,
    base_url: Url,
}

impl SajClient {
    pub fn new(config: &Config) -> Result<Self, SajError> {
        let base_url =
            Url::parse(&config.base_url).map_err(|e| SajError::InvalidUrl(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(SajClient { client, base_url })
    }

    pub fn lookup_url(&self, process_number: &ProcessNumber) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("processo.numero", process_number.as_str());
        url
    }

    pub async fn fetch(&self, process_number: &ProcessNumber) -> PrimaryOutcome {
        info!(process_number = %process_number, "querying SAJ");

        let outcome = match self.fetch_page(process_number).await {
            Ok(body) => inspect_page(&body),
            Err(reason) => PrimaryOutcome::Escalate(reason),
        };

        match &outcome {
            PrimaryOutcome::Terminal(_) => {
                counter!(metrics_defs::LOOKUPS, "outcome" => "terminal").increment(1);
            }
            PrimaryOutcome::Escalate(reason) => {
                info!(process_number = %process_number, %reason, "SAJ inconclusive, escalating to PROJUDI");
                counter!(metrics_defs::LOOKUPS, "outcome" => "escalate").increment(1);
                counter!(metrics_defs::ESCALATIONS, "reason" => reason.as_str()).increment(1);
            }
        }

        outcome
    }

    async fn fetch_page(&self, process_number: &ProcessNumber) -> Result<String, EscalationReason> {
        let response = self
            .client
            .get(self.lookup_url(process_number))
            .send()
            .await
            .map_err(|e| {
                warn!(process_number = %process_number, error = %e, "SAJ request failed");
                EscalationReason::Connection(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(process_number = %process_number, %status, "SAJ returned an error status");
            return Err(EscalationReason::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| EscalationReason::Connection(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Field, Sentinel};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const NUMBER: &str = "0000123-45.2020.8.04.0001";

    fn client_for(base_url: String) -> SajClient {
        SajClient::new(&Config {
            base_url,
            timeout_secs: 5,
            ..Default::default()
        })
        .unwrap()
    }

    async fn serve(status: u16, body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cpopg/show.do"))
            .and(query_param("processo.numero", NUMBER))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn test_lookup_url() {
        let client = client_for(config::DEFAULT_BASE_URL.into());
        assert_eq!(
            client.lookup_url(&ProcessNumber::new(NUMBER)).as_str(),
            "https://consultasaj.tjam.jus.br/cpopg/show.do?processo.numero=0000123-45.2020.8.04.0001"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = SajClient::new(&Config {
            base_url: "not a url".into(),
            ..Default::default()
        });
        assert!(matches!(result, Err(SajError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_terminal() {
        let server = serve(
            200,
            r#"<html><body><table id="tabelaTodasMovimentacoes">
                 <tr class="fundoClaro">
                   <td class="dataMovimentacao">12/03/2024</td>
                   <td class="descricaoMovimentacao">Conclusos para despacho</td>
                 </tr></table></body></html>"#,
        )
        .await;

        let client = client_for(format!("{}/cpopg/show.do", server.uri()));
        let outcome = client.fetch(&ProcessNumber::new(NUMBER)).await;

        assert_eq!(
            outcome,
            PrimaryOutcome::Terminal(Resolution::found(
                Field::Value("12/03/2024".into()),
                Field::Value("Conclusos para despacho".into()),
                Field::Missing(Sentinel::NotAvailable),
            ))
        );
    }

    #[tokio::test]
    async fn test_fetch_error_status_escalates() {
        let server = serve(500, "internal error").await;
        let client = client_for(format!("{}/cpopg/show.do", server.uri()));

        assert_eq!(
            client.fetch(&ProcessNumber::new(NUMBER)).await,
            PrimaryOutcome::Escalate(EscalationReason::Status(500))
        );
    }

    #[tokio::test]
    async fn test_fetch_transferred_escalates() {
        let server = serve(
            200,
            "<html><body><p>Processo transferido para o PROJUDI</p></body></html>",
        )
        .await;
        let client = client_for(format!("{}/cpopg/show.do", server.uri()));

        assert_eq!(
            client.fetch(&ProcessNumber::new(NUMBER)).await,
            PrimaryOutcome::Escalate(EscalationReason::Transferred)
        );
    }

    #[tokio::test]
    async fn test_fetch_connection_failure_escalates() {
        // Bind then release a port so nothing is listening on it.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = client_for(format!("http://127.0.0.1:{port}/cpopg/show.do"));
        let outcome = client.fetch(&ProcessNumber::new(NUMBER)).await;

        assert!(matches!(
            outcome,
            PrimaryOutcome::Escalate(EscalationReason::Connection(_))
        ));
    }
}
