//! Minimal W3C WebDriver client.
//!
//! Covers the commands the PROJUDI flow needs against a WebDriver server such as
//! chromedriver: sessions, navigation, frames, element lookup and interaction,
//! script execution and pointer actions.

use reqwest::Method;
use serde_json::{Map, Value, json};
use std::fmt;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use url::Url;

/// Key under which W3C WebDriver serializes element references.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

#[derive(thiserror::Error, Debug)]
pub enum WebDriverError {
    #[error("webdriver transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("no such element: {0}")]
    NoSuchElement(String),
    #[error("no such frame: {0}")]
    NoSuchFrame(String),
    #[error("stale element reference: {0}")]
    StaleElement(String),
    #[error("element not interactable: {0}")]
    NotInteractable(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("session not created: {0}")]
    SessionNotCreated(String),
    #[error("invalid session id: {0}")]
    InvalidSession(String),
    #[error("webdriver error {code}: {message}")]
    Other { code: String, message: String },
    #[error("malformed webdriver response: {0}")]
    Malformed(String),
}

impl WebDriverError {
    fn from_w3c(code: &str, message: String) -> Self {
        match code {
            "no such element" => WebDriverError::NoSuchElement(message),
            "no such frame" => WebDriverError::NoSuchFrame(message),
            "stale element reference" => WebDriverError::StaleElement(message),
            "element not interactable" | "element click intercepted" => {
                WebDriverError::NotInteractable(message)
            }
            "timeout" | "script timeout" => WebDriverError::Timeout(message),
            "session not created" => WebDriverError::SessionNotCreated(message),
            "invalid session id" => WebDriverError::InvalidSession(message),
            _ => WebDriverError::Other {
                code: code.to_string(),
                message,
            },
        }
    }

    // Errors that a polling wait treats as "not yet".
    fn is_transient(&self) -> bool {
        matches!(
            self,
            WebDriverError::NoSuchElement(_)
                | WebDriverError::NoSuchFrame(_)
                | WebDriverError::StaleElement(_)
        )
    }
}

/// Element location strategy. `Id` and `Name` are translated to CSS selectors.
#[derive(Clone, Copy, Debug)]
pub enum By<'a> {
    Css(&'a str),
    XPath(&'a str),
    Id(&'a str),
    Name(&'a str),
    Tag(&'a str),
}

impl By<'_> {
    fn locator(&self) -> Value {
        let (using, value) = match self {
            By::Css(css) => ("css selector", css.to_string()),
            By::XPath(xpath) => ("xpath", xpath.to_string()),
            By::Id(id) => ("css selector", format!("[id=\"{id}\"]")),
            By::Name(name) => ("css selector", format!("[name=\"{name}\"]")),
            By::Tag(tag) => ("tag name", tag.to_string()),
        };
        json!({ "using": using, "value": value })
    }
}

impl fmt::Display for By<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            By::Css(css) => write!(f, "css `{css}`"),
            By::XPath(xpath) => write!(f, "xpath `{xpath}`"),
            By::Id(id) => write!(f, "id `{id}`"),
            By::Name(name) => write!(f, "name `{name}`"),
            By::Tag(tag) => write!(f, "tag `{tag}`"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementRef(String);

impl ElementRef {
    pub fn id(&self) -> &str {
        &self.0
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert(ELEMENT_KEY.to_string(), Value::String(self.0.clone()));
        Value::Object(map)
    }

    fn from_json(value: &Value) -> Result<Self, WebDriverError> {
        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(|id| ElementRef(id.to_string()))
            .ok_or_else(|| WebDriverError::Malformed(format!("not an element: {value}")))
    }
}

/// Bounds a condition-based wait.
#[derive(Clone, Copy, Debug)]
pub struct Wait {
    pub timeout: Duration,
    pub poll: Duration,
}

impl Wait {
    pub fn new(timeout: Duration, poll: Duration) -> Self {
        Wait { timeout, poll }
    }
}

#[derive(Clone, Copy, Debug)]
enum Condition {
    Present,
    Visible,
    Clickable,
}

async fn call(
    client: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<Value, WebDriverError> {
    let request = client.request(method, url);
    let request = match body {
        Some(body) => request.json(&body),
        None => request,
    };

    let response = request.send().await?;
    let status = response.status();
    let value = match response.json::<Value>().await? {
        Value::Object(mut payload) => payload.remove("value").unwrap_or(Value::Null),
        other => return Err(WebDriverError::Malformed(other.to_string())),
    };

    if let Some(code) = value.get("error").and_then(Value::as_str) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(WebDriverError::from_w3c(code, message));
    }
    if !status.is_success() {
        return Err(WebDriverError::Other {
            code: status.to_string(),
            message: value.to_string(),
        });
    }

    Ok(value)
}

/// Connection to a WebDriver server.
#[derive(Clone)]
pub struct WebDriver {
    client: reqwest::Client,
    base_url: String,
}

impl WebDriver {
    /// `timeout` bounds every command sent through this connection.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, WebDriverError> {
        Url::parse(base_url).map_err(|e| WebDriverError::InvalidUrl(e.to_string()))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(WebDriver {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn new_session(&self, capabilities: Value) -> Result<Session, WebDriverError> {
        let url = format!("{}/session", self.base_url);
        let body = json!({ "capabilities": capabilities });
        let value = call(&self.client, Method::POST, &url, Some(body)).await?;

        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| WebDriverError::Malformed(format!("missing sessionId: {value}")))?;

        Ok(Session {
            client: self.client.clone(),
            url: format!("{url}/{id}"),
            id: id.to_string(),
        })
    }
}

/// One browser session. Every command is scoped to it.
pub struct Session {
    client: reqwest::Client,
    url: String,
    id: String,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, WebDriverError> {
        let url = format!("{}{}", self.url, path);
        call(&self.client, method, &url, body).await
    }

    pub async fn navigate(&self, url: &str) -> Result<(), WebDriverError> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    pub async fn switch_to_default(&self) -> Result<(), WebDriverError> {
        self.command(Method::POST, "/frame", Some(json!({ "id": null })))
            .await?;
        Ok(())
    }

    pub async fn switch_to_frame(&self, frame: &ElementRef) -> Result<(), WebDriverError> {
        self.command(Method::POST, "/frame", Some(json!({ "id": frame.to_json() })))
            .await?;
        Ok(())
    }

    pub async fn find(&self, by: By<'_>) -> Result<ElementRef, WebDriverError> {
        let value = self
            .command(Method::POST, "/element", Some(by.locator()))
            .await?;
        ElementRef::from_json(&value)
    }

    pub async fn find_all(&self, by: By<'_>) -> Result<Vec<ElementRef>, WebDriverError> {
        let value = self
            .command(Method::POST, "/elements", Some(by.locator()))
            .await?;
        value
            .as_array()
            .ok_or_else(|| WebDriverError::Malformed(format!("expected a list: {value}")))?
            .iter()
            .map(ElementRef::from_json)
            .collect()
    }

    pub async fn find_from(
        &self,
        parent: &ElementRef,
        by: By<'_>,
    ) -> Result<ElementRef, WebDriverError> {
        let path = format!("/element/{}/element", parent.id());
        let value = self.command(Method::POST, &path, Some(by.locator())).await?;
        ElementRef::from_json(&value)
    }

    pub async fn text(&self, element: &ElementRef) -> Result<String, WebDriverError> {
        let path = format!("/element/{}/text", element.id());
        let value = self.command(Method::GET, &path, None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// `None` when the property is unset or not a string.
    pub async fn property(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, WebDriverError> {
        let path = format!("/element/{}/property/{}", element.id(), name);
        let value = self.command(Method::GET, &path, None).await?;
        Ok(value.as_str().map(str::to_string))
    }

    pub async fn displayed(&self, element: &ElementRef) -> Result<bool, WebDriverError> {
        let path = format!("/element/{}/displayed", element.id());
        let value = self.command(Method::GET, &path, None).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    pub async fn enabled(&self, element: &ElementRef) -> Result<bool, WebDriverError> {
        let path = format!("/element/{}/enabled", element.id());
        let value = self.command(Method::GET, &path, None).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    pub async fn clear(&self, element: &ElementRef) -> Result<(), WebDriverError> {
        let path = format!("/element/{}/clear", element.id());
        self.command(Method::POST, &path, Some(json!({}))).await?;
        Ok(())
    }

    pub async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), WebDriverError> {
        let path = format!("/element/{}/value", element.id());
        self.command(Method::POST, &path, Some(json!({ "text": text })))
            .await?;
        Ok(())
    }

    pub async fn click(&self, element: &ElementRef) -> Result<(), WebDriverError> {
        let path = format!("/element/{}/click", element.id());
        self.command(Method::POST, &path, Some(json!({}))).await?;
        Ok(())
    }

    pub async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, WebDriverError> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
        .await
    }

    /// Moves the pointer over the element's center.
    pub async fn hover(&self, element: &ElementRef) -> Result<(), WebDriverError> {
        let actions = json!({
            "actions": [{
                "type": "pointer",
                "id": "mouse",
                "parameters": { "pointerType": "mouse" },
                "actions": [{
                    "type": "pointerMove",
                    "duration": 100,
                    "origin": element.to_json(),
                    "x": 0,
                    "y": 0,
                }],
            }],
        });
        self.command(Method::POST, "/actions", Some(actions)).await?;
        Ok(())
    }

    pub async fn delete(&self) -> Result<(), WebDriverError> {
        self.command(Method::DELETE, "", None).await?;
        Ok(())
    }

    pub async fn wait_present(&self, by: By<'_>, wait: Wait) -> Result<ElementRef, WebDriverError> {
        self.wait_for(by, Condition::Present, wait).await
    }

    pub async fn wait_visible(&self, by: By<'_>, wait: Wait) -> Result<ElementRef, WebDriverError> {
        self.wait_for(by, Condition::Visible, wait).await
    }

    pub async fn wait_clickable(
        &self,
        by: By<'_>,
        wait: Wait,
    ) -> Result<ElementRef, WebDriverError> {
        self.wait_for(by, Condition::Clickable, wait).await
    }

    /// Waits for a frame element and switches into it.
    pub async fn wait_enter_frame(&self, by: By<'_>, wait: Wait) -> Result<(), WebDriverError> {
        let deadline = Instant::now() + wait.timeout;
        loop {
            match self.probe(by, Condition::Present).await {
                Ok(Some(frame)) => match self.switch_to_frame(&frame).await {
                    Ok(()) => return Ok(()),
                    Err(e) if e.is_transient() => {}
                    Err(e) => return Err(e),
                },
                Ok(None) => {}
                Err(e) => return Err(e),
            }
            if Instant::now() >= deadline {
                return Err(WebDriverError::Timeout(format!("waiting for frame {by}")));
            }
            sleep(wait.poll).await;
        }
    }

    async fn wait_for(
        &self,
        by: By<'_>,
        condition: Condition,
        wait: Wait,
    ) -> Result<ElementRef, WebDriverError> {
        let deadline = Instant::now() + wait.timeout;
        loop {
            if let Some(element) = self.probe(by, condition).await? {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(WebDriverError::Timeout(format!(
                    "waiting for {by} to be {condition:?}"
                )));
            }
            sleep(wait.poll).await;
        }
    }

    async fn probe(
        &self,
        by: By<'_>,
        condition: Condition,
    ) -> Result<Option<ElementRef>, WebDriverError> {
        match self.check(by, condition).await {
            Err(e) if e.is_transient() => Ok(None),
            other => other,
        }
    }

    async fn check(
        &self,
        by: By<'_>,
        condition: Condition,
    ) -> Result<Option<ElementRef>, WebDriverError> {
        let element = self.find(by).await?;
        let ready = match condition {
            Condition::Present => true,
            Condition::Visible => self.displayed(&element).await?,
            Condition::Clickable => {
                self.displayed(&element).await? && self.enabled(&element).await?
            }
        };
        Ok(ready.then_some(element))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn element(id: &str) -> Value {
        json!({ "value": ElementRef(id.to_string()).to_json() })
    }

    async fn session(server: &MockServer) -> Session {
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": { "sessionId": "s1", "capabilities": {} }
            })))
            .mount(server)
            .await;

        WebDriver::new(&server.uri(), Duration::from_secs(5))
            .unwrap()
            .new_session(json!({}))
            .await
            .unwrap()
    }

    fn quick() -> Wait {
        Wait::new(Duration::from_millis(200), Duration::from_millis(20))
    }

    #[tokio::test]
    async fn test_new_session() {
        let server = MockServer::start().await;
        let session = session(&server).await;
        assert_eq!(session.id(), "s1");
    }

    #[tokio::test]
    async fn test_find_and_read() {
        let server = MockServer::start().await;
        let session = session(&server).await;

        Mock::given(method("POST"))
            .and(path("/session/s1/element"))
            .and(body_json(json!({ "using": "css selector", "value": "[id=\"numeroProcesso\"]" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(element("e1")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/session/s1/element/e1/property/value"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "value": "0000123" })),
            )
            .mount(&server)
            .await;

        let field = session.find(By::Id("numeroProcesso")).await.unwrap();
        assert_eq!(field.id(), "e1");
        assert_eq!(
            session.property(&field, "value").await.unwrap().as_deref(),
            Some("0000123")
        );
    }

    #[tokio::test]
    async fn test_error_codes_are_typed() {
        let server = MockServer::start().await;
        let session = session(&server).await;

        Mock::given(method("POST"))
            .and(path("/session/s1/element"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "value": { "error": "no such element", "message": "Unable to locate element" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/session/s1/element/e1/click"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "value": { "error": "element click intercepted", "message": "covered" }
            })))
            .mount(&server)
            .await;

        assert!(matches!(
            session.find(By::Css("table.resultTable tbody")).await,
            Err(WebDriverError::NoSuchElement(_))
        ));
        assert!(matches!(
            session.click(&ElementRef("e1".into())).await,
            Err(WebDriverError::NotInteractable(_))
        ));
    }

    #[tokio::test]
    async fn test_wait_times_out_when_element_never_appears() {
        let server = MockServer::start().await;
        let session = session(&server).await;

        Mock::given(method("POST"))
            .and(path("/session/s1/element"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "value": { "error": "no such element", "message": "" }
            })))
            .mount(&server)
            .await;

        let result = session
            .wait_visible(By::XPath("//*[contains(text(), 'Nenhum registro encontrado')]"), quick())
            .await;
        assert!(matches!(result, Err(WebDriverError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_wait_clickable() {
        let server = MockServer::start().await;
        let session = session(&server).await;

        Mock::given(method("POST"))
            .and(path("/session/s1/element"))
            .respond_with(ResponseTemplate::new(200).set_body_json(element("btn")))
            .mount(&server)
            .await;
        for check in ["displayed", "enabled"] {
            Mock::given(method("GET"))
                .and(path(format!("/session/s1/element/btn/{check}")))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": true })))
                .mount(&server)
                .await;
        }

        let button = session.wait_clickable(By::Id("pesquisar"), quick()).await.unwrap();
        assert_eq!(button.id(), "btn");
    }

    #[tokio::test]
    async fn test_delete_session() {
        let server = MockServer::start().await;
        let session = session(&server).await;

        Mock::given(method("DELETE"))
            .and(path("/session/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
            .expect(1)
            .mount(&server)
            .await;

        session.delete().await.unwrap();
    }

    #[tokio::test]
    async fn test_hung_server_hits_command_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "value": { "sessionId": "s1" } }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let driver = WebDriver::new(&server.uri(), Duration::from_millis(200)).unwrap();
        let started = std::time::Instant::now();
        let result = driver.new_session(json!({})).await;

        assert!(matches!(result, Err(WebDriverError::Transport(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
