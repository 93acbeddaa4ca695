//! Page objects for the PROJUDI web application.
//!
//! [`Portal`] is the seam between the lookup state machine and the browser.
//! [`WebDriverPortal`] implements it over a WebDriver [`Session`].

use crate::config::{Config, SettleDelays};
use crate::errors::AutomationError;
use crate::extract::CONFIDENTIAL_MARKER;
use crate::webdriver::{By, ElementRef, Session, Wait, WebDriver, WebDriverError};
use async_trait::async_trait;
use serde_json::{Value, json};
use shared::Credentials;
use std::time::Duration;
use tracing::debug;

const MAIN_FRAME_ID: &str = "mainFrame";
const USER_FRAME_NAME: &str = "userMainFrame";

const LOGIN_FIELD: &str = "login";
const PASSWORD_FIELD: &str = "senha";
const LOGIN_BUTTON: &str = "btEntrar";
const LOGIN_ERROR_MARKERS: &[&str] = &[
    "//font[@color='red']",
    "//*[contains(text(),'Usuário ou senha inválida')]",
    "//*[contains(text(),'Login inválido')]",
    "//*[contains(text(),'Problemas no login')]",
];

const SEARCH_MENU: &str = "Stm0p0i7eTX";
const FIRST_DEGREE_SEARCH_ENTRY: &str = "Stm0p7i0e";

const PROCESS_NUMBER_FIELD: &str = "numeroProcesso";
const SEARCH_BUTTON: &str = "pesquisar";
const NO_RECORDS_MARKER: &str = "//*[contains(text(), 'Nenhum registro encontrado')]";

const MOVEMENTS_TABLE: &str = "table.resultTable tbody";

/// Every step of the PROJUDI flow the state machine relies on.
///
/// Implementations keep whatever browser state the steps need between calls
/// (current frame, the result link) and release it in [`Portal::close`].
#[async_trait]
pub trait Portal: Send {
    async fn open_login(&mut self) -> Result<(), AutomationError>;

    async fn submit_login(&mut self, credentials: &Credentials) -> Result<(), AutomationError>;

    /// The text of a visible login error marker, if any.
    async fn login_error(&mut self) -> Result<Option<String>, AutomationError>;

    /// Hovers the menu trigger so the nested search entry becomes clickable.
    async fn reveal_search_menu(&mut self) -> Result<(), AutomationError>;

    async fn open_search(&mut self) -> Result<(), AutomationError>;

    /// Descends from the top document into the frame holding the page content.
    async fn enter_content_frame(&mut self) -> Result<(), AutomationError>;

    async fn fill_process_number(&mut self, number: &str) -> Result<(), AutomationError>;

    /// Sets the field's value by script, bypassing keyboard input.
    async fn force_process_number(&mut self, number: &str) -> Result<(), AutomationError>;

    async fn process_number_value(&mut self) -> Result<String, AutomationError>;

    async fn submit_search(&mut self) -> Result<(), AutomationError>;

    async fn no_records_visible(&mut self) -> Result<bool, AutomationError>;

    /// Waits for the row listing `number` and returns its outer HTML.
    /// `None` when the row never rendered.
    async fn result_row(&mut self, number: &str) -> Result<Option<String>, AutomationError>;

    /// Confidentiality marker anywhere on the current page.
    async fn confidential_marker_visible(&mut self) -> Result<bool, AutomationError>;

    /// Follows the link of the row returned by [`Portal::result_row`].
    async fn open_process(&mut self) -> Result<(), AutomationError>;

    /// Outer HTML of the movements table body, or `None` if it did not appear in time.
    async fn movements_table(&mut self) -> Result<Option<String>, AutomationError>;

    async fn scroll_to_bottom(&mut self) -> Result<(), AutomationError>;

    async fn close(&mut self) -> Result<(), AutomationError>;
}

/// Starts a fresh browser session for one lookup.
#[async_trait]
pub trait Launcher: Send + Sync {
    type Portal: Portal;

    async fn launch(&self) -> Result<Self::Portal, AutomationError>;
}

pub struct WebDriverLauncher {
    driver: WebDriver,
    config: Config,
}

impl WebDriverLauncher {
    pub fn new(config: Config) -> Result<Self, WebDriverError> {
        let driver = WebDriver::new(&config.webdriver_url, config.command_timeout())?;
        Ok(WebDriverLauncher { driver, config })
    }
}

/// Chrome capabilities for an eager-loading, optionally headless session.
pub fn chrome_capabilities(config: &Config) -> Value {
    let mut args = config.browser_args.clone();
    if config.headless {
        args.push("--headless=new".into());
    }
    json!({
        "alwaysMatch": {
            "browserName": "chrome",
            "pageLoadStrategy": "eager",
            "goog:chromeOptions": {
                "args": args,
                "excludeSwitches": ["enable-logging"],
            },
        },
    })
}

#[async_trait]
impl Launcher for WebDriverLauncher {
    type Portal = WebDriverPortal;

    async fn launch(&self) -> Result<WebDriverPortal, AutomationError> {
        let session = self
            .driver
            .new_session(chrome_capabilities(&self.config))
            .await?;
        debug!(session = session.id(), "browser session started");
        Ok(WebDriverPortal::new(session, self.config.clone()))
    }
}

pub struct WebDriverPortal {
    session: Session,
    config: Config,
    process_link: Option<ElementRef>,
}

impl WebDriverPortal {
    pub fn new(session: Session, config: Config) -> Self {
        WebDriverPortal {
            session,
            config,
            process_link: None,
        }
    }

    fn wait(&self) -> Wait {
        Wait::new(self.config.element_wait(), self.config.poll_interval())
    }

    fn delays(&self) -> &SettleDelays {
        &self.config.delays
    }

    async fn settle(&self, millis: u64) {
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }

    async fn process_number_field(&self) -> Result<ElementRef, AutomationError> {
        Ok(self.session.find(By::Id(PROCESS_NUMBER_FIELD)).await?)
    }

    async fn enter_frame(&self, by: By<'_>) -> Result<(), AutomationError> {
        match self.session.wait_enter_frame(by, self.wait()).await {
            Err(WebDriverError::Timeout(_)) => Err(AutomationError::FrameNotFound(by.to_string())),
            other => Ok(other?),
        }
    }
}

/// Quotes `value` as an XPath 1.0 string literal.
fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{value}'")
    } else if !value.contains('"') {
        format!("\"{value}\"")
    } else {
        let parts = value
            .split('\'')
            .map(|part| format!("'{part}'"))
            .collect::<Vec<_>>();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

#[async_trait]
impl Portal for WebDriverPortal {
    async fn open_login(&mut self) -> Result<(), AutomationError> {
        self.session.navigate(&self.config.portal_url).await?;
        self.settle(self.delays().login_ms).await;
        Ok(())
    }

    async fn submit_login(&mut self, credentials: &Credentials) -> Result<(), AutomationError> {
        self.enter_frame(By::Id(MAIN_FRAME_ID)).await?;

        let login = self
            .session
            .wait_visible(By::Id(LOGIN_FIELD), self.wait())
            .await?;
        self.session.clear(&login).await?;
        self.session.send_keys(&login, &credentials.username).await?;

        let password = self
            .session
            .wait_visible(By::Id(PASSWORD_FIELD), self.wait())
            .await?;
        self.session.clear(&password).await?;
        self.session
            .send_keys(&password, &credentials.password)
            .await?;

        let enter = self
            .session
            .wait_clickable(By::Id(LOGIN_BUTTON), self.wait())
            .await?;
        self.session.click(&enter).await?;
        self.settle(self.delays().login_ms).await;
        Ok(())
    }

    async fn login_error(&mut self) -> Result<Option<String>, AutomationError> {
        for marker in LOGIN_ERROR_MARKERS {
            for element in self.session.find_all(By::XPath(marker)).await? {
                match self.session.displayed(&element).await {
                    Ok(true) => return Ok(Some(self.session.text(&element).await?)),
                    Ok(false) | Err(WebDriverError::StaleElement(_)) => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(None)
    }

    async fn reveal_search_menu(&mut self) -> Result<(), AutomationError> {
        let menu = self
            .session
            .wait_visible(By::Id(SEARCH_MENU), self.wait())
            .await?;
        self.session.hover(&menu).await?;
        self.settle(self.delays().menu_ms).await;
        Ok(())
    }

    async fn open_search(&mut self) -> Result<(), AutomationError> {
        let entry = self
            .session
            .wait_clickable(By::Id(FIRST_DEGREE_SEARCH_ENTRY), self.wait())
            .await?;
        self.session.click(&entry).await?;
        Ok(())
    }

    async fn enter_content_frame(&mut self) -> Result<(), AutomationError> {
        self.session.switch_to_default().await?;
        self.settle(self.delays().frame_ms).await;
        self.enter_frame(By::Id(MAIN_FRAME_ID)).await?;
        self.enter_frame(By::Name(USER_FRAME_NAME)).await
    }

    async fn fill_process_number(&mut self, number: &str) -> Result<(), AutomationError> {
        let field = self
            .session
            .wait_clickable(By::Id(PROCESS_NUMBER_FIELD), self.wait())
            .await?;
        self.session.clear(&field).await?;
        self.session.send_keys(&field, number).await?;
        Ok(())
    }

    async fn force_process_number(&mut self, number: &str) -> Result<(), AutomationError> {
        let field = self.process_number_field().await?;
        self.session
            .execute(
                "arguments[0].value = arguments[1];",
                vec![field.to_json(), Value::String(number.to_string())],
            )
            .await?;
        Ok(())
    }

    async fn process_number_value(&mut self) -> Result<String, AutomationError> {
        let field = self.process_number_field().await?;
        Ok(self
            .session
            .property(&field, "value")
            .await?
            .unwrap_or_default())
    }

    async fn submit_search(&mut self) -> Result<(), AutomationError> {
        self.settle(self.delays().fill_ms).await;
        let button = self
            .session
            .wait_clickable(By::Id(SEARCH_BUTTON), self.wait())
            .await?;
        if let Err(e) = self.session.click(&button).await {
            debug!(error = %e, "search button click failed, clicking by script");
            self.session
                .execute("arguments[0].click();", vec![button.to_json()])
                .await?;
        }
        self.settle(self.delays().search_ms).await;
        Ok(())
    }

    async fn no_records_visible(&mut self) -> Result<bool, AutomationError> {
        let wait = Wait::new(self.config.marker_wait(), self.config.poll_interval());
        match self
            .session
            .wait_visible(By::XPath(NO_RECORDS_MARKER), wait)
            .await
        {
            Ok(_) => Ok(true),
            Err(WebDriverError::Timeout(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn result_row(&mut self, number: &str) -> Result<Option<String>, AutomationError> {
        let xpath = format!("//td[normalize-space()={}]", xpath_literal(number));
        let cell = match self
            .session
            .wait_clickable(By::XPath(&xpath), self.wait())
            .await
        {
            Ok(cell) => cell,
            Err(WebDriverError::Timeout(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let row = self
            .session
            .find_from(&cell, By::XPath("./ancestor::tr[1]"))
            .await?;
        let html = self
            .session
            .property(&row, "outerHTML")
            .await?
            .unwrap_or_default();

        self.process_link = match self.session.find_from(&cell, By::Tag("a")).await {
            Ok(link) => Some(link),
            Err(WebDriverError::NoSuchElement(_)) => Some(cell),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(html))
    }

    async fn confidential_marker_visible(&mut self) -> Result<bool, AutomationError> {
        let xpath = format!("//*[contains(text(), '{CONFIDENTIAL_MARKER}')]");
        for element in self.session.find_all(By::XPath(&xpath)).await? {
            if self.session.displayed(&element).await.unwrap_or(false) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn open_process(&mut self) -> Result<(), AutomationError> {
        let link = self
            .process_link
            .take()
            .ok_or_else(|| AutomationError::Unexpected("no result row selected".into()))?;
        self.session.click(&link).await?;
        self.settle(self.delays().detail_ms).await;
        Ok(())
    }

    async fn movements_table(&mut self) -> Result<Option<String>, AutomationError> {
        let wait = Wait::new(self.config.movements_wait(), self.config.poll_interval());
        let tbody = match self
            .session
            .wait_present(By::Css(MOVEMENTS_TABLE), wait)
            .await
        {
            Ok(tbody) => tbody,
            Err(WebDriverError::Timeout(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(self.session.property(&tbody, "outerHTML").await?)
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), AutomationError> {
        self.session
            .execute("window.scrollTo(0, document.body.scrollHeight);", Vec::new())
            .await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), AutomationError> {
        self.session.delete().await?;
        debug!(session = self.session.id(), "browser session closed");
        Ok(())
    }
}
