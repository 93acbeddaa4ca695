use crate::webdriver::WebDriverError;
use shared::Sentinel;

/// Why a PROJUDI lookup stopped before producing a movement.
#[derive(thiserror::Error, Debug)]
pub enum AutomationError {
    #[error("login rejected: {0}")]
    InvalidCredentials(String),
    #[error("content frame not found: {0}")]
    FrameNotFound(String),
    #[error("process number field holds {actual:?} after a forced fill")]
    FillMismatch { actual: String },
    #[error("process not listed after search")]
    ProcessNotListed,
    #[error("movements table not found after {attempts} attempts")]
    MovementsTableNotFound { attempts: u32 },
    #[error("movements table has no rows")]
    NoMovements,
    #[error("element not found: {0}")]
    ElementNotFound(String),
    #[error("stale element: {0}")]
    StaleElement(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error(transparent)]
    WebDriver(WebDriverError),
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl AutomationError {
    pub fn sentinel(&self) -> Sentinel {
        match self {
            AutomationError::InvalidCredentials(_) => Sentinel::InvalidCredentials,
            AutomationError::FrameNotFound(_) => Sentinel::FrameNotFound,
            AutomationError::FillMismatch { .. } => Sentinel::FillError,
            AutomationError::ProcessNotListed => Sentinel::ProcessNotListed,
            AutomationError::MovementsTableNotFound { .. } => Sentinel::MovementsTableNotFound,
            AutomationError::NoMovements => Sentinel::NoMovements,
            AutomationError::ElementNotFound(_) => Sentinel::ElementNotFound,
            AutomationError::StaleElement(_) => Sentinel::StaleElement,
            AutomationError::Timeout(_) => Sentinel::Timeout,
            AutomationError::WebDriver(_) => Sentinel::WebDriver,
            AutomationError::Unexpected(_) => Sentinel::General,
        }
    }

    /// Worth another attempt at a retried step.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AutomationError::ElementNotFound(_)
                | AutomationError::StaleElement(_)
                | AutomationError::Timeout(_)
        )
    }
}

impl From<WebDriverError> for AutomationError {
    fn from(e: WebDriverError) -> Self {
        match e {
            WebDriverError::NoSuchElement(msg) => AutomationError::ElementNotFound(msg),
            WebDriverError::NoSuchFrame(msg) => AutomationError::FrameNotFound(msg),
            WebDriverError::StaleElement(msg) => AutomationError::StaleElement(msg),
            WebDriverError::Timeout(msg) => AutomationError::Timeout(msg),
            other => AutomationError::WebDriver(other),
        }
    }
}
