use crate::process_number::ProcessNumber;
use serde::Serialize;
use std::fmt;

/// Reserved placeholders standing in for values that could not be read.
///
/// Each variant renders as a bracketed upper-case phrase so that it can never
/// be mistaken for text taken from a portal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentinel {
    NotAvailable,
    DateNotFound,
    DescriptionNotFound,
    MovementNotFound,
    Confidential,
    InvalidNumber,
    ProcessNotFound,
    ProcessNotListed,
    CredentialsNotProvided,
    InvalidCredentials,
    FrameNotFound,
    FillError,
    MovementsTableNotFound,
    NoMovements,
    ElementNotFound,
    StaleElement,
    Timeout,
    WebDriver,
    General,
    Cancelled,
}

impl Sentinel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Sentinel::NotAvailable => "NÃO DISPONÍVEL",
            Sentinel::DateNotFound => "DATA NÃO ENCONTRADA",
            Sentinel::DescriptionNotFound => "DESCRIÇÃO NÃO ENCONTRADA",
            Sentinel::MovementNotFound => "MOVIMENTAÇÃO NÃO ENCONTRADA",
            Sentinel::Confidential => "SEGREDO DE JUSTIÇA",
            Sentinel::InvalidNumber => "NÚMERO DE PROCESSO INVÁLIDO",
            Sentinel::ProcessNotFound => "PROCESSO NÃO ENCONTRADO NO PROJUDI",
            Sentinel::ProcessNotListed => "PROCESSO NÃO LISTADO APÓS BUSCA NO PROJUDI",
            Sentinel::CredentialsNotProvided => "CREDENCIAIS DO PROJUDI NÃO FORNECIDAS",
            Sentinel::InvalidCredentials => "CREDENCIAIS DO PROJUDI INVÁLIDAS",
            Sentinel::FrameNotFound => "ERRO PROJUDI: FRAME NÃO ENCONTRADO",
            Sentinel::FillError => "ERRO PROJUDI: FALHA AO PREENCHER NÚMERO DO PROCESSO",
            Sentinel::MovementsTableNotFound => "ERRO PROJUDI: TABELA DE MOVIMENTAÇÕES NÃO ENCONTRADA",
            Sentinel::NoMovements => "ERRO PROJUDI: NENHUMA MOVIMENTAÇÃO ENCONTRADA",
            Sentinel::ElementNotFound => "ERRO PROJUDI: ELEMENTO NÃO ENCONTRADO",
            Sentinel::StaleElement => "ERRO PROJUDI: ELEMENTO OBSOLETO",
            Sentinel::Timeout => "ERRO PROJUDI: TEMPO ESGOTADO",
            Sentinel::WebDriver => "ERRO PROJUDI: FALHA DO WEBDRIVER",
            Sentinel::General => "ERRO GERAL PROJUDI",
            Sentinel::Cancelled => "CONSULTA CANCELADA",
        }
    }

    /// Stable machine-readable name, used as a metric tag.
    pub const fn code(&self) -> &'static str {
        match self {
            Sentinel::NotAvailable => "not_available",
            Sentinel::DateNotFound => "date_not_found",
            Sentinel::DescriptionNotFound => "description_not_found",
            Sentinel::MovementNotFound => "movement_not_found",
            Sentinel::Confidential => "confidential",
            Sentinel::InvalidNumber => "invalid_number",
            Sentinel::ProcessNotFound => "process_not_found",
            Sentinel::ProcessNotListed => "process_not_listed",
            Sentinel::CredentialsNotProvided => "credentials_not_provided",
            Sentinel::InvalidCredentials => "invalid_credentials",
            Sentinel::FrameNotFound => "frame_not_found",
            Sentinel::FillError => "fill_error",
            Sentinel::MovementsTableNotFound => "movements_table_not_found",
            Sentinel::NoMovements => "no_movements",
            Sentinel::ElementNotFound => "element_not_found",
            Sentinel::StaleElement => "stale_element",
            Sentinel::Timeout => "timeout",
            Sentinel::WebDriver => "web_driver",
            Sentinel::General => "general",
            Sentinel::Cancelled => "cancelled",
        }
    }

    /// True for sentinels that report a failure rather than an absence of data.
    pub const fn is_error(&self) -> bool {
        matches!(
            self,
            Sentinel::CredentialsNotProvided
                | Sentinel::InvalidCredentials
                | Sentinel::ProcessNotListed
                | Sentinel::FrameNotFound
                | Sentinel::FillError
                | Sentinel::MovementsTableNotFound
                | Sentinel::NoMovements
                | Sentinel::ElementNotFound
                | Sentinel::StaleElement
                | Sentinel::Timeout
                | Sentinel::WebDriver
                | Sentinel::General
                | Sentinel::Cancelled
        )
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.as_str())
    }
}

/// One output column: either text read from a portal or a sentinel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Field {
    Value(String),
    Missing(Sentinel),
}

impl Field {
    /// Wraps extracted text, falling back to `otherwise` when it is blank.
    pub fn from_text<S: AsRef<str>>(text: S, otherwise: Sentinel) -> Self {
        let text = text.as_ref().trim();
        if text.is_empty() {
            Field::Missing(otherwise)
        } else {
            Field::Value(text.to_string())
        }
    }

    pub fn from_option(text: Option<String>, otherwise: Sentinel) -> Self {
        match text {
            Some(text) => Field::from_text(text, otherwise),
            None => Field::Missing(otherwise),
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Field::Value(text) => Some(text),
            Field::Missing(_) => None,
        }
    }

    pub fn sentinel(&self) -> Option<Sentinel> {
        match self {
            Field::Value(_) => None,
            Field::Missing(sentinel) => Some(*sentinel),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Value(text) => f.write_str(text),
            Field::Missing(sentinel) => sentinel.fmt(f),
        }
    }
}

/// The tier that produced a result. Whichever tier answers owns the whole tuple.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Primary,
    Secondary,
}

impl Tier {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Tier::Primary => "saj",
            Tier::Secondary => "projudi",
        }
    }
}

/// The normalized (date, description, respondent) tuple produced by a tier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub date: Field,
    pub description: Field,
    pub respondent: Field,
}

impl Resolution {
    pub fn found(date: Field, description: Field, respondent: Field) -> Self {
        Resolution {
            date,
            description,
            respondent,
        }
    }

    /// A terminal outcome without movement data: the sentinel explains why.
    pub fn failure(reason: Sentinel) -> Self {
        Resolution {
            date: Field::Missing(Sentinel::NotAvailable),
            description: Field::Missing(reason),
            respondent: Field::Missing(Sentinel::NotAvailable),
        }
    }

    /// The sentinel carried in the description column, if any.
    pub fn reason(&self) -> Option<Sentinel> {
        self.description.sentinel()
    }
}

/// Exactly one of these is produced per input process number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MovementResult {
    pub process_number: ProcessNumber,
    pub date: Field,
    pub description: Field,
    pub respondent: Field,
    /// `None` when neither portal was consulted.
    pub tier: Option<Tier>,
}

impl MovementResult {
    pub fn from_resolution(process_number: ProcessNumber, tier: Tier, resolution: Resolution) -> Self {
        MovementResult {
            process_number,
            date: resolution.date,
            description: resolution.description,
            respondent: resolution.respondent,
            tier: Some(tier),
        }
    }

    /// A result recorded without consulting either portal.
    pub fn unresolved(process_number: ProcessNumber, reason: Sentinel) -> Self {
        let resolution = Resolution::failure(reason);
        MovementResult {
            process_number,
            date: resolution.date,
            description: resolution.description,
            respondent: resolution.respondent,
            tier: None,
        }
    }

    pub fn invalid(process_number: ProcessNumber) -> Self {
        MovementResult::unresolved(process_number, Sentinel::InvalidNumber)
    }

    /// True when the description reports a failure instead of data.
    pub fn is_failure(&self) -> bool {
        self.description.sentinel().is_some_and(|s| s.is_error())
    }

    /// The four output columns, sentinels rendered in their bracketed form.
    pub fn to_row(&self) -> [String; 4] {
        [
            self.process_number.to_string(),
            self.date.to_string(),
            self.description.to_string(),
            self.respondent.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_text_becomes_sentinel() {
        assert_eq!(
            Field::from_text("   ", Sentinel::DescriptionNotFound),
            Field::Missing(Sentinel::DescriptionNotFound)
        );
        assert_eq!(
            Field::from_text(" Conclusos ", Sentinel::DescriptionNotFound),
            Field::Value("Conclusos".into())
        );
        assert_eq!(
            Field::from_option(None, Sentinel::NotAvailable),
            Field::Missing(Sentinel::NotAvailable)
        );
    }

    #[test]
    fn test_sentinels_render_distinctly() {
        assert_eq!(Sentinel::NotAvailable.to_string(), "[NÃO DISPONÍVEL]");
        assert_eq!(
            Field::Missing(Sentinel::Confidential).to_string(),
            "[SEGREDO DE JUSTIÇA]"
        );
        // A movement whose text equals a sentinel phrase is still a value.
        let value = Field::Value("SEGREDO DE JUSTIÇA".into());
        assert_eq!(value.sentinel(), None);
        assert_ne!(value.to_string(), Sentinel::Confidential.to_string());
    }

    #[test]
    fn test_invalid_result() {
        let result = MovementResult::invalid(ProcessNumber::new("123"));
        assert_eq!(result.description, Field::Missing(Sentinel::InvalidNumber));
        assert_eq!(result.date, Field::Missing(Sentinel::NotAvailable));
        assert_eq!(result.respondent, Field::Missing(Sentinel::NotAvailable));
        assert_eq!(result.tier, None);
        assert!(!result.is_failure());
        assert_eq!(
            result.to_row(),
            [
                "123".to_string(),
                "[NÃO DISPONÍVEL]".to_string(),
                "[NÚMERO DE PROCESSO INVÁLIDO]".to_string(),
                "[NÃO DISPONÍVEL]".to_string(),
            ]
        );
    }

    #[test]
    fn test_failure_classification() {
        let result = MovementResult::from_resolution(
            ProcessNumber::new("0000123-45.2020.8.04.0001"),
            Tier::Secondary,
            Resolution::failure(Sentinel::MovementsTableNotFound),
        );
        assert!(result.is_failure());
        assert_eq!(result.tier, Some(Tier::Secondary));

        let confidential = Resolution::failure(Sentinel::Confidential);
        assert_eq!(confidential.reason(), Some(Sentinel::Confidential));
        assert!(!Sentinel::Confidential.is_error());
    }
}
