//! The PROJUDI lookup as an explicit state machine over a [`Portal`].

use crate::backoff::Backoff;
use crate::errors::AutomationError;
use crate::extract::{self, Movement};
use crate::metrics_defs;
use crate::pages::Portal;
use shared::counter;
use shared::{Credentials, Field, ProcessNumber, Resolution, Sentinel};
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Init,
    LoggedIn,
    MenuNavigated,
    SearchSubmitted,
    ResultRow,
    DetailPageOpen,
    MovementExtracted,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::LoggedIn => "logged_in",
            Stage::MenuNavigated => "menu_navigated",
            Stage::SearchSubmitted => "search_submitted",
            Stage::ResultRow => "result_row",
            Stage::DetailPageOpen => "detail_page_open",
            Stage::MovementExtracted => "movement_extracted",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drives one lookup from the login page to a terminal [`Resolution`].
///
/// Business outcomes (no records, confidential process) are `Ok`; structural
/// and timing failures are `Err` and classified by [`AutomationError::sentinel`].
pub struct Automation<'a, P> {
    portal: &'a mut P,
    backoff: &'a Backoff,
    process_number: &'a ProcessNumber,
    stage: Stage,
}

impl<'a, P: Portal> Automation<'a, P> {
    pub fn new(portal: &'a mut P, backoff: &'a Backoff, process_number: &'a ProcessNumber) -> Self {
        Automation {
            portal,
            backoff,
            process_number,
            stage: Stage::Init,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self, next: Stage) {
        debug!(
            process_number = %self.process_number,
            from = %self.stage,
            stage = %next,
            "stage transition"
        );
        self.stage = next;
    }

    pub async fn run(&mut self, credentials: &Credentials) -> Result<Resolution, AutomationError> {
        self.login(credentials).await?;
        self.navigate_menu().await?;
        self.search().await?;

        if self.portal.no_records_visible().await? {
            info!(process_number = %self.process_number, stage = %self.stage, "no records found in PROJUDI");
            return Ok(Resolution::failure(Sentinel::ProcessNotFound));
        }

        let row = self
            .portal
            .result_row(self.process_number.as_str())
            .await?
            .ok_or(AutomationError::ProcessNotListed)?;
        self.advance(Stage::ResultRow);

        let summary = extract::summarize_row(&row);
        let respondent = Field::from_option(summary.respondent, Sentinel::NotAvailable);
        let confidential =
            summary.confidential || self.portal.confidential_marker_visible().await?;
        if confidential {
            info!(process_number = %self.process_number, stage = %self.stage, "process is under judicial secrecy");
            return Ok(Resolution::found(
                Field::Missing(Sentinel::NotAvailable),
                Field::Missing(Sentinel::Confidential),
                respondent,
            ));
        }

        self.portal.open_process().await?;
        self.portal.enter_content_frame().await?;
        self.advance(Stage::DetailPageOpen);

        let movement = self.latest_movement().await?;
        if movement.date.sentinel().is_some() || movement.description.sentinel().is_some() {
            warn!(
                process_number = %self.process_number,
                date = %movement.date,
                description = %movement.description,
                "movement only partially extracted"
            );
        }
        self.advance(Stage::MovementExtracted);

        Ok(Resolution::found(movement.date, movement.description, respondent))
    }

    async fn login(&mut self, credentials: &Credentials) -> Result<(), AutomationError> {
        self.portal.open_login().await?;
        self.portal.submit_login(credentials).await?;
        if let Some(message) = self.portal.login_error().await? {
            warn!(process_number = %self.process_number, %message, "PROJUDI rejected the login");
            return Err(AutomationError::InvalidCredentials(message));
        }
        self.advance(Stage::LoggedIn);
        Ok(())
    }

    async fn navigate_menu(&mut self) -> Result<(), AutomationError> {
        self.portal.reveal_search_menu().await?;
        self.portal.open_search().await?;
        self.advance(Stage::MenuNavigated);
        Ok(())
    }

    // Direct fill, read back, forced fill, read back again.
    async fn search(&mut self) -> Result<(), AutomationError> {
        let process_number = self.process_number;
        let number = process_number.as_str();
        self.portal.enter_content_frame().await?;
        self.portal.fill_process_number(number).await?;

        if self.portal.process_number_value().await? != number {
            debug!(process_number = %self.process_number, "direct fill did not take, forcing the value");
            self.portal.force_process_number(number).await?;
            let actual = self.portal.process_number_value().await?;
            if actual != number {
                return Err(AutomationError::FillMismatch { actual });
            }
        }

        self.portal.submit_search().await?;
        self.advance(Stage::SearchSubmitted);
        Ok(())
    }

    async fn latest_movement(&mut self) -> Result<Movement, AutomationError> {
        let mut attempt = 1;
        loop {
            let last = self.backoff.is_last(attempt);
            match self.portal.movements_table().await {
                Ok(Some(html)) => match extract::first_movement(&html) {
                    Some(movement) => return Ok(movement),
                    None if last => return Err(AutomationError::NoMovements),
                    None => {
                        warn!(process_number = %self.process_number, attempt, "movements table has no rows yet");
                    }
                },
                Ok(None) if last => {
                    return Err(AutomationError::MovementsTableNotFound { attempts: attempt });
                }
                Ok(None) => {
                    warn!(process_number = %self.process_number, attempt, "movements table did not appear");
                    self.portal.scroll_to_bottom().await?;
                }
                Err(e) if e.is_transient() && !last => {
                    warn!(process_number = %self.process_number, attempt, error = %e, "reading movements table failed");
                }
                Err(e) => return Err(e),
            }

            counter!(metrics_defs::MOVEMENTS_TABLE_RETRIES).increment(1);
            self.backoff.pause(attempt).await;
            attempt += 1;
        }
    }
}
