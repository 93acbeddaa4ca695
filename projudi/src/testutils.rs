//! Scripted stand-ins for the browser, for exercising the lookup flow without one.

use crate::errors::AutomationError;
use crate::pages::{Launcher, Portal};
use crate::webdriver::WebDriverError;
use async_trait::async_trait;
use shared::Credentials;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const RESULT_ROW: &str = r##"<tr>
    <td><a href="#">0000123-45.2020.8.04.0001</a></td>
    <td>Execução</td>
    <td><table class="form"><tr><td><font>Requerido:</font></td><td><ul><li>João da Silva</li></ul></td></tr></table></td>
</tr>"##;

pub const CONFIDENTIAL_ROW: &str = r##"<tr>
    <td><a href="#">0000123-45.2020.8.04.0001</a></td>
    <td>SEGREDO DE JUSTIÇA</td>
</tr>"##;

pub const MOVEMENTS_TBODY: &str = r#"<tbody>
    <tr><td>7</td><td></td><td>12/03/2024</td><td><b>Juntada de Petição</b> Petição intermediária</td></tr>
</tbody>"#;

/// How the scripted portal behaves. The default walks the whole flow successfully.
#[derive(Clone, Debug)]
pub struct Script {
    pub login_error: Option<String>,
    pub frame_missing: bool,
    pub direct_fill_works: bool,
    pub forced_fill_works: bool,
    pub no_records: bool,
    pub row: Option<String>,
    pub page_confidential: bool,
    /// One entry per movements-table attempt; later attempts repeat the last entry.
    pub tables: Vec<Option<String>>,
    pub panic_on_search: bool,
    pub close_fails: bool,
    pub launch_fails: bool,
}

impl Default for Script {
    fn default() -> Self {
        Script {
            login_error: None,
            frame_missing: false,
            direct_fill_works: true,
            forced_fill_works: true,
            no_records: false,
            row: Some(RESULT_ROW.into()),
            page_confidential: false,
            tables: vec![Some(MOVEMENTS_TBODY.into())],
            panic_on_search: false,
            close_fails: false,
            launch_fails: false,
        }
    }
}

/// Counters shared between a test and the portals it launches.
#[derive(Clone, Debug, Default)]
pub struct Calls {
    launches: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    scrolls: Arc<AtomicUsize>,
    table_attempts: Arc<AtomicUsize>,
}

impl Calls {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn scrolls(&self) -> usize {
        self.scrolls.load(Ordering::SeqCst)
    }

    pub fn table_attempts(&self) -> usize {
        self.table_attempts.load(Ordering::SeqCst)
    }
}

pub struct ScriptedPortal {
    script: Script,
    calls: Calls,
    field: String,
}

impl ScriptedPortal {
    pub fn new(script: Script, calls: Calls) -> Self {
        ScriptedPortal {
            script,
            calls,
            field: String::new(),
        }
    }
}

#[async_trait]
impl Portal for ScriptedPortal {
    async fn open_login(&mut self) -> Result<(), AutomationError> {
        Ok(())
    }

    async fn submit_login(&mut self, _credentials: &Credentials) -> Result<(), AutomationError> {
        Ok(())
    }

    async fn login_error(&mut self) -> Result<Option<String>, AutomationError> {
        Ok(self.script.login_error.clone())
    }

    async fn reveal_search_menu(&mut self) -> Result<(), AutomationError> {
        Ok(())
    }

    async fn open_search(&mut self) -> Result<(), AutomationError> {
        Ok(())
    }

    async fn enter_content_frame(&mut self) -> Result<(), AutomationError> {
        if self.script.frame_missing {
            return Err(AutomationError::FrameNotFound("userMainFrame".into()));
        }
        Ok(())
    }

    async fn fill_process_number(&mut self, number: &str) -> Result<(), AutomationError> {
        if self.script.direct_fill_works {
            self.field = number.to_string();
        }
        Ok(())
    }

    async fn force_process_number(&mut self, number: &str) -> Result<(), AutomationError> {
        if self.script.forced_fill_works {
            self.field = number.to_string();
        }
        Ok(())
    }

    async fn process_number_value(&mut self) -> Result<String, AutomationError> {
        Ok(self.field.clone())
    }

    async fn submit_search(&mut self) -> Result<(), AutomationError> {
        if self.script.panic_on_search {
            panic!("injected failure while submitting the search");
        }
        Ok(())
    }

    async fn no_records_visible(&mut self) -> Result<bool, AutomationError> {
        Ok(self.script.no_records)
    }

    async fn result_row(&mut self, _number: &str) -> Result<Option<String>, AutomationError> {
        Ok(self.script.row.clone())
    }

    async fn confidential_marker_visible(&mut self) -> Result<bool, AutomationError> {
        Ok(self.script.page_confidential)
    }

    async fn open_process(&mut self) -> Result<(), AutomationError> {
        Ok(())
    }

    async fn movements_table(&mut self) -> Result<Option<String>, AutomationError> {
        let attempt = self.calls.table_attempts.fetch_add(1, Ordering::SeqCst);
        let tables = &self.script.tables;
        Ok(tables.get(attempt).or(tables.last()).cloned().flatten())
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), AutomationError> {
        self.calls.scrolls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), AutomationError> {
        self.calls.closes.fetch_add(1, Ordering::SeqCst);
        if self.script.close_fails {
            return Err(WebDriverError::InvalidSession("session already gone".into()).into());
        }
        Ok(())
    }
}

pub struct ScriptedLauncher {
    script: Script,
    calls: Calls,
}

impl ScriptedLauncher {
    pub fn new(script: Script) -> Self {
        ScriptedLauncher {
            script,
            calls: Calls::default(),
        }
    }

    pub fn calls(&self) -> Calls {
        self.calls.clone()
    }
}

#[async_trait]
impl Launcher for ScriptedLauncher {
    type Portal = ScriptedPortal;

    async fn launch(&self) -> Result<ScriptedPortal, AutomationError> {
        self.calls.launches.fetch_add(1, Ordering::SeqCst);
        if self.script.launch_fails {
            return Err(WebDriverError::SessionNotCreated("chrome not reachable".into()).into());
        }
        Ok(ScriptedPortal::new(self.script.clone(), self.calls.clone()))
    }
}
