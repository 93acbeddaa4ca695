//! Where PROJUDI credentials are kept between runs.

use serde::{Deserialize, Serialize};
use shared::Credentials;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_USERNAME_VAR: &str = "PROJUDI_USERNAME";
pub const DEFAULT_PASSWORD_VAR: &str = "PROJUDI_PASSWORD";

#[derive(thiserror::Error, Debug)]
pub enum CredentialError {
    #[error("could not access credential file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse credential file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("the {0} credential store is read-only")]
    ReadOnly(&'static str),
}

pub trait CredentialStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// False when credentials are kept in plain text.
    fn is_secure(&self) -> bool;

    fn load(&self) -> Result<Option<Credentials>, CredentialError>;

    fn store(&self, credentials: &Credentials) -> Result<(), CredentialError>;

    /// Like [`CredentialStore::load`], naming the store that supplied the credentials.
    fn locate(&self) -> Result<Option<(&'static str, Credentials)>, CredentialError> {
        Ok(self.load()?.map(|credentials| (self.name(), credentials)))
    }
}

/// Reads credentials from two environment variables. Never written to.
pub struct EnvCredentialStore {
    username_var: String,
    password_var: String,
}

impl EnvCredentialStore {
    pub fn new(username_var: impl Into<String>, password_var: impl Into<String>) -> Self {
        EnvCredentialStore {
            username_var: username_var.into(),
            password_var: password_var.into(),
        }
    }
}

impl Default for EnvCredentialStore {
    fn default() -> Self {
        EnvCredentialStore::new(DEFAULT_USERNAME_VAR, DEFAULT_PASSWORD_VAR)
    }
}

impl CredentialStore for EnvCredentialStore {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn is_secure(&self) -> bool {
        true
    }

    fn load(&self) -> Result<Option<Credentials>, CredentialError> {
        let username = std::env::var(&self.username_var).ok();
        let password = std::env::var(&self.password_var).ok();
        Ok(match (username, password) {
            (Some(username), Some(password)) => {
                Some(Credentials::new(username, password)).filter(Credentials::is_complete)
            }
            _ => None,
        })
    }

    fn store(&self, _credentials: &Credentials) -> Result<(), CredentialError> {
        Err(CredentialError::ReadOnly(self.name()))
    }
}

#[derive(Deserialize, Serialize)]
struct StoredCredentials {
    username: String,
    password: String,
}

/// Plain-text YAML file. Readable by anyone with access to the file.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileCredentialStore { path: path.into() }
    }

    /// `<config dir>/andamento/credentials.yaml`, or the working directory when
    /// the platform has no config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("andamento").join("credentials.yaml"))
            .unwrap_or_else(|| PathBuf::from("andamento-credentials.yaml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn name(&self) -> &'static str {
        "file"
    }

    fn is_secure(&self) -> bool {
        false
    }

    fn load(&self) -> Result<Option<Credentials>, CredentialError> {
        if !self.path.exists() {
            return Ok(None);
        }
        warn!(path = %self.path.display(), "reading PROJUDI credentials from a plain-text file");
        let contents = fs::read_to_string(&self.path)?;
        let stored: StoredCredentials = serde_yaml::from_str(&contents)?;
        Ok(Some(Credentials::new(stored.username, stored.password)))
    }

    fn store(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_yaml::to_string(&StoredCredentials {
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        })?;
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;

        // The creation mode does not apply to a file that already existed.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(contents.as_bytes())?;

        warn!(path = %self.path.display(), "PROJUDI credentials saved in plain text");
        Ok(())
    }
}

/// Prefers one store and falls back to another when it has nothing or fails.
pub struct FallbackCredentialStore {
    preferred: Box<dyn CredentialStore>,
    fallback: Box<dyn CredentialStore>,
}

impl FallbackCredentialStore {
    pub fn new(preferred: Box<dyn CredentialStore>, fallback: Box<dyn CredentialStore>) -> Self {
        FallbackCredentialStore {
            preferred,
            fallback,
        }
    }
}

impl CredentialStore for FallbackCredentialStore {
    fn name(&self) -> &'static str {
        self.preferred.name()
    }

    fn is_secure(&self) -> bool {
        self.preferred.is_secure()
    }

    fn load(&self) -> Result<Option<Credentials>, CredentialError> {
        Ok(self.locate()?.map(|(_, credentials)| credentials))
    }

    fn locate(&self) -> Result<Option<(&'static str, Credentials)>, CredentialError> {
        match self.preferred.locate() {
            Ok(Some(found)) => return Ok(Some(found)),
            Ok(None) => {}
            Err(e) => warn!(
                store = self.preferred.name(),
                fallback = self.fallback.name(),
                error = %e,
                "credential store unavailable, falling back"
            ),
        }
        self.fallback.locate()
    }

    fn store(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        match self.preferred.store(credentials) {
            Ok(()) => Ok(()),
            Err(e) => {
                info!(
                    store = self.preferred.name(),
                    fallback = self.fallback.name(),
                    error = %e,
                    "storing credentials in the fallback store"
                );
                if !self.fallback.is_secure() {
                    warn!(store = self.fallback.name(), "fallback credential store is not secure");
                }
                self.fallback.store(credentials)
            }
        }
    }
}
