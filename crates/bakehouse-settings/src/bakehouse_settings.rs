//! Bakehouse Settings
//!
//! Application settings with JSON persistence:
//! - Database backend selection and connection details
//! - Logging level, profile and file output
//! - Session cookie secret
//!
//! Secrets can be kept out of the settings file: `BAKEHOUSE_DB_PASSWORD` and
//! `BAKEHOUSE_SESSION_SECRET` override whatever is stored.

use anyhow::{Context, Result};
use bakehouse_core::ConnectionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod settings_file;

#[cfg(test)]
mod settings_tests;

pub use settings_file::*;

pub const DB_PASSWORD_ENV: &str = "BAKEHOUSE_DB_PASSWORD";
pub const SESSION_SECRET_ENV: &str = "BAKEHOUSE_SESSION_SECRET";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BakehouseSettings {
    pub database: DatabaseSettings,
    pub logging: LogSettings,
    pub session: SessionSettings,
}

impl BakehouseSettings {
    /// Load from the default settings file, then apply environment overrides.
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        let mut settings = Self::load_from(&settings_file()?)?;
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        serde_json::from_str(&content).with_context(|| "Failed to parse settings JSON")
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&settings_file()?)
    }

    /// Write the settings as pretty JSON. Secrets that arrived through the
    /// environment are written too, so callers should save what they loaded
    /// from disk rather than the overridden copy.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings to {:?}", path))?;
        Ok(())
    }

    /// Replace secrets with values from `lookup` where it has one
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(password) = lookup(DB_PASSWORD_ENV).filter(|v| !v.is_empty()) {
            self.database.password = Some(password);
        }
        if let Some(secret) = lookup(SESSION_SECRET_ENV).filter(|v| !v.is_empty()) {
            self.session.secret = Some(secret);
        }
    }

    /// Connection configuration for the selected backend
    pub fn connection_config(&self) -> Result<ConnectionConfig> {
        self.database.connection_config()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    SqlServer,
    #[default]
    Sqlite,
}

impl Backend {
    /// Driver id registered for this backend
    pub fn driver_id(&self) -> &'static str {
        match self {
            Self::SqlServer => "mssql",
            Self::Sqlite => "sqlite",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SqlServer => "SQL Server",
            Self::Sqlite => "SQLite",
        }
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub backend: Backend,
    pub host: String,
    /// 0 uses the backend default
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub trust_certificate: bool,
    pub application_name: String,
    /// SQLite database file; defaults to the data directory
    pub sqlite_path: Option<PathBuf>,
    /// Procedure catalog for SQLite; defaults to the bundled catalog
    pub catalog_path: Option<PathBuf>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            host: "localhost".into(),
            port: 0,
            database: "Bakehouse".into(),
            username: None,
            password: None,
            trust_certificate: false,
            application_name: "bakehouse".into(),
            sqlite_path: None,
            catalog_path: None,
        }
    }
}

impl DatabaseSettings {
    pub fn connection_config(&self) -> Result<ConnectionConfig> {
        match self.backend {
            Backend::SqlServer => {
                let username = self
                    .username
                    .as_deref()
                    .filter(|u| !u.is_empty())
                    .context("SQL Server backend requires a username")?;
                let mut config =
                    ConnectionConfig::new_mssql(&self.host, self.port, &self.database, username)
                        .with_param("application_name", self.application_name.clone());
                if self.trust_certificate {
                    config = config.with_param("trust_cert", "true");
                }
                config.password = self.password.clone();
                Ok(config)
            }
            Backend::Sqlite => {
                let path = match &self.sqlite_path {
                    Some(path) => path.clone(),
                    None => local_database_file()?,
                };
                let path = path
                    .to_str()
                    .with_context(|| format!("SQLite path is not valid UTF-8: {:?}", path))?;
                let mut config = ConnectionConfig::new_sqlite(path);
                if let Some(catalog) = &self.catalog_path {
                    let catalog = catalog.to_str().with_context(|| {
                        format!("Catalog path is not valid UTF-8: {:?}", catalog)
                    })?;
                    config = config.with_param("catalog", catalog);
                }
                Ok(config)
            }
        }
    }
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("trust_certificate", &self.trust_certificate)
            .field("application_name", &self.application_name)
            .field("sqlite_path", &self.sqlite_path)
            .field("catalog_path", &self.catalog_path)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogProfile {
    /// Verbose pretty console output
    #[default]
    Development,
    /// Compact console output plus JSON files
    Production,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub profile: LogProfile,
    /// Filter directive used when `RUST_LOG` is unset; the profile's default
    /// applies when empty
    pub filter: String,
    pub json_file: bool,
    /// Defaults to the data directory
    pub directory: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            profile: LogProfile::Development,
            filter: String::new(),
            json_file: false,
            directory: None,
        }
    }
}

impl LogSettings {
    pub fn log_dir(&self) -> Result<PathBuf> {
        match &self.directory {
            Some(dir) => Ok(dir.clone()),
            None => logs_dir(),
        }
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SessionSettings {
    /// Cookie signing secret; a random one is generated per run when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl std::fmt::Debug for SessionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSettings")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
