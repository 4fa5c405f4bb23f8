//! Database driver trait definition

use crate::{Connection, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Core driver trait that all backing-store drivers must implement
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Unique identifier for this driver (e.g., "mssql", "sqlite")
    fn id(&self) -> &'static str {
        self.name()
    }

    /// Driver name used for registry lookup
    fn name(&self) -> &'static str;

    /// Human-readable name
    fn display_name(&self) -> &'static str {
        self.name()
    }

    /// Default connection port (None for file-based databases like SQLite)
    fn default_port(&self) -> Option<u16> {
        None
    }

    /// Whether the backend runs real server-side procedures
    fn supports_stored_procedures(&self) -> bool {
        true
    }

    /// Create a new connection
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>>;

    /// Open and immediately close a connection
    async fn test_connection(&self, config: &ConnectionConfig) -> Result<()> {
        let conn = self.connect(config).await?;
        conn.close().await
    }

    /// Build a connection string from configuration
    fn build_connection_string(&self, config: &ConnectionConfig) -> String;
}

/// Connection configuration
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Driver ID (e.g., "mssql", "sqlite")
    pub driver: String,
    /// Host address (empty for file-based databases)
    pub host: String,
    /// Port number (0 for default or file-based)
    pub port: u16,
    /// Database name or file path
    pub database: Option<String>,
    /// Username
    pub username: Option<String>,
    /// Password
    pub password: Option<String>,
    /// Additional connection parameters
    pub params: HashMap<String, String>,
}

impl ConnectionConfig {
    /// Create a new configuration with default values
    pub fn new(driver: &str) -> Self {
        Self {
            driver: driver.to_string(),
            host: String::new(),
            port: 0,
            database: None,
            username: None,
            password: None,
            params: HashMap::new(),
        }
    }

    /// Create a SQLite configuration
    pub fn new_sqlite(database_path: &str) -> Self {
        let mut config = Self::new("sqlite");
        config.database = Some(database_path.to_string());
        config
    }

    /// Create an MS SQL Server configuration
    pub fn new_mssql(host: &str, port: u16, database: &str, username: &str) -> Self {
        let mut config = Self::new("mssql");
        config.host = host.to_string();
        config.port = port;
        config.database = Some(database.to_string());
        config.username = Some(username.to_string());
        config
    }

    /// Set a connection parameter
    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Get a string parameter
    pub fn get_string(&self, key: &str) -> Option<String> {
        // First check params
        if let Some(val) = self.params.get(key) {
            return Some(val.clone());
        }
        // Check known fields
        match key {
            "host" if !self.host.is_empty() => Some(self.host.clone()),
            "database" | "path" => self.database.clone(),
            "username" | "user" => self.username.clone(),
            "password" => self.password.clone(),
            _ => None,
        }
    }

    /// Get a boolean parameter ("true"/"1"/"yes")
    pub fn get_flag(&self, key: &str) -> bool {
        self.params
            .get(key)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false)
    }

    /// Get port
    pub fn get_port(&self) -> u16 {
        self.port
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("params", &self.params.keys().collect::<Vec<_>>())
            .finish()
    }
}
