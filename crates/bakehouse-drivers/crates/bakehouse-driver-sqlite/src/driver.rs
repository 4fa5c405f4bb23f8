//! SQLite driver implementation

use async_trait::async_trait;
use bakehouse_core::{BakehouseError, Connection, ConnectionConfig, DatabaseDriver, Result};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use crate::{ProcedureCatalog, SqliteConnection};

/// SQLite database driver.
///
/// The procedure catalog comes from the driver itself when built with
/// [`with_catalog`](Self::with_catalog), otherwise from the TOML file named
/// by the `catalog` connection parameter. Catalog files are parsed once and
/// cached.
pub struct SqliteDriver {
    catalog: Option<Arc<ProcedureCatalog>>,
    loaded: Mutex<HashMap<PathBuf, Arc<ProcedureCatalog>>>,
    initialized: Mutex<HashSet<String>>,
}

impl SqliteDriver {
    /// Create a new SQLite driver instance
    pub fn new() -> Self {
        tracing::debug!("SQLite driver initialized");
        Self {
            catalog: None,
            loaded: Mutex::new(HashMap::new()),
            initialized: Mutex::new(HashSet::new()),
        }
    }

    /// Create a driver that serves every connection from `catalog`
    pub fn with_catalog(catalog: ProcedureCatalog) -> Self {
        Self {
            catalog: Some(Arc::new(catalog)),
            ..Self::new()
        }
    }

    pub(crate) fn catalog_for(&self, config: &ConnectionConfig) -> Result<Arc<ProcedureCatalog>> {
        if let Some(catalog) = &self.catalog {
            return Ok(Arc::clone(catalog));
        }

        let path = config.get_string("catalog").map(PathBuf::from).ok_or_else(|| {
            BakehouseError::Configuration(
                "SQLite requires a 'catalog' parameter naming the procedure catalog file".into(),
            )
        })?;

        let mut loaded = self.loaded.lock();
        if let Some(catalog) = loaded.get(&path) {
            return Ok(Arc::clone(catalog));
        }
        let catalog = Arc::new(ProcedureCatalog::load(&path)?);
        loaded.insert(path, Arc::clone(&catalog));
        Ok(catalog)
    }

    /// Run the catalog setup script the first time a database file is opened.
    /// In-memory databases start empty on every connect and always run it.
    fn ensure_setup(
        &self,
        path: &str,
        conn: &SqliteConnection,
        catalog: &ProcedureCatalog,
    ) -> Result<()> {
        let Some(setup) = catalog.setup() else {
            return Ok(());
        };
        if path == ":memory:" {
            return conn.run_script(setup);
        }

        let key = SqliteConnection::expand_path(path)?;
        let mut initialized = self.initialized.lock();
        if !initialized.contains(&key) {
            tracing::info!(path = %key, "running catalog setup script");
            conn.run_script(setup)?;
            initialized.insert(key);
        }
        Ok(())
    }
}

impl Default for SqliteDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn display_name(&self) -> &'static str {
        "SQLite"
    }

    fn supports_stored_procedures(&self) -> bool {
        false
    }

    #[tracing::instrument(skip(self, config), fields(path = config.get_string("path").as_deref()))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let path = config.get_string("path").ok_or_else(|| {
            BakehouseError::Configuration(
                "SQLite requires 'path' or 'database' parameter. Example: { \"path\": \"/path/to/bakehouse.db\" }".into(),
            )
        })?;
        let catalog = self.catalog_for(config)?;

        let conn = SqliteConnection::open(&path, Arc::clone(&catalog)).map_err(|e| {
            tracing::error!(error = %e, "failed to connect to SQLite database");
            e
        })?;
        self.ensure_setup(&path, &conn, &catalog)?;

        tracing::debug!(path = %path, "SQLite connection created");
        Ok(Arc::new(conn))
    }

    fn build_connection_string(&self, config: &ConnectionConfig) -> String {
        config
            .get_string("path")
            .unwrap_or_else(|| ":memory:".to_string())
    }
}
