//! Connection and connection factory traits

use crate::{ConnectionConfig, DatabaseDriver, ProcedureCall, QueryResult, Result, StatementResult};
use async_trait::async_trait;
use std::sync::Arc;

/// A connection to the backing store, used for a single gateway call
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "mssql", "sqlite")
    fn driver_name(&self) -> &str;

    /// Invoke a procedure and buffer its first result set
    async fn call_procedure(&self, call: &ProcedureCall) -> Result<QueryResult>;

    /// Invoke a procedure for its side effects, discarding any rows it produces
    async fn execute_procedure(&self, call: &ProcedureCall) -> Result<StatementResult>;

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}

/// Factory trait for creating connections
///
/// The gateway asks its factory for a fresh connection on every call. Pooling,
/// if any, lives behind a factory implementation.
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    /// Create a new connection
    async fn create(&self) -> Result<Arc<dyn Connection>>;
}

#[async_trait]
impl<T: ConnectionFactory> ConnectionFactory for Arc<T> {
    async fn create(&self) -> Result<Arc<dyn Connection>> {
        (**self).create().await
    }
}

/// Connection factory that opens connections through a driver with a fixed config
pub struct DriverConnectionFactory {
    driver: Arc<dyn DatabaseDriver>,
    config: ConnectionConfig,
}

impl DriverConnectionFactory {
    pub fn new(driver: Arc<dyn DatabaseDriver>, config: ConnectionConfig) -> Self {
        Self { driver, config }
    }

    pub fn driver(&self) -> &Arc<dyn DatabaseDriver> {
        &self.driver
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

#[async_trait]
impl ConnectionFactory for DriverConnectionFactory {
    async fn create(&self) -> Result<Arc<dyn Connection>> {
        self.driver.connect(&self.config).await
    }
}

impl std::fmt::Debug for DriverConnectionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverConnectionFactory")
            .field("driver", &self.driver.name())
            .field("config", &self.config)
            .finish()
    }
}
