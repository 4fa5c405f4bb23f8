//! Bakehouse Drivers - backing store implementations
//!
//! This crate bundles the concrete drivers behind the traits defined in
//! `bakehouse-core` and a registry for choosing one by name.

#[cfg(feature = "mssql")]
pub use bakehouse_driver_mssql as mssql;
#[cfg(feature = "sqlite")]
pub use bakehouse_driver_sqlite as sqlite;

mod registry;

pub use registry::DriverRegistry;

/// Re-export commonly used types from bakehouse-core
pub use bakehouse_core::{
    BakehouseError, Connection, ConnectionConfig, DatabaseDriver, QueryResult, Result, Row,
    StatementResult, Value,
};
