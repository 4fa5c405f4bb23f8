//! SQLite backing store for Bakehouse
//!
//! SQLite has no stored procedures, so this driver reads them from a TOML
//! catalog that maps each procedure name to a single SQL statement with
//! `@Name` parameters. The catalog may also carry a setup script, run once per
//! database file the first time the driver connects to it.

mod catalog;
mod connection;
mod driver;
mod values;

#[cfg(test)]
mod catalog_tests;
#[cfg(test)]
mod connection_tests;
#[cfg(test)]
mod driver_tests;

pub use catalog::{CatalogProcedure, ProcedureCatalog};
pub use connection::SqliteConnection;
pub use driver::SqliteDriver;
