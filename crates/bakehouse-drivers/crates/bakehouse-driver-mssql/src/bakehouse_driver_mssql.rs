//! MS SQL Server backing store for Bakehouse
//!
//! Procedures are invoked as `EXEC [schema].[name] @Param = @P1, ...` with
//! every argument sent as a bound RPC parameter, never spliced into the text.

mod connection;
mod driver;
mod statement;

#[cfg(test)]
mod connection_tests;
#[cfg(test)]
mod driver_tests;
#[cfg(test)]
mod statement_tests;

pub use connection::{MssqlConnection, MssqlConnectionError};
pub use driver::MssqlDriver;
