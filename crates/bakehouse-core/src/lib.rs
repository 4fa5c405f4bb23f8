//! Bakehouse Core - Core abstractions shared by the gateway and its backends
//!
//! This crate provides the fundamental traits and types that all other
//! Bakehouse crates depend on. It defines:
//!
//! - `DatabaseDriver` - Trait for backing-store driver implementations
//! - `Connection` - Trait for a short-lived connection that invokes procedures
//! - `ConnectionFactory` - Per-call connection acquisition
//! - `ProcedureCall` - A named procedure plus its named parameters
//! - Common types like `Value`, `Row`, `ColumnMeta`, etc.

mod connection;
mod driver;
mod error;
mod procedure;
mod types;

pub use connection::*;
pub use driver::*;
pub use error::*;
pub use procedure::*;
pub use types::*;
