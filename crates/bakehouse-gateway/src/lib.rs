//! Bakehouse Gateway - typed stored-procedure invocation
//!
//! Every entity data module talks to the backing store through
//! [`ProcedureGateway`], which offers two operations over a named procedure:
//!
//! - `load_many` - invoke the procedure and map each row of its first result
//!   set to a [`FromRow`] type, preserving the store's row order
//! - `execute` - invoke the procedure for its side effects only
//!
//! Row types describe their columns once, at compile time, with
//! [`procedure_row!`]; parameter objects describe their inputs with
//! [`procedure_params!`]. Calendar dates travel through the
//! [`date_only`] adapter in both directions.
//!
//! # Example
//!
//! ```ignore
//! use bakehouse_gateway::{procedure_params, procedure_row, ProcedureGateway, ProcedureName};
//!
//! const GET_PRODUCT_BY_ID: ProcedureName = ProcedureName::new("dbo.GetProductById");
//!
//! #[derive(Debug, Default)]
//! struct Product { id: i32, name: String }
//! procedure_row!(Product { id => "ProductId", name => "Name" });
//!
//! struct ById { id: i32 }
//! procedure_params!(ById { id => "ProductId" });
//!
//! let product: Option<Product> = gateway.load_first(GET_PRODUCT_BY_ID, &ById { id: 7 }).await?;
//! ```

pub mod date_only;
mod gateway;
mod macros;
mod mapping;
mod params;

#[cfg(test)]
mod gateway_tests;
#[cfg(test)]
mod mapping_tests;

pub use gateway::{Identity, ProcedureGateway};
pub use mapping::{FieldDescriptor, FromRow, FromValue, RowPlan, map_rows};
pub use params::{NoParams, ToParam, ToParams};

/// Re-export the core types that gateway callers and the macros need
pub use bakehouse_core::{
    BakehouseError, ConnectionConfig, ConnectionFactory, DatabaseDriver, DriverConnectionFactory,
    Parameter, ProcedureName, Result, SqlType, Value,
};
