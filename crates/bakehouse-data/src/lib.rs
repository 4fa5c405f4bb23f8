//! Bakehouse Data - entity data modules for the point-of-sale suite
//!
//! One module per business area, each a thin struct over a shared
//! [`ProcedureGateway`]. Every method names its stored procedure with a
//! constant and passes an explicit parameter struct; nothing here composes
//! SQL.
//!
//! [`Bakehouse`] bundles all modules over one gateway.

mod accounts;
mod customers;
mod inventory;
mod models;
mod orders;
mod products;
mod reports;
mod sales;
mod session;
mod users;


pub use accounts::{AccountData, NewLedgerEntry};
pub use customers::{CustomerData, CustomerUpdate, NewCustomer};
pub use inventory::{InventoryData, NewStockItem};
pub use models::*;
pub use orders::{NewOrder, NewOrderItem, OrderData};
pub use products::{NewProduct, ProductData, ProductUpdate};
pub use reports::ReportData;
pub use sales::{NewSale, SaleData};
pub use session::SessionSigner;
pub use users::{NewUser, UserData, hash_passcode};

use bakehouse_core::{BakehouseError, ProcedureName, Result};
use bakehouse_gateway::{Identity, ProcedureGateway, ToParams, procedure_params};
use chrono::NaiveDate;

/// Procedure catalog that backs every module on SQLite
pub const SQLITE_CATALOG: &str = include_str!("../catalog/sqlite.toml");

/// Inclusive calendar range for ledger and report queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

procedure_params!(DateRange {
    from => "FromDate",
    to => "ToDate",
});

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(BakehouseError::InvalidInput(format!(
                "date range starts after it ends ({} > {})",
                from, to
            )));
        }
        Ok(Self { from, to })
    }

    pub fn single_day(date: NaiveDate) -> Self {
        Self { from: date, to: date }
    }
}

/// All entity data modules over one gateway
#[derive(Debug, Clone)]
pub struct Bakehouse {
    pub products: ProductData,
    pub customers: CustomerData,
    pub orders: OrderData,
    pub sales: SaleData,
    pub inventory: InventoryData,
    pub accounts: AccountData,
    pub users: UserData,
    pub reports: ReportData,
}

impl Bakehouse {
    pub fn new(gateway: ProcedureGateway) -> Self {
        Self {
            products: ProductData::new(gateway.clone()),
            customers: CustomerData::new(gateway.clone()),
            orders: OrderData::new(gateway.clone()),
            sales: SaleData::new(gateway.clone()),
            inventory: InventoryData::new(gateway.clone()),
            accounts: AccountData::new(gateway.clone()),
            users: UserData::new(gateway.clone()),
            reports: ReportData::new(gateway),
        }
    }
}

/// Run an insert procedure and return the identity it reports.
///
/// A missing `Id` row maps to the default identity, which no store hands out,
/// so it is reported as a procedure failure.
pub(crate) async fn insert_returning_id<P>(
    gateway: &ProcedureGateway,
    procedure: ProcedureName,
    params: &P,
) -> Result<i64>
where
    P: ToParams + Sync + ?Sized,
{
    let identity: Identity = gateway.load_first_or_default(procedure, params).await?;
    if identity.id <= 0 {
        return Err(BakehouseError::Procedure(format!(
            "{} did not return a generated identity",
            procedure
        )));
    }
    Ok(identity.id)
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BakehouseError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(())
}
