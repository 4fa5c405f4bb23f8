//! Counter sales and the end-of-day total

use crate::{DailySalesTotal, Sale, insert_returning_id};
use bakehouse_core::{BakehouseError, ProcedureName, Result};
use bakehouse_gateway::{ProcedureGateway, procedure_params};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;

const INSERT_SALE: ProcedureName = ProcedureName::new("dbo.InsertSale");
const GET_SALES_BY_DATE: ProcedureName = ProcedureName::new("dbo.GetSalesByDate");
const GET_DAILY_SALES_TOTAL: ProcedureName = ProcedureName::new("dbo.GetDailySalesTotal");

#[derive(Debug, Clone, PartialEq)]
pub struct NewSale {
    pub sale_date: NaiveDate,
    pub product_id: i64,
    pub quantity: i32,
    pub amount: BigDecimal,
    pub payment_method: String,
}

procedure_params!(NewSale {
    sale_date => "SaleDate",
    product_id => "ProductId",
    quantity => "Quantity",
    amount => "Amount",
    payment_method => "PaymentMethod",
});

struct SaleDay {
    sale_date: NaiveDate,
}

procedure_params!(SaleDay { sale_date => "SaleDate" });

#[derive(Debug, Clone)]
pub struct SaleData {
    gateway: ProcedureGateway,
}

impl SaleData {
    pub fn new(gateway: ProcedureGateway) -> Self {
        Self { gateway }
    }

    /// Record a sale and return its id
    pub async fn insert(&self, sale: &NewSale) -> Result<i64> {
        if sale.quantity <= 0 {
            return Err(BakehouseError::InvalidInput(format!(
                "quantity must be positive, got {}",
                sale.quantity
            )));
        }
        crate::require_text("payment method", &sale.payment_method)?;
        insert_returning_id(&self.gateway, INSERT_SALE, sale).await
    }

    pub async fn for_date(&self, sale_date: NaiveDate) -> Result<Vec<Sale>> {
        self.gateway
            .load_many(GET_SALES_BY_DATE, &SaleDay { sale_date })
            .await
    }

    /// Takings for one day. A day without sales reports a zero total.
    pub async fn daily_total(&self, sale_date: NaiveDate) -> Result<DailySalesTotal> {
        let mut total: DailySalesTotal = self
            .gateway
            .load_first_or_default(GET_DAILY_SALES_TOTAL, &SaleDay { sale_date })
            .await?;
        total.sale_date = sale_date;
        Ok(total)
    }
}
