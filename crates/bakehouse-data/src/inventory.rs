//! Store-room stock levels

use crate::{StockItem, insert_returning_id, require_text};
use bakehouse_core::{ProcedureName, Result};
use bakehouse_gateway::{NoParams, ProcedureGateway, procedure_params};
use bigdecimal::BigDecimal;

const INSERT_STOCK_ITEM: ProcedureName = ProcedureName::new("dbo.InsertStockItem");
const GET_STOCK_ITEMS: ProcedureName = ProcedureName::new("dbo.GetStockItems");
const ADJUST_STOCK: ProcedureName = ProcedureName::new("dbo.AdjustStock");
const GET_LOW_STOCK_ITEMS: ProcedureName = ProcedureName::new("dbo.GetLowStockItems");

#[derive(Debug, Clone, PartialEq)]
pub struct NewStockItem {
    pub name: String,
    pub unit: String,
    pub quantity: BigDecimal,
    pub reorder_level: BigDecimal,
}

procedure_params!(NewStockItem {
    name => "Name",
    unit => "Unit",
    quantity => "Quantity",
    reorder_level => "ReorderLevel",
});

struct Adjustment<'a> {
    stock_item_id: i64,
    delta: &'a BigDecimal,
}

procedure_params!(Adjustment<'_> {
    stock_item_id => "StockItemId",
    delta => "Delta",
});

#[derive(Debug, Clone)]
pub struct InventoryData {
    gateway: ProcedureGateway,
}

impl InventoryData {
    pub fn new(gateway: ProcedureGateway) -> Self {
        Self { gateway }
    }

    pub async fn insert(&self, item: &NewStockItem) -> Result<i64> {
        require_text("stock item name", &item.name)?;
        require_text("unit", &item.unit)?;
        insert_returning_id(&self.gateway, INSERT_STOCK_ITEM, item).await
    }

    pub async fn list(&self) -> Result<Vec<StockItem>> {
        self.gateway.load_many(GET_STOCK_ITEMS, &NoParams).await
    }

    /// Add `delta` to the on-hand quantity; negative for usage
    pub async fn adjust(&self, stock_item_id: i64, delta: &BigDecimal) -> Result<()> {
        self.gateway
            .execute(ADJUST_STOCK, &Adjustment { stock_item_id, delta })
            .await?;
        tracing::debug!(stock_item_id, %delta, "stock adjusted");
        Ok(())
    }

    /// Items at or below their reorder level
    pub async fn low_stock(&self) -> Result<Vec<StockItem>> {
        self.gateway.load_many(GET_LOW_STOCK_ITEMS, &NoParams).await
    }
}
