//! Custom orders: headers, line items and delivery scheduling

use crate::{Order, OrderItem, OrderStatus, insert_returning_id};
use bakehouse_core::{BakehouseError, ProcedureName, Result};
use bakehouse_gateway::{ProcedureGateway, procedure_params};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;

const INSERT_ORDER: ProcedureName = ProcedureName::new("dbo.InsertOrder");
const INSERT_ORDER_ITEM: ProcedureName = ProcedureName::new("dbo.InsertOrderItem");
const GET_ORDERS_BY_DELIVERY_DATE: ProcedureName =
    ProcedureName::new("dbo.GetOrdersByDeliveryDate");
const GET_ORDER_ITEMS: ProcedureName = ProcedureName::new("dbo.GetOrderItems");
const UPDATE_ORDER_STATUS: ProcedureName = ProcedureName::new("dbo.UpdateOrderStatus");

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub customer_id: i64,
    pub order_date: NaiveDate,
    pub delivery_date: NaiveDate,
    pub notes: Option<String>,
}

procedure_params!(NewOrder {
    customer_id => "CustomerId",
    order_date => "OrderDate",
    delivery_date => "DeliveryDate",
    notes => "Notes",
});

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

struct OrderLine<'a> {
    order_id: i64,
    product_id: i64,
    quantity: i32,
    unit_price: &'a BigDecimal,
}

procedure_params!(OrderLine<'_> {
    order_id => "OrderId",
    product_id => "ProductId",
    quantity => "Quantity",
    unit_price => "UnitPrice",
});

struct OrderKey {
    order_id: i64,
}

procedure_params!(OrderKey { order_id => "OrderId" });

struct DeliveryDay {
    delivery_date: NaiveDate,
}

procedure_params!(DeliveryDay { delivery_date => "DeliveryDate" });

struct StatusChange {
    order_id: i64,
    status: OrderStatus,
}

procedure_params!(StatusChange {
    order_id => "OrderId",
    status => "Status",
});

#[derive(Debug, Clone)]
pub struct OrderData {
    gateway: ProcedureGateway,
}

impl OrderData {
    pub fn new(gateway: ProcedureGateway) -> Self {
        Self { gateway }
    }

    /// Insert an order header and return its id
    pub async fn insert(&self, order: &NewOrder) -> Result<i64> {
        if order.delivery_date < order.order_date {
            return Err(BakehouseError::InvalidInput(format!(
                "delivery date {} is before order date {}",
                order.delivery_date, order.order_date
            )));
        }
        insert_returning_id(&self.gateway, INSERT_ORDER, order).await
    }

    pub async fn insert_item(&self, order_id: i64, item: &NewOrderItem) -> Result<()> {
        if item.quantity <= 0 {
            return Err(BakehouseError::InvalidInput(format!(
                "quantity must be positive, got {}",
                item.quantity
            )));
        }
        let line = OrderLine {
            order_id,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: &item.unit_price,
        };
        self.gateway.execute(INSERT_ORDER_ITEM, &line).await
    }

    /// Insert an order with all of its lines.
    ///
    /// Each procedure runs on its own connection; if a line fails, the header
    /// and earlier lines stay in place and the error names the order id.
    #[tracing::instrument(skip(self, order, items), fields(customer_id = order.customer_id))]
    pub async fn place(&self, order: &NewOrder, items: &[NewOrderItem]) -> Result<i64> {
        if items.is_empty() {
            return Err(BakehouseError::InvalidInput(
                "an order needs at least one item".into(),
            ));
        }
        if let Some(item) = items.iter().find(|item| item.quantity <= 0) {
            return Err(BakehouseError::InvalidInput(format!(
                "quantity must be positive, got {} for product {}",
                item.quantity, item.product_id
            )));
        }

        let order_id = self.insert(order).await?;
        for item in items {
            if let Err(e) = self.insert_item(order_id, item).await {
                tracing::error!(order_id, product_id = item.product_id, error = %e, "order line failed");
                return Err(e);
            }
        }

        tracing::info!(order_id, lines = items.len(), delivery = %order.delivery_date, "order placed");
        Ok(order_id)
    }

    /// Orders due on `delivery_date`, oldest first
    pub async fn for_delivery(&self, delivery_date: NaiveDate) -> Result<Vec<Order>> {
        self.gateway
            .load_many(GET_ORDERS_BY_DELIVERY_DATE, &DeliveryDay { delivery_date })
            .await
    }

    pub async fn items(&self, order_id: i64) -> Result<Vec<OrderItem>> {
        self.gateway
            .load_many(GET_ORDER_ITEMS, &OrderKey { order_id })
            .await
    }

    pub async fn update_status(&self, order_id: i64, status: OrderStatus) -> Result<()> {
        self.gateway
            .execute(UPDATE_ORDER_STATUS, &StatusChange { order_id, status })
            .await?;
        tracing::info!(order_id, %status, "order status changed");
        Ok(())
    }
}
