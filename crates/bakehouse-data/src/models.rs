//! Row types returned by the bakery procedures
//!
//! Field names follow Rust conventions; the column each one reads is declared
//! alongside with [`procedure_row!`].

use bakehouse_core::{BakehouseError, Parameter, Result, Value};
use bakehouse_gateway::{FromValue, ToParam, procedure_row};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// A product on the shop's price list
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Product {
    pub product_id: i64,
    pub name: String,
    pub category: String,
    pub price: BigDecimal,
    pub is_active: bool,
}

procedure_row!(Product {
    product_id => "ProductId",
    name => "Name",
    category => "Category",
    price => "Price",
    is_active => "IsActive",
});

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Customer {
    pub customer_id: i64,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
}

procedure_row!(Customer {
    customer_id => "CustomerId",
    name => "Name",
    phone => "Phone",
    email => "Email",
    address => "Address",
});

/// Lifecycle of a custom order, stored as its name
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    #[default]
    Pending,
    Baking,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Baking,
        OrderStatus::Ready,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Baking => "Baking",
            OrderStatus::Ready => "Ready",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Delivered and cancelled orders accept no further status changes
    pub fn is_final(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = BakehouseError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| BakehouseError::Mapping(format!("unknown order status '{}'", s)))
    }
}

impl FromValue for OrderStatus {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => s.parse(),
            other => Err(BakehouseError::Mapping(format!(
                "cannot convert {} to order status",
                other.type_name()
            ))),
        }
    }
}

impl ToParam for OrderStatus {
    fn to_param(&self, name: &'static str) -> Parameter {
        Parameter::new(name, Value::String(self.as_str().to_string()))
    }
}

/// A custom order header with its computed total
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Order {
    pub order_id: i64,
    pub customer_id: i64,
    pub customer_name: String,
    pub order_date: NaiveDate,
    pub delivery_date: NaiveDate,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub total: BigDecimal,
}

procedure_row!(Order {
    order_id => "OrderId",
    customer_id => "CustomerId",
    customer_name => "CustomerName",
    order_date => "OrderDate",
    delivery_date => "DeliveryDate",
    status => "Status",
    notes => "Notes",
    total => "Total",
});

#[derive(Debug, Default, Clone, PartialEq)]
pub struct OrderItem {
    pub order_item_id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

procedure_row!(OrderItem {
    order_item_id => "OrderItemId",
    order_id => "OrderId",
    product_id => "ProductId",
    product_name => "ProductName",
    quantity => "Quantity",
    unit_price => "UnitPrice",
});

impl OrderItem {
    pub fn line_total(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.quantity)
    }
}

/// A counter sale
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Sale {
    pub sale_id: i64,
    pub sale_date: NaiveDate,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub amount: BigDecimal,
    pub payment_method: String,
}

procedure_row!(Sale {
    sale_id => "SaleId",
    sale_date => "SaleDate",
    product_id => "ProductId",
    product_name => "ProductName",
    quantity => "Quantity",
    amount => "Amount",
    payment_method => "PaymentMethod",
});

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DailySalesTotal {
    pub sale_date: NaiveDate,
    pub total: BigDecimal,
    pub sale_count: i32,
}

procedure_row!(DailySalesTotal {
    sale_date => "SaleDate",
    total => "Total",
    sale_count => "SaleCount",
});

/// An ingredient or packaging item tracked in the store room
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StockItem {
    pub stock_item_id: i64,
    pub name: String,
    pub unit: String,
    pub quantity: BigDecimal,
    pub reorder_level: BigDecimal,
}

procedure_row!(StockItem {
    stock_item_id => "StockItemId",
    name => "Name",
    unit => "Unit",
    quantity => "Quantity",
    reorder_level => "ReorderLevel",
});

impl StockItem {
    pub fn needs_reorder(&self) -> bool {
        self.quantity <= self.reorder_level
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct LedgerEntry {
    pub entry_id: i64,
    pub entry_date: NaiveDate,
    pub account: String,
    pub description: String,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
}

procedure_row!(LedgerEntry {
    entry_id => "EntryId",
    entry_date => "EntryDate",
    account => "Account",
    description => "Description",
    debit => "Debit",
    credit => "Credit",
});

/// Debits minus credits for one ledger account
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AccountBalance {
    pub account: String,
    pub balance: BigDecimal,
}

procedure_row!(AccountBalance {
    account => "Account",
    balance => "Balance",
});

/// A till operator
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: i64,
    pub name: String,
    pub role: String,
    pub is_active: bool,
}

procedure_row!(User {
    user_id => "UserId",
    name => "Name",
    role => "Role",
    is_active => "IsActive",
});

/// Per-product totals over a reporting period
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SalesReportLine {
    pub product_id: i64,
    pub product_name: String,
    pub quantity_sold: i64,
    pub revenue: BigDecimal,
}

procedure_row!(SalesReportLine {
    product_id => "ProductId",
    product_name => "ProductName",
    quantity_sold => "QuantitySold",
    revenue => "Revenue",
});
