use crate::app::*;
use bakehouse_data::{NewOrder, NewOrderItem, NewProduct, NewSale, NewStockItem, SalesReportLine};
use bakehouse_settings::{Backend, BakehouseSettings, SessionSettings};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::str::FromStr;
use tempfile::TempDir;

fn sqlite_settings(dir: &TempDir) -> BakehouseSettings {
    let mut settings = BakehouseSettings::default();
    settings.database.sqlite_path = Some(dir.path().join("shop.db"));
    settings
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn amount(text: &str) -> BigDecimal {
    BigDecimal::from_str(text).unwrap()
}

#[test]
fn test_money_rounds_to_cents() {
    assert_eq!(money(&amount("3")), "3.00");
    assert_eq!(money(&amount("2.505")), "2.51");
    assert_eq!(money(&amount("11.000000000000002")), "11.00");
}

#[test]
fn test_money_keeps_cents_on_zero_and_negatives() {
    assert_eq!(money(&BigDecimal::from(0)), "0.00");
    assert_eq!(money(&amount("0.00")), "0.00");
    assert_eq!(money(&amount("0.004")), "0.00");
    assert_eq!(money(&amount("3.5")), "3.50");
    assert_eq!(money(&amount("-12.5")), "-12.50");
    assert_eq!(money(&amount("-0.05")), "-0.05");
}

#[test]
fn test_sales_report_layout() {
    let lines = vec![
        SalesReportLine {
            product_id: 2,
            product_name: "Baguette".into(),
            quantity_sold: 4,
            revenue: amount("12"),
        },
        SalesReportLine {
            product_id: 1,
            product_name: "Rye".into(),
            quantity_sold: 5,
            revenue: amount("11.5"),
        },
    ];
    let text = render_sales_report(date(2024, 6, 1), date(2024, 6, 30), &lines);
    assert_eq!(
        text,
        "Sales 2024-06-01 to 2024-06-30\n\
         \x20 Baguette      4       12.00\n\
         \x20 Rye           5       11.50\n\
         \x20 Total                 23.50\n"
    );

    let empty = render_sales_report(date(2024, 6, 1), date(2024, 6, 1), &[]);
    assert_eq!(empty, "Sales 2024-06-01 to 2024-06-01\n  No sales\n");
}

#[test]
fn test_sqlite_uses_bundled_catalog_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let settings = sqlite_settings(&dir);
    let registry = driver_registry(&settings.database).unwrap();
    assert!(registry.has("sqlite"));
    assert!(registry.has("mssql"));
}

#[test]
fn test_session_signer_from_settings() {
    let configured = SessionSettings {
        secret: Some("0123456789abcdef-shop".into()),
    };
    let a = session_signer(&configured).unwrap();
    let b = session_signer(&configured).unwrap();
    assert_eq!(b.verify(&a.sign(5)), Some(5));

    let short = SessionSettings {
        secret: Some("short".into()),
    };
    assert!(session_signer(&short).is_err());

    let random = session_signer(&SessionSettings::default()).unwrap();
    assert_eq!(random.verify(&a.sign(5)), None);
}

#[tokio::test]
async fn test_check_connection_on_local_file() {
    let dir = tempfile::tempdir().unwrap();
    check_connection(&sqlite_settings(&dir)).await.unwrap();
}

#[tokio::test]
async fn test_sql_server_without_username_fails_before_connecting() {
    let mut settings = BakehouseSettings::default();
    settings.database.backend = Backend::SqlServer;
    let err = check_connection(&settings).await.unwrap_err();
    assert!(err.to_string().contains("username"));
}

#[tokio::test]
async fn test_catalog_file_from_settings() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = dir.path().join("procedures.toml");
    std::fs::write(&catalog, bakehouse_data::SQLITE_CATALOG).unwrap();

    let mut settings = sqlite_settings(&dir);
    settings.database.catalog_path = Some(catalog);
    let data = open_store(&settings).unwrap();
    assert!(data.products.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_catalog_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = sqlite_settings(&dir);
    settings.database.catalog_path = Some(dir.path().join("missing.toml"));
    let data = open_store(&settings).unwrap();
    assert!(data.products.list().await.is_err());
}

#[tokio::test]
async fn test_empty_day_summary() {
    let dir = tempfile::tempdir().unwrap();
    let data = open_store(&sqlite_settings(&dir)).unwrap();
    let summary = daily_summary(&data, date(2024, 3, 1)).await.unwrap();

    assert!(summary.deliveries.is_empty());
    assert!(summary.low_stock.is_empty());
    assert_eq!(
        summary.to_string(),
        "Summary for 2024-03-01\n\
         \x20 Takings: 0.00 from 0 sale(s)\n\
         \x20 No deliveries due\n\
         \x20 Stock levels OK\n"
    );
}

#[tokio::test]
async fn test_busy_day_summary() {
    let dir = tempfile::tempdir().unwrap();
    let data = open_store(&sqlite_settings(&dir)).unwrap();
    let day = date(2024, 3, 1);

    let sourdough = data
        .products
        .insert(&NewProduct {
            name: "Sourdough".into(),
            category: "Bread".into(),
            price: amount("7.50"),
        })
        .await
        .unwrap();
    data.sales
        .insert(&NewSale {
            sale_date: day,
            product_id: sourdough,
            quantity: 2,
            amount: amount("15.00"),
            payment_method: "Card".into(),
        })
        .await
        .unwrap();

    let customer = data
        .customers
        .insert(&bakehouse_data::NewCustomer {
            name: "Ada".into(),
            phone: "5550100".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let order_id = data
        .orders
        .place(
            &NewOrder {
                customer_id: customer,
                order_date: date(2024, 2, 28),
                delivery_date: day,
                notes: None,
            },
            &[NewOrderItem {
                product_id: sourdough,
                quantity: 4,
                unit_price: amount("7.50"),
            }],
        )
        .await
        .unwrap();

    data.inventory
        .insert(&NewStockItem {
            name: "Rye flour".into(),
            unit: "kg".into(),
            quantity: amount("2"),
            reorder_level: amount("5"),
        })
        .await
        .unwrap();

    let summary = daily_summary(&data, day).await.unwrap();
    assert_eq!(summary.takings.sale_count, 1);
    assert_eq!(summary.deliveries.len(), 1);
    assert_eq!(summary.deliveries[0].order_id, order_id);
    assert_eq!(
        summary.to_string(),
        format!(
            "Summary for 2024-03-01\n\
             \x20 Takings: 15.00 from 1 sale(s)\n\
             \x20 Deliveries due: 1\n\
             \x20   #{} Ada (Pending) 30.00\n\
             \x20 Low stock:\n\
             \x20   Rye flour: 2 kg (reorder at 5)\n",
            order_id
        )
    );
}
