//! Tests for row mapping and value coercion

use crate::{FromRow, FromValue, RowPlan, map_rows, procedure_row};
use bakehouse_core::{BakehouseError, ColumnMeta, QueryResult, Value};
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use pretty_assertions::assert_eq;
use std::str::FromStr;

#[derive(Debug, Default, Clone, PartialEq)]
struct OrderLine {
    order_id: i64,
    product: String,
    quantity: i32,
    unit_price: BigDecimal,
    delivery_date: NaiveDate,
    notes: Option<String>,
}

procedure_row!(OrderLine {
    order_id => "OrderId",
    product => "ProductName",
    quantity => "Quantity",
    unit_price => "UnitPrice",
    delivery_date => "DeliveryDate",
    notes => "Notes",
});

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn result(columns: &[&str], rows: Vec<Vec<Value>>) -> QueryResult {
    QueryResult::from_rows(columns.iter().map(|c| c.to_string()).collect(), rows)
}

#[test]
fn test_field_table_is_static() {
    let columns: Vec<&str> = OrderLine::FIELDS.iter().map(|f| f.column).collect();
    assert_eq!(
        columns,
        vec!["OrderId", "ProductName", "Quantity", "UnitPrice", "DeliveryDate", "Notes"]
    );
}

#[test]
fn test_columns_match_ignoring_case() {
    let rows = map_rows::<OrderLine>(result(
        &["ORDERID", "productname", "Quantity"],
        vec![vec![Value::Int64(9), Value::String("Rye".into()), Value::Int32(3)]],
    ))
    .unwrap();

    assert_eq!(rows[0].order_id, 9);
    assert_eq!(rows[0].product, "Rye");
    assert_eq!(rows[0].quantity, 3);
}

#[test]
fn test_missing_columns_keep_defaults_and_extra_columns_are_ignored() {
    let rows = map_rows::<OrderLine>(result(
        &["Quantity", "WarehouseCode", "InternalFlag"],
        vec![vec![Value::Int32(12), Value::String("W1".into()), Value::Bool(true)]],
    ))
    .unwrap();

    assert_eq!(
        rows[0],
        OrderLine {
            quantity: 12,
            ..OrderLine::default()
        }
    );
}

#[test]
fn test_plan_reports_unmatched_columns() {
    let columns = vec![
        ColumnMeta::new("OrderId", "int", 0),
        ColumnMeta::new("Extra", "int", 1),
    ];
    let plan = RowPlan::for_columns::<OrderLine>(&columns);
    assert_eq!(plan.unmatched_columns(&columns), vec!["Extra"]);
}

#[test]
fn test_null_leaves_field_at_default() {
    let rows = map_rows::<OrderLine>(result(
        &["OrderId", "ProductName", "Notes"],
        vec![
            vec![Value::Int64(1), Value::Null, Value::Null],
            vec![Value::Int64(2), Value::String("Bun".into()), Value::String("no nuts".into())],
        ],
    ))
    .unwrap();

    assert_eq!(rows[0].product, "");
    assert_eq!(rows[0].notes, None);
    assert_eq!(rows[1].notes.as_deref(), Some("no nuts"));
}

#[test]
fn test_dates_truncate_time_of_day() {
    let stored = date(2024, 6, 1).and_hms_opt(0, 0, 0).unwrap();
    let rows = map_rows::<OrderLine>(result(
        &["DeliveryDate"],
        vec![
            vec![Value::DateTime(stored)],
            vec![Value::Date(date(2024, 6, 2))],
            vec![Value::String("2024-06-03".into())],
        ],
    ))
    .unwrap();

    let dates: Vec<NaiveDate> = rows.iter().map(|r| r.delivery_date).collect();
    assert_eq!(dates, vec![date(2024, 6, 1), date(2024, 6, 2), date(2024, 6, 3)]);
}

#[test]
fn test_decimal_columns() {
    let rows = map_rows::<OrderLine>(result(
        &["UnitPrice"],
        vec![
            vec![Value::Decimal("3.75".into())],
            vec![Value::Int32(2)],
            vec![Value::Float64(1.5)],
        ],
    ))
    .unwrap();

    assert_eq!(rows[0].unit_price, BigDecimal::from_str("3.75").unwrap());
    assert_eq!(rows[1].unit_price, BigDecimal::from(2));
    assert_eq!(rows[2].unit_price, BigDecimal::from_str("1.5").unwrap());
}

#[test]
fn test_coercion_failure_names_the_column() {
    let err = map_rows::<OrderLine>(result(
        &["Quantity"],
        vec![vec![Value::String("a dozen".into())]],
    ))
    .unwrap_err();

    match err {
        BakehouseError::Mapping(msg) => {
            assert!(msg.contains("Quantity"), "{msg}");
            assert!(msg.contains("string"), "{msg}");
        }
        other => panic!("expected mapping error, got {other:?}"),
    }
}

#[test]
fn test_integer_overflow_is_a_mapping_error() {
    let err = map_rows::<OrderLine>(result(&["Quantity"], vec![vec![Value::Int64(i64::MAX)]]))
        .unwrap_err();
    assert!(matches!(err, BakehouseError::Mapping(_)));
}

#[test]
fn test_scalar_coercions() {
    assert!(bool::from_value(Value::Int64(1)).unwrap());
    assert!(!bool::from_value(Value::String("false".into())).unwrap());
    assert_eq!(i32::from_value(Value::Int16(-4)).unwrap(), -4);
    assert_eq!(u8::from_value(Value::Int32(200)).unwrap(), 200);
    assert!(u8::from_value(Value::Int32(300)).is_err());
    assert_eq!(f64::from_value(Value::Decimal("0.25".into())).unwrap(), 0.25);
    assert_eq!(String::from_value(Value::Int32(5)).unwrap(), "5");
    assert!(String::from_value(Value::Bytes(vec![1])).is_err());
    assert_eq!(Option::<i32>::from_value(Value::Null).unwrap(), None);

    let dt = NaiveDateTime::from_value(Value::String("2024-01-02 03:04:05".into())).unwrap();
    assert_eq!(dt, date(2024, 1, 2).and_hms_opt(3, 4, 5).unwrap());

    let id = uuid::Uuid::new_v4();
    assert_eq!(uuid::Uuid::from_value(Value::String(id.to_string())).unwrap(), id);
}
