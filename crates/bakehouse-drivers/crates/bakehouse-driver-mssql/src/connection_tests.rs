//! Tests for MS SQL Server connection module

use crate::connection::{
    MssqlConnectionError, TiberiusParam, classify, column_data_to_value, params_to_tiberius,
    tiberius_config,
};
use bakehouse_core::{
    BakehouseError, ConnectionConfig, Parameter, ProcedureName, SqlType, Value,
};
use chrono::{NaiveDate, NaiveTime};
use pretty_assertions::assert_eq;
use std::borrow::Cow;
use tiberius::{ColumnData, ToSql};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_plain_values_keep_their_types() {
    let uuid = uuid::Uuid::new_v4();
    let params = params_to_tiberius(&[
        Parameter::new("A", Value::Bool(true)),
        Parameter::new("B", Value::Int16(7)),
        Parameter::new("C", Value::Int32(100_000)),
        Parameter::new("D", Value::Int64(9_999_999_999)),
        Parameter::new("E", Value::Float64(2.5)),
        Parameter::new("F", Value::String("Rye".into())),
        Parameter::new("G", Value::Decimal("4.25".into())),
        Parameter::new("H", Value::Uuid(uuid)),
        Parameter::new("I", Value::Bytes(vec![1, 2, 3])),
    ]);

    assert_eq!(
        params,
        vec![
            TiberiusParam::Bool(true),
            TiberiusParam::I16(7),
            TiberiusParam::I32(100_000),
            TiberiusParam::I64(9_999_999_999),
            TiberiusParam::F64(2.5),
            TiberiusParam::String("Rye".into()),
            TiberiusParam::String("4.25".into()),
            TiberiusParam::Uuid(uuid),
            TiberiusParam::Bytes(vec![1, 2, 3]),
        ]
    );
}

#[test]
fn test_date_tag_binds_date_only() {
    let midnight = date(2024, 2, 29).and_hms_opt(0, 0, 0).unwrap();
    let params = params_to_tiberius(&[
        Parameter::typed("DeliveryDate", Value::DateTime(midnight), SqlType::Date),
        Parameter::new("CreatedAt", Value::DateTime(midnight)),
    ]);

    assert_eq!(params[0], TiberiusParam::Date(Some(date(2024, 2, 29))));
    assert_eq!(params[1], TiberiusParam::DateTime(Some(midnight)));
    assert!(matches!(params[0].to_sql(), ColumnData::Date(Some(_))));
    assert!(matches!(params[1].to_sql(), ColumnData::DateTime2(Some(_))));
}

#[test]
fn test_nulls_are_typed_when_tagged() {
    let params = params_to_tiberius(&[
        Parameter::new("Notes", Value::Null),
        Parameter::typed("DeliveryDate", Value::Null, SqlType::Date),
        Parameter::typed("PaidAt", Value::Null, SqlType::DateTime),
    ]);

    assert!(matches!(params[0].to_sql(), ColumnData::String(None)));
    assert!(matches!(params[1].to_sql(), ColumnData::Date(None)));
    assert!(matches!(params[2].to_sql(), ColumnData::DateTime2(None)));
}

#[test]
fn test_column_data_to_value() {
    assert_eq!(column_data_to_value(ColumnData::I32(None)).unwrap(), Value::Null);
    assert_eq!(column_data_to_value(ColumnData::Bit(Some(true))).unwrap(), Value::Bool(true));
    assert_eq!(column_data_to_value(ColumnData::U8(Some(200))).unwrap(), Value::Int16(200));
    assert_eq!(column_data_to_value(ColumnData::I64(Some(42))).unwrap(), Value::Int64(42));
    assert_eq!(
        column_data_to_value(ColumnData::String(Some(Cow::Owned("Bun".into())))).unwrap(),
        Value::String("Bun".into())
    );
}

#[test]
fn test_temporal_columns_round_trip_through_to_sql() {
    let d = date(2024, 6, 1);
    assert_eq!(column_data_to_value(d.to_sql()).unwrap(), Value::Date(d));

    let dt = d.and_hms_opt(13, 45, 30).unwrap();
    assert_eq!(column_data_to_value(dt.to_sql()).unwrap(), Value::DateTime(dt));

    let t = NaiveTime::from_hms_opt(6, 30, 0).unwrap();
    assert_eq!(column_data_to_value(t.to_sql()).unwrap(), Value::Time(t));

    assert_eq!(column_data_to_value(ColumnData::Date(None)).unwrap(), Value::Null);
}

#[test]
fn test_classify_errors() {
    let proc = ProcedureName::new("dbo.GetProducts");

    let io = tiberius::error::Error::Io {
        kind: std::io::ErrorKind::ConnectionReset,
        message: "reset by peer".into(),
    };
    assert!(matches!(classify(proc, io), BakehouseError::Connection(_)));

    let protocol = tiberius::error::Error::Protocol("unexpected token".into());
    assert!(matches!(classify(proc, protocol), BakehouseError::Connection(_)));

    let conversion = tiberius::error::Error::Conversion("bad value".into());
    match classify(proc, conversion) {
        BakehouseError::Procedure(msg) => assert!(msg.contains("dbo.GetProducts"), "{msg}"),
        other => panic!("expected procedure error, got {other:?}"),
    }
}

#[test]
fn test_connection_errors_convert_to_connection() {
    let err: BakehouseError = MssqlConnectionError::ConnectionClosed.into();
    assert!(matches!(err, BakehouseError::Connection(_)));
}

#[test]
fn test_tiberius_config_defaults() {
    let config = ConnectionConfig::new_mssql("db.bakery.local", 0, "Bakery", "pos");
    let tds = tiberius_config(&config).unwrap();
    assert_eq!(tds.get_addr(), "db.bakery.local:1433");
}

#[test]
fn test_tiberius_config_from_ado_string() {
    let config = ConnectionConfig::new("mssql").with_param(
        "connection_string",
        "Server=sql.local,14330;Database=Bakery;User Id=pos;Password=x;TrustServerCertificate=true",
    );
    let tds = tiberius_config(&config).unwrap();
    assert_eq!(tds.get_addr(), "sql.local:14330");
}
