//! Conversions between Bakehouse values and SQLite storage classes

use bakehouse_core::{Parameter, SqlType, Value};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{Value as SqliteValue, ValueRef};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Convert an outgoing parameter to the value SQLite stores.
///
/// Date-tagged parameters are stored as `YYYY-MM-DD` text whatever their
/// time of day, so they compare equal to dates written by the setup script.
pub(crate) fn param_to_sqlite(param: &Parameter) -> SqliteValue {
    match (param.sql_type, &param.value) {
        (_, Value::Null) => SqliteValue::Null,
        (Some(SqlType::Date), Value::DateTime(dt)) => {
            SqliteValue::Text(dt.date().format(DATE_FORMAT).to_string())
        }
        (Some(SqlType::Date), Value::DateTimeUtc(dt)) => {
            SqliteValue::Text(dt.date_naive().format(DATE_FORMAT).to_string())
        }
        (_, value) => value_to_sqlite(value),
    }
}

fn value_to_sqlite(value: &Value) -> SqliteValue {
    match value {
        Value::Null => SqliteValue::Null,
        Value::Bool(b) => SqliteValue::Integer(i64::from(*b)),
        Value::Int16(i) => SqliteValue::Integer(i64::from(*i)),
        Value::Int32(i) => SqliteValue::Integer(i64::from(*i)),
        Value::Int64(i) => SqliteValue::Integer(*i),
        Value::Float32(f) => SqliteValue::Real(f64::from(*f)),
        Value::Float64(f) => SqliteValue::Real(*f),
        Value::Decimal(d) => SqliteValue::Text(d.clone()),
        Value::String(s) => SqliteValue::Text(s.clone()),
        Value::Bytes(b) => SqliteValue::Blob(b.clone()),
        Value::Uuid(u) => SqliteValue::Text(u.to_string()),
        Value::Date(d) => SqliteValue::Text(d.format(DATE_FORMAT).to_string()),
        Value::Time(t) => SqliteValue::Text(t.format("%H:%M:%S%.f").to_string()),
        Value::DateTime(dt) => SqliteValue::Text(dt.format(DATETIME_FORMAT).to_string()),
        Value::DateTimeUtc(dt) => SqliteValue::Text(dt.to_rfc3339()),
    }
}

/// Declared column affinity, as far as conversion cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Affinity {
    Date,
    DateTime,
    Decimal,
    Bool,
    Uuid,
    Other,
}

impl Affinity {
    pub(crate) fn from_decl_type(decl_type: Option<&str>) -> Self {
        let Some(decl) = decl_type else {
            return Affinity::Other;
        };
        let decl = decl.to_ascii_uppercase();
        if decl.contains("DATETIME") || decl.contains("TIMESTAMP") {
            Affinity::DateTime
        } else if decl == "DATE" {
            Affinity::Date
        } else if decl.contains("DECIMAL") || decl.contains("NUMERIC") || decl.contains("MONEY")
        {
            Affinity::Decimal
        } else if decl.starts_with("BOOL") || decl == "BIT" {
            Affinity::Bool
        } else if decl == "UUID" || decl == "UNIQUEIDENTIFIER" {
            Affinity::Uuid
        } else {
            Affinity::Other
        }
    }
}

/// Convert a stored value, using the declared column type where one exists.
/// Text that does not parse under its declared type is passed through as text.
pub(crate) fn read_value(value: ValueRef<'_>, affinity: Affinity) -> Value {
    match (value, affinity) {
        (ValueRef::Null, _) => Value::Null,
        (ValueRef::Integer(i), Affinity::Bool) => Value::Bool(i != 0),
        (ValueRef::Integer(i), Affinity::Decimal) => Value::Decimal(i.to_string()),
        (ValueRef::Real(f), Affinity::Decimal) => Value::Decimal(f.to_string()),
        (ValueRef::Integer(i), _) => Value::Int64(i),
        (ValueRef::Real(f), _) => Value::Float64(f),
        // Invalid UTF-8 comes back as raw bytes
        (ValueRef::Text(bytes), affinity) => match std::str::from_utf8(bytes) {
            Ok(text) => read_text(text.to_owned(), affinity),
            Err(_) => Value::Bytes(bytes.to_vec()),
        },
        (ValueRef::Blob(b), _) => Value::Bytes(b.to_vec()),
    }
}

fn read_text(text: String, affinity: Affinity) -> Value {
    match affinity {
        Affinity::Date => NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
            .map(Value::Date)
            .unwrap_or(Value::String(text)),
        Affinity::DateTime => ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text.trim(), fmt).ok())
            .map(Value::DateTime)
            .unwrap_or(Value::String(text)),
        Affinity::Decimal => Value::Decimal(text),
        Affinity::Uuid => uuid::Uuid::parse_str(text.trim())
            .map(Value::Uuid)
            .unwrap_or(Value::String(text)),
        Affinity::Bool | Affinity::Other => Value::String(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_tagged_parameter_is_stored_as_date_text() {
        let midnight = date(2024, 3, 9).and_hms_opt(0, 0, 0).unwrap();
        let param = Parameter::typed("DeliveryDate", Value::DateTime(midnight), SqlType::Date);
        assert_eq!(param_to_sqlite(&param), SqliteValue::Text("2024-03-09".into()));

        let untagged = Parameter::new("CreatedAt", Value::DateTime(midnight));
        assert_eq!(
            param_to_sqlite(&untagged),
            SqliteValue::Text("2024-03-09 00:00:00".into())
        );
    }

    #[test]
    fn test_typed_null_stays_null() {
        let param = Parameter::typed("DeliveryDate", Value::Null, SqlType::Date);
        assert_eq!(param_to_sqlite(&param), SqliteValue::Null);
    }

    #[test]
    fn test_affinity_from_decl_type() {
        assert_eq!(Affinity::from_decl_type(Some("date")), Affinity::Date);
        assert_eq!(Affinity::from_decl_type(Some("DATETIME")), Affinity::DateTime);
        assert_eq!(Affinity::from_decl_type(Some("DECIMAL(10,2)")), Affinity::Decimal);
        assert_eq!(Affinity::from_decl_type(Some("BOOLEAN")), Affinity::Bool);
        assert_eq!(Affinity::from_decl_type(Some("TEXT")), Affinity::Other);
        assert_eq!(Affinity::from_decl_type(None), Affinity::Other);
    }

    #[test]
    fn test_read_value_uses_affinity() {
        assert_eq!(
            read_value(ValueRef::Text(b"2024-03-09"), Affinity::Date),
            Value::Date(date(2024, 3, 9))
        );
        assert_eq!(
            read_value(ValueRef::Text(b"not a date"), Affinity::Date),
            Value::String("not a date".into())
        );
        assert_eq!(
            read_value(ValueRef::Real(3.75), Affinity::Decimal),
            Value::Decimal("3.75".into())
        );
        assert_eq!(read_value(ValueRef::Integer(1), Affinity::Bool), Value::Bool(true));
        assert_eq!(read_value(ValueRef::Integer(7), Affinity::Other), Value::Int64(7));
        assert_eq!(read_value(ValueRef::Null, Affinity::Date), Value::Null);
    }

    #[test]
    fn test_invalid_utf8_text_is_kept_as_bytes() {
        assert_eq!(
            read_value(ValueRef::Text(b"Cr\xe8me"), Affinity::Other),
            Value::Bytes(b"Cr\xe8me".to_vec())
        );
        assert_eq!(
            read_value(ValueRef::Text("Crème".as_bytes()), Affinity::Other),
            Value::String("Crème".into())
        );
    }
}
