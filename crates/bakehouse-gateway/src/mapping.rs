//! Row mapping: column-name descriptors and value coercion

use bakehouse_core::{BakehouseError, ColumnMeta, QueryResult, Result, Row, Value};
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::str::FromStr;
use uuid::Uuid;

/// One mappable field of a row type: the column it reads and how to store it
pub struct FieldDescriptor<T> {
    /// Result column name, matched ignoring ASCII case
    pub column: &'static str,
    /// Coerce the column value and store it in the field
    pub assign: fn(&mut T, Value) -> Result<()>,
}

impl<T> std::fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("column", &self.column)
            .finish()
    }
}

/// A type that can be materialized from a procedure result row.
///
/// Usually implemented with [`procedure_row!`](crate::procedure_row). Fields
/// without a matching column, and fields whose column is NULL, keep the value
/// from `Default`. Columns without a matching field are ignored.
pub trait FromRow: Default + Send + 'static {
    /// Field table for this type
    const FIELDS: &'static [FieldDescriptor<Self>];
}

/// Column-to-field assignment computed once per result set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowPlan {
    /// For each result column, the index of the field it feeds
    targets: Vec<Option<usize>>,
}

impl RowPlan {
    /// Match result columns to the fields of `T`
    pub fn for_columns<T: FromRow>(columns: &[ColumnMeta]) -> Self {
        let targets = columns
            .iter()
            .map(|col| {
                T::FIELDS
                    .iter()
                    .position(|field| field.column.eq_ignore_ascii_case(&col.name))
            })
            .collect();
        Self { targets }
    }

    /// Result columns that feed no field
    pub fn unmatched_columns<'a>(&self, columns: &'a [ColumnMeta]) -> Vec<&'a str> {
        columns
            .iter()
            .zip(&self.targets)
            .filter(|(_, target)| target.is_none())
            .map(|(col, _)| col.name.as_str())
            .collect()
    }

    /// Materialize one row
    pub fn map_row<T: FromRow>(&self, row: Row) -> Result<T> {
        let mut target = T::default();
        for (value, field_idx) in row.into_values().into_iter().zip(&self.targets) {
            let Some(field_idx) = field_idx else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let field = &T::FIELDS[*field_idx];
            (field.assign)(&mut target, value).map_err(|e| match e {
                BakehouseError::Mapping(msg) => {
                    BakehouseError::Mapping(format!("column '{}': {}", field.column, msg))
                }
                other => other,
            })?;
        }
        Ok(target)
    }
}

/// Map every row of a result set, preserving row order
pub fn map_rows<T: FromRow>(result: QueryResult) -> Result<Vec<T>> {
    let plan = RowPlan::for_columns::<T>(&result.columns);
    let unmatched = plan.unmatched_columns(&result.columns);
    if !unmatched.is_empty() {
        tracing::trace!(
            row_type = std::any::type_name::<T>(),
            columns = ?unmatched,
            "ignoring result columns with no matching field"
        );
    }
    result
        .rows
        .into_iter()
        .map(|row| plan.map_row(row))
        .collect()
}

/// Coercion from a backing-store value into a field type
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch(expected: &str, value: &Value) -> BakehouseError {
    BakehouseError::Mapping(format!(
        "cannot convert {} to {}",
        value.type_name(),
        expected
    ))
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(s) | Value::Decimal(s) => Ok(s),
            Value::Null | Value::Bytes(_) => Err(mismatch("string", &value)),
            other => Ok(other.to_string()),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        if let Some(b) = value.as_bool() {
            return Ok(b);
        }
        match value.as_str().map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("true") || s == "1" => Ok(true),
            Some(s) if s.eq_ignore_ascii_case("false") || s == "0" => Ok(false),
            _ => Err(mismatch("bool", &value)),
        }
    }
}

macro_rules! narrow_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self> {
                    let wide = value
                        .as_i64()
                        .ok_or_else(|| mismatch(stringify!($ty), &value))?;
                    <$ty>::try_from(wide).map_err(|_| {
                        BakehouseError::Mapping(format!(
                            "value {} out of range for {}",
                            wide,
                            stringify!($ty)
                        ))
                    })
                }
            }
        )*
    };
}

narrow_int!(u8, i16, i32, u32);

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self> {
        value.as_i64().ok_or_else(|| mismatch("i64", &value))
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        value.as_f64().ok_or_else(|| mismatch("f64", &value))
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self> {
        value
            .as_f64()
            .map(|v| v as f32)
            .ok_or_else(|| mismatch("f32", &value))
    }
}

impl FromValue for BigDecimal {
    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Decimal(s) | Value::String(s) => BigDecimal::from_str(s.trim())
                .map_err(|e| BakehouseError::Mapping(format!("invalid decimal '{}': {}", s, e))),
            Value::Int16(v) => Ok(BigDecimal::from(*v)),
            Value::Int32(v) => Ok(BigDecimal::from(*v)),
            Value::Int64(v) => Ok(BigDecimal::from(*v)),
            Value::Float32(_) | Value::Float64(_) => BigDecimal::from_str(&value.to_string())
                .map_err(|e| BakehouseError::Mapping(format!("invalid decimal {}: {}", value, e))),
            _ => Err(mismatch("decimal", &value)),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Uuid(u) => Ok(*u),
            Value::String(s) => Uuid::parse_str(s.trim())
                .map_err(|e| BakehouseError::Mapping(format!("invalid uuid '{}': {}", s, e))),
            Value::Bytes(b) => Uuid::from_slice(b)
                .map_err(|e| BakehouseError::Mapping(format!("invalid uuid bytes: {}", e))),
            _ => Err(mismatch("uuid", &value)),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> Result<Self> {
        crate::date_only::read(value)
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::DateTime(dt) => Ok(dt),
            Value::DateTimeUtc(dt) => Ok(dt.naive_utc()),
            Value::Date(d) => Ok(crate::date_only::expand(d)),
            Value::String(ref s) => parse_datetime(s).ok_or_else(|| {
                BakehouseError::Mapping(format!("cannot parse '{}' as a datetime", s))
            }),
            other => Err(mismatch("datetime", &other)),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::DateTimeUtc(dt) => Ok(dt),
            Value::DateTime(dt) => Ok(dt.and_utc()),
            Value::String(ref s) => DateTime::parse_from_rfc3339(s.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| parse_datetime(s).map(|dt| dt.and_utc()))
                .ok_or_else(|| {
                    BakehouseError::Mapping(format!("cannot parse '{}' as a timestamp", s))
                }),
            other => Err(mismatch("datetimeoffset", &other)),
        }
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Time(t) => Ok(t),
            Value::DateTime(dt) => Ok(dt.time()),
            Value::String(ref s) => NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f")
                .or_else(|_| NaiveTime::parse_from_str(s.trim(), "%H:%M"))
                .map_err(|_| BakehouseError::Mapping(format!("cannot parse '{}' as a time", s))),
            other => Err(mismatch("time", &other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bytes(b) => Ok(b),
            other => Err(mismatch("bytes", &other)),
        }
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(crate::date_only::expand)
        })
}
