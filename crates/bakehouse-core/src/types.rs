//! Core types for Bakehouse

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// A backing-store value that can represent any column or parameter type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean
    Bool(bool),
    /// 16-bit signed integer
    Int16(i16),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 32-bit floating point
    Float32(f32),
    /// 64-bit floating point
    Float64(f64),
    /// Decimal/Numeric (stored as string for precision)
    Decimal(String),
    /// UTF-8 string
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// UUID
    Uuid(Uuid),
    /// Date (year, month, day)
    Date(NaiveDate),
    /// Time (hour, minute, second, nanosecond)
    Time(NaiveTime),
    /// DateTime without timezone
    DateTime(NaiveDateTime),
    /// DateTime with timezone (UTC)
    DateTimeUtc(DateTime<Utc>),
}

impl Value {
    /// Check if the value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as i64
    ///
    /// Decimal values with no fractional part are accepted, since SQL Server
    /// returns `SCOPE_IDENTITY()` as `numeric(38, 0)`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int16(v) => Some(*v as i64),
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            Value::Decimal(s) | Value::String(s) => {
                let trimmed = s.trim();
                trimmed.parse::<i64>().ok().or_else(|| {
                    let (whole, frac) = trimmed.split_once('.')?;
                    if frac.chars().all(|c| c == '0') {
                        whole.parse::<i64>().ok()
                    } else {
                        None
                    }
                })
            }
            _ => None,
        }
    }

    /// Try to get as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int16(v) => Some(*v as f64),
            Value::Int32(v) => Some(*v as f64),
            Value::Int64(v) => Some(*v as f64),
            Value::Float32(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            Value::Decimal(s) | Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::Int16(v) => Some(*v != 0),
            Value::Int32(v) => Some(*v != 0),
            Value::Int64(v) => Some(*v != 0),
            _ => None,
        }
    }

    /// Short type name used in mapping error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Uuid(_) => "uuid",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::DateTimeUtc(_) => "datetimeoffset",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Uuid(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v),
            Value::Time(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "{}", v),
            Value::DateTimeUtc(v) => write!(f, "{}", v),
        }
    }
}

/// A row from a procedure result set
#[derive(Debug, Clone)]
pub struct Row {
    /// Column values
    pub values: Vec<Value>,
    /// Column names (shared by every row of the same result set)
    columns: Arc<[String]>,
}

impl Row {
    /// Create a new row
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { values, columns }
    }

    /// Get a value by column index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by column name, ignoring ASCII case
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|idx| self.values.get(idx))
    }

    /// Get column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Consume the row, yielding its values in column order
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Column metadata
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ColumnMeta {
    /// Column name
    #[serde(default)]
    pub name: String,
    /// Data type (backend-specific string)
    #[serde(default)]
    pub data_type: String,
    /// Whether the column can be NULL
    #[serde(default)]
    pub nullable: bool,
    /// Column ordinal position (0-based)
    #[serde(default)]
    pub ordinal: usize,
}

impl ColumnMeta {
    /// Create column metadata with a name and ordinal
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, ordinal: usize) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            ordinal,
        }
    }
}

/// Result set produced by a procedure invocation
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Unique result ID (for log correlation)
    pub id: Uuid,
    /// Column metadata
    pub columns: Vec<ColumnMeta>,
    /// Result rows, in the order the backing store produced them
    pub rows: Vec<Row>,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create a new empty query result
    pub fn empty() -> Self {
        Self {
            id: Uuid::new_v4(),
            columns: Vec::new(),
            rows: Vec::new(),
            execution_time_ms: 0,
        }
    }

    /// Build a result from column names and row values
    pub fn from_rows(column_names: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let columns = column_names
            .iter()
            .enumerate()
            .map(|(idx, name)| ColumnMeta::new(name.clone(), "", idx))
            .collect();
        let shared: Arc<[String]> = column_names.into();
        Self {
            id: Uuid::new_v4(),
            columns,
            rows: rows
                .into_iter()
                .map(|values| Row::new(Arc::clone(&shared), values))
                .collect(),
            execution_time_ms: 0,
        }
    }

    /// Check if the result has rows
    pub fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Column names in ordinal order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Result of a procedure executed for its side effects
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementResult {
    /// Rows affected, as reported by the backing store
    pub affected_rows: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_lookup_ignores_case() {
        let result = QueryResult::from_rows(
            vec!["ProductId".into(), "Name".into()],
            vec![vec![Value::Int32(7), Value::String("Sourdough".into())]],
        );
        let row = &result.rows[0];

        assert_eq!(row.get_by_name("productid"), Some(&Value::Int32(7)));
        assert_eq!(row.get_by_name("NAME").and_then(|v| v.as_str()), Some("Sourdough"));
        assert_eq!(row.get_by_name("missing"), None);
    }

    #[test]
    fn test_rows_share_column_names() {
        let result = QueryResult::from_rows(
            vec!["Id".into()],
            vec![vec![Value::Int32(1)], vec![Value::Int32(2)]],
        );
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.column_names(), vec!["Id"]);
        assert!(std::ptr::eq(
            result.rows[0].columns().as_ptr(),
            result.rows[1].columns().as_ptr()
        ));
    }

    #[test]
    fn test_as_i64_accepts_integral_decimal() {
        assert_eq!(Value::Decimal("42".into()).as_i64(), Some(42));
        assert_eq!(Value::Decimal("42.000".into()).as_i64(), Some(42));
        assert_eq!(Value::Decimal("42.5".into()).as_i64(), None);
        assert_eq!(Value::Bool(true).as_i64(), None);
    }

    #[test]
    fn test_as_f64_widens_integers() {
        assert_eq!(Value::Int32(3).as_f64(), Some(3.0));
        assert_eq!(Value::Decimal("2.50".into()).as_f64(), Some(2.5));
        assert_eq!(Value::Null.as_f64(), None);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Bytes(vec![1, 2, 3]).to_string(), "<3 bytes>");
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(Value::Date(date).to_string(), "2024-03-09");
    }
}
