//! Date-only adapter
//!
//! Bridges `chrono::NaiveDate` to and from backing stores that hand dates back
//! as combined date-time values. Writes expand the date to midnight and tag
//! the parameter as [`SqlType::Date`] so the driver binds a date-only type;
//! reads accept a date as-is and truncate anything carrying a time of day.
//!
//! The adapter is wired in through the [`FromValue`](crate::FromValue) and
//! [`ToParam`](crate::ToParam) impls for `NaiveDate`, so it applies to every
//! row and parameter type without per-call registration.

use bakehouse_core::{BakehouseError, Parameter, Result, SqlType, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

const DATE_FORMAT: &str = "%Y-%m-%d";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Read a date-only value from whatever the backing store produced
pub fn read(value: Value) -> Result<NaiveDate> {
    match value {
        Value::Date(date) => Ok(date),
        Value::DateTime(dt) => Ok(dt.date()),
        Value::DateTimeUtc(dt) => Ok(dt.date_naive()),
        Value::String(text) => parse_text(&text),
        other => Err(BakehouseError::Mapping(format!(
            "cannot convert {} to date",
            other.type_name()
        ))),
    }
}

/// Build the outgoing parameter for a date-only value
pub fn write(name: &'static str, date: NaiveDate) -> Parameter {
    Parameter::typed(name, Value::DateTime(expand(date)), SqlType::Date)
}

/// The combined date-time a date is stored as: the same day at midnight
pub fn expand(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Parse the text forms file-based stores keep dates in
fn parse_text(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, DATE_FORMAT) {
        return Ok(date);
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return Ok(dt.date());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.date_naive());
    }
    Err(BakehouseError::Mapping(format!(
        "cannot parse '{}' as a date",
        text
    )))
}
