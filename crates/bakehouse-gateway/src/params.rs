//! Parameter objects: named values bound to procedure inputs

use bakehouse_core::{Parameter, SqlType, Value};
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use uuid::Uuid;

/// A structured value whose fields bind by name to a procedure's inputs.
///
/// Usually implemented with [`procedure_params!`](crate::procedure_params).
pub trait ToParams {
    fn to_params(&self) -> Vec<Parameter>;
}

/// Parameter object for procedures that take no inputs
#[derive(Debug, Clone, Copy, Default)]
pub struct NoParams;

impl ToParams for NoParams {
    fn to_params(&self) -> Vec<Parameter> {
        Vec::new()
    }
}

impl ToParams for () {
    fn to_params(&self) -> Vec<Parameter> {
        Vec::new()
    }
}

/// A single field value that can be bound as a named parameter
pub trait ToParam {
    /// Storage tag used when the value is absent (`None`)
    const SQL_TYPE: Option<SqlType> = None;

    fn to_param(&self, name: &'static str) -> Parameter;
}

impl<T: ToParam + ?Sized> ToParam for &T {
    const SQL_TYPE: Option<SqlType> = T::SQL_TYPE;

    fn to_param(&self, name: &'static str) -> Parameter {
        (**self).to_param(name)
    }
}

impl<T: ToParam> ToParam for Option<T> {
    const SQL_TYPE: Option<SqlType> = T::SQL_TYPE;

    fn to_param(&self, name: &'static str) -> Parameter {
        match self {
            Some(value) => value.to_param(name),
            None => Parameter {
                name,
                value: Value::Null,
                sql_type: T::SQL_TYPE,
            },
        }
    }
}

macro_rules! plain_param {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl ToParam for $ty {
                fn to_param(&self, name: &'static str) -> Parameter {
                    Parameter::new(name, Value::$variant(self.clone()))
                }
            }
        )*
    };
}

plain_param!(
    bool => Bool,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    String => String,
    Uuid => Uuid,
    NaiveTime => Time,
    DateTime<Utc> => DateTimeUtc,
    Vec<u8> => Bytes,
);

impl ToParam for u8 {
    fn to_param(&self, name: &'static str) -> Parameter {
        Parameter::new(name, Value::Int16(i16::from(*self)))
    }
}

impl ToParam for str {
    fn to_param(&self, name: &'static str) -> Parameter {
        Parameter::new(name, Value::String(self.to_string()))
    }
}

impl ToParam for BigDecimal {
    fn to_param(&self, name: &'static str) -> Parameter {
        Parameter::new(name, Value::Decimal(self.to_string()))
    }
}

impl ToParam for NaiveDateTime {
    const SQL_TYPE: Option<SqlType> = Some(SqlType::DateTime);

    fn to_param(&self, name: &'static str) -> Parameter {
        Parameter::typed(name, Value::DateTime(*self), SqlType::DateTime)
    }
}

impl ToParam for NaiveDate {
    const SQL_TYPE: Option<SqlType> = Some(SqlType::Date);

    fn to_param(&self, name: &'static str) -> Parameter {
        crate::date_only::write(name, *self)
    }
}
