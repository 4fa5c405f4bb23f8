//! Declarative helpers for row types and parameter objects

/// Declare the column table of a row type.
///
/// ```ignore
/// #[derive(Debug, Default)]
/// struct Product { id: i32, name: String, price: BigDecimal }
///
/// procedure_row!(Product {
///     id => "ProductId",
///     name => "Name",
///     price => "Price",
/// });
/// ```
#[macro_export]
macro_rules! procedure_row {
    ($ty:ty { $($field:ident => $column:literal),+ $(,)? }) => {
        impl $crate::FromRow for $ty {
            const FIELDS: &'static [$crate::FieldDescriptor<Self>] = &[
                $(
                    $crate::FieldDescriptor {
                        column: $column,
                        assign: |row: &mut $ty, value: $crate::Value| -> $crate::Result<()> {
                            row.$field = $crate::FromValue::from_value(value)?;
                            Ok(())
                        },
                    },
                )+
            ];
        }
    };
}

/// Declare how a parameter struct binds to procedure inputs.
///
/// ```ignore
/// struct ProductById { id: i32 }
///
/// procedure_params!(ProductById { id => "ProductId" });
/// ```
#[macro_export]
macro_rules! procedure_params {
    ($ty:ty { $($field:ident => $name:literal),* $(,)? }) => {
        impl $crate::ToParams for $ty {
            fn to_params(&self) -> ::std::vec::Vec<$crate::Parameter> {
                ::std::vec![$($crate::ToParam::to_param(&self.$field, $name)),*]
            }
        }
    };
}
