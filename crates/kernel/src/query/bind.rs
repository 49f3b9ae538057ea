//! Binding of compiled SeaQuery values to sqlx arguments.

use chrono::NaiveDate;
use sea_query::{Value, Values};
use sqlx::Arguments;
use sqlx::postgres::PgArguments;

use super::QueryError;

/// Convert positional values into `PgArguments`, preserving order.
///
/// Only the value types the compiler and resources produce are supported;
/// anything else is a programming error.
pub fn to_arguments(values: Values) -> Result<PgArguments, QueryError> {
    let mut args = PgArguments::default();
    for value in values.0 {
        let added = match value {
            Value::Bool(v) => args.add(v),
            Value::Int(v) => args.add(v),
            Value::BigInt(v) => args.add(v),
            Value::BigUnsigned(v) => {
                let v = v
                    .map(|n| i64::try_from(n).map_err(|_| QueryError::OutOfRange { name: "parameter", value: n }))
                    .transpose()?;
                args.add(v)
            }
            Value::String(v) => args.add(v.map(|s| String::clone(&s))),
            Value::ChronoDate(v) => args.add(v.map(|d| NaiveDate::clone(&d))),
            other => return Err(QueryError::UnsupportedValue(format!("{other:?}"))),
        };
        added.map_err(|e| QueryError::Encode(e.to_string()))?;
    }
    Ok(args)
}
