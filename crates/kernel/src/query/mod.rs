//! Listing query module.
//!
//! This module provides:
//! - Types: FilterOperator, FilterExpression, SortExpression, QueryParams, AllowList
//! - Parser: `field:op=value` / `sort:field=dir` / `offset` / `limit` tokens
//! - QueryCompiler: SeaQuery-based WHERE / ORDER BY / LIMIT-OFFSET generation
//! - Binding of compiled values to sqlx arguments

mod bind;
mod compiler;
mod parser;
pub mod types;

pub use bind::to_arguments;
pub use compiler::{
    Compiled, OrderKey, QueryCompiler, SOURCE_ALIAS, keyed_statement, source_column, wrap_source,
};
pub use parser::{PageLimits, Parsed, QueryParamsBuilder, parse_query_pairs};
pub use types::{
    AllowList, AllowedFilter, AllowedSort, FieldKind, FilterExpression, FilterOperator,
    QueryParams, Rejection, SortDirection, SortExpression, TypedValue,
};

use thiserror::Error;

/// Query compilation errors.
///
/// These indicate a programming error in a resource definition, never bad
/// user input; user input that does not validate is dropped during parsing.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid SQL identifier: {0}")]
    InvalidIdentifier(String),

    #[error("resource has no default ordering")]
    MissingDefaultOrder,

    #[error("filter on '{0}' has no value")]
    MissingValue(String),

    #[error("pattern operator used on non-text field '{0}'")]
    PatternOnNonText(String),

    #[error("unsupported bound value type: {0}")]
    UnsupportedValue(String),

    #[error("{name} out of range: {value}")]
    OutOfRange { name: &'static str, value: u64 },

    #[error("failed to encode bound value: {0}")]
    Encode(String),
}
