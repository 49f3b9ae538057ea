//! Filter, sort, and pagination parameter types.
//!
//! Provides the typed model the parser produces and the compiler consumes:
//! - FilterExpression / SortExpression: a single validated expression
//! - QueryParams: everything one listing request asks for
//! - AllowList: the per-resource whitelist of fields and operators
//! - Rejection: why a raw token was dropped

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Comparison operators accepted in filter tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Less than.
    Lt,
    /// Greater than or equal.
    Gte,
    /// Less than or equal.
    Lte,
    /// Case-sensitive substring match.
    Like,
    /// Case-insensitive substring match.
    Ilike,
    /// Value in a comma-separated list.
    In,
    /// Value not in a comma-separated list.
    Nin,
}

impl FilterOperator {
    /// Every operator, in wire-name order.
    pub const ALL: [FilterOperator; 10] = [
        FilterOperator::Eq,
        FilterOperator::Ne,
        FilterOperator::Gt,
        FilterOperator::Lt,
        FilterOperator::Gte,
        FilterOperator::Lte,
        FilterOperator::Like,
        FilterOperator::Ilike,
        FilterOperator::In,
        FilterOperator::Nin,
    ];

    /// Parse the wire name used in `field:op=value` tokens.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == s)
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Ne => "ne",
            FilterOperator::Gt => "gt",
            FilterOperator::Lt => "lt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lte => "lte",
            FilterOperator::Like => "like",
            FilterOperator::Ilike => "ilike",
            FilterOperator::In => "in",
            FilterOperator::Nin => "nin",
        }
    }

    /// Whether the value is a comma-separated list.
    pub fn is_list(&self) -> bool {
        matches!(self, FilterOperator::In | FilterOperator::Nin)
    }

    /// Whether the value is a substring pattern.
    pub fn is_pattern(&self) -> bool {
        matches!(self, FilterOperator::Like | FilterOperator::Ilike)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage type of a filterable column; raw strings are converted to it
/// before binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Boolean,
    Date,
}

/// A filter value converted to its column type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
    Date(NaiveDate),
}

impl FieldKind {
    /// Convert a single raw value. Returns `None` when it does not parse.
    pub fn convert(&self, raw: &str) -> Option<TypedValue> {
        match self {
            // Postgres rejects NUL in text parameters.
            FieldKind::Text if raw.contains('\0') => None,
            FieldKind::Text => Some(TypedValue::Text(raw.to_string())),
            FieldKind::Integer => raw.trim().parse().ok().map(TypedValue::Integer),
            FieldKind::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(TypedValue::Boolean(true)),
                "false" | "0" => Some(TypedValue::Boolean(false)),
                _ => None,
            },
            FieldKind::Date => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .ok()
                .map(TypedValue::Date),
        }
    }
}

/// A validated filter: field is allow-listed and the value parses.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpression {
    /// API field name as it appeared in the token (e.g. `created-at`).
    pub field: String,

    /// Comparison operator.
    pub operator: FilterOperator,

    /// Converted values. Exactly one for scalar operators, one or more for
    /// `in`/`nin`.
    pub values: Vec<TypedValue>,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Case-insensitive parse of `asc` / `desc`.
    pub fn parse(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case("asc") {
            Some(SortDirection::Asc)
        } else if s.trim().eq_ignore_ascii_case("desc") {
            Some(SortDirection::Desc)
        } else {
            None
        }
    }
}

/// A validated sort expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortExpression {
    /// API field name.
    pub field: String,

    /// Sort direction.
    pub direction: SortDirection,
}

/// Everything a listing request asks for, after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    pub filters: Vec<FilterExpression>,
    pub sorts: Vec<SortExpression>,
    pub offset: u64,
    pub limit: u64,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            sorts: Vec::new(),
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Default page size.
pub const DEFAULT_LIMIT: u64 = 10;

/// Default upper bound on page size.
pub const DEFAULT_MAX_LIMIT: u64 = 100;

/// One allow-listed filter field.
#[derive(Debug, Clone, Copy)]
pub struct AllowedFilter {
    /// API field name.
    pub field: &'static str,

    /// Operators permitted on this field.
    pub operators: &'static [FilterOperator],

    /// Column type used to convert raw values.
    pub kind: FieldKind,
}

impl AllowedFilter {
    pub const fn new(
        field: &'static str,
        operators: &'static [FilterOperator],
        kind: FieldKind,
    ) -> Self {
        Self {
            field,
            operators,
            kind,
        }
    }

    pub fn permits(&self, op: FilterOperator) -> bool {
        self.operators.contains(&op)
    }
}

/// One allow-listed sort field.
#[derive(Debug, Clone, Copy)]
pub struct AllowedSort {
    pub field: &'static str,
}

impl AllowedSort {
    pub const fn new(field: &'static str) -> Self {
        Self { field }
    }
}

/// Per-resource allow-list: which fields may be filtered (and how) and
/// which may be sorted.
#[derive(Debug, Clone, Copy)]
pub struct AllowList {
    pub filters: &'static [AllowedFilter],
    pub sorts: &'static [AllowedSort],
}

impl AllowList {
    pub fn filter(&self, field: &str) -> Option<&AllowedFilter> {
        self.filters.iter().find(|f| f.field == field)
    }

    pub fn sort(&self, field: &str) -> Option<&AllowedSort> {
        self.sorts.iter().find(|s| s.field == field)
    }
}

/// Map an allow-listed API field name to its storage column name.
///
/// Only ever called on names that already passed the allow-list.
pub fn storage_column(field: &str) -> String {
    field.replace('-', "_")
}

/// Why a raw query parameter was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Token does not have the `field:op=value` shape.
    MalformedToken(String),
    /// Field is not in the resource's filter allow-list.
    UnknownField(String),
    /// Operator name is not recognised at all.
    UnknownOperator(String),
    /// Operator exists but is not permitted on this field.
    OperatorNotAllowed { field: String, operator: FilterOperator },
    /// Value does not convert to the field's type.
    InvalidValue { field: String, value: String },
    /// Sort field is not in the resource's sort allow-list.
    UnknownSortField(String),
    /// Sort direction is neither `asc` nor `desc`.
    InvalidDirection { field: String, direction: String },
    /// `offset`/`limit` did not parse or is out of range.
    InvalidPagination { name: String, value: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MalformedToken(t) => write!(f, "malformed filter token '{t}'"),
            Rejection::UnknownField(field) => write!(f, "unknown filter field '{field}'"),
            Rejection::UnknownOperator(op) => write!(f, "unknown operator '{op}'"),
            Rejection::OperatorNotAllowed { field, operator } => {
                write!(f, "operator '{operator}' not allowed on '{field}'")
            }
            Rejection::InvalidValue { field, value } => {
                write!(f, "invalid value '{value}' for '{field}'")
            }
            Rejection::UnknownSortField(field) => write!(f, "unknown sort field '{field}'"),
            Rejection::InvalidDirection { field, direction } => {
                write!(f, "invalid sort direction '{direction}' for '{field}'")
            }
            Rejection::InvalidPagination { name, value } => {
                write!(f, "invalid {name} '{value}'")
            }
        }
    }
}
