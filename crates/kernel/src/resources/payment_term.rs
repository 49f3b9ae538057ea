//! Payment terms and their installment lines.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use sea_query::{Alias, Asterisk, Expr, Order, Query, SelectStatement};
use serde::{Deserialize, Serialize};
use sqlx::Postgres;
use sqlx::postgres::{PgTypeInfo, PgValueRef};

use super::common::parents;
use super::schema::{PaymentTermLines, PaymentTerms};
use super::{Repository, Resource};
use crate::denorm::{AggregateShape, Children};
use crate::error::{AppError, AppResult};
use crate::query::{
    AllowList, AllowedFilter, AllowedSort, FieldKind, FilterOperator, OrderKey, SOURCE_ALIAS,
    to_arguments,
};
use crate::update::{IntoUpdateSet, UpdateSet};

use FilterOperator as Op;

static ALLOW: AllowList = AllowList {
    filters: &[
        AllowedFilter::new(
            "id",
            &[Op::Eq, Op::Ne, Op::Gt, Op::Lt, Op::Gte, Op::Lte, Op::In, Op::Nin],
            FieldKind::Integer,
        ),
        AllowedFilter::new(
            "name",
            &[Op::Eq, Op::Ne, Op::Like, Op::Ilike, Op::In, Op::Nin],
            FieldKind::Text,
        ),
        AllowedFilter::new("description", &[Op::Like, Op::Ilike], FieldKind::Text),
        AllowedFilter::new(
            "created-at",
            &[Op::Eq, Op::Gt, Op::Lt, Op::Gte, Op::Lte],
            FieldKind::Date,
        ),
    ],
    sorts: &[
        AllowedSort::new("id"),
        AllowedSort::new("name"),
        AllowedSort::new("created-at"),
    ],
};

static DEFAULT_ORDER: [OrderKey; 1] = [OrderKey::asc("id")];

/// How a term line's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// `value` is basis points of the document total.
    Percent,
    /// `value` is an amount in cents.
    Fixed,
    /// Whatever is left.
    Balance,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Percent => "percent",
            ValueType::Fixed => "fixed",
            ValueType::Balance => "balance",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown payment term value type: {0}")]
pub struct UnknownValueType(String);

impl FromStr for ValueType {
    type Err = UnknownValueType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percent" => Ok(ValueType::Percent),
            "fixed" => Ok(ValueType::Fixed),
            "balance" => Ok(ValueType::Balance),
            other => Err(UnknownValueType(other.to_string())),
        }
    }
}

// Stored as TEXT; an unknown value fails the row decode.
impl sqlx::Type<Postgres> for ValueType {
    fn type_info() -> PgTypeInfo {
        <&str as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <&str as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, Postgres> for ValueType {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <&str as sqlx::Decode<Postgres>>::decode(value)?;
        Ok(raw.parse()?)
    }
}

// =============================================================================
// Rows and responses
// =============================================================================

/// One payment term joined with at most one of its lines.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentTermRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: NaiveDate,
    pub line_id: Option<i64>,
    pub line_sequence: Option<i32>,
    pub line_value_type: Option<ValueType>,
    pub line_value: Option<i64>,
    pub line_days: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentTermLine {
    pub id: i64,
    pub sequence: i32,
    pub value_type: ValueType,
    pub value: i64,
    pub days: i32,
}

impl PaymentTermLine {
    /// Build from nullable LEFT JOIN columns; `None` when the join missed.
    pub fn from_parts(
        id: Option<i64>,
        sequence: Option<i32>,
        value_type: Option<ValueType>,
        value: Option<i64>,
        days: Option<i32>,
    ) -> Option<Self> {
        Some(Self {
            id: id?,
            sequence: sequence?,
            value_type: value_type?,
            value: value?,
            days: days?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentTermHeader {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentTermResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: NaiveDate,
    pub lines: Vec<PaymentTermLine>,
    /// Sum of `percent` line values, in basis points.
    pub allocated_percent: i64,
}

/// Assemble the response and its derived fields.
pub fn to_response(header: PaymentTermHeader, lines: Vec<PaymentTermLine>) -> PaymentTermResponse {
    let allocated_percent = lines
        .iter()
        .filter(|line| line.value_type == ValueType::Percent)
        .fold(0i64, |sum, line| sum.saturating_add(line.value));

    PaymentTermResponse {
        id: header.id,
        name: header.name,
        description: header.description,
        created_at: header.created_at,
        lines,
        allocated_percent,
    }
}

pub struct PaymentTermShell {
    header: PaymentTermHeader,
    lines: Children<i64, PaymentTermLine>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentTermShape;

impl AggregateShape for PaymentTermShape {
    type Row = PaymentTermRow;
    type Key = i64;
    type Shell = PaymentTermShell;
    type Output = PaymentTermResponse;

    fn key(&self, row: &PaymentTermRow) -> i64 {
        row.id
    }

    fn open(&self, row: &PaymentTermRow) -> PaymentTermShell {
        PaymentTermShell {
            header: PaymentTermHeader {
                id: row.id,
                name: row.name.clone(),
                description: row.description.clone(),
                created_at: row.created_at,
            },
            lines: Children::new(),
        }
    }

    fn absorb(&self, shell: &mut PaymentTermShell, row: PaymentTermRow) {
        let line = PaymentTermLine::from_parts(
            row.line_id,
            row.line_sequence,
            row.line_value_type,
            row.line_value,
            row.line_days,
        );
        if let Some(line) = line {
            shell.lines.upsert_last(Some(line.id), || line);
        }
    }

    fn seal(&self, shell: PaymentTermShell) -> PaymentTermResponse {
        to_response(shell.header, shell.lines.into_vec())
    }
}

// =============================================================================
// Resource
// =============================================================================

pub struct PaymentTerm;

impl Resource for PaymentTerm {
    const NAME: &'static str = "payment term";

    type Row = PaymentTermRow;
    type Response = PaymentTermResponse;
    type Shape = PaymentTermShape;

    fn allow_list() -> &'static AllowList {
        &ALLOW
    }

    fn default_order() -> &'static [OrderKey] {
        &DEFAULT_ORDER
    }

    fn source() -> SelectStatement {
        let mut query = Query::select();
        query
            .columns([
                PaymentTerms::Id,
                PaymentTerms::Name,
                PaymentTerms::Description,
                PaymentTerms::CreatedAt,
            ])
            .from(PaymentTerms::Table);
        query
    }

    fn expand(parents_page: SelectStatement) -> SelectStatement {
        let mut query = Query::select();
        query
            .column((parents(), Asterisk))
            .expr_as(
                Expr::col((PaymentTermLines::Table, PaymentTermLines::Id)),
                Alias::new("line_id"),
            )
            .expr_as(
                Expr::col((PaymentTermLines::Table, PaymentTermLines::Sequence)),
                Alias::new("line_sequence"),
            )
            .expr_as(
                Expr::col((PaymentTermLines::Table, PaymentTermLines::ValueType)),
                Alias::new("line_value_type"),
            )
            .expr_as(
                Expr::col((PaymentTermLines::Table, PaymentTermLines::Value)),
                Alias::new("line_value"),
            )
            .expr_as(
                Expr::col((PaymentTermLines::Table, PaymentTermLines::Days)),
                Alias::new("line_days"),
            )
            .from_subquery(parents_page, Alias::new(SOURCE_ALIAS))
            .left_join(
                PaymentTermLines::Table,
                Expr::col((PaymentTermLines::Table, PaymentTermLines::PaymentTermId))
                    .equals((parents(), PaymentTerms::Id)),
            );
        query
    }

    fn child_order(query: &mut SelectStatement) {
        query
            .order_by(
                (PaymentTermLines::Table, PaymentTermLines::Sequence),
                Order::Asc,
            )
            .order_by((PaymentTermLines::Table, PaymentTermLines::Id), Order::Asc);
    }
}

// =============================================================================
// Partial update
// =============================================================================

/// PATCH body. Omitted fields are left untouched; `"description": null`
/// clears the description.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePaymentTerm {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
}

/// Distinguish an explicit `null` from an omitted field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl IntoUpdateSet for UpdatePaymentTerm {
    fn into_update_set(self) -> UpdateSet {
        UpdateSet::new(PaymentTerms::Table)
            .set(PaymentTerms::Name, self.name)
            .set(PaymentTerms::Description, self.description)
    }
}

impl UpdatePaymentTerm {
    pub fn validate(&self) -> AppResult<()> {
        if self.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(AppError::BadRequest("name must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Apply a partial update and return the refreshed aggregate.
pub async fn update(
    repo: &Repository,
    id: i64,
    request: UpdatePaymentTerm,
) -> AppResult<PaymentTermResponse> {
    request.validate()?;

    let compiled = request.into_update_set().build(PaymentTerms::Id, id);
    if let Some((sql, values)) = compiled {
        let args = to_arguments(values)?;
        let result = sqlx::query_with(&sql, args).execute(repo.pool()).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(PaymentTerm::NAME.to_string()));
        }
        tracing::info!(id, "payment term updated");
    }

    repo.get::<PaymentTerm>(id).await
}
