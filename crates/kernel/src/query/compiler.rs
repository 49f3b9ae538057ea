//! Listing query compiler using SeaQuery.
//!
//! Wraps a resource's hand-written source query as the derived table `p` and
//! appends:
//! - WHERE conditions from validated filters (values always bound)
//! - ORDER BY from user sorts followed by the mandatory default tiebreaker
//! - LIMIT/OFFSET as bound parameters
//!
//! The matching COUNT statement shares the same filter fragment.

use std::sync::LazyLock;

use regex::Regex;
use sea_query::extension::postgres::PgExpr;
use sea_query::{
    Alias, Asterisk, Expr, Order, PostgresQueryBuilder, Query, SelectStatement,
    SimpleExpr, Value, Values,
};

use super::QueryError;
use super::types::{
    AllowList, FilterExpression, FilterOperator, QueryParams, SortDirection, TypedValue,
    storage_column,
};

/// Alias of the derived table every filter and sort column is read from.
pub const SOURCE_ALIAS: &str = "p";

/// Regex for valid SQL identifiers (column names).
///
/// # Panics
///
/// Panics if the hard-coded regex literal is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static VALID_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("valid regex literal"));

/// One column of a resource's default ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderKey {
    /// Storage column on `p`.
    pub column: &'static str,
    pub direction: SortDirection,
}

impl OrderKey {
    pub const fn asc(column: &'static str) -> Self {
        Self {
            column,
            direction: SortDirection::Asc,
        }
    }

    pub const fn desc(column: &'static str) -> Self {
        Self {
            column,
            direction: SortDirection::Desc,
        }
    }
}

/// SQL text plus positional parameter values.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub sql: String,
    pub values: Values,
}

impl Compiled {
    pub fn from_statement(statement: &SelectStatement) -> Self {
        let (sql, values) = statement.build(PostgresQueryBuilder);
        tracing::debug!(sql = %sql, params = values.0.len(), "compiled query");
        Self { sql, values }
    }
}

/// Compiles [`QueryParams`] against one resource's allow-list and default
/// ordering. Holds no mutable state; compiling twice yields identical output.
#[derive(Debug, Clone, Copy)]
pub struct QueryCompiler<'a> {
    params: &'a QueryParams,
    allow: &'a AllowList,
    default_order: &'a [OrderKey],
}

impl<'a> QueryCompiler<'a> {
    /// `default_order` must be non-empty: it is what keeps a parent's rows
    /// contiguous for the denormalizer.
    pub fn new(params: &'a QueryParams, allow: &'a AllowList, default_order: &'a [OrderKey]) -> Self {
        Self {
            params,
            allow,
            default_order,
        }
    }

    /// Append one AND-joined condition per filter, in list order.
    pub fn compile_filters(&self, base: &mut SelectStatement) -> Result<(), QueryError> {
        for filter in &self.params.filters {
            // Re-checked so hand-built params cannot bypass the allow-list.
            let Some(allowed) = self.allow.filter(&filter.field) else {
                continue;
            };
            if !allowed.permits(filter.operator) {
                continue;
            }
            base.and_where(build_filter_condition(filter)?);
        }
        Ok(())
    }

    /// Append ORDER BY: user sorts first, then the default ordering as a
    /// stable tiebreaker.
    pub fn compile_order_by(&self, base: &mut SelectStatement) -> Result<(), QueryError> {
        for sort in &self.params.sorts {
            if self.allow.sort(&sort.field).is_none() {
                continue;
            }
            base.order_by(source_column(&storage_column(&sort.field))?, order(sort.direction));
        }
        if self.default_order.is_empty() {
            return Err(QueryError::MissingDefaultOrder);
        }
        for key in self.default_order {
            base.order_by(source_column(key.column)?, order(key.direction));
        }
        Ok(())
    }

    /// Append LIMIT/OFFSET as bound parameters.
    pub fn compile_pagination(&self, base: &mut SelectStatement) {
        base.limit(self.params.limit);
        base.offset(self.params.offset);
    }

    /// `SELECT p.* FROM (source) AS p WHERE ... ORDER BY ... LIMIT ... OFFSET ...`
    pub fn page_statement(&self, source: SelectStatement) -> Result<SelectStatement, QueryError> {
        let mut query = wrap_source(source);
        self.compile_filters(&mut query)?;
        self.compile_order_by(&mut query)?;
        self.compile_pagination(&mut query);
        Ok(query)
    }

    /// `SELECT COUNT(*) FROM (source) AS p WHERE ...`, ignoring pagination.
    pub fn count_statement(&self, source: SelectStatement) -> Result<SelectStatement, QueryError> {
        let mut query = Query::select();
        query
            .expr(Expr::col(Asterisk).count())
            .from_subquery(source, Alias::new(SOURCE_ALIAS));
        self.compile_filters(&mut query)?;
        Ok(query)
    }
}

/// `SELECT p.* FROM (source) AS p`.
pub fn wrap_source(source: SelectStatement) -> SelectStatement {
    let mut query = Query::select();
    query
        .column((Alias::new(SOURCE_ALIAS), Asterisk))
        .from_subquery(source, Alias::new(SOURCE_ALIAS));
    query
}

/// `SELECT p.* FROM (source) AS p WHERE p.<column> = $1`, for detail lookups.
pub fn keyed_statement(
    source: SelectStatement,
    column: &str,
    key: i64,
) -> Result<SelectStatement, QueryError> {
    let mut query = wrap_source(source);
    query.and_where(Expr::col(source_column(column)?).eq(key));
    Ok(query)
}

/// Qualified `p.<column>` reference after identifier validation.
pub fn source_column(column: &str) -> Result<(Alias, Alias), QueryError> {
    if !VALID_IDENTIFIER.is_match(column) {
        return Err(QueryError::InvalidIdentifier(column.to_string()));
    }
    Ok((Alias::new(SOURCE_ALIAS), Alias::new(column)))
}

fn order(direction: SortDirection) -> Order {
    match direction {
        SortDirection::Asc => Order::Asc,
        SortDirection::Desc => Order::Desc,
    }
}

/// Build a single filter condition.
fn build_filter_condition(filter: &FilterExpression) -> Result<SimpleExpr, QueryError> {
    let field_expr = Expr::col(source_column(&storage_column(&filter.field))?);

    let condition = match filter.operator {
        FilterOperator::Eq => field_expr.eq(scalar(filter)?),
        FilterOperator::Ne => field_expr.ne(scalar(filter)?),
        FilterOperator::Gt => field_expr.gt(scalar(filter)?),
        FilterOperator::Lt => field_expr.lt(scalar(filter)?),
        FilterOperator::Gte => field_expr.gte(scalar(filter)?),
        FilterOperator::Lte => field_expr.lte(scalar(filter)?),
        FilterOperator::Like => field_expr.like(contains_pattern(filter)?),
        FilterOperator::Ilike => field_expr.ilike(contains_pattern(filter)?),
        FilterOperator::In => field_expr.is_in(list(filter)),
        FilterOperator::Nin => field_expr.is_not_in(list(filter)),
    };
    Ok(condition)
}

fn scalar(filter: &FilterExpression) -> Result<Value, QueryError> {
    filter
        .values
        .first()
        .cloned()
        .map(Value::from)
        .ok_or_else(|| QueryError::MissingValue(filter.field.clone()))
}

fn list(filter: &FilterExpression) -> Vec<Value> {
    filter.values.iter().cloned().map(Value::from).collect()
}

/// `%value%` with the value's own wildcards escaped.
fn contains_pattern(filter: &FilterExpression) -> Result<String, QueryError> {
    match filter.values.first() {
        Some(TypedValue::Text(s)) => Ok(format!("%{}%", escape_like_wildcards(s))),
        Some(_) => Err(QueryError::PatternOnNonText(filter.field.clone())),
        None => Err(QueryError::MissingValue(filter.field.clone())),
    }
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

impl From<TypedValue> for Value {
    fn from(value: TypedValue) -> Self {
        match value {
            TypedValue::Text(s) => s.into(),
            TypedValue::Integer(i) => i.into(),
            TypedValue::Boolean(b) => b.into(),
            TypedValue::Date(d) => d.into(),
        }
    }
}
