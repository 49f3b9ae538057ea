//! Listable business resources.
//!
//! Each resource supplies:
//! - an allow-list of filter/sort fields and a default ordering
//! - a source query (parent table plus 1:1 joins) exposing every filterable
//!   and sortable column under its storage name
//! - an expansion that LEFT JOINs its children onto the paged parents
//! - an [`AggregateShape`] that folds the flat rows back into responses

pub mod common;
pub mod journal_entry;
pub mod payment_term;
pub mod quotation;
pub mod sales_order;
pub mod schema;

pub use journal_entry::JournalEntry;
pub use payment_term::PaymentTerm;
pub use quotation::Quotation;
pub use sales_order::SalesOrder;

use std::future::Future;
use std::time::Duration;

use sea_query::SelectStatement;
use serde::Serialize;
use sqlx::PgPool;
use sqlx::postgres::PgRow;

use crate::denorm::{AggregateShape, collect_aggregates};
use crate::error::{AppError, AppResult};
use crate::query::{
    AllowList, Compiled, OrderKey, QueryCompiler, QueryParams, keyed_statement, to_arguments,
};

/// A resource exposed through generic list/detail endpoints.
pub trait Resource: Send + Sync + 'static {
    /// Name used in logs and not-found messages.
    const NAME: &'static str;

    /// One flat joined row.
    type Row: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin;

    /// Sealed response aggregate.
    type Response: Serialize + Send + Sync;

    /// Row-to-aggregate folding.
    type Shape: AggregateShape<Row = Self::Row, Key = i64, Output = Self::Response, Shell: Send>
        + Default
        + Send
        + Sync;

    fn allow_list() -> &'static AllowList;

    /// Parent-level ordering appended after user sorts. Must end with a
    /// unique column.
    fn default_order() -> &'static [OrderKey];

    /// Parent rows with their 1:1 joins.
    fn source() -> SelectStatement;

    /// Wrap the (filtered, paged) parent statement as `p` and join children.
    fn expand(parents: SelectStatement) -> SelectStatement;

    /// Child-level tiebreakers appended after the parent ordering.
    fn child_order(query: &mut SelectStatement);
}

/// One page of aggregates plus the total matching parent count.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Executes resource queries against the pool under a deadline.
#[derive(Clone)]
pub struct Repository {
    pool: PgPool,
    timeout: Duration,
}

impl Repository {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Compile the page and count statements for a listing.
    pub fn list_statements<R: Resource>(params: &QueryParams) -> AppResult<(Compiled, Compiled)> {
        let compiler = QueryCompiler::new(params, R::allow_list(), R::default_order());

        let mut rows = R::expand(compiler.page_statement(R::source())?);
        compiler.compile_order_by(&mut rows)?;
        R::child_order(&mut rows);

        let count = compiler.count_statement(R::source())?;

        Ok((
            Compiled::from_statement(&rows),
            Compiled::from_statement(&count),
        ))
    }

    /// Compile the detail statement for one parent id.
    pub fn detail_statement<R: Resource>(id: i64) -> AppResult<Compiled> {
        let params = QueryParams::default();
        let compiler = QueryCompiler::new(&params, R::allow_list(), R::default_order());

        let mut rows = R::expand(keyed_statement(R::source(), "id", id)?);
        compiler.compile_order_by(&mut rows)?;
        R::child_order(&mut rows);

        Ok(Compiled::from_statement(&rows))
    }

    /// Run the paged SELECT and the COUNT concurrently on separate pooled
    /// connections. The two are not transactionally consistent.
    pub async fn list<R: Resource>(&self, params: &QueryParams) -> AppResult<Page<R::Response>> {
        let (rows, count) = Self::list_statements::<R>(params)?;

        let (items, total) = self
            .with_deadline(async {
                tokio::try_join!(
                    fetch_aggregates::<R>(&self.pool, rows),
                    fetch_count(&self.pool, count)
                )
            })
            .await?;

        tracing::debug!(
            resource = R::NAME,
            returned = items.len(),
            total,
            "listed aggregates"
        );

        Ok(Page { items, total })
    }

    /// Fetch one aggregate by parent id.
    pub async fn find<R: Resource>(&self, id: i64) -> AppResult<Option<R::Response>> {
        let compiled = Self::detail_statement::<R>(id)?;
        let aggregates = self
            .with_deadline(fetch_aggregates::<R>(&self.pool, compiled))
            .await?;
        Ok(aggregates.into_iter().next())
    }

    /// Fetch one aggregate or fail with not-found.
    pub async fn get<R: Resource>(&self, id: i64) -> AppResult<R::Response> {
        self.find::<R>(id)
            .await?
            .ok_or_else(|| AppError::NotFound(R::NAME.to_string()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Dropping the inner future on timeout closes its cursor and discards
    /// any in-flight aggregate.
    async fn with_deadline<T>(&self, fut: impl Future<Output = AppResult<T>>) -> AppResult<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| AppError::Timeout)?
    }
}

/// Stream rows through the resource's shape. All or nothing.
async fn fetch_aggregates<R: Resource>(
    pool: &PgPool,
    compiled: Compiled,
) -> AppResult<Vec<R::Response>> {
    let args = to_arguments(compiled.values)?;
    let rows = sqlx::query_as_with::<_, R::Row, _>(&compiled.sql, args).fetch(pool);
    let aggregates = collect_aggregates(R::Shape::default(), rows).await?;
    Ok(aggregates)
}

async fn fetch_count(pool: &PgPool, compiled: Compiled) -> AppResult<i64> {
    let args = to_arguments(compiled.values)?;
    let total: i64 = sqlx::query_scalar_with(&compiled.sql, args)
        .fetch_one(pool)
        .await?;
    Ok(total)
}
