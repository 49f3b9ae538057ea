//! Partial update compilation.
//!
//! Request types list their optional fields explicitly and feed them into an
//! [`UpdateSet`]; only fields that are present become `SET` assignments.
//! A nullable column takes an `Option<Option<T>>`: the outer `None` skips the
//! column, `Some(None)` assigns NULL.

use sea_query::{
    DynIden, Expr, IntoIden, PostgresQueryBuilder, Query, SimpleExpr, UpdateStatement,
    Value, Values,
};

/// Column assignments collected from one partial update request.
pub struct UpdateSet {
    table: DynIden,
    assignments: Vec<(DynIden, SimpleExpr)>,
}

/// Implemented by request bodies that describe a partial update.
pub trait IntoUpdateSet {
    fn into_update_set(self) -> UpdateSet;
}

impl UpdateSet {
    pub fn new(table: impl IntoIden) -> Self {
        Self {
            table: table.into_iden(),
            assignments: Vec::new(),
        }
    }

    /// Assign `column` when `value` is present.
    pub fn set<V: Into<Value>>(mut self, column: impl IntoIden, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.assignments
                .push((column.into_iden(), SimpleExpr::Value(value.into())));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Assigned column names, in assignment order.
    pub fn columns(&self) -> Vec<String> {
        self.assignments
            .iter()
            .map(|(column, _)| column.to_string())
            .collect()
    }

    /// `UPDATE <table> SET ... WHERE <key_column> = <key>`, or `None` when
    /// nothing was assigned.
    pub fn statement(self, key_column: impl IntoIden, key: i64) -> Option<UpdateStatement> {
        if self.assignments.is_empty() {
            return None;
        }
        let mut statement = Query::update();
        statement
            .table(self.table)
            .values(self.assignments)
            .and_where(Expr::col(key_column.into_iden()).eq(key));
        Some(statement)
    }

    /// Compile to SQL with positional parameters.
    pub fn build(self, key_column: impl IntoIden, key: i64) -> Option<(String, Values)> {
        self.statement(key_column, key)
            .map(|statement| statement.build(PostgresQueryBuilder))
    }
}
