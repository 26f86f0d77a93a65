//! Partial-update statement builder.
//!
//! Column names are compile-time constants supplied by the store code; every
//! value goes through a bind parameter.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

/// A value that can be bound into an update.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    NullableText(Option<String>),
    TextArray(Vec<String>),
    Bool(bool),
    Int(i32),
    Timestamp(DateTime<Utc>),
}

/// Accumulates `(column, value)` pairs for a single `UPDATE` statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSet {
    assignments: Vec<(&'static str, SqlValue)>,
}

impl UpdateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: &'static str, value: SqlValue) -> &mut Self {
        self.assignments.push((column, value));
        self
    }

    /// Add the pair only when `value` is present.
    pub fn set_opt<T>(&mut self, column: &'static str, value: Option<T>, wrap: impl FnOnce(T) -> SqlValue) -> &mut Self {
        if let Some(value) = value {
            self.set(column, wrap(value));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.assignments.iter().map(|(column, _)| *column)
    }

    /// `UPDATE <table> SET a = $1, b = $2 WHERE id = $n [RETURNING ...]`.
    ///
    /// Returns `None` when nothing was set.
    pub fn build(self, table: &'static str, id: Uuid, returning: Option<&'static str>) -> Option<QueryBuilder<'static, Postgres>> {
        if self.assignments.is_empty() {
            return None;
        }

        let mut qb = QueryBuilder::<Postgres>::new(format!("UPDATE {table} SET "));
        let mut separated = qb.separated(", ");
        for (column, value) in self.assignments {
            separated.push(column);
            separated.push_unseparated(" = ");
            match value {
                SqlValue::Text(v) => separated.push_bind_unseparated(v),
                SqlValue::NullableText(v) => separated.push_bind_unseparated(v),
                SqlValue::TextArray(v) => separated.push_bind_unseparated(v),
                SqlValue::Bool(v) => separated.push_bind_unseparated(v),
                SqlValue::Int(v) => separated.push_bind_unseparated(v),
                SqlValue::Timestamp(v) => separated.push_bind_unseparated(v),
            };
        }
        qb.push(" WHERE id = ");
        qb.push_bind(id);
        if let Some(columns) = returning {
            qb.push(" RETURNING ");
            qb.push(columns);
        }
        Some(qb)
    }
}
