//! SQLite query source
//!
//! Wraps a base SELECT. Filters are applied to the base query as a derived
//! table so predicates and the ORDER BY refer to output column names:
//!
//! ```text
//! SELECT * FROM (<base>) AS source WHERE <p1> AND <p2> ORDER BY <order>
//! ```

use async_trait::async_trait;
use serde_json::{Number, Value};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Column, Row as _, SqlitePool, TypeInfo, ValueRef};

use super::error::{CompileError, QueryError};
use super::predicate::Predicate;
use super::source::{CompiledQuery, QuerySource, Row};

pub struct SqliteQuery {
    pool: SqlitePool,
    base: String,
    base_bindings: Vec<Value>,
    order_by: Option<String>,
    filterable: Option<Vec<String>>,
    clauses: Vec<String>,
    bindings: Vec<Value>,
}

impl SqliteQuery {
    pub fn new(pool: SqlitePool, base: impl Into<String>) -> Self {
        Self {
            pool,
            base: base.into(),
            base_bindings: Vec::new(),
            order_by: None,
            filterable: None,
            clauses: Vec::new(),
            bindings: Vec::new(),
        }
    }

    /// Bindings for placeholders inside the base query
    pub fn with_bindings(mut self, bindings: Vec<Value>) -> Self {
        self.base_bindings = bindings;
        self
    }

    /// Raw ORDER BY clause, e.g. `id ASC`
    ///
    /// Chunked exports need a deterministic order to page correctly.
    pub fn order_by(mut self, clause: impl Into<String>) -> Self {
        self.order_by = Some(clause.into());
        self
    }

    /// Whitelist of columns filters may reference
    pub fn filterable<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filterable = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    async fn fetch(&self, sql: &str, extra: &[i64]) -> Result<Vec<Row>, QueryError> {
        let mut query = sqlx::query(sql);
        for value in self.base_bindings.iter().chain(&self.bindings) {
            query = bind_value(query, value);
        }
        for value in extra {
            query = query.bind(*value);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }
}

#[async_trait]
impl QuerySource for SqliteQuery {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn apply_predicate(&mut self, predicate: Predicate) -> Result<(), CompileError> {
        if let Some(columns) = &self.filterable
            && !columns.iter().any(|c| c == predicate.column())
        {
            return Err(CompileError::UnknownColumn {
                backend: self.backend(),
                column: predicate.column().to_string(),
            });
        }
        let clause = predicate.to_sql(&mut self.bindings);
        self.clauses.push(clause);
        Ok(())
    }

    async fn fetch_chunk(&self, size: usize, offset: usize) -> Result<Vec<Row>, QueryError> {
        let sql = format!("{} LIMIT ? OFFSET ?", self.compiled().sql);
        self.fetch(&sql, &[size as i64, offset as i64]).await
    }

    async fn fetch_all(&self) -> Result<Vec<Row>, QueryError> {
        self.fetch(&self.compiled().sql, &[]).await
    }

    fn compiled(&self) -> CompiledQuery {
        let mut sql = if self.clauses.is_empty() {
            self.base.clone()
        } else {
            format!(
                "SELECT * FROM ({}) AS source WHERE {}",
                self.base,
                self.clauses.join(" AND ")
            )
        };
        if let Some(order) = &self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }

        let mut bindings = self.base_bindings.clone();
        bindings.extend(self.bindings.iter().cloned());
        CompiledQuery { sql, bindings }
    }
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(f) = n.as_f64() {
                query.bind(f)
            } else {
                query.bind(n.to_string())
            }
        }
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

/// Decode a row by the storage class of each value
fn decode_row(row: &SqliteRow) -> Result<Row, QueryError> {
    let mut map = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" | "BOOLEAN" => Value::from(row.try_get_unchecked::<i64, _>(index)?),
                "REAL" => {
                    let f = row.try_get_unchecked::<f64, _>(index)?;
                    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
                }
                "BLOB" => Value::String(hex::encode(
                    row.try_get_unchecked::<Vec<u8>, _>(index)?,
                )),
                _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
            }
        };
        map.insert(column.name().to_string(), value);
    }
    Ok(map)
}
