//! Built-in report over a SQL select
//!
//! Everything the report needs lives in its arguments, so any `table` export
//! can be rebuilt by a worker that shares the database pool.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;

use super::definition::Report;
use super::error::ReportError;
use super::headers::HeaderMap;
use crate::query::{QueryError, QuerySource, SqliteQuery};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableReportArgs {
    pub sql: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(default, skip_serializing_if = "HeaderMap::is_empty")]
    pub headers: HeaderMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filterable: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,
}

impl TableReportArgs {
    pub fn new(sql: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            filename: filename.into(),
            bindings: Vec::new(),
            order_by: None,
            headers: HeaderMap::default(),
            filterable: None,
            chunk_size: None,
        }
    }

    pub fn order_by(mut self, clause: impl Into<String>) -> Self {
        self.order_by = Some(clause.into());
        self
    }

    pub fn header(mut self, column: impl Into<String>, label: impl Into<String>) -> Self {
        self.headers.insert(column, label);
        self
    }

    pub fn filterable<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filterable = Some(columns.into_iter().map(Into::into).collect());
        self
    }
}

pub struct TableReport {
    pool: SqlitePool,
    args: TableReportArgs,
}

impl TableReport {
    pub const KIND: &'static str = "table";

    pub fn new(pool: SqlitePool, args: TableReportArgs) -> Self {
        Self { pool, args }
    }

    /// Registry factory bound to `pool`
    pub fn factory(
        pool: SqlitePool,
    ) -> impl Fn(&Value) -> Result<Arc<dyn Report>, ReportError> + Send + Sync + 'static {
        move |arguments: &Value| {
            let args: TableReportArgs = serde_json::from_value(arguments.clone()).map_err(|e| {
                ReportError::InvalidArguments {
                    kind: Self::KIND.to_string(),
                    reason: e.to_string(),
                }
            })?;
            Ok(Arc::new(TableReport::new(pool.clone(), args)) as Arc<dyn Report>)
        }
    }
}

impl Report for TableReport {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn arguments(&self) -> Value {
        serde_json::to_value(&self.args).unwrap_or_default()
    }

    fn query(&self) -> Result<Box<dyn QuerySource>, QueryError> {
        let mut query = SqliteQuery::new(self.pool.clone(), self.args.sql.clone())
            .with_bindings(self.args.bindings.clone());
        if let Some(order) = &self.args.order_by {
            query = query.order_by(order.clone());
        }
        if let Some(columns) = &self.args.filterable {
            query = query.filterable(columns.iter().cloned());
        }
        Ok(Box::new(query))
    }

    fn filename(&self) -> String {
        self.args.filename.clone()
    }

    fn headers(&self) -> HeaderMap {
        self.args.headers.clone()
    }

    fn chunk_size(&self) -> Option<usize> {
        self.args.chunk_size
    }
}
