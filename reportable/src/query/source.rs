//! Query source abstraction
//!
//! Anything rows can be exported from implements `QuerySource`: it accepts
//! AND-composed predicates, fetches in offset windows or all at once, and
//! exposes its compiled text for auditing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{CompileError, QueryError};
use super::predicate::Predicate;
use crate::utils::sql::interpolate;

/// One result row: column name to value, in select order
pub type Row = Map<String, Value>;

/// Query text plus its ordered bindings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub bindings: Vec<Value>,
}

impl CompiledQuery {
    /// Query text with bindings inlined, for logs and audit records
    pub fn to_raw_sql(&self) -> String {
        interpolate(&self.sql, &self.bindings)
    }
}

#[async_trait]
pub trait QuerySource: Send + Sync {
    /// Short backend name used in errors and logs
    fn backend(&self) -> &'static str;

    /// AND a predicate onto the query
    fn apply_predicate(&mut self, predicate: Predicate) -> Result<(), CompileError>;

    /// Fetch up to `size` rows starting at `offset`, in query order
    async fn fetch_chunk(&self, size: usize, offset: usize) -> Result<Vec<Row>, QueryError>;

    async fn fetch_all(&self) -> Result<Vec<Row>, QueryError>;

    /// Compiled text and bindings, without executing
    fn compiled(&self) -> CompiledQuery;
}
