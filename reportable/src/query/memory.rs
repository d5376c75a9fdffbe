//! In-process query source over a fixed row set

use async_trait::async_trait;

use super::error::{CompileError, QueryError};
use super::predicate::Predicate;
use super::source::{CompiledQuery, QuerySource, Row};

/// Query over rows held in memory
///
/// Row order is the order rows were supplied in. The compiled text is a
/// SQL rendering of the applied predicates against `name`, for auditing only.
#[derive(Debug, Clone)]
pub struct MemoryQuery {
    name: String,
    rows: Vec<Row>,
    columns: Option<Vec<String>>,
    predicates: Vec<Predicate>,
}

impl MemoryQuery {
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            rows,
            columns: None,
            predicates: Vec::new(),
        }
    }

    /// Restrict filtering to the given columns
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    fn matching(&self) -> impl Iterator<Item = &Row> {
        self.rows
            .iter()
            .filter(|row| self.predicates.iter().all(|p| p.matches(row)))
    }
}

#[async_trait]
impl QuerySource for MemoryQuery {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn apply_predicate(&mut self, predicate: Predicate) -> Result<(), CompileError> {
        if let Some(columns) = &self.columns
            && !columns.iter().any(|c| c == predicate.column())
        {
            return Err(CompileError::UnknownColumn {
                backend: self.backend(),
                column: predicate.column().to_string(),
            });
        }
        self.predicates.push(predicate);
        Ok(())
    }

    async fn fetch_chunk(&self, size: usize, offset: usize) -> Result<Vec<Row>, QueryError> {
        Ok(self.matching().skip(offset).take(size).cloned().collect())
    }

    async fn fetch_all(&self) -> Result<Vec<Row>, QueryError> {
        Ok(self.matching().cloned().collect())
    }

    fn compiled(&self) -> CompiledQuery {
        let mut bindings = Vec::new();
        let mut sql = format!("SELECT * FROM {}", self.name);
        if !self.predicates.is_empty() {
            let clauses: Vec<String> = self
                .predicates
                .iter()
                .map(|p| p.to_sql(&mut bindings))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        CompiledQuery { sql, bindings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Filter, FilterCollection};
    use crate::query::compiler::compile;
    use serde_json::json;

    fn users() -> Vec<Row> {
        [
            json!({"id": 1, "name": "Ann", "status": "active"}),
            json!({"id": 2, "name": "Bob", "status": "inactive"}),
            json!({"id": 3, "name": "Cid", "status": "active"}),
            json!({"id": 4, "name": "Dee", "status": "banned"}),
            json!({"id": 5, "name": "Eve", "status": "active"}),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect()
    }

    #[tokio::test]
    async fn test_fetch_chunk_windows() {
        let mut query = MemoryQuery::new("users", users());
        let filters =
            FilterCollection::new().add(Filter::equals("status", "active").unwrap());
        compile(&mut query, &filters).unwrap();

        let first = query.fetch_chunk(2, 0).await.unwrap();
        let second = query.fetch_chunk(2, 2).await.unwrap();
        let third = query.fetch_chunk(2, 4).await.unwrap();

        let ids: Vec<_> = first.iter().chain(&second).map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(3), json!(5)]);
        assert_eq!(second.len(), 1);
        assert!(third.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_all_preserves_column_order() {
        let query = MemoryQuery::new("users", users());
        let rows = query.fetch_all().await.unwrap();
        assert_eq!(rows.len(), 5);
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys, vec!["id", "name", "status"]);
    }

    #[test]
    fn test_unknown_column_rejected() {
        let mut query = MemoryQuery::new("users", users()).with_columns(["status"]);
        let err = query
            .apply_predicate(Predicate::Null {
                column: "email".to_string(),
                negated: false,
            })
            .unwrap_err();
        assert!(matches!(err, CompileError::UnknownColumn { .. }));
    }
}
