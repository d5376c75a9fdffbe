//! Shared fixtures for export tests

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tempfile::TempDir;

use super::executor::ExportExecutor;
use super::service::ExportService;
use super::worker::ExportWorker;
use crate::core::config::{ExportSettings, QueueSettings};
use crate::data::{ExportRepository, FilesystemDisk, MemoryQueue, SqliteService, StorageManager};
use crate::query::{CompileError, CompiledQuery, MemoryQuery, Predicate, QueryError, QuerySource, Row};
use crate::report::{HeaderMap, Report, ReportDefinition, ReportError, ReportRegistry};

/// Five numbered rows, optionally failing once `fail_at` rows were read
pub struct Numbers {
    pub fail_at: Option<usize>,
}

impl Numbers {
    pub const KIND: &'static str = "numbers";

    pub fn ok() -> ReportDefinition {
        ReportDefinition::new(Numbers { fail_at: None })
    }

    pub fn failing_at(rows: usize) -> ReportDefinition {
        ReportDefinition::new(Numbers {
            fail_at: Some(rows),
        })
    }
}

impl Report for Numbers {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn arguments(&self) -> Value {
        json!({ "fail_at": self.fail_at })
    }

    fn query(&self) -> Result<Box<dyn QuerySource>, QueryError> {
        let rows = (1..=5)
            .map(|n| json!({"n": n, "parity": if n % 2 == 0 { "even" } else { "odd" }}))
            .filter_map(|v| v.as_object().cloned())
            .collect();
        Ok(Box::new(NumbersQuery {
            inner: MemoryQuery::new("numbers", rows),
            fail_at: self.fail_at,
        }))
    }

    fn filename(&self) -> String {
        "numbers.csv".to_string()
    }

    fn headers(&self) -> HeaderMap {
        HeaderMap::new().with("n", "Number")
    }
}

struct NumbersQuery {
    inner: MemoryQuery,
    fail_at: Option<usize>,
}

#[async_trait]
impl QuerySource for NumbersQuery {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn apply_predicate(&mut self, predicate: Predicate) -> Result<(), CompileError> {
        self.inner.apply_predicate(predicate)
    }

    async fn fetch_chunk(&self, size: usize, offset: usize) -> Result<Vec<Row>, QueryError> {
        if let Some(limit) = self.fail_at
            && offset >= limit
        {
            return Err(QueryError::Backend("source went away".to_string()));
        }
        self.inner.fetch_chunk(size, offset).await
    }

    async fn fetch_all(&self) -> Result<Vec<Row>, QueryError> {
        if self.fail_at.is_some() {
            return Err(QueryError::Backend("source went away".to_string()));
        }
        self.inner.fetch_all().await
    }

    fn compiled(&self) -> CompiledQuery {
        self.inner.compiled()
    }
}

pub struct Fixture {
    pub db: Arc<SqliteService>,
    pub queue: Arc<MemoryQueue>,
    pub service: ExportService,
    pub executor: Arc<ExportExecutor>,
    pub worker: ExportWorker,
    pub dir: TempDir,
}

impl Fixture {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(SqliteService::in_memory().await.unwrap());
        let queue = Arc::new(MemoryQueue::default());

        let settings = settings(&dir);
        let executor = Arc::new(ExportExecutor::new(
            db.clone(),
            Arc::new(registry()),
            Arc::new(storage(&dir)),
            settings.clone(),
        ));
        let service = ExportService::new(
            db.clone(),
            queue.clone(),
            QueueSettings::default(),
            settings,
        );
        let worker = ExportWorker::new(queue.clone(), executor.clone(), db.clone(), "default");

        Self {
            db,
            queue,
            service,
            executor,
            worker,
            dir,
        }
    }

    /// A second executor over the same disk, writing through `repository`
    pub fn executor_over(&self, repository: Arc<dyn ExportRepository>) -> ExportExecutor {
        ExportExecutor::new(
            repository,
            Arc::new(registry()),
            Arc::new(storage(&self.dir)),
            settings(&self.dir),
        )
    }

    pub fn disk_path(&self, path: &str) -> PathBuf {
        self.dir.path().join("disk").join(path)
    }

    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(self.dir.path().join("staging"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

fn registry() -> ReportRegistry {
    let mut registry = ReportRegistry::new();
    registry.register(Numbers::KIND, |args: &Value| {
        let fail_at = args["fail_at"].as_u64().map(|n| n as usize);
        Ok(Arc::new(Numbers { fail_at }) as Arc<dyn Report>)
    });
    registry.register("broken", |_: &Value| {
        Err(ReportError::InvalidArguments {
            kind: "broken".to_string(),
            reason: "always".to_string(),
        })
    });
    registry
}

fn storage(dir: &TempDir) -> StorageManager {
    let mut storage = StorageManager::new();
    storage.register(Arc::new(FilesystemDisk::new("local", dir.path().join("disk"))));
    storage
}

fn settings(dir: &TempDir) -> ExportSettings {
    ExportSettings {
        temp_dir: Some(dir.path().join("staging")),
        ..Default::default()
    }
}
