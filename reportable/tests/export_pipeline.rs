//! End-to-end export runs over the public API
//!
//! Each test builds its own in-memory database, a filesystem disk under a
//! temp dir, and the `table` report kind over a small `users` table.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use reportable::core::config::{ExportSettings, QueueSettings, ReportableConfig};
use reportable::core::CoreApp;
use reportable::data::{
    DataError, ExportRepository, FilesystemDisk, JobQueue, MemoryQueue, SqliteService,
    StorageManager,
};
use reportable::export::{
    ExportExecutor, ExportRecord, ExportService, ExportStatus, ExportWorker, JobOutcome, NewExport,
};
use reportable::filter::{Filter, FilterCollection, FilterSettings};
use reportable::report::{ReportDefinition, ReportRegistry, TableReport, TableReportArgs};

/// Delegates to SQLite, remembering every progress write
struct RecordingRepository {
    inner: Arc<SqliteService>,
    progress: Mutex<Vec<(i64, Option<i64>)>>,
}

impl RecordingRepository {
    fn progress(&self) -> Vec<(i64, Option<i64>)> {
        self.progress.lock().clone()
    }
}

#[async_trait]
impl ExportRepository for RecordingRepository {
    async fn create_export(&self, new: &NewExport) -> Result<ExportRecord, DataError> {
        self.inner.create_export(new).await
    }

    async fn get_export(&self, id: i64) -> Result<Option<ExportRecord>, DataError> {
        self.inner.get_export(id).await
    }

    async fn mark_dispatched(&self, id: i64, job_id: &str) -> Result<bool, DataError> {
        self.inner.mark_dispatched(id, job_id).await
    }

    async fn mark_processing(&self, id: i64) -> Result<bool, DataError> {
        self.inner.mark_processing(id).await
    }

    async fn mark_completed(&self, id: i64) -> Result<bool, DataError> {
        self.inner.mark_completed(id).await
    }

    async fn mark_failed(&self, id: i64, message: &str) -> Result<bool, DataError> {
        self.inner.mark_failed(id, message).await
    }

    async fn update_progress(
        &self,
        id: i64,
        rows_processed: i64,
        total_rows: Option<i64>,
    ) -> Result<bool, DataError> {
        self.progress.lock().push((rows_processed, total_rows));
        self.inner.update_progress(id, rows_processed, total_rows).await
    }

    async fn list_retries(&self, parent_id: i64) -> Result<Vec<ExportRecord>, DataError> {
        self.inner.list_retries(parent_id).await
    }

    async fn list_exports_by_status(
        &self,
        status: ExportStatus,
    ) -> Result<Vec<ExportRecord>, DataError> {
        self.inner.list_exports_by_status(status).await
    }
}

struct Pipeline {
    db: Arc<SqliteService>,
    repository: Arc<RecordingRepository>,
    service: ExportService,
    executor: ExportExecutor,
    dir: TempDir,
}

impl Pipeline {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(SqliteService::in_memory().await.unwrap());
        seed_users(&db).await;

        let repository = Arc::new(RecordingRepository {
            inner: db.clone(),
            progress: Mutex::new(Vec::new()),
        });
        let settings = ExportSettings {
            temp_dir: Some(dir.path().join("staging")),
            ..ExportSettings::default()
        };

        let mut storage = StorageManager::new();
        storage.register(Arc::new(FilesystemDisk::new("local", dir.path().join("disk"))));
        let mut registry = ReportRegistry::new();
        registry.register(TableReport::KIND, TableReport::factory(db.pool().clone()));

        let queue: Arc<dyn JobQueue> = Arc::new(MemoryQueue::default());
        let service = ExportService::new(
            repository.clone(),
            queue,
            QueueSettings::default(),
            settings.clone(),
        );
        let executor = ExportExecutor::new(
            repository.clone(),
            Arc::new(registry),
            Arc::new(storage),
            settings,
        );

        Self {
            db,
            repository,
            service,
            executor,
            dir,
        }
    }

    fn users(&self) -> ReportDefinition {
        users_report(&self.db)
    }

    fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.dir.path().join("disk").join(path)).unwrap()
    }

    fn exists(&self, path: &str) -> bool {
        self.dir.path().join("disk").join(path).exists()
    }
}

async fn seed_users(db: &SqliteService) {
    sqlx::query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, status TEXT NOT NULL)")
        .execute(db.pool())
        .await
        .unwrap();
    for (name, status) in [
        ("Ann", "active"),
        ("Bob", "inactive"),
        ("Cid", "active"),
        ("Dee", "banned"),
        ("Eve", "active"),
    ] {
        sqlx::query("INSERT INTO users (name, status) VALUES (?, ?)")
            .bind(name)
            .bind(status)
            .execute(db.pool())
            .await
            .unwrap();
    }
}

fn users_report(db: &SqliteService) -> ReportDefinition {
    let args = TableReportArgs::new("SELECT id, name, status FROM users", "users.csv")
        .order_by("id ASC")
        .header("name", "Full name")
        .filterable(["id", "name", "status"]);
    ReportDefinition::new(TableReport::new(db.pool().clone(), args))
}

#[tokio::test]
async fn chunked_export_persists_progress_per_batch() {
    let p = Pipeline::new().await;
    let definition = p
        .users()
        .add_filter(Filter::equals("status", "active").unwrap())
        .with_chunk_size(2);

    let dispatched = p.service.dispatch(&definition).await.unwrap();
    assert_eq!(dispatched.status, ExportStatus::Dispatched);
    assert!(dispatched.query_sql.contains("WHERE"));

    let record = p.executor.run(dispatched.id).await.unwrap();
    assert_eq!(record.status, ExportStatus::Completed);
    assert_eq!(record.rows_processed, 3);
    assert_eq!(record.total_rows, None);
    assert_eq!(p.repository.progress(), vec![(2, None), (3, None)]);

    assert_eq!(
        p.read("reports/users.csv"),
        "id,Full name,status\n1,Ann,active\n3,Cid,active\n5,Eve,active\n"
    );
}

#[tokio::test]
async fn bulk_export_records_total_up_front() {
    let p = Pipeline::new().await;
    let dispatched = p.service.dispatch(&p.users().all_at_once()).await.unwrap();

    let record = p.executor.run(dispatched.id).await.unwrap();
    assert_eq!(record.total_rows, Some(5));
    assert_eq!(record.rows_processed, 5);
    assert_eq!(record.progress_percentage(), Some(100.0));
    assert_eq!(p.repository.progress(), vec![(0, Some(5)), (5, Some(5))]);
    assert_eq!(p.read("reports/users.csv").lines().count(), 6);
}

#[tokio::test]
async fn filters_from_query_string_reach_the_export() {
    let p = Pipeline::new().await;
    let filters = FilterCollection::from_query_string(
        "filters[0][column]=status&filters[0][operator]=not_in&filters[0][value][0]=active&filters[0][value][1]=banned",
        None,
        &FilterSettings::default(),
    )
    .unwrap();
    let dispatched = p
        .service
        .dispatch(&p.users().with_filters(filters))
        .await
        .unwrap();

    p.executor.run(dispatched.id).await.unwrap();
    assert_eq!(p.read("reports/users.csv"), "id,Full name,status\n2,Bob,inactive\n");
}

#[tokio::test]
async fn custom_path_creates_nested_directories() {
    let p = Pipeline::new().await;
    let definition = p
        .users()
        .to_path("custom/exports/2026")
        .with_filename("everyone.csv");
    let dispatched = p.service.dispatch(&definition).await.unwrap();
    assert_eq!(dispatched.path, "custom/exports/2026/everyone.csv");

    p.executor.run(dispatched.id).await.unwrap();
    assert!(p.exists("custom/exports/2026/everyone.csv"));
    assert!(!p.exists("reports/users.csv"));
}

#[tokio::test]
async fn empty_result_writes_empty_file() {
    let p = Pipeline::new().await;
    let definition = p
        .users()
        .add_filter(Filter::equals("status", "nobody").unwrap());
    let dispatched = p.service.dispatch(&definition).await.unwrap();

    let record = p.executor.run(dispatched.id).await.unwrap();
    assert_eq!(record.rows_processed, 0);
    assert_eq!(p.read("reports/users.csv"), "");
}

#[tokio::test]
async fn failing_source_fails_record_and_retry_links_back() {
    let p = Pipeline::new().await;
    let args = TableReportArgs::new("SELECT id, label FROM audit_log", "audit.csv").order_by("id");
    let definition = ReportDefinition::new(TableReport::new(p.db.pool().clone(), args));
    let dispatched = p.service.dispatch(&definition).await.unwrap();

    assert!(p.executor.run(dispatched.id).await.is_err());
    let failed = p.service.find(dispatched.id).await.unwrap();
    assert_eq!(failed.status, ExportStatus::Failed);
    assert!(failed.failed_at.is_some());
    assert!(failed.error_message.as_deref().unwrap_or_default().contains("audit_log"));
    assert!(!p.exists("reports/audit.csv"));

    sqlx::query("CREATE TABLE audit_log (id INTEGER PRIMARY KEY, label TEXT)")
        .execute(p.db.pool())
        .await
        .unwrap();
    sqlx::query("INSERT INTO audit_log (label) VALUES ('login')")
        .execute(p.db.pool())
        .await
        .unwrap();

    let retry = p.service.retry(failed.id).await.unwrap();
    assert_eq!(retry.retried_from_id, Some(failed.id));
    assert_eq!(retry.query_sql, failed.query_sql);

    let completed = p.executor.run(retry.id).await.unwrap();
    assert_eq!(completed.status, ExportStatus::Completed);
    assert_eq!(p.read("reports/audit.csv"), "id,label\n1,login\n");

    let parent = p.service.retried_from(&completed).await.unwrap().unwrap();
    assert_eq!(parent.id, failed.id);
    let retries = p.service.retries(failed.id).await.unwrap();
    assert_eq!(retries.iter().map(|r| r.id).collect::<Vec<_>>(), vec![retry.id]);

    // A completed export is not retryable
    assert!(p.service.retry(completed.id).await.is_err());
}

#[tokio::test]
async fn unknown_filter_column_rejected_before_record_exists() {
    let p = Pipeline::new().await;
    let definition = p
        .users()
        .add_filter(Filter::is_null("password").unwrap());

    assert!(p.service.dispatch(&definition).await.is_err());
    assert!(
        p.service
            .list(ExportStatus::Pending)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(
        p.service
            .list(ExportStatus::Dispatched)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn app_worker_drains_dispatched_exports() {
    let dir = TempDir::new().unwrap();
    let db = Arc::new(SqliteService::in_memory().await.unwrap());
    seed_users(&db).await;

    let mut config = ReportableConfig::default();
    config.storage.disks.clear();
    let mut disk = reportable::core::config::DiskSettings {
        driver: Default::default(),
        root: dir.path().join("disk"),
    };
    config.storage.disks.insert("local".to_string(), disk.clone());
    disk.root = dir.path().join("archive");
    config.storage.disks.insert("archive".to_string(), disk);

    let app = CoreApp::with_database(config, db.clone(), ReportRegistry::new()).unwrap();
    let first = app.exports.dispatch(&users_report(&db)).await.unwrap();
    let second = app
        .exports
        .dispatch(&users_report(&db).to_disk("archive").all_at_once())
        .await
        .unwrap();
    assert_eq!(app.queue.pending(&app.config.queue.name).await.unwrap(), 2);

    let worker: &ExportWorker = &app.worker;
    let outcomes = worker.drain().await.unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| matches!(o, JobOutcome::Completed(_))));

    for id in [first.id, second.id] {
        let record = app.exports.find(id).await.unwrap();
        assert_eq!(record.status, ExportStatus::Completed);
        assert!(record.is_finished());
    }
    assert!(dir.path().join("disk/reports/users.csv").exists());
    assert!(dir.path().join("archive/reports/users.csv").exists());
}
