//! Core application

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::ReportableConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG, SHUTDOWN_TIMEOUT_SECS};
use crate::core::shutdown::ShutdownService;
use crate::data::{ExportRepository, JobQueue, MemoryQueue, SqliteService, StorageManager};
use crate::export::{ExportExecutor, ExportService, ExportWorker, JobOutcome};
use crate::report::{ReportRegistry, TableReport};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: ReportableConfig,
    pub database: Arc<SqliteService>,
    pub storage: Arc<StorageManager>,
    pub queue: Arc<MemoryQueue>,
    pub registry: Arc<ReportRegistry>,
    pub exports: Arc<ExportService>,
    pub worker: Arc<ExportWorker>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        let app = Self::init(&cli_config).await?;
        let result = match command.unwrap_or(Commands::Work { watch: false }) {
            Commands::Work { watch } => app.work(watch).await,
            Commands::Status { id } => app.status(id).await,
            Commands::Retry { id } => app.retry(id).await,
        };

        app.database.close().await;
        result
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = ReportableConfig::load(cli)?;
        Self::build(config, ReportRegistry::new()).await
    }

    /// Wire every service from resolved configuration
    ///
    /// `registry` carries application report kinds; the built-in `table`
    /// kind is added on top, bound to the export database.
    pub async fn build(config: ReportableConfig, registry: ReportRegistry) -> Result<Self> {
        let database = Arc::new(
            SqliteService::open(&config.database.path)
                .await
                .with_context(|| {
                    format!(
                        "Failed to open export database: {}",
                        config.database.path.display()
                    )
                })?,
        );
        Self::with_database(config, database, registry)
    }

    /// Like `build`, over an already opened database
    pub fn with_database(
        config: ReportableConfig,
        database: Arc<SqliteService>,
        mut registry: ReportRegistry,
    ) -> Result<Self> {
        if !registry.contains(TableReport::KIND) {
            registry.register(TableReport::KIND, TableReport::factory(database.pool().clone()));
        }

        let storage = Arc::new(StorageManager::from_settings(&config.storage));
        let queue = Arc::new(MemoryQueue::from_settings(&config.queue));
        let registry = Arc::new(registry);

        tracing::debug!(
            disks = ?storage.names(),
            kinds = ?registry.kinds(),
            queue = %config.queue.name,
            backend = queue.backend_name(),
            "Services initialized"
        );

        let repository: Arc<dyn ExportRepository> = database.clone();
        let job_queue: Arc<dyn JobQueue> = queue.clone();

        let executor = Arc::new(ExportExecutor::new(
            repository.clone(),
            registry.clone(),
            storage.clone(),
            config.export.clone(),
        ));
        let exports = Arc::new(ExportService::new(
            repository.clone(),
            job_queue.clone(),
            config.queue.clone(),
            config.export.clone(),
        ));
        let worker = Arc::new(ExportWorker::new(
            job_queue,
            executor,
            repository,
            config.queue.name.clone(),
        ));

        Ok(Self {
            shutdown: ShutdownService::new(),
            config,
            database,
            storage,
            queue,
            registry,
            exports,
            worker,
        })
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    /// Re-queue dispatched records, then process the queue
    pub async fn work(&self, watch: bool) -> Result<()> {
        let recovered = self.exports.recover_dispatched().await?;
        if recovered > 0 {
            tracing::info!(recovered, "Re-queued dispatched exports");
        }

        if watch {
            return self.watch().await;
        }

        let outcomes = self.worker.drain().await?;
        print_summary(&outcomes);
        Ok(())
    }

    async fn watch(&self) -> Result<()> {
        // Install signal handlers FIRST (before the worker starts pulling jobs)
        self.shutdown.install_signal_handlers();

        let worker = Arc::clone(&self.worker);
        let shutdown_rx = self.shutdown.subscribe();
        let mut handle = tokio::spawn(async move { worker.run(shutdown_rx).await });

        let mut signal = self.shutdown.subscribe();
        tokio::select! {
            joined = &mut handle => {
                let processed = joined.context("Worker task panicked")?;
                tracing::info!(processed, "Worker stopped");
                return Ok(());
            }
            _ = signal.wait_for(|stopped| *stopped) => {}
        }

        tracing::info!(
            timeout_secs = SHUTDOWN_TIMEOUT_SECS,
            "Shutdown requested, waiting for the running export"
        );
        match tokio::time::timeout(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS), handle).await {
            Ok(joined) => {
                let processed = joined.context("Worker task panicked")?;
                tracing::info!(processed, "Worker stopped");
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = SHUTDOWN_TIMEOUT_SECS,
                    "Worker did not stop in time"
                );
            }
        }
        Ok(())
    }

    /// Print one export record as JSON
    pub async fn status(&self, id: i64) -> Result<()> {
        let record = self.exports.find(id).await?;
        println!("{}", serde_json::to_string_pretty(&record)?);
        match record.progress_percentage() {
            Some(percent) => println!("{}: {:.2}%", record.status.label(), percent),
            None => println!("{}: {} rows", record.status.label(), record.rows_processed),
        }
        Ok(())
    }

    /// Retry a failed export and process the queue
    pub async fn retry(&self, id: i64) -> Result<()> {
        let record = self.exports.retry(id).await?;
        println!("Export {} queued as a retry of {}", record.id, id);
        let outcomes = self.worker.drain().await?;
        print_summary(&outcomes);
        Ok(())
    }
}

fn print_summary(outcomes: &[JobOutcome]) {
    let mut completed = 0;
    let mut failed = 0;
    for outcome in outcomes {
        match outcome {
            JobOutcome::Completed(record) => {
                completed += 1;
                println!(
                    "Export {} completed: {}/{} ({} rows)",
                    record.id, record.disk, record.path, record.rows_processed
                );
            }
            JobOutcome::Failed {
                export_id, error, ..
            } => {
                failed += 1;
                match export_id {
                    Some(id) => println!("Export {} failed: {}", id, error),
                    None => println!("Job failed: {}", error),
                }
            }
        }
    }
    println!("Processed {} job(s): {} completed, {} failed", outcomes.len(), completed, failed);
}
