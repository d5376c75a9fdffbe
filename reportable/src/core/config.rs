use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::cli::CliConfig;
use super::constants::{
    CONFIG_FILE_NAME, DEFAULT_BACKOFF_SECS, DEFAULT_CHUNK_SIZE, DEFAULT_DB_PATH, DEFAULT_DIRECTORY,
    DEFAULT_DISK, DEFAULT_MAX_ATTEMPTS, DEFAULT_QUEUE, DEFAULT_STORAGE_ROOT,
};
use crate::filter::FilterSettings;

// =============================================================================
// Resolved configuration
// =============================================================================

/// Queue the export jobs are pushed onto
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSettings {
    pub name: String,
    /// Queue connection name, recorded on each job
    pub connection: Option<String>,
    pub max_attempts: u32,
    pub backoff_secs: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_QUEUE.to_string(),
            connection: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_secs: DEFAULT_BACKOFF_SECS,
        }
    }
}

/// Export defaults, used when a report definition leaves them unset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    pub chunk_size: usize,
    pub disk: String,
    pub directory: String,
    /// Where CSV files are staged before they are moved to their disk
    pub temp_dir: Option<PathBuf>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            disk: DEFAULT_DISK.to_string(),
            directory: DEFAULT_DIRECTORY.to_string(),
            temp_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskDriver {
    #[default]
    Filesystem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskSettings {
    #[serde(default)]
    pub driver: DiskDriver,
    pub root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub disks: BTreeMap<String, DiskSettings>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        let mut disks = BTreeMap::new();
        disks.insert(
            DEFAULT_DISK.to_string(),
            DiskSettings {
                driver: DiskDriver::Filesystem,
                root: PathBuf::from(DEFAULT_STORAGE_ROOT),
            },
        );
        Self { disks }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub path: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportableConfig {
    pub queue: QueueSettings,
    pub export: ExportSettings,
    pub filters: FilterSettings,
    pub storage: StorageSettings,
    pub database: DatabaseSettings,
}

// =============================================================================
// File configuration (JSON)
// =============================================================================

#[derive(Debug, Default, Clone, Deserialize)]
pub struct QueueFileConfig {
    pub name: Option<String>,
    pub connection: Option<String>,
    pub max_attempts: Option<u32>,
    pub backoff_secs: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ExportFileConfig {
    pub chunk_size: Option<usize>,
    pub disk: Option<String>,
    pub directory: Option<String>,
    pub temp_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FiltersFileConfig {
    pub default_group: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct StorageFileConfig {
    pub disks: Option<BTreeMap<String, DiskSettings>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct DatabaseFileConfig {
    pub path: Option<PathBuf>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub queue: Option<QueueFileConfig>,
    pub export: Option<ExportFileConfig>,
    pub filters: Option<FiltersFileConfig>,
    pub storage: Option<StorageFileConfig>,
    pub database: Option<DatabaseFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }
}

impl ReportableConfig {
    /// Load configuration
    ///
    /// Priority (lowest to highest):
    /// 1. Built-in defaults
    /// 2. CLI-specified config path OR `reportable.json` in the working directory
    /// 3. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let path = if let Some(ref path) = cli.config {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Some(path.clone())
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        let file_config = match path {
            Some(path) => {
                let config = FileConfig::load_from_file(&path)?;
                config.warn_unknown_fields();
                config
            }
            None => FileConfig::default(),
        };

        Self::resolve(file_config, cli)
    }

    /// Layer defaults, file values and CLI/env overrides
    pub fn resolve(file_config: FileConfig, cli: &CliConfig) -> Result<Self> {
        let file_queue = file_config.queue.unwrap_or_default();
        let file_export = file_config.export.unwrap_or_default();
        let file_filters = file_config.filters.unwrap_or_default();
        let file_storage = file_config.storage.unwrap_or_default();
        let file_database = file_config.database.unwrap_or_default();

        let queue = QueueSettings {
            name: cli
                .queue
                .clone()
                .or(file_queue.name)
                .unwrap_or_else(|| DEFAULT_QUEUE.to_string()),
            connection: cli.connection.clone().or(file_queue.connection),
            max_attempts: file_queue.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            backoff_secs: file_queue.backoff_secs.unwrap_or(DEFAULT_BACKOFF_SECS),
        };

        let export = ExportSettings {
            chunk_size: cli
                .chunk_size
                .or(file_export.chunk_size)
                .unwrap_or(DEFAULT_CHUNK_SIZE),
            disk: file_export
                .disk
                .unwrap_or_else(|| DEFAULT_DISK.to_string()),
            directory: file_export
                .directory
                .unwrap_or_else(|| DEFAULT_DIRECTORY.to_string()),
            temp_dir: file_export.temp_dir,
        };

        let filters = match file_filters.default_group {
            Some(default_group) => FilterSettings { default_group },
            None => FilterSettings::default(),
        };

        // Configured disks replace the defaults entirely
        let storage = match file_storage.disks {
            Some(disks) => StorageSettings { disks },
            None => StorageSettings::default(),
        };

        let database = DatabaseSettings {
            path: cli
                .db
                .clone()
                .or(file_database.path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
        };

        let config = Self {
            queue,
            export,
            filters,
            storage,
            database,
        };

        config.validate()?;

        tracing::debug!(
            queue = %config.queue.name,
            connection = ?config.queue.connection,
            chunk_size = config.export.chunk_size,
            disk = %config.export.disk,
            directory = %config.export.directory,
            filter_group = %config.filters.default_group,
            database = %config.database.path.display(),
            "Configuration loaded"
        );

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.queue.name.is_empty() {
            anyhow::bail!("Configuration error: queue.name must not be empty");
        }
        if self.queue.max_attempts == 0 {
            anyhow::bail!("Configuration error: queue.max_attempts must be at least 1");
        }
        if self.export.chunk_size == 0 {
            anyhow::bail!("Configuration error: export.chunk_size must be greater than 0");
        }
        if self.filters.default_group.is_empty() {
            anyhow::bail!("Configuration error: filters.default_group must not be empty");
        }
        if !self.storage.disks.contains_key(&self.export.disk) {
            anyhow::bail!(
                "Configuration error: export.disk '{}' is not defined in storage.disks",
                self.export.disk
            );
        }
        Ok(())
    }
}
