// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "reportable";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "reportable.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "REPORTABLE_CONFIG";

/// Environment variable for the log filter (falls back to RUST_LOG)
pub const ENV_LOG: &str = "REPORTABLE_LOG";

// =============================================================================
// Environment Variables - Exports
// =============================================================================

/// Environment variable for the queue exports are pushed onto
pub const ENV_QUEUE: &str = "REPORTABLE_QUEUE";

/// Environment variable for the queue connection name
pub const ENV_CONNECTION: &str = "REPORTABLE_CONNECTION";

/// Environment variable for the chunked-mode batch size
pub const ENV_CHUNK_SIZE: &str = "REPORTABLE_CHUNK_SIZE";

/// Environment variable for the export record database path
pub const ENV_DB: &str = "REPORTABLE_DB";

// =============================================================================
// Defaults
// =============================================================================

/// Query parameter filters serialize under when no group is set
pub const DEFAULT_FILTER_GROUP: &str = "filters";

/// Rows per batch in chunked mode
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

pub const DEFAULT_QUEUE: &str = "default";

/// Connection name the in-process queue answers to
pub const DEFAULT_QUEUE_CONNECTION: &str = "memory";

pub const DEFAULT_DISK: &str = "local";

/// Directory on the disk exports are written to
pub const DEFAULT_DIRECTORY: &str = "reports";

/// Root of the default `local` filesystem disk
pub const DEFAULT_STORAGE_ROOT: &str = "storage";

/// Export record database path
pub const DEFAULT_DB_PATH: &str = "reportable.db";

/// Deliveries per job before it is dead-lettered
///
/// A failed export is terminal, so redelivery only makes sense for failures
/// that happen before the executor touches the record.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;

/// Delay before a released job becomes visible again
pub const DEFAULT_BACKOFF_SECS: u64 = 0;

/// Dead-lettered jobs the in-memory queue keeps; older ones are dropped
pub const DEFAULT_DEAD_LETTER_LIMIT: usize = 1000;

// =============================================================================
// SQLite Database
// =============================================================================

/// SQLite connection pool max connections
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// SQLite busy timeout in seconds
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 30;

/// SQLite cache size (negative = KB, so -16000 = 16MB)
pub const SQLITE_CACHE_SIZE: &str = "-16000";

/// SQLite WAL auto-checkpoint threshold (pages, ~4MB at 1000)
pub const SQLITE_WAL_AUTOCHECKPOINT: &str = "1000";

// =============================================================================
// Worker
// =============================================================================

/// How long an idle worker waits for a push before polling again
pub const WORKER_IDLE_WAIT_MS: u64 = 1000;

/// Grace period for an in-flight export after shutdown is requested
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 300;
