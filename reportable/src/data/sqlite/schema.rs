//! SQLite schema definitions

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema SQL for a fresh database
pub const SCHEMA: &str = r#"
-- =============================================================================
-- Infrastructure: Schema version tracking
-- =============================================================================
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at INTEGER NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at INTEGER NOT NULL,
    checksum TEXT NOT NULL,
    execution_time_ms INTEGER,
    success INTEGER NOT NULL DEFAULT 1
);

-- =============================================================================
-- Report exports
-- =============================================================================
CREATE TABLE IF NOT EXISTS report_exports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    report_kind TEXT NOT NULL,
    descriptor TEXT NOT NULL,
    query_sql TEXT NOT NULL,
    query_bindings TEXT NOT NULL DEFAULT '[]',
    status TEXT NOT NULL DEFAULT 'pending' CHECK(status IN ('pending', 'dispatched', 'processing', 'completed', 'failed')),
    rows_processed INTEGER NOT NULL DEFAULT 0 CHECK(rows_processed >= 0),
    total_rows INTEGER CHECK(total_rows IS NULL OR total_rows >= 0),
    started_at INTEGER,
    completed_at INTEGER,
    failed_at INTEGER,
    error_message TEXT,
    retried_from_id INTEGER REFERENCES report_exports(id) ON DELETE SET NULL,
    disk TEXT NOT NULL,
    path TEXT NOT NULL,
    queue TEXT NOT NULL,
    connection TEXT,
    job_id TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_report_exports_status ON report_exports(status);
CREATE INDEX IF NOT EXISTS idx_report_exports_retried_from ON report_exports(retried_from_id);
"#;
