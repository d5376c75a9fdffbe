//! SQLite repositories

pub mod export;

pub use export::{
    create_export, get_export, list_by_status, list_retries, mark_completed, mark_dispatched,
    mark_failed, mark_processing, update_progress,
};
