//! Query compilation
//!
//! Filters compile to backend-neutral `Predicate`s, which a `QuerySource`
//! ANDs onto its base query. Two sources ship with the crate:
//!
//! - `SqliteQuery` - a base SELECT run through sqlx
//! - `MemoryQuery` - a fixed set of in-process rows

pub mod compiler;
pub mod error;
pub mod memory;
pub mod predicate;
pub mod source;
pub mod sqlite;

pub use compiler::{compile, compile_predicate};
pub use error::{CompileError, QueryError};
pub use memory::MemoryQuery;
pub use predicate::{CompareOp, LikeAnchor, Predicate};
pub use source::{CompiledQuery, QuerySource, Row};
pub use sqlite::SqliteQuery;
