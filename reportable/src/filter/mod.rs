//! Filter DSL
//!
//! ## Architecture
//!
//! - `comparator` - Closed comparator enumeration and wire tokens
//! - `types` - The immutable `Filter` value
//! - `collection` - Ordered, grouped `FilterCollection` and its serialized forms
//! - `query_string` - Nested-bracket URL encoding
//! - `error` - `DecodeError`
//!
//! ## Wire format
//!
//! ```text
//! {"column": "age", "operator": "between", "value": [18, 65]}
//! filters[0][column]=age&filters[0][operator]=between&filters[0][value][0]=18...
//! ```

pub mod collection;
pub mod comparator;
pub mod error;
pub mod query_string;
pub mod types;

pub use collection::{FilterCollection, FilterSettings};
pub use comparator::Comparator;
pub use error::DecodeError;
pub use types::{Filter, FilterMap};
