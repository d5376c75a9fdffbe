//! Utility functions shared across the crate

pub mod crypto;
pub mod sql;
