//! # Starvault Common Library
//!
//! Shared code for the starvault exposure repository:
//! - Error type used across crates
//! - Configuration loading and root folder resolution
//! - Date coercion helpers for header timestamps
//! - Metadata store initialization (SQLite)

pub mod config;
pub mod dates;
pub mod db;
pub mod error;

pub use error::{Error, Result};
