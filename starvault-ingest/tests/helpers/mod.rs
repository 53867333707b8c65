//! Test Helper Utilities
//!
//! Shared utilities for testing starvault-ingest

#![allow(dead_code)]

pub mod db_utils;
pub mod fits_generator;

pub use db_utils::{at, create_test_db, file_record, repository_config};
pub use fits_generator::{patch_card_comment, write_exposure, write_garbage, ExposureSpec};
