//! Service modules for the exposure ingest pipeline
//!
//! Leaves first: naming and normalization, hashing, per-file registration,
//! tree scanning, then the session passes that run over stored records.

pub mod calibration_sessions;
pub mod canonical_namer;
pub mod content_hasher;
pub mod file_registrar;
pub mod file_scanner;
pub mod header_normalizer;
pub mod light_sessions;
pub mod session_linker;

pub use calibration_sessions::CalibrationSessionClusterer;
pub use content_hasher::hash_file;
pub use file_registrar::{FileRegistrar, Registration, SkipReason};
pub use file_scanner::BatchScanner;
pub use header_normalizer::{normalize_file, normalize_header, Classification, Rejection};
pub use light_sessions::LightSessionClusterer;
pub use session_linker::SessionLinker;
