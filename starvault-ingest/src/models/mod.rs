//! Data models for starvault-ingest

pub mod batch_summary;
pub mod exposure_metadata;
pub mod frame_type;
pub mod run_context;

pub use batch_summary::{BatchSummary, UnitOutcome};
pub use exposure_metadata::ExposureMetadata;
pub use frame_type::FrameType;
pub use run_context::{ProgressCallback, RunContext};
