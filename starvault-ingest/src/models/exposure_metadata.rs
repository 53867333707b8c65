//! Typed view of a normalized exposure header

use super::FrameType;
use chrono::NaiveDateTime;

/// Fallback for absent TELESCOP / INSTRUME cards
pub const UNKNOWN_EQUIPMENT: &str = "Unknown";

/// Filter token used for Light and Flat frames without a FILTER card
/// (one-shot-color sensors)
pub const DEFAULT_FILTER: &str = "OSC";

/// Header fields that drive naming, foldering and session grouping
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureMetadata {
    pub frame_type: FrameType,
    /// Parsed DATE-OBS
    pub acquired_at: NaiveDateTime,
    /// Sanitized OBJECT; Light frames only
    pub object: Option<String>,
    pub telescope: String,
    pub instrument: String,
    /// Effective filter: defaulted for Light/Flat, as found for Dark/Bias
    pub filter: Option<String>,
    pub exposure: f64,
    pub x_binning: i64,
    pub y_binning: i64,
    pub sensor_temp: f64,
}
