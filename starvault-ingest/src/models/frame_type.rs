//! Exposure frame classification

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Purpose of an exposure, taken from the `IMAGETYP` header card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameType {
    Light,
    Dark,
    Flat,
    Bias,
}

impl FrameType {
    /// Calibration types in the order their sessions are built
    pub const CALIBRATION: [FrameType; 3] = [FrameType::Bias, FrameType::Dark, FrameType::Flat];

    /// Match order used by `classify`
    const MATCH_ORDER: [FrameType; 4] = [
        FrameType::Light,
        FrameType::Flat,
        FrameType::Dark,
        FrameType::Bias,
    ];

    /// Classify an `IMAGETYP` value by case-sensitive substring match.
    ///
    /// Capture programs write values such as `Light Frame` or `Dark`; the
    /// first name found wins. Returns `None` for anything else.
    pub fn classify(image_type: &str) -> Option<Self> {
        Self::MATCH_ORDER
            .into_iter()
            .find(|ft| image_type.contains(ft.as_str()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FrameType::Light => "Light",
            FrameType::Dark => "Dark",
            FrameType::Flat => "Flat",
            FrameType::Bias => "Bias",
        }
    }

    pub fn is_calibration(&self) -> bool {
        !matches!(self, FrameType::Light)
    }

    /// Filter token applies to Light and Flat only
    pub fn uses_filter(&self) -> bool {
        matches!(self, FrameType::Light | FrameType::Flat)
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for FrameType {
    type Err = String;

    /// Exact stored name; use `classify` for header values
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Light" => Ok(FrameType::Light),
            "Dark" => Ok(FrameType::Dark),
            "Flat" => Ok(FrameType::Flat),
            "Bias" => Ok(FrameType::Bias),
            other => Err(format!("unknown frame type: {}", other)),
        }
    }
}
