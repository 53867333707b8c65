//! Deterministic canonical filenames and repository folders
//!
//! Names and folders are pure functions of `ExposureMetadata`. Downstream
//! consumers match files by these strings, so nothing here may depend on
//! the source path, the clock or the order of registration.
//!
//! Light: `Light/{object}/{telescope}/{instrument}/{YYYYMMDD}/`
//!        `{object}-{telescope}-{instrument}-{filter}-{stamp}-{exp}s-{xb}x{yb}-t{temp}.fits`
//! Flat:  `Calibrate/Flat/{telescope}/{instrument}/{filter}/{YYYYMMDD}/`
//!        `{telescope}-{instrument}-{filter}-{stamp}-{exp}s-{xb}x{yb}-t{temp}.fits`
//! Dark/Bias: `Calibrate/{type}/{telescope}/{instrument}/{exp}s/{YYYYMMDD}/`
//!        `{telescope}-{instrument}-{stamp}-{exp}s-{xb}x{yb}-t{temp}.fits`

use crate::fits::format_number;
use crate::models::exposure_metadata::DEFAULT_FILTER;
use crate::models::{ExposureMetadata, FrameType};
use chrono::NaiveDateTime;

/// Extension every canonical name carries
pub const CANONICAL_EXTENSION: &str = "fits";

/// Telescope and instrument tokens: spaces and backslashes become `_`
pub fn equipment_token(value: &str) -> String {
    value.replace(|c: char| c == ' ' || c == '\\', "_")
}

/// OBJECT with spaces and underscores removed
pub fn sanitize_object(value: &str) -> String {
    value.chars().filter(|c| *c != ' ' && *c != '_').collect()
}

/// `YYYYMMDDHHMMSS`
pub fn compact_timestamp(at: NaiveDateTime) -> String {
    at.format("%Y%m%d%H%M%S").to_string()
}

fn day_folder(at: NaiveDateTime) -> String {
    at.format("%Y%m%d").to_string()
}

fn exposure_token(meta: &ExposureMetadata) -> String {
    format!("{}s", format_number(meta.exposure))
}

fn filter_token(meta: &ExposureMetadata) -> String {
    meta.filter
        .clone()
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Canonical filename
pub fn canonical_name(meta: &ExposureMetadata) -> String {
    let mut tokens = Vec::with_capacity(9);

    if meta.frame_type == FrameType::Light {
        tokens.push(meta.object.clone().unwrap_or_default());
    }
    tokens.push(equipment_token(&meta.telescope));
    tokens.push(equipment_token(&meta.instrument));
    if meta.frame_type.uses_filter() {
        tokens.push(filter_token(meta));
    }
    tokens.push(compact_timestamp(meta.acquired_at));
    tokens.push(exposure_token(meta));
    tokens.push(format!("{}x{}", meta.x_binning, meta.y_binning));
    tokens.push(format!("t{}", format_number(meta.sensor_temp)));

    format!("{}.{}", tokens.join("-"), CANONICAL_EXTENSION)
}

/// Canonical folder relative to the repository root, with a trailing `/`
pub fn canonical_dir(meta: &ExposureMetadata) -> String {
    let telescope = equipment_token(&meta.telescope);
    let instrument = equipment_token(&meta.instrument);
    let day = day_folder(meta.acquired_at);

    match meta.frame_type {
        FrameType::Light => format!(
            "Light/{}/{}/{}/{}/",
            meta.object.as_deref().unwrap_or_default(),
            telescope,
            instrument,
            day
        ),
        FrameType::Flat => format!(
            "Calibrate/Flat/{}/{}/{}/{}/",
            telescope,
            instrument,
            filter_token(meta),
            day
        ),
        FrameType::Dark | FrameType::Bias => format!(
            "Calibrate/{}/{}/{}/{}/{}/",
            meta.frame_type.as_str(),
            telescope,
            instrument,
            exposure_token(meta),
            day
        ),
    }
}

/// Folder plus filename; the natural key of a file record
pub fn canonical_path(meta: &ExposureMetadata) -> String {
    format!("{}{}", canonical_dir(meta), canonical_name(meta))
}
