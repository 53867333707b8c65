//! Header validation, repair and classification
//!
//! Every rejection is decided before the header is touched. Light frames may
//! then be repaired (CD matrix synthesized from CDELT/CROTA2) and have their
//! OBJECT sanitized; those edits are written back to the original file in
//! place before anything else happens to it.

use super::canonical_namer::{canonical_dir, canonical_name, sanitize_object};
use crate::fits::{has_fits_extension, FitsFile, Header, Value};
use crate::models::exposure_metadata::{DEFAULT_FILTER, UNKNOWN_EQUIPMENT};
use crate::models::{ExposureMetadata, FrameType};
use starvault_common::dates::to_date_value;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Why a file was not ingested. A value, not a failure: the batch logs it
/// and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("extension does not indicate a FITS file")]
    UnsupportedExtension,

    #[error("header could not be read: {0}")]
    Unreadable(String),

    #[error("required header card {0} is missing")]
    MissingCard(&'static str),

    #[error("DATE-OBS could not be parsed: {0}")]
    UnparsableDate(String),

    #[error("IMAGETYP {0:?} is not a recognized frame type")]
    UnrecognizedFrameType(String),

    #[error("repaired header could not be written back: {0}")]
    WriteBack(String),
}

/// Result of normalizing one header
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub metadata: ExposureMetadata,
    pub canonical_name: String,
    pub canonical_dir: String,
    /// Header after repair and sanitization
    pub header: Header,
    /// The header differs from what was read
    pub mutated: bool,
}

impl Classification {
    pub fn frame_type(&self) -> FrameType {
        self.metadata.frame_type
    }

    /// Canonical folder plus name
    pub fn canonical_path(&self) -> String {
        format!("{}{}", self.canonical_dir, self.canonical_name)
    }
}

/// Validate and normalize a header in memory.
///
/// `file_name` is only used for the extension check and for log context.
pub fn normalize_header(header: &Header, file_name: &str) -> Result<Classification, Rejection> {
    if !has_fits_extension(Path::new(file_name)) {
        return Err(Rejection::UnsupportedExtension);
    }

    let date_text = header
        .get_text("DATE-OBS")
        .ok_or(Rejection::MissingCard("DATE-OBS"))?;
    let acquired_at =
        to_date_value(&date_text).ok_or_else(|| Rejection::UnparsableDate(date_text.clone()))?;

    let image_type = header
        .get_text("IMAGETYP")
        .ok_or(Rejection::MissingCard("IMAGETYP"))?;
    let frame_type = FrameType::classify(&image_type)
        .ok_or_else(|| Rejection::UnrecognizedFrameType(image_type.clone()))?;

    let raw_object = if frame_type == FrameType::Light {
        Some(header.get_text("OBJECT").ok_or(Rejection::MissingCard("OBJECT"))?)
    } else {
        None
    };

    // No rejections past this point
    let mut header = header.clone();
    let mut mutated = false;

    let object = match raw_object {
        Some(raw) => {
            mutated |= repair_wcs(&mut header, file_name);
            let clean = sanitize_object(&raw);
            if header.get_str("OBJECT") != Some(clean.as_str()) {
                header.set("OBJECT", Value::String(clean.clone()));
                mutated = true;
            }
            Some(clean)
        }
        None => None,
    };

    let metadata = ExposureMetadata {
        frame_type,
        acquired_at,
        object,
        telescope: text_or_unknown(&header, "TELESCOP"),
        instrument: text_or_unknown(&header, "INSTRUME"),
        filter: header
            .get_text("FILTER")
            .or_else(|| frame_type.uses_filter().then(|| DEFAULT_FILTER.to_string())),
        exposure: number_or(&header, &["EXPTIME", "EXPOSURE"], 0.0, file_name),
        x_binning: integer_or(&header, "XBINNING", 1, file_name),
        y_binning: integer_or(&header, "YBINNING", 1, file_name),
        sensor_temp: number_or(&header, &["CCD-TEMP"], 0.0, file_name),
    };

    // Equipment tokens keep '/', which splits the canonical path
    for (card, value) in [
        ("TELESCOP", &metadata.telescope),
        ("INSTRUME", &metadata.instrument),
    ] {
        if value.contains('/') {
            warn!(
                file = file_name,
                card,
                value = %value,
                "Equipment name contains '/', canonical path gains extra folders"
            );
        }
    }

    Ok(Classification {
        canonical_name: canonical_name(&metadata),
        canonical_dir: canonical_dir(&metadata),
        metadata,
        header,
        mutated,
    })
}

/// Open a file, normalize its header and write any repair back in place.
pub fn normalize_file(path: &Path) -> Result<Classification, Rejection> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if !has_fits_extension(path) {
        return Err(Rejection::UnsupportedExtension);
    }

    let mut fits = FitsFile::open(path).map_err(|e| Rejection::Unreadable(e.to_string()))?;
    let classification = normalize_header(fits.header(), &file_name)?;

    if classification.mutated {
        *fits.header_mut() = classification.header.clone();
    }

    fits.close().map_err(|e| {
        error!(
            file = %path.display(),
            error = %e,
            "Header repair could not be written back"
        );
        Rejection::WriteBack(e.to_string())
    })?;

    debug!(
        file = %path.display(),
        frame_type = %classification.frame_type(),
        mutated = classification.mutated,
        "Header normalized"
    );

    Ok(classification)
}

/// Synthesize the CD matrix when only CDELT1/CDELT2/CROTA2 are present.
/// CROTA2 is in degrees. Returns true if cards were added.
fn repair_wcs(header: &mut Header, file_name: &str) -> bool {
    if header.contains("CD1_1") {
        return false;
    }

    let (cdelt1, cdelt2, crota2) = match (
        header.get_f64("CDELT1"),
        header.get_f64("CDELT2"),
        header.get_f64("CROTA2"),
    ) {
        (Some(a), Some(b), Some(c)) => (a, b, c),
        _ => {
            warn!(file = file_name, "No CD matrix and no CDELT/CROTA2 to derive one; WCS left as is");
            return false;
        }
    };

    let (sin, cos) = crota2.to_radians().sin_cos();
    header.set("CD1_1", Value::Float(cdelt1 * cos));
    header.set("CD1_2", Value::Float(-cdelt2 * sin));
    header.set("CD2_1", Value::Float(cdelt1 * sin));
    header.set("CD2_2", Value::Float(cdelt2 * cos));

    debug!(file = file_name, cdelt1, cdelt2, crota2, "CD matrix synthesized");
    true
}

fn text_or_unknown(header: &Header, key: &str) -> String {
    header
        .get_text(key)
        .unwrap_or_else(|| UNKNOWN_EQUIPMENT.to_string())
}

fn number_or(header: &Header, keys: &[&str], default: f64, file_name: &str) -> f64 {
    match keys.iter().find_map(|key| header.get_f64(key)) {
        Some(value) => value,
        None => {
            warn!(file = file_name, card = keys[0], default, "Header card missing, using default");
            default
        }
    }
}

fn integer_or(header: &Header, key: &str, default: i64, file_name: &str) -> i64 {
    match header.get_i64(key) {
        Some(value) => value,
        None => {
            warn!(file = file_name, card = key, default, "Header card missing, using default");
            default
        }
    }
}
