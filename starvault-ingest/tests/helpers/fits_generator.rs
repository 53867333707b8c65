//! FITS Test Fixture Generator
//!
//! Writes minimal valid exposures (one header block, a tiny data unit)
//! through the crate's own header writer.

use starvault_ingest::fits::{FitsFile, Header, Value};
use std::path::{Path, PathBuf};

/// Header contents of a generated exposure
#[derive(Debug, Clone)]
pub struct ExposureSpec {
    pub cards: Vec<(String, Value)>,
}

impl ExposureSpec {
    /// Calibration or light frame with the common equipment cards
    pub fn new(image_type: &str, date_obs: &str) -> Self {
        Self {
            cards: vec![
                ("IMAGETYP".to_string(), Value::String(image_type.to_string())),
                ("DATE-OBS".to_string(), Value::String(date_obs.to_string())),
                ("TELESCOP".to_string(), Value::String("ScopeA".to_string())),
                ("INSTRUME".to_string(), Value::String("CamA".to_string())),
                ("EXPTIME".to_string(), Value::Float(300.0)),
                ("XBINNING".to_string(), Value::Integer(1)),
                ("YBINNING".to_string(), Value::Integer(1)),
                ("CCD-TEMP".to_string(), Value::Float(-10.0)),
            ],
        }
    }

    pub fn light(object: &str, date_obs: &str) -> Self {
        Self::new("Light Frame", date_obs).with("OBJECT", Value::String(object.to_string()))
    }

    /// Replace or add a card
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.cards.retain(|(k, _)| k != key);
        self.cards.push((key.to_string(), value));
        self
    }

    /// Drop a card
    pub fn without(mut self, key: &str) -> Self {
        self.cards.retain(|(k, _)| k != key);
        self
    }
}

/// Write `dir/name` from `spec`; the data unit is derived from `name` so
/// every fixture has distinct content
pub fn write_exposure(dir: &Path, name: &str, spec: &ExposureSpec) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();

    let mut header = Header::new();
    header.set("SIMPLE", Value::Logical(true));
    header.set("BITPIX", Value::Integer(8));
    header.set("NAXIS", Value::Integer(2));
    header.set("NAXIS1", Value::Integer(8));
    header.set("NAXIS2", Value::Integer(4));
    for (key, value) in &spec.cards {
        header.set(key, value.clone());
    }

    let data: Vec<u8> = name.bytes().cycle().take(32).collect();
    let path = dir.join(name);
    FitsFile::create(&path, &header, &data).unwrap();
    path
}

/// A file with a FITS extension that is not a FITS file
pub fn write_garbage(dir: &Path, name: &str) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, b"definitely not a header").unwrap();
    path
}

/// Overwrite the comment area of `keyword`'s card with raw `comment`
/// bytes, starting at column 31; bypasses the header writer so non-ASCII
/// bytes reach disk as other capture software writes them
pub fn patch_card_comment(path: &Path, keyword: &str, comment: &[u8]) {
    let mut bytes = std::fs::read(path).unwrap();
    let mut name = [b' '; 8];
    name[..keyword.len()].copy_from_slice(keyword.as_bytes());

    let start = bytes
        .chunks(80)
        .position(|card| card[..8] == name)
        .map(|index| index * 80)
        .unwrap_or_else(|| panic!("No {} card in {}", keyword, path.display()));

    assert!(comment.len() <= 50);
    bytes[start + 30..start + 30 + comment.len()].copy_from_slice(comment);
    std::fs::write(path, bytes).unwrap();
}
