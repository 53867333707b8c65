//! FITS header access
//!
//! Only the primary header is read and written; the data unit is copied
//! byte-for-byte when a header grows past its block allocation.

mod file;
mod header;

pub use file::FitsFile;
pub use header::{format_number, Card, Header, Value, BLOCK_LEN, CARD_LEN};

use std::path::Path;
use thiserror::Error;

/// Extensions that mark a file as a candidate for ingest (compared lowercase)
pub const FITS_EXTENSIONS: &[&str] = &["fits", "fit", "fts"];

/// Header I/O errors
#[derive(Debug, Error)]
pub enum FitsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid FITS format: {0}")]
    InvalidFormat(String),

    #[error("File ended before the END card")]
    Truncated,
}

/// True when the extension indicates the FITS container
pub fn has_fits_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| FITS_EXTENSIONS.contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_detection() {
        assert!(has_fits_extension(Path::new("a/b/light.fits")));
        assert!(has_fits_extension(Path::new("dark.FIT")));
        assert!(has_fits_extension(Path::new("flat.fts")));
        assert!(!has_fits_extension(Path::new("image.xisf")));
        assert!(!has_fits_extension(Path::new("notes.txt")));
        assert!(!has_fits_extension(Path::new("fits")));
    }
}
