//! Scoped, in-place header editing
//!
//! `FitsFile` owns the parsed primary header of one file on disk. Mutations
//! go through `header_mut()` and reach the file on `close()`, or on drop if
//! the caller returns early.

use super::header::{Card, Header, BLOCK_LEN, CARD_LEN};
use super::FitsError;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Headers longer than this are treated as corrupt
const MAX_HEADER_BLOCKS: usize = 256;

/// An open exposure file with a mutable primary header
#[derive(Debug)]
pub struct FitsFile {
    path: PathBuf,
    header: Header,
    header_blocks: usize,
    dirty: bool,
}

impl FitsFile {
    /// Read the primary header of `path`
    pub fn open(path: &Path) -> Result<Self, FitsError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut block = vec![0u8; BLOCK_LEN];
        let mut cards = Vec::new();
        let mut header_blocks = 0;

        'blocks: loop {
            reader.read_exact(&mut block).map_err(|e| match e.kind() {
                io::ErrorKind::UnexpectedEof => FitsError::Truncated,
                _ => FitsError::Io(e),
            })?;
            header_blocks += 1;

            for record in block.chunks_exact(CARD_LEN) {
                let card = Card::parse(record)?;
                if card.is_end() {
                    break 'blocks;
                }
                cards.push(card);
            }

            if header_blocks >= MAX_HEADER_BLOCKS {
                return Err(FitsError::InvalidFormat(format!(
                    "no END card within {} header blocks",
                    MAX_HEADER_BLOCKS
                )));
            }
        }

        if cards.first().map(|c| c.keyword.as_str()) != Some("SIMPLE") {
            return Err(FitsError::InvalidFormat(
                "primary header does not start with SIMPLE".to_string(),
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            header: Header::from_cards(cards),
            header_blocks,
            dirty: false,
        })
    }

    /// Write a new file from a header and a raw data unit (padded with zeros)
    pub fn create(path: &Path, header: &Header, data: &[u8]) -> Result<(), FitsError> {
        let mut file = File::create(path)?;
        file.write_all(&header.to_bytes())?;
        if !data.is_empty() {
            file.write_all(data)?;
            let padding = (BLOCK_LEN - data.len() % BLOCK_LEN) % BLOCK_LEN;
            file.write_all(&vec![0u8; padding])?;
        }
        file.sync_all()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Mutable header access; the file is rewritten on close
    pub fn header_mut(&mut self) -> &mut Header {
        self.dirty = true;
        &mut self.header
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Persist pending header changes
    pub fn flush(&mut self) -> Result<(), FitsError> {
        if !self.dirty {
            return Ok(());
        }

        let bytes = self.header.to_bytes();
        let new_blocks = bytes.len() / BLOCK_LEN;

        if new_blocks == self.header_blocks {
            let mut file = OpenOptions::new().write(true).open(&self.path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        } else {
            self.rewrite_with_header(&bytes)?;
            self.header_blocks = new_blocks;
        }

        self.dirty = false;
        tracing::debug!(file = %self.path.display(), blocks = new_blocks, "Header flushed");
        Ok(())
    }

    /// Flush and release the file, reporting any write failure
    pub fn close(mut self) -> Result<(), FitsError> {
        let result = self.flush();
        // Drop must not retry a failed write
        self.dirty = false;
        result
    }

    /// The header changed size: stream header + old data unit into a sibling
    /// file, then swap it in
    fn rewrite_with_header(&self, header: &[u8]) -> Result<(), FitsError> {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = self
            .path
            .with_file_name(format!(".{}.starvault-tmp", file_name));

        let old_header_len = (self.header_blocks * BLOCK_LEN) as u64;
        let copy = || -> Result<(), FitsError> {
            let mut source = File::open(&self.path)?;
            source.seek(SeekFrom::Start(old_header_len))?;
            let mut target = File::create(&temp_path)?;
            target.write_all(header)?;
            io::copy(&mut source, &mut target)?;
            target.sync_all()?;
            Ok(())
        };

        if let Err(e) = copy().and_then(|_| fs::rename(&temp_path, &self.path).map_err(FitsError::from)) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
        Ok(())
    }
}

impl Drop for FitsFile {
    fn drop(&mut self) {
        if self.dirty {
            if let Err(e) = self.flush() {
                tracing::error!(
                    file = %self.path.display(),
                    error = %e,
                    "Failed to flush header changes"
                );
            }
        }
    }
}
