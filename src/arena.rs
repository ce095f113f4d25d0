//! Input keys held in one contiguous buffer.
//!
//! The file is read once into a single `Vec<u8>`; each line becomes a byte
//! range into it. Keys handed to the core are borrowed slices of this buffer
//! and live as long as the arena.
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::ops::Range;
use std::path::Path;

use crate::error::{Error, Result};

#[derive(Debug)]
pub struct KeyArena {
    bytes: Vec<u8>,
    spans: Vec<Range<usize>>,
}

impl KeyArena {
    /// Reads `path`, one key per line. Fails on an empty file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let io_err = |source| Error::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(io_err)?;
        let arena = Self::from_reader(BufReader::new(file)).map_err(io_err)?;

        if arena.is_empty() {
            return Err(Error::EmptyInput(path.to_path_buf()));
        }

        tracing::debug!(
            path = %path.display(),
            keys = arena.len(),
            bytes = arena.total_bytes(),
            "loaded input"
        );
        Ok(arena)
    }

    pub fn from_reader(mut reader: impl Read) -> io::Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(Self::from_bytes(bytes))
    }

    /// Splits on `\n`. The terminator is not part of the key; a final line
    /// without one is still a key, and an empty line is an empty key.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let mut spans = Vec::new();
        let mut start = 0;
        for (i, &b) in bytes.iter().enumerate() {
            if b == b'\n' {
                spans.push(start..i);
                start = i + 1;
            }
        }
        if start < bytes.len() {
            spans.push(start..bytes.len());
        }

        Self { bytes, spans }
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Size of the backing buffer, terminators included.
    pub fn total_bytes(&self) -> usize {
        self.bytes.len()
    }

    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.spans.get(index).map(|span| &self.bytes[span.clone()])
    }

    /// All keys in input order.
    pub fn keys(&self) -> Vec<&[u8]> {
        self.spans
            .iter()
            .map(|span| &self.bytes[span.clone()])
            .collect()
    }
}
