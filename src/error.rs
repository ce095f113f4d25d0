//! Errors surfaced by the core and the benchmark driver.
use std::{io, path::PathBuf};

/// Placement failures. The only one is running out of free slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    /// Every slot of the table is occupied; `tsize` is smaller than the
    /// number of distinct keys.
    #[error("placement table is full: all {capacity} slots are occupied")]
    TableFull { capacity: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading the input or writing the result file failed.
    #[error("I/O error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The input file has no lines.
    #[error("input {} contains no keys", .0.display())]
    EmptyInput(PathBuf),

    #[error("invalid size {input:?}: expected a positive integer with an optional K or M suffix")]
    InvalidSize { input: String },

    #[error("invalid thread count {input:?}: expected an integer of at least 1")]
    InvalidThreads { input: String },

    #[error(transparent)]
    Placement(#[from] PlacementError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
