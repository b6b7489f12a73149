//! Error taxonomy for index operations.
//!
//! Every fallible operation returns one of these codes so callers can match
//! on the failure instead of parsing message strings. I/O failures from the
//! underlying file are surfaced unchanged as the `source` of the
//! corresponding variant.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// `create` was called on a path that already exists.
    #[error("index file already exists: {}", .0.display())]
    FileExists(PathBuf),

    /// `open` or `destroy` was called on a missing path.
    #[error("index file does not exist: {}", .0.display())]
    FileDoesNotExist(PathBuf),

    /// The underlying open was rejected.
    #[error("failed to open index file {}", path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The underlying unlink was rejected.
    #[error("failed to remove index file {}", path.display())]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The caller's attribute differs from the one recorded in the metadata
    /// page, or a key value does not match the attribute's type.
    #[error("attribute does not match the attribute recorded in the index")]
    AttributeMismatch,

    /// Delete of a `(key, RID)` pair that is not present (or was already
    /// tombstoned).
    #[error("entry does not exist in the index")]
    EntryNotFound,

    /// A page number at or beyond the end of the file was requested.
    #[error("page {0} does not exist")]
    PageDoesNotExist(u32),

    #[error("seek failed")]
    SeekFailed(#[source] io::Error),

    #[error("read failed")]
    ReadFailed(#[source] io::Error),

    #[error("write failed")]
    WriteFailed(#[source] io::Error),

    /// A page failed structural validation while being decoded.
    #[error("corrupt index page: {0}")]
    Corrupt(String),
}
