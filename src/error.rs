//! Error types for folio operations.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Filesystem operation that failed while packaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    CreateDir,
    CreateFile,
    WriteFile,
}

impl fmt::Display for IoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IoOp::CreateDir => "create directory",
            IoOp::CreateFile => "create file",
            IoOp::WriteFile => "write file",
        })
    }
}

/// Errors that can occur while building or packaging a document.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing required metadata field: {field}")]
    MissingMetadata { field: &'static str },

    #[error("Failed to load asset {}: {source}", .path.display())]
    AssetLoad {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to {op} {}: {source}", .path.display())]
    Io {
        op: IoOp,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("ZIP error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Duplicate section filename: {0}")]
    DuplicateFilename(String),

    #[error("Invalid section filename: {0}")]
    InvalidFilename(String),

    #[error("Duplicate asset name: {0}")]
    DuplicateAsset(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn io(op: IoOp, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            op,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
