use crate::codec::CodecError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced at the file boundary: reads, writes, backups, settings.
#[derive(Error, Debug)]
pub enum SaveError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unreadable container {path}: {source}")]
    Container { path: PathBuf, source: CodecError },

    #[error("write failed for {path}: {reason}")]
    WriteFailure { path: PathBuf, reason: String },

    #[error("file not found: {0}")]
    NotFound(PathBuf),
}

impl SaveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            SaveError::NotFound(path)
        } else {
            SaveError::Io { path, source }
        }
    }
}
