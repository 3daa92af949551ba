//! File-level I/O for containers: decode on read, encode + atomic replace
//! on write.

use crate::codec::{self, Decoded};
use crate::error::SaveError;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Read and decode a container from disk.
pub fn read_container(path: &Path) -> Result<Decoded, SaveError> {
    let bytes = fs::read(path).map_err(|e| SaveError::io(path, e))?;
    codec::decode(&bytes).map_err(|source| SaveError::Container {
        path: path.to_path_buf(),
        source,
    })
}

/// Encode `text` and atomically replace `path` with it.
pub fn write_container(path: &Path, text: &str, inner_name: Option<&str>) -> Result<(), SaveError> {
    let bytes = codec::encode(text, inner_name, path).map_err(|e| SaveError::WriteFailure {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    atomic_write(path, &bytes).map_err(|e| SaveError::WriteFailure {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write lands or the previous file stays in place; the
/// game never observes a half-written save.
pub fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    // Create tempfile in same directory to ensure same filesystem
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Path has no parent directory",
        )
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Modification time in milliseconds since the Unix epoch.
pub fn modified_ms(metadata: &fs::Metadata) -> i64 {
    let mtime = filetime::FileTime::from_last_modification_time(metadata);
    mtime.unix_seconds() * 1000 + i64::from(mtime.nanoseconds() / 1_000_000)
}

/// Remove a save. No implicit backup.
pub fn delete_file(path: &Path) -> Result<(), SaveError> {
    fs::remove_file(path).map_err(|e| SaveError::io(path, e))
}
