//! Copy-before-write backups and bounded retention.
//!
//! Per-save layout: `<save dir>/<backup dir>/<id>/<timestamp>/<file name>`,
//! where `<id>` is the save's `FILE_ID` (or the file stem) so renaming a
//! save keeps its history. Timestamps sort lexically in chronological order;
//! same-second collisions get a zero-padded `_NNN` suffix that preserves it.

use crate::error::SaveError;
use crate::store::{atomic_write, modified_ms, read_container};
use crate::structural::{extract_bare_loose, extract_string_loose};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Where backups go and how many are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPolicy {
    pub dir_name: String,
    pub keep: usize,
}

impl Default for BackupPolicy {
    fn default() -> Self {
        Self {
            dir_name: ".backups".to_string(),
            keep: 20,
        }
    }
}

/// One backup copy on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified_ms: i64,
}

pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Keep an identifier usable as a single path component.
fn sanitize_id(id: &str) -> String {
    let cleaned: String = id
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Stable backup identifier: the save's `FILE_ID` (quoted or bare), else
/// its file stem.
pub fn backup_id_for(path: &Path) -> String {
    let file_id = read_container(path).ok().and_then(|decoded| {
        extract_string_loose(&decoded.text, "FILE_ID")
            .or_else(|| extract_bare_loose(&decoded.text, "FILE_ID"))
            .filter(|id| !id.trim().is_empty())
    });

    let id = file_id.unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    sanitize_id(&id)
}

/// Backup root for saves living in `save_dir`.
pub fn backup_root(save_dir: &Path, policy: &BackupPolicy) -> PathBuf {
    save_dir.join(&policy.dir_name)
}

fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

/// Name for a new entry in `dir` stamped `ts` (plus `ext`), later than
/// every existing entry for the same second.
fn unique_name(dir: &Path, ts: &str, ext: &str) -> String {
    let mut taken: Option<u32> = None;
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(stem) = name.strip_suffix(ext) else {
                continue;
            };
            let n = if stem == ts {
                Some(0)
            } else {
                stem.strip_prefix(ts)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .and_then(|suffix| suffix.parse::<u32>().ok())
            };
            if let Some(n) = n {
                taken = Some(taken.map_or(n, |t| t.max(n)));
            }
        }
    }
    match taken {
        None => format!("{ts}{ext}"),
        Some(n) => format!("{ts}_{:03}{ext}", n + 1),
    }
}

/// Copy `path` into its backup directory, then rotate that directory.
///
/// Returns the new backup's path.
pub fn backup_save(path: &Path, policy: &BackupPolicy) -> Result<PathBuf, SaveError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| SaveError::NotFound(path.to_path_buf()))?;
    fs::metadata(path).map_err(|e| SaveError::io(path, e))?;
    let id_dir = backup_root(parent_dir(path), policy).join(backup_id_for(path));
    fs::create_dir_all(&id_dir).map_err(|e| SaveError::io(&id_dir, e))?;

    let slot = id_dir.join(unique_name(&id_dir, &timestamp_now(), ""));
    fs::create_dir(&slot).map_err(|e| SaveError::io(&slot, e))?;

    let backup_path = slot.join(file_name);
    fs::copy(path, &backup_path).map_err(|e| SaveError::io(path, e))?;
    log::debug!("backed up {} to {}", path.display(), backup_path.display());

    rotate_logged(&id_dir, policy.keep);
    Ok(backup_path)
}

/// Copy `path` to `<dir>/<timestamp><ext>`, then rotate `dir`.
pub fn backup_flat(path: &Path, dir: &Path, ext: &str, keep: usize) -> Result<PathBuf, SaveError> {
    fs::metadata(path).map_err(|e| SaveError::io(path, e))?;
    fs::create_dir_all(dir).map_err(|e| SaveError::io(dir, e))?;
    let backup_path = dir.join(unique_name(dir, &timestamp_now(), ext));
    fs::copy(path, &backup_path).map_err(|e| SaveError::io(path, e))?;
    rotate_logged(dir, keep);
    Ok(backup_path)
}

/// Rotation after a successful copy. A failure leaves extra backups behind
/// and is only logged; the new backup stands.
fn rotate_logged(dir: &Path, keep: usize) -> usize {
    rotate(dir, keep).unwrap_or_else(|err| {
        log::warn!("rotation of {} failed: {err}", dir.display());
        0
    })
}

/// Delete all but the `keep` newest entries of `dir`, files and
/// directories alike. Returns how many were removed.
///
/// Ordered by modification time, then name, both descending.
pub fn rotate(dir: &Path, keep: usize) -> Result<usize, SaveError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(SaveError::io(dir, e)),
    };

    let mut stamped: Vec<(i64, String, PathBuf, bool)> = entries
        .flatten()
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            Some((
                modified_ms(&meta),
                entry.file_name().to_string_lossy().into_owned(),
                entry.path(),
                meta.is_dir(),
            ))
        })
        .collect();
    stamped.sort_by(|a, b| (b.0, &b.1).cmp(&(a.0, &a.1)));

    let mut removed = 0;
    for (_, _, path, is_dir) in stamped.into_iter().skip(keep) {
        let result = if is_dir {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        match result {
            Ok(()) => removed += 1,
            Err(e) => log::warn!("failed to rotate out {}: {e}", path.display()),
        }
    }
    Ok(removed)
}

fn entry_for(path: PathBuf) -> Option<BackupEntry> {
    let meta = fs::metadata(&path).ok()?;
    meta.is_file().then(|| BackupEntry {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        size: meta.len(),
        modified_ms: modified_ms(&meta),
        path,
    })
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .map(|entries| entries.flatten().map(|e| e.path()).collect())
        .unwrap_or_default()
}

/// All backups of `path`, newest first.
///
/// Includes the legacy flat layout `<backup dir>/<file name>/*`.
pub fn list_backups(path: &Path, policy: &BackupPolicy) -> Vec<BackupEntry> {
    let root = backup_root(parent_dir(path), policy);
    let mut items: Vec<BackupEntry> = Vec::new();

    let id_dir = root.join(backup_id_for(path));
    for slot in files_in(&id_dir).into_iter().filter(|p| p.is_dir()) {
        items.extend(files_in(&slot).into_iter().filter_map(entry_for));
    }

    if let Some(file_name) = path.file_name() {
        items.extend(files_in(&root.join(file_name)).into_iter().filter_map(entry_for));
    }

    items.sort_by(|a, b| (b.modified_ms, &b.path).cmp(&(a.modified_ms, &a.path)));
    items.dedup_by(|a, b| a.path == b.path);
    items
}

/// Overwrite `path` with the contents of `backup_path`.
pub fn restore_backup(path: &Path, backup_path: &Path) -> Result<(), SaveError> {
    let bytes = fs::read(backup_path).map_err(|e| SaveError::io(backup_path, e))?;
    atomic_write(path, &bytes).map_err(|e| SaveError::io(path, e))
}
