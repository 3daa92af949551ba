//! Directory scan and root/child grouping.

use crate::model::{read_snapshot, snapshot_from_text, Snapshot};
use crate::store::{modified_ms, read_container};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use walkdir::{DirEntry, WalkDir};

/// Save kind, from the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveTag {
    Auto,
    Manual,
    Unknown,
}

impl SaveTag {
    pub fn from_file_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("_auto_") {
            SaveTag::Auto
        } else if lower.contains("_manual_") {
            SaveTag::Manual
        } else {
            SaveTag::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SaveTag::Auto => "auto",
            SaveTag::Manual => "manual",
            SaveTag::Unknown => "unknown",
        }
    }
}

/// One save found on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFile {
    pub path: PathBuf,
    pub file_name: String,
    pub tag: SaveTag,
    pub size: u64,
    pub modified_ms: i64,
    pub snapshot: Snapshot,
    pub is_root: bool,
    /// `FILE_ID`, else `parentCity`, else the file name
    pub group_id: String,
    pub display_name: String,
}

impl SaveFile {
    fn new(path: PathBuf, size: u64, modified_ms: i64, snapshot: Snapshot) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_id = snapshot.file_id.trim();
        let parent = snapshot.parent_city.trim();
        let group_id = [file_id, parent, file_name.as_str()]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string();
        let display_name = if snapshot.name.is_empty() {
            file_name.clone()
        } else {
            snapshot.name.clone()
        };

        Self {
            tag: SaveTag::from_file_name(&file_name),
            is_root: parent.is_empty(),
            group_id,
            display_name,
            path,
            file_name,
            size,
            modified_ms,
            snapshot,
        }
    }
}

/// A file skipped during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanIssue {
    pub path: PathBuf,
    pub message: String,
}

/// What to look for while walking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Lowercase, without the dot
    pub extensions: Vec<String>,
    pub backup_dir_name: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["es3".to_string()],
            backup_dir_name: ".backups".to_string(),
        }
    }
}

impl ScanOptions {
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
    }

    fn is_backup_dir(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry.file_name() == self.backup_dir_name.as_str()
    }
}

fn load(path: &Path) -> Result<SaveFile, String> {
    let meta = std::fs::metadata(path).map_err(|e| e.to_string())?;
    let decoded = read_container(path).map_err(|e| e.to_string())?;
    let snapshot = snapshot_from_text(&decoded.text);
    Ok(SaveFile::new(
        path.to_path_buf(),
        meta.len(),
        modified_ms(&meta),
        snapshot,
    ))
}

/// Walk `dirs` recursively, skipping backup directories, and load every
/// save. Files that cannot be decoded are returned as issues.
pub fn scan_with_issues(dirs: &[PathBuf], options: &ScanOptions) -> (Vec<SaveFile>, Vec<ScanIssue>) {
    let mut saves = Vec::new();
    let mut issues = Vec::new();

    for dir in dirs {
        let walker = WalkDir::new(dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !options.is_backup_dir(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::debug!("skipping unreadable entry under {}: {err}", dir.display());
                    continue;
                }
            };
            if !entry.file_type().is_file() || !options.matches_extension(entry.path()) {
                continue;
            }
            match load(entry.path()) {
                Ok(save) => saves.push(save),
                Err(message) => issues.push(ScanIssue {
                    path: entry.path().to_path_buf(),
                    message,
                }),
            }
        }
    }
    (saves, issues)
}

/// [`scan_with_issues`] with undecodable files logged and dropped.
pub fn scan(dirs: &[PathBuf], options: &ScanOptions) -> Vec<SaveFile> {
    let (saves, issues) = scan_with_issues(dirs, options);
    for issue in issues {
        log::warn!("skipping {}: {}", issue.path.display(), issue.message);
    }
    saves
}

/// Metadata for a single save, as a scan would report it.
pub fn describe(path: &Path) -> Option<SaveFile> {
    let meta = std::fs::metadata(path).ok()?;
    Some(SaveFile::new(
        path.to_path_buf(),
        meta.len(),
        modified_ms(&meta),
        read_snapshot(path),
    ))
}

/// Root saves and their children sharing one group id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveGroup {
    pub group_id: String,
    pub roots: Vec<SaveFile>,
    pub children: Vec<SaveFile>,
}

impl SaveGroup {
    pub fn newest_ms(&self) -> i64 {
        self.roots
            .iter()
            .chain(&self.children)
            .map(|s| s.modified_ms)
            .max()
            .unwrap_or(0)
    }
}

/// Group saves by `group_id`; within a group roots come first, each list
/// newest first. Groups are ordered by their newest save.
pub fn group_saves(saves: &[SaveFile]) -> Vec<SaveGroup> {
    let mut groups: BTreeMap<&str, SaveGroup> = BTreeMap::new();
    for save in saves {
        let group = groups.entry(save.group_id.as_str()).or_insert_with(|| SaveGroup {
            group_id: save.group_id.clone(),
            roots: Vec::new(),
            children: Vec::new(),
        });
        if save.is_root {
            group.roots.push(save.clone());
        } else {
            group.children.push(save.clone());
        }
    }

    let mut out: Vec<SaveGroup> = groups.into_values().collect();
    for group in &mut out {
        group.roots.sort_by(|a, b| b.modified_ms.cmp(&a.modified_ms));
        group.children.sort_by(|a, b| b.modified_ms.cmp(&a.modified_ms));
    }
    out.sort_by(|a, b| b.newest_ms().cmp(&a.newest_ms()).then_with(|| a.group_id.cmp(&b.group_id)));
    out
}

/// Memoized scan result with an explicit dirty flag.
#[derive(Debug, Default)]
pub struct ScanCache {
    slot: Mutex<Option<Arc<Vec<SaveFile>>>>,
}

impl ScanCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }

    pub fn is_valid(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// The cached result, or `compute`'s, which is then cached.
    ///
    /// The lock is held while computing so concurrent callers share one scan.
    pub fn get_or_compute<F>(&self, compute: F) -> Arc<Vec<SaveFile>>
    where
        F: FnOnce() -> Vec<SaveFile>,
    {
        let mut slot = match self.slot.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(cached) = slot.as_ref() {
            return Arc::clone(cached);
        }
        let fresh = Arc::new(compute());
        *slot = Some(Arc::clone(&fresh));
        fresh
    }
}
