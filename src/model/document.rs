//! File-level read and write of saves.

use crate::backup::{backup_save, BackupPolicy};
use crate::error::SaveError;
use crate::model::errors::PatchError;
use crate::model::patch::{CarUnlock, CollectionMode, Patch, RelationshipLevel, ResourceAmount};
use crate::model::snapshot::{snapshot_from_text, Snapshot};
use crate::model::writer::{SaveWriter, StrictWriter, StructuralWriter};
use crate::store::{read_container, write_container};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Successful write: where the pre-write copy went and which path ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOutcome {
    /// `None` when the backup could not be taken
    pub backup_path: Option<PathBuf>,
    /// The structural writer produced the output
    pub fallback: bool,
    /// Patch fields the structural writer could not place
    pub skipped: Vec<String>,
}

/// Text produced by [`apply_patch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedText {
    pub text: String,
    pub fallback: bool,
    pub skipped: Vec<String>,
}

/// A decoded save held in memory.
#[derive(Debug, Clone)]
pub struct SaveDocument {
    pub path: PathBuf,
    pub inner_name: Option<String>,
    pub text: String,
    pub snapshot: Snapshot,
}

impl SaveDocument {
    pub fn open(path: &Path) -> Result<Self, SaveError> {
        let decoded = read_container(path)?;
        let snapshot = snapshot_from_text(&decoded.text);
        Ok(Self {
            path: path.to_path_buf(),
            inner_name: decoded.inner_name,
            text: decoded.text,
            snapshot,
        })
    }

    /// Parse failed and the snapshot is best-effort.
    pub fn is_readonly(&self) -> bool {
        self.snapshot.tolerant
    }

    /// Text this document would hold after `patch`, without touching disk.
    pub fn preview(&self, patch: &Patch) -> Result<PatchedText, SaveError> {
        apply_patch(&self.text, patch).map_err(|e| SaveError::WriteFailure {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}

/// Strict writer first, structural writer on any strict failure.
pub fn apply_patch(text: &str, patch: &Patch) -> Result<PatchedText, PatchError> {
    match StrictWriter.apply(text, patch) {
        Ok(applied) => Ok(PatchedText {
            text: applied.text,
            fallback: false,
            skipped: applied.skipped,
        }),
        Err(err) => {
            log::debug!(
                "{} writer failed ({err}), trying {}",
                StrictWriter.name(),
                StructuralWriter.name()
            );
            let applied = StructuralWriter.apply(text, patch)?;
            Ok(PatchedText {
                text: applied.text,
                fallback: true,
                skipped: applied.skipped,
            })
        }
    }
}

/// Read one save. Never fails: an undecodable file yields a tolerant
/// snapshot carrying the error.
pub fn read_snapshot(path: &Path) -> Snapshot {
    match read_container(path) {
        Ok(decoded) => snapshot_from_text(&decoded.text),
        Err(err) => {
            log::warn!("cannot read {}: {err}", path.display());
            Snapshot::unreadable(err.to_string())
        }
    }
}

fn take_backup(path: &Path, policy: &BackupPolicy) -> Option<PathBuf> {
    match backup_save(path, policy) {
        Ok(backup) => Some(backup),
        Err(err) => {
            log::warn!("backup of {} failed, writing anyway: {err}", path.display());
            None
        }
    }
}

/// Back up, patch and rewrite one save, keeping its inner stream name.
pub fn write_snapshot(
    path: &Path,
    patch: &Patch,
    policy: &BackupPolicy,
) -> Result<WriteOutcome, SaveError> {
    let backup_path = take_backup(path, policy);
    let decoded = read_container(path)?;

    let patched = apply_patch(&decoded.text, patch).map_err(|e| SaveError::WriteFailure {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if patched.fallback {
        log::debug!("{} written through the structural path", path.display());
    }

    write_container(path, &patched.text, decoded.inner_name.as_deref())?;
    Ok(WriteOutcome {
        backup_path,
        fallback: patched.fallback,
        skipped: patched.skipped,
    })
}

pub fn read_resources(path: &Path) -> BTreeMap<i64, f64> {
    read_snapshot(path).resources
}

pub fn read_relationships(path: &Path) -> BTreeMap<i64, i64> {
    read_snapshot(path).relationships
}

pub fn read_cars(path: &Path) -> BTreeMap<i64, bool> {
    read_snapshot(path).unlocked_cars
}

/// Replace the whole `resources` collection.
pub fn write_resources(
    path: &Path,
    resources: &[ResourceAmount],
    policy: &BackupPolicy,
) -> Result<WriteOutcome, SaveError> {
    let patch = Patch {
        resources: Some(resources.to_vec()),
        collection_mode: CollectionMode::Replace,
        ..Default::default()
    };
    write_snapshot(path, &patch, policy)
}

/// Replace the whole `relationships` collection.
pub fn write_relationships(
    path: &Path,
    relationships: &[RelationshipLevel],
    policy: &BackupPolicy,
) -> Result<WriteOutcome, SaveError> {
    let patch = Patch {
        relationships: Some(relationships.to_vec()),
        collection_mode: CollectionMode::Replace,
        ..Default::default()
    };
    write_snapshot(path, &patch, policy)
}

/// Replace the whole `unlockedCars` collection.
pub fn write_cars(
    path: &Path,
    cars: &[CarUnlock],
    policy: &BackupPolicy,
) -> Result<WriteOutcome, SaveError> {
    let patch = Patch {
        unlocked_cars: Some(cars.to_vec()),
        collection_mode: CollectionMode::Replace,
        ..Default::default()
    };
    write_snapshot(path, &patch, policy)
}
