//! Writes to saves the strict parser rejects.

mod common;

use common::{broken_save, read_text, write_save};
use save_patcher::{read_snapshot, write_snapshot, BackupPolicy, Patch, ResourceAmount, SaveError};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_broken_save_reads_tolerantly() {
    let dir = TempDir::new().unwrap();
    let path = write_save(dir.path(), "harbor_auto_1.es3", &broken_save());

    let snap = read_snapshot(&path);
    assert!(snap.tolerant);
    assert!(snap.error.is_some());
    assert_eq!(snap.file_id, "FILE123");
    assert_eq!(snap.money, 1200.0);
    assert_eq!(snap.resources.get(&0), Some(&10.0));
}

#[test]
fn test_structural_write_preserves_unparsed_bytes() {
    let dir = TempDir::new().unwrap();
    let path = write_save(dir.path(), "harbor_auto_1.es3", &broken_save());

    let patch = Patch {
        money: Some(777.0),
        resources: Some(vec![ResourceAmount { id: 7, amount: 1.0 }]),
        ..Default::default()
    };
    let outcome = write_snapshot(&path, &patch, &BackupPolicy::default()).unwrap();
    assert!(outcome.fallback);
    assert!(outcome.skipped.is_empty());

    let text = read_text(&path);
    assert!(text.ends_with(" @@"));
    assert!(text.contains("\"money\": 777"));
    assert!(text.contains("\"dayProgress\": 0.5"));

    let snap = read_snapshot(&path);
    assert_eq!(snap.money, 777.0);
    assert_eq!(snap.resources.get(&0), Some(&10.0));
    assert_eq!(snap.resources.get(&7), Some(&1.0));
}

#[test]
fn test_missing_root_places_what_it_can() {
    let dir = TempDir::new().unwrap();
    let path = write_save(dir.path(), "odd_manual_1.es3", "{ money: 5, day: 2 ]");

    let patch = Patch {
        money: Some(10.0),
        research_points: Some(3.0),
        ..Default::default()
    };
    let outcome = write_snapshot(&path, &patch, &BackupPolicy::default()).unwrap();
    assert!(outcome.fallback);
    assert_eq!(outcome.skipped, vec!["researchPoints".to_string()]);
    assert_eq!(read_text(&path), "{ money: 10, day: 2 ]");
}

#[test]
fn test_nothing_placeable_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let path = write_save(dir.path(), "odd_manual_1.es3", "not a save at all");
    let before = fs::read(&path).unwrap();

    let patch = Patch {
        money: Some(10.0),
        ..Default::default()
    };
    let err = write_snapshot(&path, &patch, &BackupPolicy::default()).unwrap_err();
    assert!(matches!(err, SaveError::WriteFailure { .. }));
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn test_write_to_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gone.es3");
    let patch = Patch {
        money: Some(1.0),
        ..Default::default()
    };
    assert!(write_snapshot(&path, &patch, &BackupPolicy::default()).is_err());
    assert!(!dir.path().join(".backups").exists());
}
