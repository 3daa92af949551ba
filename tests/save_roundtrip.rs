//! Strict-tier reads and writes through real gzip containers.

mod common;

use common::{read_text, write_save, ROOT_SAVE};
use save_patcher::codec::decode;
use save_patcher::model::{read_cars, read_relationships, read_resources, write_relationships};
use save_patcher::{
    read_snapshot, write_snapshot, BackupPolicy, CarUnlock, Patch, ResourceAmount,
};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_read_snapshot_projects_all_fields() {
    let dir = TempDir::new().unwrap();
    let path = write_save(dir.path(), "harbor_auto_1.es3", ROOT_SAVE);

    let snap = read_snapshot(&path);
    assert!(!snap.tolerant);
    assert_eq!(snap.file_id, "FILE123");
    assert_eq!(snap.name, "Harbor");
    assert!(snap.is_root());
    assert_eq!(snap.difficulty, 2.0);
    assert_eq!(snap.map_size, 48.0);
    assert_eq!(snap.day, 14.0);
    assert_eq!(snap.day_progress, 0.5);
    assert_eq!(snap.money, 1200.0);
    assert_eq!(snap.resources.get(&3), Some(&2.5));
    assert_eq!(snap.relationships.get(&1), Some(&2));
    assert_eq!(snap.unlocked_cars.get(&0), Some(&true));
    assert!(!snap.sandbox_enabled);
}

#[test]
fn test_write_keeps_untouched_fields_and_inner_name() {
    let dir = TempDir::new().unwrap();
    let path = write_save(dir.path(), "harbor_auto_1.es3", ROOT_SAVE);

    let patch = Patch {
        money: Some(50_000.0),
        name: Some("New Harbor".to_string()),
        resources: Some(vec![ResourceAmount { id: 7, amount: 99.0 }]),
        unlocked_cars: Some(vec![CarUnlock { id: 5, unlocked: true }]),
        ..Default::default()
    };
    let outcome = write_snapshot(&path, &patch, &BackupPolicy::default()).unwrap();
    assert!(!outcome.fallback);
    assert!(outcome.skipped.is_empty());
    assert!(outcome.backup_path.as_ref().is_some_and(|p| p.exists()));

    let snap = read_snapshot(&path);
    assert_eq!(snap.money, 50_000.0);
    assert_eq!(snap.name, "New Harbor");
    assert_eq!(snap.day, 14.0);
    assert_eq!(snap.research_points, 30.0);
    // Collections merge with what is already there.
    assert_eq!(snap.resources.get(&0), Some(&10.0));
    assert_eq!(snap.resources.get(&7), Some(&99.0));
    assert_eq!(snap.unlocked_cars.get(&0), Some(&true));
    assert_eq!(snap.unlocked_cars.get(&5), Some(&true));

    let decoded = decode(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(decoded.inner_name.as_deref(), Some("harbor_auto_1.es3"));
    assert!(decoded.text.contains("\"__type\""));
}

#[test]
fn test_map_size_never_shrinks_and_is_clamped() {
    let dir = TempDir::new().unwrap();
    let path = write_save(dir.path(), "harbor_auto_1.es3", ROOT_SAVE);
    let policy = BackupPolicy::default();

    let shrink = Patch {
        map_size: Some(40.0),
        ..Default::default()
    };
    write_snapshot(&path, &shrink, &policy).unwrap();
    assert_eq!(read_snapshot(&path).map_size, 48.0);

    let grow = Patch {
        map_size: Some(500.0),
        ..Default::default()
    };
    write_snapshot(&path, &grow, &policy).unwrap();
    assert_eq!(read_snapshot(&path).map_size, 88.0);
}

#[test]
fn test_sandbox_toggle_sets_all_flags() {
    let dir = TempDir::new().unwrap();
    let path = write_save(dir.path(), "harbor_auto_1.es3", ROOT_SAVE);

    let patch = Patch {
        sandbox: Some(true),
        ..Default::default()
    };
    write_snapshot(&path, &patch, &BackupPolicy::default()).unwrap();

    let snap = read_snapshot(&path);
    assert!(snap.unlock_all && snap.infinite_money && snap.max_level);
    assert!(snap.sandbox_enabled);
}

#[test]
fn test_sandbox_ignored_for_survival() {
    let dir = TempDir::new().unwrap();
    let survival = ROOT_SAVE.replace("\"isSurvivalMode\": false", "\"isSurvivalMode\": true");
    let path = write_save(dir.path(), "harbor_auto_1.es3", &survival);

    let patch = Patch {
        sandbox: Some(true),
        ..Default::default()
    };
    write_snapshot(&path, &patch, &BackupPolicy::default()).unwrap();
    assert!(!read_snapshot(&path).sandbox_enabled);
}

#[test]
fn test_single_collection_write_replaces() {
    let dir = TempDir::new().unwrap();
    let path = write_save(dir.path(), "harbor_auto_1.es3", ROOT_SAVE);

    let levels = vec![save_patcher::RelationshipLevel { id: 4, level: 3.0 }];
    write_relationships(&path, &levels, &BackupPolicy::default()).unwrap();

    let relationships = read_relationships(&path);
    assert_eq!(relationships.into_iter().collect::<Vec<_>>(), vec![(4, 3)]);
    assert_eq!(read_resources(&path).len(), 2);
    assert_eq!(read_cars(&path).len(), 1);
}

#[test]
fn test_empty_patch_leaves_text_equivalent() {
    let dir = TempDir::new().unwrap();
    let path = write_save(dir.path(), "harbor_auto_1.es3", ROOT_SAVE);
    let before = read_snapshot(&path);

    write_snapshot(&path, &Patch::default(), &BackupPolicy::default()).unwrap();
    assert_eq!(read_snapshot(&path), before);
    assert!(read_text(&path).contains("0: 10"));
}
