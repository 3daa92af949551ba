//! Survival global settings through the editor facade.

use save_patcher::codec::{decode, encode};
use save_patcher::loose::parse_loose;
use save_patcher::{EditorConfig, GlobalSettingsPatch, SaveEditor, SaveError};
use std::collections::BTreeMap;
use std::fs;
use tempfile::TempDir;

fn editor() -> SaveEditor {
    SaveEditor::new(EditorConfig::default())
}

#[test]
fn test_missing_file_reads_as_zero() {
    let dir = TempDir::new().unwrap();
    let view = editor().read_global_settings(dir.path());
    assert!(!view.exists);
    assert_eq!(view.editable.best_day_reached_easy, 0.0);
    assert_eq!(view.editable.highest_stars_reached_expert, 0.0);
    assert_eq!(view.editable.total_upgrade_points, 0.0);
    assert!(view.editable.upgrades_spent.is_empty());
}

#[test]
fn test_create_then_update() {
    let dir = TempDir::new().unwrap();
    let editor = editor();

    let create = GlobalSettingsPatch {
        best_day_reached_hard: Some(12.0),
        upgrades_spent: Some(BTreeMap::from([(3, 9.0), (1, 2.0), (77, 1.0)])),
        ..Default::default()
    };
    let outcome = editor.write_global_settings(dir.path(), &create, true).unwrap();
    assert!(outcome.backup_path.is_none());

    let path = dir.path().join("survival_global_settings");
    let decoded = decode(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(decoded.inner_name.as_deref(), Some("survival_global_settings.out"));
    let doc = parse_loose(&decoded.text).unwrap();
    assert_eq!(
        doc["SETTINGS"]["__type"],
        "SurvivalMode+SurvivalSettingsStateGlobal,Assembly-CSharp"
    );

    let view = editor.read_global_settings(dir.path());
    assert_eq!(view.editable.best_day_reached_hard, 12.0);
    assert_eq!(
        view.editable.upgrades_spent.clone().into_iter().collect::<Vec<_>>(),
        vec![(1, 2.0), (3, 2.0), (77, 1.0)]
    );

    let update = GlobalSettingsPatch {
        highest_stars_reached_easy: Some(2.0),
        ..Default::default()
    };
    let outcome = editor.write_global_settings(dir.path(), &update, false).unwrap();
    let backup = outcome.backup_path.unwrap();
    assert!(backup.starts_with(dir.path().join(".backups").join("survival_global_settings")));
    assert_eq!(backup.extension().unwrap(), "gz");

    let view = editor.read_global_settings(dir.path());
    assert_eq!(view.editable.highest_stars_reached_easy, 2.0);
    assert_eq!(view.editable.best_day_reached_hard, 12.0);
}

#[test]
fn test_no_create_on_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = editor()
        .write_global_settings(dir.path(), &GlobalSettingsPatch::default(), false)
        .unwrap_err();
    assert!(matches!(err, SaveError::NotFound(_)));
}

#[test]
fn test_delete_takes_backup() {
    let dir = TempDir::new().unwrap();
    let editor = editor();
    editor
        .write_global_settings(dir.path(), &GlobalSettingsPatch::default(), true)
        .unwrap();

    let outcome = editor.delete_global_settings(dir.path()).unwrap();
    assert!(outcome.backup_path.is_some_and(|p| p.exists()));
    assert!(!dir.path().join("survival_global_settings").exists());
    assert!(matches!(
        editor.delete_global_settings(dir.path()),
        Err(SaveError::NotFound(_))
    ));
}

#[test]
fn test_update_keeps_unknown_and_absent_fields() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("survival_global_settings");
    let body = r#"{SETTINGS:{__type:"Custom,Type",value:{bestDayReachedEasy:7,futureField:42,upgradesSpent:{1:1,12:2}}},OTHER:{keep:1}}"#;
    fs::write(&path, encode(body, Some("survival_global_settings.out"), &path).unwrap()).unwrap();

    let editor = editor();
    let patch = GlobalSettingsPatch {
        highest_stars_reached_easy: Some(2.0),
        ..Default::default()
    };
    editor.write_global_settings(dir.path(), &patch, false).unwrap();

    let text = decode(&fs::read(&path).unwrap()).unwrap().text;
    let doc = parse_loose(&text).unwrap();
    assert_eq!(doc["SETTINGS"]["__type"], "Custom,Type");
    assert_eq!(doc["SETTINGS"]["value"]["futureField"], 42);
    assert_eq!(doc["SETTINGS"]["value"]["upgradesSpent"]["12"], 2);
    assert_eq!(doc["OTHER"]["keep"], 1);
    for absent in ["bestDayReachedHard", "highestPopulationReachedEasy", "totalUpgradePoints"] {
        assert!(!text.contains(absent), "{absent} should not be written");
    }

    let view = editor.read_global_settings(dir.path());
    assert_eq!(view.editable.best_day_reached_easy, 7.0);
    assert_eq!(view.editable.highest_stars_reached_easy, 2.0);
    assert_eq!(view.editable.best_day_reached_hard, 0.0);
    assert_eq!(view.editable.total_upgrade_points, 0.0);
    assert_eq!(view.editable.upgrades_spent.get(&12), Some(&2.0));
}
