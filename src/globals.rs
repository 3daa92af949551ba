//! The survival-mode global settings file.
//!
//! A single gzip container per data directory (no extension) whose body is
//! `{ SETTINGS: { __type, value: {...} } }`. Only whitelisted fields are
//! editable, each clamped to the game's limits. Writes change those keys in
//! the parsed document and keep everything else; `lastDifficultySelection`
//! and `disableUnspentUpgradeToCash` are always written, defaulted when
//! absent.

use crate::backup::{backup_flat, BackupPolicy};
use crate::catalog::upgrade_max_level;
use crate::error::SaveError;
use crate::loose::{as_number, is_truthy, number_value, parse_loose, stringify_loose, LooseMap};
use crate::model::WriteOutcome;
use crate::store::{delete_file, read_container, write_container};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

pub const GLOBAL_SETTINGS_FILE: &str = "survival_global_settings";
pub const GLOBAL_INNER_NAME: &str = "survival_global_settings.out";
const SETTINGS_TYPE: &str = "SurvivalMode+SurvivalSettingsStateGlobal,Assembly-CSharp";
const BACKUP_EXT: &str = ".gz";

pub const BEST_DAY_MAX: f64 = 100.0;
pub const STARS_MAX: f64 = 5.0;
pub const POPULATION_MAX: f64 = 999_999_999.0;
pub const UPGRADE_POINTS_MAX: f64 = 999_999.0;

const DEFAULT_DIFFICULTY_SELECTION: f64 = 2.0;

fn clamp(n: f64, lo: f64, hi: f64) -> f64 {
    if n.is_finite() {
        n.clamp(lo, hi)
    } else {
        lo
    }
}

/// Sparse edit of the global settings. Absent fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalSettingsPatch {
    pub best_day_reached_easy: Option<f64>,
    pub best_day_reached_hard: Option<f64>,
    pub best_day_reached_expert: Option<f64>,
    pub highest_stars_reached_easy: Option<f64>,
    pub highest_stars_reached_hard: Option<f64>,
    pub highest_stars_reached_expert: Option<f64>,
    pub highest_population_reached_easy: Option<f64>,
    pub highest_population_reached_hard: Option<f64>,
    pub highest_population_reached_expert: Option<f64>,
    pub total_upgrade_points: Option<f64>,
    pub upgrades_spent: Option<BTreeMap<i64, f64>>,
}

/// The editable, clamped view of the settings. Missing fields read as 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditableGlobals {
    pub best_day_reached_easy: f64,
    pub best_day_reached_hard: f64,
    pub best_day_reached_expert: f64,
    pub highest_stars_reached_easy: f64,
    pub highest_stars_reached_hard: f64,
    pub highest_stars_reached_expert: f64,
    pub highest_population_reached_easy: f64,
    pub highest_population_reached_hard: f64,
    pub highest_population_reached_expert: f64,
    pub total_upgrade_points: f64,
    pub upgrades_spent: BTreeMap<i64, f64>,
}

/// Fields in file order, with their limits.
const FIELDS: [(&str, f64); 10] = [
    ("bestDayReachedEasy", BEST_DAY_MAX),
    ("bestDayReachedHard", BEST_DAY_MAX),
    ("bestDayReachedExpert", BEST_DAY_MAX),
    ("highestStarsReachedEasy", STARS_MAX),
    ("highestStarsReachedHard", STARS_MAX),
    ("highestStarsReachedExpert", STARS_MAX),
    ("highestPopulationReachedEasy", POPULATION_MAX),
    ("highestPopulationReachedHard", POPULATION_MAX),
    ("highestPopulationReachedExpert", POPULATION_MAX),
    ("totalUpgradePoints", UPGRADE_POINTS_MAX),
];

fn clamp_upgrade(id: i64, level: f64) -> f64 {
    clamp(level, 0.0, upgrade_max_level(id) as f64)
}

impl EditableGlobals {
    fn slots(&mut self) -> [&mut f64; 10] {
        [
            &mut self.best_day_reached_easy,
            &mut self.best_day_reached_hard,
            &mut self.best_day_reached_expert,
            &mut self.highest_stars_reached_easy,
            &mut self.highest_stars_reached_hard,
            &mut self.highest_stars_reached_expert,
            &mut self.highest_population_reached_easy,
            &mut self.highest_population_reached_hard,
            &mut self.highest_population_reached_expert,
            &mut self.total_upgrade_points,
        ]
    }

    /// Project `SETTINGS.value`, clamping every field to its limit.
    pub fn from_value(value: &LooseMap) -> Self {
        let mut out = Self::default();
        for (slot, (key, max)) in out.slots().into_iter().zip(FIELDS) {
            *slot = clamp(as_number(value.get(key), 0.0), 0.0, max);
        }
        if let Some(Value::Object(spent)) = value.get("upgradesSpent") {
            out.upgrades_spent = spent
                .iter()
                .filter_map(|(k, v)| {
                    let id = k.trim().parse::<i64>().ok()?;
                    Some((id, clamp_upgrade(id, as_number(Some(v), 0.0))))
                })
                .collect();
        }
        out
    }
}

impl GlobalSettingsPatch {
    fn fields(&self) -> [Option<f64>; 10] {
        [
            self.best_day_reached_easy,
            self.best_day_reached_hard,
            self.best_day_reached_expert,
            self.highest_stars_reached_easy,
            self.highest_stars_reached_hard,
            self.highest_stars_reached_expert,
            self.highest_population_reached_easy,
            self.highest_population_reached_hard,
            self.highest_population_reached_expert,
            self.total_upgrade_points,
        ]
    }

    /// Apply to a `SETTINGS.value` object in place. Keys the patch does not
    /// name, including ones the editor does not know, are left as they are.
    pub fn apply_to(&self, value: &mut LooseMap) {
        for (incoming, (key, max)) in self.fields().into_iter().zip(FIELDS) {
            if let Some(n) = incoming {
                value.insert(key.to_string(), number_value(clamp(n, 0.0, max)));
            }
        }

        if let Some(spent) = &self.upgrades_spent {
            let slot = value
                .entry("upgradesSpent".to_string())
                .or_insert_with(|| Value::Object(LooseMap::new()));
            if !slot.is_object() {
                *slot = Value::Object(LooseMap::new());
            }
            if let Value::Object(existing) = slot {
                for (id, level) in spent {
                    existing.insert(id.to_string(), number_value(clamp_upgrade(*id, *level)));
                }
            }
        }

        let last_difficulty = match value.get("lastDifficultySelection") {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(DEFAULT_DIFFICULTY_SELECTION),
            _ => DEFAULT_DIFFICULTY_SELECTION,
        };
        value.insert(
            "lastDifficultySelection".to_string(),
            number_value(last_difficulty),
        );
        let disable_cash = is_truthy(value.get("disableUnspentUpgradeToCash"));
        value.insert(
            "disableUnspentUpgradeToCash".to_string(),
            Value::Bool(disable_cash),
        );
    }
}

/// Make `slot` an object (built by `fresh` when it is not one) and borrow it.
fn object_in<'a>(slot: &'a mut Value, fresh: impl FnOnce() -> Value) -> Option<&'a mut LooseMap> {
    if !slot.is_object() {
        *slot = fresh();
    }
    slot.as_object_mut()
}

/// `SETTINGS.value` inside `doc`, created when absent. A fresh `SETTINGS`
/// object gets the game's type tag.
fn settings_value_mut(doc: &mut Value) -> Option<&mut LooseMap> {
    let root = object_in(doc, || Value::Object(LooseMap::new()))?;
    let settings = root
        .entry("SETTINGS".to_string())
        .or_insert_with(|| json!({ "__type": SETTINGS_TYPE }));
    let settings = object_in(settings, || json!({ "__type": SETTINGS_TYPE }))?;
    let value = settings
        .entry("value".to_string())
        .or_insert_with(|| Value::Object(LooseMap::new()));
    object_in(value, || Value::Object(LooseMap::new()))
}

/// Result of [`GlobalSettingsStore::read`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettingsView {
    pub exists: bool,
    pub path: PathBuf,
    /// Not writable, or the body did not parse
    pub readonly: bool,
    pub editable: EditableGlobals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn settings_value(text: &str) -> Result<LooseMap, String> {
    let doc = parse_loose(text).map_err(|e| e.to_string())?;
    Ok(doc
        .get("SETTINGS")
        .and_then(|s| s.get("value"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default())
}

/// Whether the current user may write `path`, checked by opening it.
fn is_writable(path: &Path) -> bool {
    OpenOptions::new().write(true).open(path).is_ok()
}

/// Reads and writes the global settings file of a data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalSettingsStore {
    pub file_name: String,
    pub policy: BackupPolicy,
}

impl Default for GlobalSettingsStore {
    fn default() -> Self {
        Self {
            file_name: GLOBAL_SETTINGS_FILE.to_string(),
            policy: BackupPolicy::default(),
        }
    }
}

impl GlobalSettingsStore {
    pub fn path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.file_name)
    }

    pub fn backup_dir(&self, dir: &Path) -> PathBuf {
        dir.join(&self.policy.dir_name).join(&self.file_name)
    }

    /// Never fails; problems show up as `readonly` plus `error`.
    pub fn read(&self, dir: &Path) -> GlobalSettingsView {
        let path = self.path(dir);
        let mut view = GlobalSettingsView {
            exists: path.is_file(),
            path: path.clone(),
            readonly: false,
            editable: EditableGlobals::default(),
            error: None,
        };
        if !view.exists {
            return view;
        }

        view.readonly = !is_writable(&path);
        let parsed = read_container(&path)
            .map_err(|e| e.to_string())
            .and_then(|decoded| settings_value(&decoded.text));
        match parsed {
            Ok(value) => view.editable = EditableGlobals::from_value(&value),
            Err(err) => {
                log::warn!("global settings at {} unreadable: {err}", path.display());
                view.readonly = true;
                view.error = Some(err);
            }
        }
        view
    }

    fn take_backup(&self, dir: &Path, path: &Path) -> Option<PathBuf> {
        match backup_flat(path, &self.backup_dir(dir), BACKUP_EXT, self.policy.keep) {
            Ok(backup) => Some(backup),
            Err(err) => {
                log::warn!("backup of {} failed: {err}", path.display());
                None
            }
        }
    }

    /// Apply `patch` to the file's `SETTINGS.value` and rewrite it. Every
    /// other key of the document is kept.
    ///
    /// A missing file is created unless `create_if_missing` is false; an
    /// unparseable one is rebuilt from an empty document.
    pub fn write(
        &self,
        dir: &Path,
        patch: &GlobalSettingsPatch,
        create_if_missing: bool,
    ) -> Result<WriteOutcome, SaveError> {
        let path = self.path(dir);
        let exists = path.is_file();
        if !exists && !create_if_missing {
            return Err(SaveError::NotFound(path));
        }

        let backup_path = if exists {
            self.take_backup(dir, &path)
        } else {
            None
        };

        let mut doc = if exists {
            read_container(&path)
                .map_err(|e| e.to_string())
                .and_then(|decoded| parse_loose(&decoded.text).map_err(|e| e.to_string()))
                .unwrap_or_else(|err| {
                    log::warn!("rebuilding unparseable global settings: {err}");
                    Value::Object(LooseMap::new())
                })
        } else {
            Value::Object(LooseMap::new())
        };

        let value = settings_value_mut(&mut doc).ok_or_else(|| SaveError::WriteFailure {
            path: path.clone(),
            reason: "cannot build SETTINGS.value".to_string(),
        })?;
        patch.apply_to(value);

        let text = stringify_loose(&doc).map_err(|e| SaveError::WriteFailure {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        write_container(&path, &text, Some(GLOBAL_INNER_NAME))?;

        Ok(WriteOutcome {
            backup_path,
            ..WriteOutcome::default()
        })
    }

    /// Back up, then remove the file.
    pub fn delete(&self, dir: &Path) -> Result<WriteOutcome, SaveError> {
        let path = self.path(dir);
        if !path.is_file() {
            return Err(SaveError::NotFound(path));
        }
        let backup_path = self.take_backup(dir, &path);
        delete_file(&path)?;
        Ok(WriteOutcome {
            backup_path,
            ..WriteOutcome::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
  SETTINGS: {
    __type: "SurvivalMode+SurvivalSettingsStateGlobal,Assembly-CSharp",
    value: {
      bestDayReachedEasy: 250,
      highestStarsReachedHard: 3,
      totalUpgradePoints: 12,
      upgradesSpent: { 1: 9, 3: 5, 42: 1 },
      lastDifficultySelection: 1,
      disableUnspentUpgradeToCash: true,
    },
  },
}"#;

    fn fixture() -> (tempfile::TempDir, GlobalSettingsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = GlobalSettingsStore::default();
        write_container(&store.path(dir.path()), BODY, Some(GLOBAL_INNER_NAME)).unwrap();
        (dir, store)
    }

    #[test]
    fn test_read_clamps() {
        let (dir, store) = fixture();
        let view = store.read(dir.path());
        assert!(view.exists && !view.readonly);
        assert_eq!(view.editable.best_day_reached_easy, 100.0);
        assert_eq!(view.editable.highest_stars_reached_hard, 3.0);
        assert_eq!(view.editable.total_upgrade_points, 12.0);
        assert_eq!(
            view.editable.upgrades_spent.into_iter().collect::<Vec<_>>(),
            vec![(1, 3.0), (3, 2.0), (42, 1.0)]
        );
    }

    #[test]
    fn test_missing_fields_read_as_zero() {
        let value = LooseMap::new();
        let editable = EditableGlobals::from_value(&value);
        assert_eq!(editable, EditableGlobals::default());
        assert_eq!(editable.best_day_reached_hard, 0.0);
        assert_eq!(editable.total_upgrade_points, 0.0);
    }

    #[test]
    fn test_write_keeps_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = GlobalSettingsStore::default();
        let body = r#"{SETTINGS:{__type:"Custom,Type",value:{bestDayReachedEasy:7,futureField:42,upgradesSpent:{1:1,12:2}}},OTHER:{keep:1}}"#;
        write_container(&store.path(dir.path()), body, Some(GLOBAL_INNER_NAME)).unwrap();

        let patch = GlobalSettingsPatch {
            highest_stars_reached_easy: Some(2.0),
            upgrades_spent: Some(BTreeMap::from([(3, 5.0), (12, 9.0)])),
            ..Default::default()
        };
        store.write(dir.path(), &patch, false).unwrap();

        let text = read_container(&store.path(dir.path())).unwrap().text;
        let doc = parse_loose(&text).unwrap();
        assert_eq!(doc["OTHER"]["keep"], 1);
        assert_eq!(doc["SETTINGS"]["__type"], "Custom,Type");

        let value = doc["SETTINGS"]["value"].as_object().unwrap();
        assert_eq!(value["futureField"], 42);
        assert_eq!(value["bestDayReachedEasy"], 7);
        assert_eq!(value["highestStarsReachedEasy"], 2);
        assert_eq!(value["upgradesSpent"]["1"], 1);
        assert_eq!(value["upgradesSpent"]["3"], 2);
        assert_eq!(value["upgradesSpent"]["12"], 3);
        assert_eq!(value["lastDifficultySelection"], 2);
        assert_eq!(value["disableUnspentUpgradeToCash"], false);
        for absent in ["bestDayReachedHard", "highestPopulationReachedEasy", "totalUpgradePoints"] {
            assert!(!value.contains_key(absent), "{absent} was invented");
        }
    }

    #[test]
    fn test_write_rebuilds_unparseable_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = GlobalSettingsStore::default();
        write_container(&store.path(dir.path()), "{ SETTINGS: ", None).unwrap();

        let patch = GlobalSettingsPatch {
            total_upgrade_points: Some(5.0e9),
            ..Default::default()
        };
        let outcome = store.write(dir.path(), &patch, false).unwrap();
        assert!(outcome.backup_path.is_some());

        let doc = parse_loose(&read_container(&store.path(dir.path())).unwrap().text).unwrap();
        assert_eq!(doc["SETTINGS"]["__type"], SETTINGS_TYPE);
        assert_eq!(doc["SETTINGS"]["value"]["totalUpgradePoints"], 999_999);
    }

    #[test]
    fn test_read_missing() {
        let dir = tempfile::tempdir().unwrap();
        let view = GlobalSettingsStore::default().read(dir.path());
        assert!(!view.exists && !view.readonly);
        assert_eq!(view.editable, EditableGlobals::default());
    }

    #[test]
    fn test_read_garbage_is_readonly() {
        let dir = tempfile::tempdir().unwrap();
        let store = GlobalSettingsStore::default();
        write_container(&store.path(dir.path()), "{ SETTINGS: ", None).unwrap();
        let view = store.read(dir.path());
        assert!(view.readonly);
        assert!(view.error.is_some());
    }

    #[test]
    fn test_writability_is_checked_by_opening() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, b"x").unwrap();
        assert!(is_writable(&file));
        assert!(!is_writable(dir.path()));
        assert!(!is_writable(&dir.path().join("missing")));
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_file_reports_readonly() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, store) = fixture();
        let path = store.path(dir.path());
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o444)).unwrap();
        if is_writable(&path) {
            // privileged user; mode bits do not apply
            return;
        }
        let view = store.read(dir.path());
        assert!(view.readonly);
        assert!(view.error.is_none());
        assert_eq!(view.editable.highest_stars_reached_hard, 3.0);
    }

    #[test]
    fn test_write_preserves_and_backs_up() {
        let (dir, store) = fixture();
        let patch = GlobalSettingsPatch {
            highest_stars_reached_easy: Some(9.0),
            ..Default::default()
        };
        let outcome = store.write(dir.path(), &patch, false).unwrap();
        let backup = outcome.backup_path.unwrap();
        assert!(backup.starts_with(store.backup_dir(dir.path())));
        assert_eq!(backup.extension().unwrap(), "gz");

        let decoded = read_container(&store.path(dir.path())).unwrap();
        assert_eq!(decoded.inner_name.as_deref(), Some(GLOBAL_INNER_NAME));
        assert!(decoded.text.contains("lastDifficultySelection\": 1"));
        assert!(decoded.text.contains("disableUnspentUpgradeToCash\": true"));
        assert!(decoded.text.contains("1: 9"));
        assert!(decoded.text.contains("bestDayReachedEasy\": 250"));

        let view = store.read(dir.path());
        assert_eq!(view.editable.highest_stars_reached_easy, 5.0);
        assert_eq!(view.editable.highest_stars_reached_hard, 3.0);
    }

    #[test]
    fn test_write_missing_without_create() {
        let dir = tempfile::tempdir().unwrap();
        let store = GlobalSettingsStore::default();
        let err = store
            .write(dir.path(), &GlobalSettingsPatch::default(), false)
            .unwrap_err();
        assert!(matches!(err, SaveError::NotFound(_)));

        let outcome = store
            .write(dir.path(), &GlobalSettingsPatch::default(), true)
            .unwrap();
        assert!(outcome.backup_path.is_none());
        let view = store.read(dir.path());
        assert!(view.exists);
        assert_eq!(view.editable, EditableGlobals::default());
    }

    #[test]
    fn test_delete() {
        let (dir, store) = fixture();
        let outcome = store.delete(dir.path()).unwrap();
        assert!(outcome.backup_path.unwrap().exists());
        assert!(!store.path(dir.path()).exists());
        assert!(matches!(store.delete(dir.path()), Err(SaveError::NotFound(_))));
    }
}
