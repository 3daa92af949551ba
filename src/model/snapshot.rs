//! Read-side projection of a save into a typed [`Snapshot`].

use crate::loose::{as_number, is_truthy, LooseMap, LooseValue};
use crate::structural::{
    extract_bool_loose, extract_number_loose, extract_string_loose, find_path_block,
    read_boolean_block, read_numeric_block, Window,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const ROOT_PATH: [&str; 2] = ["CITY", "value"];

/// Normalized view of one save's editable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(rename = "FILE_ID")]
    pub file_id: String,
    pub name: String,
    /// Empty for a root save
    pub parent_city: String,
    pub difficulty: f64,
    pub map_size: f64,
    pub day: f64,
    pub day_progress: f64,
    pub money: f64,
    pub research_points: f64,
    pub level: f64,
    pub is_survival_mode: bool,
    pub unlock_all: bool,
    pub infinite_money: bool,
    pub max_level: bool,
    pub sandbox_enabled: bool,
    pub resources: BTreeMap<i64, f64>,
    pub relationships: BTreeMap<i64, i64>,
    pub unlocked_cars: BTreeMap<i64, bool>,
    /// Built by best-effort extraction; not safe to write back from
    pub tolerant: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            file_id: String::new(),
            name: String::new(),
            parent_city: String::new(),
            difficulty: 1.0,
            map_size: 40.0,
            day: 1.0,
            day_progress: 0.0,
            money: 0.0,
            research_points: 0.0,
            level: 0.0,
            is_survival_mode: false,
            unlock_all: false,
            infinite_money: false,
            max_level: false,
            sandbox_enabled: false,
            resources: BTreeMap::new(),
            relationships: BTreeMap::new(),
            unlocked_cars: BTreeMap::new(),
            tolerant: false,
            error: None,
        }
    }
}

impl Snapshot {
    pub fn is_root(&self) -> bool {
        self.parent_city.trim().is_empty()
    }

    /// Placeholder for a file that could not be decoded at all.
    pub fn unreadable(message: impl Into<String>) -> Self {
        Self {
            tolerant: true,
            error: Some(message.into()),
            ..Self::default()
        }
    }

    fn finish_flags(mut self) -> Self {
        self.sandbox_enabled = self.unlock_all || self.infinite_money || self.max_level;
        self
    }
}

/// The save's editable object, `CITY.value`.
pub fn root_object(doc: &LooseValue) -> Option<&LooseMap> {
    doc.get(ROOT_PATH[0])?.get(ROOT_PATH[1])?.as_object()
}

/// `FILE_ID` at top level, then under `CITY`, then under `CITY.value`.
pub fn lookup_file_id(doc: &LooseValue) -> String {
    let candidates = [
        doc.get("FILE_ID"),
        doc.get(ROOT_PATH[0]).and_then(|c| c.get("FILE_ID")),
        root_object(doc).and_then(|v| v.get("FILE_ID")),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

fn string_field(map: &LooseMap, key: &str) -> String {
    match map.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn id_of(key: &str) -> Option<i64> {
    let trimmed = key.trim();
    trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().filter(|f| f.fract() == 0.0).map(|f| f as i64))
}

fn numeric_collection(value: Option<&Value>) -> BTreeMap<i64, f64> {
    let Some(Value::Object(map)) = value else {
        return BTreeMap::new();
    };
    map.iter()
        .filter_map(|(k, v)| Some((id_of(k)?, as_number(Some(v), 0.0))))
        .collect()
}

fn boolean_collection(value: Option<&Value>) -> BTreeMap<i64, bool> {
    let Some(Value::Object(map)) = value else {
        return BTreeMap::new();
    };
    map.iter()
        .filter_map(|(k, v)| Some((id_of(k)?, is_truthy(Some(v)))))
        .collect()
}

fn levels(map: BTreeMap<i64, f64>) -> BTreeMap<i64, i64> {
    map.into_iter().map(|(id, v)| (id, v.trunc() as i64)).collect()
}

fn amounts(map: BTreeMap<i64, f64>) -> BTreeMap<i64, f64> {
    map.into_iter().map(|(id, v)| (id, v.max(0.0))).collect()
}

/// Project a strictly parsed document.
pub fn project_strict(doc: &LooseValue) -> Snapshot {
    let empty = LooseMap::new();
    let v = root_object(doc).unwrap_or(&empty);
    let defaults = Snapshot::default();

    Snapshot {
        file_id: lookup_file_id(doc),
        name: string_field(v, "name"),
        parent_city: string_field(v, "parentCity"),
        difficulty: as_number(v.get("difficulty"), defaults.difficulty),
        map_size: as_number(v.get("mapSize"), defaults.map_size),
        day: as_number(v.get("day"), defaults.day),
        day_progress: as_number(v.get("dayProgress"), defaults.day_progress),
        money: as_number(v.get("money"), defaults.money),
        research_points: as_number(v.get("researchPoints"), defaults.research_points),
        level: as_number(v.get("level"), defaults.level),
        is_survival_mode: is_truthy(v.get("isSurvivalMode")),
        unlock_all: is_truthy(v.get("unlockAll")),
        infinite_money: is_truthy(v.get("infiniteMoney")),
        max_level: is_truthy(v.get("maxLevel")),
        resources: amounts(numeric_collection(v.get("resources"))),
        relationships: levels(numeric_collection(v.get("relationships"))),
        unlocked_cars: boolean_collection(v.get("unlockedCars")),
        ..defaults
    }
    .finish_flags()
}

/// Best-effort projection of text that failed to parse.
///
/// Scalars come from whole-text extraction; collections from the first
/// matching block inside `CITY.value` when that can be located, else
/// anywhere in the text. Anything unrecoverable keeps its default.
pub fn project_tolerant(text: &str, error: impl Into<String>) -> Snapshot {
    let defaults = Snapshot::default();
    let window = find_path_block(text, &ROOT_PATH)
        .map(|block| block.window())
        .unwrap_or_else(|| Window::whole(text));

    let number = |key: &str, fallback: f64| extract_number_loose(text, key).unwrap_or(fallback);
    let flag = |key: &str| extract_bool_loose(text, key).unwrap_or(false);

    Snapshot {
        file_id: extract_string_loose(text, "FILE_ID").unwrap_or_default(),
        name: extract_string_loose(text, "name").unwrap_or_default(),
        parent_city: extract_string_loose(text, "parentCity").unwrap_or_default(),
        difficulty: number("difficulty", defaults.difficulty),
        map_size: number("mapSize", defaults.map_size),
        day: number("day", defaults.day),
        day_progress: number("dayProgress", defaults.day_progress),
        money: number("money", defaults.money),
        research_points: number("researchPoints", defaults.research_points),
        level: number("level", defaults.level),
        is_survival_mode: flag("isSurvivalMode"),
        unlock_all: flag("unlockAll"),
        infinite_money: flag("infiniteMoney"),
        max_level: flag("maxLevel"),
        resources: amounts(read_numeric_block(text, "resources", window).unwrap_or_default()),
        relationships: levels(
            read_numeric_block(text, "relationships", window).unwrap_or_default(),
        ),
        unlocked_cars: read_boolean_block(text, "unlockedCars", window).unwrap_or_default(),
        tolerant: true,
        error: Some(error.into()),
        ..defaults
    }
    .finish_flags()
}

/// Parse `text` and project it, degrading to the tolerant projection.
pub fn snapshot_from_text(text: &str) -> Snapshot {
    match crate::loose::parse_loose(text) {
        Ok(doc) => project_strict(&doc),
        Err(err) => {
            log::debug!("strict parse failed, using tolerant projection: {err}");
            project_tolerant(text, err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAVE: &str = r#"{
  FILE_ID: "F-1",
  CITY: {
    value: {
      name: "Harbor",
      parentCity: "",
      mapSize: 64,
      money: 1500,
      isSurvivalMode: false,
      infiniteMoney: true,
      resources: { 0: 10, "3": -4, 7: 2.5 },
      relationships: { 1: 2.9 },
      unlockedCars: { 2: true, 5: 0 },
    },
  },
}"#;

    #[test]
    fn test_strict_projection() {
        let snap = snapshot_from_text(SAVE);
        assert!(!snap.tolerant);
        assert_eq!(snap.file_id, "F-1");
        assert_eq!(snap.name, "Harbor");
        assert_eq!(snap.map_size, 64.0);
        assert_eq!(snap.day, 1.0);
        assert!(snap.sandbox_enabled);
        assert!(snap.is_root());
        assert_eq!(snap.resources.get(&3), Some(&0.0));
        assert_eq!(snap.resources.get(&7), Some(&2.5));
        assert_eq!(snap.relationships.get(&1), Some(&2));
        assert_eq!(snap.unlocked_cars.get(&5), Some(&false));
    }

    #[test]
    fn test_file_id_from_value_object() {
        let doc = crate::loose::parse_loose(r#"{ CITY: { value: { FILE_ID: "X" } } }"#).unwrap();
        assert_eq!(lookup_file_id(&doc), "X");
    }

    #[test]
    fn test_tolerant_projection_of_broken_text() {
        // Outer closing brace removed.
        let broken = &SAVE[..SAVE.rfind('}').unwrap()];
        let snap = snapshot_from_text(broken);
        assert!(snap.tolerant);
        assert!(snap.error.is_some());
        assert_eq!(snap.file_id, "F-1");
        assert_eq!(snap.money, 1500.0);
        assert!(snap.infinite_money && snap.sandbox_enabled);
        assert_eq!(snap.resources.get(&0), Some(&10.0));
        assert_eq!(snap.unlocked_cars.get(&2), Some(&true));
    }

    #[test]
    fn test_tolerant_projection_of_garbage() {
        let snap = snapshot_from_text("{{{ money: 12, resources: { 1: 2");
        assert!(snap.tolerant);
        assert_eq!(snap.money, 12.0);
        assert!(snap.resources.is_empty());
        assert_eq!(snap.map_size, 40.0);
    }

    #[test]
    fn test_snapshot_serializes_file_id_key() {
        let json = serde_json::to_value(Snapshot::default()).unwrap();
        assert!(json.get("FILE_ID").is_some());
        assert!(json.get("mapSize").is_some());
        assert!(json.get("error").is_none());
    }
}
