use crate::loose::number_value;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const MAP_SIZE_MIN: f64 = 40.0;
pub const MAP_SIZE_MAX: f64 = 88.0;

/// Sparse write request. Absent fields leave the file untouched.
///
/// Business rules are applied at write time against the file currently on
/// disk (see [`Patch::resolve`]), never at construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Patch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub money: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research_points: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<f64>,
    /// Drives `unlockAll`, `infiniteMoney` and `maxLevel` together
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<ResourceAmount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Vec<RelationshipLevel>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlocked_cars: Option<Vec<CarUnlock>>,
    #[serde(skip)]
    pub collection_mode: CollectionMode,
}

/// How a collection in the patch combines with the one already on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollectionMode {
    /// Overwrite listed ids, keep the rest
    #[default]
    Merge,
    /// The listed entries become the whole collection
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceAmount {
    pub id: i64,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelationshipLevel {
    pub id: i64,
    pub level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarUnlock {
    pub id: i64,
    pub unlocked: bool,
}

/// State of the target file that the write-time rules depend on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetState {
    pub is_survival_mode: bool,
    pub map_size: f64,
}

/// A patch with every business rule applied, ready for either writer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedPatch {
    /// Scalar keys of the save's value object with their new values
    pub scalars: Vec<(&'static str, Value)>,
    pub resources: Option<BTreeMap<i64, f64>>,
    pub relationships: Option<BTreeMap<i64, f64>>,
    pub unlocked_cars: Option<BTreeMap<i64, bool>>,
    pub collection_mode: CollectionMode,
}

impl ResolvedPatch {
    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty()
            && self.resources.is_none()
            && self.relationships.is_none()
            && self.unlocked_cars.is_none()
    }
}

/// Non-finite input falls back to 0.
pub fn finite_or_zero(n: f64) -> f64 {
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// Map size never shrinks and stays within [40, 88].
///
/// A non-finite request keeps the current size.
pub fn effective_map_size(current: f64, requested: f64) -> f64 {
    let current = if current.is_finite() { current } else { MAP_SIZE_MIN };
    if !requested.is_finite() {
        return current;
    }
    current.max(requested.clamp(MAP_SIZE_MIN, MAP_SIZE_MAX))
}

impl Patch {
    pub fn is_empty(&self) -> bool {
        Patch {
            collection_mode: CollectionMode::Merge,
            ..self.clone()
        } == Patch::default()
    }

    /// Apply the write-time rules against `target`.
    pub fn resolve(&self, target: TargetState) -> ResolvedPatch {
        let mut scalars: Vec<(&'static str, Value)> = Vec::new();

        if let Some(name) = &self.name {
            scalars.push(("name", Value::String(name.clone())));
        }

        let numbers = [
            ("money", self.money),
            ("researchPoints", self.research_points),
            ("day", self.day),
            ("dayProgress", self.day_progress),
            ("difficulty", self.difficulty),
            ("level", self.level),
        ];
        for (key, value) in numbers {
            if let Some(n) = value {
                scalars.push((key, number_value(finite_or_zero(n))));
            }
        }

        if let Some(requested) = self.map_size {
            let effective = effective_map_size(target.map_size, requested);
            scalars.push(("mapSize", number_value(effective)));
        }

        if let Some(sandbox) = self.sandbox {
            if !target.is_survival_mode {
                for key in ["unlockAll", "infiniteMoney", "maxLevel"] {
                    scalars.push((key, Value::Bool(sandbox)));
                }
            }
        }

        ResolvedPatch {
            scalars,
            resources: self.resources.as_ref().map(|entries| {
                entries
                    .iter()
                    .map(|r| (r.id, finite_or_zero(r.amount).max(0.0)))
                    .collect()
            }),
            relationships: self.relationships.as_ref().map(|entries| {
                entries
                    .iter()
                    .map(|r| (r.id, finite_or_zero(r.level)))
                    .collect()
            }),
            unlocked_cars: self
                .unlocked_cars
                .as_ref()
                .map(|entries| entries.iter().map(|c| (c.id, c.unlocked)).collect()),
            collection_mode: self.collection_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn target(survival: bool, map_size: f64) -> TargetState {
        TargetState {
            is_survival_mode: survival,
            map_size,
        }
    }

    #[test]
    fn test_map_size_never_shrinks() {
        assert_eq!(effective_map_size(64.0, 50.0), 64.0);
        assert_eq!(effective_map_size(64.0, 72.0), 72.0);
        assert_eq!(effective_map_size(40.0, 500.0), 88.0);
        assert_eq!(effective_map_size(40.0, f64::NAN), 40.0);
    }

    #[test]
    fn test_sandbox_ignored_in_survival() {
        let patch = Patch {
            sandbox: Some(true),
            ..Default::default()
        };
        assert!(patch.resolve(target(true, 40.0)).is_empty());
        let resolved = patch.resolve(target(false, 40.0));
        assert_eq!(resolved.scalars.len(), 3);
        assert!(resolved.scalars.iter().all(|(_, v)| *v == json!(true)));
    }

    #[test]
    fn test_resources_floored_and_deduplicated() {
        let patch = Patch {
            resources: Some(vec![
                ResourceAmount { id: 2, amount: -5.0 },
                ResourceAmount { id: 1, amount: 3.0 },
                ResourceAmount { id: 1, amount: 7.0 },
            ]),
            ..Default::default()
        };
        let resources = patch.resolve(target(false, 40.0)).resources.unwrap();
        assert_eq!(resources.into_iter().collect::<Vec<_>>(), vec![(1, 7.0), (2, 0.0)]);
    }

    #[test]
    fn test_non_finite_numbers_become_zero() {
        let patch = Patch {
            money: Some(f64::INFINITY),
            ..Default::default()
        };
        let resolved = patch.resolve(target(false, 40.0));
        assert_eq!(resolved.scalars, vec![("money", json!(0))]);
    }

    #[test]
    fn test_patch_deserializes_camel_case() {
        let patch: Patch = serde_json::from_str(
            r#"{ "mapSize": 60, "researchPoints": 5, "unlockedCars": [{ "id": 3, "unlocked": true }] }"#,
        )
        .unwrap();
        assert_eq!(patch.map_size, Some(60.0));
        assert_eq!(patch.research_points, Some(5.0));
        assert_eq!(patch.unlocked_cars, Some(vec![CarUnlock { id: 3, unlocked: true }]));
        assert!(!patch.is_empty());
        assert!(Patch::default().is_empty());
    }

    proptest! {
        #[test]
        fn prop_map_growth_is_monotonic(current in 40.0f64..=88.0, requested in -1000.0f64..1000.0) {
            let effective = effective_map_size(current, requested);
            prop_assert!(effective >= current);
            prop_assert!((MAP_SIZE_MIN..=MAP_SIZE_MAX).contains(&effective));
        }
    }
}
