//! The two write paths behind one interface.
//!
//! [`StrictWriter`] mutates the parsed tree and re-serializes it;
//! [`StructuralWriter`] splices the same resolved patch into the raw text.
//! Callers try them in that order and never need to know which one ran.

use crate::loose::{as_number, is_truthy, number_value, parse_loose, stringify_loose, LooseMap};
use crate::model::errors::PatchError;
use crate::model::patch::{CollectionMode, Patch, ResolvedPatch, TargetState};
use crate::model::snapshot::ROOT_PATH;
use crate::structural::{
    boolean_entries, build_inner, extract_bool_loose, extract_number_loose, find_first_block,
    find_path_block, get_scalar, numeric_entries, parse_boolean_entries, parse_numeric_entries,
    parse_raw_entries, raw_as_bool, raw_as_number, rebuild_collection, replace_scalar_loose,
    set_scalar, BlockPosition, Entry, Splice, StructuralError, Window,
};
use serde_json::Value;
use std::collections::BTreeMap;

/// Result of one writer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub text: String,
    /// Patch fields that could not be placed
    pub skipped: Vec<String>,
}

pub trait SaveWriter {
    fn name(&self) -> &'static str;

    fn apply(&self, text: &str, patch: &Patch) -> Result<Applied, PatchError>;
}

const DEFAULT_MAP_SIZE: f64 = 40.0;

fn merge<V: Copy>(
    existing: BTreeMap<i64, V>,
    incoming: &BTreeMap<i64, V>,
    mode: CollectionMode,
) -> BTreeMap<i64, V> {
    let mut merged = match mode {
        CollectionMode::Merge => existing,
        CollectionMode::Replace => BTreeMap::new(),
    };
    merged.extend(incoming.iter().map(|(id, v)| (*id, *v)));
    merged
}

/// Round-trip through the loose parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictWriter;

impl StrictWriter {
    fn put_collection(
        root: &mut LooseMap,
        key: &str,
        entries: impl Iterator<Item = (i64, Value)>,
        mode: CollectionMode,
    ) {
        let slot = root
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(LooseMap::new()));
        if !slot.is_object() || mode == CollectionMode::Replace {
            *slot = Value::Object(LooseMap::new());
        }
        if let Value::Object(map) = slot {
            for (id, value) in entries {
                map.insert(id.to_string(), value);
            }
        }
    }
}

impl SaveWriter for StrictWriter {
    fn name(&self) -> &'static str {
        "strict"
    }

    fn apply(&self, text: &str, patch: &Patch) -> Result<Applied, PatchError> {
        let mut doc = parse_loose(text)?;
        let root = doc
            .get_mut(ROOT_PATH[0])
            .and_then(|city| city.get_mut(ROOT_PATH[1]))
            .and_then(Value::as_object_mut)
            .ok_or_else(|| PatchError::MissingContainer {
                path: ROOT_PATH.join("."),
            })?;

        let target = TargetState {
            is_survival_mode: is_truthy(root.get("isSurvivalMode")),
            map_size: as_number(root.get("mapSize"), DEFAULT_MAP_SIZE),
        };
        let resolved = patch.resolve(target);

        for (key, value) in &resolved.scalars {
            root.insert((*key).to_string(), value.clone());
        }

        let mode = resolved.collection_mode;
        if let Some(resources) = &resolved.resources {
            let values = resources.iter().map(|(id, v)| (*id, number_value(*v)));
            Self::put_collection(root, "resources", values, mode);
        }
        if let Some(relationships) = &resolved.relationships {
            let values = relationships.iter().map(|(id, v)| (*id, number_value(*v)));
            Self::put_collection(root, "relationships", values, mode);
        }
        if let Some(cars) = &resolved.unlocked_cars {
            let values = cars.iter().map(|(id, v)| (*id, Value::Bool(*v)));
            Self::put_collection(root, "unlockedCars", values, mode);
        }

        Ok(Applied {
            text: stringify_loose(&doc)?,
            skipped: Vec::new(),
        })
    }
}

/// Minimal-diff edits on raw text.
///
/// Works inside `CITY.value` when that block can be located. Otherwise
/// scalars are replaced at their first occurrence anywhere in the text and
/// collections only where their block already exists; the rest is reported
/// as skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralWriter;

impl StructuralWriter {
    fn target_state(text: &str, root: Option<&BlockPosition>) -> TargetState {
        match root {
            Some(root) => {
                let inner = root.inner(text);
                TargetState {
                    is_survival_mode: get_scalar(inner, "isSurvivalMode")
                        .and_then(raw_as_bool)
                        .unwrap_or(false),
                    map_size: get_scalar(inner, "mapSize")
                        .and_then(raw_as_number)
                        .unwrap_or(DEFAULT_MAP_SIZE),
                }
            }
            None => TargetState {
                is_survival_mode: extract_bool_loose(text, "isSurvivalMode").unwrap_or(false),
                map_size: extract_number_loose(text, "mapSize").unwrap_or(DEFAULT_MAP_SIZE),
            },
        }
    }

    fn locate_root(text: &str) -> Result<BlockPosition, PatchError> {
        find_path_block(text, &ROOT_PATH).ok_or_else(|| {
            StructuralError::BlockNotFound {
                path: ROOT_PATH.join("."),
            }
            .into()
        })
    }

    /// Collections as (key, merged entries), read from the block currently
    /// inside `window`. In merge mode, existing entries whose value is not
    /// of the collection's type are carried over verbatim.
    fn collections(text: &str, window: Window, resolved: &ResolvedPatch) -> Vec<(&'static str, Vec<Entry>)> {
        let mode = resolved.collection_mode;
        let existing_inner = |key: &str| find_first_block(text, key, window).map(|b| b.inner(text));
        let existing_numbers =
            |key: &str| existing_inner(key).map(parse_numeric_entries).unwrap_or_default();
        let with_unparsed = |key: &str, rendered: Vec<Entry>| -> Vec<Entry> {
            if mode != CollectionMode::Merge {
                return rendered;
            }
            let mut all = existing_inner(key).map(parse_raw_entries).unwrap_or_default();
            all.extend(rendered);
            all.into_iter().collect()
        };

        let mut out = Vec::new();
        if let Some(resources) = &resolved.resources {
            let merged = merge(existing_numbers("resources"), resources, mode);
            out.push(("resources", with_unparsed("resources", numeric_entries(&merged))));
        }
        if let Some(relationships) = &resolved.relationships {
            let merged = merge(existing_numbers("relationships"), relationships, mode);
            out.push((
                "relationships",
                with_unparsed("relationships", numeric_entries(&merged)),
            ));
        }
        if let Some(cars) = &resolved.unlocked_cars {
            let existing = existing_inner("unlockedCars")
                .map(parse_boolean_entries)
                .unwrap_or_default();
            let merged = boolean_entries(&merge(existing, cars, mode));
            out.push(("unlockedCars", with_unparsed("unlockedCars", merged)));
        }
        out
    }

    fn apply_in_root(text: &str, resolved: &ResolvedPatch) -> Result<String, PatchError> {
        let root = Self::locate_root(text)?;
        let mut inner = root.inner(text).to_string();
        for (key, value) in &resolved.scalars {
            inner = set_scalar(&inner, key, &value.to_string(), &root.indent)?;
        }
        let range = root.inner_range();
        let mut out = Splice::capture(text, range.start, range.end, inner)?.apply(text)?;

        let root = Self::locate_root(&out)?;
        for (key, entries) in Self::collections(&out, root.window(), resolved) {
            let parent = Self::locate_root(&out)?;
            out = rebuild_collection(&out, &parent, key, &entries)?;
        }
        Ok(out)
    }

    fn apply_loose(text: &str, resolved: &ResolvedPatch) -> Result<Applied, PatchError> {
        let mut out = text.to_string();
        let mut skipped = Vec::new();
        let mut placed = 0usize;

        for (key, value) in &resolved.scalars {
            match replace_scalar_loose(&out, key, &value.to_string()) {
                Some(result) => {
                    out = result?;
                    placed += 1;
                }
                None => skipped.push((*key).to_string()),
            }
        }

        for (key, entries) in Self::collections(&out, Window::whole(&out), resolved) {
            match find_first_block(&out, key, Window::whole(&out)) {
                Some(block) => {
                    let range = block.inner_range();
                    let inner = build_inner(&entries, &block.indent);
                    out = Splice::capture(&out, range.start, range.end, inner)?.apply(&out)?;
                    placed += 1;
                }
                None => skipped.push(key.to_string()),
            }
        }

        if placed == 0 && !skipped.is_empty() {
            return Err(PatchError::Unplaceable {
                reason: "cannot locate root container".to_string(),
            });
        }
        Ok(Applied { text: out, skipped })
    }
}

impl SaveWriter for StructuralWriter {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn apply(&self, text: &str, patch: &Patch) -> Result<Applied, PatchError> {
        let root = find_path_block(text, &ROOT_PATH);
        let resolved = patch.resolve(Self::target_state(text, root.as_ref()));

        if resolved.is_empty() {
            return Ok(Applied {
                text: text.to_string(),
                skipped: Vec::new(),
            });
        }

        match root {
            Some(_) => Ok(Applied {
                text: Self::apply_in_root(text, &resolved)?,
                skipped: Vec::new(),
            }),
            None => Self::apply_loose(text, &resolved),
        }
    }
}
