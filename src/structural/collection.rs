//! Keyed collections (`resources`, `relationships`, `unlockedCars`): integer
//! ids mapped to numbers or booleans, read with a permissive pattern and
//! rebuilt wholesale.

use crate::loose::format_number;
use crate::structural::block::{find_first_block, BlockPosition, Window};
use crate::structural::errors::StructuralError;
use crate::structural::scalar::append_entry;
use crate::structural::splice::Splice;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn numeric_entry() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"["']?(\d+)["']?\s*:\s*(-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?)"#)
            .expect("static regex")
    })
}

fn raw_entry() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"["']?(\d+)["']?\s*:\s*("(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|[^,\r\n{}\[\]]+)"#)
            .expect("static regex")
    })
}

fn boolean_entry() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"["']?(\d+)["']?\s*:\s*(true|false)"#).expect("static regex"))
}

/// All `id: number` pairs in a block's inner text. Later duplicates win.
pub fn parse_numeric_entries(inner: &str) -> BTreeMap<i64, f64> {
    numeric_entry()
        .captures_iter(inner)
        .filter_map(|caps| {
            let id = caps.get(1)?.as_str().parse::<i64>().ok()?;
            let value = caps.get(2)?.as_str().parse::<f64>().ok()?;
            value.is_finite().then_some((id, value))
        })
        .collect()
}

/// All `id: true|false` pairs in a block's inner text.
pub fn parse_boolean_entries(inner: &str) -> BTreeMap<i64, bool> {
    boolean_entry()
        .captures_iter(inner)
        .filter_map(|caps| {
            let id = caps.get(1)?.as_str().parse::<i64>().ok()?;
            Some((id, caps.get(2)?.as_str() == "true"))
        })
        .collect()
}

/// Every `id: value` pair as raw value text, whatever the value's shape.
pub fn parse_raw_entries(inner: &str) -> BTreeMap<i64, String> {
    raw_entry()
        .captures_iter(inner)
        .filter_map(|caps| {
            let id = caps.get(1)?.as_str().parse::<i64>().ok()?;
            let raw = caps.get(2)?.as_str().trim_end();
            (!raw.is_empty()).then(|| (id, raw.to_string()))
        })
        .collect()
}

/// A rendered collection entry: id plus its raw value text.
pub type Entry = (i64, String);

pub fn numeric_entries(map: &BTreeMap<i64, f64>) -> Vec<Entry> {
    map.iter().map(|(id, v)| (*id, format_number(*v))).collect()
}

pub fn boolean_entries(map: &BTreeMap<i64, bool>) -> Vec<Entry> {
    map.iter().map(|(id, v)| (*id, v.to_string())).collect()
}

/// Inner text for a collection block: one `id: value,` line per entry in
/// ascending id order, two spaces deeper than `indent`.
pub fn build_inner(entries: &[Entry], indent: &str) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let mut sorted: Vec<&Entry> = entries.iter().collect();
    sorted.sort_by_key(|(id, _)| *id);

    let mut out = String::from("\n");
    for (id, value) in sorted {
        out.push_str(indent);
        out.push_str("  ");
        out.push_str(&id.to_string());
        out.push_str(": ");
        out.push_str(value);
        out.push_str(",\n");
    }
    out.push_str(indent);
    out
}

/// Rebuild the `key` block inside `parent` from `entries`.
///
/// When the block is missing a new one is synthesized at the end of the
/// parent's inner text.
pub fn rebuild_collection(
    text: &str,
    parent: &BlockPosition,
    key: &str,
    entries: &[Entry],
) -> Result<String, StructuralError> {
    let window = Window {
        start: parent.brace_start + 1,
        end: parent.brace_end,
    };

    if let Some(block) = find_first_block(text, key, window) {
        let new_inner = build_inner(entries, &block.indent);
        let range = block.inner_range();
        return Splice::capture(text, range.start, range.end, new_inner)?.apply(text);
    }

    let parent_inner = parent.inner(text);
    let entry_indent = crate::structural::scalar::entry_indent(parent_inner, &parent.indent);
    let entry = format!("{key}: {{{}}},", build_inner(entries, &entry_indent));
    let new_parent_inner = append_entry(parent_inner, &entry, &parent.indent);
    let range = parent.inner_range();
    Splice::capture(text, range.start, range.end, new_parent_inner)?.apply(text)
}

/// Read the `key` collection inside `window`, if the block can be located.
pub fn read_numeric_block(text: &str, key: &str, window: Window) -> Option<BTreeMap<i64, f64>> {
    find_first_block(text, key, window).map(|block| parse_numeric_entries(block.inner(text)))
}

pub fn read_boolean_block(text: &str, key: &str, window: Window) -> Option<BTreeMap<i64, bool>> {
    find_first_block(text, key, window).map(|block| parse_boolean_entries(block.inner(text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structural::block::find_path_block;

    const SAVE: &str = "{\n  CITY: {\n    value: {\n      money: 5,\n      resources: {\n        4: 10,\n        \"1\": 2.5,\n      },\n      tail: 1\n    }\n  }\n}";

    #[test]
    fn test_parse_numeric_entries_mixed_quoting() {
        let parent = find_path_block(SAVE, &["CITY", "value"]).unwrap();
        let map = read_numeric_block(SAVE, "resources", parent.window()).unwrap();
        assert_eq!(map.into_iter().collect::<Vec<_>>(), vec![(1, 2.5), (4, 10.0)]);
    }

    #[test]
    fn test_parse_boolean_entries() {
        let map = parse_boolean_entries(" 3: true, 1: false, x: true ");
        assert_eq!(map.into_iter().collect::<Vec<_>>(), vec![(1, false), (3, true)]);
    }

    #[test]
    fn test_rebuild_existing_block_sorted() {
        let parent = find_path_block(SAVE, &["CITY", "value"]).unwrap();
        let entries = vec![(7, "3".to_string()), (0, "1".to_string())];
        let out = rebuild_collection(SAVE, &parent, "resources", &entries).unwrap();
        assert!(out.contains("      resources: {\n        0: 1,\n        7: 3,\n      },\n      tail: 1"));
        assert!(!out.contains("4: 10"));
    }

    #[test]
    fn test_rebuild_synthesizes_missing_block() {
        let parent = find_path_block(SAVE, &["CITY", "value"]).unwrap();
        let entries = vec![(2, "true".to_string())];
        let out = rebuild_collection(SAVE, &parent, "unlockedCars", &entries).unwrap();
        assert!(out.contains(
            "      tail: 1,\n      unlockedCars: {\n        2: true,\n      },\n    }\n  }\n}"
        ));
        assert!(crate::loose::parse_loose(&out).is_ok());
    }

    #[test]
    fn test_parse_raw_entries_keeps_odd_values() {
        let map = parse_raw_entries("\n  1: 2,\n  7: \"10, or so\",\n  '8': null,\n  9: -1.5e2\n");
        assert_eq!(map.get(&1).map(String::as_str), Some("2"));
        assert_eq!(map.get(&7).map(String::as_str), Some("\"10, or so\""));
        assert_eq!(map.get(&8).map(String::as_str), Some("null"));
        assert_eq!(map.get(&9).map(String::as_str), Some("-1.5e2"));
        assert!(parse_numeric_entries("7: \"10\", 8: null").is_empty());
    }

    #[test]
    fn test_build_inner_empty() {
        assert_eq!(build_inner(&[], "  "), "");
    }
}
