//! Shared fixtures for integration tests.

#![allow(dead_code)]

use save_patcher::codec::encode;
use std::fs;
use std::path::{Path, PathBuf};

/// A root city save in the host's formatting, with bare integer keys.
pub const ROOT_SAVE: &str = r#"{
  "CITY": {
    "__type": "City,Assembly-CSharp",
    "value": {
      "FILE_ID": "FILE123",
      "name": "Harbor",
      "parentCity": "",
      "difficulty": 2,
      "mapSize": 48,
      "day": 14,
      "dayProgress": 0.5,
      "money": 1200,
      "researchPoints": 30,
      "level": 4,
      "isSurvivalMode": false,
      "unlockAll": false,
      "infiniteMoney": false,
      "maxLevel": false,
      "resources": {
        0: 10,
        3: 2.5
      },
      "relationships": {
        1: 2
      },
      "unlockedCars": {
        0: true
      }
    }
  }
}"#;

/// A region save belonging to `FILE123`.
pub const CHILD_SAVE: &str = r#"{
  "CITY": {
    "value": {
      "name": "Harbor Docks",
      "parentCity": "FILE123",
      "money": 40
    }
  }
}"#;

/// Same root save with trailing garbage; strict parsing rejects it.
pub fn broken_save() -> String {
    format!("{ROOT_SAVE} @@")
}

pub fn write_save(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, encode(text, None, &path).unwrap()).unwrap();
    path
}

pub fn read_text(path: &Path) -> String {
    save_patcher::codec::decode(&fs::read(path).unwrap())
        .unwrap()
        .text
}
