//! Save Patcher: tolerant, round-trip-safe editing of gzip-wrapped
//! loose-JSON game saves.
//!
//! # Architecture
//!
//! Reads and writes go through two tiers. The strict tier decodes the
//! container, parses the body with a JSON5 grammar extended for bare integer
//! keys, and re-serializes in the host's own style. When the body does not
//! parse, the structural tier locates balanced `{...}` blocks in the raw text
//! and applies verified byte-span [`Splice`]s, so bytes the editor doesn't
//! understand are never rewritten.
//!
//! # Safety
//!
//! - Every write is preceded by a timestamped backup with bounded retention
//! - Atomic file writes (tempfile + fsync + rename)
//! - Splices verify their expected before-text before applying
//! - Reads never fail: undecodable or malformed saves yield a tolerant
//!   [`Snapshot`] carrying the error
//!
//! # Example
//!
//! ```no_run
//! use save_patcher::{write_snapshot, BackupPolicy, Patch};
//! use std::path::Path;
//!
//! let patch = Patch {
//!     money: Some(50_000.0),
//!     ..Default::default()
//! };
//!
//! match write_snapshot(Path::new("saves/city_auto_1.es3"), &patch, &BackupPolicy::default()) {
//!     Ok(outcome) => println!("written (fallback: {})", outcome.fallback),
//!     Err(e) => eprintln!("write failed: {}", e),
//! }
//! ```

pub mod backup;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod editor;
pub mod error;
pub mod globals;
pub mod loose;
pub mod model;
pub mod scan;
pub mod store;
pub mod structural;
pub mod watch;

// Re-exports
pub use backup::{list_backups, restore_backup, rotate, BackupEntry, BackupPolicy};
pub use codec::{decode, encode, CodecError, Decoded};
pub use config::{load_from_path, load_from_str, ConfigError, EditorConfig};
pub use editor::SaveEditor;
pub use error::SaveError;
pub use globals::{EditableGlobals, GlobalSettingsPatch, GlobalSettingsStore, GlobalSettingsView};
pub use loose::{parse_loose, stringify_loose, LooseParseError, LooseValue};
pub use model::{
    read_snapshot, write_snapshot, CarUnlock, Patch, PatchError, RelationshipLevel,
    ResourceAmount, SaveDocument, Snapshot, WriteOutcome,
};
pub use scan::{group_saves, scan, scan_with_issues, SaveFile, SaveGroup, SaveTag, ScanCache, ScanIssue};
pub use store::delete_file as delete_save;
pub use structural::{BlockPosition, Splice, StructuralError};
pub use watch::{ChangeHub, SaveWatcher, Subscription};
