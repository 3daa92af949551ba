//! Minimal-diff patching of raw save text.
//!
//! Used when the loose parser rejects a file: blocks are located by key path
//! with a string- and comment-aware brace scanner, and edits are applied as
//! verified byte-span splices so bytes the editor doesn't understand are
//! never re-serialized.

pub mod block;
pub mod collection;
pub mod errors;
pub mod pattern;
pub mod scalar;
pub mod scanner;
pub mod splice;

pub use block::{find_first_block, find_path_block, BlockPosition, Window};
pub use collection::{
    boolean_entries, build_inner, numeric_entries, parse_boolean_entries, parse_numeric_entries,
    parse_raw_entries, read_boolean_block, read_numeric_block, rebuild_collection, Entry,
};
pub use errors::StructuralError;
pub use scalar::{
    append_entry, extract_bare_loose, extract_bool_loose, extract_number_loose,
    extract_string_loose, find_scalar, find_scalar_loose, get_scalar, raw_as_bool, raw_as_number,
    replace_scalar_loose, set_scalar, ScalarMatch,
};
pub use scanner::{opaque_spans, scan_balanced_braces};
pub use splice::{Splice, Verification};
