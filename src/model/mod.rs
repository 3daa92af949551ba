//! Typed save model: read projection, sparse patches and the two writers.

pub mod document;
pub mod errors;
pub mod patch;
pub mod snapshot;
pub mod writer;

pub use document::{
    apply_patch, read_cars, read_relationships, read_resources, read_snapshot, write_cars,
    write_relationships, write_resources, write_snapshot, PatchedText, SaveDocument, WriteOutcome,
};
pub use errors::PatchError;
pub use patch::{
    effective_map_size, CarUnlock, CollectionMode, Patch, RelationshipLevel, ResolvedPatch,
    ResourceAmount, TargetState,
};
pub use snapshot::{lookup_file_id, project_strict, project_tolerant, snapshot_from_text, Snapshot};
pub use writer::{Applied, SaveWriter, StrictWriter, StructuralWriter};
