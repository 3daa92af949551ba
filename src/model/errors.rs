use crate::loose::LooseParseError;
use crate::structural::StructuralError;
use thiserror::Error;

/// Why one writer could not apply a patch.
///
/// None of these escape `write_snapshot` directly: a strict failure hands
/// over to the structural writer, and only a structural failure is surfaced.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error(transparent)]
    Loose(#[from] LooseParseError),

    #[error("missing container object at {path}")]
    MissingContainer { path: String },

    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("cannot place patch: {reason}")]
    Unplaceable { reason: String },
}
