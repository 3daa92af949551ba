use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("unbalanced braces from index {open_index}")]
    UnbalancedBraces { open_index: usize },

    #[error("block not found: {path}")]
    BlockNotFound { path: String },

    #[error("before-text verification failed at {byte_start}: expected {expected}, found {found:?}")]
    BeforeTextMismatch {
        byte_start: usize,
        byte_end: usize,
        expected: String,
        found: String,
    },

    #[error("invalid byte range: [{byte_start}, {byte_end}) in text of length {text_len}")]
    InvalidRange {
        byte_start: usize,
        byte_end: usize,
        text_len: usize,
    },
}
