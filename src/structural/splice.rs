use crate::structural::errors::StructuralError;
use xxhash_rust::xxh3::xxh3_64;

/// The structural patcher's only mutation primitive: a verified byte-span
/// replacement on an in-memory text.
///
/// Every located edit (scalar rewrite, collection rebuild, block insertion)
/// compiles down to one of these, so a stale offset can never silently
/// clobber unrelated bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Splice does nothing until apply() is called"]
pub struct Splice {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// Replacement for [byte_start, byte_end)
    pub new_text: String,
    /// What the span must currently hold
    pub expected_before: Verification,
}

/// Verification strategy for the replaced span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text, for whole collection blocks
    Hash(u64),
}

impl Verification {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Verification::ExactMatch(expected) => text == expected,
            Verification::Hash(expected) => xxh3_64(text.as_bytes()) == *expected,
        }
    }

    /// Hash anything over 1KB; large resource tables are common.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            Verification::Hash(xxh3_64(text.as_bytes()))
        } else {
            Verification::ExactMatch(text.to_string())
        }
    }
}

impl Splice {
    /// Build a splice over `text[byte_start..byte_end]`, capturing the current
    /// contents as the expected before-text.
    pub fn capture(
        text: &str,
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
    ) -> Result<Self, StructuralError> {
        let before = span(text, byte_start, byte_end)?;
        Ok(Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: Verification::from_text(before),
        })
    }

    /// Zero-width insertion at `at`.
    pub fn insert(at: usize, new_text: impl Into<String>) -> Self {
        Self {
            byte_start: at,
            byte_end: at,
            new_text: new_text.into(),
            expected_before: Verification::ExactMatch(String::new()),
        }
    }

    /// Apply to `text`, returning the new text.
    pub fn apply(&self, text: &str) -> Result<String, StructuralError> {
        let current = span(text, self.byte_start, self.byte_end)?;

        if !self.expected_before.matches(current) {
            return Err(StructuralError::BeforeTextMismatch {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                expected: format!("{:?}", self.expected_before),
                found: current.to_string(),
            });
        }

        let mut out = String::with_capacity(
            text.len() + self.new_text.len() - (self.byte_end - self.byte_start),
        );
        out.push_str(&text[..self.byte_start]);
        out.push_str(&self.new_text);
        out.push_str(&text[self.byte_end..]);
        Ok(out)
    }
}

fn span(text: &str, byte_start: usize, byte_end: usize) -> Result<&str, StructuralError> {
    if byte_start > byte_end
        || byte_end > text.len()
        || !text.is_char_boundary(byte_start)
        || !text.is_char_boundary(byte_end)
    {
        return Err(StructuralError::InvalidRange {
            byte_start,
            byte_end,
            text_len: text.len(),
        });
    }
    Ok(&text[byte_start..byte_end])
}
