//! Lexical scanning over raw save text.
//!
//! All delimiters are ASCII, so scanning bytes of a UTF-8 string is safe:
//! continuation bytes of multi-byte characters never collide with them.

use crate::structural::errors::StructuralError;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lex {
    Code,
    Str { quote: u8, escaped: bool },
    LineComment,
    BlockComment,
}

/// Find the `}` matching the `{` at `open_index`.
///
/// String literals (single or double quoted, with backslash escapes) and
/// `//` / `/* */` comments are skipped.
pub fn scan_balanced_braces(text: &str, open_index: usize) -> Result<usize, StructuralError> {
    let bytes = text.as_bytes();
    if bytes.get(open_index) != Some(&b'{') {
        return Err(StructuralError::UnbalancedBraces { open_index });
    }

    let mut depth = 0usize;
    let mut state = Lex::Code;
    let mut i = open_index;

    while i < bytes.len() {
        let ch = bytes[i];
        match state {
            Lex::LineComment => {
                if ch == b'\n' {
                    state = Lex::Code;
                }
            }
            Lex::BlockComment => {
                if ch == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    state = Lex::Code;
                    i += 1;
                }
            }
            Lex::Str { quote, escaped } => {
                state = if escaped {
                    Lex::Str { quote, escaped: false }
                } else if ch == b'\\' {
                    Lex::Str { quote, escaped: true }
                } else if ch == quote {
                    Lex::Code
                } else {
                    state
                };
            }
            Lex::Code => match ch {
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    state = Lex::LineComment;
                    i += 1;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    state = Lex::BlockComment;
                    i += 1;
                }
                b'"' | b'\'' => {
                    state = Lex::Str {
                        quote: ch,
                        escaped: false,
                    };
                }
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }

    Err(StructuralError::UnbalancedBraces { open_index })
}

/// Byte ranges of `inner` where a top-level key can never start.
///
/// Covers nested `{...}` / `[...]` containers (whole span), comments (whole
/// span) and string literals (interior only, so a quoted key's opening quote
/// stays visible). Ranges are sorted and disjoint.
pub fn opaque_spans(inner: &str) -> Vec<Range<usize>> {
    let bytes = inner.as_bytes();
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut state = Lex::Code;
    let mut open_at = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        let ch = bytes[i];
        match state {
            Lex::LineComment => {
                if ch == b'\n' {
                    state = Lex::Code;
                    if depth == 0 {
                        spans.push(open_at..i);
                    }
                }
            }
            Lex::BlockComment => {
                if ch == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    state = Lex::Code;
                    i += 1;
                    if depth == 0 {
                        spans.push(open_at..i + 1);
                    }
                }
            }
            Lex::Str { quote, escaped } => {
                if escaped {
                    state = Lex::Str { quote, escaped: false };
                } else if ch == b'\\' {
                    state = Lex::Str { quote, escaped: true };
                } else if ch == quote {
                    state = Lex::Code;
                    if depth == 0 {
                        spans.push(open_at + 1..i);
                    }
                }
            }
            Lex::Code => match ch {
                b'/' if matches!(bytes.get(i + 1), Some(b'/') | Some(b'*')) => {
                    if depth == 0 {
                        open_at = i;
                    }
                    state = if bytes[i + 1] == b'/' {
                        Lex::LineComment
                    } else {
                        Lex::BlockComment
                    };
                    i += 1;
                }
                b'"' | b'\'' => {
                    if depth == 0 {
                        open_at = i;
                    }
                    state = Lex::Str {
                        quote: ch,
                        escaped: false,
                    };
                }
                b'{' | b'[' => {
                    if depth == 0 {
                        open_at = i;
                    }
                    depth += 1;
                }
                b'}' | b']' => {
                    if depth > 0 {
                        depth -= 1;
                        if depth == 0 {
                            spans.push(open_at..i + 1);
                        }
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }

    // Unterminated construct: everything after its opener is opaque.
    if depth > 0 || state != Lex::Code {
        spans.push(open_at..bytes.len());
    }

    spans
}

/// Whether `pos` falls inside any of `spans` (as returned by [`opaque_spans`]).
pub fn is_opaque(spans: &[Range<usize>], pos: usize) -> bool {
    let idx = spans.partition_point(|span| span.end <= pos);
    spans.get(idx).is_some_and(|span| span.start <= pos)
}

/// End (exclusive) of the quoted literal starting at `start`, if terminated.
pub fn string_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let quote = *bytes.get(start)?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let mut escaped = false;
    for (offset, &ch) in bytes[start + 1..].iter().enumerate() {
        if escaped {
            escaped = false;
        } else if ch == b'\\' {
            escaped = true;
        } else if ch == quote {
            return Some(start + 1 + offset + 1);
        } else if ch == b'\n' {
            return None;
        }
    }
    None
}
