use crate::structural::pattern::get_or_compile;
use crate::structural::scanner::scan_balanced_braces;
use regex::escape;

/// One `{...}` object literal located in raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPosition {
    /// Offset of the key (including an opening quote, if any)
    pub key_start: usize,
    /// Offset of the opening `{`
    pub brace_start: usize,
    /// Offset of the matching `}`
    pub brace_end: usize,
    /// Leading whitespace of the line holding the key
    pub indent: String,
    /// Whether a `,` follows the closing brace (whitespace aside)
    pub trailing_comma: bool,
}

impl BlockPosition {
    pub fn inner_range(&self) -> std::ops::Range<usize> {
        self.brace_start + 1..self.brace_end
    }

    pub fn inner<'a>(&self, text: &'a str) -> &'a str {
        &text[self.inner_range()]
    }

    /// The search window covering this block, braces included.
    pub fn window(&self) -> Window {
        Window {
            start: self.brace_start,
            end: self.brace_end + 1,
        }
    }
}

/// Half-open byte range that bounds a key search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn whole(text: &str) -> Self {
        Self {
            start: 0,
            end: text.len(),
        }
    }
}

/// Locate the first balanced `key: {` block inside `window`.
///
/// The key may be bare or quoted. Candidates whose braces never balance are
/// skipped and the search continues.
pub fn find_first_block(text: &str, key: &str, window: Window) -> Option<BlockPosition> {
    let end = window.end.min(text.len());
    let start = window.start.min(end);
    let slice = text.get(start..end)?;

    let pattern = format!(r#"(?:^|[{{,\s])(["']?{}["']?)\s*:\s*\{{"#, escape(key));
    let re = get_or_compile(&pattern);

    for caps in re.captures_iter(slice) {
        let (Some(whole), Some(key_match)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let key_start = start + key_match.start();
        let brace_start = start + whole.end() - 1;

        let Ok(brace_end) = scan_balanced_braces(text, brace_start) else {
            continue;
        };
        if brace_end >= end {
            continue;
        }

        let line_start = text[..key_start].rfind('\n').map_or(0, |i| i + 1);
        let indent: String = text[line_start..key_start]
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect();
        let trailing_comma = text[brace_end + 1..].trim_start().starts_with(',');

        return Some(BlockPosition {
            key_start,
            brace_start,
            brace_end,
            indent,
            trailing_comma,
        });
    }
    None
}

/// Resolve nested keys by narrowing the window to each found block.
///
/// `None` when any segment is absent; callers treat that as "insert fresh".
pub fn find_path_block(text: &str, path: &[&str]) -> Option<BlockPosition> {
    let mut window = Window::whole(text);
    let mut found = None;
    for key in path {
        let block = find_first_block(text, key, window)?;
        // Search strictly inside the braces so the block can't match itself.
        window = Window {
            start: block.brace_start + 1,
            end: block.brace_end,
        };
        found = Some(block);
    }
    found
}
