use crate::structural::errors::StructuralError;
use crate::structural::pattern::get_or_compile;
use crate::structural::scanner::{is_opaque, opaque_spans, string_end};
use crate::structural::splice::Splice;
use regex::escape;

/// A top-level `key: value` occurrence inside a block's inner text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarMatch {
    pub key_start: usize,
    pub value_start: usize,
    pub value_end: usize,
    /// The value opens an object or array rather than a scalar
    pub container: bool,
}

/// Find `key` at depth 0 of `inner`, ignoring matches in nested objects,
/// arrays, strings and comments.
pub fn find_scalar(inner: &str, key: &str) -> Option<ScalarMatch> {
    let pattern = format!(r#"(?:^|[\s,{{])(["']?{}["']?)\s*:\s*"#, escape(key));
    let re = get_or_compile(&pattern);
    let spans = opaque_spans(inner);

    for caps in re.captures_iter(inner) {
        let (Some(whole), Some(key_match)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if is_opaque(&spans, key_match.start()) {
            continue;
        }

        return Some(measure_value(inner, key_match.start(), whole.end()));
    }
    None
}

fn measure_value(text: &str, key_start: usize, value_start: usize) -> ScalarMatch {
    let first = text.as_bytes().get(value_start).copied();
    if matches!(first, Some(b'{') | Some(b'[')) {
        return ScalarMatch {
            key_start,
            value_start,
            value_end: value_start,
            container: true,
        };
    }

    let value_end = match first {
        Some(b'"') | Some(b'\'') => string_end(text, value_start),
        _ => None,
    }
    .unwrap_or_else(|| {
        let stop = text[value_start..]
            .find([',', '\r', '\n', '}'])
            .map_or(text.len(), |i| value_start + i);
        value_start + text[value_start..stop].trim_end().len()
    });

    ScalarMatch {
        key_start,
        value_start,
        value_end,
        container: false,
    }
}

/// First scalar occurrence of `key` anywhere in `text`, at any depth.
///
/// Last resort for writes when the root container cannot be located.
pub fn find_scalar_loose(text: &str, key: &str) -> Option<ScalarMatch> {
    let pattern = format!(r#"(?:^|[^\w$])(["']?{}["']?)\s*:\s*"#, escape(key));
    let re = get_or_compile(&pattern);
    let found = re
        .captures_iter(text)
        .filter_map(|caps| {
            let key_match = caps.get(1)?;
            Some(measure_value(text, key_match.start(), caps.get(0)?.end()))
        })
        .find(|found| !found.container);
    found
}

/// Replace the first loose scalar occurrence of `key`; `None` when absent.
pub fn replace_scalar_loose(
    text: &str,
    key: &str,
    raw: &str,
) -> Option<Result<String, StructuralError>> {
    let found = find_scalar_loose(text, key)?;
    Some(Splice::capture(text, found.value_start, found.value_end, raw).and_then(|s| s.apply(text)))
}

/// Raw text of a top-level scalar, e.g. `"Town"`, `5000` or `true`.
pub fn get_scalar<'a>(inner: &'a str, key: &str) -> Option<&'a str> {
    let found = find_scalar(inner, key)?;
    if found.container {
        return None;
    }
    Some(&inner[found.value_start..found.value_end])
}

/// Replace a top-level scalar in place, or append `key: raw,` when absent.
///
/// `indent_base` is the indentation of the line that opens the block; new
/// entries follow the block's existing entry indentation when there is one.
/// A key whose value is an object or array is left untouched.
pub fn set_scalar(
    inner: &str,
    key: &str,
    raw: &str,
    indent_base: &str,
) -> Result<String, StructuralError> {
    match find_scalar(inner, key) {
        Some(found) if found.container => Ok(inner.to_string()),
        Some(found) => Splice::capture(inner, found.value_start, found.value_end, raw)?.apply(inner),
        None => Ok(append_entry(inner, &format!("{key}: {raw},"), indent_base)),
    }
}

/// Indentation for entries of a block: that of its first entry line, or
/// two spaces deeper than the block itself.
pub fn entry_indent(inner: &str, indent_base: &str) -> String {
    inner
        .split('\n')
        .skip(1)
        .find(|line| !line.trim().is_empty())
        .map(|line| {
            line.chars()
                .take_while(|c| *c == ' ' || *c == '\t')
                .collect::<String>()
        })
        .unwrap_or_else(|| format!("{indent_base}  "))
}

/// End of the code in `text` once trailing comments and whitespace are cut.
fn code_end(text: &str) -> usize {
    let mut end = text.trim_end().len();
    loop {
        let head = &text[..end];
        let comment = opaque_spans(head)
            .last()
            .filter(|span| span.end == head.len() && head[span.start..].starts_with('/'))
            .map(|span| span.start);
        match comment {
            Some(start) => end = head[..start].trim_end().len(),
            None => return end,
        }
    }
}

/// Append one entry line at the end of a block's inner text, adding a
/// separating comma after the previous entry if it lacks one and keeping
/// the whitespace that precedes the closing brace. The comma goes before a
/// trailing comment on that entry's line.
pub fn append_entry(inner: &str, entry: &str, indent_base: &str) -> String {
    let indent = entry_indent(inner, indent_base);
    let trimmed = inner.trim_end();
    let trailing = &inner[trimmed.len()..];
    let (code, comment) = trimmed.split_at(code_end(trimmed));

    let mut out = String::with_capacity(inner.len() + entry.len() + indent.len() + 4);
    out.push_str(code);
    if !code.trim_start().is_empty() && !code.ends_with(',') {
        out.push(',');
    }
    out.push_str(comment);
    out.push('\n');
    out.push_str(&indent);
    out.push_str(entry);
    if trailing.contains('\n') {
        out.push_str(trailing);
    } else {
        out.push('\n');
        out.push_str(indent_base);
    }
    out
}

/// Interpret raw scalar text as a number.
pub fn raw_as_number(raw: &str) -> Option<f64> {
    let raw = raw.trim().trim_matches(|c| c == '"' || c == '\'');
    raw.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub fn raw_as_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn whole_text_pattern(key: &str, value: &str) -> String {
    format!(r#"(?:^|[^\w$])["']?{}["']?\s*:\s*{value}"#, escape(key))
}

/// Best-effort string scalar anywhere in `text`; display use only.
pub fn extract_string_loose(text: &str, key: &str) -> Option<String> {
    let re = get_or_compile(&whole_text_pattern(key, r#""([^"\r\n]*)""#));
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Best-effort unquoted scalar anywhere in `text`, as raw text.
pub fn extract_bare_loose(text: &str, key: &str) -> Option<String> {
    let re = get_or_compile(&whole_text_pattern(key, r"([^,\s}\]]+)"));
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_matches(|c| c == '"' || c == '\'').to_string())
        .filter(|raw| !raw.is_empty())
}

/// Best-effort numeric scalar anywhere in `text`; display use only.
pub fn extract_number_loose(text: &str, key: &str) -> Option<f64> {
    let re = get_or_compile(&whole_text_pattern(
        key,
        r"(-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?)",
    ));
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

/// Best-effort boolean scalar anywhere in `text`; display use only.
pub fn extract_bool_loose(text: &str, key: &str) -> Option<bool> {
    let re = get_or_compile(&whole_text_pattern(key, "((?i:true|false))"));
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().eq_ignore_ascii_case("true"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INNER: &str = "\n      name: \"Old, Town\",\n      money: 5000,\n      stats: { money: 1 },\n      isSurvivalMode: false\n    ";

    #[test]
    fn test_get_scalar() {
        assert_eq!(get_scalar(INNER, "money"), Some("5000"));
        assert_eq!(get_scalar(INNER, "name"), Some("\"Old, Town\""));
        assert_eq!(get_scalar(INNER, "isSurvivalMode"), Some("false"));
        assert_eq!(get_scalar(INNER, "stats"), None);
        assert_eq!(get_scalar(INNER, "day"), None);
    }

    #[test]
    fn test_nested_key_is_ignored() {
        let inner = " stats: { level: 9 }, level: 2 ";
        assert_eq!(get_scalar(inner, "level"), Some("2"));
    }

    #[test]
    fn test_set_scalar_in_place() {
        let out = set_scalar(INNER, "money", "99", "    ").unwrap();
        assert!(out.contains("money: 99,"));
        assert!(out.contains("stats: { money: 1 }"));
        assert_eq!(out.len(), INNER.len() - 2);
    }

    #[test]
    fn test_set_scalar_replaces_whole_string() {
        let out = set_scalar(INNER, "name", "\"New\"", "    ").unwrap();
        assert!(out.contains("name: \"New\",\n"));
    }

    #[test]
    fn test_set_scalar_appends_missing_key() {
        let out = set_scalar(INNER, "day", "12", "    ").unwrap();
        assert!(out.contains("isSurvivalMode: false,\n      day: 12,\n    "));
        assert!(out.ends_with("\n    "));
    }

    #[test]
    fn test_set_scalar_on_empty_block() {
        let out = set_scalar("", "money", "1", "  ").unwrap();
        assert_eq!(out, "\n    money: 1,\n  ");
    }

    #[test]
    fn test_set_scalar_leaves_container_alone() {
        let out = set_scalar(INNER, "stats", "1", "    ").unwrap();
        assert_eq!(out, INNER);
    }

    #[test]
    fn test_whole_text_extraction() {
        let text = "{ CITY: { value: { FILE_ID: \"F1\", money: -12.5, maxLevel: true, level: 3, bestDay: 9 ";
        assert_eq!(extract_string_loose(text, "FILE_ID").as_deref(), Some("F1"));
        assert_eq!(extract_number_loose(text, "money"), Some(-12.5));
        assert_eq!(extract_bool_loose(text, "maxLevel"), Some(true));
        assert_eq!(extract_number_loose(text, "level"), Some(3.0));
        assert_eq!(extract_number_loose(text, "Day"), None);
        assert_eq!(extract_number_loose(text, "day"), None);
        assert_eq!(extract_bare_loose(text, "level").as_deref(), Some("3"));
        assert_eq!(extract_bare_loose("{ FILE_ID: abc-1 }", "FILE_ID").as_deref(), Some("abc-1"));
        assert_eq!(extract_bare_loose("{ FILE_ID: 'x' }", "FILE_ID").as_deref(), Some("x"));
    }

    #[test]
    fn test_bool_extraction_ignores_case() {
        let text = "{ unlockAll: True, maxLevel: FALSE, infiniteMoney: tRuE }";
        assert_eq!(extract_bool_loose(text, "unlockAll"), Some(true));
        assert_eq!(extract_bool_loose(text, "maxLevel"), Some(false));
        assert_eq!(extract_bool_loose(text, "infiniteMoney"), Some(true));
        assert_eq!(extract_bool_loose(text, "UnlockAll"), None);
    }

    #[test]
    fn test_append_after_trailing_comment() {
        let inner = "\n      money: 5 // starting cash\n    ";
        let out = set_scalar(inner, "day", "3", "    ").unwrap();
        assert_eq!(out, "\n      money: 5, // starting cash\n      day: 3,\n    ");
        assert_eq!(get_scalar(&out, "money"), Some("5"));
        assert_eq!(get_scalar(&out, "day"), Some("3"));
    }

    #[test]
    fn test_append_after_block_comment_and_url_string() {
        let inner = "\n      site: \"http://x\" /* home */\n    ";
        let out = set_scalar(inner, "day", "3", "    ").unwrap();
        assert!(out.starts_with("\n      site: \"http://x\", /* home */\n      day: 3,"));

        let inner = "\n      site: \"http://x\"\n    ";
        let out = set_scalar(inner, "day", "3", "    ").unwrap();
        assert!(out.starts_with("\n      site: \"http://x\",\n      day: 3,"));
    }

    #[test]
    fn test_replace_scalar_loose_in_deep_text() {
        let text = "{ A: { B: { C: { money: 1 } } } }";
        let out = replace_scalar_loose(text, "money", "2").unwrap().unwrap();
        assert_eq!(out, "{ A: { B: { C: { money: 2 } } } }");
    }

    #[test]
    fn test_replace_scalar_loose() {
        let text = "{ CITY: { val: { money: 5, name: 'a' } ";
        let out = replace_scalar_loose(text, "money", "10").unwrap().unwrap();
        assert_eq!(out, "{ CITY: { val: { money: 10, name: 'a' } ");
        assert!(replace_scalar_loose(text, "day", "1").is_none());
        assert!(replace_scalar_loose(text, "CITY", "1").is_none());
    }

    #[test]
    fn test_raw_interpretation() {
        assert_eq!(raw_as_number(" 40 "), Some(40.0));
        assert_eq!(raw_as_number("\"12\""), Some(12.0));
        assert_eq!(raw_as_number("abc"), None);
        assert_eq!(raw_as_bool("true"), Some(true));
        assert_eq!(raw_as_bool("1"), None);
    }
}
