//! Loose-JSON parser for the save body.
//!
//! The host writes a JSON5-like dialect that additionally uses bare integer
//! object keys (`{ 8: 1 }`). Those keys are quoted before handing the text to
//! a JSON5 grammar, and unquoted again on the way out because the host treats
//! `"8":` and `8:` as different shapes.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

/// The tagged value tree produced by [`parse_loose`].
///
/// Object key order is preserved so unknown fields survive a rewrite in
/// their original position.
pub type LooseValue = Value;
pub type LooseMap = serde_json::Map<String, Value>;

#[derive(Error, Debug)]
pub enum LooseParseError {
    #[error("loose JSON syntax error: {message}")]
    Syntax { message: String },

    #[error("failed to serialize value: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn bare_key_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([\[{,]\s*)(\d+)\s*:").expect("static regex"))
}

fn quoted_key_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""(\d+)"\s*:"#).expect("static regex"))
}

/// Strip a leading BOM and quote every bare integer key.
pub fn quote_numeric_keys(text: &str) -> String {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    bare_key_pattern()
        .replace_all(text, "${1}\"${2}\":")
        .into_owned()
}

/// Parse loose save text into a [`LooseValue`].
///
/// A failure here is the expected trigger for the structural fallback path.
pub fn parse_loose(text: &str) -> Result<LooseValue, LooseParseError> {
    let normalized = quote_numeric_keys(text);
    json5::from_str::<Value>(&normalized).map_err(|err| LooseParseError::Syntax {
        message: err.to_string(),
    })
}

/// Pretty-print a value in the host's own convention: two-space indent and
/// bare integer keys.
pub fn stringify_loose(value: &LooseValue) -> Result<String, LooseParseError> {
    let pretty = serde_json::to_string_pretty(value)?;
    Ok(quoted_key_pattern()
        .replace_all(&pretty, "${1}:")
        .into_owned())
}

/// Build a JSON number, keeping integral values integral.
///
/// `serde_json` renders every `f64` with a fractional part (`1000.0`), which
/// the host would read back as a different type. Non-finite input becomes 0.
pub fn number_value(n: f64) -> Value {
    if !n.is_finite() {
        return Value::from(0);
    }
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or_else(|| Value::from(0))
    }
}

/// Coerce any loose value to a finite number, or `fallback`.
pub fn as_number(value: Option<&Value>, fallback: f64) -> f64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    n.filter(|n| n.is_finite()).unwrap_or(fallback)
}

/// JavaScript-style truthiness, used for the save's boolean flags.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Render a scalar the way it would appear in the save text.
pub fn format_number(n: f64) -> String {
    number_value(n).to_string()
}
