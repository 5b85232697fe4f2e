//! Type-tag normalization
//!
//! Source files carry lowercase type tags (`{"b": ...}`) while the store
//! requires the canonical uppercase ones (`{"B": ...}`).
//!
//! [`NormalizationMode::Literal`] is a blind, case-sensitive text
//! substitution of `{"<tag>":` applied before parsing. Any object whose first
//! key is a lowercase tag name is rewritten, including an attribute or map
//! entry that merely happens to be called `s`, `n`, `m` and so on. This is
//! the default.
//!
//! [`NormalizationMode::Structural`] parses the line and rewrites only tags
//! at typed-wrapper positions, recursing through lists and maps. Attribute
//! names and string payloads are never touched, so some lines load
//! differently than in literal mode.

use crate::error::RecordError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Lowercase tag → canonical tag, in substitution order
pub const TAG_REWRITES: [(&str, &str); 10] = [
    ("b", "B"),
    ("bs", "BS"),
    ("bool", "BOOL"),
    ("s", "S"),
    ("ss", "SS"),
    ("n", "N"),
    ("ns", "NS"),
    ("null", "NULL"),
    ("l", "L"),
    ("m", "M"),
];

const LITERAL_REWRITES: [(&str, &str); 10] = [
    (r#"{"b":"#, r#"{"B":"#),
    (r#"{"bs":"#, r#"{"BS":"#),
    (r#"{"bool":"#, r#"{"BOOL":"#),
    (r#"{"s":"#, r#"{"S":"#),
    (r#"{"ss":"#, r#"{"SS":"#),
    (r#"{"n":"#, r#"{"N":"#),
    (r#"{"ns":"#, r#"{"NS":"#),
    (r#"{"null":"#, r#"{"NULL":"#),
    (r#"{"l":"#, r#"{"L":"#),
    (r#"{"m":"#, r#"{"M":"#),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationMode {
    /// Blind `{"tag":` text substitution before parsing
    #[default]
    Literal,
    /// Rewrite tags only at typed-wrapper positions
    Structural,
}

impl std::str::FromStr for NormalizationMode {
    type Err = kvload_common::KvloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "literal" => Ok(NormalizationMode::Literal),
            "structural" => Ok(NormalizationMode::Structural),
            _ => Err(kvload_common::KvloadError::parse("normalization mode", s)),
        }
    }
}

impl std::fmt::Display for NormalizationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormalizationMode::Literal => write!(f, "literal"),
            NormalizationMode::Structural => write!(f, "structural"),
        }
    }
}

/// Normalize one raw line according to `mode`
pub fn normalize(line: &str, mode: NormalizationMode) -> Result<Cow<'_, str>, RecordError> {
    match mode {
        NormalizationMode::Literal => Ok(normalize_literal(line)),
        NormalizationMode::Structural => normalize_structural(line).map(Cow::Owned),
    }
}

/// Literal `{"<tag>":` → `{"<TAG>":` substitution.
///
/// Borrows the input when no tag needs rewriting.
pub fn normalize_literal(line: &str) -> Cow<'_, str> {
    let mut out = Cow::Borrowed(line);
    for (from, to) in LITERAL_REWRITES {
        if out.contains(from) {
            out = Cow::Owned(out.replace(from, to));
        }
    }
    out
}

/// Parse, rewrite wrapper tags, and serialize back to a line
pub fn normalize_structural(line: &str) -> Result<String, RecordError> {
    let mut value: Value = serde_json::from_str(line).map_err(RecordError::malformed)?;
    let Value::Object(item) = &mut value else {
        return Err(RecordError::malformed("record is not a JSON object"));
    };
    normalize_item(item);
    serde_json::to_string(&value).map_err(RecordError::malformed)
}

fn canonical_tag(tag: &str) -> Option<&'static str> {
    TAG_REWRITES
        .iter()
        .find(|(lower, _)| *lower == tag)
        .map(|(_, upper)| *upper)
}

fn normalize_item(item: &mut Map<String, Value>) {
    for value in item.values_mut() {
        normalize_wrapper(value);
    }
}

fn normalize_wrapper(value: &mut Value) {
    let Value::Object(wrapper) = value else {
        return;
    };
    if wrapper.len() != 1 {
        return;
    }
    let Some(tag) = wrapper.keys().next().cloned() else {
        return;
    };
    let Some(mut inner) = wrapper.remove(&tag) else {
        return;
    };

    let tag = canonical_tag(&tag).map(str::to_string).unwrap_or(tag);
    match (tag.as_str(), &mut inner) {
        ("L", Value::Array(elements)) => elements.iter_mut().for_each(normalize_wrapper),
        ("M", Value::Object(nested)) => normalize_item(nested),
        _ => {},
    }
    wrapper.insert(tag, inner);
}
