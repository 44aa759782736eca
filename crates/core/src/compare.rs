//! Field comparison rules.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;
use serde_json::Value;
use thiserror::Error;

use crate::expectation::{Check, Scalar};

/// Result of applying one [`Check`] to one field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    Match,
    Mismatch { expected: String, actual: String },
}

impl Comparison {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }

    fn mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::Mismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Errors decoding a JSON document field.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("URL-decoded document is not valid UTF-8")]
    InvalidUtf8,
    #[error("not a JSON document: {0}")]
    NotJson(#[from] serde_json::Error),
}

/// Decode a policy-style document.
///
/// Plain JSON text is parsed directly. Otherwise the text is treated as
/// URL-encoded (IAM returns `%7B%22Version%22...`): `+` becomes a space,
/// percent escapes are decoded, and the result is parsed.
pub fn decode_json_document(raw: &str) -> Result<Value, DecodeError> {
    if let Ok(value) = serde_json::from_str(raw) {
        return Ok(value);
    }
    let unplussed = raw.replace('+', " ");
    let decoded = percent_decode_str(&unplussed)
        .decode_utf8()
        .map_err(|_| DecodeError::InvalidUtf8)?;
    Ok(serde_json::from_str(&decoded)?)
}

/// Render a value for diagnostics: strings without quotes, everything else as JSON.
pub fn render(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}

/// Apply `check` to the resolved field value `actual`.
pub fn compare(check: &Check, actual: &Value) -> Comparison {
    match check {
        Check::Equals(expected) => compare_scalar(expected, actual),
        Check::Unordered(expected) => compare_list(expected, actual, false),
        Check::Ordered(expected) => compare_list(expected, actual, true),
        Check::Json(expected) => compare_json(expected, actual),
        Check::Contains(needle) => {
            if contains(actual, needle) {
                Comparison::Match
            } else {
                Comparison::mismatch(format!("contains {needle:?}"), render(actual))
            }
        }
        Check::ContainsAll(needles) => {
            let missing: Vec<&String> = needles.iter().filter(|n| !contains(actual, n)).collect();
            if missing.is_empty() {
                Comparison::Match
            } else {
                Comparison::mismatch(format!("contains all of {needles:?} (missing {missing:?})"), render(actual))
            }
        }
        Check::Length(expected) => match length(actual) {
            Some(len) if len == *expected => Comparison::Match,
            Some(len) => Comparison::mismatch(format!("length {expected}"), format!("length {len}")),
            None => Comparison::mismatch(format!("length {expected}"), format!("not a collection: {}", render(actual))),
        },
        Check::NotEmpty => {
            if is_empty(actual) {
                Comparison::mismatch("non-empty value", render(actual))
            } else {
                Comparison::Match
            }
        }
    }
}

fn compare_scalar(expected: &Scalar, actual: &Value) -> Comparison {
    let matched = match (expected, actual) {
        (Scalar::Bool(e), Value::Bool(a)) => e == a,
        (Scalar::Int(e), Value::Number(a)) => a.as_i64() == Some(*e),
        (Scalar::Str(e), Value::String(a)) => e == a,
        _ => false,
    };
    if matched {
        Comparison::Match
    } else {
        Comparison::mismatch(expected.to_string(), render(actual))
    }
}

fn string_items(actual: &Value) -> Option<Vec<String>> {
    actual
        .as_array()
        .map(|items| items.iter().map(|item| render(item).into_owned()).collect())
}

fn compare_list(expected: &[String], actual: &Value, ordered: bool) -> Comparison {
    let Some(mut actual_items) = string_items(actual) else {
        return Comparison::mismatch(format!("{expected:?}"), format!("not a list: {}", render(actual)));
    };
    let matched = if ordered {
        actual_items == expected
    } else {
        let mut expected_sorted = expected.to_vec();
        expected_sorted.sort();
        actual_items.sort();
        actual_items == expected_sorted
    };
    if matched {
        Comparison::Match
    } else {
        // Report the actual list in its original order.
        let original = string_items(actual).unwrap_or_default();
        Comparison::mismatch(format!("{expected:?}"), format!("{original:?}"))
    }
}

fn compare_json(expected: &Value, actual: &Value) -> Comparison {
    let decoded = match actual {
        Value::String(raw) => match decode_json_document(raw) {
            Ok(value) => value,
            Err(e) => return Comparison::mismatch(expected.to_string(), format!("{raw} ({e})")),
        },
        other => other.clone(),
    };
    if &decoded == expected {
        Comparison::Match
    } else {
        Comparison::mismatch(expected.to_string(), decoded.to_string())
    }
}

/// Substring for strings, membership for arrays, substring of the
/// serialized form for anything else.
fn contains(actual: &Value, needle: &str) -> bool {
    match actual {
        Value::String(s) => s.contains(needle),
        Value::Array(items) => items.iter().any(|item| render(item) == needle),
        other => other.to_string().contains(needle),
    }
}

fn length(actual: &Value) -> Option<usize> {
    match actual {
        Value::Array(items) => Some(items.len()),
        Value::Object(map) => Some(map.len()),
        _ => None,
    }
}

fn is_empty(actual: &Value) -> bool {
    match actual {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
