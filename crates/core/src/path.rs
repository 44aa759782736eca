//! Field paths into a resource description.
//!
//! A path is a dot-separated list of keys, each optionally followed by one or
//! more bracket suffixes: `Routes[0].State`, `Tags[*].Value`,
//! `ServerSideEncryptionConfiguration.Rules[0].ApplyServerSideEncryptionByDefault.SSEAlgorithm`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
    /// Fan out over every element of an array.
    Wildcard,
}

/// Parsed, printable path into a JSON resource description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FieldPath {
    raw: String,
    segments: Vec<Segment>,
}

impl FieldPath {
    /// Parse a path. Parsing never fails: bracket content that is neither a
    /// number nor `*` is kept as part of a literal key.
    pub fn parse(raw: &str) -> Self {
        let mut segments = Vec::new();
        for part in raw.split('.').filter(|p| !p.is_empty()) {
            parse_part(part, &mut segments);
        }
        Self {
            raw: raw.to_owned(),
            segments,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// `true` if the path fans out over an array somewhere.
    pub fn has_wildcard(&self) -> bool {
        self.segments.contains(&Segment::Wildcard)
    }

    /// Resolve the path against `root`.
    ///
    /// Returns `None` when any step is missing or `null`. A wildcard step
    /// yields an array of the addressed values, skipping elements that lack
    /// the remainder of the path.
    pub fn resolve(&self, root: &Value) -> Option<Value> {
        resolve_segments(root, &self.segments)
    }
}

fn parse_part(part: &str, segments: &mut Vec<Segment>) {
    let Some(open) = part.find('[') else {
        segments.push(Segment::Key(part.to_owned()));
        return;
    };

    let mut suffixes = Vec::new();
    let mut rest = &part[open..];
    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(close) = stripped.find(']') else {
            break;
        };
        let inner = &stripped[..close];
        let segment = if inner == "*" {
            Segment::Wildcard
        } else if let Ok(index) = inner.parse::<usize>() {
            Segment::Index(index)
        } else {
            break;
        };
        suffixes.push(segment);
        rest = &stripped[close + 1..];
    }

    if !rest.is_empty() {
        // Unparseable suffix: treat the whole part as a literal key.
        segments.push(Segment::Key(part.to_owned()));
        return;
    }

    let key = &part[..open];
    if !key.is_empty() {
        segments.push(Segment::Key(key.to_owned()));
    }
    segments.extend(suffixes);
}

fn resolve_segments(current: &Value, segments: &[Segment]) -> Option<Value> {
    let Some((head, tail)) = segments.split_first() else {
        return (!current.is_null()).then(|| current.clone());
    };

    match head {
        Segment::Key(key) => resolve_segments(current.as_object()?.get(key)?, tail),
        Segment::Index(index) => resolve_segments(current.as_array()?.get(*index)?, tail),
        Segment::Wildcard => {
            let items = current.as_array()?;
            let collected = items
                .iter()
                .filter_map(|item| resolve_segments(item, tail))
                .collect();
            Some(Value::Array(collected))
        }
    }
}

impl From<&str> for FieldPath {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for FieldPath {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.raw
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn route_table() -> Value {
        json!({
            "RouteTableId": "rtb-1",
            "Routes": [
                {"State": "active", "Origin": "CreateRouteTable"},
                {"State": "blackhole", "Origin": "CreateRoute"}
            ],
            "Tags": [
                {"Key": "Name", "Value": "public-rtb"},
                {"Key": "env"}
            ],
            "VpcId": null
        })
    }

    #[test]
    fn parse_plain_and_indexed_segments() {
        let path = FieldPath::parse("Routes[1].State");
        assert_eq!(
            path.segments(),
            &[
                Segment::Key("Routes".into()),
                Segment::Index(1),
                Segment::Key("State".into())
            ]
        );
        assert!(!path.has_wildcard());
    }

    #[test]
    fn parse_nested_brackets() {
        let path = FieldPath::parse("Matrix[0][2]");
        assert_eq!(
            path.segments(),
            &[Segment::Key("Matrix".into()), Segment::Index(0), Segment::Index(2)]
        );
    }

    #[test]
    fn parse_unrecognised_bracket_is_literal_key() {
        let path = FieldPath::parse("Weird[abc]");
        assert_eq!(path.segments(), &[Segment::Key("Weird[abc]".into())]);
    }

    #[test]
    fn resolve_scalar() {
        let doc = route_table();
        assert_eq!(FieldPath::parse("Routes[0].State").resolve(&doc), Some(json!("active")));
        assert_eq!(FieldPath::parse("RouteTableId").resolve(&doc), Some(json!("rtb-1")));
    }

    #[test]
    fn resolve_missing_and_null() {
        let doc = route_table();
        assert_eq!(FieldPath::parse("Routes[5].State").resolve(&doc), None);
        assert_eq!(FieldPath::parse("OwnerId").resolve(&doc), None);
        assert_eq!(FieldPath::parse("VpcId").resolve(&doc), None);
        assert_eq!(FieldPath::parse("RouteTableId.Nested").resolve(&doc), None);
    }

    #[test]
    fn resolve_wildcard_skips_elements_without_field() {
        let doc = route_table();
        assert_eq!(
            FieldPath::parse("Tags[*].Value").resolve(&doc),
            Some(json!(["public-rtb"]))
        );
        assert_eq!(
            FieldPath::parse("Routes[*].Origin").resolve(&doc),
            Some(json!(["CreateRouteTable", "CreateRoute"]))
        );
    }

    #[test]
    fn serde_as_string() {
        let path: FieldPath = serde_json::from_str("\"Tags[*].Key\"").unwrap();
        assert!(path.has_wildcard());
        assert_eq!(serde_json::to_string(&path).unwrap(), "\"Tags[*].Key\"");
    }
}
