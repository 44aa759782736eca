use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::FieldPath;

/// Typed scalar expected by an equality check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// The comparison applied to one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    /// Exact, type-sensitive scalar equality.
    Equals(Scalar),
    /// Same strings in any order (multiset equality).
    Unordered(Vec<String>),
    /// Same strings in the same order.
    Ordered(Vec<String>),
    /// Semantic JSON equality after URL-decoding the actual value if needed.
    Json(Value),
    /// Substring of a string field, or member of an array field.
    Contains(String),
    /// Every needle is a substring of the field / member of the array.
    ContainsAll(Vec<String>),
    /// Number of elements of an array field.
    Length(usize),
    /// Field is present and not an empty string, array or object.
    NotEmpty,
}

impl Check {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Equals(_) => "equals",
            Self::Unordered(_) => "unordered",
            Self::Ordered(_) => "ordered",
            Self::Json(_) => "json",
            Self::Contains(_) => "contains",
            Self::ContainsAll(_) => "contains_all",
            Self::Length(_) => "length",
            Self::NotEmpty => "not_empty",
        }
    }
}

/// Whether an absent field is an error or a flagged skip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    /// Absence is a malformed response.
    #[default]
    Required,
    /// Absence is recorded as a skip, never as a mismatch.
    Optional,
}

/// One (field-path, check) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldExpectation {
    pub path: FieldPath,
    pub check: Check,
    #[serde(default)]
    pub requirement: Requirement,
}

impl FieldExpectation {
    pub fn new(path: impl Into<FieldPath>, check: Check) -> Self {
        Self {
            path: path.into(),
            check,
            requirement: Requirement::Required,
        }
    }

    /// Mark the field as one the provider does not always return.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.requirement = Requirement::Optional;
        self
    }

    pub fn is_optional(&self) -> bool {
        self.requirement == Requirement::Optional
    }
}

/// Picks the element(s) of a collection an expectation applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Selector {
    /// Position 0. Only correct when the lookup returns exactly one element.
    First,
    /// Elements whose field equals `value`.
    FieldEquals { path: FieldPath, value: String },
    /// Elements where the addressed string, or any string of the addressed
    /// array, contains `needle`.
    AnyContains { path: FieldPath, needle: String },
}

impl Selector {
    pub fn field_equals(path: impl Into<FieldPath>, value: impl Into<String>) -> Self {
        Self::FieldEquals {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn any_contains(path: impl Into<FieldPath>, needle: impl Into<String>) -> Self {
        Self::AnyContains {
            path: path.into(),
            needle: needle.into(),
        }
    }

    /// Elements carrying a tag whose value contains `needle`.
    pub fn tag_value_contains(needle: impl Into<String>) -> Self {
        Self::any_contains("Tags[*].Value", needle)
    }

    /// Return the elements of `items` this selector picks, with their
    /// positions, in order.
    pub fn select<'a>(&self, items: &'a [Value]) -> Vec<(usize, &'a Value)> {
        let mut indexed = items.iter().enumerate();
        match self {
            Self::First => indexed.next().into_iter().collect(),
            Self::FieldEquals { path, value } => indexed
                .filter(|(_, item)| path.resolve(item).as_ref().and_then(Value::as_str) == Some(value.as_str()))
                .collect(),
            Self::AnyContains { path, needle } => indexed
                .filter(|(_, item)| {
                    path.resolve(item)
                        .is_some_and(|found| any_string_contains(&found, needle))
                })
                .collect(),
        }
    }
}

fn any_string_contains(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(s) => s.contains(needle),
        Value::Array(items) => items.iter().any(|item| any_string_contains(item, needle)),
        _ => false,
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => f.write_str("first element"),
            Self::FieldEquals { path, value } => write!(f, "{path} == {value:?}"),
            Self::AnyContains { path, needle } => write!(f, "{path} contains {needle:?}"),
        }
    }
}

/// Element(s) to compare when the description is a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Path to the array inside the description (`RouteTables`, `Subnets`).
    pub collection: FieldPath,
    pub selector: Selector,
}

/// The set of field checks a test author supplies for one resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Expectation {
    #[serde(default)]
    pub scope: Option<Scope>,
    #[serde(default)]
    pub fields: Vec<FieldExpectation>,
}

impl Expectation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare against the elements of `collection` picked by `selector`.
    #[must_use]
    pub fn within(mut self, collection: impl Into<FieldPath>, selector: Selector) -> Self {
        self.scope = Some(Scope {
            collection: collection.into(),
            selector,
        });
        self
    }

    #[must_use]
    pub fn with(mut self, field: FieldExpectation) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn equals(self, path: impl Into<FieldPath>, expected: impl Into<Scalar>) -> Self {
        self.with(FieldExpectation::new(path, Check::Equals(expected.into())))
    }

    #[must_use]
    pub fn unordered<S: Into<String>>(self, path: impl Into<FieldPath>, expected: impl IntoIterator<Item = S>) -> Self {
        let expected = expected.into_iter().map(Into::into).collect();
        self.with(FieldExpectation::new(path, Check::Unordered(expected)))
    }

    #[must_use]
    pub fn ordered<S: Into<String>>(self, path: impl Into<FieldPath>, expected: impl IntoIterator<Item = S>) -> Self {
        let expected = expected.into_iter().map(Into::into).collect();
        self.with(FieldExpectation::new(path, Check::Ordered(expected)))
    }

    #[must_use]
    pub fn json(self, path: impl Into<FieldPath>, expected: Value) -> Self {
        self.with(FieldExpectation::new(path, Check::Json(expected)))
    }

    /// Like [`json`](Self::json), taking the expected document as text.
    ///
    /// Text that is not valid JSON is compared as a JSON string, which will
    /// not match a document and therefore surfaces as a mismatch.
    #[must_use]
    pub fn json_str(self, path: impl Into<FieldPath>, expected: &str) -> Self {
        let parsed = serde_json::from_str(expected).unwrap_or_else(|_| Value::String(expected.to_owned()));
        self.json(path, parsed)
    }

    #[must_use]
    pub fn contains(self, path: impl Into<FieldPath>, needle: impl Into<String>) -> Self {
        self.with(FieldExpectation::new(path, Check::Contains(needle.into())))
    }

    #[must_use]
    pub fn contains_all<S: Into<String>>(self, path: impl Into<FieldPath>, needles: impl IntoIterator<Item = S>) -> Self {
        let needles = needles.into_iter().map(Into::into).collect();
        self.with(FieldExpectation::new(path, Check::ContainsAll(needles)))
    }

    #[must_use]
    pub fn length(self, path: impl Into<FieldPath>, expected: usize) -> Self {
        self.with(FieldExpectation::new(path, Check::Length(expected)))
    }

    #[must_use]
    pub fn not_empty(self, path: impl Into<FieldPath>) -> Self {
        self.with(FieldExpectation::new(path, Check::NotEmpty))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn route_tables() -> Vec<Value> {
        vec![
            json!({"RouteTableId": "rtb-a", "Tags": [{"Key": "Name", "Value": "default-rtb"}]}),
            json!({"RouteTableId": "rtb-b", "Tags": [{"Key": "Name", "Value": "app-public-rtb"}]}),
            json!({"RouteTableId": "rtb-c", "Tags": [{"Key": "Name", "Value": "private-rtb"}]}),
        ]
    }

    #[test]
    fn builder_collects_checks_in_order() {
        let expectation = Expectation::new()
            .equals("CidrBlock", "10.0.0.0/16")
            .equals("IsDefault", false)
            .length("Routes", 2)
            .with(FieldExpectation::new("DeliverLogsPermissionArn", Check::NotEmpty).optional());

        assert_eq!(expectation.len(), 4);
        assert_eq!(expectation.fields[0].check, Check::Equals(Scalar::Str("10.0.0.0/16".into())));
        assert_eq!(expectation.fields[1].check, Check::Equals(Scalar::Bool(false)));
        assert!(expectation.fields[3].is_optional());
        assert!(!expectation.fields[0].is_optional());
    }

    #[test]
    fn json_str_parses_document() {
        let expectation = Expectation::new().json_str("Policy", r#"{"Version":"2012-10-17"}"#);
        assert_eq!(
            expectation.fields[0].check,
            Check::Json(json!({"Version": "2012-10-17"}))
        );
    }

    #[test]
    fn selector_by_tag_substring() {
        let tables = route_tables();
        let picked = Selector::tag_value_contains("public-rtb").select(&tables);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].0, 1);
        assert_eq!(picked[0].1["RouteTableId"], "rtb-b");
    }

    #[test]
    fn selector_by_field_equals() {
        let tables = route_tables();
        let picked = Selector::field_equals("RouteTableId", "rtb-c").select(&tables);
        assert_eq!(picked.len(), 1);
        assert!(Selector::field_equals("RouteTableId", "rtb-z").select(&tables).is_empty());
    }

    #[test]
    fn selector_matches_every_candidate() {
        let tables = route_tables();
        let picked = Selector::tag_value_contains("-rtb").select(&tables);
        assert_eq!(picked.len(), 3);
    }

    #[test]
    fn selector_first_on_empty_collection() {
        assert!(Selector::First.select(&[]).is_empty());
    }

    #[test]
    fn expectation_deserializes_from_json() {
        let expectation: Expectation = serde_json::from_value(json!({
            "scope": {
                "collection": "RouteTables",
                "selector": {"by": "any_contains", "path": "Tags[*].Value", "needle": "public-rtb"}
            },
            "fields": [
                {"path": "Routes", "check": {"length": 2}},
                {"path": "OwnerId", "check": {"equals": "123456789012"}},
                {"path": "VpcId", "check": "not_empty"},
                {"path": "Associations[0].Main", "check": {"equals": false}, "requirement": "optional"}
            ]
        }))
        .unwrap();

        assert_eq!(expectation.len(), 4);
        assert_eq!(expectation.fields[0].check, Check::Length(2));
        assert_eq!(expectation.fields[2].check, Check::NotEmpty);
        assert_eq!(expectation.fields[3].check, Check::Equals(Scalar::Bool(false)));
        assert!(expectation.fields[3].is_optional());
        assert_eq!(
            expectation.scope.unwrap().selector,
            Selector::tag_value_contains("public-rtb")
        );
    }
}
