use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::category::ResourceCategory;
use crate::error::LookupError;
use crate::path::FieldPath;

/// How the resource under test is identified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum ResourceKey {
    Id(String),
    Arn(String),
    Name(String),
    /// Account-level or filter-only lookups (password policy, all VPCs).
    Unscoped,
}

impl ResourceKey {
    /// The identifier string, if any.
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Id(v) | Self::Arn(v) | Self::Name(v) => Some(v),
            Self::Unscoped => None,
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(v) => write!(f, "id={v}"),
            Self::Arn(v) => write!(f, "arn={v}"),
            Self::Name(v) => write!(f, "name={v}"),
            Self::Unscoped => f.write_str("*"),
        }
    }
}

/// Identifies one resource to describe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupRequest {
    pub category: ResourceCategory,
    /// Category-specific resource type (`vpc`, `role`, `bucket_policy`).
    pub resource_type: String,
    pub key: ResourceKey,
    /// Secondary lookup inputs (`policy_name`, `vpc_id`, `prefix`, ...).
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl LookupRequest {
    pub fn new(category: ResourceCategory, resource_type: impl Into<String>, key: ResourceKey) -> Self {
        Self {
            category,
            resource_type: resource_type.into(),
            key,
            params: BTreeMap::new(),
        }
    }

    pub fn by_id(category: ResourceCategory, resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(category, resource_type, ResourceKey::Id(id.into()))
    }

    pub fn by_arn(category: ResourceCategory, resource_type: impl Into<String>, arn: impl Into<String>) -> Self {
        Self::new(category, resource_type, ResourceKey::Arn(arn.into()))
    }

    pub fn by_name(category: ResourceCategory, resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(category, resource_type, ResourceKey::Name(name.into()))
    }

    pub fn unscoped(category: ResourceCategory, resource_type: impl Into<String>) -> Self {
        Self::new(category, resource_type, ResourceKey::Unscoped)
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn get_param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// The identifier, or an `InvalidInput` error naming what was expected.
    pub fn require_key(&self, what: &str) -> Result<&str, LookupError> {
        self.key.value().ok_or_else(|| {
            LookupError::invalid_input(format!("{} lookup requires {what}", self.resource_type))
        })
    }

    /// A parameter, or an `InvalidInput` error naming it.
    pub fn require_param(&self, name: &str) -> Result<&str, LookupError> {
        self.get_param(name).ok_or_else(|| {
            LookupError::invalid_input(format!(
                "{} lookup requires parameter '{name}'",
                self.resource_type
            ))
        })
    }
}

impl fmt::Display for LookupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} {}", self.category, self.resource_type, self.key)?;
        for (name, value) in &self.params {
            write!(f, " {name}={value}")?;
        }
        Ok(())
    }
}

/// Read-only JSON view of a provider response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceDescription(Value);

impl ResourceDescription {
    pub fn new(raw: Value) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> &Value {
        &self.0
    }

    /// Resolve `path` against the description.
    pub fn field(&self, path: &FieldPath) -> Option<Value> {
        path.resolve(&self.0)
    }

    /// Pretty-printed JSON for verbose logs.
    pub fn pretty(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| self.0.to_string())
    }
}

impl From<Value> for ResourceDescription {
    fn from(raw: Value) -> Self {
        Self(raw)
    }
}
