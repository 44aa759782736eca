use serde::{Deserialize, Serialize};

/// STS session name used when none is configured.
pub const DEFAULT_SESSION_NAME: &str = "infracheck-validator";

/// Region used when neither the config nor the environment names one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings shared by every AWS fetcher.
///
/// Validations usually run from CI against a freshly provisioned account, so
/// besides the region this carries an optional role to assume in the target
/// account and an endpoint override for `LocalStack`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsBaseConfig {
    /// AWS region (e.g. `"eu-west-1"`).
    pub region: String,

    /// Role to assume via STS before describing resources.
    #[serde(default)]
    pub role_arn: Option<String>,

    /// Endpoint override for local development.
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// STS session name (defaults to [`DEFAULT_SESSION_NAME`]).
    #[serde(default)]
    pub session_name: Option<String>,

    /// External ID required by the target role's trust policy.
    #[serde(default)]
    pub external_id: Option<String>,
}

impl std::fmt::Debug for AwsBaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsBaseConfig")
            .field("region", &self.region)
            .field("role_arn", &self.role_arn.as_ref().map(|_| "[REDACTED]"))
            .field("endpoint_url", &self.endpoint_url)
            .field("session_name", &self.session_name)
            .field("external_id", &self.external_id.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl AwsBaseConfig {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            role_arn: None,
            endpoint_url: None,
            session_name: None,
            external_id: None,
        }
    }

    /// Region from `AWS_REGION`, then `AWS_DEFAULT_REGION`, then
    /// [`DEFAULT_REGION`].
    pub fn from_env() -> Self {
        Self::with_region_lookup(|name| std::env::var(name).ok())
    }

    fn with_region_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let set = |name: &str| lookup(name).filter(|r| !r.is_empty());
        let region = set("AWS_REGION")
            .or_else(|| set("AWS_DEFAULT_REGION"))
            .unwrap_or_else(|| DEFAULT_REGION.to_owned());
        Self::new(region)
    }

    #[must_use]
    pub fn with_role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.role_arn = Some(role_arn.into());
        self
    }

    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    #[must_use]
    pub fn with_session_name(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = Some(session_name.into());
        self
    }

    #[must_use]
    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    /// The configured session name or [`DEFAULT_SESSION_NAME`].
    pub fn session_name(&self) -> &str {
        self.session_name.as_deref().unwrap_or(DEFAULT_SESSION_NAME)
    }
}

impl Default for AwsBaseConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REGION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = AwsBaseConfig::default();
        assert_eq!(config.region, "us-east-1");
        assert!(config.role_arn.is_none());
        assert_eq!(config.session_name(), DEFAULT_SESSION_NAME);
    }

    #[test]
    fn region_prefers_aws_region() {
        let config = AwsBaseConfig::with_region_lookup(|name| match name {
            "AWS_REGION" => Some("eu-central-1".into()),
            "AWS_DEFAULT_REGION" => Some("us-west-2".into()),
            _ => None,
        });
        assert_eq!(config.region, "eu-central-1");

        let fallback = AwsBaseConfig::with_region_lookup(|name| {
            (name == "AWS_DEFAULT_REGION").then(|| "us-west-2".to_owned())
        });
        assert_eq!(fallback.region, "us-west-2");

        let empty = AwsBaseConfig::with_region_lookup(|_| Some(String::new()));
        assert_eq!(empty.region, DEFAULT_REGION);

        let blank_primary = AwsBaseConfig::with_region_lookup(|name| match name {
            "AWS_REGION" => Some(String::new()),
            "AWS_DEFAULT_REGION" => Some("ap-northeast-1".into()),
            _ => None,
        });
        assert_eq!(blank_primary.region, "ap-northeast-1");
    }

    #[test]
    fn debug_redacts_role_and_external_id() {
        let config = AwsBaseConfig::new("us-east-1")
            .with_role_arn("arn:aws:iam::123456789012:role/validator")
            .with_external_id("ext-secret");
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("123456789012"));
        assert!(!debug.contains("ext-secret"));
    }

    #[test]
    fn deserializes_with_optional_fields_absent() {
        let config: AwsBaseConfig =
            serde_json::from_str(r#"{"region": "ap-southeast-2", "endpoint_url": "http://localhost:4566"}"#)
                .unwrap();
        assert_eq!(config.region, "ap-southeast-2");
        assert_eq!(config.endpoint_url.as_deref(), Some("http://localhost:4566"));
        assert!(config.session_name.is_none());
    }
}
