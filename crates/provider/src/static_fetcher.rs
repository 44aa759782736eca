use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use infracheck_core::{LookupError, LookupRequest, ResourceCategory, ResourceDescription};
use serde_json::Value;
use tracing::info;

use crate::fetcher::{ResourceFetcher, unsupported_resource_type};

const UNSCOPED: &str = "*";

type Canned = Result<Value, LookupError>;

/// A fetcher that serves canned descriptions and errors without any
/// external I/O.
///
/// Useful for local development and for test suites that need a provider
/// with known state. Responses are keyed by resource type and the request's
/// identifier; unscoped lookups use the key `*`. A request with no canned
/// entry fails with `NotFound`.
pub struct StaticFetcher {
    category: ResourceCategory,
    responses: HashMap<(String, String), Canned>,
    calls: AtomicUsize,
}

impl StaticFetcher {
    pub fn new(category: ResourceCategory) -> Self {
        Self {
            category,
            responses: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Serve `description` for `resource_type` identified by `key`.
    #[must_use]
    pub fn with_description(
        mut self,
        resource_type: impl Into<String>,
        key: impl Into<String>,
        description: Value,
    ) -> Self {
        self.responses
            .insert((resource_type.into(), key.into()), Ok(description));
        self
    }

    /// Serve `description` for an unscoped lookup of `resource_type`.
    #[must_use]
    pub fn with_unscoped(self, resource_type: impl Into<String>, description: Value) -> Self {
        self.with_description(resource_type, UNSCOPED, description)
    }

    /// Fail lookups of `resource_type` identified by `key` with `error`.
    #[must_use]
    pub fn with_error(
        mut self,
        resource_type: impl Into<String>,
        key: impl Into<String>,
        error: LookupError,
    ) -> Self {
        self.responses
            .insert((resource_type.into(), key.into()), Err(error));
        self
    }

    /// Number of lookups served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ResourceFetcher for StaticFetcher {
    fn category(&self) -> ResourceCategory {
        self.category
    }

    fn supported_resource_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.responses.keys().map(|(t, _)| t.clone()).collect();
        types.sort_unstable();
        types.dedup();
        types
    }

    async fn fetch(&self, request: &LookupRequest) -> Result<ResourceDescription, LookupError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if request.category != self.category {
            return Err(unsupported_resource_type(request));
        }
        let key = request.key.value().unwrap_or(UNSCOPED);
        info!(
            category = %self.category,
            resource_type = %request.resource_type,
            key,
            "static fetcher served lookup"
        );
        match self.responses.get(&(request.resource_type.clone(), key.to_owned())) {
            Some(Ok(description)) => Ok(ResourceDescription::new(description.clone())),
            Some(Err(error)) => Err(error.clone()),
            None => Err(LookupError::not_found(format!(
                "{} {key} not found",
                request.resource_type
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use infracheck_core::ErrorKind;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn serves_canned_description() {
        let fetcher = StaticFetcher::new(ResourceCategory::Ec2)
            .with_description("vpc", "vpc-1", json!({"CidrBlock": "10.0.0.0/16"}));
        let description = fetcher
            .fetch(&LookupRequest::by_id(ResourceCategory::Ec2, "vpc", "vpc-1"))
            .await
            .unwrap();
        assert_eq!(description.raw()["CidrBlock"], "10.0.0.0/16");
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn unknown_key_is_not_found() {
        let fetcher = StaticFetcher::new(ResourceCategory::Ec2);
        let err = fetcher
            .fetch(&LookupRequest::by_id(ResourceCategory::Ec2, "vpc", "vpc-404"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn serves_canned_error() {
        let fetcher = StaticFetcher::new(ResourceCategory::Iam).with_error(
            "role",
            "ci",
            LookupError::new(ErrorKind::RateLimited, "slow down").with_code("Throttling"),
        );
        let err = fetcher
            .fetch(&LookupRequest::by_name(ResourceCategory::Iam, "role", "ci"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::RateLimited);
        assert_eq!(err.code.as_deref(), Some("Throttling"));
    }

    #[tokio::test]
    async fn unscoped_lookup_uses_wildcard_key() {
        let fetcher = StaticFetcher::new(ResourceCategory::Iam)
            .with_unscoped("account_aliases", json!({"AccountAliases": ["acme-prod"]}));
        let description = fetcher
            .fetch(&LookupRequest::unscoped(ResourceCategory::Iam, "account_aliases"))
            .await
            .unwrap();
        assert_eq!(description.raw()["AccountAliases"][0], "acme-prod");
    }

    #[tokio::test]
    async fn wrong_category_is_rejected() {
        let fetcher = StaticFetcher::new(ResourceCategory::Kms).with_description("key", "k", json!({}));
        let err = fetcher
            .fetch(&LookupRequest::by_id(ResourceCategory::S3, "key", "k"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }
}
