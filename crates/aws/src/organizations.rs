use async_trait::async_trait;
use infracheck_core::{LookupError, LookupRequest, ResourceCategory, ResourceDescription};
use infracheck_provider::{ResourceFetcher, unsupported_resource_type};
use serde_json::{Value, json};
use tracing::instrument;

use crate::auth::build_sdk_config;
use crate::config::AwsBaseConfig;
use crate::error::{AwsFetchError, sdk_error};
use crate::json::require_key;

const CATEGORY: ResourceCategory = ResourceCategory::Organizations;

/// Describes organization policies (SCPs, tag policies) by policy id.
pub struct OrganizationsFetcher {
    client: aws_sdk_organizations::Client,
}

impl OrganizationsFetcher {
    pub async fn new(config: &AwsBaseConfig) -> Self {
        let sdk_config = build_sdk_config(config).await;
        Self::from_sdk_config(&sdk_config)
    }

    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::with_client(aws_sdk_organizations::Client::new(sdk_config))
    }

    pub fn with_client(client: aws_sdk_organizations::Client) -> Self {
        Self { client }
    }

    async fn policy(&self, request: &LookupRequest) -> Result<Value, AwsFetchError> {
        let policy_id = require_key(request, "a policy id")?;
        let output = self
            .client
            .describe_policy()
            .policy_id(policy_id)
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "describe_policy", &e))?;
        let policy = output
            .policy()
            .ok_or_else(|| AwsFetchError::Empty(format!("policy {policy_id}")))?;

        Ok(json!({
            "Policy": {
                "PolicySummary": policy.policy_summary().map(|s| json!({
                    "Id": s.id(),
                    "Arn": s.arn(),
                    "Name": s.name(),
                    "Description": s.description(),
                    "Type": s.r#type().map(|t| t.as_str()),
                    "AwsManaged": s.aws_managed(),
                })),
                "Content": policy.content(),
            }
        }))
    }
}

#[async_trait]
impl ResourceFetcher for OrganizationsFetcher {
    fn category(&self) -> ResourceCategory {
        CATEGORY
    }

    fn supported_resource_types(&self) -> Vec<String> {
        vec!["policy".to_owned()]
    }

    #[instrument(skip_all, fields(resource_type = %request.resource_type, key = %request.key))]
    async fn fetch(&self, request: &LookupRequest) -> Result<ResourceDescription, LookupError> {
        match request.resource_type.as_str() {
            "policy" => Ok(ResourceDescription::new(self.policy(request).await?)),
            _ => Err(unsupported_resource_type(request)),
        }
    }
}
