use async_trait::async_trait;
use aws_sdk_kms::types::{GrantListEntry, KeyMetadata};
use infracheck_core::{LookupError, LookupRequest, ResourceCategory, ResourceDescription};
use infracheck_provider::{ResourceFetcher, unsupported_resource_type};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::auth::build_sdk_config;
use crate::config::AwsBaseConfig;
use crate::error::{AwsFetchError, sdk_error};
use crate::json::{require_key, timestamp};

const CATEGORY: ResourceCategory = ResourceCategory::Kms;

const RESOURCE_TYPES: &[&str] = &["key", "key_policy", "key_tags", "key_rotation", "grants"];

/// KMS only ever names one key policy.
const DEFAULT_KEY_POLICY: &str = "default";

/// Describes KMS keys. The key may be given as an id, ARN or alias.
pub struct KmsFetcher {
    client: aws_sdk_kms::Client,
}

impl KmsFetcher {
    pub async fn new(config: &AwsBaseConfig) -> Self {
        let sdk_config = build_sdk_config(config).await;
        Self::from_sdk_config(&sdk_config)
    }

    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::with_client(aws_sdk_kms::Client::new(sdk_config))
    }

    /// Create a fetcher around a pre-built client (for testing).
    pub fn with_client(client: aws_sdk_kms::Client) -> Self {
        Self { client }
    }

    async fn describe(&self, request: &LookupRequest) -> Result<Value, AwsFetchError> {
        let key_id = require_key(request, "a key id")?;

        match request.resource_type.as_str() {
            "key" => {
                let output = self
                    .client
                    .describe_key()
                    .key_id(key_id)
                    .send()
                    .await
                    .map_err(|e| sdk_error(CATEGORY, "describe_key", &e))?;
                let metadata = output
                    .key_metadata()
                    .ok_or_else(|| AwsFetchError::Empty(format!("key {key_id}")))?;
                Ok(json!({ "KeyMetadata": key_metadata_json(metadata) }))
            }
            "key_policy" => {
                let output = self
                    .client
                    .get_key_policy()
                    .key_id(key_id)
                    .policy_name(DEFAULT_KEY_POLICY)
                    .send()
                    .await
                    .map_err(|e| sdk_error(CATEGORY, "get_key_policy", &e))?;
                Ok(json!({
                    "PolicyName": output.policy_name().unwrap_or(DEFAULT_KEY_POLICY),
                    "Policy": output.policy(),
                }))
            }
            "key_tags" => {
                let output = self
                    .client
                    .list_resource_tags()
                    .key_id(key_id)
                    .send()
                    .await
                    .map_err(|e| sdk_error(CATEGORY, "list_resource_tags", &e))?;
                Ok(json!({
                    "Tags": output.tags().iter().map(|t| json!({
                        "TagKey": t.tag_key(),
                        "TagValue": t.tag_value(),
                    })).collect::<Vec<_>>()
                }))
            }
            "key_rotation" => {
                let output = self
                    .client
                    .get_key_rotation_status()
                    .key_id(key_id)
                    .send()
                    .await
                    .map_err(|e| sdk_error(CATEGORY, "get_key_rotation_status", &e))?;
                Ok(json!({
                    "KeyRotationEnabled": output.key_rotation_enabled(),
                    "RotationPeriodInDays": output.rotation_period_in_days(),
                }))
            }
            "grants" => {
                let output = self
                    .client
                    .list_grants()
                    .key_id(key_id)
                    .send()
                    .await
                    .map_err(|e| sdk_error(CATEGORY, "list_grants", &e))?;
                Ok(json!({ "Grants": output.grants().iter().map(grant_json).collect::<Vec<_>>() }))
            }
            _ => Err(AwsFetchError::InvalidInput(
                unsupported_resource_type(request).message,
            )),
        }
    }
}

#[async_trait]
impl ResourceFetcher for KmsFetcher {
    fn category(&self) -> ResourceCategory {
        CATEGORY
    }

    fn supported_resource_types(&self) -> Vec<String> {
        RESOURCE_TYPES.iter().map(|t| (*t).to_owned()).collect()
    }

    #[instrument(skip_all, fields(resource_type = %request.resource_type, key = %request.key))]
    async fn fetch(&self, request: &LookupRequest) -> Result<ResourceDescription, LookupError> {
        debug!("describing KMS key");
        Ok(ResourceDescription::new(self.describe(request).await?))
    }
}

fn key_metadata_json(metadata: &KeyMetadata) -> Value {
    json!({
        "AWSAccountId": metadata.aws_account_id(),
        "KeyId": metadata.key_id(),
        "Arn": metadata.arn(),
        "CreationDate": timestamp(metadata.creation_date()),
        "Enabled": metadata.enabled(),
        "Description": metadata.description(),
        "KeyUsage": metadata.key_usage().map(|u| u.as_str()),
        "KeyState": metadata.key_state().map(|s| s.as_str()),
        "KeyManager": metadata.key_manager().map(|m| m.as_str()),
        "KeySpec": metadata.key_spec().map(|s| s.as_str()),
        "Origin": metadata.origin().map(|o| o.as_str()),
        "MultiRegion": metadata.multi_region(),
        "DeletionDate": timestamp(metadata.deletion_date()),
    })
}

fn grant_json(grant: &GrantListEntry) -> Value {
    json!({
        "GrantId": grant.grant_id(),
        "Name": grant.name(),
        "KeyId": grant.key_id(),
        "GranteePrincipal": grant.grantee_principal(),
        "RetiringPrincipal": grant.retiring_principal(),
        "IssuingAccount": grant.issuing_account(),
        "Operations": grant.operations().iter().map(|o| o.as_str()).collect::<Vec<_>>(),
        "CreationDate": timestamp(grant.creation_date()),
    })
}
