use std::fmt;

use async_trait::async_trait;
use aws_sdk_s3::types::{
    Grant, LifecycleRule, PublicAccessBlockConfiguration, ReplicationRule, ServerSideEncryptionRule,
};
use infracheck_core::{LookupError, LookupRequest, ResourceCategory, ResourceDescription};
use infracheck_provider::{ResourceFetcher, unsupported_resource_type};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::auth::build_sdk_config;
use crate::config::AwsBaseConfig;
use crate::error::{AwsFetchError, sdk_error};
use crate::json::require_key;

const CATEGORY: ResourceCategory = ResourceCategory::S3;

const RESOURCE_TYPES: &[&str] = &[
    "bucket_location",
    "bucket_policy",
    "bucket_acl",
    "bucket_encryption",
    "bucket_lifecycle",
    "bucket_replication",
    "bucket_versioning",
    "bucket_tagging",
    "public_access_block",
];

/// Describes bucket-level configuration. Every lookup is keyed by bucket name.
pub struct S3Fetcher {
    client: aws_sdk_s3::Client,
}

impl fmt::Debug for S3Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Fetcher")
            .field("client", &"<S3Client>")
            .finish()
    }
}

impl S3Fetcher {
    pub async fn new(config: &AwsBaseConfig) -> Self {
        let sdk_config = build_sdk_config(config).await;
        Self::from_sdk_config(&sdk_config)
    }

    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::with_client(aws_sdk_s3::Client::new(sdk_config))
    }

    /// Create a fetcher around a pre-built client (for testing).
    pub fn with_client(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    async fn describe(&self, request: &LookupRequest) -> Result<Value, AwsFetchError> {
        let bucket = require_key(request, "a bucket name")?;
        debug!(bucket, "describing S3 bucket");

        match request.resource_type.as_str() {
            "bucket_location" => {
                let output = self
                    .client
                    .get_bucket_location()
                    .bucket(bucket)
                    .send()
                    .await
                    .map_err(|e| sdk_error(CATEGORY, "get_bucket_location", &e))?;
                Ok(json!({
                    "LocationConstraint": output.location_constraint().map(|c| c.as_str()),
                }))
            }
            "bucket_policy" => {
                let output = self
                    .client
                    .get_bucket_policy()
                    .bucket(bucket)
                    .send()
                    .await
                    .map_err(|e| sdk_error(CATEGORY, "get_bucket_policy", &e))?;
                Ok(json!({ "Policy": output.policy() }))
            }
            "bucket_acl" => {
                let output = self
                    .client
                    .get_bucket_acl()
                    .bucket(bucket)
                    .send()
                    .await
                    .map_err(|e| sdk_error(CATEGORY, "get_bucket_acl", &e))?;
                Ok(json!({
                    "Owner": output.owner().map(|o| json!({
                        "ID": o.id(),
                        "DisplayName": o.display_name(),
                    })),
                    "Grants": output.grants().iter().map(grant_json).collect::<Vec<_>>(),
                }))
            }
            "bucket_encryption" => {
                let output = self
                    .client
                    .get_bucket_encryption()
                    .bucket(bucket)
                    .send()
                    .await
                    .map_err(|e| sdk_error(CATEGORY, "get_bucket_encryption", &e))?;
                let rules = output
                    .server_side_encryption_configuration()
                    .map(|c| c.rules().iter().map(encryption_rule_json).collect::<Vec<_>>())
                    .unwrap_or_default();
                Ok(json!({ "ServerSideEncryptionConfiguration": { "Rules": rules } }))
            }
            "bucket_lifecycle" => {
                let output = self
                    .client
                    .get_bucket_lifecycle_configuration()
                    .bucket(bucket)
                    .send()
                    .await
                    .map_err(|e| sdk_error(CATEGORY, "get_bucket_lifecycle_configuration", &e))?;
                Ok(json!({ "Rules": output.rules().iter().map(lifecycle_rule_json).collect::<Vec<_>>() }))
            }
            "bucket_replication" => {
                let output = self
                    .client
                    .get_bucket_replication()
                    .bucket(bucket)
                    .send()
                    .await
                    .map_err(|e| sdk_error(CATEGORY, "get_bucket_replication", &e))?;
                let configuration = output
                    .replication_configuration()
                    .ok_or_else(|| AwsFetchError::Empty(format!("replication configuration of {bucket}")))?;
                Ok(json!({
                    "ReplicationConfiguration": {
                        "Role": configuration.role(),
                        "Rules": configuration.rules().iter().map(replication_rule_json).collect::<Vec<_>>(),
                    }
                }))
            }
            "bucket_versioning" => {
                let output = self
                    .client
                    .get_bucket_versioning()
                    .bucket(bucket)
                    .send()
                    .await
                    .map_err(|e| sdk_error(CATEGORY, "get_bucket_versioning", &e))?;
                Ok(json!({
                    "Status": output.status().map(|s| s.as_str()),
                    "MFADelete": output.mfa_delete().map(|m| m.as_str()),
                }))
            }
            "bucket_tagging" => {
                let output = self
                    .client
                    .get_bucket_tagging()
                    .bucket(bucket)
                    .send()
                    .await
                    .map_err(|e| sdk_error(CATEGORY, "get_bucket_tagging", &e))?;
                Ok(json!({
                    "TagSet": output.tag_set().iter().map(|t| json!({
                        "Key": t.key(),
                        "Value": t.value(),
                    })).collect::<Vec<_>>()
                }))
            }
            "public_access_block" => {
                let output = self
                    .client
                    .get_public_access_block()
                    .bucket(bucket)
                    .send()
                    .await
                    .map_err(|e| sdk_error(CATEGORY, "get_public_access_block", &e))?;
                let configuration = output
                    .public_access_block_configuration()
                    .ok_or_else(|| AwsFetchError::Empty(format!("public access block of {bucket}")))?;
                Ok(json!({ "PublicAccessBlockConfiguration": public_access_block_json(configuration) }))
            }
            _ => Err(AwsFetchError::InvalidInput(
                unsupported_resource_type(request).message,
            )),
        }
    }
}

#[async_trait]
impl ResourceFetcher for S3Fetcher {
    fn category(&self) -> ResourceCategory {
        CATEGORY
    }

    fn supported_resource_types(&self) -> Vec<String> {
        RESOURCE_TYPES.iter().map(|t| (*t).to_owned()).collect()
    }

    #[instrument(skip_all, fields(resource_type = %request.resource_type, key = %request.key))]
    async fn fetch(&self, request: &LookupRequest) -> Result<ResourceDescription, LookupError> {
        Ok(ResourceDescription::new(self.describe(request).await?))
    }
}

fn grant_json(grant: &Grant) -> Value {
    json!({
        "Grantee": grant.grantee().map(|g| json!({
            "Type": g.r#type().as_str(),
            "ID": g.id(),
            "URI": g.uri(),
            "DisplayName": g.display_name(),
            "EmailAddress": g.email_address(),
        })),
        "Permission": grant.permission().map(|p| p.as_str()),
    })
}

fn encryption_rule_json(rule: &ServerSideEncryptionRule) -> Value {
    json!({
        "ApplyServerSideEncryptionByDefault": rule.apply_server_side_encryption_by_default().map(|d| json!({
            "SSEAlgorithm": d.sse_algorithm().as_str(),
            "KMSMasterKeyID": d.kms_master_key_id(),
        })),
        "BucketKeyEnabled": rule.bucket_key_enabled(),
    })
}

fn lifecycle_rule_json(rule: &LifecycleRule) -> Value {
    json!({
        "ID": rule.id(),
        "Status": rule.status().as_str(),
        "Expiration": rule.expiration().map(|e| json!({
            "Days": e.days(),
            "ExpiredObjectDeleteMarker": e.expired_object_delete_marker(),
        })),
        "Transitions": rule.transitions().iter().map(|t| json!({
            "Days": t.days(),
            "StorageClass": t.storage_class().map(|c| c.as_str()),
        })).collect::<Vec<_>>(),
        "NoncurrentVersionExpiration": rule.noncurrent_version_expiration().map(|e| json!({
            "NoncurrentDays": e.noncurrent_days(),
        })),
        "AbortIncompleteMultipartUpload": rule.abort_incomplete_multipart_upload().map(|a| json!({
            "DaysAfterInitiation": a.days_after_initiation(),
        })),
    })
}

fn replication_rule_json(rule: &ReplicationRule) -> Value {
    json!({
        "ID": rule.id(),
        "Priority": rule.priority(),
        "Status": rule.status().as_str(),
        "Destination": rule.destination().map(|d| json!({
            "Bucket": d.bucket(),
            "Account": d.account(),
            "StorageClass": d.storage_class().map(|c| c.as_str()),
        })),
    })
}

fn public_access_block_json(configuration: &PublicAccessBlockConfiguration) -> Value {
    json!({
        "BlockPublicAcls": configuration.block_public_acls(),
        "IgnorePublicAcls": configuration.ignore_public_acls(),
        "BlockPublicPolicy": configuration.block_public_policy(),
        "RestrictPublicBuckets": configuration.restrict_public_buckets(),
    })
}
