use async_trait::async_trait;
use infracheck_core::{LookupError, LookupRequest, ResourceCategory, ResourceDescription};
use infracheck_provider::{ResourceFetcher, unsupported_resource_type};
use serde_json::{Value, json};
use tracing::instrument;

use crate::auth::build_sdk_config;
use crate::config::AwsBaseConfig;
use crate::error::{AwsFetchError, sdk_error};
use crate::json::{require_key, strings};

const CATEGORY: ResourceCategory = ResourceCategory::Route53;

/// Describes hosted zones by zone id.
pub struct Route53Fetcher {
    client: aws_sdk_route53::Client,
}

impl Route53Fetcher {
    pub async fn new(config: &AwsBaseConfig) -> Self {
        let sdk_config = build_sdk_config(config).await;
        Self::from_sdk_config(&sdk_config)
    }

    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::with_client(aws_sdk_route53::Client::new(sdk_config))
    }

    pub fn with_client(client: aws_sdk_route53::Client) -> Self {
        Self { client }
    }

    async fn hosted_zone(&self, request: &LookupRequest) -> Result<Value, AwsFetchError> {
        let zone_id = normalize_zone_id(require_key(request, "a hosted zone id")?);
        let output = self
            .client
            .get_hosted_zone()
            .id(zone_id)
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "get_hosted_zone", &e))?;
        let zone = output
            .hosted_zone()
            .ok_or_else(|| AwsFetchError::Empty(format!("hosted zone {zone_id}")))?;

        Ok(json!({
            "HostedZone": {
                "Id": zone.id(),
                "Name": zone.name(),
                "CallerReference": zone.caller_reference(),
                "ResourceRecordSetCount": zone.resource_record_set_count(),
                "Config": zone.config().map(|c| json!({
                    "Comment": c.comment(),
                    "PrivateZone": c.private_zone(),
                })),
            },
            "VPCs": output.vpcs().iter().map(|v| json!({
                "VPCRegion": v.vpc_region().map(|r| r.as_str()),
                "VPCId": v.vpc_id(),
            })).collect::<Vec<_>>(),
            "DelegationSet": output.delegation_set().map(|d| json!({
                "NameServers": strings(d.name_servers()),
            })),
        }))
    }
}

#[async_trait]
impl ResourceFetcher for Route53Fetcher {
    fn category(&self) -> ResourceCategory {
        CATEGORY
    }

    fn supported_resource_types(&self) -> Vec<String> {
        vec!["hosted_zone".to_owned()]
    }

    #[instrument(skip_all, fields(resource_type = %request.resource_type, key = %request.key))]
    async fn fetch(&self, request: &LookupRequest) -> Result<ResourceDescription, LookupError> {
        match request.resource_type.as_str() {
            "hosted_zone" => Ok(ResourceDescription::new(self.hosted_zone(request).await?)),
            _ => Err(unsupported_resource_type(request)),
        }
    }
}

/// Accept both `Z123` and the `/hostedzone/Z123` form Terraform outputs.
fn normalize_zone_id(id: &str) -> &str {
    id.strip_prefix("/hostedzone/").unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_id_prefix_is_stripped() {
        assert_eq!(normalize_zone_id("/hostedzone/Z0123ABC"), "Z0123ABC");
        assert_eq!(normalize_zone_id("Z0123ABC"), "Z0123ABC");
    }
}
