use async_trait::async_trait;
use aws_sdk_eventbridge::types::Target;
use infracheck_core::{LookupError, LookupRequest, ResourceCategory, ResourceDescription};
use infracheck_provider::{ResourceFetcher, unsupported_resource_type};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::auth::build_sdk_config;
use crate::config::AwsBaseConfig;
use crate::error::{AwsFetchError, sdk_error};
use crate::json::require_key;

const CATEGORY: ResourceCategory = ResourceCategory::EventBridge;

/// Describes `EventBridge` rules and their targets.
///
/// Rules on a custom bus need the `event_bus_name` parameter; the default bus
/// is assumed otherwise.
pub struct EventBridgeFetcher {
    client: aws_sdk_eventbridge::Client,
}

impl EventBridgeFetcher {
    pub async fn new(config: &AwsBaseConfig) -> Self {
        let sdk_config = build_sdk_config(config).await;
        Self::from_sdk_config(&sdk_config)
    }

    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::with_client(aws_sdk_eventbridge::Client::new(sdk_config))
    }

    /// Create a fetcher around a pre-built client (for testing).
    pub fn with_client(client: aws_sdk_eventbridge::Client) -> Self {
        Self { client }
    }

    async fn describe(&self, request: &LookupRequest) -> Result<Value, AwsFetchError> {
        let rule = require_key(request, "a rule name")?;
        let bus = request.get_param("event_bus_name").map(str::to_owned);
        debug!(rule, event_bus = bus.as_deref().unwrap_or("default"), "describing EventBridge rule");

        match request.resource_type.as_str() {
            "rule" => {
                let output = self
                    .client
                    .describe_rule()
                    .name(rule)
                    .set_event_bus_name(bus)
                    .send()
                    .await
                    .map_err(|e| sdk_error(CATEGORY, "describe_rule", &e))?;
                Ok(json!({
                    "Name": output.name(),
                    "Arn": output.arn(),
                    "EventPattern": output.event_pattern(),
                    "ScheduleExpression": output.schedule_expression(),
                    "State": output.state().map(|s| s.as_str()),
                    "Description": output.description(),
                    "RoleArn": output.role_arn(),
                    "ManagedBy": output.managed_by(),
                    "EventBusName": output.event_bus_name(),
                }))
            }
            "rule_targets" => {
                let output = self
                    .client
                    .list_targets_by_rule()
                    .rule(rule)
                    .set_event_bus_name(bus)
                    .send()
                    .await
                    .map_err(|e| sdk_error(CATEGORY, "list_targets_by_rule", &e))?;
                Ok(json!({ "Targets": output.targets().iter().map(target_json).collect::<Vec<_>>() }))
            }
            _ => Err(AwsFetchError::InvalidInput(
                unsupported_resource_type(request).message,
            )),
        }
    }
}

#[async_trait]
impl ResourceFetcher for EventBridgeFetcher {
    fn category(&self) -> ResourceCategory {
        CATEGORY
    }

    fn supported_resource_types(&self) -> Vec<String> {
        vec!["rule".to_owned(), "rule_targets".to_owned()]
    }

    #[instrument(skip_all, fields(resource_type = %request.resource_type, key = %request.key))]
    async fn fetch(&self, request: &LookupRequest) -> Result<ResourceDescription, LookupError> {
        Ok(ResourceDescription::new(self.describe(request).await?))
    }
}

fn target_json(target: &Target) -> Value {
    json!({
        "Id": target.id(),
        "Arn": target.arn(),
        "RoleArn": target.role_arn(),
        "Input": target.input(),
        "InputPath": target.input_path(),
        "DeadLetterConfig": target.dead_letter_config().map(|d| json!({ "Arn": d.arn() })),
        "RetryPolicy": target.retry_policy().map(|r| json!({
            "MaximumRetryAttempts": r.maximum_retry_attempts(),
            "MaximumEventAgeInSeconds": r.maximum_event_age_in_seconds(),
        })),
    })
}

#[cfg(test)]
mod tests {
    use aws_sdk_eventbridge::types::RetryPolicy;

    use super::*;

    #[test]
    fn target_retry_policy() {
        let target = Target::builder()
            .id("ingest")
            .arn("arn:aws:lambda:us-east-1:123456789012:function:ingest")
            .retry_policy(RetryPolicy::builder().maximum_retry_attempts(2).build())
            .build()
            .unwrap();
        let value = target_json(&target);
        assert_eq!(value["Id"], "ingest");
        assert_eq!(value["RetryPolicy"]["MaximumRetryAttempts"], 2);
        assert!(value["DeadLetterConfig"].is_null());
    }
}
