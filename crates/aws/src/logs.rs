use async_trait::async_trait;
use aws_sdk_cloudwatchlogs::operation::describe_log_groups::DescribeLogGroupsOutput;
use aws_sdk_cloudwatchlogs::types::LogGroup;
use infracheck_core::{LookupError, LookupRequest, ResourceCategory, ResourceDescription, ResourceKey};
use infracheck_provider::{ResourceFetcher, unsupported_resource_type};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::auth::build_sdk_config;
use crate::config::AwsBaseConfig;
use crate::error::{AwsFetchError, sdk_error};
use crate::json::non_empty;

const CATEGORY: ResourceCategory = ResourceCategory::CloudWatchLogs;

/// Describes CloudWatch log groups.
///
/// A named key returns only the group with that exact name. An unscoped
/// request with a `prefix` parameter returns every group under the prefix.
pub struct LogsFetcher {
    client: aws_sdk_cloudwatchlogs::Client,
}

impl LogsFetcher {
    pub async fn new(config: &AwsBaseConfig) -> Self {
        let sdk_config = build_sdk_config(config).await;
        Self::from_sdk_config(&sdk_config)
    }

    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::with_client(aws_sdk_cloudwatchlogs::Client::new(sdk_config))
    }

    /// Create a fetcher around a pre-built client (for testing).
    pub fn with_client(client: aws_sdk_cloudwatchlogs::Client) -> Self {
        Self { client }
    }

    async fn log_groups(&self, request: &LookupRequest) -> Result<Value, AwsFetchError> {
        let (prefix, exact) = match (&request.key, request.get_param("prefix")) {
            (ResourceKey::Unscoped, Some(prefix)) => (prefix, false),
            (ResourceKey::Unscoped, None) => {
                return Err(AwsFetchError::InvalidInput(
                    "log_groups lookup requires a log group name or a 'prefix' parameter".into(),
                ));
            }
            (key, _) => (key.value().unwrap_or_default(), true),
        };
        debug!(prefix, exact, "describing log groups");

        let groups = self.all_log_groups(prefix).await?;
        let groups = select_groups(&groups, prefix, exact);
        non_empty(&groups, || format!("log group {prefix}"))?;
        Ok(json!({ "logGroups": groups.into_iter().map(log_group_json).collect::<Vec<_>>() }))
    }

    async fn all_log_groups(&self, prefix: &str) -> Result<Vec<LogGroup>, AwsFetchError> {
        let mut groups = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self
                .client
                .describe_log_groups()
                .log_group_name_prefix(prefix)
                .set_next_token(token.take())
                .send()
                .await
                .map_err(|e| sdk_error(CATEGORY, "describe_log_groups", &e))?;
            groups.extend_from_slice(page.log_groups());
            match next_page(&page) {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        debug!(prefix, count = groups.len(), "listed log groups");
        Ok(groups)
    }
}

#[async_trait]
impl ResourceFetcher for LogsFetcher {
    fn category(&self) -> ResourceCategory {
        CATEGORY
    }

    fn supported_resource_types(&self) -> Vec<String> {
        vec!["log_groups".to_owned()]
    }

    #[instrument(skip_all, fields(resource_type = %request.resource_type, key = %request.key))]
    async fn fetch(&self, request: &LookupRequest) -> Result<ResourceDescription, LookupError> {
        match request.resource_type.as_str() {
            "log_groups" => Ok(ResourceDescription::new(self.log_groups(request).await?)),
            _ => Err(unsupported_resource_type(request)),
        }
    }
}

/// Continue only while the service hands back a token with a non-empty page.
fn next_page(page: &DescribeLogGroupsOutput) -> Option<String> {
    page.next_token()
        .filter(|t| !t.is_empty() && !page.log_groups().is_empty())
        .map(str::to_owned)
}

/// The prefix query also returns longer names; keep only the exact match
/// when a name was asked for.
fn select_groups<'a>(groups: &'a [LogGroup], name: &str, exact: bool) -> Vec<&'a LogGroup> {
    groups
        .iter()
        .filter(|g| !exact || g.log_group_name() == Some(name))
        .collect()
}

// The logs API uses camelCase field names.
fn log_group_json(group: &LogGroup) -> Value {
    json!({
        "logGroupName": group.log_group_name(),
        "arn": group.arn(),
        "creationTime": group.creation_time(),
        "retentionInDays": group.retention_in_days(),
        "metricFilterCount": group.metric_filter_count(),
        "kmsKeyId": group.kms_key_id(),
        "logGroupClass": group.log_group_class().map(|c| c.as_str()),
    })
}
