use async_trait::async_trait;
use aws_sdk_wafv2::types::{DefaultAction, Rule, RuleAction, Scope, WebAcl, WebAclSummary};
use infracheck_core::{LookupError, LookupRequest, ResourceCategory, ResourceDescription};
use infracheck_provider::{ResourceFetcher, unsupported_resource_type};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::auth::build_sdk_config;
use crate::config::AwsBaseConfig;
use crate::error::{AwsFetchError, sdk_error};
use crate::json::require_key;

const CATEGORY: ResourceCategory = ResourceCategory::Wafv2;

/// Describes WAFv2 web ACLs.
///
/// `web_acl` is keyed by ACL name and honours a `scope` parameter
/// (`REGIONAL`, the default, or `CLOUDFRONT`) and an optional `id` parameter
/// that skips the name lookup. `web_acl_for_resource` is keyed
/// by the protected resource's ARN.
pub struct Wafv2Fetcher {
    client: aws_sdk_wafv2::Client,
}

impl Wafv2Fetcher {
    pub async fn new(config: &AwsBaseConfig) -> Self {
        let sdk_config = build_sdk_config(config).await;
        Self::from_sdk_config(&sdk_config)
    }

    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::with_client(aws_sdk_wafv2::Client::new(sdk_config))
    }

    /// Create a fetcher around a pre-built client (for testing).
    pub fn with_client(client: aws_sdk_wafv2::Client) -> Self {
        Self { client }
    }

    /// `GetWebACL` needs the id; without an `id` parameter, list the scope
    /// and match on name first.
    async fn web_acl(&self, name: &str, scope: Scope, id: Option<&str>) -> Result<Value, AwsFetchError> {
        let id = match id {
            Some(id) => id.to_owned(),
            None => self.resolve_acl_id(name, &scope).await?,
        };

        let output = self
            .client
            .get_web_acl()
            .name(name)
            .scope(scope)
            .id(&id)
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "get_web_acl", &e))?;
        let acl = output
            .web_acl()
            .ok_or_else(|| AwsFetchError::Empty(format!("web ACL {name}")))?;
        Ok(json!({ "WebACL": web_acl_json(acl) }))
    }

    async fn resolve_acl_id(&self, name: &str, scope: &Scope) -> Result<String, AwsFetchError> {
        let mut marker: Option<String> = None;
        let id = loop {
            let page = self
                .client
                .list_web_acls()
                .scope(scope.clone())
                .set_next_marker(marker.take())
                .send()
                .await
                .map_err(|e| sdk_error(CATEGORY, "list_web_acls", &e))?;
            if let Some(id) = find_acl_id(page.web_acls(), name) {
                break id.to_owned();
            }
            match page.next_marker() {
                Some(next) if !page.web_acls().is_empty() => marker = Some(next.to_owned()),
                _ => return Err(AwsFetchError::Empty(format!("web ACL {name}"))),
            }
        };
        debug!(name, id, "resolved web ACL id");
        Ok(id)
    }

    async fn web_acl_for_resource(&self, resource_arn: &str) -> Result<Value, AwsFetchError> {
        let output = self
            .client
            .get_web_acl_for_resource()
            .resource_arn(resource_arn)
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "get_web_acl_for_resource", &e))?;
        let acl = output
            .web_acl()
            .ok_or_else(|| AwsFetchError::Empty(format!("web ACL for {resource_arn}")))?;
        Ok(json!({ "WebACL": web_acl_json(acl) }))
    }

    async fn describe(&self, request: &LookupRequest) -> Result<Value, AwsFetchError> {
        match request.resource_type.as_str() {
            "web_acl" => {
                let scope = parse_scope(request.get_param("scope"))?;
                self.web_acl(
                    require_key(request, "a web ACL name")?,
                    scope,
                    request.get_param("id"),
                )
                .await
            }
            "web_acl_for_resource" => {
                self.web_acl_for_resource(require_key(request, "a resource ARN")?)
                    .await
            }
            _ => Err(AwsFetchError::InvalidInput(
                unsupported_resource_type(request).message,
            )),
        }
    }
}

#[async_trait]
impl ResourceFetcher for Wafv2Fetcher {
    fn category(&self) -> ResourceCategory {
        CATEGORY
    }

    fn supported_resource_types(&self) -> Vec<String> {
        vec!["web_acl".to_owned(), "web_acl_for_resource".to_owned()]
    }

    #[instrument(skip_all, fields(resource_type = %request.resource_type, key = %request.key))]
    async fn fetch(&self, request: &LookupRequest) -> Result<ResourceDescription, LookupError> {
        Ok(ResourceDescription::new(self.describe(request).await?))
    }
}

fn parse_scope(scope: Option<&str>) -> Result<Scope, AwsFetchError> {
    match scope.map(str::to_ascii_uppercase).as_deref() {
        None | Some("REGIONAL") => Ok(Scope::Regional),
        Some("CLOUDFRONT") => Ok(Scope::Cloudfront),
        Some(other) => Err(AwsFetchError::InvalidInput(format!(
            "unknown WAF scope '{other}' (expected REGIONAL or CLOUDFRONT)"
        ))),
    }
}

fn find_acl_id<'a>(summaries: &'a [WebAclSummary], name: &str) -> Option<&'a str> {
    summaries
        .iter()
        .find(|s| s.name() == Some(name))
        .and_then(WebAclSummary::id)
}

fn default_action_name(action: &DefaultAction) -> Option<&'static str> {
    if action.allow().is_some() {
        Some("Allow")
    } else if action.block().is_some() {
        Some("Block")
    } else {
        None
    }
}

fn rule_action_name(action: &RuleAction) -> Option<&'static str> {
    if action.allow().is_some() {
        Some("Allow")
    } else if action.block().is_some() {
        Some("Block")
    } else if action.count().is_some() {
        Some("Count")
    } else if action.captcha().is_some() {
        Some("Captcha")
    } else if action.challenge().is_some() {
        Some("Challenge")
    } else {
        None
    }
}

fn rule_json(rule: &Rule) -> Value {
    json!({
        "Name": rule.name(),
        "Priority": rule.priority(),
        "Action": rule.action().and_then(rule_action_name),
        "OverrideAction": rule.override_action().map(|o| if o.none().is_some() { "None" } else { "Count" }),
        "VisibilityConfig": rule.visibility_config().map(|v| json!({
            "MetricName": v.metric_name(),
            "CloudWatchMetricsEnabled": v.cloud_watch_metrics_enabled(),
            "SampledRequestsEnabled": v.sampled_requests_enabled(),
        })),
    })
}

fn web_acl_json(acl: &WebAcl) -> Value {
    json!({
        "Name": acl.name(),
        "Id": acl.id(),
        "ARN": acl.arn(),
        "Description": acl.description(),
        "Capacity": acl.capacity(),
        "DefaultAction": acl.default_action().and_then(default_action_name),
        "Rules": acl.rules().iter().map(rule_json).collect::<Vec<_>>(),
        "VisibilityConfig": acl.visibility_config().map(|v| json!({
            "MetricName": v.metric_name(),
            "CloudWatchMetricsEnabled": v.cloud_watch_metrics_enabled(),
            "SampledRequestsEnabled": v.sampled_requests_enabled(),
        })),
    })
}

#[cfg(test)]
mod tests {
    use aws_sdk_wafv2::types::{AllowAction, BlockAction};

    use super::*;

    #[test]
    fn scope_defaults_to_regional() {
        assert_eq!(parse_scope(None).unwrap(), Scope::Regional);
        assert_eq!(parse_scope(Some("cloudfront")).unwrap(), Scope::Cloudfront);
        assert!(parse_scope(Some("GLOBAL")).is_err());
    }

    #[test]
    fn acl_id_found_by_name() {
        let summaries = [
            WebAclSummary::builder().name("edge").id("id-edge").build(),
            WebAclSummary::builder().name("api").id("id-api").build(),
        ];
        assert_eq!(find_acl_id(&summaries, "api"), Some("id-api"));
        assert_eq!(find_acl_id(&summaries, "admin"), None);
    }

    #[test]
    fn action_names() {
        let allow = DefaultAction::builder().allow(AllowAction::builder().build()).build();
        assert_eq!(default_action_name(&allow), Some("Allow"));
        let block = RuleAction::builder().block(BlockAction::builder().build()).build();
        assert_eq!(rule_action_name(&block), Some("Block"));
        assert_eq!(rule_action_name(&RuleAction::builder().build()), None);
    }
}
