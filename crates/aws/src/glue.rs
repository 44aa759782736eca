use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_glue::types::{Connection, ConnectionPropertyKey, Crawler, Job, Trigger};
use infracheck_core::{LookupError, LookupRequest, ResourceCategory, ResourceDescription};
use infracheck_provider::{ResourceFetcher, unsupported_resource_type};
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};

use crate::auth::build_sdk_config;
use crate::config::AwsBaseConfig;
use crate::error::{AwsFetchError, sdk_error};
use crate::json::{require_key, strings};

const CATEGORY: ResourceCategory = ResourceCategory::Glue;

const RESOURCE_TYPES: &[&str] = &["crawler", "job", "connection", "trigger"];

/// Describes Glue crawlers, jobs, connections and triggers by name.
///
/// Connection passwords are never requested.
pub struct GlueFetcher {
    client: aws_sdk_glue::Client,
}

impl GlueFetcher {
    pub async fn new(config: &AwsBaseConfig) -> Self {
        let sdk_config = build_sdk_config(config).await;
        Self::from_sdk_config(&sdk_config)
    }

    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::with_client(aws_sdk_glue::Client::new(sdk_config))
    }

    /// Create a fetcher around a pre-built client (for testing).
    pub fn with_client(client: aws_sdk_glue::Client) -> Self {
        Self { client }
    }

    async fn describe(&self, request: &LookupRequest) -> Result<Value, AwsFetchError> {
        let name = require_key(request, "a name")?;
        debug!(name, "describing Glue resource");

        match request.resource_type.as_str() {
            "crawler" => {
                let output = self
                    .client
                    .get_crawler()
                    .name(name)
                    .send()
                    .await
                    .map_err(|e| sdk_error(CATEGORY, "get_crawler", &e))?;
                let crawler = output
                    .crawler()
                    .ok_or_else(|| AwsFetchError::Empty(format!("crawler {name}")))?;
                Ok(json!({ "Crawler": crawler_json(crawler) }))
            }
            "job" => {
                let output = self
                    .client
                    .get_job()
                    .job_name(name)
                    .send()
                    .await
                    .map_err(|e| sdk_error(CATEGORY, "get_job", &e))?;
                let job = output.job().ok_or_else(|| AwsFetchError::Empty(format!("job {name}")))?;
                Ok(json!({ "Job": job_json(job) }))
            }
            "connection" => {
                let output = self
                    .client
                    .get_connection()
                    .name(name)
                    .hide_password(true)
                    .send()
                    .await
                    .map_err(|e| sdk_error(CATEGORY, "get_connection", &e))?;
                let connection = output
                    .connection()
                    .ok_or_else(|| AwsFetchError::Empty(format!("connection {name}")))?;
                Ok(json!({ "Connection": connection_json(connection) }))
            }
            "trigger" => {
                let output = self
                    .client
                    .get_trigger()
                    .name(name)
                    .send()
                    .await
                    .map_err(|e| sdk_error(CATEGORY, "get_trigger", &e))?;
                let trigger = output
                    .trigger()
                    .ok_or_else(|| AwsFetchError::Empty(format!("trigger {name}")))?;
                Ok(json!({ "Trigger": trigger_json(trigger) }))
            }
            _ => Err(AwsFetchError::InvalidInput(
                unsupported_resource_type(request).message,
            )),
        }
    }
}

#[async_trait]
impl ResourceFetcher for GlueFetcher {
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

fn crawler_json(crawler: &Crawler) -> Value {
    json!({
        "Name": crawler.name(),
        "Role": crawler.role(),
        "DatabaseName": crawler.database_name(),
        "Description": crawler.description(),
        "TablePrefix": crawler.table_prefix(),
        "State": crawler.state().map(|s| s.as_str()),
        "Schedule": crawler.schedule().map(|s| json!({
            "ScheduleExpression": s.schedule_expression(),
        })),
        "Targets": crawler.targets().map(|t| json!({
            "S3Targets": t.s3_targets().iter().map(|s| json!({ "Path": s.path() })).collect::<Vec<_>>(),
        })),
    })
}

fn job_json(job: &Job) -> Value {
    json!({
        "Name": job.name(),
        "Role": job.role(),
        "Description": job.description(),
        "GlueVersion": job.glue_version(),
        "WorkerType": job.worker_type().map(|w| w.as_str()),
        "NumberOfWorkers": job.number_of_workers(),
        "Timeout": job.timeout(),
        "MaxRetries": job.max_retries(),
        "Command": job.command().map(|c| json!({
            "Name": c.name(),
            "ScriptLocation": c.script_location(),
            "PythonVersion": c.python_version(),
        })),
        "DefaultArguments": job.default_arguments(),
        "Connections": job.connections().map(|c| json!({
            "Connections": strings(c.connections()),
        })),
    })
}

fn connection_properties(properties: &HashMap<ConnectionPropertyKey, String>) -> Map<String, Value> {
    properties
        .iter()
        .map(|(k, v)| (k.as_str().to_owned(), Value::String(v.clone())))
        .collect()
}

fn connection_json(connection: &Connection) -> Value {
    json!({
        "Name": connection.name(),
        "Description": connection.description(),
        "ConnectionType": connection.connection_type().map(|t| t.as_str()),
        "ConnectionProperties": connection.connection_properties().map(connection_properties),
        "PhysicalConnectionRequirements": connection.physical_connection_requirements().map(|p| json!({
            "SubnetId": p.subnet_id(),
            "SecurityGroupIdList": strings(p.security_group_id_list()),
            "AvailabilityZone": p.availability_zone(),
        })),
    })
}

fn trigger_json(trigger: &Trigger) -> Value {
    json!({
        "Name": trigger.name(),
        "Type": trigger.r#type().map(|t| t.as_str()),
        "State": trigger.state().map(|s| s.as_str()),
        "Schedule": trigger.schedule(),
        "Description": trigger.description(),
        "Actions": trigger.actions().iter().map(|a| json!({
            "JobName": a.job_name(),
            "CrawlerName": a.crawler_name(),
        })).collect::<Vec<_>>(),
    })
}
