use std::fmt;

use async_trait::async_trait;
use aws_sdk_lambda::types::FunctionConfiguration;
use infracheck_core::{LookupError, LookupRequest, ResourceCategory, ResourceDescription};
use infracheck_provider::{ResourceFetcher, unsupported_resource_type};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::auth::build_sdk_config;
use crate::config::AwsBaseConfig;
use crate::error::{AwsFetchError, sdk_error};
use crate::json::{require_key, strings};

const CATEGORY: ResourceCategory = ResourceCategory::Lambda;

/// Describes Lambda functions via `GetFunction`.
///
/// The key is a function name or ARN; an optional `qualifier` parameter
/// selects a version or alias. The description keeps the response layout:
/// `Configuration`, `Code` and `Tags`.
pub struct LambdaFetcher {
    client: aws_sdk_lambda::Client,
}

impl fmt::Debug for LambdaFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LambdaFetcher")
            .field("client", &"<LambdaClient>")
            .finish()
    }
}

impl LambdaFetcher {
    pub async fn new(config: &AwsBaseConfig) -> Self {
        let sdk_config = build_sdk_config(config).await;
        Self::from_sdk_config(&sdk_config)
    }

    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::with_client(aws_sdk_lambda::Client::new(sdk_config))
    }

    /// Create a fetcher around a pre-built client (for testing).
    pub fn with_client(client: aws_sdk_lambda::Client) -> Self {
        Self { client }
    }

    async fn function(&self, request: &LookupRequest) -> Result<Value, AwsFetchError> {
        let name = require_key(request, "a function name")?;
        let qualifier = request.get_param("qualifier");
        debug!(function_name = name, qualifier, "fetching Lambda function");

        let output = self
            .client
            .get_function()
            .function_name(name)
            .set_qualifier(qualifier.map(str::to_owned))
            .send()
            .await
            .map_err(|e| sdk_error(CATEGORY, "get_function", &e))?;

        let configuration = output
            .configuration()
            .ok_or_else(|| AwsFetchError::Empty(format!("function {name}")))?;
        Ok(json!({
            "Configuration": configuration_json(configuration),
            "Code": output.code().map(|c| json!({
                "RepositoryType": c.repository_type(),
                "ImageUri": c.image_uri(),
            })),
            "Tags": output.tags(),
        }))
    }
}

#[async_trait]
impl ResourceFetcher for LambdaFetcher {
    fn category(&self) -> ResourceCategory {
        CATEGORY
    }

    fn supported_resource_types(&self) -> Vec<String> {
        vec!["function".to_owned()]
    }

    #[instrument(skip_all, fields(resource_type = %request.resource_type, key = %request.key))]
    async fn fetch(&self, request: &LookupRequest) -> Result<ResourceDescription, LookupError> {
        match request.resource_type.as_str() {
            "function" => Ok(ResourceDescription::new(self.function(request).await?)),
            _ => Err(unsupported_resource_type(request)),
        }
    }
}

fn configuration_json(configuration: &FunctionConfiguration) -> Value {
    json!({
        "FunctionName": configuration.function_name(),
        "FunctionArn": configuration.function_arn(),
        "Runtime": configuration.runtime().map(|r| r.as_str()),
        "Role": configuration.role(),
        "Handler": configuration.handler(),
        "CodeSize": configuration.code_size(),
        "Description": configuration.description(),
        "Timeout": configuration.timeout(),
        "MemorySize": configuration.memory_size(),
        "LastModified": configuration.last_modified(),
        "Version": configuration.version(),
        "KMSKeyArn": configuration.kms_key_arn(),
        "State": configuration.state().map(|s| s.as_str()),
        "PackageType": configuration.package_type().map(|p| p.as_str()),
        "Architectures": configuration.architectures().iter().map(|a| a.as_str()).collect::<Vec<_>>(),
        "VpcConfig": configuration.vpc_config().map(|v| json!({
            "VpcId": v.vpc_id(),
            "SubnetIds": strings(v.subnet_ids()),
            "SecurityGroupIds": strings(v.security_group_ids()),
        })),
        "Environment": configuration.environment().map(|e| json!({
            "Variables": e.variables(),
        })),
        "TracingConfig": configuration.tracing_config().map(|t| json!({
            "Mode": t.mode().map(|m| m.as_str()),
        })),
        "DeadLetterConfig": configuration.dead_letter_config().map(|d| json!({
            "TargetArn": d.target_arn(),
        })),
        "Layers": configuration.layers().iter().map(|l| json!({
            "Arn": l.arn(),
            "CodeSize": l.code_size(),
        })).collect::<Vec<_>>(),
    })
}
