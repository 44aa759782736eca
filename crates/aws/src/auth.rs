use tracing::{debug, info};

use crate::config::AwsBaseConfig;

/// Resolve the SDK configuration every fetcher is built from.
///
/// Credentials come from the standard environment chain. When `role_arn` is
/// set the chain is used only to call STS, and the fetchers run with the
/// assumed role's auto-refreshing credentials.
///
/// ```no_run
/// use infracheck_aws::auth::build_sdk_config;
/// use infracheck_aws::config::AwsBaseConfig;
///
/// # async fn example() {
/// let config = AwsBaseConfig::new("us-east-1").with_endpoint_url("http://localhost:4566");
/// let sdk_config = build_sdk_config(&config).await;
/// # }
/// ```
pub async fn build_sdk_config(config: &AwsBaseConfig) -> aws_config::SdkConfig {
    let base_config = loader(config).load().await;

    let Some(role_arn) = &config.role_arn else {
        return base_config;
    };

    info!(role_arn = %role_arn, session_name = config.session_name(), "assuming validation role via STS");

    let mut provider_builder = aws_config::sts::AssumeRoleProvider::builder(role_arn)
        .session_name(config.session_name())
        .region(aws_config::Region::new(config.region.clone()));
    if let Some(external_id) = &config.external_id {
        provider_builder = provider_builder.external_id(external_id);
    }
    let assume_role_provider = provider_builder.configure(&base_config).build().await;

    loader(config)
        .credentials_provider(assume_role_provider)
        .load()
        .await
}

fn loader(config: &AwsBaseConfig) -> aws_config::ConfigLoader {
    let mut loader = aws_config::from_env().region(aws_config::Region::new(config.region.clone()));
    if let Some(endpoint) = &config.endpoint_url {
        debug!(endpoint = %endpoint, "using custom AWS endpoint");
        loader = loader.endpoint_url(endpoint);
    }
    loader
}
