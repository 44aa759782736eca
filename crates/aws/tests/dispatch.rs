//! Request dispatch checks that fail before any network call is made.
#![cfg(all(feature = "ec2", feature = "iam", feature = "logs"))]

use aws_config::{BehaviorVersion, Region, SdkConfig};
use infracheck_aws::{AwsBaseConfig, Ec2Fetcher, IamFetcher, LogsFetcher};
use infracheck_core::{ErrorKind, LookupRequest, ResourceCategory};
use infracheck_provider::ResourceFetcher;

fn offline_config() -> SdkConfig {
    SdkConfig::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .build()
}

#[tokio::test]
async fn unknown_resource_type_is_invalid_input() {
    let fetcher = Ec2Fetcher::from_sdk_config(&offline_config());
    let err = fetcher
        .fetch(&LookupRequest::by_id(ResourceCategory::Ec2, "instance", "i-0abc"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
    assert!(err.message.contains("instance"));
}

#[tokio::test]
async fn vpc_lookup_needs_an_id() {
    let fetcher = Ec2Fetcher::from_sdk_config(&offline_config());
    let err = fetcher
        .fetch(&LookupRequest::unscoped(ResourceCategory::Ec2, "vpc"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
    assert!(err.message.contains("VPC id"));
}

#[tokio::test]
async fn inline_policy_needs_policy_name() {
    let fetcher = IamFetcher::from_sdk_config(&offline_config());
    let err = fetcher
        .fetch(&LookupRequest::by_name(ResourceCategory::Iam, "role_inline_policy", "ci-runner"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
    assert!(err.message.contains("policy_name"));
}

#[tokio::test]
async fn unscoped_log_groups_need_prefix() {
    let fetcher = LogsFetcher::from_sdk_config(&offline_config());
    let err = fetcher
        .fetch(&LookupRequest::unscoped(ResourceCategory::CloudWatchLogs, "log_groups"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
}

#[tokio::test]
async fn registry_routes_enabled_services() {
    let config = AwsBaseConfig::new("eu-west-1").with_endpoint_url("http://127.0.0.1:4566");
    let registry = infracheck_aws::registry(&config).await;

    assert!(registry.get(ResourceCategory::Ec2).is_some());
    assert!(registry.get(ResourceCategory::Iam).is_some());
    assert!(
        registry
            .supported_resource_types()
            .contains(&"ec2/route_tables".to_owned())
    );

    let err = registry
        .fetch(&LookupRequest::by_id(ResourceCategory::Ec2, "vpc_peering", "pcx-1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
}
