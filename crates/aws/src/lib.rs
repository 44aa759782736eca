//! AWS resource fetchers for infracheck.
//!
//! Each service lives behind a cargo feature and turns SDK responses into
//! JSON descriptions that keep the API's own field names:
//!
//! - **EC2** (`ec2`): VPCs, subnets, route tables, gateways, endpoints,
//!   security groups, transit gateways
//! - **IAM** (`iam`): roles, users, groups, policies and versions, account settings
//! - **KMS** (`kms`): key metadata, policy, tags, rotation, grants
//! - **S3** (`s3`): bucket policy, ACL, encryption, lifecycle, replication,
//!   versioning, tagging, public access block
//! - **Lambda** (`lambda`), **CloudWatch Logs** (`logs`), **`EventBridge`**
//!   (`eventbridge`), **Route 53** (`route53`), **Glue** (`glue`), **Athena**
//!   (`athena`), **WAFv2** (`wafv2`), **Organizations** (`organizations`)
//!
//! All fetchers share one [`AwsBaseConfig`](config::AwsBaseConfig) for
//! region, endpoint override and optional STS assume-role credentials.
//! [`registry`] builds every enabled fetcher from a single SDK config.

pub mod auth;
pub mod config;
pub mod error;
#[cfg_attr(not(feature = "full"), allow(dead_code))]
mod json;

#[cfg(feature = "athena")]
pub mod athena;
#[cfg(feature = "ec2")]
pub mod ec2;
#[cfg(feature = "eventbridge")]
pub mod eventbridge;
#[cfg(feature = "glue")]
pub mod glue;
#[cfg(feature = "iam")]
pub mod iam;
#[cfg(feature = "kms")]
pub mod kms;
#[cfg(feature = "lambda")]
pub mod lambda;
#[cfg(feature = "logs")]
pub mod logs;
#[cfg(feature = "organizations")]
pub mod organizations;
#[cfg(feature = "route53")]
pub mod route53;
#[cfg(feature = "s3")]
pub mod s3;
#[cfg(feature = "wafv2")]
pub mod wafv2;

use infracheck_provider::FetcherRegistry;

pub use config::AwsBaseConfig;
pub use error::{AwsFetchError, sdk_error};

#[cfg(feature = "athena")]
pub use athena::AthenaFetcher;
#[cfg(feature = "ec2")]
pub use ec2::Ec2Fetcher;
#[cfg(feature = "eventbridge")]
pub use eventbridge::EventBridgeFetcher;
#[cfg(feature = "glue")]
pub use glue::GlueFetcher;
#[cfg(feature = "iam")]
pub use iam::IamFetcher;
#[cfg(feature = "kms")]
pub use kms::KmsFetcher;
#[cfg(feature = "lambda")]
pub use lambda::LambdaFetcher;
#[cfg(feature = "logs")]
pub use logs::LogsFetcher;
#[cfg(feature = "organizations")]
pub use organizations::OrganizationsFetcher;
#[cfg(feature = "route53")]
pub use route53::Route53Fetcher;
#[cfg(feature = "s3")]
pub use s3::S3Fetcher;
#[cfg(feature = "wafv2")]
pub use wafv2::Wafv2Fetcher;

/// Build a registry holding one fetcher per enabled service feature.
///
/// Credentials are resolved once and shared by every client.
#[allow(unused_mut, unused_variables)]
pub async fn registry(config: &AwsBaseConfig) -> FetcherRegistry {
    let sdk_config = auth::build_sdk_config(config).await;
    let mut registry = FetcherRegistry::new();

    #[cfg(feature = "ec2")]
    registry.register(std::sync::Arc::new(Ec2Fetcher::from_sdk_config(&sdk_config)));
    #[cfg(feature = "iam")]
    registry.register(std::sync::Arc::new(IamFetcher::from_sdk_config(&sdk_config)));
    #[cfg(feature = "kms")]
    registry.register(std::sync::Arc::new(KmsFetcher::from_sdk_config(&sdk_config)));
    #[cfg(feature = "s3")]
    registry.register(std::sync::Arc::new(S3Fetcher::from_sdk_config(&sdk_config)));
    #[cfg(feature = "lambda")]
    registry.register(std::sync::Arc::new(LambdaFetcher::from_sdk_config(&sdk_config)));
    #[cfg(feature = "logs")]
    registry.register(std::sync::Arc::new(LogsFetcher::from_sdk_config(&sdk_config)));
    #[cfg(feature = "eventbridge")]
    registry.register(std::sync::Arc::new(EventBridgeFetcher::from_sdk_config(&sdk_config)));
    #[cfg(feature = "route53")]
    registry.register(std::sync::Arc::new(Route53Fetcher::from_sdk_config(&sdk_config)));
    #[cfg(feature = "glue")]
    registry.register(std::sync::Arc::new(GlueFetcher::from_sdk_config(&sdk_config)));
    #[cfg(feature = "athena")]
    registry.register(std::sync::Arc::new(AthenaFetcher::from_sdk_config(&sdk_config)));
    #[cfg(feature = "wafv2")]
    registry.register(std::sync::Arc::new(Wafv2Fetcher::from_sdk_config(&sdk_config)));
    #[cfg(feature = "organizations")]
    registry.register(std::sync::Arc::new(OrganizationsFetcher::from_sdk_config(&sdk_config)));

    registry
}
