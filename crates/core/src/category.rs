use std::fmt;

use serde::{Deserialize, Serialize};

/// Family of cloud resources that share one describe/get API surface.
///
/// The category keys both fetcher routing and error-code classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    Ec2,
    Iam,
    Kms,
    S3,
    Lambda,
    CloudWatchLogs,
    EventBridge,
    Route53,
    Glue,
    Athena,
    Wafv2,
    Organizations,
}

impl ResourceCategory {
    /// All known categories, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::Ec2,
        Self::Iam,
        Self::Kms,
        Self::S3,
        Self::Lambda,
        Self::CloudWatchLogs,
        Self::EventBridge,
        Self::Route53,
        Self::Glue,
        Self::Athena,
        Self::Wafv2,
        Self::Organizations,
    ];

    /// Stable snake-case name used in logs and configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ec2 => "ec2",
            Self::Iam => "iam",
            Self::Kms => "kms",
            Self::S3 => "s3",
            Self::Lambda => "lambda",
            Self::CloudWatchLogs => "cloud_watch_logs",
            Self::EventBridge => "event_bridge",
            Self::Route53 => "route53",
            Self::Glue => "glue",
            Self::Athena => "athena",
            Self::Wafv2 => "wafv2",
            Self::Organizations => "organizations",
        }
    }
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
