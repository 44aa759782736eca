//! Error-code classification table.
//!
//! Provider error codes are mapped to an [`ErrorKind`] in three passes:
//!
//! 1. the category-specific table (`(ResourceCategory, code)` entries),
//! 2. service-independent codes shared by every AWS API (throttling, access
//!    denied, internal failure, ...),
//! 3. a heuristic over the raw message for errors that carry no code at all
//!    (connection resets, client-side timeouts).
//!
//! Anything left over is [`ErrorKind::Unclassified`].

use crate::category::ResourceCategory;
use crate::category::ResourceCategory::{
    Athena, CloudWatchLogs, Ec2, EventBridge, Glue, Iam, Kms, Lambda, Organizations, Route53, S3,
    Wafv2,
};
use crate::error::ErrorKind::{
    AccessDenied, Internal, InvalidInput, InvalidState, NotFound, RateLimited, ServiceUnavailable,
    Timeout,
};
use crate::error::{ErrorKind, LookupError};

/// How a table entry matches a raw error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePattern {
    /// The code must equal the pattern.
    Exact(&'static str),
    /// The code must end with the pattern (EC2 uses `InvalidVpcID.NotFound` style codes).
    Suffix(&'static str),
}

impl CodePattern {
    fn matches(self, code: &str) -> bool {
        match self {
            Self::Exact(expected) => code == expected,
            Self::Suffix(suffix) => code.ends_with(suffix),
        }
    }
}

/// One row of the classification table.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationEntry {
    pub category: ResourceCategory,
    pub pattern: CodePattern,
    pub kind: ErrorKind,
}

const fn exact(category: ResourceCategory, code: &'static str, kind: ErrorKind) -> ClassificationEntry {
    ClassificationEntry {
        category,
        pattern: CodePattern::Exact(code),
        kind,
    }
}

const fn suffix(category: ResourceCategory, code: &'static str, kind: ErrorKind) -> ClassificationEntry {
    ClassificationEntry {
        category,
        pattern: CodePattern::Suffix(code),
        kind,
    }
}

/// Category-specific error codes.
pub static CLASSIFICATION_TABLE: &[ClassificationEntry] = &[
    // EC2
    suffix(Ec2, ".NotFound", NotFound),
    suffix(Ec2, ".Malformed", InvalidInput),
    exact(Ec2, "InvalidParameterValue", InvalidInput),
    exact(Ec2, "InvalidParameterCombination", InvalidInput),
    exact(Ec2, "MissingParameter", InvalidInput),
    exact(Ec2, "InvalidFilter", InvalidInput),
    exact(Ec2, "UnauthorizedOperation", AccessDenied),
    exact(Ec2, "Unavailable", ServiceUnavailable),
    // IAM
    exact(Iam, "NoSuchEntity", NotFound),
    exact(Iam, "InvalidInput", InvalidInput),
    exact(Iam, "ServiceFailure", Internal),
    exact(Iam, "UnrecognizedPublicKeyEncoding", InvalidInput),
    // KMS
    exact(Kms, "NotFoundException", NotFound),
    exact(Kms, "InvalidArnException", InvalidInput),
    exact(Kms, "InvalidGrantTokenException", InvalidInput),
    exact(Kms, "InvalidMarkerException", InvalidInput),
    exact(Kms, "DependencyTimeoutException", Timeout),
    exact(Kms, "KMSInternalException", Internal),
    exact(Kms, "KMSInvalidStateException", InvalidState),
    exact(Kms, "UnsupportedOperationException", InvalidInput),
    // S3
    exact(S3, "NoSuchBucket", NotFound),
    exact(S3, "NoSuchBucketPolicy", NotFound),
    exact(S3, "NoSuchLifecycleConfiguration", NotFound),
    exact(S3, "NoSuchTagSet", NotFound),
    exact(S3, "NoSuchPublicAccessBlockConfiguration", NotFound),
    exact(S3, "ReplicationConfigurationNotFoundError", NotFound),
    exact(S3, "ServerSideEncryptionConfigurationNotFoundError", NotFound),
    exact(S3, "NotFound", NotFound),
    exact(S3, "SlowDown", RateLimited),
    exact(S3, "InvalidBucketName", InvalidInput),
    // Lambda
    exact(Lambda, "ResourceNotFoundException", NotFound),
    exact(Lambda, "InvalidParameterValueException", InvalidInput),
    exact(Lambda, "ServiceException", Internal),
    // CloudWatch Logs
    exact(CloudWatchLogs, "ResourceNotFoundException", NotFound),
    exact(CloudWatchLogs, "InvalidParameterException", InvalidInput),
    exact(CloudWatchLogs, "ServiceUnavailableException", ServiceUnavailable),
    // EventBridge
    exact(EventBridge, "ResourceNotFoundException", NotFound),
    exact(EventBridge, "InternalException", Internal),
    // Route 53
    exact(Route53, "NoSuchHostedZone", NotFound),
    exact(Route53, "InvalidInput", InvalidInput),
    // Glue
    exact(Glue, "EntityNotFoundException", NotFound),
    exact(Glue, "InvalidInputException", InvalidInput),
    exact(Glue, "InternalServiceException", Internal),
    exact(Glue, "OperationTimeoutException", Timeout),
    exact(Glue, "GlueEncryptionException", InvalidState),
    // Athena
    exact(Athena, "MetadataException", NotFound),
    exact(Athena, "InvalidRequestException", InvalidInput),
    exact(Athena, "InternalServerException", Internal),
    // WAFv2
    exact(Wafv2, "WAFNonexistentItemException", NotFound),
    exact(Wafv2, "WAFInvalidParameterException", InvalidInput),
    exact(Wafv2, "WAFInvalidOperationException", InvalidInput),
    exact(Wafv2, "WAFInternalErrorException", Internal),
    exact(Wafv2, "WAFUnavailableEntityException", ServiceUnavailable),
    // Organizations
    exact(Organizations, "PolicyNotFoundException", NotFound),
    exact(Organizations, "AWSOrganizationsNotInUseException", InvalidState),
    exact(Organizations, "InvalidInputException", InvalidInput),
    exact(Organizations, "ServiceException", Internal),
];

/// Codes that mean the same thing across every service.
static COMMON_CODES: &[(&str, ErrorKind)] = &[
    ("Throttling", RateLimited),
    ("ThrottlingException", RateLimited),
    ("ThrottledException", RateLimited),
    ("TooManyRequestsException", RateLimited),
    ("RequestLimitExceeded", RateLimited),
    ("RateLimitExceededException", RateLimited),
    ("AccessDenied", AccessDenied),
    ("AccessDeniedException", AccessDenied),
    ("AuthorizationException", AccessDenied),
    ("UnrecognizedClientException", AccessDenied),
    ("ExpiredToken", AccessDenied),
    ("ExpiredTokenException", AccessDenied),
    ("ValidationError", InvalidInput),
    ("ValidationException", InvalidInput),
    ("InternalError", Internal),
    ("InternalFailure", Internal),
    ("InternalServiceError", Internal),
    ("ServiceUnavailable", ServiceUnavailable),
    ("ServiceUnavailableException", ServiceUnavailable),
    ("RequestTimeout", Timeout),
    ("RequestTimeoutException", Timeout),
];

/// Classify a raw provider error for the given category.
///
/// `code` is the provider's machine-readable error code when one is available;
/// `message` is used only when the code is absent or unknown.
pub fn classify(category: ResourceCategory, code: Option<&str>, message: &str) -> ErrorKind {
    if let Some(code) = code {
        if let Some(entry) = CLASSIFICATION_TABLE
            .iter()
            .find(|entry| entry.category == category && entry.pattern.matches(code))
        {
            return entry.kind;
        }
        if let Some((_, kind)) = COMMON_CODES.iter().find(|(common, _)| *common == code) {
            return *kind;
        }
    }
    classify_message(message)
}

/// Build a classified [`LookupError`] from a raw code and message.
pub fn lookup_error(category: ResourceCategory, code: Option<&str>, message: impl Into<String>) -> LookupError {
    let message = message.into();
    let kind = classify(category, code, &message);
    LookupError {
        kind,
        code: code.map(str::to_owned),
        message,
    }
}

fn classify_message(message: &str) -> ErrorKind {
    let lower = message.to_lowercase();
    if lower.contains("throttl") || lower.contains("rate exceed") || lower.contains("too many") {
        RateLimited
    } else if lower.contains("timeout") || lower.contains("timed out") {
        Timeout
    } else if lower.contains("connection")
        || lower.contains("connect")
        || lower.contains("dns")
        || lower.contains("network")
        || lower.contains("dispatch failure")
    {
        ServiceUnavailable
    } else {
        ErrorKind::Unclassified
    }
}
