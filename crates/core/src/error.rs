use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Named bucket grouping raw provider error codes for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The resource (or a sub-resource such as a bucket policy) does not exist.
    NotFound,
    /// The request was rejected as malformed or referenced an invalid id/ARN.
    InvalidInput,
    /// The caller is not allowed to read the resource.
    AccessDenied,
    /// The resource exists but is in a state that prevents the read.
    InvalidState,
    /// The service or one of its dependencies is unavailable.
    ServiceUnavailable,
    /// The service reported an internal failure.
    Internal,
    /// The call timed out.
    Timeout,
    /// The call was throttled.
    RateLimited,
    /// Anything not covered above.
    Unclassified,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidInput => "invalid_input",
            Self::AccessDenied => "access_denied",
            Self::InvalidState => "invalid_state",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Internal => "internal",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed describe/get call, already classified.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub struct LookupError {
    /// Classification of the raw error.
    pub kind: ErrorKind,
    /// Raw provider error code, when the provider supplied one.
    pub code: Option<String>,
    /// Raw provider message.
    pub message: String,
}

impl LookupError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Shorthand for a `NotFound` failure.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Shorthand for an `InvalidInput` failure.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} lookup failure", self.kind)?;
        if let Some(code) = &self.code {
            write!(f, " ({code})")?;
        }
        write!(f, ": {}", self.message)
    }
}
