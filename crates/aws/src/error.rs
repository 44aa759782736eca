use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use infracheck_core::{LookupError, ResourceCategory, classify};
use thiserror::Error;
use tracing::error;

/// Errors raised while describing AWS resources.
#[derive(Debug, Error)]
pub enum AwsFetchError {
    /// The SDK call failed: a service error, timeout or dispatch failure.
    #[error("{operation} failed: {message}")]
    Service {
        category: ResourceCategory,
        operation: &'static str,
        code: Option<String>,
        message: String,
    },

    /// The call succeeded but returned no matching resource.
    #[error("{0} not found")]
    Empty(String),

    /// The lookup request lacked an identifier or parameter.
    #[error("invalid lookup input: {0}")]
    InvalidInput(String),
}

impl From<AwsFetchError> for LookupError {
    fn from(err: AwsFetchError) -> Self {
        match err {
            AwsFetchError::Service {
                category,
                operation,
                code,
                message,
            } => classify::lookup_error(category, code.as_deref(), format!("{operation}: {message}")),
            AwsFetchError::Empty(what) => LookupError::not_found(format!("{what} not found")),
            AwsFetchError::InvalidInput(msg) => LookupError::invalid_input(msg),
        }
    }
}

/// Capture an SDK error with its service error code.
///
/// The code drives classification; when the SDK produced none (timeouts,
/// connection failures) the full error chain is kept so the message
/// heuristics can still tell those apart.
pub fn sdk_error<E>(category: ResourceCategory, operation: &'static str, err: &E) -> AwsFetchError
where
    E: ProvideErrorMetadata + std::error::Error,
{
    let chain = DisplayErrorContext(err).to_string();
    let code = err.code().map(str::to_owned);
    error!(
        category = %category,
        operation,
        code = code.as_deref().unwrap_or(""),
        error = %chain,
        "AWS describe call failed"
    );
    let message = match err.message() {
        Some(message) if code.is_some() => message.to_owned(),
        _ => chain,
    };
    AwsFetchError::Service {
        category,
        operation,
        code,
        message,
    }
}
