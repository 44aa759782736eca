//! Helpers shared by the SDK-to-JSON conversions.

use aws_smithy_types::DateTime;
use aws_smithy_types::date_time::Format;
use infracheck_core::LookupRequest;
use serde_json::Value;

use crate::error::AwsFetchError;

/// RFC 3339 rendering of an SDK timestamp, `null` when absent.
///
/// Accepts both required (`&DateTime`) and optional timestamps.
pub(crate) fn timestamp<'a>(value: impl Into<Option<&'a DateTime>>) -> Value {
    value
        .into()
        .and_then(|dt| dt.fmt(Format::DateTime).ok())
        .map_or(Value::Null, Value::String)
}

/// Owned copies of a string list.
pub(crate) fn strings<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    items.iter().map(|s| s.as_ref().to_owned()).collect()
}

/// The request's identifier, or an `InvalidInput` error naming `what`.
pub(crate) fn require_key<'a>(request: &'a LookupRequest, what: &str) -> Result<&'a str, AwsFetchError> {
    request
        .require_key(what)
        .map_err(|e| AwsFetchError::InvalidInput(e.message))
}

/// A named parameter, or an `InvalidInput` error.
pub(crate) fn require_param<'a>(request: &'a LookupRequest, name: &str) -> Result<&'a str, AwsFetchError> {
    request
        .require_param(name)
        .map_err(|e| AwsFetchError::InvalidInput(e.message))
}

/// Fail with `Empty` when a list response came back empty.
pub(crate) fn non_empty<T>(items: &[T], what: impl FnOnce() -> String) -> Result<(), AwsFetchError> {
    if items.is_empty() {
        Err(AwsFetchError::Empty(what()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use infracheck_core::ResourceCategory;

    use super::*;

    #[test]
    fn timestamp_is_rfc3339() {
        let dt = DateTime::from_secs(1_700_000_000);
        assert_eq!(timestamp(&dt), Value::String("2023-11-14T22:13:20Z".into()));
        assert_eq!(timestamp(Some(&dt)), timestamp(&dt));
        assert_eq!(timestamp(None::<&DateTime>), Value::Null);
    }

    #[test]
    fn require_param_names_missing_parameter() {
        let request = LookupRequest::by_name(ResourceCategory::Iam, "role_inline_policy", "ci");
        let err = require_param(&request, "policy_name").unwrap_err();
        assert!(err.to_string().contains("policy_name"));
    }

    #[test]
    fn require_key_rejects_unscoped() {
        let request = LookupRequest::unscoped(ResourceCategory::Kms, "key");
        assert!(matches!(
            require_key(&request, "a key id"),
            Err(AwsFetchError::InvalidInput(_))
        ));
    }

    #[test]
    fn non_empty_reports_what() {
        let err = non_empty::<u8>(&[], || "flow logs for vpc-1".into()).unwrap_err();
        assert_eq!(err.to_string(), "flow logs for vpc-1 not found");
        assert!(non_empty(&[1], String::new).is_ok());
    }
}
