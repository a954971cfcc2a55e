//! AWS error classification
//!
//! Typed categories derived from the SDK error `.code()` rather than
//! string matching on Debug output. Deletion code treats `NotFound` as
//! the goal state already being reached; listing code treats access
//! failures as unavailable usage sources.

use aws_sdk_iam::error::{ProvideErrorMetadata, SdkError};
use thiserror::Error;

/// AWS error categories relevant to sweep decisions
#[derive(Debug, Error)]
pub enum AwsError {
    /// Resource was not found (already gone; safe to treat as deleted)
    #[error("resource not found")]
    NotFound,

    /// Caller lacks permission for this call
    #[error("access denied")]
    AccessDenied,

    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    Throttled,

    /// Resource still has dependent objects attached
    #[error("resource has dependent objects")]
    DependencyViolation,

    /// Anything else, with code and message when the SDK provided them
    #[error("AWS error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AwsError::NotFound)
    }
}

/// Known AWS error codes for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &[
    "NoSuchEntity",
    "NoSuchEntityException",
    "InvalidGroup.NotFound",
    "InvalidGroupId.NotFound",
    "InvalidPermission.NotFound",
];

/// Known AWS error codes for permission failures
const ACCESS_DENIED_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "UnauthorizedAccess",
    "UnauthorizedOperation",
];

/// Known AWS error codes for throttling
const THROTTLING_CODES: &[&str] = &["Throttling", "ThrottlingException", "RequestLimitExceeded"];

/// Known AWS error codes for dependency violations
const DEPENDENCY_CODES: &[&str] = &["DependencyViolation", "DeleteConflict"];

/// Classify an AWS error from its code and message
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => AwsError::NotFound,
        Some(c) if ACCESS_DENIED_CODES.contains(&c) => AwsError::AccessDenied,
        Some(c) if THROTTLING_CODES.contains(&c) => AwsError::Throttled,
        Some(c) if DEPENDENCY_CODES.contains(&c) => AwsError::DependencyViolation,
        _ => AwsError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Classify a typed SDK operation error
pub fn classify_sdk_error<E, R>(err: &SdkError<E, R>) -> AwsError
where
    SdkError<E, R>: ProvideErrorMetadata,
{
    let meta = ProvideErrorMetadata::meta(err);
    classify_aws_error(meta.code(), meta.message())
}

/// True when the SDK error means the target resource no longer exists
pub fn is_not_found<E, R>(err: &SdkError<E, R>) -> bool
where
    SdkError<E, R>: ProvideErrorMetadata,
{
    classify_sdk_error(err).is_not_found()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_codes() {
        for code in NOT_FOUND_CODES {
            let err = classify_aws_error(Some(code), Some("gone"));
            assert!(err.is_not_found(), "expected NotFound for code: {code}");
        }
    }

    #[test]
    fn access_denied_codes() {
        for code in ACCESS_DENIED_CODES {
            assert!(
                matches!(
                    classify_aws_error(Some(code), Some("msg")),
                    AwsError::AccessDenied
                ),
                "expected AccessDenied for code: {code}"
            );
        }
    }

    #[test]
    fn throttling_and_dependency_codes() {
        for code in THROTTLING_CODES {
            assert!(matches!(
                classify_aws_error(Some(code), None),
                AwsError::Throttled
            ));
        }
        for code in DEPENDENCY_CODES {
            assert!(matches!(
                classify_aws_error(Some(code), None),
                AwsError::DependencyViolation
            ));
        }
    }

    #[test]
    fn unknown_and_missing_codes_fall_through() {
        assert!(matches!(
            classify_aws_error(Some("SomethingNew"), Some("details")),
            AwsError::Sdk { .. }
        ));
        assert!(matches!(
            classify_aws_error(None, Some("no code at all")),
            AwsError::Sdk { code: None, .. }
        ));
    }
}
