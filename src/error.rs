//! Engine error taxonomy
//!
//! Per-resource errors never abort the run; only `ProviderUnreachable`
//! during setup or listing is fatal. Everything else is caught at the
//! resource boundary and folded into the run report.

use crate::model::UsageSourceKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SweepError {
    /// The listing call itself could not complete. Aborts the run before
    /// any deletion is attempted.
    #[error("provider unreachable: {0}")]
    ProviderUnreachable(String),

    /// One usage source could not be queried. Recorded as an unchecked
    /// source; evaluation continues with the remaining sources.
    #[error("usage source {source} unavailable: {reason}")]
    SourceUnavailable {
        source: UsageSourceKind,
        reason: String,
    },

    /// A teardown step failed. Aborts only the current resource's plan.
    #[error("step failed for {resource}: {step}: {cause}")]
    DependencyStepFailed {
        resource: String,
        step: String,
        cause: String,
    },

    /// Confirmation declined or abort-remaining chosen
    #[error("cancelled by user")]
    UserCancelled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UsageSourceKind;

    // These renderings land verbatim in the audit trail
    #[test]
    fn display_renders_audit_facing_messages() {
        assert_eq!(
            SweepError::ProviderUnreachable("listing roles: timeout".to_string()).to_string(),
            "provider unreachable: listing roles: timeout"
        );
        assert_eq!(
            SweepError::SourceUnavailable {
                source: UsageSourceKind::LambdaFunction,
                reason: "AccessDenied".to_string(),
            }
            .to_string(),
            "usage source lambda-function unavailable: AccessDenied"
        );
        assert_eq!(
            SweepError::DependencyStepFailed {
                resource: "iam-role 'deploy'".to_string(),
                step: "detach managed policy arn:p".to_string(),
                cause: "Throttling".to_string(),
            }
            .to_string(),
            "step failed for iam-role 'deploy': detach managed policy arn:p: Throttling"
        );
        assert_eq!(SweepError::UserCancelled.to_string(), "cancelled by user");
    }
}
