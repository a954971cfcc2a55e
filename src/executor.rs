//! Deletion executor: runs one teardown plan
//!
//! Dry-run logs every step as "would perform" and issues no mutating
//! call, but returns the same outcome shape as a live run. In live mode
//! the plan stops at the first failed step: a role whose managed policy
//! failed to detach must not have its delete attempted.

use crate::audit::AuditLog;
use crate::error::SweepError;
use crate::model::{DeletionPlan, ExecutionOutcome, ResourceKind, TeardownStep};
use crate::provider::CloudProvider;
use anyhow::{bail, Result};

/// Execute (or dry-run) a plan. `live` = issue mutating calls.
pub async fn execute_plan<P: CloudProvider>(
    provider: &P,
    plan: &DeletionPlan,
    live: bool,
    audit: &AuditLog,
) -> ExecutionOutcome {
    for step in &plan.steps {
        let description = step.describe(&plan.resource);

        if !live {
            audit.info(&format!("[dry-run] would {description}"));
            continue;
        }

        if let Err(e) = apply_step(provider, plan, step).await {
            let cause = format!("{e:#}");
            audit.error(
                &SweepError::DependencyStepFailed {
                    resource: plan.resource.to_string(),
                    step: description.clone(),
                    cause: cause.clone(),
                }
                .to_string(),
            );
            return ExecutionOutcome::Failed {
                step: description,
                cause,
            };
        }
        audit.info(&format!("done: {description}"));
    }

    audit.success(&format!(
        "{} {}",
        if live { "deleted" } else { "[dry-run] would delete" },
        plan.resource
    ));
    ExecutionOutcome::Deleted
}

async fn apply_step<P: CloudProvider>(
    provider: &P,
    plan: &DeletionPlan,
    step: &TeardownStep,
) -> Result<()> {
    let resource = &plan.resource;
    match (resource.kind, step) {
        (ResourceKind::Role, TeardownStep::RemoveFromInstanceProfile { profile_name }) => {
            provider
                .remove_role_from_instance_profile(&resource.id, profile_name)
                .await
        }
        (ResourceKind::Role, TeardownStep::DeleteInlinePolicy { policy_name }) => {
            provider
                .delete_role_inline_policy(&resource.id, policy_name)
                .await
        }
        (ResourceKind::Role, TeardownStep::DetachManagedPolicy { policy_arn }) => {
            provider.detach_role_policy(&resource.id, policy_arn).await
        }
        (ResourceKind::Role, TeardownStep::DeleteResource) => {
            provider.delete_role(&resource.id).await
        }
        (ResourceKind::Policy, TeardownStep::DeletePolicyVersion { version_id }) => {
            provider.delete_policy_version(&resource.id, version_id).await
        }
        (ResourceKind::Policy, TeardownStep::DeleteResource) => {
            provider.delete_policy(&resource.id).await
        }
        (ResourceKind::SecurityGroup, TeardownStep::DeleteResource) => {
            provider.delete_security_group(&resource.id).await
        }
        (kind, step) => bail!("step {step:?} does not apply to {kind}"),
    }
}
