//! Dependency resolver: ordered teardown plans
//!
//! Every detach/delete of a dependent strictly precedes the final
//! delete-resource step. Deleting a parent with dependents still attached
//! fails at the provider and is treated as a logic defect here, not a
//! runtime condition to tolerate.

use crate::model::{DeletionPlan, Resource, ResourceKind, TeardownStep};
use crate::provider::{CloudProvider, RoleAttachments};
use anyhow::Result;

/// Teardown steps for a role with the given attachments.
///
/// Order mirrors how the provider enforces dependencies: instance-profile
/// membership and policies must be gone before the role can be deleted.
pub fn role_teardown(attachments: &RoleAttachments) -> Vec<TeardownStep> {
    let mut steps = Vec::new();
    for profile in &attachments.instance_profile_names {
        steps.push(TeardownStep::RemoveFromInstanceProfile {
            profile_name: profile.clone(),
        });
    }
    for policy in &attachments.inline_policy_names {
        steps.push(TeardownStep::DeleteInlinePolicy {
            policy_name: policy.clone(),
        });
    }
    for arn in &attachments.managed_policy_arns {
        steps.push(TeardownStep::DetachManagedPolicy {
            policy_arn: arn.clone(),
        });
    }
    steps.push(TeardownStep::DeleteResource);
    steps
}

/// Teardown steps for a managed policy: non-default versions first
pub fn policy_teardown(non_default_versions: &[String]) -> Vec<TeardownStep> {
    let mut steps: Vec<TeardownStep> = non_default_versions
        .iter()
        .map(|v| TeardownStep::DeletePolicyVersion {
            version_id: v.clone(),
        })
        .collect();
    steps.push(TeardownStep::DeleteResource);
    steps
}

/// Teardown steps for a security group.
///
/// An unused group has, by construction, no inbound rule references from
/// other groups (those classify it active), so it deletes directly.
pub fn group_teardown() -> Vec<TeardownStep> {
    vec![TeardownStep::DeleteResource]
}

/// Build the deletion plan for an unused resource, enumerating its
/// sub-resource attachments from the provider.
pub async fn build_plan<P: CloudProvider>(
    provider: &P,
    resource: &Resource,
) -> Result<DeletionPlan> {
    let steps = match resource.kind {
        ResourceKind::Role => {
            let attachments = provider.role_attachments(&resource.id).await?;
            role_teardown(&attachments)
        }
        ResourceKind::Policy => {
            let versions = provider.policy_non_default_versions(&resource.id).await?;
            policy_teardown(&versions)
        }
        ResourceKind::SecurityGroup => group_teardown(),
    };

    Ok(DeletionPlan {
        resource: resource.clone(),
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_role_sub_steps_precede_the_final_delete() {
        let attachments = RoleAttachments {
            managed_policy_arns: vec!["arn:p/one".to_string(), "arn:p/two".to_string()],
            inline_policy_names: vec!["inline".to_string()],
            instance_profile_names: vec!["prof-a".to_string(), "prof-b".to_string()],
        };
        let steps = role_teardown(&attachments);

        // 5 detach/delete sub-steps, then the final delete
        assert_eq!(steps.len(), 6);
        assert!(steps[..5].iter().all(|s| !s.is_final_delete()));
        assert!(steps[5].is_final_delete());
    }

    #[test]
    fn bare_role_plan_is_just_the_delete() {
        let steps = role_teardown(&RoleAttachments::default());
        assert_eq!(steps, vec![TeardownStep::DeleteResource]);
    }

    #[test]
    fn policy_versions_precede_policy_delete() {
        let steps = policy_teardown(&["v1".to_string(), "v3".to_string()]);
        assert_eq!(steps.len(), 3);
        assert_eq!(
            steps[0],
            TeardownStep::DeletePolicyVersion {
                version_id: "v1".to_string()
            }
        );
        assert!(steps[2].is_final_delete());
    }

    #[test]
    fn group_plan_is_a_single_delete() {
        assert_eq!(group_teardown(), vec![TeardownStep::DeleteResource]);
    }
}
