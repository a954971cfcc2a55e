//! Liveness oracle: multi-source usage aggregation
//!
//! Each resource kind has a fixed registry of source checkers, evaluated
//! against a usage snapshot fetched once per run. Checkers are pure
//! functions, so every aggregation rule is unit-testable without a live
//! provider.
//!
//! Failure isolation is the primary correctness invariant here: a source
//! that could not be fetched ends up in `unchecked_sources` and never
//! counts as a "not in use" vote. Matching against weak identifiers
//! (profile ARNs that merely contain the role name) is deliberately
//! substring-tolerant; this can flag a role as in-use when it is not, but
//! never silently misses a real user. Ambiguity resolves toward in-use.

use crate::model::{LivenessVerdict, Resource, UsageSignal, UsageSourceKind};
use crate::provider::{GroupRef, GroupRuleRef, RoleRef};

/// One usage-source inventory, or the reason it could not be fetched
#[derive(Debug, Clone)]
pub enum SourceFetch<T> {
    Available(T),
    Unavailable { reason: String },
}

impl<T> SourceFetch<T> {
    pub fn from_result(result: anyhow::Result<T>) -> Self {
        match result {
            Ok(v) => SourceFetch::Available(v),
            Err(e) => SourceFetch::Unavailable {
                reason: format!("{e:#}"),
            },
        }
    }
}

/// Snapshot of everything that can reference an IAM role
#[derive(Debug, Clone)]
pub struct RoleUsage {
    pub instance_profiles: SourceFetch<Vec<RoleRef>>,
    pub ecs_task_definitions: SourceFetch<Vec<RoleRef>>,
    pub lambda_functions: SourceFetch<Vec<RoleRef>>,
    pub codebuild_projects: SourceFetch<Vec<RoleRef>>,
    pub launch_configurations: SourceFetch<Vec<RoleRef>>,
}

impl RoleUsage {
    fn sources(&self) -> [(UsageSourceKind, &SourceFetch<Vec<RoleRef>>); 5] {
        [
            (UsageSourceKind::Ec2InstanceProfile, &self.instance_profiles),
            (UsageSourceKind::EcsTaskDefinition, &self.ecs_task_definitions),
            (UsageSourceKind::LambdaFunction, &self.lambda_functions),
            (UsageSourceKind::CodeBuildProject, &self.codebuild_projects),
            (
                UsageSourceKind::LaunchConfiguration,
                &self.launch_configurations,
            ),
        ]
    }

    /// Sources that failed to fetch, with reasons (for run-level logging)
    pub fn unavailable(&self) -> Vec<(UsageSourceKind, String)> {
        self.sources()
            .into_iter()
            .filter_map(|(kind, fetch)| match fetch {
                SourceFetch::Unavailable { reason } => Some((kind, reason.clone())),
                SourceFetch::Available(_) => None,
            })
            .collect()
    }
}

/// Snapshot of everything that can reference a security group
#[derive(Debug, Clone)]
pub struct GroupUsage {
    pub instances: SourceFetch<Vec<GroupRef>>,
    pub classic_load_balancers: SourceFetch<Vec<GroupRef>>,
    pub load_balancers_v2: SourceFetch<Vec<GroupRef>>,
    pub rds_instances: SourceFetch<Vec<GroupRef>>,
    pub rule_references: SourceFetch<Vec<GroupRuleRef>>,
}

impl GroupUsage {
    fn sources(&self) -> [(UsageSourceKind, &SourceFetch<Vec<GroupRef>>); 4] {
        [
            (UsageSourceKind::Ec2Instance, &self.instances),
            (
                UsageSourceKind::ClassicLoadBalancer,
                &self.classic_load_balancers,
            ),
            (UsageSourceKind::LoadBalancerV2, &self.load_balancers_v2),
            (UsageSourceKind::RdsInstance, &self.rds_instances),
        ]
    }

    pub fn unavailable(&self) -> Vec<(UsageSourceKind, String)> {
        let mut out: Vec<(UsageSourceKind, String)> = self
            .sources()
            .into_iter()
            .filter_map(|(kind, fetch)| match fetch {
                SourceFetch::Unavailable { reason } => Some((kind, reason.clone())),
                SourceFetch::Available(_) => None,
            })
            .collect();
        if let SourceFetch::Unavailable { reason } = &self.rule_references {
            out.push((UsageSourceKind::GroupRuleReference, reason.clone()));
        }
        out
    }
}

/// Does `identifier` (an ARN, profile name, or similar) reference `role`?
///
/// Exact ARN match, or case-insensitive containment of the role name.
/// The containment branch is a known precision gap for roles whose names
/// are substrings of other roles' identifiers; it is kept because the
/// provider APIs in question expose only weak identifiers, and a false
/// "in use" is recoverable while a false "unused" is not.
fn references_role(role: &Resource, identifier: &str) -> bool {
    if identifier.eq_ignore_ascii_case(&role.arn) {
        return true;
    }
    identifier
        .to_ascii_lowercase()
        .contains(&role.name.to_ascii_lowercase())
}

/// Evaluate an IAM role against all role usage sources
pub fn evaluate_role(role: &Resource, usage: &RoleUsage) -> LivenessVerdict {
    let mut verdict = LivenessVerdict::default();

    for (source, fetch) in usage.sources() {
        match fetch {
            SourceFetch::Unavailable { .. } => verdict.record_unchecked(source),
            SourceFetch::Available(refs) => {
                for r in refs {
                    if references_role(role, &r.role) {
                        verdict.record_match(UsageSignal {
                            source,
                            detail: r.used_by.clone(),
                        });
                    }
                }
            }
        }
    }

    verdict
}

/// Evaluate a security group against all group usage sources
pub fn evaluate_group(group: &Resource, usage: &GroupUsage) -> LivenessVerdict {
    let mut verdict = LivenessVerdict::default();

    for (source, fetch) in usage.sources() {
        match fetch {
            SourceFetch::Unavailable { .. } => verdict.record_unchecked(source),
            SourceFetch::Available(refs) => {
                for r in refs {
                    if r.group_id == group.id {
                        verdict.record_match(UsageSignal {
                            source,
                            detail: r.used_by.clone(),
                        });
                    }
                }
            }
        }
    }

    match &usage.rule_references {
        SourceFetch::Unavailable { .. } => {
            verdict.record_unchecked(UsageSourceKind::GroupRuleReference);
        }
        SourceFetch::Available(refs) => {
            for r in refs {
                // A group's own rules referencing itself do not keep it alive
                if r.referenced_group_id == group.id && r.referencing_group_id != group.id {
                    verdict.record_match(UsageSignal {
                        source: UsageSourceKind::GroupRuleReference,
                        detail: r.referencing_group_id.clone(),
                    });
                }
            }
        }
    }

    verdict
}

/// Evaluate a customer-managed policy.
///
/// The attachment count comes from the policy listing itself, so there is
/// no separately fallible source here; `entities` only enriches the reason
/// text when the enumeration succeeded.
pub fn evaluate_policy(
    _policy: &Resource,
    attachment_count: i64,
    entities: Option<&[String]>,
) -> LivenessVerdict {
    let mut verdict = LivenessVerdict::default();
    if attachment_count <= 0 {
        return verdict;
    }

    match entities {
        Some(names) if !names.is_empty() => {
            for name in names {
                verdict.record_match(UsageSignal {
                    source: UsageSourceKind::PolicyAttachment,
                    detail: name.clone(),
                });
            }
        }
        _ => verdict.record_match(UsageSignal {
            source: UsageSourceKind::PolicyAttachment,
            detail: format!("{attachment_count} attached principal(s)"),
        }),
    }
    verdict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceKind;

    fn role(name: &str) -> Resource {
        Resource {
            id: name.to_string(),
            name: name.to_string(),
            kind: ResourceKind::Role,
            arn: format!("arn:aws:iam::123456789012:role/{name}"),
            created_at: None,
            excluded: false,
        }
    }

    fn group(id: &str) -> Resource {
        Resource {
            id: id.to_string(),
            name: format!("name-of-{id}"),
            kind: ResourceKind::SecurityGroup,
            arn: String::new(),
            created_at: None,
            excluded: false,
        }
    }

    fn empty_role_usage() -> RoleUsage {
        RoleUsage {
            instance_profiles: SourceFetch::Available(vec![]),
            ecs_task_definitions: SourceFetch::Available(vec![]),
            lambda_functions: SourceFetch::Available(vec![]),
            codebuild_projects: SourceFetch::Available(vec![]),
            launch_configurations: SourceFetch::Available(vec![]),
        }
    }

    fn empty_group_usage() -> GroupUsage {
        GroupUsage {
            instances: SourceFetch::Available(vec![]),
            classic_load_balancers: SourceFetch::Available(vec![]),
            load_balancers_v2: SourceFetch::Available(vec![]),
            rds_instances: SourceFetch::Available(vec![]),
            rule_references: SourceFetch::Available(vec![]),
        }
    }

    #[test]
    fn clean_sources_yield_not_in_use() {
        let verdict = evaluate_role(&role("idle"), &empty_role_usage());
        assert!(!verdict.in_use);
        assert!(verdict.unchecked_sources.is_empty());
    }

    #[test]
    fn one_match_sets_in_use_regardless_of_other_sources() {
        let mut usage = empty_role_usage();
        usage.lambda_functions = SourceFetch::Available(vec![RoleRef {
            role: "arn:aws:iam::123456789012:role/worker".to_string(),
            used_by: "etl-fn".to_string(),
        }]);
        usage.codebuild_projects = SourceFetch::Unavailable {
            reason: "AccessDenied".to_string(),
        };

        let verdict = evaluate_role(&role("worker"), &usage);
        assert!(verdict.in_use);
        assert_eq!(verdict.reasons, vec!["lambda-function: etl-fn"]);
        assert_eq!(
            verdict.unchecked_sources,
            vec![UsageSourceKind::CodeBuildProject]
        );
    }

    #[test]
    fn unavailable_source_is_recorded_never_voted() {
        let mut usage = empty_role_usage();
        usage.ecs_task_definitions = SourceFetch::Unavailable {
            reason: "service not enabled".to_string(),
        };

        let verdict = evaluate_role(&role("idle"), &usage);
        // in_use is determined solely by the remaining sources
        assert!(!verdict.in_use);
        assert_eq!(
            verdict.unchecked_sources,
            vec![UsageSourceKind::EcsTaskDefinition]
        );
    }

    #[test]
    fn profile_arn_substring_matches_role_name() {
        let mut usage = empty_role_usage();
        usage.instance_profiles = SourceFetch::Available(vec![RoleRef {
            role: "arn:aws:iam::123456789012:instance-profile/Web-Server-Profile".to_string(),
            used_by: "i-0abc123".to_string(),
        }]);

        // Weak identifier: the profile ARN only contains the role name
        let verdict = evaluate_role(&role("web-server"), &usage);
        assert!(verdict.in_use);
        assert_eq!(verdict.reasons, vec!["ec2-instance-profile: i-0abc123"]);
    }

    #[test]
    fn unrelated_profile_arn_does_not_match() {
        let mut usage = empty_role_usage();
        usage.instance_profiles = SourceFetch::Available(vec![RoleRef {
            role: "arn:aws:iam::123456789012:instance-profile/batch".to_string(),
            used_by: "i-0abc123".to_string(),
        }]);
        let verdict = evaluate_role(&role("web-server"), &usage);
        assert!(!verdict.in_use);
    }

    #[test]
    fn group_match_is_exact_on_id() {
        let mut usage = empty_group_usage();
        usage.instances = SourceFetch::Available(vec![GroupRef {
            group_id: "sg-aaa".to_string(),
            used_by: "i-1".to_string(),
        }]);

        assert!(evaluate_group(&group("sg-aaa"), &usage).in_use);
        assert!(!evaluate_group(&group("sg-aaa0"), &usage).in_use);
    }

    #[test]
    fn self_referencing_rules_do_not_keep_a_group_alive() {
        let mut usage = empty_group_usage();
        usage.rule_references = SourceFetch::Available(vec![GroupRuleRef {
            referencing_group_id: "sg-aaa".to_string(),
            referenced_group_id: "sg-aaa".to_string(),
        }]);
        assert!(!evaluate_group(&group("sg-aaa"), &usage).in_use);
    }

    #[test]
    fn cross_referencing_rules_keep_a_group_alive() {
        let mut usage = empty_group_usage();
        usage.rule_references = SourceFetch::Available(vec![GroupRuleRef {
            referencing_group_id: "sg-bbb".to_string(),
            referenced_group_id: "sg-aaa".to_string(),
        }]);
        let verdict = evaluate_group(&group("sg-aaa"), &usage);
        assert!(verdict.in_use);
        assert_eq!(verdict.reasons, vec!["group-rule-reference: sg-bbb"]);
    }

    #[test]
    fn attached_policy_is_in_use() {
        let policy = Resource {
            id: "arn:aws:iam::123456789012:policy/p".to_string(),
            name: "p".to_string(),
            kind: ResourceKind::Policy,
            arn: "arn:aws:iam::123456789012:policy/p".to_string(),
            created_at: None,
            excluded: false,
        };
        let verdict = evaluate_policy(&policy, 2, Some(&["user/alice".to_string()]));
        assert!(verdict.in_use);
        assert_eq!(verdict.reasons, vec!["policy-attachment: user/alice"]);

        // Count without entity detail still flags in-use
        let verdict = evaluate_policy(&policy, 2, None);
        assert!(verdict.in_use);

        let verdict = evaluate_policy(&policy, 0, None);
        assert!(!verdict.in_use);
    }

    #[test]
    fn unavailable_lists_cover_all_failed_sources() {
        let mut usage = empty_group_usage();
        usage.rds_instances = SourceFetch::Unavailable {
            reason: "no".to_string(),
        };
        usage.rule_references = SourceFetch::Unavailable {
            reason: "no".to_string(),
        };
        let failed: Vec<UsageSourceKind> =
            usage.unavailable().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            failed,
            vec![
                UsageSourceKind::RdsInstance,
                UsageSourceKind::GroupRuleReference
            ]
        );
    }
}
