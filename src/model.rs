//! Core value types for the sweep pipeline

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Kinds of AWS resources the sweeper can retire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceKind {
    /// IAM role
    Role,
    /// Customer-managed IAM policy
    Policy,
    /// EC2 security group
    SecurityGroup,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Role => "iam-role",
            ResourceKind::Policy => "iam-policy",
            ResourceKind::SecurityGroup => "security-group",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deletion candidate discovered from a live listing.
///
/// The sweeper never creates resources; it only reads and deletes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    /// Provider-assigned identifier used for mutations
    /// (role name, policy ARN, or security group ID)
    pub id: String,
    /// Human-facing name
    pub name: String,
    pub kind: ResourceKind,
    /// Full ARN where the provider exposes one
    pub arn: String,
    pub created_at: Option<DateTime<Utc>>,
    /// Set from the caller-supplied exclusion list, matched by name
    pub excluded: bool,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}'", self.kind, self.name)
    }
}

/// Independent usage sources queried by the liveness oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UsageSourceKind {
    /// EC2 instance-profile association (roles)
    Ec2InstanceProfile,
    /// ECS task/execution role reference in task definitions (roles)
    EcsTaskDefinition,
    /// Lambda function execution role (roles)
    LambdaFunction,
    /// CodeBuild project service role (roles)
    CodeBuildProject,
    /// Auto Scaling launch-configuration instance profile (roles)
    LaunchConfiguration,
    /// EC2 instance attachment (security groups)
    Ec2Instance,
    /// Classic load balancer association (security groups)
    ClassicLoadBalancer,
    /// ALB/NLB association (security groups)
    LoadBalancerV2,
    /// RDS instance association (security groups)
    RdsInstance,
    /// Ingress/egress rule in another group (security groups)
    GroupRuleReference,
    /// Attachment to a user, group, or role (policies)
    PolicyAttachment,
}

impl UsageSourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            UsageSourceKind::Ec2InstanceProfile => "ec2-instance-profile",
            UsageSourceKind::EcsTaskDefinition => "ecs-task-definition",
            UsageSourceKind::LambdaFunction => "lambda-function",
            UsageSourceKind::CodeBuildProject => "codebuild-project",
            UsageSourceKind::LaunchConfiguration => "launch-configuration",
            UsageSourceKind::Ec2Instance => "ec2-instance",
            UsageSourceKind::ClassicLoadBalancer => "classic-load-balancer",
            UsageSourceKind::LoadBalancerV2 => "load-balancer-v2",
            UsageSourceKind::RdsInstance => "rds-instance",
            UsageSourceKind::GroupRuleReference => "group-rule-reference",
            UsageSourceKind::PolicyAttachment => "policy-attachment",
        }
    }
}

impl std::fmt::Display for UsageSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One positive finding from one usage source.
///
/// A source that errors contributes no signal at all; it is recorded in
/// `LivenessVerdict::unchecked_sources` instead. Absence of a signal must
/// never be read as a "not in use" vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageSignal {
    pub source: UsageSourceKind,
    /// Name of the referencing entity
    pub detail: String,
}

/// Aggregated liveness verdict for one resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LivenessVerdict {
    /// True iff any source produced a matching signal
    pub in_use: bool,
    /// Matching details in source order
    pub reasons: Vec<String>,
    /// Sources that could not be queried this run
    pub unchecked_sources: Vec<UsageSourceKind>,
}

impl LivenessVerdict {
    pub fn record_match(&mut self, signal: UsageSignal) {
        self.in_use = true;
        self.reasons
            .push(format!("{}: {}", signal.source, signal.detail));
    }

    pub fn record_unchecked(&mut self, source: UsageSourceKind) {
        self.unchecked_sources.push(source);
    }
}

/// Last-used metadata for a resource, where the provider tracks it.
///
/// `NeverUsed` (tracking exists, nothing recorded) and `NotTracked` (the
/// provider has no last-used concept for this kind) both render as
/// "unknown" downstream but are logged distinctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityRecord {
    Observed(DateTime<Utc>),
    NeverUsed,
    NotTracked,
}

impl std::fmt::Display for ActivityRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityRecord::Observed(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
            ActivityRecord::NeverUsed | ActivityRecord::NotTracked => f.write_str("unknown"),
        }
    }
}

/// Outcome of the staleness policy for one resource.
///
/// Assigned exactly once per run; a resource is not re-evaluated mid-run
/// even if a concurrent process changes its usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Classification {
    /// A current usage signal was found
    Active,
    /// No current signal, but activity newer than the cutoff
    Recent,
    /// No current signal and no activity newer than the cutoff
    Unused,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Classification::Active => "ACTIVE",
            Classification::Recent => "RECENT",
            Classification::Unused => "UNUSED",
        };
        f.write_str(s)
    }
}

/// One teardown step in a deletion plan.
///
/// Steps are data, not code, so dry-run can print a plan without
/// executing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeardownStep {
    DetachManagedPolicy { policy_arn: String },
    DeleteInlinePolicy { policy_name: String },
    RemoveFromInstanceProfile { profile_name: String },
    DeletePolicyVersion { version_id: String },
    DeleteResource,
}

impl TeardownStep {
    /// Human-readable description, used for logging and failure reports
    pub fn describe(&self, resource: &Resource) -> String {
        match self {
            TeardownStep::DetachManagedPolicy { policy_arn } => {
                format!("detach managed policy {policy_arn} from {resource}")
            }
            TeardownStep::DeleteInlinePolicy { policy_name } => {
                format!("delete inline policy {policy_name} from {resource}")
            }
            TeardownStep::RemoveFromInstanceProfile { profile_name } => {
                format!("remove {resource} from instance profile {profile_name}")
            }
            TeardownStep::DeletePolicyVersion { version_id } => {
                format!("delete version {version_id} of {resource}")
            }
            TeardownStep::DeleteResource => format!("delete {resource}"),
        }
    }

    pub fn is_final_delete(&self) -> bool {
        matches!(self, TeardownStep::DeleteResource)
    }
}

/// Ordered teardown sequence for one unused resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionPlan {
    pub resource: Resource,
    pub steps: Vec<TeardownStep>,
}

/// Result of executing (or dry-running) one deletion plan.
///
/// Dry-run executions return `Deleted` just like live ones, so reporting
/// code needs no mode-specific branches; the run mode is carried by the
/// report itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Deleted,
    Failed { step: String, cause: String },
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn verdict_starts_not_in_use() {
        let v = LivenessVerdict::default();
        assert!(!v.in_use);
        assert!(v.reasons.is_empty());
        assert!(v.unchecked_sources.is_empty());
    }

    #[test]
    fn recording_a_match_sets_in_use() {
        let mut v = LivenessVerdict::default();
        v.record_match(UsageSignal {
            source: UsageSourceKind::LambdaFunction,
            detail: "ingest-fn".to_string(),
        });
        assert!(v.in_use);
        assert_eq!(v.reasons, vec!["lambda-function: ingest-fn"]);
    }

    #[test]
    fn recording_unchecked_does_not_set_in_use() {
        let mut v = LivenessVerdict::default();
        v.record_unchecked(UsageSourceKind::CodeBuildProject);
        assert!(!v.in_use);
        assert_eq!(
            v.unchecked_sources,
            vec![UsageSourceKind::CodeBuildProject]
        );
    }

    #[test]
    fn step_descriptions_name_the_resource() {
        let r = role("deploy");
        let step = TeardownStep::DetachManagedPolicy {
            policy_arn: "arn:aws:iam::aws:policy/ReadOnlyAccess".to_string(),
        };
        let text = step.describe(&r);
        assert!(text.contains("deploy"));
        assert!(text.contains("ReadOnlyAccess"));
    }

    #[test]
    fn activity_display_renders_unknown_for_both_absent_variants() {
        assert_eq!(ActivityRecord::NeverUsed.to_string(), "unknown");
        assert_eq!(ActivityRecord::NotTracked.to_string(), "unknown");
    }
}
