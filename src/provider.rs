//! The stable query/delete interface the engine consumes
//!
//! `CloudProvider` is the seam between the engine and AWS: the engine only
//! ever talks to this trait, which lets integration tests run the whole
//! pipeline against an in-memory fake. The production implementation is
//! `crate::aws::AwsProvider`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::future::Future;

use crate::model::ActivityRecord;

/// Strongly-typed AWS account ID (12-digit string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display, derive_more::Deref)]
pub struct AccountId(pub String);

/// Result of the startup identity/connectivity check
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub account: AccountId,
    /// ARN of the calling principal
    pub principal: String,
}

/// IAM role as returned by the listing call
#[derive(Debug, Clone)]
pub struct RoleRecord {
    pub name: String,
    pub arn: String,
    pub path: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Customer-managed IAM policy as returned by the listing call
#[derive(Debug, Clone)]
pub struct PolicyRecord {
    pub name: String,
    pub arn: String,
    pub path: String,
    pub attachment_count: i64,
    pub created_at: Option<DateTime<Utc>>,
}

/// EC2 security group as returned by the listing call
#[derive(Debug, Clone)]
pub struct GroupRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub vpc_id: Option<String>,
}

/// One reference to a role from a usage source.
///
/// `role` is whatever identifier the source exposes (often an ARN, for
/// instance profiles only a profile ARN containing the role name);
/// `used_by` names the referencing entity.
#[derive(Debug, Clone)]
pub struct RoleRef {
    pub role: String,
    pub used_by: String,
}

/// One reference to a security group from a usage source
#[derive(Debug, Clone)]
pub struct GroupRef {
    pub group_id: String,
    pub used_by: String,
}

/// One group-to-group rule reference (ingress or egress)
#[derive(Debug, Clone)]
pub struct GroupRuleRef {
    /// Group whose rules contain the reference
    pub referencing_group_id: String,
    /// Group named inside the rule
    pub referenced_group_id: String,
}

/// Sub-resources attached to a role that must be detached before deletion
#[derive(Debug, Clone, Default)]
pub struct RoleAttachments {
    pub managed_policy_arns: Vec<String>,
    pub inline_policy_names: Vec<String>,
    pub instance_profile_names: Vec<String>,
}

/// Cloud-provider client surface the engine depends on.
///
/// Mutating operations treat "not found" as success: the resource being
/// gone already is the goal state. All other errors propagate.
pub trait CloudProvider: Send + Sync {
    /// Identity/connectivity check, performed once at startup.
    /// Failure here is fatal and aborts before any listing.
    fn caller_identity(&self) -> impl Future<Output = Result<CallerIdentity>> + Send;

    // ── Inventory ──────────────────────────────────────────────────────

    fn list_roles(&self) -> impl Future<Output = Result<Vec<RoleRecord>>> + Send;
    fn list_local_policies(&self) -> impl Future<Output = Result<Vec<PolicyRecord>>> + Send;
    fn list_security_groups(&self) -> impl Future<Output = Result<Vec<GroupRecord>>> + Send;

    // ── Activity metadata ──────────────────────────────────────────────

    fn role_last_used(
        &self,
        role_name: &str,
    ) -> impl Future<Output = Result<ActivityRecord>> + Send;

    // ── Usage-source inventories (fetched once per run) ────────────────

    /// Instance profiles attached to non-terminated EC2 instances
    fn instance_profile_refs(&self) -> impl Future<Output = Result<Vec<RoleRef>>> + Send;
    /// Task and execution roles of active ECS task definitions
    fn ecs_task_role_refs(&self) -> impl Future<Output = Result<Vec<RoleRef>>> + Send;
    /// Execution roles of Lambda functions
    fn lambda_role_refs(&self) -> impl Future<Output = Result<Vec<RoleRef>>> + Send;
    /// Service roles of CodeBuild projects
    fn codebuild_role_refs(&self) -> impl Future<Output = Result<Vec<RoleRef>>> + Send;
    /// Instance profiles of Auto Scaling launch configurations
    fn launch_config_role_refs(&self) -> impl Future<Output = Result<Vec<RoleRef>>> + Send;

    /// Security groups attached to non-terminated EC2 instances
    fn instance_group_refs(&self) -> impl Future<Output = Result<Vec<GroupRef>>> + Send;
    /// Security groups of classic load balancers
    fn classic_elb_group_refs(&self) -> impl Future<Output = Result<Vec<GroupRef>>> + Send;
    /// Security groups of ALBs/NLBs
    fn elbv2_group_refs(&self) -> impl Future<Output = Result<Vec<GroupRef>>> + Send;
    /// Security groups of RDS instances
    fn rds_group_refs(&self) -> impl Future<Output = Result<Vec<GroupRef>>> + Send;
    /// Group-to-group references from ingress/egress rules
    fn group_rule_refs(&self) -> impl Future<Output = Result<Vec<GroupRuleRef>>> + Send;

    // ── Dependency enumeration ─────────────────────────────────────────

    fn role_attachments(
        &self,
        role_name: &str,
    ) -> impl Future<Output = Result<RoleAttachments>> + Send;
    /// Version IDs of all non-default versions of a managed policy
    fn policy_non_default_versions(
        &self,
        policy_arn: &str,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;
    /// Names of users/groups/roles the policy is attached to
    fn policy_entities(
        &self,
        policy_arn: &str,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;

    // ── Mutations ──────────────────────────────────────────────────────

    fn detach_role_policy(
        &self,
        role_name: &str,
        policy_arn: &str,
    ) -> impl Future<Output = Result<()>> + Send;
    fn delete_role_inline_policy(
        &self,
        role_name: &str,
        policy_name: &str,
    ) -> impl Future<Output = Result<()>> + Send;
    fn remove_role_from_instance_profile(
        &self,
        role_name: &str,
        profile_name: &str,
    ) -> impl Future<Output = Result<()>> + Send;
    fn delete_role(&self, role_name: &str) -> impl Future<Output = Result<()>> + Send;
    fn delete_policy_version(
        &self,
        policy_arn: &str,
        version_id: &str,
    ) -> impl Future<Output = Result<()>> + Send;
    fn delete_policy(&self, policy_arn: &str) -> impl Future<Output = Result<()>> + Send;
    fn delete_security_group(&self, group_id: &str) -> impl Future<Output = Result<()>> + Send;
}
