//! Production `CloudProvider` backed by the AWS SDK

use crate::aws::account;
use crate::aws::context::AwsContext;
use crate::aws::ec2::Ec2Client;
use crate::aws::iam::IamClient;
use crate::aws::usage::UsageClients;
use crate::model::ActivityRecord;
use crate::provider::{
    CallerIdentity, CloudProvider, GroupRecord, GroupRef, GroupRuleRef, PolicyRecord,
    RoleAttachments, RoleRecord, RoleRef,
};
use anyhow::Result;

/// `CloudProvider` implementation over real AWS clients.
///
/// One instance targets one region; IAM calls are global but signed
/// against the same shared config.
pub struct AwsProvider {
    ctx: AwsContext,
    iam: IamClient,
    ec2: Ec2Client,
    usage: UsageClients,
}

impl AwsProvider {
    pub fn new(ctx: AwsContext) -> Self {
        let iam = IamClient::from_context(&ctx);
        let ec2 = Ec2Client::from_context(&ctx);
        let usage = UsageClients::from_context(&ctx);
        Self {
            ctx,
            iam,
            ec2,
            usage,
        }
    }
}

impl CloudProvider for AwsProvider {
    async fn caller_identity(&self) -> Result<CallerIdentity> {
        account::get_caller_identity(self.ctx.sdk_config()).await
    }

    async fn list_roles(&self) -> Result<Vec<RoleRecord>> {
        self.iam.list_roles().await
    }

    async fn list_local_policies(&self) -> Result<Vec<PolicyRecord>> {
        self.iam.list_local_policies().await
    }

    async fn list_security_groups(&self) -> Result<Vec<GroupRecord>> {
        self.ec2.list_security_groups().await
    }

    async fn role_last_used(&self, role_name: &str) -> Result<ActivityRecord> {
        self.iam.role_last_used(role_name).await
    }

    async fn instance_profile_refs(&self) -> Result<Vec<RoleRef>> {
        self.ec2.instance_profile_refs().await
    }

    async fn ecs_task_role_refs(&self) -> Result<Vec<RoleRef>> {
        self.usage.ecs_task_role_refs().await
    }

    async fn lambda_role_refs(&self) -> Result<Vec<RoleRef>> {
        self.usage.lambda_role_refs().await
    }

    async fn codebuild_role_refs(&self) -> Result<Vec<RoleRef>> {
        self.usage.codebuild_role_refs().await
    }

    async fn launch_config_role_refs(&self) -> Result<Vec<RoleRef>> {
        self.usage.launch_config_role_refs().await
    }

    async fn instance_group_refs(&self) -> Result<Vec<GroupRef>> {
        self.ec2.instance_group_refs().await
    }

    async fn classic_elb_group_refs(&self) -> Result<Vec<GroupRef>> {
        self.usage.classic_elb_group_refs().await
    }

    async fn elbv2_group_refs(&self) -> Result<Vec<GroupRef>> {
        self.usage.elbv2_group_refs().await
    }

    async fn rds_group_refs(&self) -> Result<Vec<GroupRef>> {
        self.usage.rds_group_refs().await
    }

    async fn group_rule_refs(&self) -> Result<Vec<GroupRuleRef>> {
        self.ec2.group_rule_refs().await
    }

    async fn role_attachments(&self, role_name: &str) -> Result<RoleAttachments> {
        self.iam.role_attachments(role_name).await
    }

    async fn policy_non_default_versions(&self, policy_arn: &str) -> Result<Vec<String>> {
        self.iam.policy_non_default_versions(policy_arn).await
    }

    async fn policy_entities(&self, policy_arn: &str) -> Result<Vec<String>> {
        self.iam.policy_entities(policy_arn).await
    }

    async fn detach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        self.iam.detach_role_policy(role_name, policy_arn).await
    }

    async fn delete_role_inline_policy(&self, role_name: &str, policy_name: &str) -> Result<()> {
        self.iam
            .delete_role_inline_policy(role_name, policy_name)
            .await
    }

    async fn remove_role_from_instance_profile(
        &self,
        role_name: &str,
        profile_name: &str,
    ) -> Result<()> {
        self.iam
            .remove_role_from_instance_profile(role_name, profile_name)
            .await
    }

    async fn delete_role(&self, role_name: &str) -> Result<()> {
        self.iam.delete_role(role_name).await
    }

    async fn delete_policy_version(&self, policy_arn: &str, version_id: &str) -> Result<()> {
        self.iam.delete_policy_version(policy_arn, version_id).await
    }

    async fn delete_policy(&self, policy_arn: &str) -> Result<()> {
        self.iam.delete_policy(policy_arn).await
    }

    async fn delete_security_group(&self, group_id: &str) -> Result<()> {
        self.ec2.delete_security_group(group_id).await
    }
}
