//! IAM listing, attachment enumeration, and teardown mutations

use crate::aws::context::AwsContext;
use crate::aws::error::is_not_found;
use crate::model::ActivityRecord;
use crate::provider::{PolicyRecord, RoleAttachments, RoleRecord};
use anyhow::{Context, Result};
use aws_sdk_iam::types::PolicyScopeType;
use aws_sdk_iam::Client;
use chrono::{DateTime, Utc};
use tracing::debug;

fn to_chrono(dt: &aws_sdk_iam::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

/// IAM client wrapper for the sweep engine
pub struct IamClient {
    client: Client,
}

impl IamClient {
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.iam_client(),
        }
    }

    /// List every role in the account, following pagination
    pub async fn list_roles(&self) -> Result<Vec<RoleRecord>> {
        let mut records = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut request = self.client.list_roles();
            if let Some(m) = &marker {
                request = request.marker(m);
            }
            let response = request.send().await.context("Failed to list IAM roles")?;

            for role in response.roles() {
                records.push(RoleRecord {
                    name: role.role_name().to_string(),
                    arn: role.arn().to_string(),
                    path: role.path().to_string(),
                    created_at: to_chrono(role.create_date()),
                });
            }

            if response.is_truncated() {
                marker = response.marker().map(|s| s.to_string());
            } else {
                break;
            }
        }

        debug!(count = records.len(), "Listed IAM roles");
        Ok(records)
    }

    /// List customer-managed policies, following pagination
    pub async fn list_local_policies(&self) -> Result<Vec<PolicyRecord>> {
        let mut records = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut request = self.client.list_policies().scope(PolicyScopeType::Local);
            if let Some(m) = &marker {
                request = request.marker(m);
            }
            let response = request
                .send()
                .await
                .context("Failed to list IAM policies")?;

            for policy in response.policies() {
                let (Some(name), Some(arn)) = (policy.policy_name(), policy.arn()) else {
                    continue;
                };
                records.push(PolicyRecord {
                    name: name.to_string(),
                    arn: arn.to_string(),
                    path: policy.path().unwrap_or("/").to_string(),
                    attachment_count: i64::from(policy.attachment_count().unwrap_or(0)),
                    created_at: policy.create_date().and_then(to_chrono),
                });
            }

            if response.is_truncated() {
                marker = response.marker().map(|s| s.to_string());
            } else {
                break;
            }
        }

        debug!(count = records.len(), "Listed customer-managed policies");
        Ok(records)
    }

    /// Last-used timestamp from the role's provider-maintained metadata.
    ///
    /// `NeverUsed` when IAM tracks the role but has recorded nothing.
    pub async fn role_last_used(&self, role_name: &str) -> Result<ActivityRecord> {
        let response = self
            .client
            .get_role()
            .role_name(role_name)
            .send()
            .await
            .with_context(|| format!("Failed to get role {role_name}"))?;

        let last_used = response
            .role()
            .and_then(|r| r.role_last_used())
            .and_then(|lu| lu.last_used_date())
            .and_then(to_chrono);

        Ok(match last_used {
            Some(t) => ActivityRecord::Observed(t),
            None => ActivityRecord::NeverUsed,
        })
    }

    /// Everything attached to a role that blocks its deletion
    pub async fn role_attachments(&self, role_name: &str) -> Result<RoleAttachments> {
        let mut attachments = RoleAttachments::default();

        let mut marker: Option<String> = None;
        loop {
            let mut request = self.client.list_attached_role_policies().role_name(role_name);
            if let Some(m) = &marker {
                request = request.marker(m);
            }
            let response = request
                .send()
                .await
                .with_context(|| format!("Failed to list attached policies of {role_name}"))?;
            for policy in response.attached_policies() {
                if let Some(arn) = policy.policy_arn() {
                    attachments.managed_policy_arns.push(arn.to_string());
                }
            }
            if response.is_truncated() {
                marker = response.marker().map(|s| s.to_string());
            } else {
                break;
            }
        }

        let mut marker: Option<String> = None;
        loop {
            let mut request = self.client.list_role_policies().role_name(role_name);
            if let Some(m) = &marker {
                request = request.marker(m);
            }
            let response = request
                .send()
                .await
                .with_context(|| format!("Failed to list inline policies of {role_name}"))?;
            attachments
                .inline_policy_names
                .extend(response.policy_names().iter().cloned());
            if response.is_truncated() {
                marker = response.marker().map(|s| s.to_string());
            } else {
                break;
            }
        }

        let mut marker: Option<String> = None;
        loop {
            let mut request = self
                .client
                .list_instance_profiles_for_role()
                .role_name(role_name);
            if let Some(m) = &marker {
                request = request.marker(m);
            }
            let response = request
                .send()
                .await
                .with_context(|| format!("Failed to list instance profiles of {role_name}"))?;
            for profile in response.instance_profiles() {
                attachments
                    .instance_profile_names
                    .push(profile.instance_profile_name().to_string());
            }
            if response.is_truncated() {
                marker = response.marker().map(|s| s.to_string());
            } else {
                break;
            }
        }

        Ok(attachments)
    }

    /// Version IDs of all non-default versions of a managed policy
    pub async fn policy_non_default_versions(&self, policy_arn: &str) -> Result<Vec<String>> {
        let mut versions = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut request = self.client.list_policy_versions().policy_arn(policy_arn);
            if let Some(m) = &marker {
                request = request.marker(m);
            }
            let response = request
                .send()
                .await
                .with_context(|| format!("Failed to list versions of {policy_arn}"))?;

            for version in response.versions() {
                if !version.is_default_version() {
                    if let Some(id) = version.version_id() {
                        versions.push(id.to_string());
                    }
                }
            }

            if response.is_truncated() {
                marker = response.marker().map(|s| s.to_string());
            } else {
                break;
            }
        }

        Ok(versions)
    }

    /// Principals (users, groups, roles) the policy is attached to
    pub async fn policy_entities(&self, policy_arn: &str) -> Result<Vec<String>> {
        let mut entities = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut request = self.client.list_entities_for_policy().policy_arn(policy_arn);
            if let Some(m) = &marker {
                request = request.marker(m);
            }
            let response = request
                .send()
                .await
                .with_context(|| format!("Failed to list entities for {policy_arn}"))?;

            for user in response.policy_users() {
                if let Some(name) = user.user_name() {
                    entities.push(format!("user/{name}"));
                }
            }
            for group in response.policy_groups() {
                if let Some(name) = group.group_name() {
                    entities.push(format!("group/{name}"));
                }
            }
            for role in response.policy_roles() {
                if let Some(name) = role.role_name() {
                    entities.push(format!("role/{name}"));
                }
            }

            if response.is_truncated() {
                marker = response.marker().map(|s| s.to_string());
            } else {
                break;
            }
        }

        Ok(entities)
    }

    // ── Mutations ──────────────────────────────────────────────────────
    // "Not found" means the goal state was already reached; every other
    // error propagates to fail the current teardown step.

    pub async fn detach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        match self
            .client
            .detach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => {
                debug!(role = %role_name, policy = %policy_arn, "Policy already detached");
                Ok(())
            }
            Err(e) => {
                Err(e).with_context(|| format!("Failed to detach {policy_arn} from {role_name}"))
            }
        }
    }

    pub async fn delete_role_inline_policy(
        &self,
        role_name: &str,
        policy_name: &str,
    ) -> Result<()> {
        match self
            .client
            .delete_role_policy()
            .role_name(role_name)
            .policy_name(policy_name)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => {
                debug!(role = %role_name, policy = %policy_name, "Inline policy already deleted");
                Ok(())
            }
            Err(e) => Err(e)
                .with_context(|| format!("Failed to delete inline policy {policy_name} of {role_name}")),
        }
    }

    pub async fn remove_role_from_instance_profile(
        &self,
        role_name: &str,
        profile_name: &str,
    ) -> Result<()> {
        match self
            .client
            .remove_role_from_instance_profile()
            .instance_profile_name(profile_name)
            .role_name(role_name)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => {
                debug!(role = %role_name, profile = %profile_name, "Role already removed from profile");
                Ok(())
            }
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove {role_name} from profile {profile_name}")),
        }
    }

    pub async fn delete_role(&self, role_name: &str) -> Result<()> {
        match self.client.delete_role().role_name(role_name).send().await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => {
                debug!(role = %role_name, "Role already deleted");
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to delete role {role_name}")),
        }
    }

    pub async fn delete_policy_version(&self, policy_arn: &str, version_id: &str) -> Result<()> {
        match self
            .client
            .delete_policy_version()
            .policy_arn(policy_arn)
            .version_id(version_id)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => {
                debug!(policy = %policy_arn, version = %version_id, "Policy version already deleted");
                Ok(())
            }
            Err(e) => Err(e)
                .with_context(|| format!("Failed to delete version {version_id} of {policy_arn}")),
        }
    }

    pub async fn delete_policy(&self, policy_arn: &str) -> Result<()> {
        match self
            .client
            .delete_policy()
            .policy_arn(policy_arn)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => {
                debug!(policy = %policy_arn, "Policy already deleted");
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to delete policy {policy_arn}")),
        }
    }
}
