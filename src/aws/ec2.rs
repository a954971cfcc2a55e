//! EC2 security-group listing, instance scans, and group deletion

use crate::aws::context::AwsContext;
use crate::aws::error::is_not_found;
use crate::provider::{GroupRecord, GroupRef, GroupRuleRef, RoleRef};
use anyhow::{Context, Result};
use aws_sdk_ec2::types::{Instance, InstanceStateName};
use aws_sdk_ec2::Client;
use tracing::debug;

/// EC2 client wrapper for the sweep engine
pub struct Ec2Client {
    client: Client,
}

fn is_terminated(instance: &Instance) -> bool {
    matches!(
        instance.state().and_then(|s| s.name()),
        Some(InstanceStateName::Terminated)
    )
}

impl Ec2Client {
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ec2_client(),
        }
    }

    /// Names of all regions enabled for the account
    pub async fn enabled_regions(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .describe_regions()
            .send()
            .await
            .context("Failed to describe regions")?;
        Ok(response
            .regions()
            .iter()
            .filter_map(|r| r.region_name())
            .map(|s| s.to_string())
            .collect())
    }

    /// List every security group in the region, following pagination
    pub async fn list_security_groups(&self) -> Result<Vec<GroupRecord>> {
        let mut records = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self.client.describe_security_groups();
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }
            let response = request
                .send()
                .await
                .context("Failed to describe security groups")?;

            for group in response.security_groups() {
                let (Some(id), Some(name)) = (group.group_id(), group.group_name()) else {
                    continue;
                };
                records.push(GroupRecord {
                    id: id.to_string(),
                    name: name.to_string(),
                    description: group.description().unwrap_or_default().to_string(),
                    vpc_id: group.vpc_id().map(|s| s.to_string()),
                });
            }

            next_token = response.next_token().map(|s| s.to_string());
            if next_token.is_none() {
                break;
            }
        }

        debug!(count = records.len(), "Listed security groups");
        Ok(records)
    }

    /// Instance profiles attached to instances that are not terminated
    pub async fn instance_profile_refs(&self) -> Result<Vec<RoleRef>> {
        let mut refs = Vec::new();
        self.scan_instances(|instance| {
            if let Some(profile) = instance.iam_instance_profile() {
                if let Some(arn) = profile.arn() {
                    refs.push(RoleRef {
                        role: arn.to_string(),
                        used_by: format!(
                            "instance {}",
                            instance.instance_id().unwrap_or("unknown")
                        ),
                    });
                }
            }
        })
        .await?;
        Ok(refs)
    }

    /// Security groups attached to instances that are not terminated
    pub async fn instance_group_refs(&self) -> Result<Vec<GroupRef>> {
        let mut refs = Vec::new();
        self.scan_instances(|instance| {
            let used_by = format!("instance {}", instance.instance_id().unwrap_or("unknown"));
            for group in instance.security_groups() {
                if let Some(id) = group.group_id() {
                    refs.push(GroupRef {
                        group_id: id.to_string(),
                        used_by: used_by.clone(),
                    });
                }
            }
        })
        .await?;
        Ok(refs)
    }

    async fn scan_instances(&self, mut visit: impl FnMut(&Instance)) -> Result<()> {
        let mut next_token: Option<String> = None;
        loop {
            let mut request = self.client.describe_instances();
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }
            let response = request
                .send()
                .await
                .context("Failed to describe EC2 instances")?;

            for reservation in response.reservations() {
                for instance in reservation.instances() {
                    if is_terminated(instance) {
                        continue;
                    }
                    visit(instance);
                }
            }

            next_token = response.next_token().map(|s| s.to_string());
            if next_token.is_none() {
                break;
            }
        }
        Ok(())
    }

    /// Group-to-group references found in ingress and egress rules
    pub async fn group_rule_refs(&self) -> Result<Vec<GroupRuleRef>> {
        let mut refs = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self.client.describe_security_groups();
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }
            let response = request
                .send()
                .await
                .context("Failed to describe security group rules")?;

            for group in response.security_groups() {
                let Some(referencing) = group.group_id() else {
                    continue;
                };
                let permissions = group
                    .ip_permissions()
                    .iter()
                    .chain(group.ip_permissions_egress());
                for permission in permissions {
                    for pair in permission.user_id_group_pairs() {
                        if let Some(referenced) = pair.group_id() {
                            refs.push(GroupRuleRef {
                                referencing_group_id: referencing.to_string(),
                                referenced_group_id: referenced.to_string(),
                            });
                        }
                    }
                }
            }

            next_token = response.next_token().map(|s| s.to_string());
            if next_token.is_none() {
                break;
            }
        }

        Ok(refs)
    }

    pub async fn delete_security_group(&self, group_id: &str) -> Result<()> {
        match self
            .client
            .delete_security_group()
            .group_id(group_id)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => {
                debug!(group = %group_id, "Security group already deleted");
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to delete security group {group_id}")),
        }
    }
}
