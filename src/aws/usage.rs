//! Usage-source scans outside IAM and EC2 proper.
//!
//! Each scan walks one service's inventory and reports which roles or
//! security groups it references. Scans are fetched once per run and the
//! engine evaluates every candidate against the snapshots.

use crate::aws::context::AwsContext;
use crate::provider::{GroupRef, RoleRef};
use anyhow::{Context, Result};
use aws_sdk_ecs::types::TaskDefinitionStatus;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

/// Parallelism for per-item describe calls within one scan
const DESCRIBE_CONCURRENCY: usize = 8;

/// CodeBuild caps BatchGetProjects at 100 names per call
const CODEBUILD_BATCH_SIZE: usize = 100;

/// Clients for every service scanned as a usage source
pub struct UsageClients {
    ecs: aws_sdk_ecs::Client,
    lambda: aws_sdk_lambda::Client,
    codebuild: aws_sdk_codebuild::Client,
    autoscaling: aws_sdk_autoscaling::Client,
    elb: aws_sdk_elasticloadbalancing::Client,
    elbv2: aws_sdk_elasticloadbalancingv2::Client,
    rds: aws_sdk_rds::Client,
}

impl UsageClients {
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            ecs: ctx.ecs_client(),
            lambda: ctx.lambda_client(),
            codebuild: ctx.codebuild_client(),
            autoscaling: ctx.autoscaling_client(),
            elb: ctx.elb_client(),
            elbv2: ctx.elbv2_client(),
            rds: ctx.rds_client(),
        }
    }

    /// Task and execution roles of active ECS task definitions
    pub async fn ecs_task_role_refs(&self) -> Result<Vec<RoleRef>> {
        let mut arns = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self
                .ecs
                .list_task_definitions()
                .status(TaskDefinitionStatus::Active);
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }
            let response = request
                .send()
                .await
                .context("Failed to list ECS task definitions")?;
            arns.extend(response.task_definition_arns().iter().cloned());
            next_token = response.next_token().map(|s| s.to_string());
            if next_token.is_none() {
                break;
            }
        }

        debug!(count = arns.len(), "Describing ECS task definitions");

        let refs: Vec<Vec<RoleRef>> = stream::iter(arns)
            .map(|arn| async move {
                let response = self
                    .ecs
                    .describe_task_definition()
                    .task_definition(&arn)
                    .send()
                    .await
                    .with_context(|| format!("Failed to describe task definition {arn}"))?;
                let mut found = Vec::new();
                if let Some(def) = response.task_definition() {
                    let used_by = format!("task definition {arn}");
                    if let Some(role) = def.task_role_arn() {
                        found.push(RoleRef {
                            role: role.to_string(),
                            used_by: used_by.clone(),
                        });
                    }
                    if let Some(role) = def.execution_role_arn() {
                        found.push(RoleRef {
                            role: role.to_string(),
                            used_by,
                        });
                    }
                }
                anyhow::Ok(found)
            })
            .buffer_unordered(DESCRIBE_CONCURRENCY)
            .try_collect()
            .await?;

        Ok(refs.into_iter().flatten().collect())
    }

    /// Execution roles of Lambda functions
    pub async fn lambda_role_refs(&self) -> Result<Vec<RoleRef>> {
        let mut refs = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut request = self.lambda.list_functions();
            if let Some(m) = &marker {
                request = request.marker(m);
            }
            let response = request
                .send()
                .await
                .context("Failed to list Lambda functions")?;

            for function in response.functions() {
                if let Some(role) = function.role() {
                    refs.push(RoleRef {
                        role: role.to_string(),
                        used_by: format!(
                            "function {}",
                            function.function_name().unwrap_or("unknown")
                        ),
                    });
                }
            }

            marker = response.next_marker().map(|s| s.to_string());
            if marker.is_none() {
                break;
            }
        }

        Ok(refs)
    }

    /// Service roles of CodeBuild projects
    pub async fn codebuild_role_refs(&self) -> Result<Vec<RoleRef>> {
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self.codebuild.list_projects();
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }
            let response = request
                .send()
                .await
                .context("Failed to list CodeBuild projects")?;
            names.extend(response.projects().iter().cloned());
            next_token = response.next_token().map(|s| s.to_string());
            if next_token.is_none() {
                break;
            }
        }

        let mut refs = Vec::new();
        for chunk in names.chunks(CODEBUILD_BATCH_SIZE) {
            let response = self
                .codebuild
                .batch_get_projects()
                .set_names(Some(chunk.to_vec()))
                .send()
                .await
                .context("Failed to describe CodeBuild projects")?;
            for project in response.projects() {
                if let Some(role) = project.service_role() {
                    refs.push(RoleRef {
                        role: role.to_string(),
                        used_by: format!("project {}", project.name().unwrap_or("unknown")),
                    });
                }
            }
        }

        Ok(refs)
    }

    /// Instance profiles of Auto Scaling launch configurations
    pub async fn launch_config_role_refs(&self) -> Result<Vec<RoleRef>> {
        let mut refs = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self.autoscaling.describe_launch_configurations();
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }
            let response = request
                .send()
                .await
                .context("Failed to describe launch configurations")?;

            for config in response.launch_configurations() {
                if let Some(profile) = config.iam_instance_profile() {
                    refs.push(RoleRef {
                        role: profile.to_string(),
                        used_by: format!(
                            "launch configuration {}",
                            config.launch_configuration_name()
                        ),
                    });
                }
            }

            next_token = response.next_token().map(|s| s.to_string());
            if next_token.is_none() {
                break;
            }
        }

        Ok(refs)
    }

    /// Security groups of classic load balancers
    pub async fn classic_elb_group_refs(&self) -> Result<Vec<GroupRef>> {
        let mut refs = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut request = self.elb.describe_load_balancers();
            if let Some(m) = &marker {
                request = request.marker(m);
            }
            let response = request
                .send()
                .await
                .context("Failed to describe classic load balancers")?;

            for lb in response.load_balancer_descriptions() {
                let used_by =
                    format!("load balancer {}", lb.load_balancer_name().unwrap_or("unknown"));
                for group_id in lb.security_groups() {
                    refs.push(GroupRef {
                        group_id: group_id.clone(),
                        used_by: used_by.clone(),
                    });
                }
            }

            marker = response.next_marker().map(|s| s.to_string());
            if marker.is_none() {
                break;
            }
        }

        Ok(refs)
    }

    /// Security groups of ALBs and NLBs
    pub async fn elbv2_group_refs(&self) -> Result<Vec<GroupRef>> {
        let mut refs = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut request = self.elbv2.describe_load_balancers();
            if let Some(m) = &marker {
                request = request.marker(m);
            }
            let response = request
                .send()
                .await
                .context("Failed to describe load balancers")?;

            for lb in response.load_balancers() {
                let used_by =
                    format!("load balancer {}", lb.load_balancer_name().unwrap_or("unknown"));
                for group_id in lb.security_groups() {
                    refs.push(GroupRef {
                        group_id: group_id.clone(),
                        used_by: used_by.clone(),
                    });
                }
            }

            marker = response.next_marker().map(|s| s.to_string());
            if marker.is_none() {
                break;
            }
        }

        Ok(refs)
    }

    /// Security groups of RDS instances
    pub async fn rds_group_refs(&self) -> Result<Vec<GroupRef>> {
        let mut refs = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut request = self.rds.describe_db_instances();
            if let Some(m) = &marker {
                request = request.marker(m);
            }
            let response = request
                .send()
                .await
                .context("Failed to describe RDS instances")?;

            for instance in response.db_instances() {
                let used_by = format!(
                    "database {}",
                    instance.db_instance_identifier().unwrap_or("unknown")
                );
                for membership in instance.vpc_security_groups() {
                    if let Some(id) = membership.vpc_security_group_id() {
                        refs.push(GroupRef {
                            group_id: id.to_string(),
                            used_by: used_by.clone(),
                        });
                    }
                }
            }

            marker = response.marker().map(|s| s.to_string());
            if marker.is_none() {
                break;
            }
        }

        Ok(refs)
    }
}
