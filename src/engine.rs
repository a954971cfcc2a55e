//! Sweep engine: inventory -> liveness -> classification -> teardown
//!
//! Per-resource evaluation runs on a bounded pool; deletions run
//! sequentially afterwards with a fixed inter-resource pause. The only
//! error that aborts a run is `ProviderUnreachable` from the identity
//! check or a listing call, and every configured kind is listed before
//! the first deletion, so a fatal error leaves nothing mutated;
//! everything else is folded into the report.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::audit::AuditLog;
use crate::config::RunConfig;
use crate::confirm::{Confirmation, ConfirmationPort};
use crate::error::SweepError;
use crate::executor;
use crate::inventory;
use crate::liveness::{self, GroupUsage, RoleUsage, SourceFetch};
use crate::model::{
    ActivityRecord, Classification, DeletionPlan, ExecutionOutcome, Resource, ResourceKind,
    UsageSourceKind,
};
use crate::plan;
use crate::policy;
use crate::provider::{CloudProvider, GroupRecord, PolicyRecord, RoleRecord};
use crate::report::{ReportBuilder, RunReport};

/// One resource after classification, with its plan if it is unused
struct Evaluated {
    resource: Resource,
    classification: Classification,
    /// Present iff classified unused; Err if plan enumeration failed
    plan: Option<Result<DeletionPlan, String>>,
}

/// Raw listing for one configured kind, fetched before any deletion
enum Listing {
    Roles(Vec<RoleRecord>),
    Policies(Vec<PolicyRecord>),
    Groups(Vec<GroupRecord>),
}

pub struct Engine<P, C> {
    provider: P,
    confirm: C,
    config: RunConfig,
    audit: AuditLog,
    cancel: CancellationToken,
}

impl<P: CloudProvider, C: ConfirmationPort> Engine<P, C> {
    pub fn new(
        provider: P,
        confirm: C,
        config: RunConfig,
        audit: AuditLog,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            provider,
            confirm,
            config,
            audit,
            cancel,
        }
    }

    /// Run the full pipeline over the configured resource kinds
    pub async fn run(&self) -> Result<RunReport, SweepError> {
        let identity = self
            .provider
            .caller_identity()
            .await
            .map_err(|e| SweepError::ProviderUnreachable(format!("{e:#}")))?;
        self.audit.info(&format!(
            "authenticated as {} (account {})",
            identity.principal, identity.account
        ));

        let cutoff = Utc::now() - Duration::days(self.config.policy.days_unused);
        self.audit.info(&format!(
            "staleness cutoff: {} ({} days)",
            cutoff.format("%Y-%m-%d %H:%M:%S"),
            self.config.policy.days_unused
        ));

        // Every configured kind is listed before anything is deleted, so
        // a failing listing aborts the run with nothing mutated.
        let mut listings = Vec::new();
        for kind in self.config.target.kinds.clone() {
            listings.push(match kind {
                ResourceKind::Role => Listing::Roles(
                    self.provider.list_roles().await.map_err(|e| {
                        SweepError::ProviderUnreachable(format!("listing roles: {e:#}"))
                    })?,
                ),
                ResourceKind::Policy => Listing::Policies(
                    self.provider.list_local_policies().await.map_err(|e| {
                        SweepError::ProviderUnreachable(format!("listing policies: {e:#}"))
                    })?,
                ),
                ResourceKind::SecurityGroup => Listing::Groups(
                    self.provider.list_security_groups().await.map_err(|e| {
                        SweepError::ProviderUnreachable(format!(
                            "listing security groups: {e:#}"
                        ))
                    })?,
                ),
            });
        }

        let mut report = ReportBuilder::new(self.config.flags.execute);

        for listing in listings {
            if self.cancel.is_cancelled() {
                self.audit.warning("run cancelled, stopping before next resource kind");
                break;
            }
            match listing {
                Listing::Roles(records) => self.sweep_roles(records, cutoff, &mut report).await,
                Listing::Policies(records) => {
                    self.sweep_policies(records, cutoff, &mut report).await
                }
                Listing::Groups(records) => self.sweep_groups(records, cutoff, &mut report).await,
            }
        }

        Ok(report.finalize())
    }

    // ── Per-kind sweeps ────────────────────────────────────────────────

    async fn sweep_roles(
        &self,
        records: Vec<RoleRecord>,
        cutoff: DateTime<Utc>,
        report: &mut ReportBuilder,
    ) {
        let candidates = self.admit(
            inventory::collect_roles(records, &self.config.target.exclude),
            report,
        );
        self.audit
            .info(&format!("evaluating {} IAM role(s)", candidates.len()));

        let (profiles, ecs, lambda, codebuild, launch_configs) = tokio::join!(
            self.provider.instance_profile_refs(),
            self.provider.ecs_task_role_refs(),
            self.provider.lambda_role_refs(),
            self.provider.codebuild_role_refs(),
            self.provider.launch_config_role_refs(),
        );
        let usage = RoleUsage {
            instance_profiles: SourceFetch::from_result(profiles),
            ecs_task_definitions: SourceFetch::from_result(ecs),
            lambda_functions: SourceFetch::from_result(lambda),
            codebuild_projects: SourceFetch::from_result(codebuild),
            launch_configurations: SourceFetch::from_result(launch_configs),
        };
        self.note_unavailable(usage.unavailable(), report);

        let evaluations = stream::iter(candidates)
            .map(|resource| {
                let usage = &usage;
                async move {
                    let verdict = liveness::evaluate_role(&resource, usage);
                    self.classify_and_plan(resource, verdict, cutoff).await
                }
            })
            .buffer_unordered(self.config.flags.concurrency)
            .collect::<Vec<_>>()
            .await;

        self.settle(evaluations, report).await;
    }

    async fn sweep_policies(
        &self,
        records: Vec<PolicyRecord>,
        cutoff: DateTime<Utc>,
        report: &mut ReportBuilder,
    ) {
        // Attachment counts come from the listing itself; keep them keyed
        // by ARN before the records become plain candidates.
        let counts: std::collections::HashMap<String, i64> = records
            .iter()
            .map(|p| (p.arn.clone(), p.attachment_count))
            .collect();

        let candidates = self.admit(
            inventory::collect_policies(records, &self.config.target.exclude),
            report,
        );
        self.audit
            .info(&format!("evaluating {} IAM policy(ies)", candidates.len()));

        let evaluations = stream::iter(candidates)
            .map(|resource| {
                let attachment_count = counts.get(&resource.id).copied().unwrap_or(0);
                async move {
                    // Entity names only enrich the report; losing them is
                    // not a liveness gap since the count is authoritative.
                    let entities = if attachment_count > 0 {
                        self.provider.policy_entities(&resource.id).await.ok()
                    } else {
                        None
                    };
                    let verdict = liveness::evaluate_policy(
                        &resource,
                        attachment_count,
                        entities.as_deref(),
                    );
                    self.classify_and_plan(resource, verdict, cutoff).await
                }
            })
            .buffer_unordered(self.config.flags.concurrency)
            .collect::<Vec<_>>()
            .await;

        self.settle(evaluations, report).await;
    }

    async fn sweep_groups(
        &self,
        records: Vec<GroupRecord>,
        cutoff: DateTime<Utc>,
        report: &mut ReportBuilder,
    ) {
        let candidates = self.admit(
            inventory::collect_security_groups(records, &self.config.target.exclude),
            report,
        );
        self.audit.info(&format!(
            "evaluating {} security group(s)",
            candidates.len()
        ));

        let (instances, classic, v2, rds, rules) = tokio::join!(
            self.provider.instance_group_refs(),
            self.provider.classic_elb_group_refs(),
            self.provider.elbv2_group_refs(),
            self.provider.rds_group_refs(),
            self.provider.group_rule_refs(),
        );
        let usage = GroupUsage {
            instances: SourceFetch::from_result(instances),
            classic_load_balancers: SourceFetch::from_result(classic),
            load_balancers_v2: SourceFetch::from_result(v2),
            rds_instances: SourceFetch::from_result(rds),
            rule_references: SourceFetch::from_result(rules),
        };
        self.note_unavailable(usage.unavailable(), report);

        let evaluations = stream::iter(candidates)
            .map(|resource| {
                let usage = &usage;
                async move {
                    let verdict = liveness::evaluate_group(&resource, usage);
                    self.classify_and_plan(resource, verdict, cutoff).await
                }
            })
            .buffer_unordered(self.config.flags.concurrency)
            .collect::<Vec<_>>()
            .await;

        self.settle(evaluations, report).await;
    }

    // ── Shared pipeline stages ─────────────────────────────────────────

    /// Disclose usage sources that could not be queried this run
    fn note_unavailable(
        &self,
        failed: Vec<(UsageSourceKind, String)>,
        report: &mut ReportBuilder,
    ) {
        for (source, reason) in failed {
            report.record_unavailable_source(source, &reason);
            self.audit
                .warning(&SweepError::SourceUnavailable { source, reason }.to_string());
        }
    }

    /// Log and drop operator-excluded resources; pass candidates through
    fn admit(&self, resources: Vec<Resource>, report: &mut ReportBuilder) -> Vec<Resource> {
        let (excluded, candidates): (Vec<_>, Vec<_>) =
            resources.into_iter().partition(|r| r.excluded);
        for r in &excluded {
            self.audit.info(&format!("{r} excluded by name, skipping"));
            report.record_skipped(r, "excluded by name");
        }
        candidates
    }

    async fn classify_and_plan(
        &self,
        resource: Resource,
        verdict: crate::model::LivenessVerdict,
        cutoff: DateTime<Utc>,
    ) -> Evaluated {
        let classification = if verdict.in_use {
            Classification::Active
        } else {
            match self.activity_for(&resource).await {
                Ok(activity) => {
                    let c = policy::classify(&verdict, activity, cutoff);
                    if c == Classification::Unused {
                        self.audit.info(&format!(
                            "{resource} unused (last activity: {activity})"
                        ));
                    }
                    c
                }
                Err(e) => {
                    // Missing activity metadata must not tip a resource
                    // into deletion
                    self.audit.warning(&format!(
                        "{resource}: activity lookup failed ({e:#}), treating as recently used"
                    ));
                    Classification::Recent
                }
            }
        };

        if classification == Classification::Active {
            self.audit.info(&format!(
                "{resource} active: {}",
                verdict.reasons.join("; ")
            ));
        }

        let plan = if classification == Classification::Unused {
            Some(
                plan::build_plan(&self.provider, &resource)
                    .await
                    .map_err(|e| format!("{e:#}")),
            )
        } else {
            None
        };

        Evaluated {
            resource,
            classification,
            plan,
        }
    }

    async fn activity_for(&self, resource: &Resource) -> Result<ActivityRecord> {
        match resource.kind {
            ResourceKind::Role => self.provider.role_last_used(&resource.id).await,
            // Neither policies nor security groups carry last-used metadata
            ResourceKind::Policy | ResourceKind::SecurityGroup => Ok(ActivityRecord::NotTracked),
        }
    }

    /// Record classifications and run the teardown phase for one kind
    async fn settle(&self, mut evaluations: Vec<Evaluated>, report: &mut ReportBuilder) {
        // buffer_unordered yields in completion order; settle deterministically
        evaluations.sort_by(|a, b| a.resource.name.cmp(&b.resource.name));

        let mut plans = Vec::new();
        for eval in evaluations {
            report.record_classification(&eval.resource, eval.classification);
            match eval.plan {
                Some(Ok(plan)) => plans.push(plan),
                Some(Err(cause)) => {
                    self.audit.error(&format!(
                        "{}: failed to enumerate attachments: {cause}",
                        eval.resource
                    ));
                    report.record_outcome(
                        &eval.resource,
                        ExecutionOutcome::Failed {
                            step: "enumerate attachments".to_string(),
                            cause,
                        },
                    );
                }
                None => {}
            }
        }

        self.execute_plans(plans, report).await;
    }

    async fn execute_plans(&self, plans: Vec<DeletionPlan>, report: &mut ReportBuilder) {
        let live = self.config.flags.execute;
        let mut aborted = false;
        let mut ran_any = false;

        for plan in plans {
            if aborted {
                report.record_skipped(&plan.resource, "aborted by operator");
                continue;
            }
            // A cancelled run stops issuing new deletions; the in-flight
            // plan (if any) has already completed by this point.
            if self.cancel.is_cancelled() {
                report.record_skipped(&plan.resource, "run cancelled");
                continue;
            }

            if live && self.config.flags.confirm {
                match self.confirm.ask(&plan.resource) {
                    Confirmation::Accept => {}
                    Confirmation::Skip => {
                        self.audit
                            .info(&format!("{}: {}", plan.resource, SweepError::UserCancelled));
                        report.record_skipped(&plan.resource, "declined");
                        continue;
                    }
                    Confirmation::AbortRemaining => {
                        self.audit.warning(&format!(
                            "{}: {}; aborting remaining deletions",
                            plan.resource,
                            SweepError::UserCancelled
                        ));
                        aborted = true;
                        report.record_skipped(&plan.resource, "aborted by operator");
                        continue;
                    }
                }
            }

            // Pace successive deletions to respect provider rate limits
            if live && ran_any {
                tokio::time::sleep(self.config.flags.inter_delete_delay).await;
            }
            ran_any = true;

            let outcome = executor::execute_plan(&self.provider, &plan, live, &self.audit).await;
            report.record_outcome(&plan.resource, outcome);
        }
    }
}
