//! Run report: append-only aggregation of per-resource outcomes
//!
//! Built incrementally during the run via `record_*` calls; `finalize`
//! is the only read path and returns the same snapshot no matter how
//! often it is called.

use crate::model::{Classification, ExecutionOutcome, Resource, UsageSourceKind};
use serde::Serialize;

/// A deletion that did not complete, with its causing step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedResource {
    pub name: String,
    pub step: String,
    pub cause: String,
}

/// A resource that was not deleted on operator or cancellation grounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedResource {
    pub name: String,
    pub reason: String,
}

/// Immutable summary of one sweep run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// "dry-run" or "live"
    pub mode: String,
    pub analyzed: usize,
    pub active: Vec<String>,
    pub recent: Vec<String>,
    pub unused: Vec<String>,
    pub deleted: Vec<String>,
    pub failed: Vec<FailedResource>,
    pub skipped: Vec<SkippedResource>,
    /// Usage sources that could not be queried, disclosed so the operator
    /// knows the confidence gaps of this run
    pub unavailable_sources: Vec<String>,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Render the operator-facing summary table
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        out.push_str("\n=== Sweep Report ===\n");
        out.push_str(&format!("Mode: {}\n\n", self.mode));
        out.push_str(&format!("Analyzed: {}\n", self.analyzed));
        out.push_str(&format!("  Active:  {}\n", self.active.len()));
        out.push_str(&format!("  Recent:  {}\n", self.recent.len()));
        out.push_str(&format!("  Unused:  {}\n", self.unused.len()));
        out.push_str(&format!("Deleted: {}\n", self.deleted.len()));
        out.push_str(&format!("Failed:  {}\n", self.failed.len()));
        out.push_str(&format!("Skipped: {}\n", self.skipped.len()));

        if !self.unused.is_empty() {
            out.push_str("\nUnused resources:\n");
            for name in &self.unused {
                out.push_str(&format!("  {name}\n"));
            }
        }
        if !self.failed.is_empty() {
            out.push_str("\nFailed deletions:\n");
            for f in &self.failed {
                out.push_str(&format!("  {} ({}): {}\n", f.name, f.step, f.cause));
            }
        }
        if !self.skipped.is_empty() {
            out.push_str("\nSkipped:\n");
            for s in &self.skipped {
                out.push_str(&format!("  {} ({})\n", s.name, s.reason));
            }
        }
        if !self.unavailable_sources.is_empty() {
            out.push_str("\nUnchecked usage sources (results may be incomplete):\n");
            for s in &self.unavailable_sources {
                out.push_str(&format!("  {s}\n"));
            }
        }
        out
    }
}

/// Append-only builder for [`RunReport`]
#[derive(Debug)]
pub struct ReportBuilder {
    live: bool,
    analyzed: usize,
    active: Vec<String>,
    recent: Vec<String>,
    unused: Vec<String>,
    deleted: Vec<String>,
    failed: Vec<FailedResource>,
    skipped: Vec<SkippedResource>,
    unavailable_sources: Vec<String>,
}

impl ReportBuilder {
    pub fn new(live: bool) -> Self {
        Self {
            live,
            analyzed: 0,
            active: Vec::new(),
            recent: Vec::new(),
            unused: Vec::new(),
            deleted: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            unavailable_sources: Vec::new(),
        }
    }

    pub fn record_classification(&mut self, resource: &Resource, classification: Classification) {
        self.analyzed += 1;
        let bucket = match classification {
            Classification::Active => &mut self.active,
            Classification::Recent => &mut self.recent,
            Classification::Unused => &mut self.unused,
        };
        bucket.push(resource.name.clone());
    }

    pub fn record_outcome(&mut self, resource: &Resource, outcome: ExecutionOutcome) {
        match outcome {
            ExecutionOutcome::Deleted => self.deleted.push(resource.name.clone()),
            ExecutionOutcome::Failed { step, cause } => self.failed.push(FailedResource {
                name: resource.name.clone(),
                step,
                cause,
            }),
        }
    }

    pub fn record_skipped(&mut self, resource: &Resource, reason: &str) {
        self.skipped.push(SkippedResource {
            name: resource.name.clone(),
            reason: reason.to_string(),
        });
    }

    pub fn record_unavailable_source(&mut self, source: UsageSourceKind, reason: &str) {
        self.unavailable_sources
            .push(format!("{source}: {reason}"));
    }

    /// Snapshot the report. Idempotent: successive calls return identical
    /// values as long as nothing new was recorded.
    pub fn finalize(&self) -> RunReport {
        RunReport {
            mode: if self.live { "live" } else { "dry-run" }.to_string(),
            analyzed: self.analyzed,
            active: self.active.clone(),
            recent: self.recent.clone(),
            unused: self.unused.clone(),
            deleted: self.deleted.clone(),
            failed: self.failed.clone(),
            skipped: self.skipped.clone(),
            unavailable_sources: self.unavailable_sources.clone(),
        }
    }
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
            arn: String::new(),
            created_at: None,
            excluded: false,
        }
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut b = ReportBuilder::new(true);
        b.record_classification(&role("a"), Classification::Active);
        b.record_classification(&role("c"), Classification::Unused);
        b.record_outcome(&role("c"), ExecutionOutcome::Deleted);

        let first = b.finalize();
        let second = b.finalize();
        assert_eq!(first, second);
        assert_eq!(first.analyzed, 2);
        assert_eq!(first.deleted, vec!["c"]);
    }

    #[test]
    fn failures_carry_step_and_cause() {
        let mut b = ReportBuilder::new(true);
        b.record_outcome(
            &role("c"),
            ExecutionOutcome::Failed {
                step: "detach managed policy arn:p".to_string(),
                cause: "AccessDenied".to_string(),
            },
        );
        let report = b.finalize();
        assert!(report.has_failures());
        assert_eq!(report.failed[0].name, "c");
        assert!(report.render_table().contains("detach managed policy"));
    }

    #[test]
    fn table_discloses_unchecked_sources() {
        let mut b = ReportBuilder::new(false);
        b.record_unavailable_source(UsageSourceKind::CodeBuildProject, "AccessDenied");
        let table = b.finalize().render_table();
        assert!(table.contains("codebuild-project: AccessDenied"));
        assert!(table.contains("dry-run"));
    }
}
