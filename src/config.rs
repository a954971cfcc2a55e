//! Run configuration
//!
//! Composed of focused sub-configs; assembled from CLI flags in `main`.

use crate::model::ResourceKind;
use std::path::PathBuf;
use std::time::Duration;

/// Default staleness cutoff in days
pub const DEFAULT_DAYS_UNUSED: i64 = 90;

/// Default bounded-pool width for concurrent evaluations
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Default pause between successive deletions (provider rate limits)
pub const DEFAULT_INTER_DELETE_DELAY: Duration = Duration::from_millis(750);

/// What to sweep and where
#[derive(Debug, Clone)]
pub struct TargetConfig {
    /// Resource kinds to process, in order
    pub kinds: Vec<ResourceKind>,
    /// Names excluded from deletion by the operator
    pub exclude: Vec<String>,
}

/// Staleness policy parameters
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// Resources with activity newer than now - days_unused are kept
    pub days_unused: i64,
}

/// Runtime behavior flags
#[derive(Debug, Clone)]
pub struct RuntimeFlags {
    /// Actually delete resources (false = dry run)
    pub execute: bool,
    /// Prompt per deletion with accept/skip/abort-remaining
    pub confirm: bool,
    /// Bounded pool width for concurrent evaluations
    pub concurrency: usize,
    /// Pause between successive deletion plans
    pub inter_delete_delay: Duration,
    /// Audit log file path (None = disabled, used by tests)
    pub log_path: Option<PathBuf>,
}

/// Configuration for one sweep run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub target: TargetConfig,
    pub policy: PolicyConfig,
    pub flags: RuntimeFlags,
}

impl RunConfig {
    /// Dry-run config over the given kinds, used as a test baseline
    pub fn dry_run(kinds: Vec<ResourceKind>) -> Self {
        Self {
            target: TargetConfig {
                kinds,
                exclude: Vec::new(),
            },
            policy: PolicyConfig {
                days_unused: DEFAULT_DAYS_UNUSED,
            },
            flags: RuntimeFlags {
                execute: false,
                confirm: false,
                concurrency: DEFAULT_CONCURRENCY,
                inter_delete_delay: Duration::ZERO,
                log_path: None,
            },
        }
    }
}
