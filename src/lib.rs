//! aws-sweep - unused AWS resource detection and safe deletion
//!
//! Discovers IAM roles, customer-managed IAM policies, and EC2 security
//! groups that nothing in the account references anymore, and retires them
//! through dependency-ordered, dry-runnable teardown.
//!
//! ## Pipeline
//!
//! inventory -> liveness -> staleness classification -> deletion plan ->
//! executor -> run report. Each resource flows through independently;
//! inventory-wide usage lookups are fetched once per run and shared.

pub mod audit;
pub mod aws;
pub mod config;
pub mod confirm;
pub mod engine;
pub mod error;
pub mod executor;
pub mod inventory;
pub mod liveness;
pub mod model;
pub mod plan;
pub mod policy;
pub mod provider;
pub mod report;
