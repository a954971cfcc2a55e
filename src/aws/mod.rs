//! AWS client modules
//!
//! Thin wrappers around AWS SDK clients:
//! - IAM: role/policy listing, attachment enumeration, teardown mutations
//! - EC2: security group listing and deletion, instance inventory
//! - STS: caller identity check
//! - usage: usage-source inventories (ECS, Lambda, CodeBuild,
//!   Auto Scaling, ELB/ELBv2, RDS)
//!
//! `AwsProvider` assembles these into the engine's `CloudProvider` seam.

pub mod account;
pub mod context;
pub mod ec2;
pub mod error;
pub mod iam;
pub mod provider;
pub mod usage;

pub use context::AwsContext;
pub use error::{classify_aws_error, AwsError};
pub use provider::AwsProvider;
