//! AWS identity check via STS

use crate::provider::{AccountId, CallerIdentity};
use anyhow::{Context, Result};
use tracing::info;

/// Fetch the caller's account and principal ARN via STS GetCallerIdentity.
///
/// Requires no special permissions; it succeeds whenever credentials are
/// valid, which makes it the connectivity check performed before any
/// listing. Failure here is fatal to the run.
pub async fn get_caller_identity(config: &aws_config::SdkConfig) -> Result<CallerIdentity> {
    let sts = aws_sdk_sts::Client::new(config);
    let identity = sts
        .get_caller_identity()
        .send()
        .await
        .context("Failed to get AWS caller identity - check credentials")?;

    let account = identity
        .account()
        .context("No account ID returned from STS GetCallerIdentity")?;
    let principal = identity
        .arn()
        .context("No principal ARN returned from STS GetCallerIdentity")?;

    info!(account_id = %account, principal = %principal, "AWS account validated");

    Ok(CallerIdentity {
        account: AccountId(account.to_string()),
        principal: principal.to_string(),
    })
}
