//! aws-sweep: find and retire unused IAM roles, IAM policies, and EC2
//! security groups.
//!
//! Dry-run by default; pass --execute to actually delete. Every deletion
//! attempt lands in a timestamped audit file.

use anyhow::{Context, Result};
use aws_sweep::audit::AuditLog;
use aws_sweep::aws::context::AwsContext;
use aws_sweep::aws::ec2::Ec2Client;
use aws_sweep::aws::AwsProvider;
use aws_sweep::config::{
    self, PolicyConfig, RunConfig, RuntimeFlags, TargetConfig, DEFAULT_CONCURRENCY,
    DEFAULT_DAYS_UNUSED,
};
use aws_sweep::confirm::{AutoApprove, ConfirmationPort, StdinConfirmer};
use aws_sweep::engine::Engine;
use aws_sweep::model::ResourceKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "aws-sweep")]
#[command(about = "Find and delete unused IAM roles, policies, and security groups")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

/// Flags shared by every sweep subcommand
#[derive(clap::Args, Debug)]
struct SweepArgs {
    /// Actually delete resources (default is dry-run)
    #[arg(long)]
    execute: bool,

    /// Days without observed activity before a resource counts as unused
    #[arg(long, default_value_t = DEFAULT_DAYS_UNUSED)]
    days_unused: i64,

    /// Resource name (or security group ID) to never delete; repeatable
    #[arg(long)]
    exclude: Vec<String>,

    /// AWS region; "all" sweeps security groups in every enabled region
    #[arg(long)]
    region: Option<String>,

    /// Prompt before each deletion (y = delete, n = skip, a = abort rest)
    #[arg(long)]
    confirm: bool,

    /// Concurrent resource evaluations
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Audit log file (default: timestamped file in the working directory)
    #[arg(long)]
    log_path: Option<PathBuf>,

    /// Don't write an audit file
    #[arg(long)]
    no_log: bool,

    /// Output format
    #[arg(long, default_value = "table", value_parser = ["table", "json"])]
    format: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sweep IAM roles
    Roles(SweepArgs),

    /// Sweep customer-managed IAM policies
    Policies(SweepArgs),

    /// Sweep EC2 security groups
    SecurityGroups(SweepArgs),

    /// Sweep all resource kinds
    All(SweepArgs),
}

impl Command {
    fn into_parts(self) -> (Vec<ResourceKind>, SweepArgs) {
        match self {
            Command::Roles(args) => (vec![ResourceKind::Role], args),
            Command::Policies(args) => (vec![ResourceKind::Policy], args),
            Command::SecurityGroups(args) => (vec![ResourceKind::SecurityGroup], args),
            Command::All(args) => (
                vec![
                    ResourceKind::Role,
                    ResourceKind::Policy,
                    ResourceKind::SecurityGroup,
                ],
                args,
            ),
        }
    }
}

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            print_error(&e);
            std::process::exit(1);
        }
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if std::env::var("RUST_BACKTRACE").is_err() {
        let _ = writeln!(
            stderr,
            "\n\x1b[2mSet RUST_BACKTRACE=1 for a detailed backtrace\x1b[0m"
        );
    }
}

async fn run() -> Result<i32> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let (kinds, sweep) = args.command.into_parts();

    let audit_path = if sweep.no_log {
        None
    } else {
        let path = sweep
            .log_path
            .clone()
            .unwrap_or_else(AuditLog::default_path);
        info!(path = %path.display(), "Writing audit log");
        Some(path)
    };

    // On Ctrl-C, finish the in-flight deletion and stop issuing new ones
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after in-flight work");
                cancel.cancel();
            }
        });
    }

    let mut exit_code = 0;

    if sweep.region.as_deref() == Some("all") {
        // IAM is global; sweep roles and policies once against the default
        // region, then walk every enabled region for security groups.
        let iam_kinds: Vec<ResourceKind> = kinds
            .iter()
            .copied()
            .filter(|k| *k != ResourceKind::SecurityGroup)
            .collect();
        if !iam_kinds.is_empty() {
            let code = sweep_once(None, iam_kinds, &sweep, audit_path.clone(), &cancel).await?;
            exit_code = exit_code.max(code);
        }

        if kinds.contains(&ResourceKind::SecurityGroup) {
            let ctx = AwsContext::new(None).await;
            let regions = Ec2Client::from_context(&ctx)
                .enabled_regions()
                .await
                .context("Failed to enumerate enabled regions")?;
            info!(count = regions.len(), "Sweeping security groups in all regions");
            for region in regions {
                if cancel.is_cancelled() {
                    break;
                }
                let code = sweep_once(
                    Some(&region),
                    vec![ResourceKind::SecurityGroup],
                    &sweep,
                    audit_path.clone(),
                    &cancel,
                )
                .await?;
                exit_code = exit_code.max(code);
            }
        }
    } else {
        exit_code = sweep_once(
            sweep.region.as_deref(),
            kinds,
            &sweep,
            audit_path,
            &cancel,
        )
        .await?;
    }

    Ok(exit_code)
}

/// Run one engine over one region; returns the process exit code
/// contribution (0 = clean, 2 = partial deletion failures)
async fn sweep_once(
    region: Option<&str>,
    kinds: Vec<ResourceKind>,
    args: &SweepArgs,
    audit_path: Option<PathBuf>,
    cancel: &CancellationToken,
) -> Result<i32> {
    let ctx = AwsContext::new(region).await;
    info!(
        region = %ctx.region(),
        kinds = ?kinds,
        execute = args.execute,
        "Starting sweep"
    );

    let audit = match &audit_path {
        Some(path) => AuditLog::open(path)
            .with_context(|| format!("Failed to open audit log {}", path.display()))?,
        None => AuditLog::disabled(),
    };

    let config = RunConfig {
        target: TargetConfig {
            kinds,
            exclude: args.exclude.clone(),
        },
        policy: PolicyConfig {
            days_unused: args.days_unused,
        },
        flags: RuntimeFlags {
            execute: args.execute,
            confirm: args.confirm,
            concurrency: args.concurrency,
            inter_delete_delay: config::DEFAULT_INTER_DELETE_DELAY,
            log_path: audit_path,
        },
    };

    let confirm: Box<dyn ConfirmationPort> = if args.confirm {
        Box::new(StdinConfirmer)
    } else {
        Box::new(AutoApprove)
    };

    let provider = AwsProvider::new(ctx);
    let engine = Engine::new(provider, confirm, config, audit, cancel.clone());
    let report = engine.run().await?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render_table());
        if !args.execute {
            println!("\nRun with --execute to actually delete resources.");
        }
    }

    Ok(if report.has_failures() { 2 } else { 0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn format_rejects_unknown_values() {
        assert!(Args::try_parse_from(["aws-sweep", "roles", "--format", "json"]).is_ok());
        assert!(Args::try_parse_from(["aws-sweep", "roles", "--format", "yaml"]).is_err());
    }
}
