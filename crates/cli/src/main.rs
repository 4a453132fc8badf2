//! Command-line interface for the OCCAM compliance agent orchestrator.
//!
//! Unlike the teacher's `acteon-cli`, this binary does not talk to a remote
//! gateway over HTTP — `occam-core`'s Non-goals exclude a wire transport, so
//! this binary is the one concrete caller the orchestrator, status engine,
//! and their in-memory collaborators are wired into directly, in-process.

mod agents;
mod bootstrap;
mod commands;
mod config;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "occam", version, about)]
struct Cli {
    /// Path to an `OrchestratorConfig` TOML file. Defaults are used when
    /// omitted.
    #[arg(long, env = "OCCAM_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Output format.
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit, fetch, or drive a compliance workflow.
    Workflow(commands::workflow::WorkflowArgs),
    /// Progress tracking and entity risk summaries.
    Status(commands::status::StatusArgs),
    /// Query the tamper-evident audit trail.
    Audit(commands::audit::AuditArgs),
    /// Fetch or decide a pending governance approval.
    Approvals(commands::approvals::ApprovalsArgs),
    /// Run the license-renewal alert sweep once.
    Sweep,
    /// Purge audit events whose retention deadline has passed.
    Retention,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let orchestrator_config = config::load(cli.config.as_deref())?;
    let system = bootstrap::build(orchestrator_config)?;

    match cli.command {
        Command::Workflow(args) => commands::workflow::run(&system.orchestrator, &args, &cli.format).await,
        Command::Status(args) => commands::status::run(&system.orchestrator, &system.status, &args, &cli.format).await,
        Command::Audit(args) => commands::audit::run(&system.orchestrator, &args, &cli.format).await,
        Command::Approvals(args) => commands::approvals::run(&system.orchestrator, &args, &cli.format).await,
        Command::Sweep => commands::sweep::run(&system.status, &cli.format).await,
        Command::Retention => commands::retention::run(&system.status, &cli.format).await,
    }
}
