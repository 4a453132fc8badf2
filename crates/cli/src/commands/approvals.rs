use clap::{Args, Subcommand, ValueEnum};

use occam_core::{ApprovalDecision, ApprovalId};
use occam_orchestrator::Orchestrator;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct ApprovalsArgs {
    #[command(subcommand)]
    pub command: ApprovalsCommand,
}

#[derive(Subcommand, Debug)]
pub enum ApprovalsCommand {
    /// Fetch a pending (or decided) approval request.
    Get {
        #[arg(long)]
        id: String,
    },
    /// Approve or reject a pending approval, resuming or failing the
    /// underlying workflow accordingly.
    Decide {
        #[arg(long)]
        id: String,
        #[arg(long)]
        decision: Decision,
        #[arg(long)]
        decided_by: String,
        #[arg(long)]
        note: Option<String>,
    },
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Decision {
    Approve,
    Reject,
}

impl From<Decision> for ApprovalDecision {
    fn from(value: Decision) -> Self {
        match value {
            Decision::Approve => ApprovalDecision::Approve,
            Decision::Reject => ApprovalDecision::Reject,
        }
    }
}

pub async fn run(orchestrator: &Orchestrator, args: &ApprovalsArgs, format: &OutputFormat) -> anyhow::Result<()> {
    match &args.command {
        ApprovalsCommand::Get { id } => match orchestrator.get_approval(&ApprovalId::new(id.clone())) {
            Some(approval) => print_value(format, &serde_json::to_value(&approval)?),
            None => {
                eprintln!("approval {id} not found");
                std::process::exit(1);
            }
        },
        ApprovalsCommand::Decide { id, decision, decided_by, note } => {
            let approval = orchestrator
                .decide_approval(&ApprovalId::new(id.clone()), decided_by, decision.clone().into(), note.clone())
                .await?;
            print_value(format, &serde_json::to_value(&approval)?);
        }
    }
    Ok(())
}

fn print_value(format: &OutputFormat, value: &serde_json::Value) {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value).unwrap_or_default()),
        OutputFormat::Text => println!("{value}"),
    }
}
