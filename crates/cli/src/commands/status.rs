use clap::{Args, Subcommand};

use occam_core::WorkflowId;
use occam_orchestrator::Orchestrator;
use occam_status::StatusEngine;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(subcommand)]
    pub command: StatusCommand,
}

#[derive(Subcommand, Debug)]
pub enum StatusCommand {
    /// Compliance-score snapshot for an entity.
    Entity {
        #[arg(long)]
        entity_id: String,
    },
    /// Percent-complete / delay / estimated-completion for a workflow.
    Progress {
        #[arg(long)]
        workflow_id: String,
    },
    /// Risk-scored rollup of every workflow an entity has submitted.
    Summary {
        #[arg(long)]
        entity_id: String,
    },
}

pub async fn run(orchestrator: &Orchestrator, status: &StatusEngine, args: &StatusArgs, format: &OutputFormat) -> anyhow::Result<()> {
    match &args.command {
        StatusCommand::Entity { entity_id } => {
            let result = orchestrator.get_entity_status(&entity_id.clone().into()).await?;
            print_value(format, &serde_json::to_value(&result)?);
        }
        StatusCommand::Progress { workflow_id } => {
            let snapshot = status.track_progress(&WorkflowId::new(workflow_id.clone())).await?;
            match snapshot {
                Some(s) => print_value(format, &serde_json::to_value(&s)?),
                None => {
                    eprintln!("workflow {workflow_id} not found");
                    std::process::exit(1);
                }
            }
        }
        StatusCommand::Summary { entity_id } => {
            let summary = status.generate_summary(&entity_id.clone().into()).await?;
            print_value(format, &serde_json::to_value(&summary)?);
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
