use clap::{Args, Subcommand};

use occam_core::WorkflowId;
use occam_orchestrator::Orchestrator;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct WorkflowArgs {
    #[command(subcommand)]
    pub command: WorkflowCommand,
}

#[derive(Subcommand, Debug)]
pub enum WorkflowCommand {
    /// Submit a new compliance workflow.
    Submit {
        #[arg(long)]
        entity_id: String,
        #[arg(long)]
        kind: String,
        /// JSON payload (string, or @file path).
        #[arg(long, default_value = "{}")]
        payload: String,
        #[arg(long)]
        idempotency_key: String,
    },
    /// Fetch a workflow's current state.
    Get {
        #[arg(long)]
        id: String,
    },
    /// Drive a workflow through every stage it is currently able to reach.
    Drive {
        #[arg(long)]
        id: String,
    },
}

fn parse_json(input: &str) -> anyhow::Result<serde_json::Value> {
    if let Some(path) = input.strip_prefix('@') {
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    } else {
        Ok(serde_json::from_str(input)?)
    }
}

pub async fn run(orchestrator: &Orchestrator, args: &WorkflowArgs, format: &OutputFormat) -> anyhow::Result<()> {
    match &args.command {
        WorkflowCommand::Submit { entity_id, kind, payload, idempotency_key } => {
            let payload = parse_json(payload)?;
            let id = orchestrator
                .submit_request(entity_id.clone().into(), kind.clone(), payload, idempotency_key.clone())
                .await?;
            print_value(format, &serde_json::json!({ "workflow_id": id.as_str() }));
        }
        WorkflowCommand::Get { id } => {
            let workflow = orchestrator.get_workflow(&WorkflowId::new(id.clone())).await?;
            match workflow {
                Some(w) => print_value(format, &serde_json::to_value(&w)?),
                None => {
                    eprintln!("workflow {id} not found");
                    std::process::exit(1);
                }
            }
        }
        WorkflowCommand::Drive { id } => {
            let workflow = orchestrator.drive(&WorkflowId::new(id.clone())).await?;
            print_value(format, &serde_json::to_value(&workflow)?);
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
