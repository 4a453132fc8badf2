use clap::Args;

use occam_audit::AuditQuery;
use occam_orchestrator::Orchestrator;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct AuditArgs {
    #[arg(long)]
    pub workflow_id: Option<String>,
    #[arg(long)]
    pub entity_id: Option<String>,
    #[arg(long)]
    pub limit: Option<usize>,
    #[arg(long)]
    pub offset: Option<usize>,
}

pub async fn run(orchestrator: &Orchestrator, args: &AuditArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let query = AuditQuery {
        workflow_id: args.workflow_id.clone().map(Into::into),
        entity_id: args.entity_id.clone().map(Into::into),
        limit: args.limit,
        offset: args.offset,
        ..Default::default()
    };
    let page = orchestrator.query_audit(&query).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&serde_json::json!({
            "events": page.events,
            "total_matched": page.total_matched,
            "has_more": page.has_more,
        }))?),
        OutputFormat::Text => {
            for event in &page.events {
                println!("{}  {:?}  {:?}  {}", event.occurred_at, event.status, event.severity, event.message);
            }
            println!("-- {} of {} matched --", page.events.len(), page.total_matched);
        }
    }
    Ok(())
}
