use occam_status::StatusEngine;

use crate::OutputFormat;

pub async fn run(status: &StatusEngine, format: &OutputFormat) -> anyhow::Result<()> {
    let purged = status.run_retention_sweep().await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "purged": purged })),
        OutputFormat::Text => println!("purged {purged} audit event(s) past their retention deadline"),
    }
    Ok(())
}
