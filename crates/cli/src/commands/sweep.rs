use occam_status::StatusEngine;

use crate::OutputFormat;

pub async fn run(status: &StatusEngine, format: &OutputFormat) -> anyhow::Result<()> {
    let alerts = status.run_renewal_sweep().await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&alerts)?),
        OutputFormat::Text => {
            if alerts.is_empty() {
                println!("no renewal alerts raised");
            }
            for alert in &alerts {
                println!("{:?}  {}", alert.kind, alert.message);
            }
        }
    }
    Ok(())
}
