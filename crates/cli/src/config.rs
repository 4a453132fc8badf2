use std::path::Path;

use anyhow::Context;
use occam_core::OrchestratorConfig;

/// Load the orchestrator config from an optional TOML file, falling back to
/// `OrchestratorConfig::default()` when no path is given — mirroring
/// `acteon-cli`'s config-file-under-clap-overrides layering, just without
/// any CLI flag overrides of individual fields (this binary's flags are all
/// per-command arguments, not config overrides).
pub fn load(path: Option<&Path>) -> anyhow::Result<OrchestratorConfig> {
    let Some(path) = path else {
        return Ok(OrchestratorConfig::default());
    };
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading config file {}", path.display()))?;
    OrchestratorConfig::from_toml_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
}
