//! Validate configuration command

use anyhow::{Context, Result};
use colmap_core::pattern::check_pattern;
use colmap_core::{Config, PatternStore};

/// Run the validate command
pub async fn run(config_path: &str) -> Result<()> {
    tracing::info!("Validating configuration: {}", config_path);

    let config = Config::load(config_path).context("Failed to load configuration")?;

    tracing::info!("✓ Project: {}", config.project.name);
    tracing::info!("✓ Version: {}", config.project.version);

    let mapper = config
        .load_mapper()
        .await
        .context("Failed to load catalogs")?;
    tracing::info!(
        "✓ Catalogs: {} source fields, {} target fields",
        mapper.catalog().sources().len(),
        mapper.catalog().targets().len()
    );

    for path in config.session_scripts()? {
        let reference = path.display().to_string();
        let actions = config
            .load_script(&reference)
            .with_context(|| format!("Invalid session script {}", reference))?;
        tracing::info!("✓ Script {}: {} steps", reference, actions.len());
    }

    let patterns = config
        .pattern_store()
        .list_all()
        .await
        .context("Failed to read stored patterns")?;
    for stored in &patterns {
        let warnings = check_pattern(&stored.pattern, mapper.catalog());
        if warnings.is_empty() {
            tracing::info!("✓ Pattern {}", stored.id());
        } else {
            for warning in warnings {
                tracing::warn!("Pattern {}: {}", stored.id(), warning);
            }
        }
    }

    tracing::info!("✓ Configuration is valid");
    Ok(())
}
