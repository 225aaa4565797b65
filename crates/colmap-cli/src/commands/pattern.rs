//! Stored pattern commands

use anyhow::{Context, Result};
use colmap_core::{Config, PatternStore, UpdateOutcome};

use crate::workspace::{Workspace, print_mappings};

fn load_config(config_path: &str) -> Result<Config> {
    Config::load(config_path).context("Failed to load configuration")
}

/// List stored patterns
pub async fn list(config_path: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let patterns = config.pattern_store().list_all().await?;

    if patterns.is_empty() {
        println!("No patterns stored in {}", config.patterns_dir().display());
        return Ok(());
    }
    for stored in patterns {
        println!(
            "{}  {}  ({} sources, updated {})",
            stored.id(),
            stored.pattern.name,
            stored.pattern.pattern.len(),
            stored.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

/// Show one stored pattern
pub async fn show(config_path: &str, id: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let stored = config.pattern_store().get(id).await?;
    print!("{}", serde_yaml::to_string(&stored.pattern)?);
    Ok(())
}

/// Delete one stored pattern
pub async fn delete(config_path: &str, id: &str) -> Result<()> {
    let config = load_config(config_path)?;
    config.pattern_store().delete(id).await?;
    println!("Deleted pattern {}", id);
    Ok(())
}

/// Load a stored pattern onto the current catalogs and report what no longer fits
pub async fn check(config_path: &str, id: &str) -> Result<()> {
    let mut workspace = Workspace::open(config_path).await?;
    let stored = workspace.config.pattern_store().get(id).await?;

    let warnings = workspace.mapper.load_pattern(&stored.pattern);
    if warnings.is_empty() {
        println!("Pattern '{}' applies cleanly", stored.pattern.name);
    } else {
        println!("Pattern '{}' has {} warning(s):", stored.pattern.name, warnings.len());
        for warning in &warnings {
            println!("  - {}", warning);
        }
    }
    print_mappings(&workspace.mapper);
    Ok(())
}

/// Rebuild a stored pattern from a session script, keeping its id
pub async fn update(config_path: &str, id: &str, script: &str, name: Option<&str>) -> Result<()> {
    let mut workspace = Workspace::open(config_path).await?;
    let store = workspace.config.pattern_store();
    let current = store.get(id).await?;

    let mut replay = workspace.replay(script)?;
    if replay.rejected > 0 {
        tracing::warn!("{} step(s) rejected", replay.rejected);
    }

    let pattern = match (name, replay.patterns.pop()) {
        (Some(name), _) => workspace.mapper.to_pattern(name)?,
        (None, Some(saved)) => saved,
        (None, None) => workspace.mapper.to_pattern(&current.pattern.name)?,
    };

    let outcome = store
        .update(id, &pattern)
        .await
        .with_context(|| format!("Failed to update pattern {}", id))?;
    match outcome {
        UpdateOutcome::Updated(stored) => {
            println!("Updated pattern {} ('{}')", stored.id(), stored.pattern.name);
        }
        UpdateOutcome::Unchanged(stored) => {
            println!("Pattern {} unchanged", stored.id());
        }
    }
    Ok(())
}
