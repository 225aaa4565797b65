//! Replay a session script

use anyhow::{Context, Result};
use colmap_core::PatternStore;

use crate::workspace::{Workspace, print_mappings};

/// Run the run command
pub async fn run(config_path: &str, script: &str, save: bool) -> Result<()> {
    let mut workspace = Workspace::open(config_path).await?;
    tracing::info!("Project: {}", workspace.config.project.name);

    let replay = workspace.replay(script)?;
    print_mappings(&workspace.mapper);

    if replay.rejected > 0 {
        tracing::warn!("{} step(s) rejected", replay.rejected);
    }

    if save {
        if replay.patterns.is_empty() {
            tracing::warn!("Script has no save steps; nothing stored");
        }
        let store = workspace.config.pattern_store();
        for pattern in &replay.patterns {
            let stored = store
                .save(pattern)
                .await
                .with_context(|| format!("Failed to store pattern '{}'", pattern.name))?;
            println!("Saved pattern '{}' as {}", stored.pattern.name, stored.id());
        }
    }

    Ok(())
}
