//! Replay a session script and submit the result

use anyhow::{Context, Result};
use colmap_core::collaborators::submit_mappings;

use crate::workspace::{Workspace, print_mappings};

/// Run the submit command
pub async fn run(config_path: &str, script: &str) -> Result<()> {
    let mut workspace = Workspace::open(config_path).await?;
    let replay = workspace.replay(script)?;
    print_mappings(&workspace.mapper);

    if replay.rejected > 0 {
        tracing::warn!(
            "{} step(s) rejected; submitting the mappings that were accepted",
            replay.rejected
        );
    }

    let receipt = submit_mappings(&workspace.mapper, &workspace.config.submitter())
        .await
        .context("Submission failed")?;

    println!("Submitted to {}", receipt.mapped_location);
    if let Some(errors) = receipt.error_location {
        println!("Rejected rows: {}", errors);
    }
    Ok(())
}
