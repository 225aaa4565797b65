//! Preview sample values of a source field

use anyhow::{Context, Result};
use colmap_core::PreviewPager;

use crate::workspace::Workspace;

/// Run the preview command
pub async fn run(config_path: &str, field: &str, pages: usize) -> Result<()> {
    let workspace = Workspace::open(config_path).await?;

    if workspace.mapper.catalog().source(field).is_none() {
        anyhow::bail!("Unknown source field '{}'", field);
    }
    let file_id = workspace
        .mapper
        .file_id()
        .context("Source catalog has no file id")?;

    let source = workspace.config.catalog_source();
    let mut pager = PreviewPager::new(file_id, field, workspace.config.project.preview.page_size);
    for _ in 0..pages {
        if !pager.has_more() {
            break;
        }
        pager
            .load_next(&source)
            .await
            .with_context(|| format!("Failed to load preview page {}", pager.pages_loaded() + 1))?;
    }

    println!("{}:", pager.field());
    for value in pager.values() {
        println!("  {}", value);
    }
    if pager.has_more() {
        println!("  ... (more available)");
    }
    Ok(())
}
