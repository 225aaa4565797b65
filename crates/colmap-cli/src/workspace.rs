//! Project workspace: configuration plus a mapper over its catalogs

use anyhow::{Context, Result};
use colmap_core::{ActionOutcome, Config, Mapper, MappingPattern, RenameOutcome, StepReport};

/// A loaded project ready for a session
pub struct Workspace {
    pub config: Config,
    pub mapper: Mapper,
}

impl Workspace {
    /// Load the config and its catalogs
    pub async fn open(config_path: &str) -> Result<Self> {
        tracing::debug!("Loading configuration from {}", config_path);
        let config = Config::load(config_path).context("Failed to load configuration")?;
        let mapper = config
            .load_mapper()
            .await
            .context("Failed to load catalogs")?;
        Ok(Self { config, mapper })
    }

    /// Replay a session script, printing one line per step
    pub fn replay(&mut self, script: &str) -> Result<Replay> {
        let actions = self
            .config
            .load_script(script)
            .with_context(|| format!("Failed to load session script '{}'", script))?;

        let mut replay = Replay::default();
        for step in self.mapper.run_script(&actions) {
            println!("{}", describe_step(&step));
            match step.result {
                Ok(ActionOutcome::Saved(pattern)) => replay.patterns.push(pattern),
                Ok(_) => {}
                Err(_) => replay.rejected += 1,
            }
        }
        Ok(replay)
    }
}

/// What a replay produced
#[derive(Default)]
pub struct Replay {
    /// Patterns built by `save` steps
    pub patterns: Vec<MappingPattern>,
    /// Steps that were rejected
    pub rejected: usize,
}

fn describe_step(step: &StepReport) -> String {
    let detail = match &step.result {
        Ok(ActionOutcome::Committed(entry)) => format!(
            "{} -> {} ({})",
            entry.source_field,
            entry.target_fields.join(", "),
            entry.data_type
        ),
        Ok(ActionOutcome::Editing(entry)) => format!("editing {}", entry.source_field),
        Ok(ActionOutcome::Removed(entry)) => format!("removed {}", entry.source_field),
        Ok(ActionOutcome::Renamed(RenameOutcome::Renamed {
            old_name,
            new_name,
            entries_updated,
        })) => format!(
            "{} -> {} ({} entries updated)",
            old_name, new_name, entries_updated
        ),
        Ok(ActionOutcome::Renamed(RenameOutcome::Unchanged)) => "unchanged".to_string(),
        Ok(ActionOutcome::TargetAdded(name)) => format!("added target {}", name),
        Ok(ActionOutcome::Saved(pattern)) => format!(
            "pattern '{}' ({} sources)",
            pattern.name,
            pattern.pattern.len()
        ),
        Ok(ActionOutcome::Selected) => "selection updated".to_string(),
        Ok(ActionOutcome::Cancelled) => "edit cancelled".to_string(),
        Ok(ActionOutcome::Skipped) => "skipped".to_string(),
        Err(e) => format!("rejected: {}", e),
    };
    format!("[{}] {}: {}", step.step, step.action, detail)
}

/// Print the committed mappings
pub fn print_mappings(mapper: &Mapper) {
    if mapper.entries().is_empty() {
        println!("No mappings");
        return;
    }
    println!("Mappings:");
    for entry in mapper.entries() {
        let number = mapper
            .catalog()
            .source_number(&entry.source_field)
            .map(|n| n.to_string())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "  {}. {} -> {} ({})",
            number,
            entry.source_field,
            entry.target_fields.join(", "),
            entry.data_type
        );
    }
}
