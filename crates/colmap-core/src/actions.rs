//! Session scripts
//!
//! A session script replays operator actions against a [`Mapper`]. Scripts are
//! YAML lists where each item is keyed by the action name.
//!
//! # Actions
//!
//! - `add` - select a source and targets, then commit
//! - `select` - change the selection without committing
//! - `commit` - commit the current selection
//! - `edit` - begin editing the entry that owns a source field
//! - `cancel` - stop editing
//! - `remove` - delete the entry that owns a source field
//! - `rename` - rename a target field
//! - `add_target` - add a target field by hand
//! - `save` - snapshot the mapping set as a named pattern
//!
//! # Example
//!
//! ```yaml
//! - add:
//!     source: cust_name
//!     targets: [full_name, display_name]
//! - add:
//!     source: cust_age
//!     targets: [age]
//!     type: number
//! - rename:
//!     from: display_name
//!     to: nickname
//! - save: customers
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::catalog::DataType;
use crate::error::{Error, Result};
use crate::mapper::Mapper;
use crate::mapping::MappingEntry;
use crate::pattern::MappingPattern;
use crate::rename::RenameOutcome;
use crate::selection::Selection;

/// Source, targets and types of a binding in a script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingSpec {
    /// Source field
    #[serde(default)]
    pub source: Option<String>,

    /// Target fields
    #[serde(default)]
    pub targets: Vec<String>,

    /// Type applied to every target without an entry in `types`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,

    /// Per-target type overrides
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub types: HashMap<String, DataType>,
}

impl BindingSpec {
    fn to_selection(&self) -> Selection {
        let mut selection = Selection {
            source: self.source.clone(),
            ..Default::default()
        };
        for target in &self.targets {
            selection.select_target(target.clone());
            let data_type = self
                .types
                .get(target)
                .copied()
                .or(self.data_type)
                .unwrap_or_default();
            selection.set_target_type(target, data_type);
        }
        selection
    }
}

/// Rename arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameSpec {
    /// Current target name
    pub from: String,
    /// New target name
    pub to: String,
}

/// One step of a session script
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Action {
    /// Select then commit
    Add {
        /// Binding to commit
        add: BindingSpec,
    },

    /// Replace the selection
    Select {
        /// Binding to select
        select: BindingSpec,
    },

    /// Commit the current selection
    Commit {
        /// Must be `true`
        commit: bool,
    },

    /// Begin editing the entry owning a source field
    Edit {
        /// Source field
        edit: String,
    },

    /// Cancel the edit session
    Cancel {
        /// Must be `true`
        cancel: bool,
    },

    /// Delete the entry owning a source field
    Remove {
        /// Source field
        remove: String,
    },

    /// Rename a target field
    Rename {
        /// Rename arguments
        rename: RenameSpec,
    },

    /// Add a target field by hand
    AddTarget {
        /// Target name
        add_target: String,
    },

    /// Snapshot as a named pattern
    Save {
        /// Pattern name
        save: String,
    },
}

impl Action {
    /// Short action name for reports
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Select { .. } => "select",
            Self::Commit { .. } => "commit",
            Self::Edit { .. } => "edit",
            Self::Cancel { .. } => "cancel",
            Self::Remove { .. } => "remove",
            Self::Rename { .. } => "rename",
            Self::AddTarget { .. } => "add_target",
            Self::Save { .. } => "save",
        }
    }
}

/// What a successful action did
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    /// Entry appended or updated
    Committed(MappingEntry),
    /// Selection changed
    Selected,
    /// Edit session started for this entry
    Editing(MappingEntry),
    /// Edit session ended without changes
    Cancelled,
    /// Entry deleted
    Removed(MappingEntry),
    /// Target rename result
    Renamed(RenameOutcome),
    /// Target field added
    TargetAdded(String),
    /// Pattern built
    Saved(MappingPattern),
    /// Flag action given `false`; nothing done
    Skipped,
}

/// Result of one script step
#[derive(Debug)]
pub struct StepReport {
    /// 1-based step number
    pub step: usize,
    /// Action name
    pub action: &'static str,
    /// Outcome or error
    pub result: Result<ActionOutcome>,
}

/// Parse a script from YAML
pub fn parse_script(yaml: &str) -> Result<Vec<Action>> {
    Ok(serde_yaml::from_str(yaml)?)
}

impl Mapper {
    /// Apply one action
    pub fn apply_action(&mut self, action: &Action) -> Result<ActionOutcome> {
        match action {
            Action::Add { add } => {
                self.set_selection(add.to_selection());
                Ok(ActionOutcome::Committed(self.add_or_update()?))
            }
            Action::Select { select } => {
                self.set_selection(select.to_selection());
                Ok(ActionOutcome::Selected)
            }
            Action::Commit { commit: true } => Ok(ActionOutcome::Committed(self.add_or_update()?)),
            Action::Edit { edit } => {
                let id = self.begin_edit_source(edit)?;
                let entry = self
                    .mappings()
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| Error::EntryNotFound {
                        what: format!("id {}", id),
                    })?;
                Ok(ActionOutcome::Editing(entry))
            }
            Action::Cancel { cancel: true } => {
                self.cancel_edit();
                Ok(ActionOutcome::Cancelled)
            }
            Action::Remove { remove } => Ok(ActionOutcome::Removed(self.remove_source(remove)?)),
            Action::Rename { rename } => Ok(ActionOutcome::Renamed(
                self.rename_target(&rename.from, &rename.to)?,
            )),
            Action::AddTarget { add_target } => {
                self.add_target(add_target)?;
                Ok(ActionOutcome::TargetAdded(add_target.trim().to_string()))
            }
            Action::Save { save } => Ok(ActionOutcome::Saved(self.to_pattern(save)?)),
            Action::Commit { commit: false } | Action::Cancel { cancel: false } => {
                Ok(ActionOutcome::Skipped)
            }
        }
    }

    /// Apply every action in order. A failed step is recorded and the script
    /// continues, since every engine error leaves state as it was.
    pub fn run_script(&mut self, actions: &[Action]) -> Vec<StepReport> {
        actions
            .iter()
            .enumerate()
            .map(|(i, action)| {
                let result = self.apply_action(action);
                if let Err(e) = &result {
                    tracing::warn!(step = i + 1, action = action.name(), "{}", e);
                }
                StepReport {
                    step: i + 1,
                    action: action.name(),
                    result,
                }
            })
            .collect()
    }
}
