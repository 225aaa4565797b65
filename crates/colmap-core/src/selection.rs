//! Transient field selection
//!
//! The selection is what the operator has picked but not yet committed: one
//! source field, an ordered list of target fields, and a data type for each
//! selected target. Types are only held for targets that are selected. It is a plain value passed into the validator and the rename
//! propagator so both stay free of ambient state.

use std::collections::HashMap;

use crate::catalog::DataType;

/// Source/target picks awaiting commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Selected source field
    pub source: Option<String>,

    /// Selected target fields, in pick order
    pub targets: Vec<String>,

    /// Data type chosen for each selected target
    pub target_types: HashMap<String, DataType>,
}

impl Selection {
    /// Build a selection with every target typed `data_type`
    pub fn new<I, S>(source: impl Into<String>, targets: I, data_type: DataType) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut selection = Self {
            source: Some(source.into()),
            ..Default::default()
        };
        for target in targets {
            selection.select_target(target.into());
        }
        for target in &selection.targets {
            selection.target_types.insert(target.clone(), data_type);
        }
        selection
    }

    /// Pick a source field, or clear it with `None`
    pub fn set_source(&mut self, source: Option<String>) {
        self.source = source;
    }

    /// Add a target if absent. A fresh target starts as `text`.
    pub fn select_target(&mut self, target: String) {
        if self.targets.contains(&target) {
            return;
        }
        self.target_types.insert(target.clone(), DataType::default());
        self.targets.push(target);
    }

    /// Remove a target and forget its type
    pub fn deselect_target(&mut self, target: &str) {
        self.targets.retain(|t| t != target);
        self.target_types.remove(target);
    }

    /// Toggle a target on or off
    pub fn toggle_target(&mut self, target: &str) {
        if self.targets.iter().any(|t| t == target) {
            self.deselect_target(target);
        } else {
            self.select_target(target.to_string());
        }
    }

    /// Set the data type of a selected target. Unselected targets are left
    /// alone and `false` is returned.
    pub fn set_target_type(&mut self, target: &str, data_type: DataType) -> bool {
        match self.target_types.get_mut(target) {
            Some(current) => {
                *current = data_type;
                true
            }
            None => false,
        }
    }

    /// Effective type of a target: the chosen type, else `text`
    pub fn target_type(&self, target: &str) -> DataType {
        self.target_types.get(target).copied().unwrap_or_default()
    }

    /// Whether anything is selected
    pub fn is_empty(&self) -> bool {
        self.source.is_none() && self.targets.is_empty() && self.target_types.is_empty()
    }

    /// Drop every pick and type override
    pub fn clear(&mut self) {
        self.source = None;
        self.targets.clear();
        self.target_types.clear();
    }

    /// Replace `old` with `new` in the target list and the type overrides
    pub(crate) fn rename_target(&mut self, old: &str, new: &str) {
        for target in self.targets.iter_mut().filter(|t| *t == old) {
            *target = new.to_string();
        }
        if let Some(data_type) = self.target_types.remove(old) {
            self.target_types.insert(new.to_string(), data_type);
        }
    }
}
