//! Field catalog
//!
//! The catalog lists the source fields of an uploaded file (with their inferred
//! data types) and the target fields of the destination schema. Source fields
//! never change once loaded; target fields can be added by hand, replaced by a
//! new target file, or renamed through [`crate::rename`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Data type shared by a source field and the targets it feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Free text (also accepted as `string`)
    #[default]
    #[serde(alias = "string")]
    Text,
    /// Integer or decimal number
    Number,
    /// Calendar date
    Date,
    /// True/false flag
    Boolean,
}

impl DataType {
    /// All selectable data types, in display order
    pub const ALL: [DataType; 4] = [Self::Text, Self::Number, Self::Date, Self::Boolean];
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Number => write!(f, "number"),
            Self::Date => write!(f, "date"),
            Self::Boolean => write!(f, "boolean"),
        }
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "string" => Ok(Self::Text),
            "number" => Ok(Self::Number),
            "date" => Ok(Self::Date),
            "boolean" => Ok(Self::Boolean),
            other => Err(Error::ConfigInvalid {
                message: format!("unknown data type '{}'", other),
            }),
        }
    }
}

/// A field of the incoming dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceField {
    /// Column name
    pub name: String,

    /// Inferred data type
    #[serde(default)]
    pub data_type: DataType,
}

impl SourceField {
    /// Create a source field
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A field of the destination schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetField {
    /// Field name, unique within the catalog
    pub name: String,
}

impl TargetField {
    /// Create a target field
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Source and target fields available to the mapping engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCatalog {
    sources: Vec<SourceField>,
    targets: Vec<TargetField>,
}

impl FieldCatalog {
    /// Build a catalog from source fields and target names.
    ///
    /// Blank and repeated target names are skipped, so the resulting catalog
    /// always satisfies the unique-name rule.
    pub fn new<I, S>(sources: Vec<SourceField>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog = Self {
            sources,
            targets: Vec::new(),
        };
        catalog.replace_targets(targets);
        catalog
    }

    /// Source fields in catalog order
    pub fn sources(&self) -> &[SourceField] {
        &self.sources
    }

    /// Target fields in catalog order
    pub fn targets(&self) -> &[TargetField] {
        &self.targets
    }

    /// Target names in catalog order
    pub fn target_names(&self) -> Vec<&str> {
        self.targets.iter().map(|t| t.name.as_str()).collect()
    }

    /// Look up a source field by name
    pub fn source(&self, name: &str) -> Option<&SourceField> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Data type of a source field
    pub fn source_type(&self, name: &str) -> Option<DataType> {
        self.source(name).map(|s| s.data_type)
    }

    /// 1-based position of a source field, used in target labels
    pub fn source_number(&self, name: &str) -> Option<usize> {
        self.sources.iter().position(|s| s.name == name).map(|i| i + 1)
    }

    /// Whether a target with exactly this name exists
    pub fn has_target(&self, name: &str) -> bool {
        self.targets.iter().any(|t| t.name == name)
    }

    /// Add a target field by hand.
    ///
    /// The name is trimmed; blank names and names already in the catalog are
    /// rejected.
    pub fn add_target(&mut self, name: &str) -> Result<&TargetField> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidTargetField {
                name: name.to_string(),
                message: "name is blank".to_string(),
            });
        }
        if self.has_target(trimmed) {
            return Err(Error::InvalidTargetField {
                name: trimmed.to_string(),
                message: "a target field with this name already exists".to_string(),
            });
        }
        self.targets.push(TargetField::new(trimmed));
        tracing::debug!(target_field = trimmed, "added target field");
        Ok(&self.targets[self.targets.len() - 1])
    }

    /// Replace every target field, returning the names that were dropped.
    pub fn replace_targets<I, S>(&mut self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let previous: Vec<String> = self.targets.drain(..).map(|t| t.name).collect();
        for name in names {
            let name: String = name.into();
            let trimmed = name.trim();
            if trimmed.is_empty() || self.has_target(trimmed) {
                continue;
            }
            self.targets.push(TargetField::new(trimmed));
        }
        previous
            .into_iter()
            .filter(|old| !self.has_target(old))
            .collect()
    }

    /// Rename a target in place. Callers validate first.
    pub(crate) fn rename_target(&mut self, old: &str, new: &str) -> bool {
        match self.targets.iter_mut().find(|t| t.name == old) {
            Some(target) => {
                target.name = new.to_string();
                true
            }
            None => false,
        }
    }
}
