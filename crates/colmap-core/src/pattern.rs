//! Mapping patterns
//!
//! A pattern is the persisted, named form of a mapping set. It is keyed by
//! source field rather than by entry id, since entry ids only live as long as
//! the in-memory set. Keys keep the order of the entries they came from.
//!
//! # Format
//!
//! ```yaml
//! id: customers
//! name: Customers
//! pattern:
//!   cust_name:
//!     columns: [full_name, display_name]
//!     type: text
//!   cust_age:
//!     columns: [age]
//!     type: number
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::catalog::{DataType, FieldCatalog};
use crate::mapping::MappingSet;
use crate::validator::ValidationError;

/// Reasons a pattern cannot be built
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// Nothing to save
    #[error("no mappings to save")]
    EmptyMappingSet,

    /// Name missing
    #[error("please enter a mapping name")]
    BlankName,
}

/// Targets and type recorded for one source field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternColumns {
    /// Target field names in order
    pub columns: Vec<String>,

    /// Shared data type
    #[serde(rename = "type", default)]
    pub data_type: DataType,
}

/// A named, persistable mapping set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingPattern {
    /// Store-assigned identifier, absent until saved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Display name
    pub name: String,

    /// Source field → targets and type
    #[serde(default)]
    pub pattern: IndexMap<String, PatternColumns>,
}

/// One row of a pattern, as loaded into an edit form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternRow {
    /// Source field name
    pub source_field: String,
    /// Target field names
    pub target_fields: Vec<String>,
    /// Shared data type
    pub data_type: DataType,
}

/// Non-fatal findings when a pattern meets a catalog it was not built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternWarning {
    /// Source field missing from the catalog
    SourceNotFound {
        /// Source field name
        source_field: String,
    },
    /// Some target columns missing from the catalog
    ColumnsNotFound {
        /// Source field whose targets are missing
        source_field: String,
        /// Missing target names
        columns: Vec<String>,
    },
    /// Catalog infers a different type than the pattern records
    TypeChanged {
        /// Source field name
        source_field: String,
        /// Type stored in the pattern
        pattern_type: DataType,
        /// Type in the live catalog
        catalog_type: DataType,
    },
    /// Row could not be loaded into the mapping set
    Rejected {
        /// Source field name
        source_field: String,
        /// Validation failure
        reason: ValidationError,
    },
}

impl std::fmt::Display for PatternWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceNotFound { source_field } => {
                write!(f, "source field '{}' not found", source_field)
            }
            Self::ColumnsNotFound {
                source_field,
                columns,
            } => write!(
                f,
                "columns not found for '{}': {}",
                source_field,
                columns.join(", ")
            ),
            Self::TypeChanged {
                source_field,
                pattern_type,
                catalog_type,
            } => write!(
                f,
                "'{}' is {} in the pattern but {} in the file",
                source_field, pattern_type, catalog_type
            ),
            Self::Rejected {
                source_field,
                reason,
            } => write!(f, "skipped '{}': {}", source_field, reason),
        }
    }
}

/// Snapshot `mappings` as a pattern named `name` (trimmed)
pub fn to_pattern(name: &str, mappings: &MappingSet) -> Result<MappingPattern, PatternError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PatternError::BlankName);
    }
    if mappings.is_empty() {
        return Err(PatternError::EmptyMappingSet);
    }

    let pattern = mappings
        .entries()
        .iter()
        .map(|entry| {
            (
                entry.source_field.clone(),
                PatternColumns {
                    columns: entry.target_fields.clone(),
                    data_type: entry.data_type,
                },
            )
        })
        .collect();

    Ok(MappingPattern {
        id: None,
        name: name.to_string(),
        pattern,
    })
}

/// Rows of a pattern, in pattern order. No catalog checks.
pub fn from_pattern(pattern: &MappingPattern) -> Vec<PatternRow> {
    pattern
        .pattern
        .iter()
        .map(|(source, columns)| PatternRow {
            source_field: source.clone(),
            target_fields: columns.columns.clone(),
            data_type: columns.data_type,
        })
        .collect()
}

/// Compare a pattern against a live catalog
pub fn check_pattern(pattern: &MappingPattern, catalog: &FieldCatalog) -> Vec<PatternWarning> {
    let mut warnings = Vec::new();
    for (source, columns) in &pattern.pattern {
        match catalog.source_type(source) {
            None => warnings.push(PatternWarning::SourceNotFound {
                source_field: source.clone(),
            }),
            Some(catalog_type) if catalog_type != columns.data_type => {
                warnings.push(PatternWarning::TypeChanged {
                    source_field: source.clone(),
                    pattern_type: columns.data_type,
                    catalog_type,
                })
            }
            Some(_) => {}
        }
        let missing: Vec<String> = columns
            .columns
            .iter()
            .filter(|c| !catalog.has_target(c))
            .cloned()
            .collect();
        if !missing.is_empty() {
            warnings.push(PatternWarning::ColumnsNotFound {
                source_field: source.clone(),
                columns: missing,
            });
        }
    }
    warnings
}

impl MappingPattern {
    /// Rows of this pattern, see [`from_pattern`]
    pub fn rows(&self) -> Vec<PatternRow> {
        from_pattern(self)
    }

    /// SHA-256 hex digest of the name and bindings, in key order. The id is
    /// not included.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        for (source, columns) in &self.pattern {
            hasher.update([0u8]);
            hasher.update(source.as_bytes());
            hasher.update([1u8]);
            hasher.update(columns.data_type.to_string().as_bytes());
            for column in &columns.columns {
                hasher.update([2u8]);
                hasher.update(column.as_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }
}
