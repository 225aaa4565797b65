//! Binding validation
//!
//! [`validate_binding`] decides whether the current [`Selection`] may become a
//! mapping entry. It is pure: it reads the catalog, the mapping set and the
//! selection, and either returns the data type to stamp on the entry or the
//! first rule the binding breaks.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::catalog::{DataType, FieldCatalog};
use crate::mapping::{EntryId, FieldRole, MappingSet};
use crate::selection::Selection;

/// Reasons a proposed binding is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No source field selected
    #[error("please select a source field")]
    EmptySource,

    /// No target field selected
    #[error("please select at least one target field")]
    EmptyTargets,

    /// Source field is not in the catalog
    #[error("source field '{source_field}' is not in the catalog")]
    UnknownSourceField {
        /// Requested source field
        source_field: String,
    },

    /// Target field is not in the catalog
    #[error("target field '{target}' is not in the catalog")]
    UnknownTargetField {
        /// Requested target field
        target: String,
    },

    /// Selected targets carry different data types
    #[error("all target fields must have the same data type (found {})", join_types(.types))]
    TypeMismatchAmongTargets {
        /// Distinct types found among the targets
        types: Vec<DataType>,
    },

    /// Targets agree on a type, but it is not the source's type
    #[error(
        "source field data type ({source_type}) must match target data type ({target_type})"
    )]
    SourceTargetTypeMismatch {
        /// Source field name
        source_field: String,
        /// Catalog type of the source
        source_type: DataType,
        /// Shared type of the targets
        target_type: DataType,
    },

    /// Source field already bound by another entry
    #[error("source field '{source_field}' is already mapped")]
    SourceAlreadyMapped {
        /// Source field name
        source_field: String,
        /// Entry that owns it
        entry_id: EntryId,
    },

    /// A target field already bound by another entry
    #[error("target field '{target}' is already mapped")]
    TargetAlreadyMapped {
        /// Target field name
        target: String,
        /// Entry that owns it
        entry_id: EntryId,
    },
}

fn join_types(types: &[DataType]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Targets with repeats removed, first occurrence kept
pub fn dedup_targets(targets: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    targets
        .iter()
        .filter(|t| seen.insert(t.as_str()))
        .cloned()
        .collect()
}

/// Check a proposed binding and return the shared data type.
///
/// `editing` names the entry being edited; its own claims on the source and
/// targets do not count as conflicts.
pub fn validate_binding(
    selection: &Selection,
    catalog: &FieldCatalog,
    mappings: &MappingSet,
    editing: Option<&EntryId>,
) -> Result<DataType, ValidationError> {
    let source = match selection.source.as_deref() {
        Some(source) if !source.is_empty() => source,
        _ => return Err(ValidationError::EmptySource),
    };
    let targets = dedup_targets(&selection.targets);
    if targets.is_empty() {
        return Err(ValidationError::EmptyTargets);
    }

    let source_type = catalog
        .source_type(source)
        .ok_or_else(|| ValidationError::UnknownSourceField {
            source_field: source.to_string(),
        })?;
    if let Some(missing) = targets.iter().find(|t| !catalog.has_target(t)) {
        return Err(ValidationError::UnknownTargetField {
            target: missing.clone(),
        });
    }

    let types: BTreeSet<DataType> = targets.iter().map(|t| selection.target_type(t)).collect();
    if types.len() > 1 {
        return Err(ValidationError::TypeMismatchAmongTargets {
            types: types.into_iter().collect(),
        });
    }
    let target_type = types.into_iter().next().unwrap_or_default();
    if target_type != source_type {
        return Err(ValidationError::SourceTargetTypeMismatch {
            source_field: source.to_string(),
            source_type,
            target_type,
        });
    }

    if let Some(owner) = other_claimant(mappings, source, FieldRole::Source, editing) {
        return Err(ValidationError::SourceAlreadyMapped {
            source_field: source.to_string(),
            entry_id: owner.clone(),
        });
    }
    for target in &targets {
        if let Some(owner) = other_claimant(mappings, target, FieldRole::Target, editing) {
            return Err(ValidationError::TargetAlreadyMapped {
                target: target.clone(),
                entry_id: owner.clone(),
            });
        }
    }

    Ok(source_type)
}

fn other_claimant<'a>(
    mappings: &'a MappingSet,
    field: &str,
    role: FieldRole,
    editing: Option<&EntryId>,
) -> Option<&'a EntryId> {
    mappings
        .claimants(field, role)
        .iter()
        .find(|id| Some(*id) != editing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SourceField;
    use crate::mapping::MappingEntry;
    use rstest::rstest;

    fn catalog() -> FieldCatalog {
        FieldCatalog::new(
            vec![
                SourceField::new("A", DataType::Text),
                SourceField::new("B", DataType::Number),
            ],
            ["X", "Y", "Z"],
        )
    }

    fn mapped_a() -> MappingSet {
        let mut set = MappingSet::new();
        set.push_unchecked(MappingEntry {
            id: EntryId::from("a"),
            source_field: "A".to_string(),
            target_fields: vec!["X".to_string(), "Y".to_string()],
            data_type: DataType::Text,
        });
        set
    }

    #[test]
    fn test_empty_source() {
        let selection = Selection {
            targets: vec!["X".to_string()],
            ..Default::default()
        };
        assert_eq!(
            validate_binding(&selection, &catalog(), &MappingSet::new(), None),
            Err(ValidationError::EmptySource)
        );
    }

    #[test]
    fn test_empty_targets() {
        let selection = Selection {
            source: Some("A".to_string()),
            ..Default::default()
        };
        assert_eq!(
            validate_binding(&selection, &catalog(), &MappingSet::new(), None),
            Err(ValidationError::EmptyTargets)
        );
    }

    #[test]
    fn test_targets_default_to_text() {
        let selection = Selection {
            source: Some("A".to_string()),
            targets: vec!["X".to_string(), "Y".to_string()],
            ..Default::default()
        };
        assert_eq!(
            validate_binding(&selection, &catalog(), &MappingSet::new(), None),
            Ok(DataType::Text)
        );
    }

    #[test]
    fn test_mixed_target_types() {
        let mut selection = Selection::new("A", ["X", "Y"], DataType::Text);
        selection.set_target_type("Y", DataType::Date);
        assert_eq!(
            validate_binding(&selection, &catalog(), &MappingSet::new(), None),
            Err(ValidationError::TypeMismatchAmongTargets {
                types: vec![DataType::Text, DataType::Date],
            })
        );
    }

    #[rstest]
    #[case("B", &["X"], DataType::Number, "TargetAlreadyMapped")]
    #[case("B", &["Z"], DataType::Text, "SourceTargetTypeMismatch")]
    #[case("A", &["Z"], DataType::Text, "SourceAlreadyMapped")]
    #[case("Q", &["Z"], DataType::Text, "UnknownSourceField")]
    #[case("B", &["W"], DataType::Number, "UnknownTargetField")]
    fn test_rejections(
        #[case] source: &str,
        #[case] targets: &[&str],
        #[case] data_type: DataType,
        #[case] expected: &str,
    ) {
        let selection = Selection::new(source, targets.iter().copied(), data_type);
        let err = validate_binding(&selection, &catalog(), &mapped_a(), None).unwrap_err();
        let kind = match err {
            ValidationError::TargetAlreadyMapped { .. } => "TargetAlreadyMapped",
            ValidationError::SourceTargetTypeMismatch { .. } => "SourceTargetTypeMismatch",
            ValidationError::SourceAlreadyMapped { .. } => "SourceAlreadyMapped",
            ValidationError::UnknownSourceField { .. } => "UnknownSourceField",
            ValidationError::UnknownTargetField { .. } => "UnknownTargetField",
            other => panic!("unexpected error: {other}"),
        };
        assert_eq!(kind, expected);
    }

    #[test]
    fn test_matching_number_binding_succeeds() {
        let selection = Selection::new("B", ["Z"], DataType::Number);
        assert_eq!(
            validate_binding(&selection, &catalog(), &mapped_a(), None),
            Ok(DataType::Number)
        );
    }

    #[test]
    fn test_editing_entry_ignores_its_own_claims() {
        let selection = Selection::new("A", ["X", "Y", "Z"], DataType::Text);
        let editing = EntryId::from("a");
        assert_eq!(
            validate_binding(&selection, &catalog(), &mapped_a(), Some(&editing)),
            Ok(DataType::Text)
        );
        assert!(validate_binding(&selection, &catalog(), &mapped_a(), None).is_err());
    }

    #[test]
    fn test_validation_is_pure() {
        let selection = Selection::new("B", ["X"], DataType::Number);
        let set = mapped_a();
        let first = validate_binding(&selection, &catalog(), &set, None);
        let second = validate_binding(&selection, &catalog(), &set, None);
        assert_eq!(first, second);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_error_messages() {
        let err = ValidationError::SourceTargetTypeMismatch {
            source_field: "B".to_string(),
            source_type: DataType::Number,
            target_type: DataType::Text,
        };
        assert_eq!(
            err.to_string(),
            "source field data type (number) must match target data type (text)"
        );
        let err = ValidationError::TypeMismatchAmongTargets {
            types: vec![DataType::Text, DataType::Date],
        };
        assert!(err.to_string().contains("text, date"));
    }
}
