//! Target rename propagation
//!
//! A target field name appears in three places at once: the catalog, the
//! target lists of mapping entries, and the transient selection. Renaming goes
//! through [`rename_target_field`] so all three move together, or none do.

use thiserror::Error;

use crate::catalog::FieldCatalog;
use crate::mapping::MappingSet;
use crate::selection::Selection;

/// Reasons a rename is refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenameError {
    /// Another target already uses the new name
    #[error("target field '{new_name}' already exists")]
    DuplicateTargetName {
        /// Requested name
        new_name: String,
    },

    /// The field to rename is not in the catalog
    #[error("target field '{old_name}' is not in the catalog")]
    UnknownTargetField {
        /// Name that was looked up
        old_name: String,
    },
}

/// What a successful rename changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    /// New name was blank or identical; nothing changed
    Unchanged,
    /// Name replaced everywhere
    Renamed {
        /// Previous name
        old_name: String,
        /// Name now in use
        new_name: String,
        /// Number of mapping entries rewritten
        entries_updated: usize,
    },
}

/// Rename target `old_name` to `new_name` across catalog, mappings and selection.
///
/// `new_name` is trimmed. A blank or unchanged name succeeds without changes.
/// Every check runs before the first write.
pub fn rename_target_field(
    old_name: &str,
    new_name: &str,
    catalog: &mut FieldCatalog,
    mappings: &mut MappingSet,
    selection: &mut Selection,
) -> Result<RenameOutcome, RenameError> {
    let new_name = new_name.trim();
    if new_name.is_empty() || new_name == old_name {
        return Ok(RenameOutcome::Unchanged);
    }
    if !catalog.has_target(old_name) {
        return Err(RenameError::UnknownTargetField {
            old_name: old_name.to_string(),
        });
    }
    if catalog.has_target(new_name) {
        return Err(RenameError::DuplicateTargetName {
            new_name: new_name.to_string(),
        });
    }

    catalog.rename_target(old_name, new_name);
    let entries_updated = mappings.rename_target(old_name, new_name);
    selection.rename_target(old_name, new_name);

    tracing::debug!(
        old_name,
        new_name,
        entries_updated,
        "renamed target field"
    );
    Ok(RenameOutcome::Renamed {
        old_name: old_name.to_string(),
        new_name: new_name.to_string(),
        entries_updated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DataType, SourceField};
    use crate::edit::EditSession;
    use crate::mapping::{EntryId, FieldRole, MappingEntry};

    fn fixture() -> (FieldCatalog, MappingSet) {
        let catalog = FieldCatalog::new(
            vec![
                SourceField::new("A", DataType::Text),
                SourceField::new("B", DataType::Number),
            ],
            ["X", "Y", "Z"],
        );
        let mut mappings = MappingSet::new();
        let mut selection = Selection::new("A", ["X", "Y"], DataType::Text);
        mappings
            .add_or_update(&mut selection, &catalog, &mut EditSession::default())
            .unwrap();
        (catalog, mappings)
    }

    #[test]
    fn test_rename_bound_target() {
        let (mut catalog, mut mappings) = fixture();
        let mut selection = Selection::default();
        selection.toggle_target("Y");

        let outcome =
            rename_target_field("Y", " W ", &mut catalog, &mut mappings, &mut selection).unwrap();

        assert_eq!(
            outcome,
            RenameOutcome::Renamed {
                old_name: "Y".to_string(),
                new_name: "W".to_string(),
                entries_updated: 1,
            }
        );
        assert_eq!(catalog.target_names(), vec!["X", "W", "Z"]);
        assert_eq!(mappings.entries()[0].target_fields, vec!["X", "W"]);
        assert!(mappings.query("W", FieldRole::Target).claimed);
        assert!(!mappings.query("Y", FieldRole::Target).claimed);
        assert_eq!(selection.targets, vec!["W"]);
    }

    #[test]
    fn test_rename_unbound_target_touches_only_catalog() {
        let (mut catalog, mut mappings) = fixture();
        let before = mappings.entries().to_vec();
        let mut selection = Selection::default();

        let outcome =
            rename_target_field("Z", "Q", &mut catalog, &mut mappings, &mut selection).unwrap();

        assert!(matches!(outcome, RenameOutcome::Renamed { entries_updated: 0, .. }));
        assert!(catalog.has_target("Q"));
        assert_eq!(mappings.entries(), before.as_slice());
    }

    #[test]
    fn test_rename_to_existing_name_changes_nothing() {
        let (mut catalog, mut mappings) = fixture();
        let catalog_before = catalog.clone();
        let entries_before = mappings.entries().to_vec();
        let mut selection = Selection::new("A", ["Y"], DataType::Text);
        let selection_before = selection.clone();

        let err =
            rename_target_field("Y", "X", &mut catalog, &mut mappings, &mut selection).unwrap_err();

        assert_eq!(
            err,
            RenameError::DuplicateTargetName {
                new_name: "X".to_string()
            }
        );
        assert_eq!(catalog, catalog_before);
        assert_eq!(mappings.entries(), entries_before.as_slice());
        assert_eq!(selection, selection_before);
    }

    #[test]
    fn test_blank_or_same_name_is_noop() {
        let (mut catalog, mut mappings) = fixture();
        let mut selection = Selection::default();
        for new_name in ["", "   ", "Y"] {
            let outcome =
                rename_target_field("Y", new_name, &mut catalog, &mut mappings, &mut selection)
                    .unwrap();
            assert_eq!(outcome, RenameOutcome::Unchanged);
        }
        assert!(catalog.has_target("Y"));
    }

    #[test]
    fn test_rename_is_case_sensitive() {
        let (mut catalog, mut mappings) = fixture();
        let mut selection = Selection::default();
        rename_target_field("Z", "x", &mut catalog, &mut mappings, &mut selection).unwrap();
        assert!(catalog.has_target("x"));
        assert!(catalog.has_target("X"));
    }

    #[test]
    fn test_unknown_old_name() {
        let (mut catalog, mut mappings) = fixture();
        let mut selection = Selection::default();
        let err = rename_target_field("nope", "W", &mut catalog, &mut mappings, &mut selection)
            .unwrap_err();
        assert!(matches!(err, RenameError::UnknownTargetField { .. }));
    }

    #[test]
    fn test_rename_rewrites_every_owner() {
        let mut catalog = FieldCatalog::new(vec![], ["X"]);
        let mut mappings = MappingSet::new();
        for id in ["1", "2"] {
            mappings.push_unchecked(MappingEntry {
                id: EntryId::from(id),
                source_field: format!("S{}", id),
                target_fields: vec!["X".to_string()],
                data_type: DataType::Text,
            });
        }
        let mut selection = Selection::default();
        let outcome =
            rename_target_field("X", "W", &mut catalog, &mut mappings, &mut selection).unwrap();
        assert!(matches!(outcome, RenameOutcome::Renamed { entries_updated: 2, .. }));
        assert_eq!(mappings.query("W", FieldRole::Target).count, 2);
    }
}
