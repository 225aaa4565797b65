//! Mapping construction session
//!
//! [`Mapper`] owns the catalog, mapping set, edit session and selection for one
//! file being mapped, and exposes the operator-level operations over them.
//! Every method runs to completion synchronously; collaborators are only
//! called by the caller, after local mutations are done.

use crate::catalog::{DataType, FieldCatalog};
use crate::edit::EditSession;
use crate::error::{Error, Result};
use crate::mapping::{EntryId, FieldClaim, FieldRole, MappingEntry, MappingSet};
use crate::pattern::{self, MappingPattern, PatternWarning};
use crate::rename::{self, RenameOutcome};
use crate::selection::Selection;

/// Construction-engine state for one source file
#[derive(Debug, Clone, Default)]
pub struct Mapper {
    file_id: Option<u64>,
    catalog: FieldCatalog,
    mappings: MappingSet,
    edit: EditSession,
    selection: Selection,
}

impl Mapper {
    /// Start with an empty mapping set over `catalog`
    pub fn new(catalog: FieldCatalog) -> Self {
        Self {
            catalog,
            ..Default::default()
        }
    }

    /// Attach the identifier of the uploaded file
    pub fn with_file_id(mut self, file_id: u64) -> Self {
        self.file_id = Some(file_id);
        self
    }

    /// Identifier of the uploaded file, if known
    pub fn file_id(&self) -> Option<u64> {
        self.file_id
    }

    /// Field catalog
    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    /// Committed mappings
    pub fn mappings(&self) -> &MappingSet {
        &self.mappings
    }

    /// Committed entries in order
    pub fn entries(&self) -> &[MappingEntry] {
        self.mappings.entries()
    }

    /// Edit session state
    pub fn edit_session(&self) -> &EditSession {
        &self.edit
    }

    /// Current selection
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Pick a source field
    pub fn select_source(&mut self, source: &str) {
        self.selection.set_source(Some(source.to_string()));
    }

    /// Toggle a target field in the selection
    pub fn toggle_target(&mut self, target: &str) {
        self.selection.toggle_target(target);
    }

    /// Choose the data type of a selected target field. Returns `false` when
    /// the target isn't selected.
    pub fn set_target_type(&mut self, target: &str, data_type: DataType) -> bool {
        self.selection.set_target_type(target, data_type)
    }

    /// Replace the whole selection
    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
    }

    /// Commit the selection as a new entry, or into the edited entry
    pub fn add_or_update(&mut self) -> Result<MappingEntry> {
        let entry = self
            .mappings
            .add_or_update(&mut self.selection, &self.catalog, &mut self.edit)?;
        Ok(entry)
    }

    /// Start editing an entry
    pub fn begin_edit(&mut self, id: &EntryId) -> Result<()> {
        let entry = self.mappings.get(id).ok_or_else(|| Error::EntryNotFound {
            what: format!("id {}", id),
        })?;
        self.edit.begin(entry, &mut self.selection);
        Ok(())
    }

    /// Start editing the entry that owns `source`
    pub fn begin_edit_source(&mut self, source: &str) -> Result<EntryId> {
        let entry = self
            .mappings
            .entry_for_source(source)
            .ok_or_else(|| Error::EntryNotFound {
                what: format!("source field '{}'", source),
            })?;
        let id = entry.id.clone();
        self.edit.begin(entry, &mut self.selection);
        Ok(id)
    }

    /// Stop editing and clear the selection
    pub fn cancel_edit(&mut self) {
        self.edit.cancel(&mut self.selection);
    }

    /// Delete an entry
    pub fn remove(&mut self, id: &EntryId) -> Option<MappingEntry> {
        self.mappings
            .remove(id, &mut self.edit, &mut self.selection)
    }

    /// Delete the entry that owns `source`
    pub fn remove_source(&mut self, source: &str) -> Result<MappingEntry> {
        let id = self
            .mappings
            .entry_for_source(source)
            .map(|e| e.id.clone())
            .ok_or_else(|| Error::EntryNotFound {
                what: format!("source field '{}'", source),
            })?;
        self.remove(&id).ok_or_else(|| Error::EntryNotFound {
            what: format!("id {}", id),
        })
    }

    /// Rename a target field everywhere it appears
    pub fn rename_target(&mut self, old_name: &str, new_name: &str) -> Result<RenameOutcome> {
        let outcome = rename::rename_target_field(
            old_name,
            new_name,
            &mut self.catalog,
            &mut self.mappings,
            &mut self.selection,
        )?;
        if let RenameOutcome::Renamed { new_name, .. } = &outcome {
            self.edit.rename_target(old_name, new_name);
        }
        Ok(outcome)
    }

    /// Add a target field by hand
    pub fn add_target(&mut self, name: &str) -> Result<()> {
        self.catalog.add_target(name)?;
        Ok(())
    }

    /// Swap in a new target catalog.
    ///
    /// Entries bound to targets that no longer exist are dropped and returned;
    /// those targets leave the selection too.
    pub fn replace_targets<I, S>(&mut self, names: I) -> Vec<MappingEntry>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let removed = self.catalog.replace_targets(names);
        let dropped = self.mappings.retain_without_targets(&removed);

        let edited_dropped = self
            .edit
            .entry_id()
            .is_some_and(|id| dropped.iter().any(|e| &e.id == id));
        if edited_dropped {
            self.edit.cancel(&mut self.selection);
        }
        for name in &removed {
            self.selection.deselect_target(name);
        }
        tracing::debug!(
            removed_targets = removed.len(),
            dropped_entries = dropped.len(),
            "replaced target catalog"
        );
        dropped
    }

    /// Whether `field` is claimed in `role`
    pub fn query(&self, field: &str, role: FieldRole) -> FieldClaim {
        self.mappings.query(field, role)
    }

    /// Whether `field` can't be picked right now
    pub fn is_locked(&self, field: &str, role: FieldRole) -> bool {
        self.edit.is_locked(field, role, &self.mappings)
    }

    /// Display label for a target field
    pub fn target_label(&self, target: &str) -> String {
        self.mappings.target_label(target, &self.catalog)
    }

    /// Snapshot the committed mappings as a named pattern
    pub fn to_pattern(&self, name: &str) -> Result<MappingPattern> {
        Ok(pattern::to_pattern(name, &self.mappings)?)
    }

    /// Replace the mapping set with the rows of `pattern` that validate
    /// against the live catalog.
    ///
    /// Rows that fail are skipped and reported alongside the catalog
    /// comparison warnings. Nothing here is fatal.
    pub fn load_pattern(&mut self, pattern: &MappingPattern) -> Vec<PatternWarning> {
        self.edit.cancel(&mut self.selection);
        self.mappings.clear();

        let mut warnings = pattern::check_pattern(pattern, &self.catalog);
        for row in pattern.rows() {
            let mut selection =
                Selection::new(row.source_field.clone(), row.target_fields, row.data_type);
            let mut edit = EditSession::default();
            if let Err(reason) = self
                .mappings
                .add_or_update(&mut selection, &self.catalog, &mut edit)
            {
                warnings.push(PatternWarning::Rejected {
                    source_field: row.source_field,
                    reason,
                });
            }
        }
        for warning in &warnings {
            tracing::warn!(pattern = %pattern.name, "{}", warning);
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SourceField;
    use crate::validator::ValidationError;

    fn mapper() -> Mapper {
        Mapper::new(FieldCatalog::new(
            vec![
                SourceField::new("A", DataType::Text),
                SourceField::new("B", DataType::Number),
            ],
            ["X", "Y", "Z"],
        ))
    }

    fn map_a(mapper: &mut Mapper) -> MappingEntry {
        mapper.select_source("A");
        mapper.toggle_target("X");
        mapper.toggle_target("Y");
        mapper.add_or_update().unwrap()
    }

    #[test]
    fn test_reference_scenario() {
        let mut mapper = mapper();
        let a = map_a(&mut mapper);
        assert_eq!(a.data_type, DataType::Text);

        mapper.select_source("B");
        mapper.toggle_target("X");
        mapper.set_target_type("X", DataType::Number);
        let err = mapper.add_or_update().unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::TargetAlreadyMapped { .. })
        ));

        mapper.toggle_target("X");
        mapper.toggle_target("Z");
        let err = mapper.add_or_update().unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::SourceTargetTypeMismatch { .. })
        ));
        assert!(err.is_user_correctable());

        mapper.set_target_type("Z", DataType::Number);
        let b = mapper.add_or_update().unwrap();
        assert_eq!(b.data_type, DataType::Number);
        assert_eq!(mapper.entries().len(), 2);
        assert!(mapper.mappings().duplicate_claims().is_empty());
    }

    #[test]
    fn test_begin_then_cancel_keeps_entry() {
        let mut mapper = mapper();
        let a = map_a(&mut mapper);

        mapper.begin_edit(&a.id).unwrap();
        assert_eq!(mapper.selection().targets, vec!["X", "Y"]);
        mapper.toggle_target("Y");
        mapper.cancel_edit();

        assert_eq!(mapper.entries(), &[a]);
        assert!(mapper.selection().is_empty());
        assert!(!mapper.edit_session().is_active());
    }

    #[test]
    fn test_rename_updates_edit_snapshot() {
        let mut mapper = mapper();
        map_a(&mut mapper);
        mapper.begin_edit_source("A").unwrap();

        mapper.rename_target("Y", "W").unwrap();
        let snapshot = mapper.edit_session().snapshot().unwrap();
        assert_eq!(snapshot.target_fields, vec!["X", "W"]);
        assert_eq!(mapper.selection().targets, vec!["X", "W"]);
        assert_eq!(mapper.target_label("W"), "W (1)");
    }

    #[test]
    fn test_rename_duplicate_surfaces_error() {
        let mut mapper = mapper();
        map_a(&mut mapper);
        let err = mapper.rename_target("Y", "X").unwrap_err();
        assert!(matches!(err, Error::Rename(_)));
        assert_eq!(mapper.catalog().target_names(), vec!["X", "Y", "Z"]);
    }

    #[test]
    fn test_remove_source_and_missing_entry() {
        let mut mapper = mapper();
        map_a(&mut mapper);
        mapper.remove_source("A").unwrap();
        assert!(mapper.entries().is_empty());
        assert!(matches!(
            mapper.remove_source("A"),
            Err(Error::EntryNotFound { .. })
        ));
        assert!(mapper.begin_edit(&EntryId::from("missing")).is_err());
    }

    #[test]
    fn test_is_locked() {
        let mut mapper = mapper();
        map_a(&mut mapper);
        assert!(mapper.is_locked("A", FieldRole::Source));
        assert!(mapper.is_locked("X", FieldRole::Target));
        assert!(!mapper.is_locked("Z", FieldRole::Target));
        mapper.begin_edit_source("A").unwrap();
        assert!(!mapper.is_locked("X", FieldRole::Target));
    }

    #[test]
    fn test_replace_targets_drops_affected_entries() {
        let mut mapper = mapper();
        map_a(&mut mapper);
        mapper.begin_edit_source("A").unwrap();

        let dropped = mapper.replace_targets(["X", "Q"]);
        assert_eq!(dropped.len(), 1);
        assert!(mapper.entries().is_empty());
        assert!(!mapper.edit_session().is_active());
        assert_eq!(mapper.catalog().target_names(), vec!["X", "Q"]);
    }

    #[test]
    fn test_add_target_then_map() {
        let mut mapper = mapper();
        mapper.add_target("W").unwrap();
        assert!(mapper.add_target("W").is_err());
        mapper.select_source("B");
        mapper.toggle_target("W");
        mapper.set_target_type("W", DataType::Number);
        assert!(mapper.add_or_update().is_ok());
    }

    #[test]
    fn test_pattern_round_trip_through_mapper() {
        let mut mapper = mapper();
        map_a(&mut mapper);
        let pattern = mapper.to_pattern("people").unwrap();

        let mut other = self::mapper();
        let warnings = other.load_pattern(&pattern);
        assert!(warnings.is_empty());
        assert_eq!(other.entries().len(), 1);
        assert_eq!(other.entries()[0].target_fields, vec!["X", "Y"]);
    }

    #[test]
    fn test_pattern_reload_keeps_entry_order() {
        let catalog = FieldCatalog::new(
            vec![
                SourceField::new("alpha", DataType::Text),
                SourceField::new("zeta", DataType::Text),
            ],
            ["X", "Y"],
        );
        let mut mapper = Mapper::new(catalog.clone());
        mapper.set_selection(Selection::new("zeta", ["X"], DataType::Text));
        mapper.add_or_update().unwrap();
        mapper.set_selection(Selection::new("alpha", ["Y"], DataType::Text));
        mapper.add_or_update().unwrap();
        let pattern = mapper.to_pattern("ordered").unwrap();

        let mut reloaded = Mapper::new(catalog);
        assert!(reloaded.load_pattern(&pattern).is_empty());

        let sources = |m: &Mapper| -> Vec<String> {
            m.entries().iter().map(|e| e.source_field.clone()).collect()
        };
        assert_eq!(sources(&reloaded), vec!["zeta", "alpha"]);
        assert_eq!(sources(&mapper), sources(&reloaded));
    }

    #[test]
    fn test_type_for_unselected_target_is_ignored() {
        let mut mapper = mapper();
        mapper.select_source("B");
        assert!(!mapper.set_target_type("Z", DataType::Number));
        mapper.toggle_target("Z");
        assert_eq!(mapper.selection().target_type("Z"), DataType::Text);
        assert!(matches!(
            mapper.add_or_update(),
            Err(Error::Validation(ValidationError::SourceTargetTypeMismatch { .. }))
        ));
    }

    #[test]
    fn test_load_pattern_skips_bad_rows() {
        let yaml = r#"
name: legacy
pattern:
  A:
    columns: [X]
    type: text
  B:
    columns: [Z]
    type: text
  C:
    columns: [Y]
    type: text
"#;
        let pattern: MappingPattern = serde_yaml::from_str(yaml).unwrap();
        let mut mapper = mapper();
        let warnings = mapper.load_pattern(&pattern);

        assert_eq!(mapper.entries().len(), 1);
        let rejected: Vec<_> = warnings
            .iter()
            .filter_map(|w| match w {
                PatternWarning::Rejected { source_field, .. } => Some(source_field.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(rejected, vec!["B", "C"]);
    }
}
