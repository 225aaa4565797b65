//! Mapping set
//!
//! An ordered collection of [`MappingEntry`] values, each binding one source
//! field to one or more target fields with a shared data type. Two claim
//! indexes (source → entries, target → entries) answer "is this field already
//! mapped" without scanning; both are rebuilt from `entries` after every
//! mutation and are never edited on their own.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::catalog::{DataType, FieldCatalog};
use crate::edit::EditSession;
use crate::selection::Selection;
use crate::validator::{ValidationError, dedup_targets, validate_binding};

/// Identifier of a mapping entry, stable for the entry's lifetime
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Generate a fresh, unique id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the id as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One source field bound to one or more target fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEntry {
    /// Entry id (not persisted in patterns)
    pub id: EntryId,

    /// Source field name
    pub source_field: String,

    /// Target field names, in pick order, without duplicates
    pub target_fields: Vec<String>,

    /// Data type shared by the source and every target
    pub data_type: DataType,
}

/// Which side of a binding a field sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldRole {
    /// Field of the incoming dataset
    Source,
    /// Field of the destination schema
    Target,
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Target => write!(f, "target"),
        }
    }
}

/// Answer to "is this field mapped, and by how many entries"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldClaim {
    /// Whether any entry claims the field
    pub claimed: bool,
    /// Number of claiming entries (at most one while invariants hold)
    pub count: usize,
}

/// Ordered mapping entries plus claim indexes
#[derive(Debug, Clone, Default)]
pub struct MappingSet {
    entries: Vec<MappingEntry>,
    by_source: HashMap<String, Vec<EntryId>>,
    by_target: HashMap<String, Vec<EntryId>>,
}

impl MappingSet {
    /// Create an empty mapping set
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries in insertion order
    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by id
    pub fn get(&self, id: &EntryId) -> Option<&MappingEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    /// The entry that owns a source field
    pub fn entry_for_source(&self, source: &str) -> Option<&MappingEntry> {
        self.claimants(source, FieldRole::Source)
            .first()
            .and_then(|id| self.get(id))
    }

    /// Ids of the entries claiming a field in the given role
    pub fn claimants(&self, field: &str, role: FieldRole) -> &[EntryId] {
        let index = match role {
            FieldRole::Source => &self.by_source,
            FieldRole::Target => &self.by_target,
        };
        index.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `field` is claimed in `role`, and by how many entries
    pub fn query(&self, field: &str, role: FieldRole) -> FieldClaim {
        let count = self.claimants(field, role).len();
        FieldClaim {
            claimed: count > 0,
            count,
        }
    }

    /// Target list of the entry owning `source`, or empty
    pub fn mapped_targets_for(&self, source: &str) -> &[String] {
        self.entry_for_source(source)
            .map(|e| e.target_fields.as_slice())
            .unwrap_or(&[])
    }

    /// Display label for a target: its name followed by the catalog numbers of
    /// the sources that claim it, e.g. `"email (2)"`.
    pub fn target_label(&self, target: &str, catalog: &FieldCatalog) -> String {
        let numbers: Vec<String> = self
            .claimants(target, FieldRole::Target)
            .iter()
            .filter_map(|id| self.get(id))
            .filter_map(|e| catalog.source_number(&e.source_field))
            .map(|n| n.to_string())
            .collect();
        if numbers.is_empty() {
            target.to_string()
        } else {
            format!("{} ({})", target, numbers.join(", "))
        }
    }

    /// Fields claimed by more than one entry. Empty while invariants hold.
    pub fn duplicate_claims(&self) -> Vec<(FieldRole, String)> {
        let mut duplicates: Vec<(FieldRole, String)> = self
            .by_source
            .iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(field, _)| (FieldRole::Source, field.clone()))
            .chain(
                self.by_target
                    .iter()
                    .filter(|(_, ids)| ids.len() > 1)
                    .map(|(field, _)| (FieldRole::Target, field.clone())),
            )
            .collect();
        duplicates.sort_by(|a, b| a.1.cmp(&b.1));
        duplicates
    }

    /// Commit the current selection.
    ///
    /// With an active edit session the edited entry is rewritten in place,
    /// keeping its id and position; otherwise a new entry is appended. On
    /// success both the edit session and the selection are cleared. On failure
    /// nothing is touched.
    pub fn add_or_update(
        &mut self,
        selection: &mut Selection,
        catalog: &FieldCatalog,
        edit: &mut EditSession,
    ) -> Result<MappingEntry, ValidationError> {
        let data_type = validate_binding(selection, catalog, self, edit.entry_id())?;
        let source_field = selection.source.clone().unwrap_or_default();
        let target_fields = dedup_targets(&selection.targets);

        let editing = edit
            .entry_id()
            .and_then(|id| self.entries.iter().position(|e| &e.id == id));

        let committed = match editing {
            Some(index) => {
                let entry = &mut self.entries[index];
                entry.source_field = source_field;
                entry.target_fields = target_fields;
                entry.data_type = data_type;
                tracing::debug!(entry_id = %entry.id, source = %entry.source_field, "updated mapping entry");
                entry.clone()
            }
            None => {
                if let Some(stale) = edit.entry_id() {
                    tracing::warn!(entry_id = %stale, "edited entry no longer exists, appending instead");
                }
                let entry = MappingEntry {
                    id: EntryId::generate(),
                    source_field,
                    target_fields,
                    data_type,
                };
                tracing::debug!(entry_id = %entry.id, source = %entry.source_field, "added mapping entry");
                self.entries.push(entry.clone());
                entry
            }
        };

        self.reindex();
        edit.clear();
        selection.clear();
        Ok(committed)
    }

    /// Delete an entry. If it was being edited, the edit is cancelled.
    pub fn remove(
        &mut self,
        id: &EntryId,
        edit: &mut EditSession,
        selection: &mut Selection,
    ) -> Option<MappingEntry> {
        let index = self.entries.iter().position(|e| &e.id == id)?;
        let removed = self.entries.remove(index);
        self.reindex();
        if edit.entry_id() == Some(id) {
            edit.cancel(selection);
        }
        tracing::debug!(entry_id = %id, source = %removed.source_field, "removed mapping entry");
        Some(removed)
    }

    /// Drop every entry binding any of `targets`, returning the dropped entries
    pub fn retain_without_targets(&mut self, targets: &[String]) -> Vec<MappingEntry> {
        let (dropped, kept): (Vec<_>, Vec<_>) = self
            .entries
            .drain(..)
            .partition(|e| e.target_fields.iter().any(|t| targets.contains(t)));
        self.entries = kept;
        self.reindex();
        dropped
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.reindex();
    }

    /// Rewrite every occurrence of target `old` to `new`, returning how many
    /// entries changed. Callers validate first.
    pub(crate) fn rename_target(&mut self, old: &str, new: &str) -> usize {
        let mut changed = 0;
        for entry in &mut self.entries {
            let mut touched = false;
            for target in entry.target_fields.iter_mut().filter(|t| *t == old) {
                *target = new.to_string();
                touched = true;
            }
            if touched {
                changed += 1;
            }
        }
        if changed > 0 {
            self.reindex();
        }
        changed
    }

    fn reindex(&mut self) {
        self.by_source.clear();
        self.by_target.clear();
        for entry in &self.entries {
            self.by_source
                .entry(entry.source_field.clone())
                .or_default()
                .push(entry.id.clone());
            for target in &entry.target_fields {
                self.by_target
                    .entry(target.clone())
                    .or_default()
                    .push(entry.id.clone());
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn push_unchecked(&mut self, entry: MappingEntry) {
        self.entries.push(entry);
        self.reindex();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SourceField;

    fn catalog() -> FieldCatalog {
        FieldCatalog::new(
            vec![
                SourceField::new("A", DataType::Text),
                SourceField::new("B", DataType::Number),
                SourceField::new("C", DataType::Text),
            ],
            ["X", "Y", "Z"],
        )
    }

    fn commit(
        set: &mut MappingSet,
        catalog: &FieldCatalog,
        source: &str,
        targets: &[&str],
        data_type: DataType,
    ) -> Result<MappingEntry, ValidationError> {
        let mut selection = Selection::new(source, targets.iter().copied(), data_type);
        set.add_or_update(&mut selection, catalog, &mut EditSession::default())
    }

    #[test]
    fn test_add_appends_and_indexes() {
        let catalog = catalog();
        let mut set = MappingSet::new();
        let entry = commit(&mut set, &catalog, "A", &["X", "Y"], DataType::Text).unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(entry.data_type, DataType::Text);
        assert_eq!(set.query("A", FieldRole::Source), FieldClaim { claimed: true, count: 1 });
        assert_eq!(set.query("Y", FieldRole::Target).count, 1);
        assert!(!set.query("Z", FieldRole::Target).claimed);
        assert_eq!(set.mapped_targets_for("A"), ["X", "Y"]);
        assert!(set.mapped_targets_for("B").is_empty());
    }

    #[test]
    fn test_add_clears_selection_only_on_success() {
        let catalog = catalog();
        let mut set = MappingSet::new();
        let mut edit = EditSession::default();

        let mut rejected = Selection::new("B", ["Z"], DataType::Text);
        let before = rejected.clone();
        assert!(set.add_or_update(&mut rejected, &catalog, &mut edit).is_err());
        assert_eq!(rejected, before);
        assert!(set.is_empty());

        let mut accepted = Selection::new("B", ["Z"], DataType::Number);
        set.add_or_update(&mut accepted, &catalog, &mut edit).unwrap();
        assert!(accepted.is_empty());
    }

    #[test]
    fn test_edit_updates_in_place() {
        let catalog = catalog();
        let mut set = MappingSet::new();
        let first = commit(&mut set, &catalog, "A", &["X"], DataType::Text).unwrap();
        commit(&mut set, &catalog, "B", &["Z"], DataType::Number).unwrap();

        let mut selection = Selection::default();
        let mut edit = EditSession::default();
        edit.begin(&first, &mut selection);
        selection.source = Some("C".to_string());
        selection.select_target("Y".to_string());

        let updated = set.add_or_update(&mut selection, &catalog, &mut edit).unwrap();
        assert_eq!(updated.id, first.id);
        assert_eq!(set.entries()[0].source_field, "C");
        assert_eq!(set.entries()[0].target_fields, vec!["X", "Y"]);
        assert_eq!(set.len(), 2);
        assert!(!edit.is_active());
        assert!(!set.query("A", FieldRole::Source).claimed);
    }

    #[test]
    fn test_resubmitting_unchanged_edit_is_idempotent() {
        let catalog = catalog();
        let mut set = MappingSet::new();
        let entry = commit(&mut set, &catalog, "A", &["X", "Y"], DataType::Text).unwrap();

        let mut selection = Selection::default();
        let mut edit = EditSession::default();
        edit.begin(&entry, &mut selection);
        set.add_or_update(&mut selection, &catalog, &mut edit).unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.entries()[0], entry);
    }

    #[test]
    fn test_remove_cancels_matching_edit() {
        let catalog = catalog();
        let mut set = MappingSet::new();
        let entry = commit(&mut set, &catalog, "A", &["X"], DataType::Text).unwrap();

        let mut selection = Selection::default();
        let mut edit = EditSession::default();
        edit.begin(&entry, &mut selection);

        let removed = set.remove(&entry.id, &mut edit, &mut selection).unwrap();
        assert_eq!(removed.id, entry.id);
        assert!(set.is_empty());
        assert!(!edit.is_active());
        assert!(selection.is_empty());
        assert!(!set.query("X", FieldRole::Target).claimed);
    }

    #[test]
    fn test_remove_other_entry_keeps_edit() {
        let catalog = catalog();
        let mut set = MappingSet::new();
        let a = commit(&mut set, &catalog, "A", &["X"], DataType::Text).unwrap();
        let b = commit(&mut set, &catalog, "B", &["Z"], DataType::Number).unwrap();

        let mut selection = Selection::default();
        let mut edit = EditSession::default();
        edit.begin(&a, &mut selection);
        let before = selection.clone();

        set.remove(&b.id, &mut edit, &mut selection).unwrap();
        assert_eq!(edit.entry_id(), Some(&a.id));
        assert_eq!(edit.snapshot(), Some(&a));
        assert_eq!(selection, before);
        assert_eq!(selection.source.as_deref(), Some("A"));
        assert_eq!(set.entries(), &[a]);
    }

    #[test]
    fn test_remove_unknown_id_is_none() {
        let mut set = MappingSet::new();
        let mut selection = Selection::default();
        assert!(
            set.remove(&EntryId::from("nope"), &mut EditSession::default(), &mut selection)
                .is_none()
        );
    }

    #[test]
    fn test_target_label_lists_source_numbers() {
        let catalog = catalog();
        let mut set = MappingSet::new();
        commit(&mut set, &catalog, "B", &["Z"], DataType::Number).unwrap();
        assert_eq!(set.target_label("Z", &catalog), "Z (2)");
        assert_eq!(set.target_label("X", &catalog), "X");
    }

    #[test]
    fn test_retain_without_targets() {
        let catalog = catalog();
        let mut set = MappingSet::new();
        commit(&mut set, &catalog, "A", &["X"], DataType::Text).unwrap();
        commit(&mut set, &catalog, "B", &["Z"], DataType::Number).unwrap();

        let dropped = set.retain_without_targets(&["X".to_string()]);
        assert_eq!(dropped.len(), 1);
        assert_eq!(set.len(), 1);
        assert!(!set.query("A", FieldRole::Source).claimed);
    }

    #[test]
    fn test_duplicate_claims_reports_violations() {
        let mut set = MappingSet::new();
        for id in ["1", "2"] {
            set.push_unchecked(MappingEntry {
                id: EntryId::from(id),
                source_field: format!("S{}", id),
                target_fields: vec!["X".to_string()],
                data_type: DataType::Text,
            });
        }
        assert_eq!(set.query("X", FieldRole::Target).count, 2);
        assert_eq!(set.duplicate_claims(), vec![(FieldRole::Target, "X".to_string())]);
    }
}
