//! Edit session
//!
//! Tracks which mapping entry, if any, the form is editing in place. Committing
//! goes through [`crate::mapping::MappingSet::add_or_update`], which reads the
//! session to choose between update and append and then clears it.

use crate::mapping::{EntryId, FieldRole, MappingEntry, MappingSet};
use crate::selection::Selection;

/// "Currently editing entry X" plus a snapshot of X at the time editing began
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditSession {
    entry_id: Option<EntryId>,
    snapshot: Option<MappingEntry>,
}

impl EditSession {
    /// Start editing `entry`, loading its values into `selection`.
    ///
    /// Any session already in progress is replaced and its uncommitted picks
    /// are discarded.
    pub fn begin(&mut self, entry: &MappingEntry, selection: &mut Selection) {
        if let Some(previous) = &self.entry_id {
            tracing::debug!(entry_id = %previous, "discarding previous edit session");
        }
        self.entry_id = Some(entry.id.clone());
        self.snapshot = Some(entry.clone());

        selection.clear();
        selection.source = Some(entry.source_field.clone());
        for target in &entry.target_fields {
            selection.select_target(target.clone());
            selection.set_target_type(target, entry.data_type);
        }
        tracing::debug!(entry_id = %entry.id, "began editing mapping entry");
    }

    /// Stop editing without touching the mapping set. The selection is
    /// emptied, not reverted to the snapshot. Calling this with no active
    /// session only clears the selection.
    pub fn cancel(&mut self, selection: &mut Selection) {
        if let Some(id) = self.entry_id.take() {
            tracing::debug!(entry_id = %id, "cancelled edit session");
        }
        self.snapshot = None;
        selection.clear();
    }

    /// Id of the entry being edited
    pub fn entry_id(&self) -> Option<&EntryId> {
        self.entry_id.as_ref()
    }

    /// Values of the edited entry when editing began
    pub fn snapshot(&self) -> Option<&MappingEntry> {
        self.snapshot.as_ref()
    }

    /// Whether an entry is being edited
    pub fn is_active(&self) -> bool {
        self.entry_id.is_some()
    }

    /// Whether `field` is off limits for selection: it is claimed, and not by
    /// the entry being edited.
    pub fn is_locked(&self, field: &str, role: FieldRole, mappings: &MappingSet) -> bool {
        mappings
            .claimants(field, role)
            .iter()
            .any(|id| Some(id) != self.entry_id.as_ref())
    }

    pub(crate) fn clear(&mut self) {
        self.entry_id = None;
        self.snapshot = None;
    }

    pub(crate) fn rename_target(&mut self, old: &str, new: &str) {
        if let Some(snapshot) = self.snapshot.as_mut() {
            for target in snapshot.target_fields.iter_mut().filter(|t| *t == old) {
                *target = new.to_string();
            }
        }
    }
}
