//! Row registry
//!
//! Lets rows self-register so the grid can address them without maintaining
//! an explicit child list. Registered rows are keyed by a generated [`RowId`];
//! selection and highlight state is additionally tracked in identity-keyed
//! maps (the developer-supplied unique id) so it survives a row being
//! unmounted and remounted with the same logical identity, e.g. after a page
//! change re-creates the row widgets.
//!
//! All methods run under the grid's state lock; the registry itself has no
//! interior mutability.

use std::collections::{BTreeSet, HashMap};

use crate::row::RowHandle;

/// Opaque registration token, generated by the registry and never reused
/// while the row is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowId(u64);

/// Registration record for one mounted row.
///
/// The handle is a non-owning back-reference used only to push flag changes
/// into the live row; it never stores state.
pub(crate) struct RowRecord {
    pub(crate) unique_id: Option<String>,
    pub(crate) selected: bool,
    pub(crate) highlighted: bool,
    pub(crate) handle: RowHandle,
}

#[derive(Default)]
pub(crate) struct RowRegistry {
    rows: HashMap<RowId, RowRecord>,
    /// Identity-keyed selection state; survives detach/re-attach.
    selected_ids: BTreeSet<String>,
    /// At most one highlighted identity at a time.
    highlighted_id: Option<String>,
    /// The armed select-all control, reset by any sync.
    select_all: Option<RowHandle>,
    next_id: u64,
}

impl RowRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Produces a fresh token, collision-free for this grid instance.
    pub(crate) fn generate_id(&mut self) -> RowId {
        self.next_id += 1;
        RowId(self.next_id)
    }

    /// Inserts a record. Rows without a unique id are ignored unless exempt
    /// (the select-all header control).
    pub(crate) fn attach(&mut self, row_id: RowId, record: RowRecord, exempt: bool) {
        if record.unique_id.is_none() && !exempt {
            tracing::debug!("ignoring attach for a row without a unique id");
            return;
        }
        self.rows.insert(row_id, record);
    }

    /// Removes a record. Safe during teardown even if attach never completed;
    /// identity-keyed selection state is deliberately left intact so the same
    /// identity can adopt it on remount.
    pub(crate) fn detach(&mut self, row_id: RowId) {
        self.rows.remove(&row_id);
    }

    /// Synchronizes a row's local flags with any state already recorded for
    /// its identity. Called on (re)registration and when a row's unique id
    /// changes.
    pub(crate) fn check_selection(&mut self, unique_id: &str, handle: &RowHandle) {
        let selected = self.selected_ids.contains(unique_id);
        let highlighted = self.highlighted_id.as_deref() == Some(unique_id);
        handle.sync_flags(selected, highlighted);
        for record in self.records_for(unique_id) {
            record.selected = selected;
            record.highlighted = highlighted;
        }
    }

    /// Default selection mutation: updates the identity set and every record
    /// sharing the identity. Deselecting a row also disarms an armed
    /// select-all control. Returns the currently selected ids.
    pub(crate) fn select_row(
        &mut self,
        unique_id: &str,
        handle: &RowHandle,
        selected: bool,
    ) -> Vec<String> {
        if !selected {
            self.disarm_select_all();
        }
        if selected {
            self.selected_ids.insert(unique_id.to_string());
        } else {
            self.selected_ids.remove(unique_id);
        }
        for record in self.records_for(unique_id) {
            record.selected = selected;
            record.handle.set_selected(selected);
        }
        // the calling row may not be attached, e.g. when its attach was
        // guarded; keep its local flag in step regardless
        handle.set_selected(selected);
        self.selected_ids.iter().cloned().collect()
    }

    /// Toggles every registered row to the control's new checked state and
    /// arms the control so a later sync can reset it. Returns the currently
    /// selected ids.
    pub(crate) fn select_all(&mut self, control: &RowHandle) -> Vec<String> {
        // only one select-all affordance may be armed per grid
        if let Some(previous) = &self.select_all {
            if !previous.same_row(control) {
                previous.set_selected(false);
            }
        }

        let selected = !control.selected().unwrap_or(false);
        for record in self.rows.values_mut() {
            if let Some(unique_id) = &record.unique_id {
                if selected {
                    self.selected_ids.insert(unique_id.clone());
                } else {
                    self.selected_ids.remove(unique_id);
                }
            }
            record.selected = selected;
            record.handle.set_selected(selected);
        }
        control.set_selected(selected);
        self.select_all = selected.then(|| control.clone());
        self.selected_ids.iter().cloned().collect()
    }

    /// Highlights exactly one identity at a time: the same identity toggles,
    /// a different one clears the previous row first. Returns the new
    /// highlight state.
    pub(crate) fn highlight_row(&mut self, unique_id: &str, handle: &RowHandle) -> bool {
        let mut highlighted = true;
        match self.highlighted_id.take() {
            Some(previous) if previous == unique_id => {
                highlighted = !handle.highlighted().unwrap_or(false);
            }
            Some(previous) => {
                for record in self.records_for(&previous) {
                    record.highlighted = false;
                    record.handle.set_highlighted(false);
                }
            }
            None => {}
        }
        for record in self.records_for(unique_id) {
            record.highlighted = highlighted;
            record.handle.set_highlighted(highlighted);
        }
        handle.set_highlighted(highlighted);
        self.highlighted_id = highlighted.then(|| unique_id.to_string());
        highlighted
    }

    /// Resets an armed select-all control without touching row flags.
    pub(crate) fn disarm_select_all(&mut self) {
        if let Some(control) = self.select_all.take() {
            control.set_selected(false);
        }
    }

    #[cfg(test)]
    pub(crate) fn select_all_armed(&self) -> bool {
        self.select_all.is_some()
    }

    pub(crate) fn selected_ids(&self) -> Vec<String> {
        self.selected_ids.iter().cloned().collect()
    }

    pub(crate) fn highlighted_id(&self) -> Option<String> {
        self.highlighted_id.clone()
    }

    pub(crate) fn registered(&self) -> usize {
        self.rows.len()
    }

    /// Full teardown on grid unmount.
    pub(crate) fn clear(&mut self) {
        self.rows.clear();
        self.selected_ids.clear();
        self.highlighted_id = None;
        self.select_all = None;
    }

    fn records_for<'a>(
        &'a mut self,
        unique_id: &'a str,
    ) -> impl Iterator<Item = &'a mut RowRecord> + 'a {
        self.rows
            .values_mut()
            .filter(move |record| record.unique_id.as_deref() == Some(unique_id))
    }
}
