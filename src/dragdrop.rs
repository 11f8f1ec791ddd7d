//! Injected drag-and-drop capability
//!
//! The grid core does not own a drag-and-drop subsystem; rows consume an
//! injected capability so any host reordering machinery can plug in. A grid
//! without the capability simply has no draggable rows (and no index
//! requirement on mount).

use std::sync::Mutex;

/// Capability consumed from the host's drag-and-drop collaborator.
pub trait DragDrop: Send + Sync {
    /// Index of the row currently being dragged, if any.
    fn active_index(&self) -> Option<usize>;

    /// Marks the row at `index` as the dragged row.
    fn begin_drag(&self, index: usize);

    /// Whether a drop at `index` is currently allowed.
    fn can_drop(&self, index: usize) -> bool;
}

/// Minimal shared-state implementation for hosts and tests.
///
/// Tracks only the active index; a drop is allowed anywhere except onto the
/// dragged row itself.
#[derive(Default)]
pub struct SharedDragState {
    active: Mutex<Option<usize>>,
}

impl SharedDragState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the active drag, e.g. after a drop or an aborted drag.
    pub fn end_drag(&self) {
        *self.active.lock().unwrap() = None;
    }
}

impl DragDrop for SharedDragState {
    fn active_index(&self) -> Option<usize> {
        *self.active.lock().unwrap()
    }

    fn begin_drag(&self, index: usize) {
        *self.active.lock().unwrap() = Some(index);
    }

    fn can_drop(&self, index: usize) -> bool {
        let active = self.active.lock().unwrap();
        active.is_some() && *active != Some(index)
    }
}
