//! Per-row registration and state machine
//!
//! A [`Row`] is the state core of one table-row widget. It registers itself
//! with the grid it is mounted into, adopts any selection state already
//! recorded for its identity, and exposes the click/select transitions the
//! rendering layer wires up to user input. The grid addresses it back through
//! a [`RowHandle`], a weak reference that can only push flag changes.
//!
//! Lifecycle: `Unregistered -> Registered -> {Idle, Selected, Highlighted,
//! Selected+Highlighted} -> Unregistered` (terminal on drop).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use crate::error::ConfigError;
use crate::grid::GridContext;
use crate::registry::RowId;

/// Custom handler that fully replaces the default registry mutation for the
/// row it is installed on: `(unique_id, new_state, handle)`.
pub type RowOverride = Box<dyn Fn(&str, bool, &RowHandle) + Send + Sync>;

/// Plain click callback, fired after any highlight handling.
pub type ClickCallback = Box<dyn Fn() + Send + Sync>;

/// Construction parameters for a row.
///
/// `selectable`/`highlightable` are three-state: `None` inherits the grid
/// default, `Some(true)` opts in, `Some(false)` opts out even when the grid
/// default is on.
#[derive(Default)]
pub struct RowConfig {
    /// Developer-supplied stable identity; required when the row is
    /// selectable or highlightable.
    pub unique_id: Option<String>,
    pub selectable: Option<bool>,
    pub highlightable: Option<bool>,
    /// Developer-controlled seed: when supplied, overrides whatever the
    /// registry knows about this identity.
    pub selected: Option<bool>,
    pub highlighted: Option<bool>,
    /// Header rows never attach and are exempt from the drag index rule.
    pub header: bool,
    /// Marks this row as the grid's select-all control.
    pub select_all: bool,
    /// Position within a drag-reorder context; required there for non-header
    /// rows.
    pub index: Option<usize>,
    /// Excludes the row from drag participation.
    pub hide_drag: bool,
    pub on_select: Option<RowOverride>,
    pub on_highlight: Option<RowOverride>,
    pub on_click: Option<ClickCallback>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RowFlags {
    pub(crate) selected: bool,
    pub(crate) highlighted: bool,
}

/// The part of a row the grid can reach through a [`RowHandle`].
pub struct RowShared {
    flags: Mutex<RowFlags>,
    dirty: AtomicBool,
}

impl RowShared {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            flags: Mutex::new(RowFlags::default()),
            dirty: AtomicBool::new(false),
        })
    }
}

/// Owning anchor for a detached handle; test-only.
#[cfg(test)]
pub(crate) type RowAnchor = Arc<RowShared>;

/// Non-owning back-reference to a row, held by the registry for imperative
/// re-render. All setters are no-ops once the row is gone.
#[derive(Clone)]
pub struct RowHandle {
    shared: Weak<RowShared>,
}

impl RowHandle {
    pub(crate) fn set_selected(&self, selected: bool) {
        self.update(|flags| flags.selected = selected);
    }

    pub(crate) fn set_highlighted(&self, highlighted: bool) {
        self.update(|flags| flags.highlighted = highlighted);
    }

    /// Adopts registry state wholesale; used by `check_selection`.
    pub(crate) fn sync_flags(&self, selected: bool, highlighted: bool) {
        self.update(|flags| {
            flags.selected = selected;
            flags.highlighted = highlighted;
        });
    }

    pub(crate) fn selected(&self) -> Option<bool> {
        self.flags().map(|flags| flags.selected)
    }

    pub(crate) fn highlighted(&self) -> Option<bool> {
        self.flags().map(|flags| flags.highlighted)
    }

    /// Whether two handles address the same row instance.
    pub(crate) fn same_row(&self, other: &RowHandle) -> bool {
        Weak::ptr_eq(&self.shared, &other.shared)
    }

    fn flags(&self) -> Option<RowFlags> {
        self.shared
            .upgrade()
            .map(|shared| *shared.flags.lock().unwrap())
    }

    fn update(&self, apply: impl FnOnce(&mut RowFlags)) {
        if let Some(shared) = self.shared.upgrade() {
            let mut flags = shared.flags.lock().unwrap();
            let before = *flags;
            apply(&mut flags);
            if *flags != before {
                shared.dirty.store(true, Ordering::Relaxed);
            }
        }
    }

    /// Builds a handle that is not mounted into any grid, for exercising the
    /// registry in isolation.
    #[cfg(test)]
    pub(crate) fn detached() -> (RowAnchor, RowHandle) {
        let shared = RowShared::new();
        let handle = RowHandle {
            shared: Arc::downgrade(&shared),
        };
        (shared, handle)
    }
}

/// Snapshot of the row's visual state.
///
/// `highlighted` is suppressed while `selected` is true; the underlying flags
/// stay independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRenderState {
    pub selected: bool,
    pub highlighted: bool,
    /// A drag is occurring somewhere in this grid.
    pub dragging: bool,
    /// This row is the one currently dragged.
    pub dragged: bool,
}

struct RowInner {
    ctx: GridContext,
    shared: Arc<RowShared>,
    row_id: OnceLock<RowId>,
    unique_id: Mutex<Option<String>>,
    header: bool,
    select_all: bool,
    index: Option<usize>,
    hide_drag: bool,
    highlightable: bool,
    on_select: Option<RowOverride>,
    on_highlight: Option<RowOverride>,
    on_click: Option<ClickCallback>,
}

/// A mounted row. Dropping the row detaches it from the grid.
pub struct Row {
    inner: RowInner,
}

impl std::fmt::Debug for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Row").finish_non_exhaustive()
    }
}

impl Row {
    /// Mounts a row into a grid.
    ///
    /// Fails fast on the two fatal configuration errors: a non-header row in
    /// a drag context without an index, and a selectable or highlightable row
    /// without a unique id. Rows with a unique id (other than headers and the
    /// select-all control) attach to the registry and immediately adopt any
    /// state recorded for their identity; developer-supplied `selected`/
    /// `highlighted` seeds then take precedence.
    pub fn mount(ctx: &GridContext, config: RowConfig) -> Result<Row, ConfigError> {
        if ctx.drag_drop().is_some() && !config.header && config.index.is_none() {
            return Err(ConfigError::MissingDragIndex);
        }

        let selectable = config.selectable != Some(false)
            && (config.selectable == Some(true) || ctx.selectable());
        let highlightable = config.highlightable != Some(false)
            && (config.highlightable == Some(true) || ctx.highlightable());
        if (selectable || highlightable) && config.unique_id.is_none() {
            return Err(ConfigError::MissingUniqueId);
        }

        let row = Row {
            inner: RowInner {
                ctx: ctx.clone(),
                shared: RowShared::new(),
                row_id: OnceLock::new(),
                unique_id: Mutex::new(config.unique_id.clone()),
                header: config.header,
                select_all: config.select_all,
                index: config.index,
                hide_drag: config.hide_drag,
                highlightable,
                on_select: config.on_select,
                on_highlight: config.on_highlight,
                on_click: config.on_click,
            },
        };

        if let Some(unique_id) = config.unique_id {
            if !config.select_all && !config.header {
                let row_id =
                    ctx.attach_to_table(row.handle(), Some(unique_id.clone()), false);
                let _ = row.inner.row_id.set(row_id);
                ctx.check_selection(&unique_id, &row.handle());
            }
        }

        {
            let mut flags = row.inner.shared.flags.lock().unwrap();
            if let Some(selected) = config.selected {
                flags.selected = selected;
            }
            if let Some(highlighted) = config.highlighted {
                flags.highlighted = highlighted;
            }
        }

        Ok(row)
    }

    /// The weak back-reference the grid holds onto.
    pub fn handle(&self) -> RowHandle {
        RowHandle {
            shared: Arc::downgrade(&self.inner.shared),
        }
    }

    pub fn unique_id(&self) -> Option<String> {
        self.inner.unique_id.lock().unwrap().clone()
    }

    pub fn is_header(&self) -> bool {
        self.inner.header
    }

    /// Whether this row acts as the grid's select-all control; rendering
    /// layers use this to wire the checkbox to [`Row::toggle_select_all`].
    pub fn is_select_all(&self) -> bool {
        self.inner.select_all
    }

    pub fn index(&self) -> Option<usize> {
        self.inner.index
    }

    /// Prop update: a changed identity re-checks selection state against the
    /// registry so the row adopts whatever the new identity already has.
    pub fn set_unique_id(&self, unique_id: impl Into<String>) {
        let unique_id = unique_id.into();
        let changed = {
            let mut current = self.inner.unique_id.lock().unwrap();
            if current.as_deref() == Some(unique_id.as_str()) {
                false
            } else {
                *current = Some(unique_id.clone());
                true
            }
        };
        if changed {
            self.inner.ctx.check_selection(&unique_id, &self.handle());
        }
    }

    /// Developer-controlled `selected` prop; authoritative when supplied.
    pub fn set_selected_prop(&self, selected: bool) {
        self.handle().set_selected(selected);
    }

    /// Developer-controlled `highlighted` prop; authoritative when supplied.
    pub fn set_highlighted_prop(&self, highlighted: bool) {
        self.handle().set_highlighted(highlighted);
    }

    /// Row click: the custom highlight override, when present, fully replaces
    /// the registry's default mutation. Any plain click callback fires
    /// afterwards.
    pub fn click(&self) {
        if self.highlightable() {
            let highlighted = self.handle().highlighted().unwrap_or(false);
            if let Some(unique_id) = self.unique_id() {
                match &self.inner.on_highlight {
                    Some(on_highlight) => on_highlight(&unique_id, !highlighted, &self.handle()),
                    None => self.inner.ctx.highlight_row(&unique_id, &self.handle()),
                }
            }
        }
        if let Some(on_click) = &self.inner.on_click {
            on_click();
        }
    }

    /// Selection checkbox toggle: the custom select override, when present,
    /// fully replaces the registry's default mutation.
    pub fn toggle_select(&self) {
        let selected = self.handle().selected().unwrap_or(false);
        if let Some(unique_id) = self.unique_id() {
            match &self.inner.on_select {
                Some(on_select) => on_select(&unique_id, !selected, &self.handle()),
                None => self
                    .inner
                    .ctx
                    .select_row(&unique_id, &self.handle(), !selected),
            }
        }
    }

    /// Select-all toggle, for the header control row.
    pub fn toggle_select_all(&self) {
        self.inner.ctx.select_all(&self.handle());
    }

    /// Starts a drag for this row, when drag participation applies.
    pub fn begin_drag(&self) {
        if self.inner.hide_drag || self.inner.header {
            return;
        }
        if let (Some(drag), Some(index)) = (self.inner.ctx.drag_drop(), self.inner.index) {
            drag.begin_drag(index);
        }
    }

    /// Whether a drop onto this row is currently allowed.
    pub fn can_drop(&self) -> bool {
        if self.inner.hide_drag {
            return false;
        }
        match (self.inner.ctx.drag_drop(), self.inner.index) {
            (Some(drag), Some(index)) => drag.can_drop(index),
            _ => false,
        }
    }

    pub fn render_state(&self) -> RowRenderState {
        let flags = *self.inner.shared.flags.lock().unwrap();
        let active = self
            .inner
            .ctx
            .drag_drop()
            .and_then(|drag| drag.active_index());
        RowRenderState {
            selected: flags.selected,
            highlighted: flags.highlighted && !flags.selected,
            dragging: active.is_some(),
            dragged: active.is_some() && active == self.inner.index,
        }
    }

    /// True once after any flag change; for hosts doing imperative
    /// re-renders of individual rows.
    pub fn take_dirty(&self) -> bool {
        self.inner.shared.dirty.swap(false, Ordering::Relaxed)
    }

    fn highlightable(&self) -> bool {
        self.inner.highlightable
    }
}

impl Drop for Row {
    fn drop(&mut self) {
        if let Some(row_id) = self.inner.row_id.get() {
            self.inner.ctx.detach_from_table(*row_id);
        }
    }
}
