//! Grid controller and context
//!
//! [`GridController`] is the single source of truth for pagination, sort,
//! filter, selection and highlight state. It composes the query serializer,
//! the debounced sync engine and the row registry behind one state mutex,
//! and publishes a [`GridContext`] capability handle that rows receive
//! explicitly at construction (no ambient lookup).
//!
//! Mutation flows one way: user actions call controller/context operations,
//! the registry pushes resulting flag changes into live rows through their
//! weak handles, and rows re-render from their own flags. Host callbacks are
//! always invoked with the state lock released.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;

use crate::dragdrop::DragDrop;
use crate::registry::{RowId, RowRecord, RowRegistry};
use crate::row::RowHandle;
use crate::sync::DEFAULT_DEBOUNCE;
use crate::types::{LayoutEvent, PagerState, QueryOptions, SortOrder, TriggerKind};

/// Host callback receiving the full decoded response body, once per
/// successfully parsed response.
pub type ChangeCallback = Box<dyn Fn(&Value) + Send + Sync>;

/// Host callback receiving the currently selected unique ids after any
/// selection mutation.
pub type SelectionCallback = Box<dyn Fn(&[String]) + Send + Sync>;

/// Host callback receiving `(unique_id, new_state)` after a highlight
/// mutation.
pub type HighlightCallback = Box<dyn Fn(&str, bool) + Send + Sync>;

/// Host callback for layout side effects.
pub type LayoutCallback = Box<dyn Fn(LayoutEvent) + Send + Sync>;

/// Construction parameters for a grid.
pub struct GridConfig {
    pub current_page: Option<String>,
    pub page_size: String,
    pub sort_order: SortOrder,
    pub sorted_column: String,
    pub filter: BTreeMap<String, String>,
    /// Grid-wide default: every row is selectable unless it opts out.
    pub selectable: bool,
    /// Grid-wide default: every row is highlightable unless it opts out.
    pub highlightable: bool,
    /// Injected drag-and-drop collaborator; its presence makes row indexes
    /// mandatory.
    pub drag_drop: Option<Arc<dyn DragDrop>>,
    pub on_change: Option<ChangeCallback>,
    pub on_select: Option<SelectionCallback>,
    pub on_highlight: Option<HighlightCallback>,
    pub on_layout: Option<LayoutCallback>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            current_page: None,
            page_size: "10".to_string(),
            sort_order: SortOrder::None,
            sorted_column: String::new(),
            filter: BTreeMap::new(),
            selectable: false,
            highlightable: false,
            drag_drop: None,
            on_change: None,
            on_select: None,
            on_highlight: None,
            on_layout: None,
        }
    }
}

pub(crate) struct GridCallbacks {
    pub(crate) on_change: Option<ChangeCallback>,
    pub(crate) on_select: Option<SelectionCallback>,
    pub(crate) on_highlight: Option<HighlightCallback>,
    pub(crate) on_layout: Option<LayoutCallback>,
}

/// Canonical grid state, owned exclusively by the controller.
pub(crate) struct GridState {
    pub(crate) options: QueryOptions,
    /// String-typed for pagination UI, mirroring the wire format.
    pub(crate) total_records: String,
    pub(crate) rows: Vec<Value>,
    pub(crate) registry: RowRegistry,
    /// At most one outstanding debounce timer.
    pub(crate) pending: Option<JoinHandle<()>>,
}

pub(crate) struct GridInner {
    pub(crate) source: Arc<dyn crate::source::DataSource>,
    pub(crate) state: Mutex<GridState>,
    pub(crate) selectable: bool,
    pub(crate) highlightable: bool,
    pub(crate) drag_drop: Option<Arc<dyn DragDrop>>,
    pub(crate) callbacks: GridCallbacks,
}

impl GridInner {
    pub(crate) fn notify_selection(&self, ids: &[String]) {
        if let Some(on_select) = &self.callbacks.on_select {
            on_select(ids);
        }
    }

    pub(crate) fn notify_highlight(&self, unique_id: &str, state: bool) {
        if let Some(on_highlight) = &self.callbacks.on_highlight {
            on_highlight(unique_id, state);
        }
    }

    pub(crate) fn sort_by(self: &Arc<Self>, column: &str) {
        let options = {
            let state = self.state.lock().unwrap();
            let mut options = state.options.clone();
            options.sort_order = if options.sorted_column == column {
                options.sort_order.toggled()
            } else {
                SortOrder::Asc
            };
            options.sorted_column = column.to_string();
            options
        };
        self.request_sync(TriggerKind::Sort, options, DEFAULT_DEBOUNCE);
    }
}

/// The composite data-grid controller.
///
/// Mounting issues an immediate zero-debounce sync so the grid is populated
/// without waiting for user input. Must be created within a tokio runtime;
/// syncs are scheduled as tasks on it. Dropping the controller tears the
/// grid down: the pending timer is aborted and the registry cleared.
pub struct GridController {
    inner: Arc<GridInner>,
}

impl GridController {
    pub fn mount(source: Arc<dyn crate::source::DataSource>, config: GridConfig) -> Self {
        let options = QueryOptions {
            current_page: config.current_page.unwrap_or_else(|| "1".to_string()),
            page_size: config.page_size,
            sort_order: config.sort_order,
            sorted_column: config.sorted_column,
            filter: config.filter,
        };
        let inner = Arc::new(GridInner {
            source,
            state: Mutex::new(GridState {
                options: options.clone(),
                total_records: "0".to_string(),
                rows: Vec::new(),
                registry: RowRegistry::new(),
                pending: None,
            }),
            selectable: config.selectable,
            highlightable: config.highlightable,
            drag_drop: config.drag_drop,
            callbacks: GridCallbacks {
                on_change: config.on_change,
                on_select: config.on_select,
                on_highlight: config.on_highlight,
                on_layout: config.on_layout,
            },
        });
        inner.request_sync(TriggerKind::Data, options, Duration::ZERO);
        Self { inner }
    }

    /// The capability handle rows are constructed with.
    pub fn context(&self) -> GridContext {
        GridContext {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Low-level sync entry point; the `set_*` operations below are the
    /// usual callers.
    pub fn request_sync(&self, trigger: TriggerKind, options: QueryOptions, debounce: Duration) {
        self.inner.request_sync(trigger, options, debounce);
    }

    /// Replaces the filter; resets to page 1 and schedules a debounced sync.
    pub fn set_filter(&self, filter: BTreeMap<String, String>) {
        let mut options = self.options();
        options.filter = filter;
        self.inner
            .request_sync(TriggerKind::Filter, options, DEFAULT_DEBOUNCE);
    }

    pub fn set_page(&self, page: impl Into<String>) {
        let mut options = self.options();
        options.current_page = page.into();
        self.inner
            .request_sync(TriggerKind::Page, options, DEFAULT_DEBOUNCE);
    }

    pub fn set_page_size(&self, page_size: impl Into<String>) {
        let mut options = self.options();
        options.page_size = page_size.into();
        self.inner
            .request_sync(TriggerKind::PageSize, options, DEFAULT_DEBOUNCE);
    }

    /// Sort click: the same column toggles direction, a new column starts
    /// ascending.
    pub fn sort_by(&self, column: &str) {
        self.inner.sort_by(column);
    }

    /// Immediate re-fetch with the current options, no debounce.
    pub fn refresh(&self) {
        let options = self.options();
        self.inner
            .request_sync(TriggerKind::Data, options, Duration::ZERO);
    }

    /// Snapshot of the canonical query options.
    pub fn options(&self) -> QueryOptions {
        self.inner.state.lock().unwrap().options.clone()
    }

    pub fn total_records(&self) -> String {
        self.inner.state.lock().unwrap().total_records.clone()
    }

    /// The most recently applied page of row data.
    pub fn rows(&self) -> Vec<Value> {
        self.inner.state.lock().unwrap().rows.clone()
    }

    pub fn pager_state(&self) -> PagerState {
        let state = self.inner.state.lock().unwrap();
        PagerState {
            current_page: state.options.current_page.clone(),
            page_size: state.options.page_size.clone(),
            total_records: state.total_records.clone(),
        }
    }

    pub fn sorted_column(&self) -> String {
        self.inner.state.lock().unwrap().options.sorted_column.clone()
    }

    pub fn sort_order(&self) -> SortOrder {
        self.inner.state.lock().unwrap().options.sort_order
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.inner.state.lock().unwrap().registry.selected_ids()
    }

    pub fn highlighted_id(&self) -> Option<String> {
        self.inner.state.lock().unwrap().registry.highlighted_id()
    }

    /// Number of currently registered rows; diagnostic.
    pub fn registered_rows(&self) -> usize {
        self.inner.state.lock().unwrap().registry.registered()
    }
}

impl Drop for GridController {
    fn drop(&mut self) {
        if let Ok(mut state) = self.inner.state.lock() {
            if let Some(pending) = state.pending.take() {
                pending.abort();
            }
            state.registry.clear();
        }
    }
}

/// Cloneable capability handle consumed by rows.
///
/// Every operation a descendant row may need is explicit here; rows never
/// reach into grid state directly.
#[derive(Clone)]
pub struct GridContext {
    inner: Arc<GridInner>,
}

impl GridContext {
    /// Registers a row and returns its generated id. Rows without a unique
    /// id are ignored by the registry unless `exempt` marks the select-all
    /// control.
    pub fn attach_to_table(
        &self,
        handle: RowHandle,
        unique_id: Option<String>,
        exempt: bool,
    ) -> RowId {
        let mut state = self.inner.state.lock().unwrap();
        let row_id = state.registry.generate_id();
        state.registry.attach(
            row_id,
            RowRecord {
                unique_id,
                selected: false,
                highlighted: false,
                handle,
            },
            exempt,
        );
        row_id
    }

    pub fn detach_from_table(&self, row_id: RowId) {
        self.inner.state.lock().unwrap().registry.detach(row_id);
    }

    /// Adopts any state already recorded for `unique_id` into the row behind
    /// `handle`.
    pub fn check_selection(&self, unique_id: &str, handle: &RowHandle) {
        self.inner
            .state
            .lock()
            .unwrap()
            .registry
            .check_selection(unique_id, handle);
    }

    pub fn select_row(&self, unique_id: &str, handle: &RowHandle, selected: bool) {
        let ids = {
            let mut state = self.inner.state.lock().unwrap();
            state.registry.select_row(unique_id, handle, selected)
        };
        self.inner.notify_selection(&ids);
    }

    pub fn select_all(&self, control: &RowHandle) {
        let ids = {
            let mut state = self.inner.state.lock().unwrap();
            state.registry.select_all(control)
        };
        self.inner.notify_selection(&ids);
    }

    pub fn highlight_row(&self, unique_id: &str, handle: &RowHandle) {
        let state = {
            let mut grid = self.inner.state.lock().unwrap();
            grid.registry.highlight_row(unique_id, handle)
        };
        self.inner.notify_highlight(unique_id, state);
    }

    pub fn on_sort(&self, column: &str) {
        self.inner.sort_by(column);
    }

    pub fn sorted_column(&self) -> String {
        self.inner.state.lock().unwrap().options.sorted_column.clone()
    }

    pub fn sort_order(&self) -> SortOrder {
        self.inner.state.lock().unwrap().options.sort_order
    }

    /// Grid-wide selectable default inherited by rows.
    pub fn selectable(&self) -> bool {
        self.inner.selectable
    }

    /// Grid-wide highlightable default inherited by rows.
    pub fn highlightable(&self) -> bool {
        self.inner.highlightable
    }

    /// The injected drag-and-drop capability, if any.
    pub fn drag_drop(&self) -> Option<Arc<dyn DragDrop>> {
        self.inner.drag_drop.clone()
    }
}
