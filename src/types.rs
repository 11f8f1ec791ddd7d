// Core state types shared across the grid controller, sync engine and rows
//
// Pagination values are string-typed on purpose: they travel to and from the
// wire unmodified (page numbers arrive from pager widgets as text and leave
// as query parameters), so the controller never round-trips them through
// integers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Sort direction for the currently sorted column.
///
/// `None` means unsorted; the serializer omits the `sord` parameter entirely
/// rather than sending an empty value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    None,
    Asc,
    Desc,
}

impl SortOrder {
    /// Wire value for the `sord` parameter, or `None` when unsorted.
    pub fn as_param(&self) -> Option<&'static str> {
        match self {
            SortOrder::None => None,
            SortOrder::Asc => Some("asc"),
            SortOrder::Desc => Some("desc"),
        }
    }

    /// Flips asc and desc. Flipping an unsorted order starts ascending.
    pub fn toggled(&self) -> SortOrder {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }
}

/// The structured query the grid keeps as canonical pagination state.
///
/// `filter` is an ordered map so serialized output is stable; caller-supplied
/// filter keys pass through to the server untouched. Serde derives let hosts
/// persist and restore grid state alongside their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    pub current_page: String,
    pub page_size: String,
    pub sort_order: SortOrder,
    pub sorted_column: String,
    pub filter: BTreeMap<String, String>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            current_page: "1".to_string(),
            page_size: "10".to_string(),
            sort_order: SortOrder::None,
            sorted_column: String::new(),
            filter: BTreeMap::new(),
        }
    }
}

/// Which state change triggered a sync cycle.
///
/// The serializer only cares about `Filter` (forces page 1); the rest exist
/// for logging and host-side diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    Data,
    Filter,
    Page,
    Sort,
    PageSize,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Data => "data",
            TriggerKind::Filter => "filter",
            TriggerKind::Page => "page",
            TriggerKind::Sort => "sort",
            TriggerKind::PageSize => "page-size",
        }
    }
}

/// A decoded server response.
///
/// `records` is the total count across all pages and is trusted as-is; a
/// missing or malformed count decodes to 0 with no client-side validation.
/// `body` keeps the full payload so the host `on_change` callback receives
/// exactly what the server sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerResponse {
    pub records: u64,
    pub rows: Vec<Value>,
    pub body: Value,
}

impl ServerResponse {
    /// Builds a response from a decoded JSON body of shape
    /// `{ "records": <int>, "data": [<row>, ...], ... }`.
    pub fn from_body(body: Value) -> Self {
        let records = body.get("records").and_then(Value::as_u64).unwrap_or(0);
        let rows = body
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Self {
            records,
            rows,
            body,
        }
    }
}

/// Layout side effects the grid asks its host to perform.
///
/// `Resize` fires after every state-driven re-render; `ResetHeight` fires
/// after a sync settles when the page size shrank, even if the fetch itself
/// failed, since the row count may have changed by other means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutEvent {
    Resize,
    ResetHeight,
}

/// Snapshot of pagination state for a pager widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagerState {
    pub current_page: String,
    pub page_size: String,
    pub total_records: String,
}

/// Compares string-typed page sizes numerically.
///
/// Returns true only when both sides parse and the new size is smaller,
/// mirroring the original's numeric coercion where a non-numeric size never
/// triggers a height reset.
pub(crate) fn page_size_shrank(new: &str, old: &str) -> bool {
    match (new.parse::<u64>(), old.parse::<u64>()) {
        (Ok(new), Ok(old)) => new < old,
        _ => false,
    }
}
