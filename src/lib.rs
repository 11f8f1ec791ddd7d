// gridsync - data-grid state and server-sync controller
//
// The state core of a server-backed data-table widget, rendering left to the
// host:
//
// - GridController: owns pagination/sort/filter/selection state and hands an
//   explicit GridContext capability handle to descendant rows
// - sync engine: debounces state-change triggers into at most one scheduled
//   fetch, applies responses to the optimistically updated state
// - RowRegistry + Row: rows self-register by generated id; selection and
//   highlight state is keyed by a developer-supplied identity so it survives
//   unmount/remount across page changes
// - DataSource: pluggable fetch capability (HTTP via reqwest, static
//   in-memory, or a host-provided fake)

pub mod dragdrop;
pub mod error;
pub mod grid;
pub mod query;
pub mod registry;
pub mod row;
pub mod source;
mod sync;
pub mod types;

pub use dragdrop::{DragDrop, SharedDragState};
pub use error::{ConfigError, SourceError};
pub use grid::{
    ChangeCallback, GridConfig, GridContext, GridController, HighlightCallback, LayoutCallback,
    SelectionCallback,
};
pub use query::TransportParams;
pub use registry::RowId;
pub use row::{ClickCallback, Row, RowConfig, RowHandle, RowOverride, RowRenderState};
pub use source::{DataSource, HttpDataSource, StaticDataSource};
pub use types::{
    LayoutEvent, PagerState, QueryOptions, ServerResponse, SortOrder, TriggerKind,
};
