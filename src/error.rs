//! Error taxonomy for the grid core
//!
//! Two families, handled very differently:
//!
//! - [`ConfigError`]: programmer errors surfaced at construction time. These
//!   are never caught internally and are expected to show up during
//!   development and integration testing.
//! - [`SourceError`]: transient fetch failures. The sync engine deliberately
//!   swallows these (debug-logged only) and leaves the last-known-good state
//!   untouched: no retry, no rollback, no user-visible error surface.

use thiserror::Error;

/// Fatal configuration errors raised when mounting a row.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A row that is selectable or highlightable must carry a stable
    /// identity so its state can survive unmount/remount.
    #[error("a row which is selectable or highlightable must provide a unique id")]
    MissingUniqueId,

    /// Non-header rows inside a drag-reorder context need an index.
    #[error("a row inside a drag-and-drop context must provide an index")]
    MissingDragIndex,
}

/// Failures while fetching or decoding a server response.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}
