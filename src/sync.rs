//! Debounced server synchronization
//!
//! Converts "state changed, need fresh data" into at most one in-flight
//! request per grid, coalescing rapid triggers: each new trigger aborts the
//! pending debounce timer and schedules its own (last trigger wins). Once a
//! window elapses the fetch is committed on a detached task and can no
//! longer be cancelled. Responses are applied unconditionally with no
//! sequence guard, so a slow early response arriving after a faster later
//! one clobbers the newer state. That last-response-applied behavior is
//! intentional and pinned by tests; see DESIGN.md.
//!
//! Failures are fire-and-forget: the grid stays on its last-known-good data
//! with no retry, rollback or surfaced error.

use std::sync::Arc;
use std::time::Duration;

use crate::grid::GridInner;
use crate::query;
use crate::types::{page_size_shrank, LayoutEvent, QueryOptions, ServerResponse, TriggerKind};

/// Debounce window for user-action triggers; mount and refresh use zero.
pub(crate) const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

impl GridInner {
    /// Schedules a sync cycle for a state change.
    ///
    /// Canonical pagination state is updated optimistically before the
    /// network confirms it, and any armed select-all control is disarmed,
    /// since a re-fetch may change the visible row set.
    pub(crate) fn request_sync(
        self: &Arc<Self>,
        trigger: TriggerKind,
        mut options: QueryOptions,
        debounce: Duration,
    ) {
        tracing::debug!(
            trigger = trigger.as_str(),
            debounce_ms = debounce.as_millis() as u64,
            "scheduling grid sync"
        );

        let reset_height = {
            let mut state = self.state.lock().unwrap();
            state.registry.disarm_select_all();

            let reset_height = page_size_shrank(&options.page_size, &state.options.page_size);
            if trigger == TriggerKind::Filter {
                options.current_page = "1".to_string();
            }
            state.options = options;

            let weak = Arc::downgrade(self);
            let source = Arc::clone(&self.source);
            let timer = tokio::spawn(async move {
                tokio::time::sleep(debounce).await;

                let params = {
                    let Some(grid) = weak.upgrade() else {
                        return;
                    };
                    let state = grid.state.lock().unwrap();
                    query::serialize(trigger, &state.options)
                };
                tracing::debug!(
                    trigger = trigger.as_str(),
                    query = %query::query_string(&params),
                    "issuing grid sync"
                );

                // The window has elapsed: commit the fetch on a detached
                // task. A later trigger can abort pending timers but never
                // an in-flight request; its response will still be applied
                // when it arrives.
                tokio::spawn(async move {
                    let result = source.fetch(params).await;
                    let Some(grid) = weak.upgrade() else {
                        return;
                    };
                    match result {
                        Ok(response) => grid.apply_response(response),
                        Err(err) => {
                            // deliberate fire-and-forget: no retry, no rollback
                            tracing::debug!(error = %err, "grid sync failed, keeping last known data");
                        }
                    }
                    // runs even for failed fetches; the row count may have
                    // changed by other means
                    if reset_height {
                        grid.emit_layout(LayoutEvent::ResetHeight);
                    }
                });
            });

            // Abort-and-replace in one critical section: a host callback
            // below may reentrantly schedule another sync, and it must find
            // this timer in `pending` so it can cancel it. Last trigger
            // wins; at most one timer stays alive.
            if let Some(previous) = state.pending.replace(timer) {
                previous.abort();
            }
            reset_height
        };

        // the optimistic update is a state-driven re-render of its own
        self.emit_layout(LayoutEvent::Resize);
    }

    /// Merges a response into canonical state and notifies the host.
    pub(crate) fn apply_response(&self, response: ServerResponse) {
        let records = response.records;
        let body = {
            let mut state = self.state.lock().unwrap();
            state.total_records = records.to_string();
            state.rows = response.rows;
            response.body
        };
        tracing::debug!(records, "applied grid sync response");

        self.emit_layout(LayoutEvent::Resize);
        if let Some(on_change) = &self.callbacks.on_change {
            on_change(&body);
        }
    }

    pub(crate) fn emit_layout(&self, event: LayoutEvent) {
        if let Some(on_layout) = &self.callbacks.on_layout {
            on_layout(event);
        }
    }
}
