//! Optimistic reconciliation of the local matrix against the gateway.
//!
//! Every mutation is applied locally first, pushed as a whole-bay
//! replacement, and then either confirmed by adopting the gateway's matrix
//! or undone by restoring the bay as it was before the call. Gateway calls
//! happen outside the state lock, so writes to different bays overlap.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::domain::{now_utc_rfc3339, Actor, Bay, BayColumn, Cell, Level, Matrix, StackItem};
use crate::error::SyncError;
use crate::gateway::MatrixGateway;
use crate::reorder::{move_to_top, reorder_column};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Re-stack the bay so the saved cell ends up above every other one.
    pub move_to_top: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub loading: bool,
    pub loaded: bool,
    pub syncing: bool,
    pub error: Option<String>,
}

#[derive(Debug)]
struct SyncState {
    matrix: Arc<Matrix>,
    loading: bool,
    loaded: bool,
    in_flight: usize,
    error: Option<String>,
}

/// Owns the client-side matrix. One instance per session, shared by
/// reference with whatever renders or edits it.
#[derive(Debug)]
pub struct Reconciler<G> {
    gateway: G,
    actor: Actor,
    state: Mutex<SyncState>,
}

enum Rollback {
    Bay(BayColumn),
    Full(Arc<Matrix>),
}

impl<G: MatrixGateway> Reconciler<G> {
    pub fn new(gateway: G, actor: Actor) -> Self {
        Self {
            gateway,
            actor,
            state: Mutex::new(SyncState {
                matrix: Arc::new(Matrix::empty()),
                loading: false,
                loaded: false,
                in_flight: 0,
                error: None,
            }),
        }
    }

    #[cfg(test)]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Read-only view of the current matrix, optimistic edits included.
    pub fn matrix(&self) -> Arc<Matrix> {
        Arc::clone(&self.lock().matrix)
    }

    pub fn status(&self) -> SyncStatus {
        let state = self.lock();
        SyncStatus {
            loading: state.loading,
            loaded: state.loaded,
            syncing: state.in_flight > 0,
            error: state.error.clone(),
        }
    }

    #[cfg(test)]
    pub fn clear_error(&self) {
        self.lock().error = None;
    }

    /// First fetch of the session. Does nothing once a load has started,
    /// even if it failed; use [`Reconciler::reload_matrix`] to retry.
    pub fn load_matrix(&self) {
        {
            let state = self.lock();
            if state.loaded || state.loading {
                return;
            }
        }
        self.reload_matrix();
    }

    /// Fetches the full matrix again. A failure is kept as the sticky error
    /// instead of being returned.
    pub fn reload_matrix(&self) {
        {
            let mut state = self.lock();
            if state.loading {
                return;
            }
            state.loading = true;
            state.error = None;
        }

        let outcome = self.gateway.fetch_full_matrix();

        let mut state = self.lock();
        state.loading = false;
        state.loaded = true;
        match outcome {
            Ok(matrix) => {
                tracing::info!(occupied = matrix.occupied_count(), "matrix loaded");
                state.matrix = Arc::new(matrix);
            }
            Err(err) => {
                tracing::warn!(error = %err, "matrix load failed");
                state.error = Some(err.to_string());
            }
        }
    }

    pub fn save_cell(
        &self,
        bay: &str,
        level: &str,
        items: Vec<StackItem>,
        options: SaveOptions,
    ) -> Result<Arc<Matrix>, SyncError> {
        let bay: Bay = bay.parse()?;
        let level: Level = level.parse()?;
        let cell = Cell::new(bay, level, items, self.actor.label(), now_utc_rfc3339());

        self.mutate_bay(bay, "save", move |current| {
            let mut next = current.clone();
            next.set(level, Some(cell));
            if options.move_to_top {
                move_to_top(&next, level)
            } else {
                next
            }
        })
    }

    pub fn clear_cell(&self, bay: &str, level: &str) -> Result<Arc<Matrix>, SyncError> {
        let bay: Bay = bay.parse()?;
        let level: Level = level.parse()?;

        self.mutate_bay(bay, "clear", move |current| {
            let mut next = current.clone();
            next.set(level, None);
            next
        })
    }

    /// `ordered_ids` are cell identities (see [`crate::reorder::cell_identity`])
    /// listed bottom to top.
    pub fn reorder_bay<S: AsRef<str>>(
        &self,
        bay: &str,
        ordered_ids: &[S],
    ) -> Result<Arc<Matrix>, SyncError> {
        let bay: Bay = bay.parse()?;
        self.mutate_bay(bay, "reorder", |current| {
            reorder_column(current, ordered_ids)
        })
    }

    /// Rewrites every bay at once through the full-matrix call.
    pub fn replace_matrix(&self, matrix: Matrix) -> Result<Arc<Matrix>, SyncError> {
        let next = Arc::new(matrix);
        let previous = {
            let mut state = self.lock();
            let previous = std::mem::replace(&mut state.matrix, Arc::clone(&next));
            state.in_flight += 1;
            state.error = None;
            previous
        };
        tracing::debug!(op = "replace", occupied = next.occupied_count(), "optimistic update applied");

        let outcome = self.gateway.replace_matrix(&next);
        self.settle(None, outcome, Rollback::Full(previous))
    }

    fn mutate_bay(
        &self,
        bay: Bay,
        op: &'static str,
        apply: impl FnOnce(&BayColumn) -> BayColumn,
    ) -> Result<Arc<Matrix>, SyncError> {
        let (previous, next_column) = {
            let mut state = self.lock();
            let previous = state.matrix.column(bay).clone();
            let next_column = apply(&previous);
            let mut next = (*state.matrix).clone();
            next.replace_column(next_column.clone());
            state.matrix = Arc::new(next);
            state.in_flight += 1;
            state.error = None;
            (previous, next_column)
        };
        tracing::debug!(%bay, op, occupied = next_column.occupied_count(), "optimistic update applied");

        let outcome = self.gateway.replace_bay(bay, &next_column);
        self.settle(Some(bay), outcome, Rollback::Bay(previous))
    }

    fn settle(
        &self,
        bay: Option<Bay>,
        outcome: Result<Matrix, SyncError>,
        rollback: Rollback,
    ) -> Result<Arc<Matrix>, SyncError> {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        match outcome {
            Ok(authoritative) => {
                tracing::info!(
                    bay = bay.map(Bay::as_str),
                    occupied = authoritative.occupied_count(),
                    "write committed"
                );
                state.matrix = Arc::new(authoritative);
                Ok(Arc::clone(&state.matrix))
            }
            Err(err) => {
                tracing::warn!(bay = bay.map(Bay::as_str), error = %err, "write rolled back");
                state.matrix = match rollback {
                    Rollback::Bay(column) => {
                        let mut restored = (*state.matrix).clone();
                        restored.replace_column(column);
                        Arc::new(restored)
                    }
                    Rollback::Full(previous) => previous,
                };
                state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
