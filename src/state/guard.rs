//! Scoped ownership of a crawl snapshot
//!
//! A `StateGuard` owns the in-memory state for the lifetime of a crawl task.
//! Whatever way the task ends (completion, error, panic, or the task future
//! being dropped on cancellation) the state accumulated so far is written
//! exactly once.

use crate::state::store::{Snapshot, StateStore};
use crate::StateError;

/// Owns a snapshot and persists it on every exit path
pub struct StateGuard<T: Snapshot> {
    state: Option<T>,
    store: StateStore,
}

impl<T: Snapshot> StateGuard<T> {
    /// Loads the snapshot from `store` and takes ownership of it
    ///
    /// Fails if a snapshot exists but is unreadable; nothing is fetched in
    /// that case.
    pub fn load(store: StateStore) -> Result<Self, StateError> {
        let state = store.load()?;
        Ok(Self::new(state, store))
    }

    /// Wraps an already loaded state
    pub fn new(state: T, store: StateStore) -> Self {
        Self {
            state: Some(state),
            store,
        }
    }

    /// Shared access to the state
    pub fn state(&self) -> &T {
        self.state
            .as_ref()
            .unwrap_or_else(|| unreachable!("state is only taken by commit"))
    }

    /// Mutable access to the state
    pub fn state_mut(&mut self) -> &mut T {
        self.state
            .as_mut()
            .unwrap_or_else(|| unreachable!("state is only taken by commit"))
    }

    /// Saves the state now and hands it back
    ///
    /// The finalizer does not run again after a commit, even if saving failed:
    /// the error is returned to the caller instead.
    pub fn commit(mut self) -> Result<T, StateError> {
        let mut state = self
            .state
            .take()
            .unwrap_or_else(|| unreachable!("commit consumes the guard"));
        self.store.save(&mut state)?;
        Ok(state)
    }
}

impl<T: Snapshot> Drop for StateGuard<T> {
    fn drop(&mut self) {
        if let Some(mut state) = self.state.take() {
            tracing::warn!(
                "Crawl ended without a clean shutdown, saving state to {}",
                self.store.path().display()
            );
            if let Err(e) = self.store.save(&mut state) {
                tracing::error!(
                    "Failed to save crawl state, already seen items will be fetched again next run: {}",
                    e
                );
            }
        }
    }
}
