use crate::error::SyncError;
use crate::events::{SyncEvent, SyncEvents};
use crate::network::{AlwaysOnline, Connectivity};
use crate::store::{apply_in_batches, LocalStore, StoreError, StoreOp};
use crate::tasks::{TaskKind, TaskRegistry};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use showsync_config::{StateStore, SyncOptions};
use showsync_models::{Checkpoint, EntityFamily, Provider};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything a sync run shares: local data, persisted checkpoints,
/// connectivity, cancellation and outbound notifications.
pub struct SyncContext {
    pub store: Arc<dyn LocalStore>,
    pub state: Arc<Mutex<StateStore>>,
    pub connectivity: Arc<dyn Connectivity>,
    pub cancel: CancellationToken,
    pub events: SyncEvents,
    pub tasks: Arc<TaskRegistry>,
    pub options: SyncOptions,
}

impl SyncContext {
    /// Tasks left pending by an earlier run are restored from `state`.
    pub fn new(store: Arc<dyn LocalStore>, state: StateStore, options: SyncOptions) -> Self {
        let tasks = TaskRegistry::new();
        for kind in TaskKind::ALL {
            tasks.schedule(kind, state.pending_task(&kind.to_string()));
        }
        Self {
            store,
            state: Arc::new(Mutex::new(state)),
            connectivity: Arc::new(AlwaysOnline),
            cancel: CancellationToken::new(),
            events: SyncEvents::default(),
            tasks: Arc::new(tasks),
            options,
        }
    }

    pub fn with_connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_events(mut self, events: SyncEvents) -> Self {
        self.events = events;
        self
    }

    pub fn with_tasks(mut self, tasks: Arc<TaskRegistry>) -> Self {
        self.tasks = tasks;
        self
    }

    /// Called at the top of every page and batch loop.
    pub fn check_continue(&self) -> Result<(), SyncError> {
        self.check_interrupted()?;
        if !self.connectivity.is_online() {
            return Err(SyncError::Offline);
        }
        Ok(())
    }

    pub fn check_interrupted(&self) -> Result<(), SyncError> {
        if self.cancel.is_cancelled() {
            return Err(SyncError::Interrupted);
        }
        Ok(())
    }

    /// Write ops in local batches; a failed batch fails the caller.
    pub fn apply(&self, ops: &[StoreOp]) -> Result<(), SyncError> {
        apply_in_batches(self.store.as_ref(), ops, self.options.local_batch_size)?;
        Ok(())
    }

    pub fn notify_changed(&self, family: EntityFamily) {
        self.events.emit(SyncEvent::ContentChanged(family));
    }

    pub fn checkpoint(&self, provider: Provider, family: EntityFamily) -> Checkpoint {
        self.state.lock().checkpoint(provider, family)
    }

    pub fn set_last_sync(
        &self,
        provider: Provider,
        family: EntityFamily,
        at: DateTime<Utc>,
    ) -> Result<(), SyncError> {
        let mut state = self.state.lock();
        state.set_last_sync(provider, family, at);
        save_state(&state)
    }

    pub fn set_merged(&self, provider: Provider, family: EntityFamily) -> Result<(), SyncError> {
        let mut state = self.state.lock();
        state.set_merged(provider, family, true);
        save_state(&state)
    }

    /// Store a completed pass: the new timestamp and, after a merge, the flag.
    pub fn complete(
        &self,
        provider: Provider,
        family: EntityFamily,
        at: DateTime<Utc>,
    ) -> Result<(), SyncError> {
        let mut state = self.state.lock();
        state.set_last_sync(provider, family, at);
        state.set_merged(provider, family, true);
        save_state(&state)
    }

    /// Write the pending tasks to the state so the next process resumes them.
    pub fn persist_tasks(&self) -> Result<(), SyncError> {
        self.update_state(|state| {
            for kind in TaskKind::ALL {
                state.set_pending_task(&kind.to_string(), &self.tasks.pending(kind));
            }
        })
    }

    /// Change the persisted state and save it.
    pub fn update_state<T>(&self, change: impl FnOnce(&mut StateStore) -> T) -> Result<T, SyncError> {
        let mut state = self.state.lock();
        let result = change(&mut state);
        save_state(&state)?;
        Ok(result)
    }
}

fn save_state(state: &StateStore) -> Result<(), SyncError> {
    state
        .save()
        .map_err(|e| SyncError::Store(StoreError::State(e.to_string())))
}
