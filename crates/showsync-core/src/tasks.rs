use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    AddShows,
    AddMovies,
}

impl TaskKind {
    pub const ALL: [TaskKind; 2] = [TaskKind::AddShows, TaskKind::AddMovies];
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::AddShows => f.write_str("add_shows"),
            TaskKind::AddMovies => f.write_str("add_movies"),
        }
    }
}

/// Pending background work, at most one task per kind.
///
/// Scheduling a kind that is already pending merges the ids into the
/// pending task. Whoever runs the work takes the task out.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    pending: Mutex<BTreeMap<TaskKind, BTreeSet<u32>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many of `ids` were not already pending.
    pub fn schedule(&self, kind: TaskKind, ids: impl IntoIterator<Item = u32>) -> usize {
        let mut pending = self.pending.lock();
        let entry = pending.entry(kind).or_default();
        let added = ids.into_iter().filter(|id| entry.insert(*id)).count();
        if entry.is_empty() {
            pending.remove(&kind);
        }
        if added > 0 {
            debug!(task = %kind, added, "Scheduled task items");
        }
        added
    }

    pub fn take(&self, kind: TaskKind) -> Vec<u32> {
        self.pending
            .lock()
            .remove(&kind)
            .map(|ids| ids.into_iter().collect())
            .unwrap_or_default()
    }

    /// Ids of the pending task, left in place.
    pub fn pending(&self, kind: TaskKind) -> Vec<u32> {
        self.pending
            .lock()
            .get(&kind)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_pending(&self, kind: TaskKind) -> bool {
        self.pending.lock().contains_key(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_merges_into_pending_task() {
        let registry = TaskRegistry::new();
        assert_eq!(registry.schedule(TaskKind::AddShows, [3, 1]), 2);
        assert_eq!(registry.schedule(TaskKind::AddShows, [1, 2]), 1);
        assert!(registry.is_pending(TaskKind::AddShows));
        assert!(!registry.is_pending(TaskKind::AddMovies));

        assert_eq!(registry.take(TaskKind::AddShows), vec![1, 2, 3]);
        assert!(!registry.is_pending(TaskKind::AddShows));
        assert!(registry.take(TaskKind::AddShows).is_empty());
    }

    #[test]
    fn test_empty_schedule_leaves_nothing_pending() {
        let registry = TaskRegistry::new();
        assert_eq!(registry.schedule(TaskKind::AddMovies, []), 0);
        assert!(!registry.is_pending(TaskKind::AddMovies));
    }
}
