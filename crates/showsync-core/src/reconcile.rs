use crate::context::SyncContext;
use crate::error::SyncError;
use crate::store::{LocalStore, StoreOp};
use chrono::{DateTime, Utc};
use showsync_models::EntityFamily;
use std::collections::HashMap;
use tracing::info;

/// Whether this pass is the first reconciliation with a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Local and remote are combined; flags only ever get set.
    Merge,
    /// Remote is the source of truth for the reconciled fields.
    Delta,
}

impl SyncMode {
    pub fn from_merged(merged: bool) -> Self {
        if merged {
            SyncMode::Delta
        } else {
            SyncMode::Merge
        }
    }

    pub fn is_merge(self) -> bool {
        self == SyncMode::Merge
    }

    /// New value of a boolean flag given both sides.
    pub fn resolve(self, local: bool, remote: bool) -> bool {
        match self {
            SyncMode::Merge => local || remote,
            SyncMode::Delta => remote,
        }
    }
}

/// Play count for an item the remote reports as watched or skipped.
pub fn normalize_plays(plays: Option<i32>) -> u32 {
    match plays {
        Some(plays) if plays >= 1 => plays as u32,
        _ => 1,
    }
}

/// Play count for a local item that is being set to watched (or skipped).
///
/// An item that was not watched takes the (normalized) remote count. An
/// item that already was only takes an explicit positive count.
pub fn watched_plays(locally_watched: bool, local_plays: u32, remote_plays: Option<i32>) -> u32 {
    if !locally_watched {
        return normalize_plays(remote_plays);
    }
    match remote_plays {
        Some(plays) if plays > 0 => plays as u32,
        _ => local_plays.max(1),
    }
}

/// Latest watched-or-skipped time per show seen during a download.
#[derive(Debug, Default)]
pub struct LastWatchedTracker {
    latest: HashMap<u32, DateTime<Utc>>,
}

impl LastWatchedTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, show_tmdb_id: u32, at: Option<DateTime<Utc>>) {
        let Some(at) = at else {
            return;
        };
        self.latest
            .entry(show_tmdb_id)
            .and_modify(|current| {
                if at > *current {
                    *current = at;
                }
            })
            .or_insert(at);
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }

    /// Updates for shows whose stored time is older than the tracked one.
    pub fn into_ops(self, store: &dyn LocalStore) -> Result<Vec<StoreOp>, SyncError> {
        let mut ops = Vec::new();
        for (tmdb_id, at) in self.latest {
            let Some(show) = store.show(tmdb_id)? else {
                continue;
            };
            if show.last_watched_at.map_or(true, |stored| at > stored) {
                ops.push(StoreOp::SetShowLastWatched { tmdb_id, at });
            }
        }
        Ok(ops)
    }
}

/// Delete movies that are in no collection, watchlist or watched state.
pub fn remove_unused_movies(ctx: &SyncContext) -> Result<usize, SyncError> {
    let ops: Vec<StoreOp> = ctx
        .store
        .movies()?
        .into_iter()
        .filter(|m| m.is_unused())
        .map(|m| StoreOp::DeleteMovie(m.tmdb_id))
        .collect();
    ctx.apply(&ops)?;
    if !ops.is_empty() {
        info!(operation = "remove_unused_movies", count = ops.len(), "Removed unused movies");
        ctx.notify_changed(EntityFamily::Movies);
    }
    Ok(ops.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FileStore;
    use chrono::Duration;
    use showsync_models::Show;

    #[test]
    fn test_normalize_plays() {
        assert_eq!(normalize_plays(None), 1);
        assert_eq!(normalize_plays(Some(0)), 1);
        assert_eq!(normalize_plays(Some(-3)), 1);
        assert_eq!(normalize_plays(Some(4)), 4);
    }

    #[test]
    fn test_watched_plays_keeps_existing_count() {
        // Newly watched, remote count missing.
        assert_eq!(watched_plays(false, 0, None), 1);
        // Already watched with three plays, remote count missing.
        assert_eq!(watched_plays(true, 3, None), 3);
        assert_eq!(watched_plays(true, 3, Some(0)), 3);
        assert_eq!(watched_plays(true, 3, Some(5)), 5);
    }

    #[test]
    fn test_merge_never_clears_flags() {
        assert!(SyncMode::Merge.resolve(true, false));
        assert!(SyncMode::Merge.resolve(false, true));
        assert!(!SyncMode::Delta.resolve(true, false));
        assert!(SyncMode::Delta.resolve(false, true));
    }

    #[test]
    fn test_last_watched_never_regresses() {
        let store = FileStore::in_memory();
        let now = Utc::now();
        let mut show = Show::new(1, "A");
        show.last_watched_at = Some(now);
        store
            .apply(&[StoreOp::InsertShow(show), StoreOp::InsertShow(Show::new(2, "B"))])
            .unwrap();

        let mut tracker = LastWatchedTracker::new();
        tracker.record(1, Some(now - Duration::days(2)));
        tracker.record(1, Some(now - Duration::days(1)));
        tracker.record(2, Some(now - Duration::days(3)));
        tracker.record(2, Some(now - Duration::days(5)));
        tracker.record(2, None);
        tracker.record(99, Some(now));

        let ops = tracker.into_ops(&store).unwrap();
        assert_eq!(
            ops,
            vec![StoreOp::SetShowLastWatched { tmdb_id: 2, at: now - Duration::days(3) }]
        );
    }
}
