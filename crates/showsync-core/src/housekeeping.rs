use crate::context::SyncContext;
use crate::error::SyncError;
use crate::events::SyncEvent;
use crate::store::StoreOp;
use chrono::{DateTime, Utc};
use showsync_models::{EntityFamily, Episode, EpisodeFlag};
use tracing::info;

/// Next episode to watch and number of aired, unwatched episodes.
///
/// Specials (season 0) are ignored. The next episode is the first
/// unwatched one after the latest watched or skipped episode.
pub fn next_episode(episodes: &[Episode], now: DateTime<Utc>) -> (Option<(u32, u32)>, u32) {
    let mut regular: Vec<&Episode> = episodes.iter().filter(|e| e.key.season > 0).collect();
    regular.sort_by_key(|e| e.key);

    let last_handled = regular
        .iter()
        .rposition(|e| e.watched.is_watched_or_skipped());
    let start = last_handled.map_or(0, |i| i + 1);
    let next = regular[start..]
        .iter()
        .find(|e| e.watched == EpisodeFlag::Unwatched)
        .map(|e| (e.key.season, e.key.number));

    let unwatched = regular
        .iter()
        .filter(|e| e.watched == EpisodeFlag::Unwatched)
        .filter(|e| e.first_aired.is_some_and(|aired| aired <= now))
        .count() as u32;
    (next, unwatched)
}

/// Recompute derived show fields and tell subscribers to rebuild the
/// search index. Returns how many shows changed.
pub fn run(ctx: &SyncContext) -> Result<usize, SyncError> {
    let now = Utc::now();
    let mut ops = Vec::new();
    for show in ctx.store.shows()? {
        ctx.check_interrupted()?;
        let episodes = ctx.store.episodes_of_show(show.tmdb_id)?;
        let (next, unwatched_count) = next_episode(&episodes, now);
        if next != show.next_episode || unwatched_count != show.unwatched_count {
            ops.push(StoreOp::SetShowNextEpisode {
                tmdb_id: show.tmdb_id,
                next,
                unwatched_count,
            });
        }
    }
    let changed = ops.len();
    ctx.apply(&ops)?;
    if changed > 0 {
        info!(operation = "housekeeping", shows = changed, "Updated next episodes");
        ctx.notify_changed(EntityFamily::Shows);
    }
    ctx.events.emit(SyncEvent::SearchIndexInvalidated);
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;
    use crate::testing::test_context;
    use chrono::Duration;
    use showsync_models::{EpisodeKey, Show};

    fn aired(season: u32, number: u32, flag: EpisodeFlag) -> Episode {
        let mut episode = Episode::new(EpisodeKey::new(1, season, number)).with_watched(flag, 0);
        episode.first_aired = Some(Utc::now() - Duration::days(30));
        episode
    }

    #[test]
    fn test_next_after_last_handled() {
        let episodes = vec![
            aired(1, 1, EpisodeFlag::Watched),
            aired(1, 2, EpisodeFlag::Unwatched),
            aired(1, 3, EpisodeFlag::Skipped),
            aired(2, 1, EpisodeFlag::Unwatched),
            aired(0, 1, EpisodeFlag::Unwatched),
        ];
        let (next, unwatched) = next_episode(&episodes, Utc::now());
        assert_eq!(next, Some((2, 1)));
        assert_eq!(unwatched, 2);
    }

    #[test]
    fn test_unaired_not_counted() {
        let mut future = aired(1, 2, EpisodeFlag::Unwatched);
        future.first_aired = Some(Utc::now() + Duration::days(3));
        let episodes = vec![aired(1, 1, EpisodeFlag::Unwatched), future];
        let (next, unwatched) = next_episode(&episodes, Utc::now());
        assert_eq!(next, Some((1, 1)));
        assert_eq!(unwatched, 1);
    }

    #[test]
    fn test_all_watched_has_no_next() {
        let episodes = vec![aired(1, 1, EpisodeFlag::Watched)];
        assert_eq!(next_episode(&episodes, Utc::now()), (None, 0));
    }

    #[tokio::test]
    async fn test_run_updates_shows_and_invalidates_index() {
        let ctx = test_context();
        ctx.store
            .apply(&[
                StoreOp::InsertShow(Show::new(1, "A")),
                StoreOp::UpsertEpisodeInfo(aired(1, 1, EpisodeFlag::Unwatched)),
            ])
            .unwrap();
        let mut rx = ctx.events.subscribe();

        assert_eq!(run(&ctx).unwrap(), 1);
        let show = ctx.store.show(1).unwrap().unwrap();
        assert_eq!(show.next_episode, Some((1, 1)));
        assert_eq!(show.unwatched_count, 1);

        assert_eq!(rx.recv().await.unwrap(), SyncEvent::ContentChanged(EntityFamily::Shows));
        assert_eq!(rx.recv().await.unwrap(), SyncEvent::SearchIndexInvalidated);

        // Nothing changed the second time.
        assert_eq!(run(&ctx).unwrap(), 0);
    }
}
