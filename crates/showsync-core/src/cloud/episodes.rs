use crate::batching::upload_in_batches;
use crate::context::SyncContext;
use crate::error::SyncError;
use crate::paging::for_each_page;
use crate::reconcile::{normalize_plays, watched_plays, LastWatchedTracker, SyncMode};
use crate::store::StoreOp;
use chrono::Utc;
use showsync_models::{EntityFamily, Episode, EpisodeFlag, EpisodeKey, Provider};
use showsync_remote::cloud::{CloudEpisode, EpisodeBatch, EpisodeQuery};
use showsync_remote::CloudService;
use std::collections::HashMap;
use tracing::{debug, info};

/// Local episodes of one show keyed by (season, number); `None` when the
/// show is not in the local store.
type ShowEpisodes = Option<HashMap<(u32, u32), Episode>>;

pub struct EpisodeSync<'a> {
    ctx: &'a SyncContext,
    client: &'a dyn CloudService,
}

impl<'a> EpisodeSync<'a> {
    pub fn new(ctx: &'a SyncContext, client: &'a dyn CloudService) -> Self {
        Self { ctx, client }
    }

    /// First reconciliation of one show: pull remote flags without clearing
    /// any local one, then push the local flags. The show is marked merged
    /// only if both directions succeeded.
    pub async fn merge_show(&self, show_tmdb_id: u32) -> Result<(), SyncError> {
        let query = EpisodeQuery {
            show_tmdb_id: Some(show_tmdb_id),
            updated_since: None,
        };
        self.download(query, SyncMode::Merge).await?;
        self.upload_show(show_tmdb_id).await?;
        self.ctx.apply(&[StoreOp::SetShowCloudMerged {
            tmdb_id: show_tmdb_id,
            merged: true,
        }])?;
        debug!(show = show_tmdb_id, "Merged episodes with cloud");
        Ok(())
    }

    /// Download episodes changed since the last run and overwrite local flags.
    ///
    /// Without a previous run there is nothing to catch up on: shows are
    /// merged one by one instead, so only the start time is recorded.
    pub async fn download_changes(&self) -> Result<(), SyncError> {
        let checkpoint = self.ctx.checkpoint(Provider::Cloud, EntityFamily::Episodes);
        let started = Utc::now();
        if let Some(since) = checkpoint.last_sync {
            let query = EpisodeQuery {
                show_tmdb_id: None,
                updated_since: Some(since),
            };
            self.download(query, SyncMode::Delta).await?;
        }
        self.ctx
            .set_last_sync(Provider::Cloud, EntityFamily::Episodes, started)
    }

    async fn download(&self, query: EpisodeQuery, mode: SyncMode) -> Result<usize, SyncError> {
        let client = self.client;
        let mut local: HashMap<u32, ShowEpisodes> = HashMap::new();
        let mut tracker = LastWatchedTracker::new();
        let mut changed = 0;

        let total = for_each_page(
            self.ctx,
            Provider::Cloud,
            "episodes",
            move |cursor| async move { client.episodes(query, cursor.as_deref()).await },
            |page| {
                let mut ops = Vec::new();
                for remote in page {
                    let Some(show_tmdb_id) = remote.show_tmdb_id.or(query.show_tmdb_id) else {
                        continue;
                    };
                    if !local.contains_key(&show_tmdb_id) {
                        let loaded = self.load_show(show_tmdb_id)?;
                        local.insert(show_tmdb_id, loaded);
                    }
                    let Some(Some(episodes)) = local.get(&show_tmdb_id) else {
                        continue;
                    };
                    let Some(episode) = episodes.get(&(remote.season_number, remote.episode_number)) else {
                        continue;
                    };
                    let flag = remote.watched_flag.and_then(EpisodeFlag::from_code);
                    if flag.is_some_and(EpisodeFlag::is_watched_or_skipped) {
                        tracker.record(show_tmdb_id, remote.updated_at);
                    }
                    ops.extend(reconcile_episode(episode, &remote, mode));
                }
                changed += ops.len();
                self.ctx.apply(&ops)
            },
        )
        .await?;

        let last_watched = tracker.into_ops(self.ctx.store.as_ref())?;
        self.ctx.apply(&last_watched)?;
        if changed > 0 {
            self.ctx.notify_changed(EntityFamily::Episodes);
        }
        info!(
            provider = "cloud",
            operation = "download_episodes",
            merge = mode.is_merge(),
            received = total,
            updated = changed,
            "Downloaded episodes"
        );
        Ok(total)
    }

    fn load_show(&self, show_tmdb_id: u32) -> Result<ShowEpisodes, SyncError> {
        if self.ctx.store.show(show_tmdb_id)?.is_none() {
            return Ok(None);
        }
        let episodes = self.ctx.store.episodes_of_show(show_tmdb_id)?;
        Ok(Some(
            episodes
                .into_iter()
                .map(|e| ((e.key.season, e.key.number), e))
                .collect(),
        ))
    }

    async fn upload_show(&self, show_tmdb_id: u32) -> Result<(), SyncError> {
        let episodes: Vec<CloudEpisode> = self
            .ctx
            .store
            .episodes_of_show(show_tmdb_id)?
            .into_iter()
            .filter(|e| e.watched != EpisodeFlag::Unwatched || e.collected)
            .map(to_cloud_episode)
            .collect();
        if episodes.is_empty() {
            return Ok(());
        }
        let client = self.client;
        upload_in_batches(
            self.ctx,
            Provider::Cloud,
            "episodes",
            &episodes,
            self.ctx.options.episode_batch_size,
            move |batch| async move {
                let batch = EpisodeBatch {
                    show_tmdb_id,
                    episodes: batch,
                };
                client.save_episodes(&batch).await
            },
        )
        .await?;
        Ok(())
    }
}

fn to_cloud_episode(episode: Episode) -> CloudEpisode {
    CloudEpisode {
        show_tmdb_id: Some(episode.key.show_tmdb_id),
        season_number: episode.key.season,
        episode_number: episode.key.number,
        watched_flag: Some(episode.watched.code()),
        plays: Some(episode.plays as i32),
        is_in_collection: Some(episode.collected),
        updated_at: None,
    }
}

fn reconcile_episode(local: &Episode, remote: &CloudEpisode, mode: SyncMode) -> Vec<StoreOp> {
    let key: EpisodeKey = local.key;
    let mut ops = Vec::new();

    if let Some(flag) = remote.watched_flag.and_then(EpisodeFlag::from_code) {
        let target = match mode {
            SyncMode::Merge => merge_watched(local, flag, remote.plays),
            SyncMode::Delta => Some(delta_watched(local, flag, remote.plays)),
        };
        if let Some((flag, plays)) = target {
            if flag != local.watched || plays != local.plays {
                ops.push(StoreOp::SetEpisodeWatched { key, flag, plays });
            }
        }
    }

    if let Some(collected) = remote.is_in_collection {
        let collected = mode.resolve(local.collected, collected);
        if collected != local.collected {
            ops.push(StoreOp::SetEpisodeCollected { key, collected });
        }
    }
    ops
}

/// Merge only moves an episode toward watched, or raises a play count.
fn merge_watched(local: &Episode, flag: EpisodeFlag, remote_plays: Option<i32>) -> Option<(EpisodeFlag, u32)> {
    match (local.watched, flag) {
        (EpisodeFlag::Unwatched, EpisodeFlag::Watched | EpisodeFlag::Skipped)
        | (EpisodeFlag::Skipped, EpisodeFlag::Watched) => Some((flag, normalize_plays(remote_plays))),
        (EpisodeFlag::Watched, EpisodeFlag::Watched) => {
            let remote = remote_plays.filter(|p| *p > 0).map_or(0, |p| p as u32);
            Some((flag, local.plays.max(remote)))
        }
        _ => None,
    }
}

fn delta_watched(local: &Episode, flag: EpisodeFlag, remote_plays: Option<i32>) -> (EpisodeFlag, u32) {
    match flag {
        EpisodeFlag::Watched | EpisodeFlag::Skipped => (
            flag,
            watched_plays(local.watched == flag, local.plays, remote_plays),
        ),
        EpisodeFlag::Unwatched => (flag, 0),
    }
}
