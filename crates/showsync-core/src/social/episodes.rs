use super::{episode_items, fetch};
use crate::batching::upload_in_batches;
use crate::context::SyncContext;
use crate::error::SyncError;
use crate::reconcile::{normalize_plays, LastWatchedTracker, SyncMode};
use crate::store::StoreOp;
use crate::tasks::TaskKind;
use chrono::{DateTime, Utc};
use showsync_models::{EntityFamily, EpisodeFlag, EpisodeKey, Provider};
use showsync_remote::SocialService;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Remote state of one episode: play count and last watch time when the
/// listing carries them.
#[derive(Debug, Clone, Copy, Default)]
struct RemoteEpisode {
    plays: Option<i32>,
    watched_at: Option<DateTime<Utc>>,
}

type RemoteEpisodes = HashMap<u32, HashMap<(u32, u32), RemoteEpisode>>;

pub struct EpisodeSync<'a> {
    ctx: &'a SyncContext,
    client: &'a dyn SocialService,
}

impl<'a> EpisodeSync<'a> {
    pub fn new(ctx: &'a SyncContext, client: &'a dyn SocialService) -> Self {
        Self { ctx, client }
    }

    /// Reconcile watched episodes. A delta unwatches local episodes the
    /// remote does not list (skipped ones stay skipped); a merge uploads them.
    pub async fn sync_watched(&self, last_activity: Option<DateTime<Utc>>) -> Result<(), SyncError> {
        let family = EntityFamily::EpisodesWatched;
        let checkpoint = self.ctx.checkpoint(Provider::Social, family);
        if !checkpoint.needs_sync(last_activity) {
            debug!(family = %family, "No remote changes");
            return Ok(());
        }
        let mode = SyncMode::from_merged(checkpoint.merged);

        let watched = fetch(self.ctx, "watched shows", self.client.watched_shows()).await?;
        let mut remote: RemoteEpisodes = HashMap::new();
        for show in watched {
            let Some(tmdb_id) = show.show.ids.tmdb else {
                continue;
            };
            let episodes = remote.entry(tmdb_id).or_default();
            for season in show.seasons {
                for episode in season.episodes {
                    episodes.insert(
                        (season.number, episode.number),
                        RemoteEpisode {
                            plays: episode.plays,
                            watched_at: episode.last_watched_at,
                        },
                    );
                }
            }
        }

        let mut ops = Vec::new();
        let mut upload = Vec::new();
        let mut tracker = LastWatchedTracker::new();
        let local_shows = self.schedule_unknown_shows(remote.keys().copied())?;
        for show_tmdb_id in local_shows {
            let remote_episodes = remote.get(&show_tmdb_id);
            for episode in self.ctx.store.episodes_of_show(show_tmdb_id)? {
                let key = episode.key;
                match remote_episodes.and_then(|m| m.get(&(key.season, key.number))) {
                    Some(found) => {
                        tracker.record(show_tmdb_id, found.watched_at);
                        if episode.watched != EpisodeFlag::Watched {
                            ops.push(StoreOp::SetEpisodeWatched {
                                key,
                                flag: EpisodeFlag::Watched,
                                plays: normalize_plays(found.plays),
                            });
                        } else if let Some(plays) = found.plays.filter(|p| *p > 0) {
                            if plays as u32 != episode.plays {
                                ops.push(StoreOp::SetEpisodeWatched {
                                    key,
                                    flag: EpisodeFlag::Watched,
                                    plays: plays as u32,
                                });
                            }
                        }
                    }
                    None if episode.watched == EpisodeFlag::Watched => match mode {
                        SyncMode::Delta => ops.push(StoreOp::SetEpisodeWatched {
                            key,
                            flag: EpisodeFlag::Unwatched,
                            plays: 0,
                        }),
                        SyncMode::Merge => upload.push(key),
                    },
                    None => {}
                }
            }
        }

        let changed = ops.len();
        self.ctx.apply(&ops)?;
        self.ctx.apply(&tracker.into_ops(self.ctx.store.as_ref())?)?;
        if changed > 0 {
            self.ctx.notify_changed(EntityFamily::Episodes);
        }

        if !upload.is_empty() {
            let client = self.client;
            upload_in_batches(
                self.ctx,
                Provider::Social,
                "watched episodes",
                &upload,
                self.ctx.options.episode_batch_size,
                move |batch| async move { client.add_to_history(&episode_items(&batch)).await },
            )
            .await?;
        }
        info!(
            provider = "social",
            operation = "sync_watched_episodes",
            merge = mode.is_merge(),
            updated = changed,
            uploaded = upload.len(),
            "Synced watched episodes"
        );
        self.ctx
            .complete(Provider::Social, family, last_activity.unwrap_or_else(Utc::now))
    }

    /// Reconcile collected episodes, same rules as watched ones.
    pub async fn sync_collected(&self, last_activity: Option<DateTime<Utc>>) -> Result<(), SyncError> {
        let family = EntityFamily::EpisodesCollected;
        let checkpoint = self.ctx.checkpoint(Provider::Social, family);
        if !checkpoint.needs_sync(last_activity) {
            debug!(family = %family, "No remote changes");
            return Ok(());
        }
        let mode = SyncMode::from_merged(checkpoint.merged);

        let collected = fetch(self.ctx, "collected shows", self.client.collected_shows()).await?;
        let mut remote: HashMap<u32, HashSet<(u32, u32)>> = HashMap::new();
        for show in collected {
            let Some(tmdb_id) = show.show.ids.tmdb else {
                continue;
            };
            let episodes = remote.entry(tmdb_id).or_default();
            for season in show.seasons {
                episodes.extend(season.episodes.iter().map(|e| (season.number, e.number)));
            }
        }

        let mut ops = Vec::new();
        let mut upload: Vec<EpisodeKey> = Vec::new();
        let local_shows = self.schedule_unknown_shows(remote.keys().copied())?;
        for show_tmdb_id in local_shows {
            let remote_episodes = remote.get(&show_tmdb_id);
            for episode in self.ctx.store.episodes_of_show(show_tmdb_id)? {
                let key = episode.key;
                let on_remote = remote_episodes.is_some_and(|s| s.contains(&(key.season, key.number)));
                if on_remote && !episode.collected {
                    ops.push(StoreOp::SetEpisodeCollected { key, collected: true });
                } else if !on_remote && episode.collected {
                    match mode {
                        SyncMode::Delta => ops.push(StoreOp::SetEpisodeCollected { key, collected: false }),
                        SyncMode::Merge => upload.push(key),
                    }
                }
            }
        }

        let changed = ops.len();
        self.ctx.apply(&ops)?;
        if changed > 0 {
            self.ctx.notify_changed(EntityFamily::Episodes);
        }
        if !upload.is_empty() {
            let client = self.client;
            upload_in_batches(
                self.ctx,
                Provider::Social,
                "collected episodes",
                &upload,
                self.ctx.options.episode_batch_size,
                move |batch| async move { client.add_to_collection(&episode_items(&batch)).await },
            )
            .await?;
        }
        info!(
            provider = "social",
            operation = "sync_collected_episodes",
            merge = mode.is_merge(),
            updated = changed,
            uploaded = upload.len(),
            "Synced collected episodes"
        );
        self.ctx
            .complete(Provider::Social, family, last_activity.unwrap_or_else(Utc::now))
    }

    /// Queue remote shows that are not local for adding and return the
    /// ids of all local shows.
    fn schedule_unknown_shows(&self, remote: impl Iterator<Item = u32>) -> Result<Vec<u32>, SyncError> {
        let local: Vec<u32> = self.ctx.store.shows()?.into_iter().map(|s| s.tmdb_id).collect();
        let known: HashSet<u32> = local.iter().copied().collect();
        self.ctx
            .tasks
            .schedule(TaskKind::AddShows, remote.filter(|id| !known.contains(id)));
        Ok(local)
    }
}
