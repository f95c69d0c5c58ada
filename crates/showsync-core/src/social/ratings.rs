use super::{fetch, is_stale, tolerance_threshold};
use crate::context::SyncContext;
use crate::error::SyncError;
use crate::store::StoreOp;
use chrono::{DateTime, Utc};
use showsync_models::{Checkpoint, EntityFamily, EpisodeKey, Provider};
use showsync_remote::SocialService;
use tracing::{debug, info};

/// Downloads ratings. Ratings rated well before the last run were already
/// applied and are skipped; the tolerance absorbs clock skew between the
/// activity timestamp and item timestamps.
pub struct RatingsSync<'a> {
    ctx: &'a SyncContext,
    client: &'a dyn SocialService,
}

impl<'a> RatingsSync<'a> {
    pub fn new(ctx: &'a SyncContext, client: &'a dyn SocialService) -> Self {
        Self { ctx, client }
    }

    /// Ratings older than this are skipped. `None` on the first run, which
    /// replaces all local ratings.
    pub fn threshold(&self, checkpoint: &Checkpoint) -> Option<DateTime<Utc>> {
        tolerance_threshold(self.ctx, checkpoint)
    }

    pub async fn download_episode_ratings(&self, last_activity: Option<DateTime<Utc>>) -> Result<(), SyncError> {
        let family = EntityFamily::EpisodeRatings;
        let Some(threshold) = self.start(family, last_activity) else {
            return Ok(());
        };
        let ratings = fetch(self.ctx, "episode ratings", self.client.episode_ratings()).await?;
        let mut ops = Vec::new();
        if threshold.is_none() {
            ops.push(StoreOp::ClearEpisodeRatings);
        }
        for rated in ratings {
            if is_stale(rated.rated_at, threshold) {
                continue;
            }
            let Some(show_tmdb_id) = rated.show.ids.tmdb else {
                continue;
            };
            ops.push(StoreOp::SetEpisodeRating {
                key: EpisodeKey::new(show_tmdb_id, rated.episode.season, rated.episode.number),
                rating: valid_rating(rated.rating),
            });
        }
        self.finish(family, EntityFamily::Episodes, ops, last_activity)
    }

    pub async fn download_show_ratings(&self, last_activity: Option<DateTime<Utc>>) -> Result<(), SyncError> {
        let family = EntityFamily::ShowRatings;
        let Some(threshold) = self.start(family, last_activity) else {
            return Ok(());
        };
        let ratings = fetch(self.ctx, "show ratings", self.client.show_ratings()).await?;
        let mut ops = Vec::new();
        if threshold.is_none() {
            ops.push(StoreOp::ClearShowRatings);
        }
        for rated in ratings {
            if is_stale(rated.rated_at, threshold) {
                continue;
            }
            let Some(tmdb_id) = rated.show.ids.tmdb else {
                continue;
            };
            ops.push(StoreOp::SetShowRating {
                tmdb_id,
                rating: valid_rating(rated.rating),
            });
        }
        self.finish(family, EntityFamily::Shows, ops, last_activity)
    }

    pub async fn download_movie_ratings(&self, last_activity: Option<DateTime<Utc>>) -> Result<(), SyncError> {
        let family = EntityFamily::MovieRatings;
        let Some(threshold) = self.start(family, last_activity) else {
            return Ok(());
        };
        let ratings = fetch(self.ctx, "movie ratings", self.client.movie_ratings()).await?;
        let mut ops = Vec::new();
        if threshold.is_none() {
            ops.push(StoreOp::ClearMovieRatings);
        }
        for rated in ratings {
            if is_stale(rated.rated_at, threshold) {
                continue;
            }
            let Some(tmdb_id) = rated.movie.ids.tmdb else {
                continue;
            };
            ops.push(StoreOp::SetMovieRating {
                tmdb_id,
                rating: valid_rating(rated.rating),
            });
        }
        self.finish(family, EntityFamily::Movies, ops, last_activity)
    }

    /// `None` when there is nothing new, otherwise the skip threshold.
    fn start(&self, family: EntityFamily, last_activity: Option<DateTime<Utc>>) -> Option<Option<DateTime<Utc>>> {
        let checkpoint = self.ctx.checkpoint(Provider::Social, family);
        if !checkpoint.needs_sync(last_activity) {
            debug!(family = %family, "No remote changes");
            return None;
        }
        Some(self.threshold(&checkpoint))
    }

    fn finish(
        &self,
        family: EntityFamily,
        changed_family: EntityFamily,
        ops: Vec<StoreOp>,
        last_activity: Option<DateTime<Utc>>,
    ) -> Result<(), SyncError> {
        self.ctx.apply(&ops)?;
        if !ops.is_empty() {
            self.ctx.notify_changed(changed_family);
        }
        info!(provider = "social", family = %family, applied = ops.len(), "Downloaded ratings");
        self.ctx
            .complete(Provider::Social, family, last_activity.unwrap_or_else(Utc::now))
    }
}

fn valid_rating(rating: u8) -> Option<u8> {
    (1..=10).contains(&rating).then_some(rating)
}
