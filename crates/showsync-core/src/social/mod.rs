mod episodes;
mod movies;
mod notes;
mod ratings;

#[cfg(test)]
mod tests;

pub use episodes::EpisodeSync;
pub use movies::MovieSync;
pub use notes::NotesSync;
pub use ratings::RatingsSync;

use crate::context::SyncContext;
use crate::error::{finish_early, record_stage, StepOutcome, SyncError};
use crate::metadata::{complete_new_movies, MetadataProvider};
use crate::reconcile::remove_unused_movies;
use chrono::{DateTime, Duration, Utc};
use showsync_models::{Checkpoint, EpisodeKey, Provider};
use showsync_remote::social::{LastActivity, SocialIds, SyncEpisode, SyncItems, SyncSeason, SyncShow};
use showsync_remote::{RemoteError, SocialService};
use std::collections::BTreeMap;
use std::future::Future;
use tracing::{debug, info, instrument};

const PROVIDER: Provider = Provider::Social;

/// Await one social download, checking for cancellation and connectivity
/// first.
pub(crate) async fn fetch<T>(
    ctx: &SyncContext,
    what: &str,
    request: impl Future<Output = Result<T, RemoteError>>,
) -> Result<T, SyncError> {
    ctx.check_continue()?;
    debug!(provider = "social", what, "Downloading");
    request.await.map_err(|e| SyncError::from_remote(PROVIDER, e))
}

/// Items changed before this were already applied by an earlier run.
/// `None` until the family has completed once.
pub(crate) fn tolerance_threshold(ctx: &SyncContext, checkpoint: &Checkpoint) -> Option<DateTime<Utc>> {
    checkpoint.last_sync.filter(|_| checkpoint.merged).map(|last| {
        Duration::try_minutes(ctx.options.rating_tolerance_minutes)
            .and_then(|tolerance| last.checked_sub_signed(tolerance))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    })
}

/// Strictly older than the threshold. An item exactly at the threshold is
/// applied again.
pub(crate) fn is_stale(changed_at: DateTime<Utc>, threshold: Option<DateTime<Utc>>) -> bool {
    threshold.is_some_and(|threshold| changed_at < threshold)
}

/// Group episode keys into the nested show/season payload.
pub(crate) fn episode_items(keys: &[EpisodeKey]) -> SyncItems {
    let mut grouped: BTreeMap<u32, BTreeMap<u32, Vec<u32>>> = BTreeMap::new();
    for key in keys {
        grouped
            .entry(key.show_tmdb_id)
            .or_default()
            .entry(key.season)
            .or_default()
            .push(key.number);
    }
    let shows = grouped
        .into_iter()
        .map(|(tmdb_id, seasons)| SyncShow {
            ids: SocialIds::tmdb(tmdb_id),
            seasons: seasons
                .into_iter()
                .map(|(number, episodes)| SyncSeason {
                    number,
                    episodes: episodes
                        .into_iter()
                        .map(|number| SyncEpisode { number, watched_at: None })
                        .collect(),
                })
                .collect(),
        })
        .collect();
    SyncItems { shows, movies: Vec::new() }
}

/// Runs the social stages: episodes, ratings, movies, notes.
///
/// Every stage is gated by the remote activity timestamps, so a run with
/// nothing new only costs the activity request.
pub struct SocialOrchestrator<'a> {
    ctx: &'a SyncContext,
    client: &'a dyn SocialService,
    metadata: &'a dyn MetadataProvider,
}

impl<'a> SocialOrchestrator<'a> {
    pub fn new(
        ctx: &'a SyncContext,
        client: &'a dyn SocialService,
        metadata: &'a dyn MetadataProvider,
    ) -> Self {
        Self { ctx, client, metadata }
    }

    #[instrument(skip(self), fields(provider = "social"))]
    pub async fn sync(&self) -> Result<StepOutcome, SyncError> {
        let mut outcome = StepOutcome::Success;
        match self.run(&mut outcome).await {
            Ok(()) => {
                info!(provider = "social", outcome = %outcome, "Social sync finished");
                Ok(outcome)
            }
            Err(e) => finish_early(outcome, e),
        }
    }

    async fn run(&self, outcome: &mut StepOutcome) -> Result<(), SyncError> {
        let activity = match fetch(self.ctx, "last activity", self.client.last_activity()).await {
            Ok(activity) => activity,
            Err(e) => {
                // Without timestamps no stage can decide what changed.
                record_stage(outcome, PROVIDER, "last activity", Err(e))?;
                return Ok(());
            }
        };
        self.sync_episodes(outcome, &activity).await?;
        self.sync_movies(outcome, &activity).await?;
        let notes = NotesSync::new(self.ctx, self.client);
        record_stage(outcome, PROVIDER, "notes", notes.sync(activity.notes.updated_at).await)?;
        Ok(())
    }

    async fn sync_episodes(&self, outcome: &mut StepOutcome, activity: &LastActivity) -> Result<(), SyncError> {
        let episodes = EpisodeSync::new(self.ctx, self.client);
        record_stage(
            outcome,
            PROVIDER,
            "watched episodes",
            episodes.sync_watched(activity.episodes.watched_at).await,
        )?;
        record_stage(
            outcome,
            PROVIDER,
            "collected episodes",
            episodes.sync_collected(activity.episodes.collected_at).await,
        )?;

        let ratings = RatingsSync::new(self.ctx, self.client);
        record_stage(
            outcome,
            PROVIDER,
            "episode ratings",
            ratings.download_episode_ratings(activity.episodes.rated_at).await,
        )?;
        record_stage(
            outcome,
            PROVIDER,
            "show ratings",
            ratings.download_show_ratings(activity.shows.rated_at).await,
        )?;
        Ok(())
    }

    async fn sync_movies(&self, outcome: &mut StepOutcome, activity: &LastActivity) -> Result<(), SyncError> {
        let movies = MovieSync::new(self.ctx, self.client);
        if record_stage(outcome, PROVIDER, "movies", movies.sync(&activity.movies).await)? {
            let removed = remove_unused_movies(self.ctx).map(|_| ());
            record_stage(outcome, PROVIDER, "remove unused movies", removed)?;
        }
        let added = complete_new_movies(self.ctx, self.metadata).await.map(|_| ());
        record_stage(outcome, PROVIDER, "add new movies", added)?;

        let ratings = RatingsSync::new(self.ctx, self.client);
        record_stage(
            outcome,
            PROVIDER,
            "movie ratings",
            ratings.download_movie_ratings(activity.movies.rated_at).await,
        )?;
        Ok(())
    }
}
