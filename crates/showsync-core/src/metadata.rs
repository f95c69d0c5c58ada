use crate::context::SyncContext;
use crate::error::SyncError;
use crate::store::StoreOp;
use crate::tasks::TaskKind;
use async_trait::async_trait;
use showsync_models::{EntityFamily, Episode, Movie, Show};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct ShowDetails {
    pub show: Show,
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShowRefresh {
    Updated(ShowDetails),
    /// The metadata source no longer knows this show.
    Removed,
}

/// Source of show and movie metadata (titles, episode lists, air dates).
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn refresh_configuration(&self) -> Result<(), SyncError>;
    async fn refresh_show(&self, tmdb_id: u32) -> Result<ShowRefresh, SyncError>;
    async fn fetch_show(&self, tmdb_id: u32) -> Result<Option<ShowDetails>, SyncError>;
    async fn fetch_movie(&self, tmdb_id: u32) -> Result<Option<Movie>, SyncError>;
}

/// Add shows that exist remotely but not locally, with their episodes.
/// Returns how many shows were added.
///
/// Ids that could not be added go back into the `AddShows` task. Going
/// offline, an interrupt or a lost authorization stop the loop and keep
/// every remaining id; any other failure keeps only that id, and the first
/// such error is returned once the rest were tried.
pub async fn add_shows(
    ctx: &SyncContext,
    metadata: &dyn MetadataProvider,
    ids: &[u32],
) -> Result<usize, SyncError> {
    let mut added = 0;
    let mut failed = None;
    for (index, &tmdb_id) in ids.iter().enumerate() {
        match add_show(ctx, metadata, tmdb_id).await {
            Ok(true) => added += 1,
            Ok(false) => {}
            Err(e) if stops_task(&e) => {
                ctx.tasks.schedule(TaskKind::AddShows, ids[index..].iter().copied());
                notify_added_shows(ctx, added);
                return Err(e);
            }
            Err(e) => {
                warn!(tmdb_id, error = %e, "Failed to add show, keeping it for the next run");
                ctx.tasks.schedule(TaskKind::AddShows, [tmdb_id]);
                failed.get_or_insert(e);
            }
        }
    }
    notify_added_shows(ctx, added);
    failed.map_or(Ok(added), Err)
}

async fn add_show(ctx: &SyncContext, metadata: &dyn MetadataProvider, tmdb_id: u32) -> Result<bool, SyncError> {
    ctx.check_interrupted()?;
    if ctx.store.show(tmdb_id)?.is_some() {
        return Ok(false);
    }
    let Some(details) = metadata.fetch_show(tmdb_id).await? else {
        warn!(tmdb_id, "No metadata for show, not adding");
        return Ok(false);
    };
    let mut ops = vec![StoreOp::InsertShow(details.show)];
    ops.extend(details.episodes.into_iter().map(StoreOp::UpsertEpisodeInfo));
    ctx.apply(&ops)?;
    Ok(true)
}

fn notify_added_shows(ctx: &SyncContext, added: usize) {
    if added > 0 {
        info!(operation = "add_shows", count = added, "Added shows");
        ctx.notify_changed(EntityFamily::Shows);
        ctx.notify_changed(EntityFamily::Episodes);
    }
}

/// Fill in metadata for movies that were created from remote state only.
///
/// Runs the pending `AddMovies` task. The rows already exist with their
/// flags; only the title is taken from the metadata source. Failed ids are
/// rescheduled the same way `add_shows` does it.
pub(crate) async fn complete_new_movies(
    ctx: &SyncContext,
    metadata: &dyn MetadataProvider,
) -> Result<usize, SyncError> {
    let ids = ctx.tasks.take(TaskKind::AddMovies);
    let mut completed = 0;
    let mut failed = None;
    for (index, &tmdb_id) in ids.iter().enumerate() {
        match complete_movie(ctx, metadata, tmdb_id).await {
            Ok(true) => completed += 1,
            Ok(false) => {}
            Err(e) if stops_task(&e) => {
                ctx.tasks.schedule(TaskKind::AddMovies, ids[index..].iter().copied());
                notify_completed_movies(ctx, completed);
                return Err(e);
            }
            Err(e) => {
                warn!(tmdb_id, error = %e, "Failed to load movie metadata, keeping it for the next run");
                ctx.tasks.schedule(TaskKind::AddMovies, [tmdb_id]);
                failed.get_or_insert(e);
            }
        }
    }
    notify_completed_movies(ctx, completed);
    failed.map_or(Ok(completed), Err)
}

async fn complete_movie(ctx: &SyncContext, metadata: &dyn MetadataProvider, tmdb_id: u32) -> Result<bool, SyncError> {
    ctx.check_interrupted()?;
    let Some(stored) = ctx.store.movie(tmdb_id)? else {
        return Ok(false);
    };
    let Some(found) = metadata.fetch_movie(tmdb_id).await? else {
        debug!(tmdb_id, "No metadata for movie");
        return Ok(false);
    };
    ctx.apply(&[StoreOp::UpsertMovie(Movie { title: found.title, ..stored })])?;
    Ok(true)
}

fn notify_completed_movies(ctx: &SyncContext, completed: usize) {
    if completed > 0 {
        ctx.notify_changed(EntityFamily::Movies);
    }
}

fn stops_task(error: &SyncError) -> bool {
    error.must_propagate() || matches!(error, SyncError::Offline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_context, FakeMetadata};

    fn seed_movie(ctx: &SyncContext, tmdb_id: u32) {
        let mut movie = Movie::new(tmdb_id, "");
        movie.in_collection = true;
        ctx.store.apply(&[StoreOp::UpsertMovie(movie)]).unwrap();
        ctx.tasks.schedule(TaskKind::AddMovies, [tmdb_id]);
    }

    #[tokio::test]
    async fn test_offline_keeps_movies_pending() {
        let ctx = test_context();
        seed_movie(&ctx, 7);
        seed_movie(&ctx, 8);
        let metadata = FakeMetadata { offline: true, ..FakeMetadata::new() };

        let result = complete_new_movies(&ctx, &metadata).await;

        assert!(matches!(result, Err(SyncError::Offline)));
        assert_eq!(ctx.tasks.take(TaskKind::AddMovies), vec![7, 8]);
        assert_eq!(ctx.store.movie(7).unwrap().unwrap().title, "");
    }

    #[tokio::test]
    async fn test_failed_movie_is_retried_and_others_completed() {
        let ctx = test_context();
        seed_movie(&ctx, 7);
        seed_movie(&ctx, 8);
        let metadata = FakeMetadata { failing: [7].into(), ..FakeMetadata::new() };

        let result = complete_new_movies(&ctx, &metadata).await;

        assert!(matches!(result, Err(SyncError::Remote(_))));
        assert_eq!(result.unwrap_err().severity(), crate::error::Severity::Recoverable);
        assert_eq!(ctx.store.movie(8).unwrap().unwrap().title, "Movie 8");
        assert_eq!(ctx.tasks.take(TaskKind::AddMovies), vec![7]);

        // The next run picks it up again.
        ctx.tasks.schedule(TaskKind::AddMovies, [7]);
        let metadata = FakeMetadata::new();
        assert_eq!(complete_new_movies(&ctx, &metadata).await.unwrap(), 1);
        assert_eq!(ctx.store.movie(7).unwrap().unwrap().title, "Movie 7");
        assert!(!ctx.tasks.is_pending(TaskKind::AddMovies));
    }

    #[tokio::test]
    async fn test_add_shows_reschedules_failures() {
        let ctx = test_context();
        let metadata = FakeMetadata {
            shows: [(1, 2), (2, 1), (3, 1)].into(),
            failing: [2].into(),
            ..FakeMetadata::new()
        };

        let result = add_shows(&ctx, &metadata, &[1, 2, 3]).await;

        assert!(matches!(result, Err(SyncError::Remote(_))));
        assert!(ctx.store.show(1).unwrap().is_some());
        assert!(ctx.store.show(3).unwrap().is_some());
        assert_eq!(ctx.store.episodes_of_show(1).unwrap().len(), 2);
        assert_eq!(ctx.tasks.take(TaskKind::AddShows), vec![2]);
    }

    #[tokio::test]
    async fn test_add_shows_interrupted_keeps_the_rest() {
        let ctx = test_context();
        ctx.cancel.cancel();
        let metadata = FakeMetadata { shows: [(1, 1), (2, 1)].into(), ..FakeMetadata::new() };

        let result = add_shows(&ctx, &metadata, &[1, 2]).await;

        assert!(matches!(result, Err(SyncError::Interrupted)));
        assert!(ctx.store.shows().unwrap().is_empty());
        assert_eq!(ctx.tasks.take(TaskKind::AddShows), vec![1, 2]);
    }
}
