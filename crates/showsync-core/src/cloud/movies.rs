use crate::batching::upload_in_batches;
use crate::context::SyncContext;
use crate::error::SyncError;
use crate::paging::for_each_page;
use crate::reconcile::{normalize_plays, watched_plays, SyncMode};
use crate::store::StoreOp;
use crate::tasks::TaskKind;
use chrono::Utc;
use showsync_models::{EntityFamily, Movie, Provider};
use showsync_remote::cloud::CloudMovie;
use showsync_remote::CloudService;
use tracing::info;

pub struct MovieSync<'a> {
    ctx: &'a SyncContext,
    client: &'a dyn CloudService,
}

impl<'a> MovieSync<'a> {
    pub fn new(ctx: &'a SyncContext, client: &'a dyn CloudService) -> Self {
        Self { ctx, client }
    }

    /// Download movies and reconcile collection, watchlist and watched state.
    /// Movies only known remotely are created right away and queued for
    /// their metadata.
    pub async fn download(&self, mode: SyncMode) -> Result<(), SyncError> {
        let checkpoint = self.ctx.checkpoint(Provider::Cloud, EntityFamily::Movies);
        let since = if mode.is_merge() { None } else { checkpoint.last_sync };
        let started = Utc::now();
        let client = self.client;
        let mut new_movies = Vec::new();
        let mut changed = 0;

        for_each_page(
            self.ctx,
            Provider::Cloud,
            "movies",
            move |cursor| async move { client.movies(since, cursor.as_deref()).await },
            |page| {
                let mut ops = Vec::new();
                for remote in page {
                    match self.ctx.store.movie(remote.tmdb_id)? {
                        Some(local) => ops.extend(reconcile_movie(&local, &remote, mode)),
                        None => {
                            if let Some(movie) = new_movie(&remote) {
                                new_movies.push(movie.tmdb_id);
                                ops.push(StoreOp::UpsertMovie(movie));
                            }
                        }
                    }
                }
                changed += ops.len();
                self.ctx.apply(&ops)
            },
        )
        .await?;

        self.ctx.tasks.schedule(TaskKind::AddMovies, new_movies);
        if changed > 0 {
            self.ctx.notify_changed(EntityFamily::Movies);
        }
        info!(
            provider = "cloud",
            operation = "download_movies",
            merge = mode.is_merge(),
            updated = changed,
            "Downloaded movies"
        );
        self.ctx
            .set_last_sync(Provider::Cloud, EntityFamily::Movies, started)
    }

    pub async fn upload_all(&self) -> Result<(), SyncError> {
        let movies: Vec<CloudMovie> = self
            .ctx
            .store
            .movies()?
            .into_iter()
            .map(to_cloud_movie)
            .collect();
        let client = self.client;
        let batches = upload_in_batches(
            self.ctx,
            Provider::Cloud,
            "movies",
            &movies,
            self.ctx.options.movie_batch_size,
            move |batch| async move { client.save_movies(&batch).await },
        )
        .await?;
        info!(provider = "cloud", operation = "upload_movies", count = movies.len(), batches, "Uploaded movies");
        Ok(())
    }
}

fn to_cloud_movie(movie: Movie) -> CloudMovie {
    CloudMovie {
        tmdb_id: movie.tmdb_id,
        is_in_collection: Some(movie.in_collection),
        is_in_watchlist: Some(movie.in_watchlist),
        is_watched: Some(movie.watched),
        plays: Some(movie.plays as i32),
        updated_at: None,
    }
}

fn new_movie(remote: &CloudMovie) -> Option<Movie> {
    let mut movie = Movie::new(remote.tmdb_id, String::new());
    movie.in_collection = remote.is_in_collection.unwrap_or(false);
    movie.in_watchlist = remote.is_in_watchlist.unwrap_or(false);
    movie.watched = remote.is_watched.unwrap_or(false);
    if movie.is_unused() {
        return None;
    }
    if movie.watched {
        movie.plays = normalize_plays(remote.plays);
    }
    Some(movie)
}

fn reconcile_movie(local: &Movie, remote: &CloudMovie, mode: SyncMode) -> Vec<StoreOp> {
    let changed = |local: bool, remote: Option<bool>| {
        remote
            .map(|remote| mode.resolve(local, remote))
            .filter(|value| *value != local)
    };
    let in_collection = changed(local.in_collection, remote.is_in_collection);
    let in_watchlist = changed(local.in_watchlist, remote.is_in_watchlist);
    let watched = changed(local.watched, remote.is_watched);

    let mut ops = Vec::new();
    if in_collection.is_some() || in_watchlist.is_some() || watched.is_some() {
        ops.push(StoreOp::SetMovieFlags {
            tmdb_id: local.tmdb_id,
            in_collection,
            in_watchlist,
            watched,
        });
    }

    if watched.unwrap_or(local.watched) && remote.is_watched == Some(true) {
        let plays = match mode {
            SyncMode::Merge if local.watched => {
                let remote = remote.plays.filter(|p| *p > 0).map_or(0, |p| p as u32);
                local.plays.max(remote)
            }
            _ => watched_plays(local.watched, local.plays, remote.plays),
        };
        if plays != local.plays {
            ops.push(StoreOp::SetMoviePlays {
                tmdb_id: local.tmdb_id,
                plays,
                last_watched_at: None,
            });
        }
    }
    ops
}
