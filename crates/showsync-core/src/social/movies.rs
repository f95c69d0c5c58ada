use super::fetch;
use crate::batching::upload_in_batches;
use crate::context::SyncContext;
use crate::error::SyncError;
use crate::reconcile::{normalize_plays, watched_plays, SyncMode};
use crate::store::StoreOp;
use crate::tasks::TaskKind;
use chrono::{DateTime, Utc};
use showsync_models::{EntityFamily, Movie, Provider};
use showsync_remote::social::{MovieActivity, SocialIds, SyncItems, SyncMovie};
use showsync_remote::SocialService;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MovieList {
    Collection,
    Watchlist,
    Watched,
}

impl MovieList {
    const ALL: [MovieList; 3] = [MovieList::Collection, MovieList::Watchlist, MovieList::Watched];

    fn family(self) -> EntityFamily {
        match self {
            MovieList::Collection => EntityFamily::MoviesCollection,
            MovieList::Watchlist => EntityFamily::MoviesWatchlist,
            MovieList::Watched => EntityFamily::MoviesWatched,
        }
    }

    fn last_activity(self, activity: &MovieActivity) -> Option<DateTime<Utc>> {
        match self {
            MovieList::Collection => activity.collected_at,
            MovieList::Watchlist => activity.watchlisted_at,
            MovieList::Watched => activity.watched_at,
        }
    }

    fn flag(self, movie: &Movie) -> bool {
        match self {
            MovieList::Collection => movie.in_collection,
            MovieList::Watchlist => movie.in_watchlist,
            MovieList::Watched => movie.watched,
        }
    }

    fn set_flag(self, tmdb_id: u32, value: bool) -> StoreOp {
        let value = Some(value);
        match self {
            MovieList::Collection => StoreOp::SetMovieFlags { tmdb_id, in_collection: value, in_watchlist: None, watched: None },
            MovieList::Watchlist => StoreOp::SetMovieFlags { tmdb_id, in_collection: None, in_watchlist: value, watched: None },
            MovieList::Watched => StoreOp::SetMovieFlags { tmdb_id, in_collection: None, in_watchlist: None, watched: value },
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RemoteMovie {
    plays: Option<i32>,
    last_watched_at: Option<DateTime<Utc>>,
}

pub struct MovieSync<'a> {
    ctx: &'a SyncContext,
    client: &'a dyn SocialService,
}

impl<'a> MovieSync<'a> {
    pub fn new(ctx: &'a SyncContext, client: &'a dyn SocialService) -> Self {
        Self { ctx, client }
    }

    /// Reconcile collection, watchlist and watched movies.
    ///
    /// The first run merges all three lists and uploads local-only movies.
    /// Later runs only download lists with remote changes and mirror them.
    pub async fn sync(&self, activity: &MovieActivity) -> Result<(), SyncError> {
        let merged = self.ctx.checkpoint(Provider::Social, EntityFamily::Movies).merged;
        let mode = SyncMode::from_merged(merged);
        let now = Utc::now();

        for list in MovieList::ALL {
            let last_activity = list.last_activity(activity);
            if !mode.is_merge()
                && !self
                    .ctx
                    .checkpoint(Provider::Social, list.family())
                    .needs_sync(last_activity)
            {
                debug!(family = %list.family(), "No remote changes");
                continue;
            }
            let remote = self.download(list).await?;
            let upload = self.reconcile(list, &remote, mode)?;
            if !upload.is_empty() {
                self.upload(list, &upload).await?;
            }
            self.ctx
                .complete(Provider::Social, list.family(), last_activity.unwrap_or(now))?;
        }

        if mode.is_merge() {
            self.ctx.set_merged(Provider::Social, EntityFamily::Movies)?;
        }
        Ok(())
    }

    async fn download(&self, list: MovieList) -> Result<HashMap<u32, RemoteMovie>, SyncError> {
        let listed = match list {
            MovieList::Collection => fetch(self.ctx, "collected movies", self.client.collected_movies()).await?,
            MovieList::Watchlist => fetch(self.ctx, "watchlist movies", self.client.watchlisted_movies()).await?,
            MovieList::Watched => {
                let watched = fetch(self.ctx, "watched movies", self.client.watched_movies()).await?;
                return Ok(watched
                    .into_iter()
                    .filter_map(|w| {
                        let id = w.movie.ids.tmdb?;
                        Some((id, RemoteMovie { plays: w.plays, last_watched_at: w.last_watched_at }))
                    })
                    .collect());
            }
        };
        Ok(listed
            .into_iter()
            .filter_map(|l| {
                let id = l.movie.ids.tmdb?;
                Some((id, RemoteMovie { plays: None, last_watched_at: None }))
            })
            .collect())
    }

    /// Apply one remote list. Returns the local-only movies to upload.
    fn reconcile(
        &self,
        list: MovieList,
        remote: &HashMap<u32, RemoteMovie>,
        mode: SyncMode,
    ) -> Result<Vec<Movie>, SyncError> {
        let mut ops = Vec::new();
        let mut upload = Vec::new();
        let mut known = Vec::new();

        for local in self.ctx.store.movies()? {
            known.push(local.tmdb_id);
            let local_flag = list.flag(&local);
            match remote.get(&local.tmdb_id) {
                Some(found) => {
                    if !local_flag {
                        ops.push(list.set_flag(local.tmdb_id, true));
                    }
                    if list == MovieList::Watched {
                        let plays = watched_plays(local.watched, local.plays, found.plays);
                        if plays != local.plays
                            || (found.last_watched_at.is_some() && found.last_watched_at != local.last_watched_at)
                        {
                            ops.push(StoreOp::SetMoviePlays {
                                tmdb_id: local.tmdb_id,
                                plays,
                                last_watched_at: found.last_watched_at,
                            });
                        }
                    }
                }
                None if local_flag => match mode {
                    SyncMode::Delta => ops.push(list.set_flag(local.tmdb_id, false)),
                    SyncMode::Merge => upload.push(local),
                },
                None => {}
            }
        }

        let mut added = Vec::new();
        for (&tmdb_id, found) in remote {
            if known.contains(&tmdb_id) {
                continue;
            }
            // Interrupts propagate from here.
            self.ctx.check_interrupted()?;
            let mut movie = Movie::new(tmdb_id, String::new());
            match list {
                MovieList::Collection => movie.in_collection = true,
                MovieList::Watchlist => movie.in_watchlist = true,
                MovieList::Watched => {
                    movie.watched = true;
                    movie.plays = normalize_plays(found.plays);
                    movie.last_watched_at = found.last_watched_at;
                }
            }
            ops.push(StoreOp::UpsertMovie(movie));
            added.push(tmdb_id);
        }
        self.ctx.tasks.schedule(TaskKind::AddMovies, added.iter().copied());

        self.ctx.apply(&ops)?;
        if !ops.is_empty() {
            self.ctx.notify_changed(EntityFamily::Movies);
        }
        info!(
            provider = "social",
            family = %list.family(),
            merge = mode.is_merge(),
            updated = ops.len(),
            new = added.len(),
            "Reconciled movie list"
        );
        Ok(upload)
    }

    async fn upload(&self, list: MovieList, movies: &[Movie]) -> Result<(), SyncError> {
        let items: Vec<SyncMovie> = movies
            .iter()
            .map(|m| SyncMovie {
                ids: SocialIds::tmdb(m.tmdb_id),
                watched_at: if list == MovieList::Watched { m.last_watched_at } else { None },
            })
            .collect();
        let client = self.client;
        upload_in_batches(
            self.ctx,
            Provider::Social,
            list.family().as_str(),
            &items,
            self.ctx.options.movie_batch_size,
            move |batch| async move {
                let payload = SyncItems { shows: Vec::new(), movies: batch };
                match list {
                    MovieList::Collection => client.add_to_collection(&payload).await,
                    MovieList::Watchlist => client.add_to_watchlist(&payload).await,
                    MovieList::Watched => client.add_to_history(&payload).await,
                }
            },
        )
        .await?;
        Ok(())
    }
}
