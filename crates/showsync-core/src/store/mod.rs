mod file;


pub use file::FileStore;

use chrono::{DateTime, Utc};
use showsync_models::{Episode, EpisodeFlag, EpisodeKey, List, ListItem, Movie, Show, UserNote};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("failed to persist sync state: {0}")]
    State(String),
}

/// One write against the local store.
///
/// Updates of rows that do not exist affect nothing, like an SQL `UPDATE`
/// with no matching row.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    /// Insert a show; an existing row is left untouched.
    InsertShow(Show),
    SetShowInfo {
        tmdb_id: u32,
        title: String,
        refreshed_at: DateTime<Utc>,
    },
    SetShowFlags {
        tmdb_id: u32,
        favorite: Option<bool>,
        hidden: Option<bool>,
        notify: Option<bool>,
    },
    SetShowLanguage {
        tmdb_id: u32,
        language: Option<String>,
    },
    SetShowNote {
        tmdb_id: u32,
        note: Option<UserNote>,
    },
    SetShowLastWatched {
        tmdb_id: u32,
        at: DateTime<Utc>,
    },
    SetShowCloudMerged {
        tmdb_id: u32,
        merged: bool,
    },
    SetShowRating {
        tmdb_id: u32,
        rating: Option<u8>,
    },
    SetShowNextEpisode {
        tmdb_id: u32,
        next: Option<(u32, u32)>,
        unwatched_count: u32,
    },
    ClearShowRatings,

    /// Insert an episode, or refresh title and air date of an existing one.
    UpsertEpisodeInfo(Episode),
    SetEpisodeWatched {
        key: EpisodeKey,
        flag: EpisodeFlag,
        plays: u32,
    },
    SetEpisodeCollected {
        key: EpisodeKey,
        collected: bool,
    },
    SetEpisodeRating {
        key: EpisodeKey,
        rating: Option<u8>,
    },
    ClearEpisodeRatings,

    /// Insert or replace a movie.
    UpsertMovie(Movie),
    SetMovieFlags {
        tmdb_id: u32,
        in_collection: Option<bool>,
        in_watchlist: Option<bool>,
        watched: Option<bool>,
    },
    SetMoviePlays {
        tmdb_id: u32,
        plays: u32,
        last_watched_at: Option<DateTime<Utc>>,
    },
    SetMovieRating {
        tmdb_id: u32,
        rating: Option<u8>,
    },
    ClearMovieRatings,
    DeleteMovie(u32),

    UpsertList(List),
    /// Fails while the list still owns items.
    DeleteList(String),
    UpsertListItem(ListItem),
    DeleteListItem(String),
}

/// Durable storage for shows, episodes, movies and lists.
pub trait LocalStore: Send + Sync {
    fn shows(&self) -> Result<Vec<Show>, StoreError>;
    fn show(&self, tmdb_id: u32) -> Result<Option<Show>, StoreError>;
    fn episodes_of_show(&self, show_tmdb_id: u32) -> Result<Vec<Episode>, StoreError>;
    fn episodes(&self) -> Result<Vec<Episode>, StoreError>;
    fn movies(&self) -> Result<Vec<Movie>, StoreError>;
    fn movie(&self, tmdb_id: u32) -> Result<Option<Movie>, StoreError>;
    fn lists(&self) -> Result<Vec<List>, StoreError>;
    fn list_items(&self, list_id: &str) -> Result<Vec<ListItem>, StoreError>;

    /// Apply one batch. Either every op takes effect or none does.
    fn apply(&self, ops: &[StoreOp]) -> Result<(), StoreError>;
}

/// Apply `ops` as independent batches of at most `batch_size` ops, in order.
///
/// Stops at the first failing batch; batches applied before it stay applied.
/// Returns the number of batches applied.
pub fn apply_in_batches(
    store: &dyn LocalStore,
    ops: &[StoreOp],
    batch_size: usize,
) -> Result<usize, StoreError> {
    let mut applied = 0;
    for batch in ops.chunks(batch_size.max(1)) {
        store.apply(batch)?;
        applied += 1;
    }
    if applied > 0 {
        debug!(ops = ops.len(), batches = applied, "Applied local store batches");
    }
    Ok(applied)
}
