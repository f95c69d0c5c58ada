use crate::cloud::api::{
    CloudEpisode, CloudList, CloudMovie, CloudShow, EpisodeBatch, EpisodeQuery, Page,
};
use crate::error::RemoteError;
use crate::social::api::{
    CollectedShow, LastActivity, ListedMovie, NotesPage, RatedEpisode, RatedMovie, RatedShow,
    SocialNote, SyncItems, WatchedMovie, WatchedShow,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Call contract of the cloud backup/list service.
///
/// Listings are cursor-paginated; pass the cursor of the previous page to
/// get the next one. Save calls accept at most one batch-cap worth of items.
#[async_trait]
pub trait CloudService: Send + Sync {
    async fn episodes(&self, query: EpisodeQuery, cursor: Option<&str>) -> Result<Page<CloudEpisode>, RemoteError>;
    async fn save_episodes(&self, batch: &EpisodeBatch) -> Result<(), RemoteError>;

    async fn shows(&self, updated_since: Option<DateTime<Utc>>, cursor: Option<&str>) -> Result<Page<CloudShow>, RemoteError>;
    async fn save_shows(&self, shows: &[CloudShow]) -> Result<(), RemoteError>;

    async fn movies(&self, updated_since: Option<DateTime<Utc>>, cursor: Option<&str>) -> Result<Page<CloudMovie>, RemoteError>;
    async fn save_movies(&self, movies: &[CloudMovie]) -> Result<(), RemoteError>;

    async fn lists(&self, updated_since: Option<DateTime<Utc>>, cursor: Option<&str>) -> Result<Page<CloudList>, RemoteError>;
    /// Ids of every list that exists remotely.
    async fn list_ids(&self, cursor: Option<&str>) -> Result<Page<String>, RemoteError>;
    async fn save_lists(&self, lists: &[CloudList]) -> Result<(), RemoteError>;
}

/// Call contract of the social tracking service.
#[async_trait]
pub trait SocialService: Send + Sync {
    async fn last_activity(&self) -> Result<LastActivity, RemoteError>;

    async fn watched_shows(&self) -> Result<Vec<WatchedShow>, RemoteError>;
    async fn collected_shows(&self) -> Result<Vec<CollectedShow>, RemoteError>;

    async fn add_to_history(&self, items: &SyncItems) -> Result<(), RemoteError>;
    async fn add_to_collection(&self, items: &SyncItems) -> Result<(), RemoteError>;
    async fn add_to_watchlist(&self, items: &SyncItems) -> Result<(), RemoteError>;

    /// Ratings are returned newest first.
    async fn episode_ratings(&self) -> Result<Vec<RatedEpisode>, RemoteError>;
    async fn show_ratings(&self) -> Result<Vec<RatedShow>, RemoteError>;
    async fn movie_ratings(&self) -> Result<Vec<RatedMovie>, RemoteError>;

    async fn collected_movies(&self) -> Result<Vec<ListedMovie>, RemoteError>;
    async fn watchlisted_movies(&self) -> Result<Vec<ListedMovie>, RemoteError>;
    async fn watched_movies(&self) -> Result<Vec<WatchedMovie>, RemoteError>;

    /// Notes attached to shows, 1-based `page`.
    async fn notes(&self, page: u32) -> Result<NotesPage, RemoteError>;
    async fn add_note(&self, show_tmdb_id: u32, text: &str) -> Result<SocialNote, RemoteError>;
    async fn update_note(&self, note_id: u64, show_tmdb_id: u32, text: &str) -> Result<SocialNote, RemoteError>;
    async fn delete_note(&self, note_id: u64) -> Result<(), RemoteError>;
}
