//! In-crate fakes for the remote services and the metadata source.

use crate::context::SyncContext;
use crate::error::SyncError;
use crate::metadata::{MetadataProvider, ShowDetails, ShowRefresh};
use crate::store::FileStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use showsync_config::{StateStore, SyncOptions};
use showsync_models::{Episode, EpisodeKey, Movie, Show};
use showsync_remote::cloud::{
    CloudEpisode, CloudList, CloudMovie, CloudShow, EpisodeBatch, EpisodeQuery, Page,
};
use showsync_remote::social::{
    CollectedShow, LastActivity, ListedMovie, NotesPage, RatedEpisode, RatedMovie, RatedShow,
    SocialNote, SyncItems, WatchedMovie, WatchedShow,
};
use showsync_remote::{CloudService, RemoteError, SocialService};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub fn test_context() -> SyncContext {
    SyncContext::new(
        Arc::new(FileStore::in_memory()),
        StateStore::in_memory(),
        SyncOptions::default(),
    )
}

fn paginate<T: Clone>(items: &[T], page_size: usize, cursor: Option<&str>) -> Page<T> {
    let start = cursor
        .and_then(|c| c.parse::<usize>().ok())
        .unwrap_or(0)
        .min(items.len());
    let end = (start + page_size.max(1)).min(items.len());
    let page = items[start..end].to_vec();
    if end < items.len() {
        Page::more(page, end.to_string())
    } else {
        Page::last(page)
    }
}

fn changed_since(updated_at: Option<DateTime<Utc>>, since: Option<DateTime<Utc>>) -> bool {
    match (since, updated_at) {
        (None, _) => true,
        (Some(since), Some(updated)) => updated > since,
        (Some(_), None) => false,
    }
}

// Cloud

#[derive(Default)]
pub struct FakeCloudState {
    pub episodes: Vec<CloudEpisode>,
    pub shows: Vec<CloudShow>,
    pub movies: Vec<CloudMovie>,
    pub lists: Vec<CloudList>,
    pub page_size: usize,

    pub episode_queries: Vec<EpisodeQuery>,
    pub saved_episodes: Vec<EpisodeBatch>,
    pub saved_shows: Vec<Vec<CloudShow>>,
    pub saved_movies: Vec<Vec<CloudMovie>>,
    pub saved_lists: Vec<Vec<CloudList>>,
    pub save_calls: usize,

    /// Save calls with this (1-based) number or later fail.
    pub fail_saves_from: Option<usize>,
    /// Listing name ("episodes", "shows", "movies", "lists", "list_ids")
    /// to the error it fails with.
    pub download_errors: HashMap<&'static str, RemoteError>,
}

pub struct FakeCloud {
    pub state: Mutex<FakeCloudState>,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeCloudState {
                page_size: 2,
                ..Default::default()
            }),
        }
    }

    fn check_download(&self, listing: &str) -> Result<(), RemoteError> {
        match self.state.lock().download_errors.get(listing) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn check_save(state: &mut FakeCloudState) -> Result<(), RemoteError> {
        state.save_calls += 1;
        match state.fail_saves_from {
            Some(from) if state.save_calls >= from => Err(RemoteError::Http {
                status: 503,
                message: "unavailable".into(),
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl CloudService for FakeCloud {
    async fn episodes(&self, query: EpisodeQuery, cursor: Option<&str>) -> Result<Page<CloudEpisode>, RemoteError> {
        self.check_download("episodes")?;
        let mut state = self.state.lock();
        state.episode_queries.push(query);
        let items: Vec<CloudEpisode> = state
            .episodes
            .iter()
            .filter(|e| query.show_tmdb_id.map_or(true, |id| e.show_tmdb_id == Some(id)))
            .filter(|e| changed_since(e.updated_at, query.updated_since))
            .cloned()
            .collect();
        Ok(paginate(&items, state.page_size, cursor))
    }

    async fn save_episodes(&self, batch: &EpisodeBatch) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        Self::check_save(&mut state)?;
        state.saved_episodes.push(batch.clone());
        Ok(())
    }

    async fn shows(&self, updated_since: Option<DateTime<Utc>>, cursor: Option<&str>) -> Result<Page<CloudShow>, RemoteError> {
        self.check_download("shows")?;
        let state = self.state.lock();
        let items: Vec<CloudShow> = state
            .shows
            .iter()
            .filter(|s| changed_since(s.updated_at, updated_since))
            .cloned()
            .collect();
        Ok(paginate(&items, state.page_size, cursor))
    }

    async fn save_shows(&self, shows: &[CloudShow]) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        Self::check_save(&mut state)?;
        state.saved_shows.push(shows.to_vec());
        Ok(())
    }

    async fn movies(&self, updated_since: Option<DateTime<Utc>>, cursor: Option<&str>) -> Result<Page<CloudMovie>, RemoteError> {
        self.check_download("movies")?;
        let state = self.state.lock();
        let items: Vec<CloudMovie> = state
            .movies
            .iter()
            .filter(|m| changed_since(m.updated_at, updated_since))
            .cloned()
            .collect();
        Ok(paginate(&items, state.page_size, cursor))
    }

    async fn save_movies(&self, movies: &[CloudMovie]) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        Self::check_save(&mut state)?;
        state.saved_movies.push(movies.to_vec());
        Ok(())
    }

    async fn lists(&self, updated_since: Option<DateTime<Utc>>, cursor: Option<&str>) -> Result<Page<CloudList>, RemoteError> {
        self.check_download("lists")?;
        let state = self.state.lock();
        let items: Vec<CloudList> = state
            .lists
            .iter()
            .filter(|l| changed_since(l.updated_at, updated_since))
            .cloned()
            .collect();
        Ok(paginate(&items, state.page_size, cursor))
    }

    async fn list_ids(&self, cursor: Option<&str>) -> Result<Page<String>, RemoteError> {
        self.check_download("list_ids")?;
        let state = self.state.lock();
        let ids: Vec<String> = state.lists.iter().map(|l| l.list_id.clone()).collect();
        Ok(paginate(&ids, state.page_size, cursor))
    }

    async fn save_lists(&self, lists: &[CloudList]) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        Self::check_save(&mut state)?;
        state.saved_lists.push(lists.to_vec());
        Ok(())
    }
}

// Social

#[derive(Default)]
pub struct FakeSocialState {
    pub activity: LastActivity,
    pub watched_shows: Vec<WatchedShow>,
    pub collected_shows: Vec<CollectedShow>,
    pub episode_ratings: Vec<RatedEpisode>,
    pub show_ratings: Vec<RatedShow>,
    pub movie_ratings: Vec<RatedMovie>,
    pub collected_movies: Vec<ListedMovie>,
    pub watchlisted_movies: Vec<ListedMovie>,
    pub watched_movies: Vec<WatchedMovie>,
    pub notes: Vec<SocialNote>,
    pub notes_page_size: usize,
    /// Maximum number of notes the account may hold.
    pub note_limit: Option<usize>,

    pub history: Vec<SyncItems>,
    pub collection: Vec<SyncItems>,
    pub watchlist: Vec<SyncItems>,
    pub added_notes: Vec<(u32, String)>,
    pub updated_notes: Vec<(u64, String)>,
    pub deleted_notes: Vec<u64>,
    pub downloads: usize,

    pub unauthorized: bool,
    pub fail_uploads: bool,
}

pub struct FakeSocial {
    pub state: Mutex<FakeSocialState>,
}

impl FakeSocial {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeSocialState {
                notes_page_size: 2,
                ..Default::default()
            }),
        }
    }

    fn read<T: Clone>(&self, pick: impl FnOnce(&FakeSocialState) -> &Vec<T>) -> Result<Vec<T>, RemoteError> {
        let mut state = self.state.lock();
        if state.unauthorized {
            return Err(RemoteError::Unauthorized);
        }
        state.downloads += 1;
        Ok(pick(&*state).clone())
    }

    fn write(&self, push: impl FnOnce(&mut FakeSocialState)) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        if state.unauthorized {
            return Err(RemoteError::Unauthorized);
        }
        if state.fail_uploads {
            return Err(RemoteError::Http { status: 500, message: "boom".into() });
        }
        push(&mut *state);
        Ok(())
    }
}

#[async_trait]
impl SocialService for FakeSocial {
    async fn last_activity(&self) -> Result<LastActivity, RemoteError> {
        let state = self.state.lock();
        if state.unauthorized {
            return Err(RemoteError::Unauthorized);
        }
        Ok(state.activity.clone())
    }

    async fn watched_shows(&self) -> Result<Vec<WatchedShow>, RemoteError> {
        self.read(|s| &s.watched_shows)
    }

    async fn collected_shows(&self) -> Result<Vec<CollectedShow>, RemoteError> {
        self.read(|s| &s.collected_shows)
    }

    async fn add_to_history(&self, items: &SyncItems) -> Result<(), RemoteError> {
        self.write(|s| s.history.push(items.clone()))
    }

    async fn add_to_collection(&self, items: &SyncItems) -> Result<(), RemoteError> {
        self.write(|s| s.collection.push(items.clone()))
    }

    async fn add_to_watchlist(&self, items: &SyncItems) -> Result<(), RemoteError> {
        self.write(|s| s.watchlist.push(items.clone()))
    }

    async fn episode_ratings(&self) -> Result<Vec<RatedEpisode>, RemoteError> {
        self.read(|s| &s.episode_ratings)
    }

    async fn show_ratings(&self) -> Result<Vec<RatedShow>, RemoteError> {
        self.read(|s| &s.show_ratings)
    }

    async fn movie_ratings(&self) -> Result<Vec<RatedMovie>, RemoteError> {
        self.read(|s| &s.movie_ratings)
    }

    async fn collected_movies(&self) -> Result<Vec<ListedMovie>, RemoteError> {
        self.read(|s| &s.collected_movies)
    }

    async fn watchlisted_movies(&self) -> Result<Vec<ListedMovie>, RemoteError> {
        self.read(|s| &s.watchlisted_movies)
    }

    async fn watched_movies(&self) -> Result<Vec<WatchedMovie>, RemoteError> {
        self.read(|s| &s.watched_movies)
    }

    async fn notes(&self, page: u32) -> Result<NotesPage, RemoteError> {
        let state = self.state.lock();
        if state.unauthorized {
            return Err(RemoteError::Unauthorized);
        }
        let size = state.notes_page_size.max(1);
        let page_count = state.notes.len().div_ceil(size).max(1) as u32;
        let start = ((page.max(1) - 1) as usize * size).min(state.notes.len());
        let end = (start + size).min(state.notes.len());
        Ok(NotesPage {
            notes: state.notes[start..end].to_vec(),
            page_count,
        })
    }

    async fn add_note(&self, show_tmdb_id: u32, text: &str) -> Result<SocialNote, RemoteError> {
        let mut state = self.state.lock();
        if state.unauthorized {
            return Err(RemoteError::Unauthorized);
        }
        if state.note_limit.is_some_and(|limit| state.notes.len() >= limit) {
            return Err(RemoteError::LimitExceeded("note limit reached".into()));
        }
        let id = 1000 + state.added_notes.len() as u64;
        let note = SocialNote {
            id,
            show_tmdb_id,
            text: text.to_string(),
            updated_at: Some(Utc::now()),
        };
        state.notes.push(note.clone());
        state.added_notes.push((show_tmdb_id, text.to_string()));
        Ok(note)
    }

    async fn update_note(&self, note_id: u64, show_tmdb_id: u32, text: &str) -> Result<SocialNote, RemoteError> {
        let mut state = self.state.lock();
        state.updated_notes.push((note_id, text.to_string()));
        if let Some(note) = state.notes.iter_mut().find(|n| n.id == note_id) {
            note.text = text.to_string();
            note.updated_at = Some(Utc::now());
        }
        Ok(SocialNote {
            id: note_id,
            show_tmdb_id,
            text: text.to_string(),
            updated_at: Some(Utc::now()),
        })
    }

    async fn delete_note(&self, note_id: u64) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        state.deleted_notes.push(note_id);
        state.notes.retain(|n| n.id != note_id);
        Ok(())
    }
}

// Metadata

#[derive(Default)]
pub struct FakeMetadata {
    /// Shows known to the source, with the number of episodes in season 1.
    pub shows: HashMap<u32, u32>,
    pub removed: HashSet<u32>,
    /// Ids whose show or movie lookups fail with a remote error.
    pub failing: HashSet<u32>,
    pub offline: bool,
    pub refreshed: Mutex<Vec<u32>>,
    pub fetched: Mutex<Vec<u32>>,
}

impl FakeMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&self, tmdb_id: u32) -> Result<(), SyncError> {
        if self.offline {
            return Err(SyncError::Offline);
        }
        self.fetched.lock().push(tmdb_id);
        if self.failing.contains(&tmdb_id) {
            return Err(SyncError::Remote(format!("lookup of {} failed", tmdb_id)));
        }
        Ok(())
    }

    fn details(tmdb_id: u32, episodes: u32) -> ShowDetails {
        ShowDetails {
            show: Show::new(tmdb_id, format!("Show {}", tmdb_id)),
            episodes: (1..=episodes)
                .map(|n| Episode::new(EpisodeKey::new(tmdb_id, 1, n)))
                .collect(),
        }
    }
}

#[async_trait]
impl MetadataProvider for FakeMetadata {
    async fn refresh_configuration(&self) -> Result<(), SyncError> {
        if self.offline {
            return Err(SyncError::Offline);
        }
        Ok(())
    }

    async fn refresh_show(&self, tmdb_id: u32) -> Result<ShowRefresh, SyncError> {
        if self.offline {
            return Err(SyncError::Offline);
        }
        self.refreshed.lock().push(tmdb_id);
        if self.removed.contains(&tmdb_id) {
            return Ok(ShowRefresh::Removed);
        }
        let episodes = self.shows.get(&tmdb_id).copied().unwrap_or(0);
        Ok(ShowRefresh::Updated(Self::details(tmdb_id, episodes)))
    }

    async fn fetch_show(&self, tmdb_id: u32) -> Result<Option<ShowDetails>, SyncError> {
        self.lookup(tmdb_id)?;
        Ok(self
            .shows
            .get(&tmdb_id)
            .map(|episodes| Self::details(tmdb_id, *episodes)))
    }

    async fn fetch_movie(&self, tmdb_id: u32) -> Result<Option<Movie>, SyncError> {
        self.lookup(tmdb_id)?;
        Ok(Some(Movie::new(tmdb_id, format!("Movie {}", tmdb_id))))
    }
}
