use super::{LocalStore, StoreError, StoreOp};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use showsync_models::{Episode, EpisodeFlag, EpisodeKey, List, ListItem, Movie, Show};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
struct StoreData {
    shows: BTreeMap<u32, Show>,
    episodes: BTreeMap<EpisodeKey, Episode>,
    movies: BTreeMap<u32, Movie>,
    lists: BTreeMap<String, List>,
    list_items: BTreeMap<String, ListItem>,
}

/// On-disk layout. Episode keys are structs, so rows are stored as arrays.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    shows: Vec<Show>,
    #[serde(default)]
    episodes: Vec<Episode>,
    #[serde(default)]
    movies: Vec<Movie>,
    #[serde(default)]
    lists: Vec<List>,
    #[serde(default)]
    list_items: Vec<ListItem>,
}

impl From<StoreFile> for StoreData {
    fn from(file: StoreFile) -> Self {
        Self {
            shows: file.shows.into_iter().map(|s| (s.tmdb_id, s)).collect(),
            episodes: file.episodes.into_iter().map(|e| (e.key, e)).collect(),
            movies: file.movies.into_iter().map(|m| (m.tmdb_id, m)).collect(),
            lists: file.lists.into_iter().map(|l| (l.list_id.clone(), l)).collect(),
            list_items: file
                .list_items
                .into_iter()
                .map(|i| (i.item_id.clone(), i))
                .collect(),
        }
    }
}

impl From<&StoreData> for StoreFile {
    fn from(data: &StoreData) -> Self {
        Self {
            shows: data.shows.values().cloned().collect(),
            episodes: data.episodes.values().cloned().collect(),
            movies: data.movies.values().cloned().collect(),
            lists: data.lists.values().cloned().collect(),
            list_items: data.list_items.values().cloned().collect(),
        }
    }
}

/// `LocalStore` kept in memory and, when opened with a path, written to a
/// JSON file after every applied batch.
pub struct FileStore {
    path: Option<PathBuf>,
    data: RwLock<StoreData>,
}

impl FileStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(StoreData::default()),
        }
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let file: StoreFile = serde_json::from_str(&content)?;
            info!(
                path = %path.display(),
                shows = file.shows.len(),
                movies = file.movies.len(),
                "Loaded local store"
            );
            StoreData::from(file)
        } else {
            debug!(path = %path.display(), "No local store yet, starting empty");
            StoreData::default()
        };
        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn persist(&self, data: &StoreData) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&StoreFile::from(data))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn apply_op(data: &mut StoreData, op: &StoreOp) -> Result<(), StoreError> {
    match op {
        StoreOp::InsertShow(show) => {
            data.shows.entry(show.tmdb_id).or_insert_with(|| show.clone());
        }
        StoreOp::SetShowInfo { tmdb_id, title, refreshed_at } => {
            if let Some(show) = data.shows.get_mut(tmdb_id) {
                show.title = title.clone();
                show.last_refreshed_at = Some(*refreshed_at);
            }
        }
        StoreOp::SetShowFlags { tmdb_id, favorite, hidden, notify } => {
            if let Some(show) = data.shows.get_mut(tmdb_id) {
                if let Some(favorite) = favorite {
                    show.favorite = *favorite;
                }
                if let Some(hidden) = hidden {
                    show.hidden = *hidden;
                }
                if let Some(notify) = notify {
                    show.notify = *notify;
                }
            }
        }
        StoreOp::SetShowLanguage { tmdb_id, language } => {
            if let Some(show) = data.shows.get_mut(tmdb_id) {
                show.language = language.clone();
            }
        }
        StoreOp::SetShowNote { tmdb_id, note } => {
            if let Some(show) = data.shows.get_mut(tmdb_id) {
                show.note = note.clone();
            }
        }
        StoreOp::SetShowLastWatched { tmdb_id, at } => {
            if let Some(show) = data.shows.get_mut(tmdb_id) {
                show.last_watched_at = Some(*at);
            }
        }
        StoreOp::SetShowCloudMerged { tmdb_id, merged } => {
            if let Some(show) = data.shows.get_mut(tmdb_id) {
                show.cloud_merge_complete = *merged;
            }
        }
        StoreOp::SetShowRating { tmdb_id, rating } => {
            if let Some(show) = data.shows.get_mut(tmdb_id) {
                show.user_rating = *rating;
            }
        }
        StoreOp::SetShowNextEpisode { tmdb_id, next, unwatched_count } => {
            if let Some(show) = data.shows.get_mut(tmdb_id) {
                show.next_episode = *next;
                show.unwatched_count = *unwatched_count;
            }
        }
        StoreOp::ClearShowRatings => {
            for show in data.shows.values_mut() {
                show.user_rating = None;
            }
        }
        StoreOp::UpsertEpisodeInfo(episode) => match data.episodes.get_mut(&episode.key) {
            Some(existing) => {
                existing.title = episode.title.clone();
                existing.first_aired = episode.first_aired;
            }
            None => {
                let mut episode = episode.clone();
                episode.plays = normalized_plays(episode.watched, episode.plays);
                data.episodes.insert(episode.key, episode);
            }
        },
        StoreOp::SetEpisodeWatched { key, flag, plays } => {
            if let Some(episode) = data.episodes.get_mut(key) {
                episode.watched = *flag;
                episode.plays = normalized_plays(*flag, *plays);
            }
        }
        StoreOp::SetEpisodeCollected { key, collected } => {
            if let Some(episode) = data.episodes.get_mut(key) {
                episode.collected = *collected;
            }
        }
        StoreOp::SetEpisodeRating { key, rating } => {
            if let Some(episode) = data.episodes.get_mut(key) {
                episode.user_rating = *rating;
            }
        }
        StoreOp::ClearEpisodeRatings => {
            for episode in data.episodes.values_mut() {
                episode.user_rating = None;
            }
        }
        StoreOp::UpsertMovie(movie) => {
            data.movies.insert(movie.tmdb_id, movie.clone());
        }
        StoreOp::SetMovieFlags { tmdb_id, in_collection, in_watchlist, watched } => {
            if let Some(movie) = data.movies.get_mut(tmdb_id) {
                if let Some(in_collection) = in_collection {
                    movie.in_collection = *in_collection;
                }
                if let Some(in_watchlist) = in_watchlist {
                    movie.in_watchlist = *in_watchlist;
                }
                if let Some(watched) = watched {
                    movie.watched = *watched;
                    if !*watched {
                        movie.plays = 0;
                    } else if movie.plays == 0 {
                        movie.plays = 1;
                    }
                }
            }
        }
        StoreOp::SetMoviePlays { tmdb_id, plays, last_watched_at } => {
            if let Some(movie) = data.movies.get_mut(tmdb_id) {
                movie.plays = *plays;
                if last_watched_at.is_some() {
                    movie.last_watched_at = *last_watched_at;
                }
            }
        }
        StoreOp::SetMovieRating { tmdb_id, rating } => {
            if let Some(movie) = data.movies.get_mut(tmdb_id) {
                movie.user_rating = *rating;
            }
        }
        StoreOp::ClearMovieRatings => {
            for movie in data.movies.values_mut() {
                movie.user_rating = None;
            }
        }
        StoreOp::DeleteMovie(tmdb_id) => {
            data.movies.remove(tmdb_id);
        }
        StoreOp::UpsertList(list) => {
            data.lists.insert(list.list_id.clone(), list.clone());
        }
        StoreOp::DeleteList(list_id) => {
            let remaining = data
                .list_items
                .values()
                .filter(|item| &item.list_id == list_id)
                .count();
            if remaining > 0 {
                return Err(StoreError::Integrity(format!(
                    "list {} still has {} items",
                    list_id, remaining
                )));
            }
            data.lists.remove(list_id);
        }
        StoreOp::UpsertListItem(item) => {
            if !data.lists.contains_key(&item.list_id) {
                return Err(StoreError::Integrity(format!(
                    "item {} references missing list {}",
                    item.item_id, item.list_id
                )));
            }
            data.list_items.insert(item.item_id.clone(), item.clone());
        }
        StoreOp::DeleteListItem(item_id) => {
            data.list_items.remove(item_id);
        }
    }
    Ok(())
}

/// Watched and skipped episodes have at least one play, unwatched none.
fn normalized_plays(flag: EpisodeFlag, plays: u32) -> u32 {
    match flag {
        EpisodeFlag::Watched | EpisodeFlag::Skipped => plays.max(1),
        EpisodeFlag::Unwatched => 0,
    }
}

impl LocalStore for FileStore {
    fn shows(&self) -> Result<Vec<Show>, StoreError> {
        Ok(self.data.read().shows.values().cloned().collect())
    }

    fn show(&self, tmdb_id: u32) -> Result<Option<Show>, StoreError> {
        Ok(self.data.read().shows.get(&tmdb_id).cloned())
    }

    fn episodes_of_show(&self, show_tmdb_id: u32) -> Result<Vec<Episode>, StoreError> {
        let start = EpisodeKey::new(show_tmdb_id, 0, 0);
        let end = EpisodeKey::new(show_tmdb_id, u32::MAX, u32::MAX);
        Ok(self
            .data
            .read()
            .episodes
            .range(start..=end)
            .map(|(_, e)| e.clone())
            .collect())
    }

    fn episodes(&self) -> Result<Vec<Episode>, StoreError> {
        Ok(self.data.read().episodes.values().cloned().collect())
    }

    fn movies(&self) -> Result<Vec<Movie>, StoreError> {
        Ok(self.data.read().movies.values().cloned().collect())
    }

    fn movie(&self, tmdb_id: u32) -> Result<Option<Movie>, StoreError> {
        Ok(self.data.read().movies.get(&tmdb_id).cloned())
    }

    fn lists(&self) -> Result<Vec<List>, StoreError> {
        Ok(self.data.read().lists.values().cloned().collect())
    }

    fn list_items(&self, list_id: &str) -> Result<Vec<ListItem>, StoreError> {
        Ok(self
            .data
            .read()
            .list_items
            .values()
            .filter(|item| item.list_id == list_id)
            .cloned()
            .collect())
    }

    fn apply(&self, ops: &[StoreOp]) -> Result<(), StoreError> {
        if ops.is_empty() {
            return Ok(());
        }
        let mut data = self.data.write();
        let mut next = data.clone();
        for op in ops {
            apply_op(&mut next, op)?;
        }
        self.persist(&next)?;
        *data = next;
        Ok(())
    }
}
