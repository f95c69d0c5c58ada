use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SocialIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trakt: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<u32>,
}

impl SocialIds {
    pub fn tmdb(tmdb_id: u32) -> Self {
        Self {
            trakt: None,
            tmdb: Some(tmdb_id),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ShowRef {
    #[serde(default)]
    pub title: Option<String>,
    pub ids: SocialIds,
}

impl ShowRef {
    pub fn tmdb(tmdb_id: u32) -> Self {
        Self {
            title: None,
            ids: SocialIds::tmdb(tmdb_id),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MovieRef {
    #[serde(default)]
    pub title: Option<String>,
    pub ids: SocialIds,
}

impl MovieRef {
    pub fn tmdb(tmdb_id: u32) -> Self {
        Self {
            title: None,
            ids: SocialIds::tmdb(tmdb_id),
        }
    }
}

// Last activity

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EpisodeActivity {
    #[serde(default)]
    pub watched_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub collected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ShowActivity {
    #[serde(default)]
    pub rated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MovieActivity {
    #[serde(default)]
    pub watched_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub collected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub watchlisted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NoteActivity {
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Per-category timestamps of the last change the provider saw.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LastActivity {
    #[serde(default)]
    pub episodes: EpisodeActivity,
    #[serde(default)]
    pub shows: ShowActivity,
    #[serde(default)]
    pub movies: MovieActivity,
    #[serde(default)]
    pub notes: NoteActivity,
}

// Watched and collected shows

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchedEpisode {
    pub number: u32,
    #[serde(default)]
    pub plays: Option<i32>,
    #[serde(default)]
    pub last_watched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchedSeason {
    pub number: u32,
    #[serde(default)]
    pub episodes: Vec<WatchedEpisode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchedShow {
    pub show: ShowRef,
    #[serde(default)]
    pub last_watched_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub seasons: Vec<WatchedSeason>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectedEpisode {
    pub number: u32,
    #[serde(default)]
    pub collected_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectedSeason {
    pub number: u32,
    #[serde(default)]
    pub episodes: Vec<CollectedEpisode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectedShow {
    pub show: ShowRef,
    #[serde(default)]
    pub seasons: Vec<CollectedSeason>,
}

// Ratings

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpisodeNumber {
    pub season: u32,
    pub number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatedEpisode {
    pub rated_at: DateTime<Utc>,
    pub rating: u8,
    pub show: ShowRef,
    pub episode: EpisodeNumber,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatedShow {
    pub rated_at: DateTime<Utc>,
    pub rating: u8,
    pub show: ShowRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatedMovie {
    pub rated_at: DateTime<Utc>,
    pub rating: u8,
    pub movie: MovieRef,
}

// Movie lists

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListedMovie {
    #[serde(default)]
    pub listed_at: Option<DateTime<Utc>>,
    pub movie: MovieRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchedMovie {
    #[serde(default)]
    pub plays: Option<i32>,
    #[serde(default)]
    pub last_watched_at: Option<DateTime<Utc>>,
    pub movie: MovieRef,
}

// Notes

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SocialNote {
    pub id: u64,
    pub show_tmdb_id: u32,
    pub text: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotesPage {
    pub notes: Vec<SocialNote>,
    /// Total number of pages, from the pagination header.
    pub page_count: u32,
}

// Upload payloads

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncEpisode {
    pub number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncSeason {
    pub number: u32,
    pub episodes: Vec<SyncEpisode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncShow {
    pub ids: SocialIds,
    pub seasons: Vec<SyncSeason>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncMovie {
    pub ids: SocialIds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watched_at: Option<DateTime<Utc>>,
}

/// Body of the history/collection/watchlist add endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SyncItems {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shows: Vec<SyncShow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub movies: Vec<SyncMovie>,
}

impl SyncItems {
    pub fn is_empty(&self) -> bool {
        self.shows.is_empty() && self.movies.is_empty()
    }

    /// Number of episodes plus movies carried by this payload.
    pub fn item_count(&self) -> usize {
        let episodes: usize = self
            .shows
            .iter()
            .flat_map(|s| s.seasons.iter())
            .map(|season| season.episodes.len())
            .sum();
        episodes + self.movies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_activity_tolerates_missing_categories() {
        let activity: LastActivity = serde_json::from_str(
            r#"{"episodes":{"watched_at":"2024-01-02T03:04:05Z"}}"#,
        )
        .unwrap();
        assert!(activity.episodes.watched_at.is_some());
        assert!(activity.episodes.rated_at.is_none());
        assert!(activity.movies.watched_at.is_none());
    }

    #[test]
    fn test_sync_items_count() {
        let items = SyncItems {
            shows: vec![SyncShow {
                ids: SocialIds::tmdb(1),
                seasons: vec![SyncSeason {
                    number: 1,
                    episodes: vec![
                        SyncEpisode { number: 1, watched_at: None },
                        SyncEpisode { number: 2, watched_at: None },
                    ],
                }],
            }],
            movies: vec![SyncMovie { ids: SocialIds::tmdb(9), watched_at: None }],
        };
        assert_eq!(items.item_count(), 3);
        assert!(!items.is_empty());
    }
}
