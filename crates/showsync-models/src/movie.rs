use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub tmdb_id: u32,
    pub title: String,
    #[serde(default)]
    pub in_collection: bool,
    #[serde(default)]
    pub in_watchlist: bool,
    #[serde(default)]
    pub watched: bool,
    #[serde(default)]
    pub plays: u32,
    #[serde(default)]
    pub user_rating: Option<u8>,
    #[serde(default)]
    pub last_watched_at: Option<DateTime<Utc>>,
}

impl Movie {
    pub fn new(tmdb_id: u32, title: impl Into<String>) -> Self {
        Self {
            tmdb_id,
            title: title.into(),
            in_collection: false,
            in_watchlist: false,
            watched: false,
            plays: 0,
            user_rating: None,
            last_watched_at: None,
        }
    }

    /// A movie nobody tracks any more is removed from the local store.
    pub fn is_unused(&self) -> bool {
        !self.in_collection && !self.in_watchlist && !self.watched
    }
}
