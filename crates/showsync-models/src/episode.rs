use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Remote providers key episodes by numbers, never by local row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EpisodeKey {
    pub show_tmdb_id: u32,
    pub season: u32,
    pub number: u32,
}

impl EpisodeKey {
    pub fn new(show_tmdb_id: u32, season: u32, number: u32) -> Self {
        Self { show_tmdb_id, season, number }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum EpisodeFlag {
    #[default]
    Unwatched,
    Watched,
    Skipped,
}

impl EpisodeFlag {
    /// Wire code used by the cloud provider (0 unwatched, 1 watched, 2 skipped).
    pub fn code(self) -> i32 {
        match self {
            EpisodeFlag::Unwatched => 0,
            EpisodeFlag::Watched => 1,
            EpisodeFlag::Skipped => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(EpisodeFlag::Unwatched),
            1 => Some(EpisodeFlag::Watched),
            2 => Some(EpisodeFlag::Skipped),
            _ => None,
        }
    }

    pub fn is_watched(self) -> bool {
        self == EpisodeFlag::Watched
    }

    pub fn is_watched_or_skipped(self) -> bool {
        matches!(self, EpisodeFlag::Watched | EpisodeFlag::Skipped)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Episode {
    pub key: EpisodeKey,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub watched: EpisodeFlag,
    #[serde(default)]
    pub plays: u32,
    #[serde(default)]
    pub collected: bool,
    #[serde(default)]
    pub user_rating: Option<u8>,
    #[serde(default)]
    pub first_aired: Option<DateTime<Utc>>,
}

impl Episode {
    pub fn new(key: EpisodeKey) -> Self {
        Self {
            key,
            title: None,
            watched: EpisodeFlag::Unwatched,
            plays: 0,
            collected: false,
            user_rating: None,
            first_aired: None,
        }
    }

    pub fn with_watched(mut self, flag: EpisodeFlag, plays: u32) -> Self {
        self.watched = flag;
        self.plays = plays;
        self
    }

    pub fn with_collected(mut self, collected: bool) -> Self {
        self.collected = collected;
        self
    }
}
