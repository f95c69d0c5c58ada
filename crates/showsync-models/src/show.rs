use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A note the user attached to a show. `remote_id` is set once the social
/// provider has accepted the note.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserNote {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Show {
    pub tmdb_id: u32,
    pub title: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub notify: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<UserNote>,
    #[serde(default)]
    pub user_rating: Option<u8>,
    /// Latest time any episode of this show was watched or skipped.
    #[serde(default)]
    pub last_watched_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_refreshed_at: Option<DateTime<Utc>>,
    /// Episodes of this show were merged with the cloud provider.
    #[serde(default)]
    pub cloud_merge_complete: bool,
    /// (season, number) of the next episode to watch.
    #[serde(default)]
    pub next_episode: Option<(u32, u32)>,
    #[serde(default)]
    pub unwatched_count: u32,
}

impl Show {
    pub fn new(tmdb_id: u32, title: impl Into<String>) -> Self {
        Self {
            tmdb_id,
            title: title.into(),
            language: None,
            favorite: false,
            hidden: false,
            notify: true,
            note: None,
            user_rating: None,
            last_watched_at: None,
            last_refreshed_at: None,
            cloud_merge_complete: false,
            next_episode: None,
            unwatched_count: 0,
        }
    }

    pub fn note_text(&self) -> Option<&str> {
        self.note
            .as_ref()
            .map(|n| n.text.as_str())
            .filter(|t| !t.is_empty())
    }
}
