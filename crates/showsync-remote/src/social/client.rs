use crate::error::RemoteError;
use crate::http::{check_status, create_client, header_u32, parse_json};
use crate::social::api::{
    CollectedShow, LastActivity, ListedMovie, NotesPage, RatedEpisode, RatedMovie, RatedShow,
    ShowRef, SocialNote, SyncItems, WatchedMovie, WatchedShow,
};
use crate::traits::SocialService;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const NOTES_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
struct RawNoteBody {
    id: u64,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct RawNoteItem {
    #[serde(default)]
    show: Option<ShowRef>,
    note: RawNoteBody,
}

#[derive(Serialize)]
struct NoteRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    show: Option<ShowRef>,
    notes: &'a str,
}

#[derive(Clone)]
pub struct HttpSocialClient {
    client: Arc<Client>,
    base_url: String,
    client_id: String,
    access_token: Option<String>,
}

impl HttpSocialClient {
    pub fn new(base_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            client: Arc::new(create_client()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            access_token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.access_token = token;
        self
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, RemoteError> {
        let token = self.access_token.as_deref().ok_or(RemoteError::Unauthorized)?;
        Ok(builder
            .header("Authorization", format!("Bearer {}", token))
            .header("trakt-api-version", "2")
            .header("trakt-api-key", &self.client_id)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json"))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str, what: &str) -> Result<T, RemoteError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("GET {}", url);
        let response = self.authorized(self.client.get(&url))?.send().await?;
        let response = check_status(response, what).await?;
        parse_json(response, what).await
    }

    async fn post_items(&self, path: &str, items: &SyncItems, what: &str) -> Result<(), RemoteError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self.authorized(self.client.post(&url).json(items))?.send().await?;
        check_status(response, what).await?;
        Ok(())
    }

    fn to_note(raw: RawNoteItem, fallback_show: Option<u32>) -> Option<SocialNote> {
        let show_tmdb_id = raw.show.and_then(|s| s.ids.tmdb).or(fallback_show)?;
        Some(SocialNote {
            id: raw.note.id,
            show_tmdb_id,
            text: raw.note.notes,
            updated_at: raw.note.updated_at,
        })
    }
}

#[async_trait]
impl SocialService for HttpSocialClient {
    async fn last_activity(&self) -> Result<LastActivity, RemoteError> {
        self.get_json("sync/last_activities", "get last activity").await
    }

    async fn watched_shows(&self) -> Result<Vec<WatchedShow>, RemoteError> {
        self.get_json("sync/watched/shows", "get watched shows").await
    }

    async fn collected_shows(&self) -> Result<Vec<CollectedShow>, RemoteError> {
        self.get_json("sync/collection/shows", "get collected shows").await
    }

    async fn add_to_history(&self, items: &SyncItems) -> Result<(), RemoteError> {
        self.post_items("sync/history", items, "add to history").await
    }

    async fn add_to_collection(&self, items: &SyncItems) -> Result<(), RemoteError> {
        self.post_items("sync/collection", items, "add to collection").await
    }

    async fn add_to_watchlist(&self, items: &SyncItems) -> Result<(), RemoteError> {
        self.post_items("sync/watchlist", items, "add to watchlist").await
    }

    async fn episode_ratings(&self) -> Result<Vec<RatedEpisode>, RemoteError> {
        self.get_json("sync/ratings/episodes", "get episode ratings").await
    }

    async fn show_ratings(&self) -> Result<Vec<RatedShow>, RemoteError> {
        self.get_json("sync/ratings/shows", "get show ratings").await
    }

    async fn movie_ratings(&self) -> Result<Vec<RatedMovie>, RemoteError> {
        self.get_json("sync/ratings/movies", "get movie ratings").await
    }

    async fn collected_movies(&self) -> Result<Vec<ListedMovie>, RemoteError> {
        self.get_json("sync/collection/movies", "get collected movies").await
    }

    async fn watchlisted_movies(&self) -> Result<Vec<ListedMovie>, RemoteError> {
        self.get_json("sync/watchlist/movies", "get watchlist movies").await
    }

    async fn watched_movies(&self) -> Result<Vec<WatchedMovie>, RemoteError> {
        self.get_json("sync/watched/movies", "get watched movies").await
    }

    async fn notes(&self, page: u32) -> Result<NotesPage, RemoteError> {
        let url = format!(
            "{}/users/me/notes/shows?page={}&limit={}",
            self.base_url, page, NOTES_PAGE_LIMIT
        );
        let response = self.authorized(self.client.get(&url))?.send().await?;
        let response = check_status(response, "get notes").await?;
        let page_count = header_u32(&response, "X-Pagination-Page-Count").unwrap_or(1);
        let items: Vec<RawNoteItem> = parse_json(response, "get notes").await?;
        let notes = items
            .into_iter()
            .filter_map(|raw| Self::to_note(raw, None))
            .collect();
        Ok(NotesPage { notes, page_count })
    }

    async fn add_note(&self, show_tmdb_id: u32, text: &str) -> Result<SocialNote, RemoteError> {
        let url = format!("{}/notes", self.base_url);
        let body = NoteRequest {
            show: Some(ShowRef::tmdb(show_tmdb_id)),
            notes: text,
        };
        let response = self.authorized(self.client.post(&url).json(&body))?.send().await?;
        let response = check_status(response, "add note").await?;
        let raw: RawNoteBody = parse_json(response, "add note").await?;
        Ok(SocialNote {
            id: raw.id,
            show_tmdb_id,
            text: raw.notes,
            updated_at: raw.updated_at,
        })
    }

    async fn update_note(&self, note_id: u64, show_tmdb_id: u32, text: &str) -> Result<SocialNote, RemoteError> {
        let url = format!("{}/notes/{}", self.base_url, note_id);
        let body = NoteRequest { show: None, notes: text };
        let response = self.authorized(self.client.put(&url).json(&body))?.send().await?;
        let response = check_status(response, "update note").await?;
        let raw: RawNoteBody = parse_json(response, "update note").await?;
        Ok(SocialNote {
            id: raw.id,
            show_tmdb_id,
            text: raw.notes,
            updated_at: raw.updated_at,
        })
    }

    async fn delete_note(&self, note_id: u64) -> Result<(), RemoteError> {
        let url = format!("{}/notes/{}", self.base_url, note_id);
        let response = self.authorized(self.client.delete(&url))?.send().await?;
        check_status(response, "delete note").await?;
        Ok(())
    }
}
