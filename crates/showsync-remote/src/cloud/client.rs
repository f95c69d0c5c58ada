use crate::cloud::api::{
    CloudEpisode, CloudList, CloudMovie, CloudShow, EpisodeBatch, EpisodeQuery, Page,
};
use crate::error::RemoteError;
use crate::http::{check_status, create_client, parse_json};
use crate::traits::CloudService;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Serialize)]
struct ShowList<'a> {
    shows: &'a [CloudShow],
}

#[derive(Serialize)]
struct MovieList<'a> {
    movies: &'a [CloudMovie],
}

#[derive(Serialize)]
struct ListList<'a> {
    lists: &'a [CloudList],
}

#[derive(Clone)]
pub struct HttpCloudClient {
    client: Arc<Client>,
    base_url: String,
    access_token: Option<String>,
}

impl HttpCloudClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Arc::new(create_client()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
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
            .header("Accept", "application/json"))
    }

    fn paged_query(updated_since: Option<DateTime<Utc>>, cursor: Option<&str>) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(since) = updated_since {
            query.push(("updatedSince", since.timestamp_millis().to_string()));
        }
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        query
    }

    async fn get_page<T>(&self, path: &str, query: Vec<(&'static str, String)>, what: &str) -> Result<Page<T>, RemoteError>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        debug!("GET {} {:?}", url, query);
        let response = self.authorized(self.client.get(&url).query(&query))?.send().await?;
        let response = check_status(response, what).await?;
        parse_json(response, what).await
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B, what: &str) -> Result<(), RemoteError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self.authorized(self.client.post(&url).json(body))?.send().await?;
        check_status(response, what).await?;
        Ok(())
    }
}

#[async_trait]
impl CloudService for HttpCloudClient {
    async fn episodes(&self, query: EpisodeQuery, cursor: Option<&str>) -> Result<Page<CloudEpisode>, RemoteError> {
        let mut params = Self::paged_query(query.updated_since, cursor);
        if let Some(show) = query.show_tmdb_id {
            params.push(("showTmdbId", show.to_string()));
        }
        self.get_page("episodes", params, "get episodes").await
    }

    async fn save_episodes(&self, batch: &EpisodeBatch) -> Result<(), RemoteError> {
        self.post("episodes", batch, "save episodes").await
    }

    async fn shows(&self, updated_since: Option<DateTime<Utc>>, cursor: Option<&str>) -> Result<Page<CloudShow>, RemoteError> {
        self.get_page("shows", Self::paged_query(updated_since, cursor), "get shows").await
    }

    async fn save_shows(&self, shows: &[CloudShow]) -> Result<(), RemoteError> {
        self.post("shows", &ShowList { shows }, "save shows").await
    }

    async fn movies(&self, updated_since: Option<DateTime<Utc>>, cursor: Option<&str>) -> Result<Page<CloudMovie>, RemoteError> {
        self.get_page("movies", Self::paged_query(updated_since, cursor), "get movies").await
    }

    async fn save_movies(&self, movies: &[CloudMovie]) -> Result<(), RemoteError> {
        self.post("movies", &MovieList { movies }, "save movies").await
    }

    async fn lists(&self, updated_since: Option<DateTime<Utc>>, cursor: Option<&str>) -> Result<Page<CloudList>, RemoteError> {
        self.get_page("lists", Self::paged_query(updated_since, cursor), "get lists").await
    }

    async fn list_ids(&self, cursor: Option<&str>) -> Result<Page<String>, RemoteError> {
        self.get_page("lists/ids", Self::paged_query(None, cursor), "get list ids").await
    }

    async fn save_lists(&self, lists: &[CloudList]) -> Result<(), RemoteError> {
        self.post("lists", &ListList { lists }, "save lists").await
    }
}
