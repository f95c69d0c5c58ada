use async_trait::async_trait;
use showsync_core::{LocalStore, MetadataProvider, ShowDetails, ShowRefresh, SyncError};
use showsync_models::{Movie, Show};
use std::sync::Arc;

/// Metadata source for setups without a metadata service.
///
/// New shows and movies get a placeholder title; refreshes keep what the
/// local store already has and only bump the refresh time.
pub struct PlaceholderMetadata {
    store: Arc<dyn LocalStore>,
}

impl PlaceholderMetadata {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MetadataProvider for PlaceholderMetadata {
    async fn refresh_configuration(&self) -> Result<(), SyncError> {
        Ok(())
    }

    async fn refresh_show(&self, tmdb_id: u32) -> Result<ShowRefresh, SyncError> {
        let Some(show) = self.store.show(tmdb_id)? else {
            return Ok(ShowRefresh::Removed);
        };
        let episodes = self.store.episodes_of_show(tmdb_id)?;
        Ok(ShowRefresh::Updated(ShowDetails { show, episodes }))
    }

    async fn fetch_show(&self, tmdb_id: u32) -> Result<Option<ShowDetails>, SyncError> {
        Ok(Some(ShowDetails {
            show: Show::new(tmdb_id, format!("Show {}", tmdb_id)),
            episodes: Vec::new(),
        }))
    }

    async fn fetch_movie(&self, tmdb_id: u32) -> Result<Option<Movie>, SyncError> {
        Ok(Some(Movie::new(tmdb_id, format!("Movie {}", tmdb_id))))
    }
}
