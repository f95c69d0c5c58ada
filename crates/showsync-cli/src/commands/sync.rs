use super::config::load_config;
use super::sync_ui::SyncUI;
use crate::metadata::PlaceholderMetadata;
use crate::output::{Output, OutputFormat};
use color_eyre::Result;
use showsync_config::{Config, PathManager, StateStore};
use showsync_core::{
    add_shows, BackoffPolicy, FileStore, LocalStore, SyncContext, SyncCoordinator, SyncError,
    SyncKind, SyncReport, TaskKind,
};
use showsync_remote::{HttpCloudClient, HttpSocialClient};
use std::sync::Arc;
use tracing::{info, warn};

/// Everything one sync pass needs, built from the config and state files.
pub struct Engine {
    pub config: Config,
    pub ctx: SyncContext,
    cloud: Option<HttpCloudClient>,
    social: Option<HttpSocialClient>,
    metadata: PlaceholderMetadata,
}

impl Engine {
    pub fn load(use_cloud: bool, use_social: bool) -> Result<Self> {
        let paths = PathManager::default();
        paths
            .ensure_directories()
            .map_err(|e| color_eyre::eyre::eyre!("Failed to create directories: {}", e))?;
        let config = load_config(&paths)?;
        config
            .validate()
            .map_err(|e| color_eyre::eyre::eyre!("Configuration validation failed: {}", e))?;

        let mut state = StateStore::new(paths.state_file());
        state.load().map_err(|e| {
            color_eyre::eyre::eyre!("Failed to load state from {}: {}", paths.state_file().display(), e)
        })?;
        let store: Arc<dyn LocalStore> = Arc::new(FileStore::open(paths.store_file()).map_err(|e| {
            color_eyre::eyre::eyre!("Failed to open store at {}: {}", paths.store_file().display(), e)
        })?);

        let cloud = config
            .cloud
            .as_ref()
            .filter(|c| c.enabled && use_cloud)
            .map(|c| HttpCloudClient::new(c.base_url.clone()).with_token(state.cloud_token().cloned()));
        let social = config
            .social
            .as_ref()
            .filter(|s| s.enabled && use_social)
            .map(|s| {
                HttpSocialClient::new(s.base_url.clone(), s.client_id.clone())
                    .with_token(state.social_token().cloned())
            });

        let metadata = PlaceholderMetadata::new(store.clone());
        let ctx = SyncContext::new(store, state, config.sync.clone());
        Ok(Self { config, ctx, cloud, social, metadata })
    }

    /// Cancel the running pass on Ctrl-C.
    pub fn cancel_on_ctrl_c(&self) {
        let cancel = self.ctx.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping sync");
                cancel.cancel();
            }
        });
    }

    pub async fn run(&self, kind: SyncKind) -> Result<SyncReport, SyncError> {
        let mut coordinator = SyncCoordinator::new(&self.ctx, &self.metadata)
            .with_backoff(BackoffPolicy::from_config(&self.config.scheduler));
        if let Some(cloud) = &self.cloud {
            coordinator = coordinator.with_cloud(cloud);
        }
        if let Some(social) = &self.social {
            coordinator = coordinator.with_social(social);
        }
        let report = coordinator.run(kind).await;
        let added = match &report {
            Ok(_) => self.add_pending_shows().await,
            Err(_) => Ok(0),
        };
        // Whatever is still pending is picked up by the next process.
        let persisted = self.ctx.persist_tasks();
        let report = report?;
        match added {
            Err(SyncError::Interrupted) => return Err(SyncError::Interrupted),
            Err(e) => warn!(error = %e, "Some remote shows could not be added, retrying next run"),
            Ok(_) => {}
        }
        persisted?;
        Ok(report)
    }

    /// Shows found remotely but missing locally are added after the pass,
    /// their episodes get merged on the next one. Failed ids stay pending.
    async fn add_pending_shows(&self) -> Result<usize, SyncError> {
        let ids = self.ctx.tasks.take(TaskKind::AddShows);
        if ids.is_empty() {
            return Ok(0);
        }
        let added = add_shows(&self.ctx, &self.metadata, &ids).await?;
        info!(operation = "add_shows", requested = ids.len(), added, "Added remote shows");
        Ok(added)
    }
}

pub fn sync_kind(full: bool, show: Option<u32>) -> SyncKind {
    match (show, full) {
        (Some(tmdb_id), _) => SyncKind::Single(tmdb_id),
        (None, true) => SyncKind::Full,
        (None, false) => SyncKind::Delta,
    }
}

pub async fn run_sync(
    full: bool,
    show: Option<u32>,
    use_cloud: bool,
    use_social: bool,
    output: &Output,
) -> Result<()> {
    tracing::debug!("Sync command started");
    let engine = Engine::load(use_cloud, use_social)?;
    if engine.cloud.is_none() && engine.social.is_none() {
        output.warn("No provider enabled, only refreshing local data");
    }
    engine.cancel_on_ctrl_c();

    let ui = SyncUI::new();
    let progress = ui.follow(engine.ctx.events.subscribe());
    let result = engine.run(sync_kind(full, show)).await;
    ui.finish();
    progress.abort();

    let report = result.map_err(|e| color_eyre::eyre::eyre!("Sync failed: {}", e))?;
    print_report(&report, output);
    Ok(())
}

pub fn print_report(report: &SyncReport, output: &Output) {
    match output.format() {
        OutputFormat::Human => {
            for record in &report.progress.steps {
                if let Some(reason) = record.outcome.reason() {
                    output.warn(format!("{}: {}", record.step, reason));
                }
            }
            if report.outcome.is_success() {
                output.success("Sync completed");
            } else {
                let message = report.progress.important_error.as_deref().unwrap_or("unknown error");
                output.error(format!("Sync finished with errors: {}", message));
                if let Some(next) = report.next_allowed_at {
                    output.info(format!("Next automatic sync not before {}", next.to_rfc3339()));
                }
            }
        }
        OutputFormat::Json | OutputFormat::JsonPretty => match serde_json::to_value(report) {
            Ok(value) => output.json(&value),
            Err(e) => output.error(format!("Failed to serialize report: {}", e)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_kind_from_flags() {
        assert_eq!(sync_kind(false, None), SyncKind::Delta);
        assert_eq!(sync_kind(true, None), SyncKind::Full);
        assert_eq!(sync_kind(false, Some(42)), SyncKind::Single(42));
    }
}
