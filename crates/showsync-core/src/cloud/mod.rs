mod episodes;
mod lists;
mod movies;
mod shows;


pub use episodes::EpisodeSync;
pub use lists::ListSync;
pub use movies::MovieSync;
pub use shows::ShowSync;

use crate::context::SyncContext;
use crate::error::{finish_early, record_stage, StepOutcome, SyncError};
use crate::metadata::{complete_new_movies, MetadataProvider};
use crate::reconcile::{remove_unused_movies, SyncMode};
use showsync_models::{EntityFamily, Provider};
use showsync_remote::CloudService;
use tracing::{info, instrument};

const PROVIDER: Provider = Provider::Cloud;

/// Runs the cloud stages in order: episodes, shows, movies, lists.
///
/// Independent stages still run after one failed. Lost authorization or
/// an interrupt end the run with an error; going offline ends it with a
/// recoverable outcome.
pub struct CloudOrchestrator<'a> {
    ctx: &'a SyncContext,
    client: &'a dyn CloudService,
    metadata: &'a dyn MetadataProvider,
}

impl<'a> CloudOrchestrator<'a> {
    pub fn new(
        ctx: &'a SyncContext,
        client: &'a dyn CloudService,
        metadata: &'a dyn MetadataProvider,
    ) -> Self {
        Self { ctx, client, metadata }
    }

    #[instrument(skip(self), fields(provider = "cloud"))]
    pub async fn sync(&self) -> Result<StepOutcome, SyncError> {
        let mut outcome = StepOutcome::Success;
        match self.run(&mut outcome).await {
            Ok(()) => {
                info!(provider = "cloud", outcome = %outcome, "Cloud sync finished");
                Ok(outcome)
            }
            Err(e) => finish_early(outcome, e),
        }
    }

    async fn run(&self, outcome: &mut StepOutcome) -> Result<(), SyncError> {
        self.sync_episodes(outcome).await?;
        self.sync_shows(outcome).await?;
        self.sync_movies(outcome).await?;
        self.sync_lists(outcome).await?;
        Ok(())
    }

    async fn sync_episodes(&self, outcome: &mut StepOutcome) -> Result<(), SyncError> {
        let episodes = EpisodeSync::new(self.ctx, self.client);
        let pending: Vec<u32> = self
            .ctx
            .store
            .shows()?
            .into_iter()
            .filter(|s| !s.cloud_merge_complete)
            .map(|s| s.tmdb_id)
            .collect();
        if !pending.is_empty() {
            info!(provider = "cloud", shows = pending.len(), "Merging episodes of shows");
        }
        for show_tmdb_id in pending {
            record_stage(outcome, PROVIDER, "merge episodes", episodes.merge_show(show_tmdb_id).await)?;
        }
        record_stage(outcome, PROVIDER, "download episodes", episodes.download_changes().await)?;
        Ok(())
    }

    async fn sync_shows(&self, outcome: &mut StepOutcome) -> Result<(), SyncError> {
        let mode = self.mode(EntityFamily::Shows);
        let shows = ShowSync::new(self.ctx, self.client);
        if !record_stage(outcome, PROVIDER, "download shows", shows.download(mode).await)? {
            return Ok(());
        }
        if mode.is_merge() {
            let uploaded = shows.upload_all().await;
            if record_stage(outcome, PROVIDER, "upload shows", uploaded)? {
                record_stage(outcome, PROVIDER, "shows merged", self.ctx.set_merged(PROVIDER, EntityFamily::Shows))?;
            }
        }
        Ok(())
    }

    async fn sync_movies(&self, outcome: &mut StepOutcome) -> Result<(), SyncError> {
        let mode = self.mode(EntityFamily::Movies);
        let movies = MovieSync::new(self.ctx, self.client);
        if record_stage(outcome, PROVIDER, "download movies", movies.download(mode).await)? {
            if mode.is_merge() {
                let uploaded = movies.upload_all().await;
                if record_stage(outcome, PROVIDER, "upload movies", uploaded)? {
                    record_stage(outcome, PROVIDER, "movies merged", self.ctx.set_merged(PROVIDER, EntityFamily::Movies))?;
                }
            } else {
                let removed = remove_unused_movies(self.ctx).map(|_| ());
                record_stage(outcome, PROVIDER, "remove unused movies", removed)?;
            }
        }
        let added = complete_new_movies(self.ctx, self.metadata).await.map(|_| ());
        record_stage(outcome, PROVIDER, "add new movies", added)?;
        Ok(())
    }

    async fn sync_lists(&self, outcome: &mut StepOutcome) -> Result<(), SyncError> {
        let mode = self.mode(EntityFamily::Lists);
        let lists = ListSync::new(self.ctx, self.client);
        if !record_stage(outcome, PROVIDER, "download lists", lists.download(mode).await)? {
            return Ok(());
        }
        if mode.is_merge() {
            let uploaded = lists.upload_all().await;
            if record_stage(outcome, PROVIDER, "upload lists", uploaded)? {
                record_stage(outcome, PROVIDER, "lists merged", self.ctx.set_merged(PROVIDER, EntityFamily::Lists))?;
            }
        } else {
            record_stage(outcome, PROVIDER, "prune lists", lists.prune().await.map(|_| ()))?;
        }
        Ok(())
    }

    fn mode(&self, family: EntityFamily) -> SyncMode {
        SyncMode::from_merged(self.ctx.checkpoint(PROVIDER, family).merged)
    }
}
