use crate::backoff::BackoffPolicy;
use crate::cloud::CloudOrchestrator;
use crate::context::SyncContext;
use crate::error::{StepOutcome, SyncError};
use crate::events::SyncEvent;
use crate::housekeeping;
use crate::metadata::{MetadataProvider, ShowRefresh};
use crate::progress::{SyncProgress, SyncStep};
use crate::social::SocialOrchestrator;
use crate::store::StoreOp;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use showsync_models::EntityFamily;
use showsync_remote::{CloudService, SocialService};
use tracing::{debug, info, instrument, warn};

/// Which shows the per-show step refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    /// Shows not refreshed within the configured interval.
    Delta,
    /// Every show.
    Full,
    /// Only this show. Provider steps are skipped.
    Single(u32),
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub progress: SyncProgress,
    pub outcome: StepOutcome,
    pub next_allowed_at: Option<DateTime<Utc>>,
}

/// Runs the fixed sequence of sync steps and maintains back-off.
///
/// A failed step never stops the run; only an interrupt does. The
/// aggregated outcome decides whether the next automatic run is pushed out.
pub struct SyncCoordinator<'a> {
    ctx: &'a SyncContext,
    metadata: &'a dyn MetadataProvider,
    cloud: Option<&'a dyn CloudService>,
    social: Option<&'a dyn SocialService>,
    backoff: BackoffPolicy,
}

impl<'a> SyncCoordinator<'a> {
    pub fn new(ctx: &'a SyncContext, metadata: &'a dyn MetadataProvider) -> Self {
        Self {
            ctx,
            metadata,
            cloud: None,
            social: None,
            backoff: BackoffPolicy::default(),
        }
    }

    pub fn with_cloud(mut self, cloud: &'a dyn CloudService) -> Self {
        self.cloud = Some(cloud);
        self
    }

    pub fn with_social(mut self, social: &'a dyn SocialService) -> Self {
        self.social = Some(social);
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    #[instrument(skip(self))]
    pub async fn run(&self, kind: SyncKind) -> Result<SyncReport, SyncError> {
        let mut progress = SyncProgress::new();
        for step in SyncStep::ALL {
            if !self.applies(step, kind) {
                debug!(step = %step, "Skipping step");
                continue;
            }
            self.ctx.check_interrupted()?;
            progress.start(step);
            self.ctx.events.emit(SyncEvent::StepStarted(step));

            let outcome = match self.run_step(step, kind).await {
                Ok(outcome) => outcome,
                Err(SyncError::Interrupted) => {
                    warn!(step = %step, "Sync interrupted");
                    return Err(SyncError::Interrupted);
                }
                Err(e) => StepOutcome::from_error(&e),
            };
            if outcome.is_success() {
                debug!(step = %step, "Step finished");
            } else {
                warn!(step = %step, outcome = %outcome, "Step failed");
            }
            progress.record(step, outcome);
        }
        progress.finish();

        let outcome = progress.outcome();
        let now = Utc::now();
        let next_allowed_at = self.ctx.update_state(|state| {
            if outcome.is_success() {
                self.backoff.record_success(state, now);
            } else {
                self.backoff.record_failure(state, now);
            }
            state.next_allowed_sync()
        })?;

        info!(
            operation = "sync",
            kind = ?kind,
            outcome = %outcome,
            steps = progress.steps.len(),
            "Sync run finished"
        );
        self.ctx.events.emit(SyncEvent::Finished(outcome.clone()));
        Ok(SyncReport { progress, outcome, next_allowed_at })
    }

    fn applies(&self, step: SyncStep, kind: SyncKind) -> bool {
        let single = matches!(kind, SyncKind::Single(_));
        match step {
            SyncStep::Cloud => self.cloud.is_some() && !single,
            SyncStep::Social => self.social.is_some() && !single,
            _ => true,
        }
    }

    async fn run_step(&self, step: SyncStep, kind: SyncKind) -> Result<StepOutcome, SyncError> {
        match step {
            SyncStep::Metadata => {
                self.ctx.check_continue()?;
                self.metadata.refresh_configuration().await?;
                Ok(StepOutcome::Success)
            }
            SyncStep::PerShow => self.refresh_shows(kind).await,
            SyncStep::Cloud => match self.cloud {
                Some(client) => CloudOrchestrator::new(self.ctx, client, self.metadata).sync().await,
                None => Ok(StepOutcome::Success),
            },
            SyncStep::Social => match self.social {
                Some(client) => SocialOrchestrator::new(self.ctx, client, self.metadata).sync().await,
                None => Ok(StepOutcome::Success),
            },
            SyncStep::Housekeeping => {
                housekeeping::run(self.ctx)?;
                Ok(StepOutcome::Success)
            }
        }
    }

    async fn refresh_shows(&self, kind: SyncKind) -> Result<StepOutcome, SyncError> {
        let now = Utc::now();
        let shows = self.ctx.store.shows()?;
        let ids: Vec<u32> = match kind {
            SyncKind::Full => shows.iter().map(|s| s.tmdb_id).collect(),
            SyncKind::Single(tmdb_id) => shows
                .iter()
                .filter(|s| s.tmdb_id == tmdb_id)
                .map(|s| s.tmdb_id)
                .collect(),
            SyncKind::Delta => {
                let stale_before = Duration::try_hours(self.ctx.options.show_refresh_interval_hours)
                    .and_then(|interval| now.checked_sub_signed(interval));
                shows
                    .iter()
                    .filter(|s| {
                        s.last_refreshed_at
                            .map_or(true, |at| stale_before.is_some_and(|before| at < before))
                    })
                    .map(|s| s.tmdb_id)
                    .collect()
            }
        };
        if let SyncKind::Single(tmdb_id) = kind {
            if ids.is_empty() {
                warn!(tmdb_id, "Show is not in the local store");
            }
        }

        let mut outcome = StepOutcome::Success;
        let mut refreshed = 0;
        for tmdb_id in ids {
            self.ctx.check_continue()?;
            match self.metadata.refresh_show(tmdb_id).await {
                Ok(ShowRefresh::Updated(details)) => {
                    let mut ops = vec![StoreOp::SetShowInfo {
                        tmdb_id,
                        title: details.show.title,
                        refreshed_at: now,
                    }];
                    ops.extend(details.episodes.into_iter().map(StoreOp::UpsertEpisodeInfo));
                    self.ctx.apply(&ops)?;
                    refreshed += 1;
                }
                Ok(ShowRefresh::Removed) => warn!(tmdb_id, "Show no longer exists at the metadata source"),
                Err(e) if e.must_propagate() || matches!(e, SyncError::Offline) => return Err(e),
                Err(e) => {
                    warn!(tmdb_id, error = %e, "Failed to refresh show");
                    outcome = outcome.and(StepOutcome::from_error(&e));
                }
            }
        }
        if refreshed > 0 {
            info!(operation = "refresh_shows", count = refreshed, "Refreshed shows");
            self.ctx.notify_changed(EntityFamily::Shows);
            self.ctx.notify_changed(EntityFamily::Episodes);
        }
        Ok(outcome)
    }
}
