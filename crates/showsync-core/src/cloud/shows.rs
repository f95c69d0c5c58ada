use crate::batching::upload_in_batches;
use crate::context::SyncContext;
use crate::error::SyncError;
use crate::paging::for_each_page;
use crate::reconcile::SyncMode;
use crate::store::StoreOp;
use crate::tasks::TaskKind;
use chrono::Utc;
use showsync_models::{EntityFamily, Provider, Show};
use showsync_remote::cloud::CloudShow;
use showsync_remote::CloudService;
use tracing::info;

pub struct ShowSync<'a> {
    ctx: &'a SyncContext,
    client: &'a dyn CloudService,
}

impl<'a> ShowSync<'a> {
    pub fn new(ctx: &'a SyncContext, client: &'a dyn CloudService) -> Self {
        Self { ctx, client }
    }

    /// Download shows (all when merging, changed ones otherwise) and
    /// reconcile their flags. Remote shows missing locally are scheduled
    /// for adding.
    pub async fn download(&self, mode: SyncMode) -> Result<(), SyncError> {
        let checkpoint = self.ctx.checkpoint(Provider::Cloud, EntityFamily::Shows);
        let since = if mode.is_merge() { None } else { checkpoint.last_sync };
        let started = Utc::now();
        let client = self.client;
        let mut new_shows = Vec::new();
        let mut changed = 0;

        for_each_page(
            self.ctx,
            Provider::Cloud,
            "shows",
            move |cursor| async move { client.shows(since, cursor.as_deref()).await },
            |page| {
                let mut ops = Vec::new();
                for remote in page {
                    match self.ctx.store.show(remote.tmdb_id)? {
                        Some(local) => ops.extend(reconcile_show(&local, &remote, mode)),
                        None if !remote.is_removed.unwrap_or(false) => new_shows.push(remote.tmdb_id),
                        None => {}
                    }
                }
                changed += ops.len();
                self.ctx.apply(&ops)
            },
        )
        .await?;

        let scheduled = self.ctx.tasks.schedule(TaskKind::AddShows, new_shows);
        if changed > 0 {
            self.ctx.notify_changed(EntityFamily::Shows);
        }
        info!(
            provider = "cloud",
            operation = "download_shows",
            merge = mode.is_merge(),
            updated = changed,
            new = scheduled,
            "Downloaded shows"
        );
        self.ctx
            .set_last_sync(Provider::Cloud, EntityFamily::Shows, started)
    }

    pub async fn upload_all(&self) -> Result<(), SyncError> {
        let shows: Vec<CloudShow> = self
            .ctx
            .store
            .shows()?
            .into_iter()
            .map(to_cloud_show)
            .collect();
        let client = self.client;
        let batches = upload_in_batches(
            self.ctx,
            Provider::Cloud,
            "shows",
            &shows,
            self.ctx.options.show_batch_size,
            move |batch| async move { client.save_shows(&batch).await },
        )
        .await?;
        info!(provider = "cloud", operation = "upload_shows", count = shows.len(), batches, "Uploaded shows");
        Ok(())
    }
}

fn to_cloud_show(show: Show) -> CloudShow {
    CloudShow {
        tmdb_id: show.tmdb_id,
        is_favorite: Some(show.favorite),
        is_hidden: Some(show.hidden),
        notify: Some(show.notify),
        language: show.language,
        is_removed: None,
        updated_at: None,
    }
}

fn reconcile_show(local: &Show, remote: &CloudShow, mode: SyncMode) -> Vec<StoreOp> {
    let changed = |local: bool, remote: Option<bool>| {
        remote
            .map(|remote| mode.resolve(local, remote))
            .filter(|value| *value != local)
    };
    let favorite = changed(local.favorite, remote.is_favorite);
    let hidden = changed(local.hidden, remote.is_hidden);
    let notify = changed(local.notify, remote.notify);

    let mut ops = Vec::new();
    if favorite.is_some() || hidden.is_some() || notify.is_some() {
        ops.push(StoreOp::SetShowFlags {
            tmdb_id: local.tmdb_id,
            favorite,
            hidden,
            notify,
        });
    }

    if let Some(language) = remote.language.as_ref().filter(|l| !l.is_empty()) {
        let replace = match mode {
            SyncMode::Merge => local.language.is_none(),
            SyncMode::Delta => local.language.as_ref() != Some(language),
        };
        if replace {
            ops.push(StoreOp::SetShowLanguage {
                tmdb_id: local.tmdb_id,
                language: Some(language.clone()),
            });
        }
    }
    ops
}
