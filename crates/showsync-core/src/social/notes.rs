use super::{is_stale, tolerance_threshold};
use crate::context::SyncContext;
use crate::error::SyncError;
use crate::reconcile::SyncMode;
use crate::store::StoreOp;
use chrono::{DateTime, Utc};
use showsync_models::{EntityFamily, Provider, Show, UserNote};
use showsync_remote::social::SocialNote;
use showsync_remote::{RemoteError, SocialService};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

enum NoteChange {
    Add { show_tmdb_id: u32, text: String },
    Update { note_id: u64, show_tmdb_id: u32, text: String },
    Delete { note_id: u64, show_tmdb_id: u32 },
}

/// Syncs the notes users attach to shows.
///
/// A local note with empty text and a remote id was cleared locally and
/// is deleted remotely.
pub struct NotesSync<'a> {
    ctx: &'a SyncContext,
    client: &'a dyn SocialService,
}

impl<'a> NotesSync<'a> {
    pub fn new(ctx: &'a SyncContext, client: &'a dyn SocialService) -> Self {
        Self { ctx, client }
    }

    pub async fn sync(&self, last_activity: Option<DateTime<Utc>>) -> Result<(), SyncError> {
        let checkpoint = self.ctx.checkpoint(Provider::Social, EntityFamily::Notes);
        let mode = SyncMode::from_merged(checkpoint.merged);
        let mut updates = Vec::new();
        if checkpoint.needs_sync(last_activity) {
            let remote = self.download().await?;
            let threshold = tolerance_threshold(self.ctx, &checkpoint);
            updates = self.reconcile(&remote, mode, threshold)?;
            self.ctx.complete(
                Provider::Social,
                EntityFamily::Notes,
                last_activity.unwrap_or_else(Utc::now),
            )?;
        } else {
            debug!(family = "notes", "No remote changes");
        }
        self.upload(updates).await
    }

    async fn download(&self) -> Result<Vec<SocialNote>, SyncError> {
        let mut notes = Vec::new();
        let mut page = 1;
        loop {
            self.ctx.check_continue()?;
            let result = self
                .client
                .notes(page)
                .await
                .map_err(|e| SyncError::from_remote(Provider::Social, e))?;
            notes.extend(result.notes);
            if page >= result.page_count {
                break;
            }
            page += 1;
        }
        debug!(pages = page, notes = notes.len(), "Downloaded notes");
        Ok(notes)
    }

    /// Apply remote notes. Returns merge conflicts to push back, where the
    /// local text wins. Notes last changed before `threshold` were applied by
    /// an earlier run and leave the local note alone.
    fn reconcile(
        &self,
        remote: &[SocialNote],
        mode: SyncMode,
        threshold: Option<DateTime<Utc>>,
    ) -> Result<Vec<NoteChange>, SyncError> {
        let shows: HashMap<u32, Show> = self
            .ctx
            .store
            .shows()?
            .into_iter()
            .map(|s| (s.tmdb_id, s))
            .collect();
        let mut ops = Vec::new();
        let mut updates = Vec::new();
        let mut seen = HashSet::new();

        for note in remote {
            seen.insert(note.id);
            if note.updated_at.is_some_and(|at| is_stale(at, threshold)) {
                continue;
            }
            let Some(show) = shows.get(&note.show_tmdb_id) else {
                continue;
            };
            let remote_note = UserNote { text: note.text.clone(), remote_id: Some(note.id) };
            match (mode, show.note.as_ref()) {
                // Cleared locally, deleted in the upload pass.
                (_, Some(local)) if local.text.is_empty() && local.remote_id == Some(note.id) => {}
                (SyncMode::Merge, Some(local)) if !local.text.is_empty() && local.text != note.text => {
                    ops.push(StoreOp::SetShowNote {
                        tmdb_id: show.tmdb_id,
                        note: Some(UserNote { text: local.text.clone(), remote_id: Some(note.id) }),
                    });
                    updates.push(NoteChange::Update {
                        note_id: note.id,
                        show_tmdb_id: show.tmdb_id,
                        text: local.text.clone(),
                    });
                }
                (_, local) if local != Some(&remote_note) => ops.push(StoreOp::SetShowNote {
                    tmdb_id: show.tmdb_id,
                    note: Some(remote_note),
                }),
                _ => {}
            }
        }

        if !mode.is_merge() {
            for show in shows.values() {
                let removed = show
                    .note
                    .as_ref()
                    .and_then(|n| n.remote_id)
                    .is_some_and(|id| !seen.contains(&id));
                if removed {
                    ops.push(StoreOp::SetShowNote { tmdb_id: show.tmdb_id, note: None });
                }
            }
        }

        self.ctx.apply(&ops)?;
        if !ops.is_empty() {
            self.ctx.notify_changed(EntityFamily::Notes);
        }
        info!(provider = "social", operation = "download_notes", merge = mode.is_merge(), updated = ops.len(), "Reconciled notes");
        Ok(updates)
    }

    /// Push local changes. Stops at the first failure; hitting the account's
    /// note limit stops the remaining uploads. Changes the remote accepted
    /// before that are stored either way.
    async fn upload(&self, mut changes: Vec<NoteChange>) -> Result<(), SyncError> {
        for show in self.ctx.store.shows()? {
            let Some(note) = &show.note else {
                continue;
            };
            match (note.text.is_empty(), note.remote_id) {
                (true, Some(note_id)) => changes.push(NoteChange::Delete { note_id, show_tmdb_id: show.tmdb_id }),
                (false, None) => changes.push(NoteChange::Add {
                    show_tmdb_id: show.tmdb_id,
                    text: note.text.clone(),
                }),
                _ => {}
            }
        }
        if changes.is_empty() {
            return Ok(());
        }

        let mut ops = Vec::new();
        let mut failure = None;
        for change in &changes {
            if let Err(e) = self.ctx.check_continue() {
                failure = Some(e);
                break;
            }
            match self.push(change).await {
                Ok(op) => ops.push(op),
                Err(SyncError::LimitExceeded(message)) => {
                    warn!(provider = "social", %message, "Note limit reached, skipping remaining note uploads");
                    failure = Some(SyncError::LimitExceeded(message));
                    break;
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        self.ctx.apply(&ops)?;
        if !ops.is_empty() {
            self.ctx.notify_changed(EntityFamily::Notes);
        }
        info!(provider = "social", operation = "upload_notes", sent = ops.len(), pending = changes.len(), "Uploaded notes");
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn push(&self, change: &NoteChange) -> Result<StoreOp, SyncError> {
        let to_sync = |e: RemoteError| SyncError::from_remote(Provider::Social, e);
        match change {
            NoteChange::Add { show_tmdb_id, text } => {
                let note = self.client.add_note(*show_tmdb_id, text).await.map_err(to_sync)?;
                Ok(StoreOp::SetShowNote {
                    tmdb_id: *show_tmdb_id,
                    note: Some(UserNote { text: text.clone(), remote_id: Some(note.id) }),
                })
            }
            NoteChange::Update { note_id, show_tmdb_id, text } => {
                self.client
                    .update_note(*note_id, *show_tmdb_id, text)
                    .await
                    .map_err(to_sync)?;
                Ok(StoreOp::SetShowNote {
                    tmdb_id: *show_tmdb_id,
                    note: Some(UserNote { text: text.clone(), remote_id: Some(*note_id) }),
                })
            }
            NoteChange::Delete { note_id, show_tmdb_id } => {
                self.client.delete_note(*note_id).await.map_err(to_sync)?;
                Ok(StoreOp::SetShowNote { tmdb_id: *show_tmdb_id, note: None })
            }
        }
    }
}
