use crate::batching::upload_in_batches;
use crate::context::SyncContext;
use crate::error::SyncError;
use crate::paging::for_each_page;
use crate::reconcile::SyncMode;
use crate::store::StoreOp;
use chrono::Utc;
use showsync_models::{EntityFamily, List, ListItem, ListItemType, Provider};
use showsync_remote::cloud::{CloudList, CloudListItem};
use showsync_remote::CloudService;
use std::collections::HashSet;
use tracing::{debug, info};

pub struct ListSync<'a> {
    ctx: &'a SyncContext,
    client: &'a dyn CloudService,
}

impl<'a> ListSync<'a> {
    pub fn new(ctx: &'a SyncContext, client: &'a dyn CloudService) -> Self {
        Self { ctx, client }
    }

    /// Download lists. Merging adds remote items to local lists; a delta
    /// replaces the items of every changed list with the remote ones.
    pub async fn download(&self, mode: SyncMode) -> Result<(), SyncError> {
        let checkpoint = self.ctx.checkpoint(Provider::Cloud, EntityFamily::Lists);
        let since = if mode.is_merge() { None } else { checkpoint.last_sync };
        let started = Utc::now();
        let client = self.client;
        let mut changed = 0;

        for_each_page(
            self.ctx,
            Provider::Cloud,
            "lists",
            move |cursor| async move { client.lists(since, cursor.as_deref()).await },
            |page| {
                let mut ops = Vec::new();
                for remote in page {
                    ops.extend(self.reconcile_list(&remote, mode)?);
                }
                changed += ops.len();
                self.ctx.apply(&ops)
            },
        )
        .await?;

        if changed > 0 {
            self.ctx.notify_changed(EntityFamily::Lists);
        }
        info!(
            provider = "cloud",
            operation = "download_lists",
            merge = mode.is_merge(),
            updated = changed,
            "Downloaded lists"
        );
        self.ctx
            .set_last_sync(Provider::Cloud, EntityFamily::Lists, started)
    }

    fn reconcile_list(&self, remote: &CloudList, mode: SyncMode) -> Result<Vec<StoreOp>, SyncError> {
        let local = self
            .ctx
            .store
            .lists()?
            .into_iter()
            .find(|l| l.list_id == remote.list_id);
        let local_items = match &local {
            Some(_) => self.ctx.store.list_items(&remote.list_id)?,
            None => Vec::new(),
        };

        let mut ops = Vec::new();
        let list = match (&local, mode) {
            (Some(local), SyncMode::Merge) => List {
                name: remote.name.clone().filter(|_| local.name.is_empty()).unwrap_or_else(|| local.name.clone()),
                ..local.clone()
            },
            (Some(local), SyncMode::Delta) => List {
                list_id: local.list_id.clone(),
                name: remote.name.clone().unwrap_or_else(|| local.name.clone()),
                order: remote.order.unwrap_or(local.order),
            },
            (None, _) => List {
                list_id: remote.list_id.clone(),
                name: remote.name.clone().unwrap_or_default(),
                order: remote.order.unwrap_or(0),
            },
        };
        if local.as_ref() != Some(&list) {
            ops.push(StoreOp::UpsertList(list));
        }

        let remote_items: Vec<ListItem> = remote
            .items
            .iter()
            .filter_map(|item| {
                let item_type = ListItemType::from_code(item.item_type);
                if item_type.is_none() {
                    debug!(list = %remote.list_id, item_type = item.item_type, "Skipping list item of unknown type");
                }
                item_type.map(|t| ListItem::new(&remote.list_id, t, &item.item_ref_id))
            })
            .collect();

        if !mode.is_merge() {
            let keep: HashSet<&str> = remote_items.iter().map(|i| i.item_id.as_str()).collect();
            ops.extend(
                local_items
                    .iter()
                    .filter(|i| !keep.contains(i.item_id.as_str()))
                    .map(|i| StoreOp::DeleteListItem(i.item_id.clone())),
            );
        }
        let existing: HashSet<&str> = local_items.iter().map(|i| i.item_id.as_str()).collect();
        ops.extend(
            remote_items
                .iter()
                .filter(|i| !existing.contains(i.item_id.as_str()))
                .cloned()
                .map(StoreOp::UpsertListItem),
        );
        Ok(ops)
    }

    pub async fn upload_all(&self) -> Result<(), SyncError> {
        let mut lists = Vec::new();
        for list in self.ctx.store.lists()? {
            let items = self
                .ctx
                .store
                .list_items(&list.list_id)?
                .into_iter()
                .map(|item| CloudListItem {
                    list_item_id: item.item_id,
                    item_type: item.item_type.code(),
                    item_ref_id: item.item_ref_id,
                })
                .collect();
            lists.push(CloudList {
                list_id: list.list_id,
                name: Some(list.name),
                order: Some(list.order),
                items,
                updated_at: None,
            });
        }
        let client = self.client;
        let batches = upload_in_batches(
            self.ctx,
            Provider::Cloud,
            "lists",
            &lists,
            self.ctx.options.list_batch_size,
            move |batch| async move { client.save_lists(&batch).await },
        )
        .await?;
        info!(provider = "cloud", operation = "upload_lists", count = lists.len(), batches, "Uploaded lists");
        Ok(())
    }

    /// Delete local lists the remote no longer has, items first.
    pub async fn prune(&self) -> Result<usize, SyncError> {
        let client = self.client;
        let mut remote_ids = HashSet::new();
        for_each_page(
            self.ctx,
            Provider::Cloud,
            "list ids",
            move |cursor| async move { client.list_ids(cursor.as_deref()).await },
            |page| {
                remote_ids.extend(page);
                Ok(())
            },
        )
        .await?;

        let mut ops = Vec::new();
        let mut removed = 0;
        for list in self.ctx.store.lists()? {
            if remote_ids.contains(&list.list_id) {
                continue;
            }
            ops.extend(
                self.ctx
                    .store
                    .list_items(&list.list_id)?
                    .into_iter()
                    .map(|item| StoreOp::DeleteListItem(item.item_id)),
            );
            ops.push(StoreOp::DeleteList(list.list_id));
            removed += 1;
        }
        self.ctx.apply(&ops)?;
        if removed > 0 {
            info!(provider = "cloud", operation = "prune_lists", count = removed, "Removed lists deleted remotely");
            self.ctx.notify_changed(EntityFamily::Lists);
        }
        Ok(removed)
    }
}
