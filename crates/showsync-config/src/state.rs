use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use showsync_models::{Checkpoint, EntityFamily, Provider};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Default)]
struct StateData {
    #[serde(flatten)]
    data: BTreeMap<String, String>,
}

/// Flat key/value store for everything the sync engine must remember
/// between runs: checkpoints, merge flags, back-off and access tokens.
pub struct StateStore {
    path: Option<PathBuf>,
    values: BTreeMap<String, String>,
}

impl StateStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            values: BTreeMap::new(),
        }
    }

    /// A store that never touches disk; `save` is a no-op.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: BTreeMap::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if let Some(path) = &self.path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let state: StateData = toml::from_str(&content)?;
                self.values = state.data;
            }
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let state = StateData {
            data: self.values.clone(),
        };
        let content = toml::to_string_pretty(&state)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: String, value: String) {
        self.values.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    pub fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn get_timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        self.get(key)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn set_timestamp(&mut self, key: String, timestamp: DateTime<Utc>) {
        self.set(key, timestamp.to_rfc3339());
    }

    // Checkpoints

    pub fn checkpoint(&self, provider: Provider, family: EntityFamily) -> Checkpoint {
        Checkpoint {
            last_sync: self.get_timestamp(&last_sync_key(provider, family)),
            merged: self
                .get(&merged_key(provider, family))
                .map(|v| v == "true")
                .unwrap_or(false),
        }
    }

    pub fn set_last_sync(&mut self, provider: Provider, family: EntityFamily, timestamp: DateTime<Utc>) {
        self.set_timestamp(last_sync_key(provider, family), timestamp);
    }

    pub fn set_merged(&mut self, provider: Provider, family: EntityFamily, merged: bool) {
        self.set(merged_key(provider, family), merged.to_string());
    }

    /// Remove every checkpoint and merge flag, forcing a merge sync next time.
    pub fn clear_checkpoints(&mut self) -> usize {
        let keys: Vec<String> = self
            .values
            .keys()
            .filter(|k| k.contains("_last_sync_") || k.contains("_merged_"))
            .cloned()
            .collect();
        for key in &keys {
            self.values.remove(key);
        }
        keys.len()
    }

    // Back-off

    pub fn failed_attempts(&self) -> u32 {
        self.get("sync_failed_attempts")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    pub fn set_failed_attempts(&mut self, attempts: u32) {
        self.set("sync_failed_attempts".to_string(), attempts.to_string());
    }

    pub fn next_allowed_sync(&self) -> Option<DateTime<Utc>> {
        self.get_timestamp("sync_next_allowed_at")
    }

    pub fn set_next_allowed_sync(&mut self, at: DateTime<Utc>) {
        self.set_timestamp("sync_next_allowed_at".to_string(), at);
    }

    pub fn last_successful_sync(&self) -> Option<DateTime<Utc>> {
        self.get_timestamp("sync_last_success_at")
    }

    pub fn set_last_successful_sync(&mut self, at: DateTime<Utc>) {
        self.set_timestamp("sync_last_success_at".to_string(), at);
    }

    // Tokens

    pub fn cloud_token(&self) -> Option<&String> {
        self.get("cloud_access_token")
    }

    pub fn set_cloud_token(&mut self, token: String) {
        self.set("cloud_access_token".to_string(), token);
    }

    pub fn social_token(&self) -> Option<&String> {
        self.get("social_access_token")
    }

    pub fn set_social_token(&mut self, token: String) {
        self.set("social_access_token".to_string(), token);
    }

    // Pending tasks, as comma separated ids

    pub fn pending_task(&self, task: &str) -> Vec<u32> {
        self.get(&task_key(task))
            .map(|ids| ids.split(',').filter_map(|id| id.trim().parse().ok()).collect())
            .unwrap_or_default()
    }

    pub fn set_pending_task(&mut self, task: &str, ids: &[u32]) {
        if ids.is_empty() {
            self.remove(&task_key(task));
            return;
        }
        let value = ids.iter().map(u32::to_string).collect::<Vec<_>>().join(",");
        self.set(task_key(task), value);
    }
}

fn task_key(task: &str) -> String {
    format!("task_pending_{}", task)
}

fn last_sync_key(provider: Provider, family: EntityFamily) -> String {
    format!("{}_last_sync_{}", provider.as_str(), family.as_str())
}

fn merged_key(provider: Provider, family: EntityFamily) -> String {
    format!("{}_merged_{}", provider.as_str(), family.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_pending_task_ids() {
        let mut store = StateStore::in_memory();
        assert!(store.pending_task("add_shows").is_empty());

        store.set_pending_task("add_shows", &[3, 12]);
        assert_eq!(store.get("task_pending_add_shows"), Some(&"3,12".to_string()));
        assert_eq!(store.pending_task("add_shows"), vec![3, 12]);

        store.set_pending_task("add_shows", &[]);
        assert!(store.get("task_pending_add_shows").is_none());
    }

    #[test]
    fn test_state_store_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();
        let now = Utc::now();

        let mut store = StateStore::new(path.clone());
        store.set_social_token("token".to_string());
        store.set_last_sync(Provider::Social, EntityFamily::EpisodesWatched, now);
        store.set_merged(Provider::Social, EntityFamily::EpisodesWatched, true);
        store.save().unwrap();

        let mut loaded = StateStore::new(path);
        loaded.load().unwrap();
        assert_eq!(loaded.social_token(), Some(&"token".to_string()));
        let cp = loaded.checkpoint(Provider::Social, EntityFamily::EpisodesWatched);
        assert!(cp.merged);
        assert!((cp.last_sync.unwrap() - now).num_seconds().abs() < 2);
    }

    #[test]
    fn test_missing_checkpoint_is_unmerged() {
        let store = StateStore::in_memory();
        let cp = store.checkpoint(Provider::Cloud, EntityFamily::Lists);
        assert_eq!(cp, Checkpoint::default());
    }

    #[test]
    fn test_clear_checkpoints_keeps_tokens() {
        let mut store = StateStore::in_memory();
        store.set_cloud_token("abc".to_string());
        store.set_last_sync(Provider::Cloud, EntityFamily::Shows, Utc::now());
        store.set_merged(Provider::Cloud, EntityFamily::Shows, true);

        assert_eq!(store.clear_checkpoints(), 2);
        assert_eq!(store.cloud_token(), Some(&"abc".to_string()));
        assert!(!store.checkpoint(Provider::Cloud, EntityFamily::Shows).merged);
    }

    #[test]
    fn test_backoff_state_defaults() {
        let mut store = StateStore::in_memory();
        assert_eq!(store.failed_attempts(), 0);
        assert!(store.next_allowed_sync().is_none());
        store.set_failed_attempts(3);
        assert_eq!(store.failed_attempts(), 3);
    }
}
