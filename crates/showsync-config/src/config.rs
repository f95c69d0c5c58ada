use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub cloud: Option<CloudConfig>,
    #[serde(default)]
    pub social: Option<SocialConfig>,
    #[serde(default)]
    pub sync: SyncOptions,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CloudConfig {
    pub enabled: bool,
    #[serde(default = "default_cloud_base_url")]
    pub base_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SocialConfig {
    pub enabled: bool,
    pub client_id: String,
    #[serde(default = "default_social_base_url")]
    pub base_url: String,
}

/// Tunables of the sync engine. Batch caps mirror the limits the remote
/// APIs impose per request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SyncOptions {
    #[serde(default = "default_item_batch_size")]
    pub episode_batch_size: usize,
    #[serde(default = "default_item_batch_size")]
    pub show_batch_size: usize,
    #[serde(default = "default_item_batch_size")]
    pub movie_batch_size: usize,
    #[serde(default = "default_list_batch_size")]
    pub list_batch_size: usize,
    #[serde(default = "default_local_batch_size")]
    pub local_batch_size: usize,
    #[serde(default = "default_rating_tolerance_minutes")]
    pub rating_tolerance_minutes: i64,
    #[serde(default = "default_show_refresh_interval_hours")]
    pub show_refresh_interval_hours: i64,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            episode_batch_size: default_item_batch_size(),
            show_batch_size: default_item_batch_size(),
            movie_batch_size: default_item_batch_size(),
            list_batch_size: default_list_batch_size(),
            local_batch_size: default_local_batch_size(),
            rating_tolerance_minutes: default_rating_tolerance_minutes(),
            show_refresh_interval_hours: default_show_refresh_interval_hours(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SchedulerConfig {
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
    #[serde(default = "default_backoff_base_minutes")]
    pub backoff_base_minutes: u64,
    #[serde(default = "default_backoff_max_exponent")]
    pub backoff_max_exponent: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            run_on_startup: default_true(),
            backoff_base_minutes: default_backoff_base_minutes(),
            backoff_max_exponent: default_backoff_max_exponent(),
        }
    }
}

const MAX_RATING_TOLERANCE_MINUTES: i64 = 24 * 60;
const MAX_SHOW_REFRESH_INTERVAL_HOURS: i64 = 365 * 24;
const MAX_SCHEDULER_MINUTES: u64 = 7 * 24 * 60;
const MAX_BACKOFF_EXPONENT: u32 = 16;

fn default_true() -> bool {
    true
}

fn default_cloud_base_url() -> String {
    "https://cloud.showsync.app/api/v1".to_string()
}

fn default_social_base_url() -> String {
    "https://api.trakt.tv".to_string()
}

fn default_item_batch_size() -> usize {
    500
}

fn default_list_batch_size() -> usize {
    10
}

fn default_local_batch_size() -> usize {
    50
}

fn default_rating_tolerance_minutes() -> i64 {
    5
}

fn default_show_refresh_interval_hours() -> i64 {
    24
}

fn default_interval_minutes() -> u64 {
    60
}

fn default_backoff_base_minutes() -> u64 {
    5
}

fn default_backoff_max_exponent() -> u32 {
    6
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// A starting point written by `showsync config init`.
    pub fn template() -> Self {
        Self {
            cloud: Some(CloudConfig {
                enabled: false,
                base_url: default_cloud_base_url(),
            }),
            social: Some(SocialConfig {
                enabled: false,
                client_id: "YOUR_CLIENT_ID".to_string(),
                base_url: default_social_base_url(),
            }),
            sync: SyncOptions::default(),
            scheduler: SchedulerConfig::default(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(cloud) = self.cloud.as_ref().filter(|c| c.enabled) {
            if cloud.base_url.is_empty() {
                return Err(anyhow::anyhow!("Cloud sync is enabled but base_url is empty"));
            }
        }
        if let Some(social) = self.social.as_ref().filter(|s| s.enabled) {
            if social.client_id.is_empty() || social.client_id == "YOUR_CLIENT_ID" {
                return Err(anyhow::anyhow!("Social sync is enabled but client_id is not configured"));
            }
            if social.base_url.is_empty() {
                return Err(anyhow::anyhow!("Social sync is enabled but base_url is empty"));
            }
        }

        let sync = &self.sync;
        for (name, value) in [
            ("episode_batch_size", sync.episode_batch_size),
            ("show_batch_size", sync.show_batch_size),
            ("movie_batch_size", sync.movie_batch_size),
            ("list_batch_size", sync.list_batch_size),
            ("local_batch_size", sync.local_batch_size),
        ] {
            if value == 0 {
                return Err(anyhow::anyhow!("{} must be greater than zero", name));
            }
        }
        if !(0..=MAX_RATING_TOLERANCE_MINUTES).contains(&sync.rating_tolerance_minutes) {
            return Err(anyhow::anyhow!(
                "rating_tolerance_minutes must be between 0 and {}",
                MAX_RATING_TOLERANCE_MINUTES
            ));
        }
        if !(0..=MAX_SHOW_REFRESH_INTERVAL_HOURS).contains(&sync.show_refresh_interval_hours) {
            return Err(anyhow::anyhow!(
                "show_refresh_interval_hours must be between 0 and {}",
                MAX_SHOW_REFRESH_INTERVAL_HOURS
            ));
        }

        let scheduler = &self.scheduler;
        if !(1..=MAX_SCHEDULER_MINUTES).contains(&scheduler.interval_minutes) {
            return Err(anyhow::anyhow!("interval_minutes must be between 1 and {}", MAX_SCHEDULER_MINUTES));
        }
        if !(1..=MAX_SCHEDULER_MINUTES).contains(&scheduler.backoff_base_minutes) {
            return Err(anyhow::anyhow!(
                "backoff_base_minutes must be between 1 and {}",
                MAX_SCHEDULER_MINUTES
            ));
        }
        if scheduler.backoff_max_exponent > MAX_BACKOFF_EXPONENT {
            return Err(anyhow::anyhow!("backoff_max_exponent must be at most {}", MAX_BACKOFF_EXPONENT));
        }
        Ok(())
    }

    pub fn is_cloud_enabled(&self) -> bool {
        self.cloud.as_ref().map(|c| c.enabled).unwrap_or(false)
    }

    pub fn is_social_enabled(&self) -> bool {
        self.social.as_ref().map(|s| s.enabled).unwrap_or(false)
    }
}
