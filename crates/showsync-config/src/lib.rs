pub mod config;
pub mod paths;
pub mod state;

pub use config::{CloudConfig, Config, SchedulerConfig, SocialConfig, SyncOptions};
pub use paths::{base_path_override, PathManager};
pub use state::StateStore;
