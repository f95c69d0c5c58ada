use anyhow::Result;
use std::path::{Path, PathBuf};

/// Base directory from `SHOWSYNC_BASE_PATH`, if set.
pub fn base_path_override() -> Option<PathBuf> {
    std::env::var("SHOWSYNC_BASE_PATH").ok().map(PathBuf::from)
}

pub struct PathManager {
    config_dir: PathBuf,
    data_dir: PathBuf,
    log_dir: PathBuf,
}

impl PathManager {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("showsync");
        Ok(Self::from_base(base_dir))
    }

    pub fn from_base(base: PathBuf) -> Self {
        Self {
            config_dir: base.clone(),
            data_dir: base.join("data"),
            log_dir: base.join("logs"),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Checkpoints, back-off state and tokens.
    pub fn state_file(&self) -> PathBuf {
        self.config_dir.join("state.toml")
    }

    /// Local entity store.
    pub fn store_file(&self) -> PathBuf {
        self.data_dir.join("store.json")
    }

    pub fn daemon_log_file(&self) -> PathBuf {
        self.log_dir.join("showsync.log")
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }
}

impl Default for PathManager {
    fn default() -> Self {
        if let Some(base) = base_path_override() {
            return Self::from_base(base);
        }
        Self::new().unwrap_or_else(|_| Self::from_base(PathBuf::from(".showsync")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_live_under_base() {
        let paths = PathManager::from_base(PathBuf::from("/tmp/showsync-test"));
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/showsync-test/config.toml"));
        assert_eq!(paths.state_file(), PathBuf::from("/tmp/showsync-test/state.toml"));
        assert_eq!(paths.store_file(), PathBuf::from("/tmp/showsync-test/data/store.json"));
        assert_eq!(paths.daemon_log_file(), PathBuf::from("/tmp/showsync-test/logs/showsync.log"));
    }
}
