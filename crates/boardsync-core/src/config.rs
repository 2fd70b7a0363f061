use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::BoardResult;

const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;
const DEFAULT_EVENT_CAPACITY: usize = 16;
const DEFAULT_JOURNAL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between background board refreshes.
    #[serde(default)]
    pub refresh_interval_secs: Option<u64>,

    /// `tracing` filter directive used when `RUST_LOG` is not set.
    #[serde(default)]
    pub log_filter: Option<String>,

    /// Buffer size of the snapshot change broadcast.
    #[serde(default)]
    pub event_capacity: Option<usize>,

    /// Number of diagnostic entries kept in the move journal.
    #[serde(default)]
    pub journal_capacity: Option<usize>,
}

impl EngineConfig {
    pub fn config_path() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            dirs::home_dir().map(|home| home.join(".config/boardsync/config.toml"))
        }
        #[cfg(target_os = "linux")]
        {
            dirs::config_dir().map(|config| config.join("boardsync/config.toml"))
        }
        #[cfg(target_os = "windows")]
        {
            dirs::config_dir().map(|config| config.join("boardsync\\config.toml"))
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }

    /// Load from the platform config path, falling back to defaults.
    pub fn load() -> Self {
        if let Some(config_path) = Self::config_path() {
            if config_path.exists() {
                match Self::load_from(&config_path) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!(
                            "Ignoring invalid config at {}: {}",
                            config_path.display(),
                            e
                        );
                    }
                }
            }
        }
        Self::default()
    }

    pub fn load_from(path: &Path) -> BoardResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn refresh_interval(&self) -> Duration {
        let secs = self
            .refresh_interval_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS);
        Duration::from_secs(secs)
    }

    pub fn effective_log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or("boardsync=info")
    }

    pub fn effective_event_capacity(&self) -> usize {
        self.event_capacity
            .filter(|cap| *cap > 0)
            .unwrap_or(DEFAULT_EVENT_CAPACITY)
    }

    pub fn effective_journal_capacity(&self) -> usize {
        self.journal_capacity
            .filter(|cap| *cap > 0)
            .unwrap_or(DEFAULT_JOURNAL_CAPACITY)
    }
}
