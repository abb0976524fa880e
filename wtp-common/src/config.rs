//! Configuration loading and root folder resolution
//!
//! Two tiers:
//! 1. **TOML bootstrap**: database path, backend URL, logging, policy values
//! 2. **Database runtime**: overrides read from the `settings` table by the
//!    player crate
//!
//! Workout policy values (countdown length, seconds per rep, fallback work
//! duration, default rest) are product configuration, not constants.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "WTP_ROOT_FOLDER";

/// Step generation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SequencerPolicy {
    /// Length of the COUNTDOWN step before each exercise
    pub countdown_sec: u32,
    /// Work seconds credited per prescribed rep
    pub seconds_per_rep: u32,
    /// Work duration when neither fixed duration nor reps are usable
    pub fallback_work_sec: u32,
    /// Rest used when a block carries no rest value
    pub default_rest_sec: u32,
}

impl Default for SequencerPolicy {
    fn default() -> Self {
        Self {
            countdown_sec: 3,
            seconds_per_rep: 2,
            fallback_work_sec: 30,
            default_rest_sec: 60,
        }
    }
}

/// Player runtime configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Persisted sessions older than this are abandoned
    pub staleness_hours: u64,
    /// Safety-net persistence period while running
    pub persist_interval_ms: u64,
    /// Tick loop period while running (one "frame")
    pub frame_interval_ms: u64,
    /// Vibrate alongside audio cues
    pub vibration_enabled: bool,
    /// Event bus capacity
    pub event_capacity: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            staleness_hours: 4,
            persist_interval_ms: 5_000,
            frame_interval_ms: 50,
            vibration_enabled: true,
            event_capacity: 256,
        }
    }
}

impl PlayerConfig {
    pub fn staleness_window(&self) -> Duration {
        Duration::from_secs(self.staleness_hours * 3600)
    }

    pub fn persist_interval(&self) -> Duration {
        Duration::from_millis(self.persist_interval_ms.max(1))
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Root folder for the database and local state
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// SQLite database path (defaults to `<root_folder>/wtp.db`)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Base URL of the session backend; offline logging backend when absent
    #[serde(default)]
    pub backend_url: Option<String>,

    /// User identifier passed to the finalize call
    #[serde(default)]
    pub user_id: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub policy: SequencerPolicy,

    #[serde(default)]
    pub player: PlayerConfig,
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Load configuration from an explicit file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from an explicit path, else the platform config file, else defaults
    ///
    /// A missing platform config file is not an error.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_config_file() {
            Some(path) => Self::load(&path),
            None => {
                warn!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Database file, derived from the root folder when not set
    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| root_folder.join("wtp.db"))
    }
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config value
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config: Option<&TomlConfig>,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(root) = config.and_then(|c| c.root_folder.clone()) {
        return root;
    }

    default_root_folder()
}

/// Platform config file, if one exists
///
/// Linux checks `~/.config/wtp/config.toml` then `/etc/wtp/config.toml`.
pub fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("wtp").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/wtp/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("wtp"))
        .unwrap_or_else(|| PathBuf::from("./wtp_data"))
}
