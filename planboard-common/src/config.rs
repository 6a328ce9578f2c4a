//! Configuration loading and root folder resolution
//!
//! Settings come from, highest priority first:
//! 1. Command-line arguments (and their `PLANBOARD_*` environment fallbacks)
//! 2. TOML config file
//! 3. Compiled defaults
//!
//! A missing config file is not an error; the defaults apply.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::board::BoardOptions;
use crate::scoring::{AuthorDirectory, AuthorProfile, ScoringConfig};
use crate::sync::agent::{DEFAULT_SYNC_INTERVAL, MAX_SYNC_INTERVAL, MIN_SYNC_INTERVAL};
use crate::{Error, Result};

/// HTTP server port when nothing else is configured
pub const DEFAULT_PORT: u16 = 5780;

/// Environment variable naming the data folder
pub const ROOT_FOLDER_ENV: &str = "PLANBOARD_ROOT_FOLDER";

/// Default JSONBin-style document store endpoint
pub const DEFAULT_SYNC_BASE_URL: &str = "https://api.jsonbin.io/v3/b";

const APP_DIR: &str = "planboard";

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// HTTP server port
    ///
    /// Default: 5780
    pub port: Option<u16>,

    /// Folder holding the database
    pub root_folder: Option<PathBuf>,

    /// Display name used until someone sets one through the API
    pub user: Option<String>,

    pub logging: LoggingConfig,
    pub board: BoardOptions,
    pub sync: SyncConfig,
    pub scoring: ScoringConfig,
    pub authors: Vec<AuthorProfile>,
}

impl TomlConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn author_directory(&self) -> AuthorDirectory {
        AuthorDirectory::new(self.authors.iter().cloned())
    }

    /// Reject values the board cannot run with
    pub fn validate(&self) -> Result<()> {
        self.board.validate()?;
        self.scoring.validate()?;
        self.sync.validate()?;
        if let Some(author) = self.authors.iter().find(|a| a.name.trim().is_empty()) {
            return Err(Error::Config(format!("author entry without a name: {:?}", author)));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Which shared store the board syncs with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncTransportKind {
    /// Local-only board
    #[default]
    None,
    /// JSONBin-style HTTP document store
    Http,
}

/// `[sync]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub transport: SyncTransportKind,
    pub base_url: String,
    /// Shared document id; a new one is created (and remembered) when unset
    pub bin_id: Option<String>,
    pub api_key: Option<String>,
    pub interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            transport: SyncTransportKind::None,
            base_url: DEFAULT_SYNC_BASE_URL.to_string(),
            bin_id: None,
            api_key: None,
            interval_ms: DEFAULT_SYNC_INTERVAL.as_millis() as u64,
        }
    }
}

impl SyncConfig {
    pub fn enabled(&self) -> bool {
        self.transport != SyncTransportKind::None
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        let interval = self.interval();
        if interval < MIN_SYNC_INTERVAL || interval > MAX_SYNC_INTERVAL {
            return Err(Error::Config(format!(
                "sync interval_ms must be within {}..={}, got {}",
                MIN_SYNC_INTERVAL.as_millis(),
                MAX_SYNC_INTERVAL.as_millis(),
                self.interval_ms
            )));
        }
        if self.transport == SyncTransportKind::Http && self.base_url.trim().is_empty() {
            return Err(Error::Config("sync base_url is required for the http transport".to_string()));
        }
        Ok(())
    }
}

/// Load and validate the TOML config
///
/// An explicit path must exist. Without one the platform locations are
/// searched and a missing file yields the defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!("Config file not found: {}", path.display())));
            }
            path.to_path_buf()
        }
        None => match find_config_file() {
            Some(path) => path,
            None => {
                warn!("No config file found, using defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    let config = parse_config_file(&path)?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Parse and validate one config file
pub fn parse_config_file(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
}

/// First existing config file: user config dir, then `/etc/planboard` on Linux
pub fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"));
    if let Some(path) = user_config.filter(|p| p.exists()) {
        return Some(path);
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(APP_DIR).join("config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }
    None
}

/// Root folder resolution:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&Path>, env_var_name: &str, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default data folder
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/planboard
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("/var/lib/planboard"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/planboard"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\planboard"))
    } else {
        PathBuf::from("./planboard_data")
    }
}
