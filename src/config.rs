use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::autosave::UNTITLED_NOTE;
use crate::error::ConfigError;

const QUALIFIER: &str = "org";
const ORGANIZATION: &str = "Notemark";
const APPLICATION: &str = "notemark";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Overrides the config file location
pub const CONFIG_ENV: &str = "NOTEMARK_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the `.md` notes, platform data dir when unset
    pub notes_dir: Option<PathBuf>,
    pub autosave_delay_ms: u64,
    pub status_duration_ms: u64,
    /// Title given to new notes
    pub default_title: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            notes_dir: None,
            autosave_delay_ms: 2000,
            status_duration_ms: 3000,
            default_title: UNTITLED_NOTE.to_string(),
        }
    }
}

impl Config {
    /// Load the config file, falling back to defaults when it is missing or broken
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            debug!("no config directory available, using defaults");
            return Config::default();
        };
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Config::default();
        }
        match Self::from_file(&path) {
            Ok(config) => config,
            Err(err) => {
                warn!("{err}; using defaults");
                Config::default()
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn config_path() -> Option<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    pub fn notes_dir(&self) -> PathBuf {
        self.notes_dir
            .clone()
            .or_else(default_notes_dir)
            .unwrap_or_else(|| PathBuf::from("notes"))
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    pub fn status_duration(&self) -> Duration {
        Duration::from_millis(self.status_duration_ms)
    }
}

pub fn default_notes_dir() -> Option<PathBuf> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION).map(|dirs| dirs.data_dir().join("notes"))
}
