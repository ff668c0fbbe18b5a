use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by a note storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid note title {0:?}")]
    InvalidTitle(String),

    #[error("note '{0}' not found")]
    NotFound(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
