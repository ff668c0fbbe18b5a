// Library exports for notemark

pub mod autosave;
pub mod config;
pub mod content;
pub mod document;
pub mod error;
pub mod note_session;
pub mod richtext;
pub mod statusbar;

pub use error::{ConfigError, StoreError};
