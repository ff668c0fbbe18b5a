use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::StoreError;

/// Storage collaborator for notes. A note is a title (unique key) and its Markdown content.
pub trait NoteStorage {
    /// Create or overwrite a note
    fn save_note(&self, title: &str, content: &str) -> Result<(), StoreError>;

    fn load_note(&self, title: &str) -> Result<String, StoreError>;

    /// Titles of all stored notes, sorted
    fn list_notes(&self) -> Result<Vec<String>, StoreError>;

    fn delete_note(&self, title: &str) -> Result<(), StoreError>;
}

/// Notes stored as `<title>.md` files in a single directory
pub struct NoteStore {
    base_path: PathBuf,
}

impl NoteStore {
    pub fn new(base_path: PathBuf) -> Self {
        NoteStore { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// File that holds the note with this title
    pub fn note_path(&self, title: &str) -> Result<PathBuf, StoreError> {
        let title = validate_title(title)?;
        Ok(self.base_path.join(format!("{title}.md")))
    }
}

/// Titles double as file names, so they cannot point outside the notes directory
pub fn validate_title(title: &str) -> Result<&str, StoreError> {
    let trimmed = title.trim();
    let invalid = trimmed.is_empty()
        || trimmed.contains(['/', '\\'])
        || trimmed.contains("..")
        || trimmed.chars().any(char::is_control);
    if invalid {
        return Err(StoreError::InvalidTitle(title.to_string()));
    }
    Ok(trimmed)
}

impl NoteStorage for NoteStore {
    fn save_note(&self, title: &str, content: &str) -> Result<(), StoreError> {
        let path = self.note_path(title)?;
        fs::create_dir_all(&self.base_path).map_err(|source| StoreError::Io {
            context: format!("failed to create notes directory {}", self.base_path.display()),
            source,
        })?;
        fs::write(&path, content).map_err(|source| StoreError::Io {
            context: format!("failed to save '{title}'"),
            source,
        })?;
        info!(title, path = %path.display(), "saved note");
        Ok(())
    }

    fn load_note(&self, title: &str) -> Result<String, StoreError> {
        let path = self.note_path(title)?;
        match fs::read_to_string(&path) {
            Ok(content) => {
                info!(title, "loaded note");
                Ok(content)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(title.to_string()))
            }
            Err(source) => Err(StoreError::Io {
                context: format!("failed to read '{title}'"),
                source,
            }),
        }
    }

    fn list_notes(&self) -> Result<Vec<String>, StoreError> {
        if !self.base_path.exists() {
            debug!(path = %self.base_path.display(), "notes directory does not exist yet");
            return Ok(Vec::new());
        }

        let mut notes = Vec::new();
        for entry in WalkDir::new(&self.base_path).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|err| StoreError::Io {
                context: format!("failed to read directory {}", self.base_path.display()),
                source: err.into(),
            })?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|s| s.to_str()) != Some("md")
            {
                continue;
            }
            if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                notes.push(name.to_string());
            }
        }

        notes.sort();
        Ok(notes)
    }

    fn delete_note(&self, title: &str) -> Result<(), StoreError> {
        let path = self.note_path(title)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(title, "deleted note");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(title.to_string()))
            }
            Err(source) => Err(StoreError::Io {
                context: format!("failed to delete '{title}'"),
                source,
            }),
        }
    }
}
