// Note Session
// One open note: the edit surface, its autosave coordinator and the status indicator,
// wired to a storage backend. Drive it with edits and periodic `tick` calls.

use std::time::Instant;

use tracing::info;

use crate::autosave::{AutoSaveState, effective_title};
use crate::config::Config;
use crate::content::{ContentLoader, ContentProvider, MarkupBuffer};
use crate::document::NoteStorage;
use crate::error::StoreError;
use crate::statusbar::StatusBar;

pub const PLACEHOLDER_MARKUP: &str = "<p>Start typing your note...</p>";

pub struct NoteSession<S: NoteStorage> {
    storage: S,
    editor: MarkupBuffer,
    autosave: AutoSaveState,
    status: StatusBar,
    default_title: String,
}

impl<S: NoteStorage> NoteSession<S> {
    /// Start a session with a fresh note
    pub fn new(storage: S, config: &Config) -> Self {
        let mut session = NoteSession {
            storage,
            editor: MarkupBuffer::default(),
            autosave: AutoSaveState::new(config.autosave_delay())
                .with_default_title(&config.default_title),
            status: StatusBar::new(config.status_duration()),
            default_title: config.default_title.clone(),
        };
        session.new_note();
        session
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn editor(&self) -> &MarkupBuffer {
        &self.editor
    }

    pub fn autosave(&self) -> &AutoSaveState {
        &self.autosave
    }

    pub fn status(&self) -> &StatusBar {
        &self.status
    }

    /// Title the note would be saved under right now
    pub fn current_title(&self) -> String {
        effective_title(&self.editor.get_title(), &self.default_title)
    }

    pub fn new_note(&mut self) {
        self.editor.set_title(&self.default_title);
        self.editor.set_markup(PLACEHOLDER_MARKUP);
        self.autosave.reset_for_note(None, None);
    }

    pub fn edit_markup(&mut self, markup: &str, now: Instant) {
        self.editor.set_markup(markup);
        self.autosave.mark_changed(now);
    }

    pub fn set_title(&mut self, title: &str, now: Instant) {
        self.editor.set_title(title);
        self.autosave.mark_changed(now);
    }

    /// Run a due autosave. Success is silent; failures go to the status bar.
    pub fn tick(&mut self, now: Instant) -> Option<Result<(), StoreError>> {
        let request = self.autosave.poll(&self.editor, now)?;
        let result = self.storage.save_note(&request.title, &request.content);
        let outcome = self.autosave.complete(request, result, now);
        if let Err(err) = &outcome {
            self.status.error(format!("Error: {err}"), now);
        }
        Some(outcome)
    }

    /// Manual save, always reported in the status bar
    pub fn save_now(&mut self, now: Instant) -> Result<(), StoreError> {
        let Some(request) = self.autosave.request_save(&self.editor) else {
            return Ok(());
        };
        self.status.saving(now);

        let result = self.storage.save_note(&request.title, &request.content);
        match self.autosave.complete(request, result, now) {
            Ok(()) => {
                self.status.success("Saved!", now);
                Ok(())
            }
            Err(err) => {
                self.status.error(format!("Error: {err}"), now);
                Err(err)
            }
        }
    }

    /// Replace the editor content with a stored note
    pub fn load_note(&mut self, title: &str, now: Instant) -> Result<(), StoreError> {
        match self.storage.load_note(title) {
            Ok(markdown) => {
                self.editor.set_title(title);
                self.editor.set_content_from_markdown(&markdown);
                let content = self.editor.get_content();
                self.autosave.reset_for_note(Some(title), Some(&content));
                self.status.success(format!("Loaded: {title}"), now);
                Ok(())
            }
            Err(err) => {
                self.status.error(format!("Error: {err}"), now);
                Err(err)
            }
        }
    }

    pub fn delete_note(&mut self, title: &str, now: Instant) -> Result<(), StoreError> {
        match self.storage.delete_note(title) {
            Ok(()) => {
                info!(title, "note removed by user");
                self.status.success(format!("Deleted: {title}"), now);
                Ok(())
            }
            Err(err) => {
                self.status.error(format!("Error: {err}"), now);
                Err(err)
            }
        }
    }

    pub fn list_notes(&self) -> Result<Vec<String>, StoreError> {
        self.storage.list_notes()
    }
}
