use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::content::ContentProvider;
use crate::document::NoteStorage;
use crate::error::StoreError;

pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_millis(2000);
pub const UNTITLED_NOTE: &str = "Untitled Note";

/// Where the coordinator is in its save cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoSavePhase {
    Idle,
    PendingTimer,
    Saving,
}

/// A save that has been started and must be handed back through
/// [`AutoSaveState::complete`] once storage has answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy)]
struct SaveStamp {
    at: Instant,
    wall: DateTime<Local>,
}

/// Debounced autosave for one open note.
///
/// Only one save is in flight at a time. Time is passed in by the caller.
#[derive(Debug)]
pub struct AutoSaveState {
    delay: Duration,
    /// When the pending debounce timer fires
    deadline: Option<Instant>,
    /// Whether a save operation is currently in progress
    saving: bool,
    /// Title the note was last stored under
    title_of_record: Option<String>,
    /// Markdown as last stored, to detect changes
    saved_content: Option<String>,
    last_change_time: Option<Instant>,
    last_save: Option<SaveStamp>,
    last_error: Option<String>,
    /// Title used when the editor's title is blank
    default_title: String,
}

impl AutoSaveState {
    pub fn new(delay: Duration) -> Self {
        AutoSaveState {
            delay,
            deadline: None,
            saving: false,
            title_of_record: None,
            saved_content: None,
            last_change_time: None,
            last_save: None,
            last_error: None,
            default_title: UNTITLED_NOTE.to_string(),
        }
    }

    /// Save blank-titled notes under `title` instead of "Untitled Note"
    pub fn with_default_title(mut self, title: impl Into<String>) -> Self {
        self.default_title = title.into();
        self
    }

    pub fn default_title(&self) -> &str {
        &self.default_title
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn phase(&self) -> AutoSavePhase {
        if self.saving {
            AutoSavePhase::Saving
        } else if self.deadline.is_some() {
            AutoSavePhase::PendingTimer
        } else {
            AutoSavePhase::Idle
        }
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn title_of_record(&self) -> Option<&str> {
        self.title_of_record.as_deref()
    }

    pub fn saved_content(&self) -> Option<&str> {
        self.saved_content.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Reset state when switching to another note. `content` is the Markdown it was loaded
    /// from, `None` for a note that was never stored.
    pub fn reset_for_note(&mut self, title: Option<&str>, content: Option<&str>) {
        self.deadline = None;
        self.saving = false;
        self.title_of_record = title.map(str::to_string);
        self.saved_content = content.map(str::to_string);
        self.last_change_time = None;
        self.last_save = None;
        self.last_error = None;
    }

    /// Mark that content has changed, restarting the debounce timer
    pub fn mark_changed(&mut self, now: Instant) {
        self.last_change_time = Some(now);
        self.deadline = Some(now + self.delay);
    }

    /// Fire the debounce timer if it is due. While a save is in flight a due timer
    /// stays pending and fires on the first poll after that save completes.
    pub fn poll<T: ContentProvider + ?Sized>(
        &mut self,
        editor: &T,
        now: Instant,
    ) -> Option<SaveRequest> {
        let deadline = self.deadline?;
        if now < deadline || self.saving {
            return None;
        }
        self.deadline = None;
        self.begin(editor, false)
    }

    /// Manual save. Does nothing while a save is in flight, otherwise cancels a pending
    /// timer and starts saving right away.
    pub fn request_save<T: ContentProvider + ?Sized>(&mut self, editor: &T) -> Option<SaveRequest> {
        if self.saving {
            debug!("save already in flight, ignoring request");
            return None;
        }
        self.deadline = None;
        self.begin(editor, true)
    }

    fn begin<T: ContentProvider + ?Sized>(&mut self, editor: &T, force: bool) -> Option<SaveRequest> {
        let title = effective_title(&editor.get_title(), &self.default_title);
        let content = editor.get_content();

        let unchanged = self.title_of_record.as_deref() == Some(title.as_str())
            && self.saved_content.as_deref() == Some(content.as_str());
        if unchanged && !force {
            debug!(title, "note unchanged, skipping save");
            return None;
        }

        self.saving = true;
        Some(SaveRequest { title, content })
    }

    /// Finish the in-flight save with the storage result. Success updates the
    /// title-of-record; failure is recorded and returned, never retried.
    pub fn complete(
        &mut self,
        request: SaveRequest,
        result: Result<(), StoreError>,
        now: Instant,
    ) -> Result<(), StoreError> {
        self.saving = false;
        match result {
            Ok(()) => {
                info!(title = request.title, "note saved");
                self.title_of_record = Some(request.title);
                self.saved_content = Some(request.content);
                self.last_save = Some(SaveStamp {
                    at: now,
                    wall: Local::now(),
                });
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                warn!(title = request.title, error = %err, "failed to save note");
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Run a whole save synchronously against `storage`
    pub fn trigger_save<T, S>(&mut self, editor: &T, storage: &S, now: Instant) -> Result<(), StoreError>
    where
        T: ContentProvider + ?Sized,
        S: NoteStorage + ?Sized,
    {
        // Don't save if already saving
        if self.saving {
            return Ok(());
        }
        self.deadline = None;

        let Some(request) = self.begin(editor, false) else {
            return Ok(());
        };
        let result = storage.save_note(&request.title, &request.content);
        self.complete(request, result, now)
    }

    /// Get the status text for display
    pub fn status_text(&self, now: Instant) -> String {
        if self.saving {
            return "Saving...".to_string();
        }

        if let Some(save) = self.last_save {
            format_time_since(now.saturating_duration_since(save.at), save.wall)
        } else if self.last_change_time.is_some() {
            "not saved".to_string()
        } else {
            String::new()
        }
    }
}

impl Default for AutoSaveState {
    fn default() -> Self {
        Self::new(DEFAULT_AUTOSAVE_DELAY)
    }
}

/// Title a note is saved under, `fallback` when the editor's title is blank
pub fn effective_title(raw: &str, fallback: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        fallback.trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Format the age of a save as a human-readable string
pub fn format_time_since(elapsed: Duration, saved_at: DateTime<Local>) -> String {
    let secs = elapsed.as_secs();

    if secs < 60 {
        "saved just now".to_string()
    } else if secs < 3600 {
        let mins = secs / 60;
        if mins == 1 {
            "saved 1 min ago".to_string()
        } else {
            format!("saved {} min ago", mins)
        }
    } else if secs < 86400 {
        let hours = secs / 3600;
        if hours == 1 {
            "saved 1 hour ago".to_string()
        } else {
            format!("saved {} hours ago", hours)
        }
    } else if secs < 604800 {
        let days = secs / 86400;
        if days == 1 {
            "saved 1 day ago".to_string()
        } else {
            format!("saved {} days ago", days)
        }
    } else {
        format!("saved {}", saved_at.format("%Y-%m-%d"))
    }
}
