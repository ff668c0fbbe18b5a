use std::time::{Duration, Instant};

pub const DEFAULT_STATUS_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Saving,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
}

/// Transient status indicator. Holds the latest message and hides it once it has
/// been shown for `duration`.
#[derive(Debug, Clone)]
pub struct StatusBar {
    current: Option<(StatusMessage, Instant)>,
    duration: Duration,
}

impl StatusBar {
    pub fn new(duration: Duration) -> Self {
        StatusBar {
            current: None,
            duration,
        }
    }

    /// Show a message, replacing the current one
    pub fn show(&mut self, text: impl Into<String>, kind: StatusKind, now: Instant) {
        self.current = Some((
            StatusMessage {
                text: text.into(),
                kind,
            },
            now,
        ));
    }

    pub fn saving(&mut self, now: Instant) {
        self.show("Saving...", StatusKind::Saving, now);
    }

    pub fn success(&mut self, text: impl Into<String>, now: Instant) {
        self.show(text, StatusKind::Success, now);
    }

    pub fn error(&mut self, text: impl Into<String>, now: Instant) {
        self.show(text, StatusKind::Error, now);
    }

    /// The latest message, visible or not
    pub fn latest(&self) -> Option<&StatusMessage> {
        self.current.as_ref().map(|(message, _)| message)
    }

    /// The message to display at `now`, if it has not expired yet
    pub fn visible(&self, now: Instant) -> Option<&StatusMessage> {
        self.current
            .as_ref()
            .filter(|(_, shown)| now.saturating_duration_since(*shown) < self.duration)
            .map(|(message, _)| message)
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

impl Default for StatusBar {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_DURATION)
    }
}
