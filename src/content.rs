// Common content access traits so the autosave and session code can work against any
// edit surface (a browser contenteditable, a toolkit widget, or the in-memory buffer below).

use std::cell::RefCell;
use std::rc::Rc;

use crate::richtext::{html_to_markdown, markdown_to_html};

/// Read access to the live note in the editor.
///
/// The editor holds rich-text markup; `get_content` renders it to Markdown for saving.
pub trait ContentProvider {
    fn get_markup(&self) -> String;

    fn get_title(&self) -> String;

    fn get_content(&self) -> String {
        html_to_markdown(&self.get_markup())
    }
}

/// Replaces what the editor shows, typically after a note was loaded
pub trait ContentLoader {
    fn set_markup(&mut self, markup: &str);

    fn set_title(&mut self, title: &str);

    fn set_content_from_markdown(&mut self, markdown: &str) {
        self.set_markup(&markdown_to_html(markdown));
    }
}

// Shared editors are handed around as Rc<RefCell<_>> on a single UI thread
impl<T: ContentProvider + ?Sized> ContentProvider for Rc<RefCell<T>> {
    fn get_markup(&self) -> String {
        self.borrow().get_markup()
    }

    fn get_title(&self) -> String {
        self.borrow().get_title()
    }
}

impl<T: ContentLoader + ?Sized> ContentLoader for Rc<RefCell<T>> {
    fn set_markup(&mut self, markup: &str) {
        self.borrow_mut().set_markup(markup);
    }

    fn set_title(&mut self, title: &str) {
        self.borrow_mut().set_title(title);
    }
}

/// Headless edit surface: a title field plus the editor's markup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupBuffer {
    title: String,
    markup: String,
}

impl MarkupBuffer {
    pub fn new(title: impl Into<String>, markup: impl Into<String>) -> Self {
        MarkupBuffer {
            title: title.into(),
            markup: markup.into(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }
}

impl ContentProvider for MarkupBuffer {
    fn get_markup(&self) -> String {
        self.markup.clone()
    }

    fn get_title(&self) -> String {
        self.title.clone()
    }
}

impl ContentLoader for MarkupBuffer {
    fn set_markup(&mut self, markup: &str) {
        self.markup = markup.to_string();
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }
}
