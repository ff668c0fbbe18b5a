// Rich-text document model and its two serializations: editor markup (HTML) for the
// live edit surface and Markdown for storage.

pub mod html_parser;
pub mod html_renderer;
pub mod markdown_converter;
pub mod markdown_parser;
pub mod normalize;
pub mod structured_document;

pub use markdown_converter::{
    document_to_markdown, html_to_markdown, markdown_to_document, markdown_to_html,
};
pub use structured_document::{
    BlockNode, Document, EmphasisKind, HeadingLevel, Href, InlineNode, ListBlock,
};
