// HTML Renderer
// Produces the editor markup for a Document. Output is a fragment (no <html>/<body>),
// one block per line.

use super::structured_document::{BlockNode, Document, EmphasisKind, InlineNode};

/// Render a document as editor markup
pub fn document_to_html(doc: &Document) -> String {
    doc.blocks()
        .iter()
        .map(block_to_html)
        .collect::<Vec<_>>()
        .join("\n")
}

fn block_to_html(block: &BlockNode) -> String {
    let mut out = String::new();
    match block {
        BlockNode::Heading { level, content } => {
            let level = level.get();
            out.push_str(&format!("<h{level}>"));
            push_inlines(content, &mut out);
            out.push_str(&format!("</h{level}>"));
        }
        BlockNode::Paragraph(content) => {
            out.push_str("<p>");
            push_inlines(content, &mut out);
            out.push_str("</p>");
        }
        BlockNode::List(list) => {
            let tag = if list.ordered() { "ol" } else { "ul" };
            out.push_str(&format!("<{tag}>"));
            for item in list.items() {
                out.push_str("<li>");
                push_inlines(item, &mut out);
                out.push_str("</li>");
            }
            out.push_str(&format!("</{tag}>"));
        }
        BlockNode::CodeBlock(text) => {
            out.push_str("<pre><code>");
            out.push_str(&escape_text(text));
            out.push_str("</code></pre>");
        }
    }
    out
}

/// Render an inline run
pub fn inlines_to_html(run: &[InlineNode]) -> String {
    let mut out = String::new();
    push_inlines(run, &mut out);
    out
}

fn push_inlines(run: &[InlineNode], out: &mut String) {
    for node in run {
        push_inline(node, out);
    }
}

fn push_inline(node: &InlineNode, out: &mut String) {
    match node {
        InlineNode::Text(text) => out.push_str(&escape_text(text).replace('\n', "<br>")),
        InlineNode::Emphasis { kind, children } => {
            let (open, close) = match kind {
                EmphasisKind::Bold => ("<strong>", "</strong>"),
                EmphasisKind::Italic => ("<em>", "</em>"),
                EmphasisKind::BoldItalic => ("<strong><em>", "</em></strong>"),
            };
            out.push_str(open);
            push_inlines(children, out);
            out.push_str(close);
        }
        InlineNode::Strikethrough(children) => {
            out.push_str("<s>");
            push_inlines(children, out);
            out.push_str("</s>");
        }
        InlineNode::Underline(children) => {
            out.push_str("<u>");
            push_inlines(children, out);
            out.push_str("</u>");
        }
        InlineNode::Code(text) => {
            out.push_str("<code>");
            out.push_str(&escape_text(text));
            out.push_str("</code>");
        }
        InlineNode::Link { href, children } => {
            out.push_str("<a href=\"");
            out.push_str(&escape_attribute(href.as_str()));
            out.push_str("\">");
            push_inlines(children, out);
            out.push_str("</a>");
        }
    }
}

/// Escape `&` first so entities produced for `<` and `>` are not escaped twice
pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}
