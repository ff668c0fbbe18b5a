// HTML Parser
// Reads editor markup (contenteditable output, pasted HTML) into a Document.
// Parsing is lenient: html5ever repairs broken markup, unknown inline tags are
// transparent, unknown block tags degrade to paragraphs and nothing ever fails.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use tracing::{debug, trace};

use super::structured_document::{BlockNode, Document, Href, InlineNode};

/// How a tag takes part in the document structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Heading(u8),
    Paragraph,
    List { ordered: bool },
    Preformatted,
    /// Walked for the blocks it contains
    Container,
    /// Any other block-level tag, read as a paragraph
    OtherBlock,
    Ignored,
    Inline,
}

fn classify(tag: &str) -> TagKind {
    match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => TagKind::Heading(tag.as_bytes()[1] - b'0'),
        "p" => TagKind::Paragraph,
        "ul" => TagKind::List { ordered: false },
        "ol" => TagKind::List { ordered: true },
        "pre" => TagKind::Preformatted,
        "div" | "body" | "html" => TagKind::Container,
        "blockquote" | "section" | "article" | "header" | "footer" | "main" | "nav" | "aside"
        | "figure" | "form" | "fieldset" | "details" | "li" | "table" | "thead" | "tbody"
        | "tfoot" | "tr" | "td" | "th" | "caption" | "dl" | "dt" | "dd" | "hr" | "address"
        | "figcaption" | "summary" | "legend" => TagKind::OtherBlock,
        "script" | "style" | "head" | "title" | "meta" | "link" | "img" | "noscript"
        | "template" | "iframe" | "object" | "svg" => TagKind::Ignored,
        _ => TagKind::Inline,
    }
}

/// Parse editor markup into a normalized document
pub fn parse_html(html: &str) -> Document {
    let dom = parse_document(RcDom::default(), Default::default()).one(html);

    let mut builder = BlockBuilder::default();
    match find_element(&dom.document, "body") {
        Some(body) => builder.walk_children(&body),
        None => debug!("markup has no body element"),
    }
    builder.flush_loose();

    Document::from_blocks(builder.blocks).normalized()
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<BlockNode>,
    /// Inline content seen outside of any block element
    loose: Vec<InlineNode>,
}

impl BlockBuilder {
    fn walk_children(&mut self, node: &Handle) {
        for child in node.children.borrow().iter() {
            self.walk(child);
        }
    }

    fn walk(&mut self, node: &Handle) {
        let NodeData::Element { name, .. } = &node.data else {
            push_inline(node, &mut self.loose);
            return;
        };
        let tag: &str = &name.local;

        match classify(tag) {
            TagKind::Inline => push_inline(node, &mut self.loose),
            TagKind::Ignored => trace!(tag, "skipping element"),
            TagKind::Heading(level) => {
                self.flush_loose();
                if let Some(block) = BlockNode::heading(level, inline_run(node)) {
                    self.blocks.push(block);
                }
            }
            TagKind::Paragraph => {
                self.flush_loose();
                self.blocks.push(BlockNode::Paragraph(inline_run(node)));
            }
            TagKind::List { ordered } => {
                self.flush_loose();
                self.push_list(node, ordered);
            }
            TagKind::Preformatted => {
                self.flush_loose();
                self.blocks.push(BlockNode::CodeBlock(text_content(node)));
            }
            TagKind::Container => {
                self.flush_loose();
                self.walk_children(node);
                self.flush_loose();
            }
            TagKind::OtherBlock => {
                debug!(tag, "unsupported block element read as a paragraph");
                self.flush_loose();
                self.blocks.push(BlockNode::Paragraph(inline_run(node)));
            }
        }
    }

    fn push_list(&mut self, node: &Handle, ordered: bool) {
        let mut items = Vec::new();
        for child in node.children.borrow().iter() {
            match &child.data {
                NodeData::Element { name, .. } if &*name.local == "li" => {
                    items.push(inline_run(child));
                }
                NodeData::Element { name, .. } => {
                    debug!(tag = &*name.local, "list child outside <li> read as an item");
                    let mut item = Vec::new();
                    push_inline(child, &mut item);
                    items.push(finish_run(item));
                }
                _ => {}
            }
        }
        match BlockNode::list(ordered, items) {
            Some(block) => self.blocks.push(block),
            None => debug!("dropping list without items"),
        }
    }

    fn flush_loose(&mut self) {
        if self.loose.is_empty() {
            return;
        }
        let run = finish_run(std::mem::take(&mut self.loose));
        self.blocks.push(BlockNode::Paragraph(run));
    }
}

fn find_element(node: &Handle, tag: &str) -> Option<Handle> {
    if let NodeData::Element { name, .. } = &node.data {
        if &*name.local == tag {
            return Some(node.clone());
        }
    }
    node.children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, tag))
}

/// Inline content of an element, with whitespace collapsed the way a browser shows it
fn inline_run(node: &Handle) -> Vec<InlineNode> {
    let mut run = Vec::new();
    push_children(node, &mut run);
    finish_run(run)
}

fn finish_run(mut run: Vec<InlineNode>) -> Vec<InlineNode> {
    let mut prev_space = true;
    squeeze_spaces(&mut run, &mut prev_space);
    run
}

fn push_children(node: &Handle, out: &mut Vec<InlineNode>) {
    for child in node.children.borrow().iter() {
        push_inline(child, out);
    }
}

fn push_inline(node: &Handle, out: &mut Vec<InlineNode>) {
    match &node.data {
        NodeData::Text { contents } => {
            let contents = contents.borrow();
            out.push(InlineNode::Text(collapse_whitespace(&contents)));
        }
        NodeData::Element { name, attrs, .. } => {
            let tag: &str = &name.local;
            match classify(tag) {
                TagKind::Inline => {
                    let href = attrs
                        .borrow()
                        .iter()
                        .find(|attr| &*attr.name.local == "href")
                        .map(|attr| attr.value.to_string());
                    let style = attrs
                        .borrow()
                        .iter()
                        .find(|attr| &*attr.name.local == "style")
                        .map(|attr| attr.value.to_string());
                    push_inline_element(tag, href, style.as_deref(), node, out);
                }
                TagKind::Ignored => trace!(tag, "skipping element"),
                TagKind::Preformatted => out.push(InlineNode::Code(text_content(node))),
                TagKind::List { .. } => {
                    debug!(tag, "nested list flattened into its parent");
                    push_block_break(out);
                    push_children(node, out);
                }
                _ => {
                    push_block_break(out);
                    push_children(node, out);
                }
            }
        }
        _ => {}
    }
}

fn push_block_break(out: &mut Vec<InlineNode>) {
    if !out.is_empty() {
        out.push(InlineNode::text("\n"));
    }
}

fn push_inline_element(
    tag: &str,
    href: Option<String>,
    style: Option<&str>,
    node: &Handle,
    out: &mut Vec<InlineNode>,
) {
    match tag {
        "br" => {
            out.push(InlineNode::text("\n"));
            return;
        }
        "code" | "kbd" | "samp" | "tt" => {
            out.push(InlineNode::Code(text_content(node)));
            return;
        }
        _ => {}
    }

    let mut children = Vec::new();
    push_children(node, &mut children);

    let wrapped = match tag {
        "b" | "strong" => InlineNode::bold(children),
        "i" | "em" => InlineNode::italic(children),
        "s" | "strike" | "del" => InlineNode::strikethrough(children),
        "u" | "ins" => InlineNode::underline(children),
        "a" => match href.and_then(Href::new) {
            Some(href) => InlineNode::Link { href, children },
            None => {
                debug!("anchor without a target read as plain content");
                out.extend(children);
                return;
            }
        },
        "span" | "font" => {
            out.extend(apply_style(style.unwrap_or_default(), children));
            return;
        }
        _ => {
            trace!(tag, "unknown inline element is transparent");
            out.extend(children);
            return;
        }
    };
    out.push(wrapped);
}

/// Wrap `children` in the formatting an inline `style` attribute asks for
fn apply_style(style: &str, children: Vec<InlineNode>) -> Vec<InlineNode> {
    let mut run = children;
    let mut wrappers: Vec<fn(Vec<InlineNode>) -> InlineNode> = Vec::new();

    for declaration in style.split(';') {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        let property = property.trim().to_ascii_lowercase();
        let value = value.trim().to_ascii_lowercase();
        match property.as_str() {
            "font-weight" => {
                let heavy = value.parse::<u16>().map(|w| w >= 600).unwrap_or(false);
                if value == "bold" || value == "bolder" || heavy {
                    wrappers.push(InlineNode::bold);
                }
            }
            "font-style" if value == "italic" || value == "oblique" => {
                wrappers.push(InlineNode::italic)
            }
            "text-decoration" | "text-decoration-line" => {
                if value.contains("underline") {
                    wrappers.push(InlineNode::underline);
                }
                if value.contains("line-through") {
                    wrappers.push(InlineNode::strikethrough);
                }
            }
            _ => {}
        }
    }

    for wrap in wrappers.into_iter().rev() {
        run = vec![wrap(run)];
    }
    run
}

/// Text of an element exactly as written, `<br>` read as a line break
fn text_content(node: &Handle) -> String {
    let mut text = String::new();
    push_text_content(node, &mut text);
    text
}

fn push_text_content(node: &Handle, text: &mut String) {
    match &node.data {
        NodeData::Text { contents } => text.push_str(&contents.borrow()),
        NodeData::Element { name, .. } => match &*name.local {
            "br" => text.push('\n'),
            tag if classify(tag) == TagKind::Ignored => {}
            _ => {
                for child in node.children.borrow().iter() {
                    push_text_content(child, text);
                }
            }
        },
        _ => {}
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut collapsed = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_space {
                collapsed.push(' ');
            }
            in_space = true;
        } else {
            collapsed.push(c);
            in_space = false;
        }
    }
    collapsed
}

/// Drop spaces that follow another space or a line break anywhere in the run,
/// and turn non-breaking spaces into plain ones
fn squeeze_spaces(run: &mut [InlineNode], prev_space: &mut bool) {
    for node in run.iter_mut() {
        match node {
            InlineNode::Text(text) => {
                let mut squeezed = String::with_capacity(text.len());
                for c in text.chars() {
                    match c {
                        ' ' if *prev_space => {}
                        ' ' | '\n' => {
                            squeezed.push(c);
                            *prev_space = true;
                        }
                        '\u{a0}' => {
                            squeezed.push(' ');
                            *prev_space = false;
                        }
                        _ => {
                            squeezed.push(c);
                            *prev_space = false;
                        }
                    }
                }
                *text = squeezed;
            }
            InlineNode::Code(text) => *prev_space = text.ends_with(' '),
            InlineNode::Emphasis { children, .. }
            | InlineNode::Strikethrough(children)
            | InlineNode::Underline(children)
            | InlineNode::Link { children, .. } => squeeze_spaces(children, prev_space),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> InlineNode {
        InlineNode::text(s)
    }

    #[test]
    fn test_basic_blocks() {
        let doc = parse_html("<h1>Title</h1><p>Some <b>bold</b> and <i>italic</i> text.</p>");
        assert_eq!(
            doc.blocks(),
            &[
                BlockNode::heading(1, vec![t("Title")]).unwrap(),
                BlockNode::paragraph(vec![
                    t("Some "),
                    InlineNode::bold(vec![t("bold")]),
                    t(" and "),
                    InlineNode::italic(vec![t("italic")]),
                    t(" text."),
                ]),
            ]
        );
    }

    #[test]
    fn test_whitespace_collapses() {
        let doc = parse_html("<p>\n  a   <em> b </em>\tc&nbsp;d  </p>");
        assert_eq!(
            doc.blocks(),
            &[BlockNode::paragraph(vec![
                t("a "),
                InlineNode::italic(vec![t("b")]),
                t(" c d"),
            ])]
        );
    }

    #[test]
    fn test_line_breaks() {
        let doc = parse_html("<p>one<br>two<br/> three</p>");
        assert_eq!(doc.blocks(), &[BlockNode::paragraph(vec![t("one\ntwo\nthree")])]);
    }

    #[test]
    fn test_loose_content_becomes_paragraph() {
        let doc = parse_html("hello <u>world</u><p>next</p>tail");
        assert_eq!(
            doc.blocks(),
            &[
                BlockNode::paragraph(vec![t("hello "), InlineNode::underline(vec![t("world")])]),
                BlockNode::paragraph(vec![t("next")]),
                BlockNode::paragraph(vec![t("tail")]),
            ]
        );
    }

    #[test]
    fn test_divs() {
        let doc = parse_html("<div>first line</div><div><h2>Head</h2><div>inner</div></div>");
        assert_eq!(
            doc.blocks(),
            &[
                BlockNode::paragraph(vec![t("first line")]),
                BlockNode::heading(2, vec![t("Head")]).unwrap(),
                BlockNode::paragraph(vec![t("inner")]),
            ]
        );
    }

    #[test]
    fn test_lists_and_nested_lists() {
        let doc = parse_html(
            "<ol><li>one</li><li>two<ul><li>deep</li></ul></li></ol><ul><li>x</li></ul>",
        );
        assert_eq!(
            doc.blocks(),
            &[
                BlockNode::list(true, vec![vec![t("one")], vec![t("two deep")]]).unwrap(),
                BlockNode::list(false, vec![vec![t("x")]]).unwrap(),
            ]
        );
    }

    #[test]
    fn test_pre_is_verbatim() {
        let doc = parse_html("<pre><code>fn main() {\n    <b>x</b> &lt; 1;\n}</code></pre>");
        assert_eq!(
            doc.blocks(),
            &[BlockNode::code_block("fn main() {\n    x < 1;\n}")]
        );
    }

    #[test]
    fn test_links() {
        let doc = parse_html(r#"<p><a href="https://a.b">go</a> <a>bare</a> <a href="">empty</a></p>"#);
        assert_eq!(
            doc.blocks(),
            &[BlockNode::paragraph(vec![
                InlineNode::link("https://a.b", vec![t("go")]).unwrap(),
                t(" bare empty"),
            ])]
        );
    }

    #[test]
    fn test_ignored_and_unknown_elements() {
        let doc = parse_html(
            "<style>p{}</style><script>alert(1)</script><p>a<img src=x><span>b</span><mark>c</mark><!-- note --></p>",
        );
        assert_eq!(doc.blocks(), &[BlockNode::paragraph(vec![t("abc")])]);
    }

    #[test]
    fn test_unknown_block_reads_as_paragraph() {
        let doc = parse_html("<table><tr><td>a</td><td>b</td></tr></table>");
        assert_eq!(doc.blocks(), &[BlockNode::paragraph(vec![t("a\nb")])]);

        let doc = parse_html("<blockquote><p>a</p><p>b</p></blockquote><section>c</section>");
        assert_eq!(
            doc.blocks(),
            &[
                BlockNode::paragraph(vec![t("a\nb")]),
                BlockNode::paragraph(vec![t("c")]),
            ]
        );
    }

    #[test]
    fn test_styled_spans() {
        let doc = parse_html(
            r#"<p><span style="font-weight: 700; font-style: italic">both</span> <span style="text-decoration: underline line-through">mixed</span></p>"#,
        );
        assert_eq!(
            doc.blocks(),
            &[BlockNode::paragraph(vec![
                InlineNode::bold_italic(vec![t("both")]),
                t(" "),
                InlineNode::underline(vec![InlineNode::strikethrough(vec![t("mixed")])]),
            ])]
        );
    }

    #[test]
    fn test_nested_bold_collapses() {
        let doc = parse_html("<p><strong><b>x</b></strong> <b><i>y</i></b></p>");
        assert_eq!(
            doc.blocks(),
            &[BlockNode::paragraph(vec![
                InlineNode::bold(vec![t("x")]),
                t(" "),
                InlineNode::bold_italic(vec![t("y")]),
            ])]
        );
    }

    #[test]
    fn test_malformed_markup_never_fails() {
        let doc = parse_html("<p><b>unclosed <i>tags</p><p>after");
        assert!(!doc.is_empty());
        assert_eq!(parse_html(""), Document::new());
    }
}
