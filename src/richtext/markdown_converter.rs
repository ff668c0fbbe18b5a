// Markdown Converter
// Converts between Document and Markdown text, plus the HTML <-> Markdown pipelines.
// Markdown is the storage format; every emitted character that the parser would
// read as syntax is escaped so a saved note reads back to the same document.

use std::sync::LazyLock;

use regex::Regex;

use super::html_parser::parse_html;
use super::html_renderer::document_to_html;
use super::markdown_parser::parse_markdown;
use super::structured_document::*;

static BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank run pattern"));
static BULLET_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+*]\s").expect("bullet pattern"));
static NUMBER_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.(\s|$)").expect("number pattern"));

/// Convert markdown text to a Document
pub fn markdown_to_document(markdown: &str) -> Document {
    parse_markdown(markdown)
}

/// Convert editor markup to markdown for storage
pub fn html_to_markdown(html: &str) -> String {
    document_to_markdown(&parse_html(html))
}

/// Convert stored markdown to editor markup
pub fn markdown_to_html(markdown: &str) -> String {
    document_to_html(&parse_markdown(markdown))
}

/// Convert a Document to markdown text
pub fn document_to_markdown(doc: &Document) -> String {
    let chunks: Vec<String> = doc
        .blocks()
        .iter()
        .map(|block| match block {
            BlockNode::CodeBlock(text) => fenced_code(text),
            other => BLANK_RUN_RE
                .replace_all(&block_to_markdown(other), "\n\n")
                .into_owned(),
        })
        .collect();

    chunks.join("\n\n").trim().to_string()
}

fn block_to_markdown(block: &BlockNode) -> String {
    match block {
        BlockNode::Heading { level, content } => {
            format!("{} {}", "#".repeat(level.get() as usize), inlines_to_markdown(content))
        }
        BlockNode::Paragraph(content) => escape_line_starts(&inlines_to_markdown(content)),
        BlockNode::List(list) => list
            .items()
            .iter()
            .enumerate()
            .map(|(i, item)| {
                if list.ordered() {
                    format!("{}. {}", i + 1, inlines_to_markdown(item))
                } else {
                    format!("- {}", inlines_to_markdown(item))
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
        BlockNode::CodeBlock(text) => fenced_code(text),
    }
}

/// Convert inline content to markdown
fn inlines_to_markdown(run: &[InlineNode]) -> String {
    let mut output = String::new();
    for node in run {
        push_inline(node, &mut output);
    }
    output
}

fn push_inline(node: &InlineNode, output: &mut String) {
    match node {
        InlineNode::Text(text) => output.push_str(&escape_text(text)),
        InlineNode::Emphasis { kind, children } => {
            let marker = match kind {
                EmphasisKind::BoldItalic => "***",
                EmphasisKind::Bold => "**",
                EmphasisKind::Italic => "*",
            };
            wrap(output, marker, children, marker);
        }
        InlineNode::Strikethrough(children) => wrap(output, "~~", children, "~~"),
        InlineNode::Underline(children) => wrap(output, "<u>", children, "</u>"),
        InlineNode::Code(text) => output.push_str(&code_span(text)),
        InlineNode::Link { href, children } => {
            output.push('[');
            for child in children {
                push_inline(child, output);
            }
            output.push_str("](");
            output.push_str(&escape_href(href.as_str()));
            output.push(')');
        }
    }
}

fn wrap(output: &mut String, open: &str, children: &[InlineNode], close: &str) {
    output.push_str(open);
    for child in children {
        push_inline(child, output);
    }
    output.push_str(close);
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '`' | '[' | ']' | '~' | '<') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn escape_href(href: &str) -> String {
    let mut escaped = String::with_capacity(href.len());
    for c in href.chars() {
        if matches!(c, '\\' | '(' | ')') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Paragraph lines that would read back as a heading or list item get their marker escaped
fn escape_line_starts(paragraph: &str) -> String {
    paragraph
        .split('\n')
        .map(|line| {
            let body = line.trim_start();
            let indent = &line[..line.len() - body.len()];
            if body.starts_with('#') || BULLET_START_RE.is_match(body) {
                format!("{indent}\\{body}")
            } else if let Some(caps) = NUMBER_START_RE.captures(body) {
                let digits = &caps[1];
                format!("{indent}{digits}\\{}", &body[digits.len()..])
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn longest_backtick_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn code_span(text: &str) -> String {
    let fence = "`".repeat(longest_backtick_run(text) + 1);
    let padded = text.starts_with('`')
        || text.ends_with('`')
        || (text.len() >= 2
            && text.starts_with(' ')
            && text.ends_with(' ')
            && !text.trim().is_empty());
    if padded {
        format!("{fence} {text} {fence}")
    } else {
        format!("{fence}{text}{fence}")
    }
}

fn fenced_code(text: &str) -> String {
    let fence = "`".repeat((longest_backtick_run(text) + 1).max(3));
    format!("{fence}\n{text}\n{fence}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> InlineNode {
        InlineNode::text(s)
    }

    #[test]
    fn test_document_to_markdown_paragraph() {
        let doc = Document::from_blocks(vec![BlockNode::paragraph(vec![
            t("Some "),
            InlineNode::bold(vec![t("bold")]),
            t(" and "),
            InlineNode::italic(vec![t("italic")]),
            t(" text."),
        ])]);
        assert_eq!(document_to_markdown(&doc), "Some **bold** and *italic* text.");
    }

    #[test]
    fn test_document_to_markdown_heading_and_list() {
        let doc = Document::from_blocks(vec![
            BlockNode::heading(2, vec![t("Title")]).unwrap(),
            BlockNode::list(true, vec![vec![t("one")], vec![t("two")]]).unwrap(),
            BlockNode::list(false, vec![vec![InlineNode::code("x")]]).unwrap(),
        ]);
        assert_eq!(document_to_markdown(&doc), "## Title\n\n1. one\n2. two\n\n- `x`");
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(document_to_markdown(&Document::new()), "");
    }

    #[test]
    fn test_text_escaping() {
        let doc = Document::from_blocks(vec![BlockNode::paragraph(vec![t(
            "2*3 is [not] a_link ~ <b> \\",
        )])]);
        assert_eq!(
            document_to_markdown(&doc),
            r"2\*3 is \[not\] a\_link \~ \<b> \\"
        );
    }

    #[test]
    fn test_line_start_escaping() {
        let doc = Document::from_blocks(vec![BlockNode::paragraph(vec![t(
            "# not heading\n- not item\n3. not number\n3.14 stays",
        )])]);
        let markdown = document_to_markdown(&doc);
        assert_eq!(
            markdown,
            "\\# not heading\n\\- not item\n3\\. not number\n3.14 stays"
        );
        assert_eq!(markdown_to_document(&markdown), doc);
    }

    #[test]
    fn test_line_start_escaping_unicode_spaces() {
        for text in ["-\u{2003}x", "1.\u{2003}x", "+\u{a0}x", "a\n\u{2003}\nb", "a\n*\u{2003}b"] {
            let doc = Document::from_blocks(vec![BlockNode::paragraph(vec![t(text)])]).normalized();
            let markdown = document_to_markdown(&doc);
            assert_eq!(markdown_to_document(&markdown), doc, "markdown was {markdown:?}");
        }
    }

    #[test]
    fn test_code_span_fences() {
        assert_eq!(code_span("plain"), "`plain`");
        assert_eq!(code_span("a`b"), "``a`b``");
        assert_eq!(code_span("`edge"), "`` `edge ``");
        assert_eq!(code_span(" pad "), "`  pad  `");
        assert_eq!(code_span(" "), "` `");
    }

    #[test]
    fn test_code_block_fence_grows() {
        assert_eq!(fenced_code("x"), "```\nx\n```");
        assert_eq!(fenced_code("```\ny\n```"), "````\n```\ny\n```\n````");
    }

    #[test]
    fn test_code_block_keeps_blank_lines() {
        let doc = Document::from_blocks(vec![BlockNode::code_block("a\n\n\n\nb")]);
        assert_eq!(document_to_markdown(&doc), "```\na\n\n\n\nb\n```");
    }

    #[test]
    fn test_link_href_escaping() {
        let doc = Document::from_blocks(vec![BlockNode::paragraph(vec![
            InlineNode::link("https://x.y/a_(b)", vec![t("see")]).unwrap(),
        ])]);
        let markdown = document_to_markdown(&doc);
        assert_eq!(markdown, r"[see](https://x.y/a_\(b\))");
        assert_eq!(markdown_to_document(&markdown), doc);
    }

    #[test]
    fn test_round_trip() {
        let markdown = "# Title\n\nSome **bold**, *italic*, ***both***, ~~gone~~ and <u>under</u>.\n\n- a `b`\n- [c](https://c.d)\n\n```\ncode\n```";
        let doc = markdown_to_document(markdown);
        assert_eq!(document_to_markdown(&doc), markdown);
    }

    #[test]
    fn test_html_pipeline() {
        assert_eq!(
            html_to_markdown("<h1>Title</h1><p>Some <b>bold</b> text.</p>"),
            "# Title\n\nSome **bold** text."
        );
        assert_eq!(
            markdown_to_html("# Title\n\n- *a*"),
            "<h1>Title</h1>\n<ul><li><em>a</em></li></ul>"
        );
    }
}
