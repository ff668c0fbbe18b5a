// Markdown Parser - turns stored note text into a structured document
//
// Two phases: lines are segmented into blocks (fenced code is captured verbatim),
// then each block's raw text goes through the inline scanner. Malformed input never
// fails; unmatched delimiters stay in the text.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use super::structured_document::{BlockNode, Document, EmphasisKind, Href, InlineNode};

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(#{1,6})\s+(.*)$").expect("heading pattern"));
static UNORDERED_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*+]\s+(.*)$").expect("unordered item pattern"));
static ORDERED_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\.\s+(.*)$").expect("ordered item pattern"));

/// Nested delimiter runs are only matched this deep
const MAX_NESTING: usize = 16;

/// Parse markdown text into a structured document
pub fn parse_markdown(text: &str) -> Document {
    let mut builder = BlockBuilder::default();
    let mut fence: Option<(usize, Vec<&str>)> = None;

    for line in text.lines() {
        if let Some((len, mut lines)) = fence.take() {
            if is_closing_fence(line, len) {
                builder.blocks.push(BlockNode::CodeBlock(lines.join("\n")));
            } else {
                lines.push(line);
                fence = Some((len, lines));
            }
            continue;
        }

        if let Some(len) = opening_fence(line) {
            builder.flush();
            fence = Some((len, Vec::new()));
        } else if line.trim().is_empty() {
            builder.flush();
        } else if let Some(caps) = HEADING_RE.captures(line) {
            builder.flush();
            let level = caps[1].len() as u8;
            if let Some(block) = BlockNode::heading(level, parse_inlines(caps[2].trim())) {
                builder.blocks.push(block);
            }
        } else if let Some(caps) = UNORDERED_ITEM_RE.captures(line) {
            builder.push_item(false, caps.get(1).map_or("", |m| m.as_str()));
        } else if let Some(caps) = ORDERED_ITEM_RE.captures(line) {
            builder.push_item(true, caps.get(1).map_or("", |m| m.as_str()));
        } else {
            builder.push_line(line);
        }
    }

    if let Some((_, lines)) = fence {
        debug!("unterminated code fence, treating the rest of the note as code");
        builder.blocks.push(BlockNode::CodeBlock(lines.join("\n")));
    }
    builder.flush();

    let doc = Document::from_blocks(builder.blocks).normalized();
    debug!(blocks = doc.block_count(), "parsed markdown");
    doc
}

/// Parse one block's raw text into inline nodes
pub fn parse_inlines(text: &str) -> Vec<InlineNode> {
    let scanner = InlineScanner::new(text);
    scanner.scan(0, scanner.chars.len())
}

/// Number of backticks opening a code fence on this line
fn opening_fence(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    let len = trimmed.chars().take_while(|&c| c == '`').count();
    if len < 3 || trimmed[len..].contains('`') {
        return None;
    }
    Some(len)
}

fn is_closing_fence(line: &str, len: usize) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= len && trimmed.chars().all(|c| c == '`')
}

#[derive(Default)]
struct BlockBuilder<'a> {
    blocks: Vec<BlockNode>,
    paragraph: Vec<&'a str>,
    list: Option<(bool, Vec<&'a str>)>,
}

impl<'a> BlockBuilder<'a> {
    fn push_line(&mut self, line: &'a str) {
        self.flush_list();
        self.paragraph.push(line);
    }

    fn push_item(&mut self, ordered: bool, item: &'a str) {
        self.flush_paragraph();
        match &mut self.list {
            Some((kind, items)) if *kind == ordered => items.push(item),
            _ => {
                self.flush_list();
                self.list = Some((ordered, vec![item]));
            }
        }
    }

    fn flush(&mut self) {
        self.flush_paragraph();
        self.flush_list();
    }

    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let raw = self.paragraph.join("\n");
        self.paragraph.clear();
        self.blocks
            .push(BlockNode::Paragraph(parse_inlines(raw.trim())));
    }

    fn flush_list(&mut self) {
        if let Some((ordered, items)) = self.list.take() {
            let items = items.into_iter().map(|item| parse_inlines(item.trim())).collect();
            if let Some(block) = BlockNode::list(ordered, items) {
                self.blocks.push(block);
            }
        }
    }
}

type CloserKey = (usize, usize, char, usize, usize);

/// Left-to-right inline scanner over one block of text
struct InlineScanner {
    chars: Vec<char>,
    closers: RefCell<HashMap<CloserKey, Option<usize>>>,
}

impl InlineScanner {
    fn new(text: &str) -> Self {
        InlineScanner {
            chars: text.chars().collect(),
            closers: RefCell::new(HashMap::new()),
        }
    }

    fn scan(&self, start: usize, end: usize) -> Vec<InlineNode> {
        let mut out = Vec::new();
        let mut text = String::new();
        let mut i = start;

        while i < end {
            let c = self.chars[i];
            match c {
                '\\' if i + 1 < end && self.chars[i + 1].is_ascii_punctuation() => {
                    text.push(self.chars[i + 1]);
                    i += 2;
                    continue;
                }
                '`' => {
                    if let Some((code, next)) = self.code_span(i, end) {
                        flush_text(&mut text, &mut out);
                        out.push(InlineNode::Code(code));
                        i = next;
                        continue;
                    }
                }
                '*' | '_' | '~' => {
                    if let Some((node, next)) = self.delimited(i, end) {
                        flush_text(&mut text, &mut out);
                        out.push(node);
                        i = next;
                        continue;
                    }
                }
                '[' => {
                    if let Some(link) = self.link(i, end) {
                        flush_text(&mut text, &mut out);
                        let children = self.scan(i + 1, link.text_end);
                        out.push(InlineNode::Link {
                            href: link.href,
                            children,
                        });
                        i = link.next;
                        continue;
                    }
                }
                '<' => {
                    if let Some((inner_end, next)) = self.underline(i, end) {
                        flush_text(&mut text, &mut out);
                        out.push(InlineNode::Underline(self.scan(i + 3, inner_end)));
                        i = next;
                        continue;
                    }
                }
                _ => {
                    text.push(c);
                    i += 1;
                    continue;
                }
            }

            // No construct matched: the whole delimiter run is literal
            let run = match c {
                '`' | '*' | '_' | '~' => {
                    let run = self.run_len(i, end, c);
                    trace!(delimiter = %c, run, "unmatched delimiter kept as text");
                    run
                }
                _ => 1,
            };
            text.extend(std::iter::repeat_n(c, run));
            i += run;
        }

        flush_text(&mut text, &mut out);
        out
    }

    fn run_len(&self, from: usize, end: usize, ch: char) -> usize {
        self.chars[from..end].iter().take_while(|&&c| c == ch).count()
    }

    /// Code span opening at `i`, with the position after its closing fence
    fn code_span(&self, i: usize, end: usize) -> Option<(String, usize)> {
        let n = self.run_len(i, end, '`');
        let mut j = i + n;
        while j < end {
            if self.chars[j] == '`' {
                let m = self.run_len(j, end, '`');
                if m == n {
                    let content = &self.chars[i + n..j];
                    let stripped = content.len() >= 2
                        && content[0] == ' '
                        && content[content.len() - 1] == ' '
                        && content.iter().any(|&c| c != ' ');
                    let code: String = if stripped {
                        content[1..content.len() - 1].iter().collect()
                    } else {
                        content.iter().collect()
                    };
                    return Some((code, j + n));
                }
                j += m;
            } else {
                j += 1;
            }
        }
        None
    }

    /// Emphasis or strikethrough opening at `i`, longest delimiter first
    fn delimited(&self, i: usize, end: usize) -> Option<(InlineNode, usize)> {
        let (ch, lengths) = self.opener(i, end)?;
        for d in lengths {
            let Some(close) = self.find_closer(i + d, end, ch, d, 0) else {
                continue;
            };
            let children = self.scan(i + d, close);
            let node = match (ch, d) {
                ('~', _) => InlineNode::Strikethrough(children),
                (_, 3) => InlineNode::emphasis(EmphasisKind::BoldItalic, children),
                (_, 2) => InlineNode::emphasis(EmphasisKind::Bold, children),
                _ => InlineNode::emphasis(EmphasisKind::Italic, children),
            };
            return Some((node, close + d));
        }
        None
    }

    /// Delimiter char and candidate lengths for a run that can open a span at `i`
    fn opener(&self, i: usize, end: usize) -> Option<(char, Vec<usize>)> {
        let ch = self.chars[i];
        let run = self.run_len(i, end, ch);
        if i + run >= end || self.chars[i + run].is_whitespace() {
            return None;
        }
        if ch == '_' && i > 0 && self.chars[i - 1].is_alphanumeric() {
            return None;
        }

        let max = delimiter_len(ch, run)?;
        let lengths = if ch == '~' { vec![2] } else { (1..=max).rev().collect() };
        Some((ch, lengths))
    }

    /// Position after the span opening at `i`, matched the way `delimited` would
    fn span_end(&self, i: usize, end: usize, depth: usize) -> Option<usize> {
        let (ch, lengths) = self.opener(i, end)?;
        lengths
            .into_iter()
            .find_map(|d| self.find_closer(i + d, end, ch, d, depth).map(|close| close + d))
    }

    /// Find where a `d`-long run of `ch` closes the span whose content starts at
    /// `from`. Runs that open a nested span are matched recursively and skipped.
    fn find_closer(&self, from: usize, end: usize, ch: char, d: usize, depth: usize) -> Option<usize> {
        let key = (from, end, ch, d, depth);
        if let Some(found) = self.closers.borrow().get(&key) {
            return *found;
        }
        let found = self.search_closer(from, end, ch, d, depth);
        self.closers.borrow_mut().insert(key, found);
        found
    }

    fn search_closer(&self, from: usize, end: usize, ch: char, d: usize, depth: usize) -> Option<usize> {
        let mut j = from;
        while j < end {
            let c = self.chars[j];
            if c == '\\' {
                j += 2;
                continue;
            }
            if c == '`' {
                j = match self.code_span(j, end) {
                    Some((_, next)) => next,
                    None => j + self.run_len(j, end, '`'),
                };
                continue;
            }
            if c == '[' {
                if let Some(link) = self.link(j, end) {
                    j = link.next;
                    continue;
                }
            }
            if c == '<' {
                if let Some((_, next)) = self.underline(j, end) {
                    j = next;
                    continue;
                }
            }
            if c != ch {
                // A span of another delimiter is skipped whole: `*~~*a*~~*`
                if matches!(c, '*' | '_' | '~') {
                    let skipped = (depth < MAX_NESTING)
                        .then(|| self.span_end(j, end, depth + 1))
                        .flatten();
                    j = skipped.unwrap_or(j + self.run_len(j, end, c));
                    continue;
                }
                j += 1;
                continue;
            }

            let len = self.run_len(j, end, ch);
            let after = j + len;
            let can_close = j > from
                && !self.chars[j - 1].is_whitespace()
                && (ch != '_' || after >= end || !self.chars[after].is_alphanumeric());
            let can_open = after < end
                && !self.chars[after].is_whitespace()
                && (ch != '_' || j == 0 || !self.chars[j - 1].is_alphanumeric());

            if can_close && len >= d {
                // A run that can both open and close only closes when the two run
                // lengths do not add up to a multiple of three: `*a**b**c*`
                let both = can_open && ch != '~';
                let multiple_of_three = (d + len) % 3 == 0 && !(d % 3 == 0 && len % 3 == 0);
                if !(both && multiple_of_three) {
                    return Some(j);
                }
            }

            let nested = delimiter_len(ch, len).filter(|_| can_open && depth < MAX_NESTING);
            if let Some(nd) = nested {
                if let Some(k) = self.find_closer(j + nd, end, ch, nd, depth + 1) {
                    j = k + nd;
                    continue;
                }
            }
            j = after;
        }
        None
    }

    /// `[text](href)` starting at `i`
    fn link(&self, i: usize, end: usize) -> Option<LinkBounds> {
        let mut depth = 0usize;
        let mut j = i + 1;
        while j < end {
            match self.chars[j] {
                '\\' => j += 2,
                '`' => {
                    j = match self.code_span(j, end) {
                        Some((_, next)) => next,
                        None => j + self.run_len(j, end, '`'),
                    }
                }
                '[' => {
                    depth += 1;
                    j += 1;
                }
                ']' if depth == 0 => break,
                ']' => {
                    depth -= 1;
                    j += 1;
                }
                _ => j += 1,
            }
        }
        let text_end = j;
        if text_end + 1 >= end || self.chars[text_end + 1] != '(' {
            return None;
        }

        let mut href = String::new();
        let mut k = text_end + 2;
        while k < end {
            let c = self.chars[k];
            if c == '\\' && k + 1 < end && self.chars[k + 1].is_ascii_punctuation() {
                href.push(self.chars[k + 1]);
                k += 2;
            } else if c == ')' {
                let href = Href::new(href)?;
                return Some(LinkBounds {
                    text_end,
                    href,
                    next: k + 1,
                });
            } else {
                href.push(c);
                k += 1;
            }
        }
        None
    }

    /// Literal `<u>…</u>`: returns the end of the inner text and the position after `</u>`
    fn underline(&self, i: usize, end: usize) -> Option<(usize, usize)> {
        if !self.starts_with(i, end, "<u>") {
            return None;
        }
        let mut depth = 0usize;
        let mut j = i + 3;
        while j < end {
            if self.chars[j] == '\\' {
                j += 2;
            } else if self.chars[j] == '`' {
                j = match self.code_span(j, end) {
                    Some((_, next)) => next,
                    None => j + self.run_len(j, end, '`'),
                };
            } else if self.starts_with(j, end, "<u>") {
                depth += 1;
                j += 3;
            } else if self.starts_with(j, end, "</u>") {
                if depth == 0 {
                    return Some((j, j + 4));
                }
                depth -= 1;
                j += 4;
            } else {
                j += 1;
            }
        }
        None
    }

    fn starts_with(&self, at: usize, end: usize, pattern: &str) -> bool {
        let len = pattern.chars().count();
        at + len <= end && self.chars[at..at + len].iter().copied().eq(pattern.chars())
    }
}

struct LinkBounds {
    text_end: usize,
    href: Href,
    next: usize,
}

/// Delimiter length a run of `len` characters can open with
fn delimiter_len(ch: char, len: usize) -> Option<usize> {
    match ch {
        '~' if len >= 2 => Some(2),
        '~' => None,
        _ => Some(len.min(3)),
    }
}

fn flush_text(text: &mut String, out: &mut Vec<InlineNode>) {
    if !text.is_empty() {
        out.push(InlineNode::Text(std::mem::take(text)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> InlineNode {
        InlineNode::text(s)
    }

    #[test]
    fn test_heading_levels() {
        let doc = parse_markdown("# One\n\n###### Six\n\n####### Seven");
        assert_eq!(
            doc.blocks(),
            &[
                BlockNode::heading(1, vec![t("One")]).unwrap(),
                BlockNode::heading(6, vec![t("Six")]).unwrap(),
                BlockNode::paragraph(vec![t("####### Seven")]),
            ]
        );
    }

    #[test]
    fn test_bold_italic_matched_longest_first() {
        assert_eq!(
            parse_inlines("***x***"),
            vec![InlineNode::bold_italic(vec![t("x")])]
        );
        assert_eq!(
            parse_inlines("___x___"),
            vec![InlineNode::bold_italic(vec![t("x")])]
        );
        assert_eq!(
            parse_inlines("__b__ and _i_"),
            vec![
                InlineNode::bold(vec![t("b")]),
                t(" and "),
                InlineNode::italic(vec![t("i")]),
            ]
        );
    }

    #[test]
    fn test_nested_emphasis() {
        assert_eq!(
            parse_inlines("**a *b***"),
            vec![InlineNode::bold(vec![t("a "), InlineNode::italic(vec![t("b")])])]
        );
        assert_eq!(
            parse_inlines("*a **b***"),
            vec![InlineNode::italic(vec![t("a "), InlineNode::bold(vec![t("b")])])]
        );
        assert_eq!(
            parse_inlines("*a***b**"),
            vec![InlineNode::italic(vec![t("a")]), InlineNode::bold(vec![t("b")])]
        );
        assert_eq!(
            parse_inlines("**a*b*c**"),
            vec![InlineNode::bold(vec![
                t("a"),
                InlineNode::italic(vec![t("b")]),
                t("c"),
            ])]
        );
        assert_eq!(
            parse_inlines("***a**b*"),
            vec![InlineNode::italic(vec![InlineNode::bold(vec![t("a")]), t("b")])]
        );
        assert_eq!(
            parse_inlines("***a*b**"),
            vec![InlineNode::bold(vec![InlineNode::italic(vec![t("a")]), t("b")])]
        );
    }

    #[test]
    fn test_emphasis_nested_through_strikethrough() {
        assert_eq!(
            parse_inlines("*~~*x*~~*"),
            vec![InlineNode::italic(vec![InlineNode::Strikethrough(vec![
                InlineNode::italic(vec![t("x")]),
            ])])]
        );
        assert_eq!(
            parse_inlines("~~*~~x~~*~~"),
            vec![InlineNode::Strikethrough(vec![InlineNode::italic(vec![
                InlineNode::Strikethrough(vec![t("x")]),
            ])])]
        );
    }

    #[test]
    fn test_unterminated_delimiters_are_literal() {
        assert_eq!(parse_inlines("**bold"), vec![t("**bold")]);
        assert_eq!(parse_inlines("a ~~b"), vec![t("a ~~b")]);
        assert_eq!(parse_inlines("`code"), vec![t("`code")]);
        assert_eq!(parse_inlines("[text](nowhere"), vec![t("[text](nowhere")]);
        assert_eq!(parse_inlines("[text] (x)"), vec![t("[text] (x)")]);
        assert_eq!(parse_inlines("<u>open"), vec![t("<u>open")]);
    }

    #[test]
    fn test_code_span_is_verbatim() {
        assert_eq!(
            parse_inlines("use `**not bold**` here"),
            vec![t("use "), InlineNode::code("**not bold**"), t(" here")]
        );
        assert_eq!(parse_inlines("`` a`b ``"), vec![InlineNode::code("a`b")]);
        assert_eq!(parse_inlines("`\\*`"), vec![InlineNode::code("\\*")]);
    }

    #[test]
    fn test_link_text_is_scanned() {
        assert_eq!(
            parse_inlines("see [**bold** link](https://example.com/a_(b\\))"),
            vec![
                t("see "),
                InlineNode::link(
                    "https://example.com/a_(b)",
                    vec![InlineNode::bold(vec![t("bold")]), t(" link")]
                )
                .unwrap(),
            ]
        );
        assert_eq!(parse_inlines("[x]()"), vec![t("[x]()")]);
    }

    #[test]
    fn test_link_inside_emphasis_hides_stars_in_href() {
        assert_eq!(
            parse_inlines("*[x](a*b)*"),
            vec![InlineNode::italic(vec![
                InlineNode::link("a*b", vec![t("x")]).unwrap()
            ])]
        );
    }

    #[test]
    fn test_underline_tag() {
        assert_eq!(
            parse_inlines("<u>under **bold**</u>"),
            vec![InlineNode::underline(vec![
                t("under "),
                InlineNode::bold(vec![t("bold")])
            ])]
        );
    }

    #[test]
    fn test_strikethrough() {
        assert_eq!(
            parse_inlines("~~gone *now*~~"),
            vec![InlineNode::strikethrough(vec![
                t("gone "),
                InlineNode::italic(vec![t("now")])
            ])]
        );
    }

    #[test]
    fn test_escapes() {
        assert_eq!(
            parse_inlines(r"\*not\* \_em\_ \[x\] \\ \a"),
            vec![t(r"*not* _em_ [x] \ \a")]
        );
    }

    #[test]
    fn test_spaced_delimiters_do_not_open() {
        assert_eq!(parse_inlines("2 * 3 * 4"), vec![t("2 * 3 * 4")]);
        assert_eq!(parse_inlines("a ~~ b ~~"), vec![t("a ~~ b ~~")]);
    }

    #[test]
    fn test_intraword_underscore() {
        assert_eq!(parse_inlines("snake_case_name"), vec![t("snake_case_name")]);
        assert_eq!(
            parse_inlines("a*b*c"),
            vec![t("a"), InlineNode::italic(vec![t("b")]), t("c")]
        );
    }

    #[test]
    fn test_lists() {
        let doc = parse_markdown("- a\n* b\n+ c\n\n1. one\n7. two\ntext");
        assert_eq!(
            doc.blocks(),
            &[
                BlockNode::list(false, vec![vec![t("a")], vec![t("b")], vec![t("c")]]).unwrap(),
                BlockNode::list(true, vec![vec![t("one")], vec![t("two")]]).unwrap(),
                BlockNode::paragraph(vec![t("text")]),
            ]
        );
    }

    #[test]
    fn test_ordered_after_unordered_starts_new_list() {
        let doc = parse_markdown("- a\n1. b");
        assert_eq!(doc.block_count(), 2);
    }

    #[test]
    fn test_paragraph_lines_join() {
        let doc = parse_markdown("first line\nsecond *line*\n\nnext");
        assert_eq!(
            doc.blocks(),
            &[
                BlockNode::paragraph(vec![
                    t("first line\nsecond "),
                    InlineNode::italic(vec![t("line")])
                ]),
                BlockNode::paragraph(vec![t("next")]),
            ]
        );
    }

    #[test]
    fn test_code_block_is_verbatim() {
        let doc = parse_markdown("```rust\nlet **x** = 1;\n\n# not a heading\n```\nafter");
        assert_eq!(
            doc.blocks(),
            &[
                BlockNode::code_block("let **x** = 1;\n\n# not a heading"),
                BlockNode::paragraph(vec![t("after")]),
            ]
        );
    }

    #[test]
    fn test_longer_fence_contains_shorter() {
        let doc = parse_markdown("````\n```\ninner\n```\n````");
        assert_eq!(doc.blocks(), &[BlockNode::code_block("```\ninner\n```")]);
    }

    #[test]
    fn test_unterminated_fence_runs_to_end() {
        let doc = parse_markdown("intro\n```\ncode\nmore");
        assert_eq!(
            doc.blocks(),
            &[
                BlockNode::paragraph(vec![t("intro")]),
                BlockNode::code_block("code\nmore"),
            ]
        );
    }

    #[test]
    fn test_pathological_delimiters_terminate() {
        let input = "*a ".repeat(300) + &"**b".repeat(300);
        let run = parse_inlines(&input);
        assert!(!run.is_empty());
    }
}
