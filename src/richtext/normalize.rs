// Canonical form for structured documents
//
// Both parsers end with this pass so that documents with the same meaning compare equal
// and every renderer sees the shapes it can write unambiguously.

use super::structured_document::{
    BlockNode, Document, EmphasisKind, InlineNode, ListBlock,
};

pub fn normalize_document(doc: Document) -> Document {
    let blocks = doc
        .into_blocks()
        .into_iter()
        .filter_map(normalize_block)
        .collect();
    Document::from_blocks(blocks)
}

fn normalize_block(block: BlockNode) -> Option<BlockNode> {
    match block {
        BlockNode::Heading { level, content } => {
            let content = single_line(content);
            (!content.is_empty()).then_some(BlockNode::Heading { level, content })
        }
        BlockNode::Paragraph(content) => {
            let content = trim_edges(normalize_inlines(content));
            (!content.is_empty()).then_some(BlockNode::Paragraph(content))
        }
        BlockNode::List(list) => {
            let ordered = list.ordered();
            let items = list
                .into_items()
                .into_iter()
                .map(single_line)
                .filter(|item| !item.is_empty())
                .collect();
            ListBlock::new(ordered, items).map(BlockNode::List)
        }
        BlockNode::CodeBlock(text) => Some(BlockNode::CodeBlock(text)),
    }
}

/// Normalize a run that must fit on one line (headings, list items)
fn single_line(run: Vec<InlineNode>) -> Vec<InlineNode> {
    trim_edges(normalize_inlines(replace_breaks(normalize_inlines(run))))
}

fn replace_breaks(run: Vec<InlineNode>) -> Vec<InlineNode> {
    run.into_iter()
        .map(|node| match node {
            InlineNode::Text(text) => InlineNode::Text(text.replace('\n', " ")),
            InlineNode::Emphasis { kind, children } => InlineNode::Emphasis {
                kind,
                children: replace_breaks(children),
            },
            InlineNode::Strikethrough(children) => {
                InlineNode::Strikethrough(replace_breaks(children))
            }
            InlineNode::Underline(children) => InlineNode::Underline(replace_breaks(children)),
            InlineNode::Link { href, children } => InlineNode::Link {
                href,
                children: replace_breaks(children),
            },
            code @ InlineNode::Code(_) => code,
        })
        .collect()
}

/// Trim whitespace from the outer text edges of a block's run
fn trim_edges(mut run: Vec<InlineNode>) -> Vec<InlineNode> {
    if let Some(InlineNode::Text(text)) = run.first_mut() {
        let trimmed = text.trim_start();
        if trimmed.len() != text.len() {
            *text = trimmed.to_string();
        }
        if text.is_empty() {
            run.remove(0);
        }
    }
    if let Some(InlineNode::Text(text)) = run.last_mut() {
        let trimmed_len = text.trim_end().len();
        text.truncate(trimmed_len);
        if text.is_empty() {
            run.pop();
        }
    }
    run
}

pub fn normalize_inlines(run: Vec<InlineNode>) -> Vec<InlineNode> {
    let mut out = Vec::with_capacity(run.len());
    for node in run {
        push_normalized(&mut out, node);
    }
    out
}

fn push_normalized(out: &mut Vec<InlineNode>, node: InlineNode) {
    match node {
        InlineNode::Text(text) => push_text(out, &text),
        InlineNode::Code(text) => {
            let text = text.replace('\n', " ");
            if text.is_empty() {
                return;
            }
            if let Some(InlineNode::Code(prev)) = out.last_mut() {
                prev.push_str(&text);
            } else {
                out.push(InlineNode::Code(text));
            }
        }
        InlineNode::Emphasis { kind, children } => push_emphasis(out, kind, children),
        InlineNode::Strikethrough(children) => {
            let children = splice(normalize_inlines(children), |node| {
                matches!(node, InlineNode::Strikethrough(_))
            });
            let (lead, core, trail) = split_edge_whitespace(children);
            push_text(out, &lead);
            if !core.is_empty() {
                push_wrapper(out, InlineNode::Strikethrough(core));
            }
            push_text(out, &trail);
        }
        InlineNode::Underline(children) => {
            let children = splice(normalize_inlines(children), |node| {
                matches!(node, InlineNode::Underline(_))
            });
            if !children.is_empty() {
                push_wrapper(out, InlineNode::Underline(children));
            }
        }
        InlineNode::Link { href, children } => out.push(InlineNode::Link {
            href,
            children: normalize_inlines(children),
        }),
    }
}

fn push_emphasis(out: &mut Vec<InlineNode>, kind: EmphasisKind, children: Vec<InlineNode>) {
    let mut kind = kind;
    let mut children = normalize_inlines(children);
    let mut lead = String::new();
    let mut trail = String::new();

    loop {
        children = splice(children, |node| {
            matches!(node, InlineNode::Emphasis { kind: inner, .. } if kind.covers(*inner))
        });
        children = strip_inherited(children, kind);
        let (l, core, t) = split_edge_whitespace(children);
        lead.push_str(&l);
        trail.insert_str(0, &t);
        children = core;

        // **_x_** and _**x**_ are both bold italic
        if children.len() == 1 && matches!(children[0], InlineNode::Emphasis { .. }) {
            if let Some(InlineNode::Emphasis {
                kind: inner,
                children: grand,
            }) = children.pop()
            {
                kind = kind.combine(inner);
                children = grand;
                continue;
            }
        }
        break;
    }

    push_text(out, &lead);
    if !children.is_empty() {
        push_wrapper(out, InlineNode::Emphasis { kind, children });
    }
    push_text(out, &trail);
}

/// Drop the styles `parent` already applies from emphasis directly inside it:
/// `*a ***b****` is written `*a **b***`
fn strip_inherited(children: Vec<InlineNode>, parent: EmphasisKind) -> Vec<InlineNode> {
    let overlaps = |node: &InlineNode| {
        matches!(node, InlineNode::Emphasis { kind, .. } if kind.without(parent) != Some(*kind))
    };
    if !children.iter().any(overlaps) {
        return children;
    }
    let mut stripped = Vec::with_capacity(children.len());
    for child in children {
        match child {
            InlineNode::Emphasis { kind, children } => match kind.without(parent) {
                Some(rest) => stripped.push(InlineNode::Emphasis { kind: rest, children }),
                None => stripped.extend(children),
            },
            other => stripped.push(other),
        }
    }
    normalize_inlines(stripped)
}

/// Replace every child matching `redundant` by its own children
fn splice(children: Vec<InlineNode>, redundant: impl Fn(&InlineNode) -> bool) -> Vec<InlineNode> {
    if !children.iter().any(&redundant) {
        return children;
    }
    let mut flat = Vec::with_capacity(children.len());
    for child in children {
        if redundant(&child) {
            match child {
                InlineNode::Emphasis { children, .. }
                | InlineNode::Strikethrough(children)
                | InlineNode::Underline(children)
                | InlineNode::Link { children, .. } => flat.extend(children),
                leaf => flat.push(leaf),
            }
        } else {
            flat.push(child);
        }
    }
    normalize_inlines(flat)
}

/// Append a wrapper, merging it into an identical wrapper directly before it
fn push_wrapper(out: &mut Vec<InlineNode>, node: InlineNode) {
    let same_kind = match (out.last(), &node) {
        (Some(InlineNode::Emphasis { kind: a, .. }), InlineNode::Emphasis { kind: b, .. }) => a == b,
        (Some(InlineNode::Strikethrough(_)), InlineNode::Strikethrough(_))
        | (Some(InlineNode::Underline(_)), InlineNode::Underline(_)) => true,
        _ => false,
    };
    let prev = match out.pop() {
        Some(prev) if same_kind => prev,
        Some(prev) => {
            out.push(prev);
            out.push(node);
            return;
        }
        None => {
            out.push(node);
            return;
        }
    };

    let merged = match (prev, node) {
        (
            InlineNode::Emphasis {
                kind,
                children: mut merged,
            },
            InlineNode::Emphasis { children, .. },
        ) => {
            merged.extend(children);
            InlineNode::Emphasis {
                kind,
                children: normalize_inlines(merged),
            }
        }
        (InlineNode::Strikethrough(mut merged), InlineNode::Strikethrough(children)) => {
            merged.extend(children);
            InlineNode::Strikethrough(normalize_inlines(merged))
        }
        (InlineNode::Underline(mut merged), InlineNode::Underline(children)) => {
            merged.extend(children);
            InlineNode::Underline(normalize_inlines(merged))
        }
        (prev, node) => {
            out.push(prev);
            node
        }
    };
    out.push(merged);
}

fn push_text(out: &mut Vec<InlineNode>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(InlineNode::Text(prev)) = out.last_mut() {
        prev.push_str(text);
        if prev.contains('\n') {
            *prev = canonical_breaks(prev);
        }
    } else {
        out.push(InlineNode::Text(canonical_breaks(text)));
    }
}

/// Drop horizontal whitespace around line breaks and collapse repeated breaks
fn canonical_breaks(text: &str) -> String {
    if !text.contains('\n') {
        return text.to_string();
    }
    let is_space = char::is_whitespace;
    let pieces: Vec<&str> = text.split('\n').collect();
    let last = pieces.len() - 1;
    let mut lines = Vec::with_capacity(pieces.len());
    for (i, piece) in pieces.iter().enumerate() {
        let line = if i == 0 {
            piece.trim_end_matches(is_space)
        } else if i == last {
            piece.trim_start_matches(is_space)
        } else {
            let inner = piece.trim_matches(is_space);
            if inner.is_empty() {
                continue;
            }
            inner
        };
        lines.push(line);
    }
    lines.join("\n")
}

/// Split leading and trailing whitespace off the edge text nodes of a run
fn split_edge_whitespace(mut run: Vec<InlineNode>) -> (String, Vec<InlineNode>, String) {
    let mut lead = String::new();
    let mut trail = String::new();

    if let Some(InlineNode::Text(text)) = run.first_mut() {
        let rest = text.trim_start();
        if rest.len() != text.len() {
            lead = text[..text.len() - rest.len()].to_string();
            *text = rest.to_string();
        }
        if text.is_empty() {
            run.remove(0);
        }
    }
    if let Some(InlineNode::Text(text)) = run.last_mut() {
        let kept = text.trim_end().len();
        if kept != text.len() {
            trail = text[kept..].to_string();
            text.truncate(kept);
        }
        if text.is_empty() {
            run.pop();
        }
    }
    (lead, run, trail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> InlineNode {
        InlineNode::text(s)
    }

    #[test]
    fn test_adjacent_text_merges() {
        let run = normalize_inlines(vec![t("a"), t(""), t("b"), InlineNode::code("")]);
        assert_eq!(run, vec![t("ab")]);
    }

    #[test]
    fn test_whitespace_hoisted_out_of_emphasis() {
        let run = normalize_inlines(vec![t("x"), InlineNode::bold(vec![t(" bold ")]), t("y")]);
        assert_eq!(
            run,
            vec![t("x "), InlineNode::bold(vec![t("bold")]), t(" y")]
        );
    }

    #[test]
    fn test_whitespace_only_emphasis_disappears() {
        let run = normalize_inlines(vec![t("a"), InlineNode::italic(vec![t(" ")]), t("b")]);
        assert_eq!(run, vec![t("a b")]);
    }

    #[test]
    fn test_bold_around_italic_becomes_bold_italic() {
        let run = normalize_inlines(vec![InlineNode::bold(vec![InlineNode::italic(vec![t(
            "x",
        )])])]);
        assert_eq!(run, vec![InlineNode::bold_italic(vec![t("x")])]);
    }

    #[test]
    fn test_covered_emphasis_is_spliced() {
        let run = normalize_inlines(vec![InlineNode::bold(vec![
            t("a"),
            InlineNode::bold(vec![t("b")]),
            InlineNode::italic(vec![t("c")]),
        ])]);
        assert_eq!(
            run,
            vec![InlineNode::bold(vec![t("ab"), InlineNode::italic(vec![t("c")])])]
        );
    }

    #[test]
    fn test_inherited_styles_are_dropped() {
        let run = normalize_inlines(vec![InlineNode::italic(vec![
            t("a"),
            InlineNode::bold_italic(vec![t("b")]),
        ])]);
        assert_eq!(
            run,
            vec![InlineNode::italic(vec![t("a"), InlineNode::bold(vec![t("b")])])]
        );

        let run = normalize_inlines(vec![InlineNode::bold(vec![
            InlineNode::bold_italic(vec![t("a")]),
            t("b"),
        ])]);
        assert_eq!(
            run,
            vec![InlineNode::bold(vec![InlineNode::italic(vec![t("a")]), t("b")])]
        );
    }

    #[test]
    fn test_adjacent_wrappers_merge() {
        let run = normalize_inlines(vec![
            InlineNode::bold(vec![t("a")]),
            InlineNode::bold(vec![t("b")]),
            InlineNode::strikethrough(vec![t("c")]),
            InlineNode::strikethrough(vec![t("d")]),
            InlineNode::code("e"),
            InlineNode::code("f"),
        ]);
        assert_eq!(
            run,
            vec![
                InlineNode::bold(vec![t("ab")]),
                InlineNode::strikethrough(vec![t("cd")]),
                InlineNode::code("ef"),
            ]
        );
    }

    #[test]
    fn test_line_breaks_are_canonical() {
        assert_eq!(canonical_breaks("a  \n\n  \n b"), "a\nb");
        assert_eq!(canonical_breaks("\n\n"), "\n");
        assert_eq!(canonical_breaks("plain"), "plain");
        assert_eq!(canonical_breaks("a\u{2003}\n\u{a0}\u{2003}\n\u{2003}b"), "a\nb");
    }

    #[test]
    fn test_empty_blocks_dropped() {
        let doc = Document::from_blocks(vec![
            BlockNode::paragraph(vec![t("\n")]),
            BlockNode::heading(1, vec![t("  ")]).unwrap(),
            BlockNode::list(false, vec![vec![t(" ")], vec![]]).unwrap(),
            BlockNode::paragraph(vec![t("  kept \n")]),
        ])
        .normalized();
        assert_eq!(doc.blocks(), &[BlockNode::paragraph(vec![t("kept")])]);
    }

    #[test]
    fn test_headings_and_items_are_single_line() {
        let doc = Document::from_blocks(vec![
            BlockNode::heading(2, vec![t("a\nb")]).unwrap(),
            BlockNode::list(true, vec![vec![t("c \n d")]]).unwrap(),
        ])
        .normalized();
        assert_eq!(
            doc.blocks(),
            &[
                BlockNode::heading(2, vec![t("a b")]).unwrap(),
                BlockNode::list(true, vec![vec![t("c d")]]).unwrap(),
            ]
        );
    }

    #[test]
    fn test_code_block_untouched() {
        let doc = Document::from_blocks(vec![BlockNode::code_block("  a\n\n\nb  ")]).normalized();
        assert_eq!(doc.blocks(), &[BlockNode::code_block("  a\n\n\nb  ")]);
    }
}
