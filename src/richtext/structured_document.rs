// Structured Document Model
// A note representation independent of both the editor markup and Markdown syntax.
// Parsers build it, renderers consume it; it is never stored itself.

use std::fmt;

/// Strength of an emphasis span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmphasisKind {
    Bold,
    Italic,
    BoldItalic,
}

impl EmphasisKind {
    pub fn is_bold(self) -> bool {
        matches!(self, EmphasisKind::Bold | EmphasisKind::BoldItalic)
    }

    pub fn is_italic(self) -> bool {
        matches!(self, EmphasisKind::Italic | EmphasisKind::BoldItalic)
    }

    /// True if every style of `other` is already applied by `self`
    pub fn covers(self, other: EmphasisKind) -> bool {
        (self.is_bold() || !other.is_bold()) && (self.is_italic() || !other.is_italic())
    }

    /// Combined emphasis of a span nested inside another
    pub fn combine(self, other: EmphasisKind) -> EmphasisKind {
        match (self.is_bold() || other.is_bold(), self.is_italic() || other.is_italic()) {
            (true, true) => EmphasisKind::BoldItalic,
            (true, false) => EmphasisKind::Bold,
            _ => EmphasisKind::Italic,
        }
    }

    /// The styles of `self` that `other` does not already apply
    pub fn without(self, other: EmphasisKind) -> Option<EmphasisKind> {
        match (self.is_bold() && !other.is_bold(), self.is_italic() && !other.is_italic()) {
            (true, true) => Some(EmphasisKind::BoldItalic),
            (true, false) => Some(EmphasisKind::Bold),
            (false, true) => Some(EmphasisKind::Italic),
            (false, false) => None,
        }
    }
}

/// Link target. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Href(String);

impl Href {
    /// Returns `None` for an empty or whitespace-only target
    pub fn new(target: impl Into<String>) -> Option<Self> {
        let target = target.into();
        let trimmed = target.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == target.len() {
            Some(Href(target))
        } else {
            Some(Href(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Href {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Heading level, always within 1..=6
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    pub const MIN: HeadingLevel = HeadingLevel(1);
    pub const MAX: HeadingLevel = HeadingLevel(6);

    pub fn new(level: u8) -> Option<Self> {
        if (1..=6).contains(&level) {
            Some(HeadingLevel(level))
        } else {
            None
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for HeadingLevel {
    type Error = u8;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        HeadingLevel::new(level).ok_or(level)
    }
}

/// Inline content (a sequence of these forms a run inside a block)
#[derive(Debug, Clone, PartialEq)]
pub enum InlineNode {
    Text(String),
    Emphasis {
        kind: EmphasisKind,
        children: Vec<InlineNode>,
    },
    Strikethrough(Vec<InlineNode>),
    Underline(Vec<InlineNode>),
    /// Verbatim, never scanned for formatting
    Code(String),
    Link {
        href: Href,
        children: Vec<InlineNode>,
    },
}

impl InlineNode {
    pub fn text(text: impl Into<String>) -> Self {
        InlineNode::Text(text.into())
    }

    pub fn emphasis(kind: EmphasisKind, children: Vec<InlineNode>) -> Self {
        InlineNode::Emphasis { kind, children }
    }

    pub fn bold(children: Vec<InlineNode>) -> Self {
        Self::emphasis(EmphasisKind::Bold, children)
    }

    pub fn italic(children: Vec<InlineNode>) -> Self {
        Self::emphasis(EmphasisKind::Italic, children)
    }

    pub fn bold_italic(children: Vec<InlineNode>) -> Self {
        Self::emphasis(EmphasisKind::BoldItalic, children)
    }

    pub fn strikethrough(children: Vec<InlineNode>) -> Self {
        InlineNode::Strikethrough(children)
    }

    pub fn underline(children: Vec<InlineNode>) -> Self {
        InlineNode::Underline(children)
    }

    pub fn code(text: impl Into<String>) -> Self {
        InlineNode::Code(text.into())
    }

    /// Returns `None` when `href` is empty
    pub fn link(href: impl Into<String>, children: Vec<InlineNode>) -> Option<Self> {
        Href::new(href).map(|href| InlineNode::Link { href, children })
    }

    /// Child run of a formatting wrapper, `None` for leaves
    pub fn children(&self) -> Option<&[InlineNode]> {
        match self {
            InlineNode::Emphasis { children, .. }
            | InlineNode::Strikethrough(children)
            | InlineNode::Underline(children)
            | InlineNode::Link { children, .. } => Some(children),
            InlineNode::Text(_) | InlineNode::Code(_) => None,
        }
    }

    /// Flatten to plain text
    pub fn to_plain_text(&self) -> String {
        match self {
            InlineNode::Text(text) | InlineNode::Code(text) => text.clone(),
            other => other
                .children()
                .map(inlines_to_plain_text)
                .unwrap_or_default(),
        }
    }
}

pub fn inlines_to_plain_text(run: &[InlineNode]) -> String {
    run.iter().map(InlineNode::to_plain_text).collect()
}

/// A flat list. Holds at least one item.
#[derive(Debug, Clone, PartialEq)]
pub struct ListBlock {
    ordered: bool,
    items: Vec<Vec<InlineNode>>,
}

impl ListBlock {
    /// Returns `None` for an empty item list
    pub fn new(ordered: bool, items: Vec<Vec<InlineNode>>) -> Option<Self> {
        if items.is_empty() {
            None
        } else {
            Some(ListBlock { ordered, items })
        }
    }

    pub fn ordered(&self) -> bool {
        self.ordered
    }

    pub fn items(&self) -> &[Vec<InlineNode>] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Vec<InlineNode>> {
        self.items
    }
}

/// Block-level content
#[derive(Debug, Clone, PartialEq)]
pub enum BlockNode {
    Heading {
        level: HeadingLevel,
        content: Vec<InlineNode>,
    },
    Paragraph(Vec<InlineNode>),
    List(ListBlock),
    /// Raw, unformatted text
    CodeBlock(String),
}

impl BlockNode {
    /// Returns `None` for a level outside 1..=6
    pub fn heading(level: u8, content: Vec<InlineNode>) -> Option<Self> {
        HeadingLevel::new(level).map(|level| BlockNode::Heading { level, content })
    }

    pub fn paragraph(content: Vec<InlineNode>) -> Self {
        BlockNode::Paragraph(content)
    }

    /// Returns `None` when `items` is empty
    pub fn list(ordered: bool, items: Vec<Vec<InlineNode>>) -> Option<Self> {
        ListBlock::new(ordered, items).map(BlockNode::List)
    }

    pub fn code_block(text: impl Into<String>) -> Self {
        BlockNode::CodeBlock(text.into())
    }

    /// Get plain text content
    pub fn to_plain_text(&self) -> String {
        match self {
            BlockNode::Heading { content, .. } | BlockNode::Paragraph(content) => {
                inlines_to_plain_text(content)
            }
            BlockNode::List(list) => list
                .items()
                .iter()
                .map(|item| inlines_to_plain_text(item))
                .collect::<Vec<_>>()
                .join("\n"),
            BlockNode::CodeBlock(text) => text.clone(),
        }
    }
}

/// An ordered sequence of blocks, top to bottom
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    blocks: Vec<BlockNode>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(blocks: Vec<BlockNode>) -> Self {
        Document { blocks }
    }

    pub fn blocks(&self) -> &[BlockNode] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<BlockNode> {
        self.blocks
    }

    pub fn push(&mut self, block: BlockNode) {
        self.blocks.push(block);
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Canonical form of this document, see [`super::normalize`]
    pub fn normalized(self) -> Self {
        super::normalize::normalize_document(self)
    }

    /// Plain text of all blocks separated by blank lines
    pub fn to_plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(BlockNode::to_plain_text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
