//! # Document Model
//!
//! A document is an ordered tree of blocks. Textblocks (paragraphs and headings)
//! hold inline content: text runs carrying marks, and hard breaks. Atomic blocks
//! (file attachments, equations, images) have no interior a cursor can enter.
//!
//! ## Invariants
//!
//! - The document always ends with an empty paragraph, so there is a terminal
//!   insertion point. [`Document::normalize`] restores this after every mutation.
//! - Paragraph and heading indents stay within `0..=MAX_INDENT`.
//! - Inline content is canonical: no empty text runs, adjacent runs with equal
//!   marks are merged, marks are sorted by [`Mark::rank`] with at most one mark
//!   of each type per run.
//!
//! Canonical form is what makes the storage round-trip exact:
//! `Document::from_html(&doc.to_html()) == doc` for any normalized `doc`.
//!
//! ## Addressing
//!
//! Blocks are addressed by a [`BlockPath`]. Each index descends one level: a
//! blockquote consumes one index (its child), a list consumes two (item, then
//! block inside the item). Lexicographic order of paths is document order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub mod codec;
pub mod export;
pub mod html;
pub mod inline;
pub mod schema;

pub const MAX_INDENT: u8 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mark {
    Link {
        href: String,
    },
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
    /// Invisible annotation. Renders as a plain container, round-trips losslessly.
    DataTag {
        #[serde(rename = "tagData")]
        tag_data: String,
    },
}

impl Mark {
    /// Canonical ordering, outermost first.
    pub fn rank(&self) -> u8 {
        match self {
            Mark::Link { .. } => 0,
            Mark::Bold => 1,
            Mark::Italic => 2,
            Mark::Underline => 3,
            Mark::Strike => 4,
            Mark::Code => 5,
            Mark::DataTag { .. } => 6,
        }
    }

    pub fn same_type(&self, other: &Mark) -> bool {
        self.rank() == other.rank()
    }

    pub fn name(&self) -> &'static str {
        schema::mark_spec(self).name
    }

    pub fn is_inclusive(&self) -> bool {
        schema::mark_spec(self).inclusive
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Inline {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        marks: Vec<Mark>,
    },
    HardBreak,
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Inline::Text {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    pub fn marked(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Inline::Text {
            text: text.into(),
            marks,
        }
    }

    /// Length in chars; a hard break counts as one.
    pub fn len(&self) -> usize {
        match self {
            Inline::Text { text, .. } => text.chars().count(),
            Inline::HardBreak => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn marks(&self) -> &[Mark] {
        match self {
            Inline::Text { marks, .. } => marks,
            Inline::HardBreak => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachment {
    pub src: String,
    pub file_name: String,
    pub file_type: String,
}

impl FileAttachment {
    pub fn new(
        src: impl Into<String>,
        file_name: impl Into<String>,
        file_type: impl Into<String>,
    ) -> Self {
        Self {
            src: src.into(),
            file_name: file_name.into(),
            file_type: file_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equation {
    pub latex: String,
}

pub type ListItem = Vec<Block>;
pub type TableRow = Vec<Vec<Inline>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Block {
    Paragraph {
        #[serde(default)]
        indent: u8,
        #[serde(default)]
        content: Vec<Inline>,
    },
    Heading {
        level: u8,
        #[serde(default)]
        indent: u8,
        #[serde(default)]
        content: Vec<Inline>,
    },
    Blockquote {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cite: Option<String>,
        blocks: Vec<Block>,
    },
    BulletList {
        items: Vec<ListItem>,
    },
    OrderedList {
        #[serde(default = "default_list_start")]
        start: u32,
        items: Vec<ListItem>,
    },
    CodeBlock {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        text: String,
    },
    HorizontalRule,
    Image {
        src: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
    },
    FileAttachment(FileAttachment),
    Equation(Equation),
    Table {
        rows: Vec<TableRow>,
    },
}

fn default_list_start() -> u32 {
    1
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        let text = text.into();
        let content = if text.is_empty() {
            Vec::new()
        } else {
            vec![Inline::text(text)]
        };
        Block::Paragraph { indent: 0, content }
    }

    pub fn empty_paragraph() -> Self {
        Block::Paragraph {
            indent: 0,
            content: Vec::new(),
        }
    }

    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Block::Heading {
            level,
            indent: 0,
            content: vec![Inline::text(text)],
        }
    }

    pub fn name(&self) -> &'static str {
        schema::node_spec(self).name
    }

    pub fn is_atom(&self) -> bool {
        schema::node_spec(self).atom
    }

    pub fn is_textblock(&self) -> bool {
        matches!(self, Block::Paragraph { .. } | Block::Heading { .. })
    }

    pub fn is_empty_paragraph(&self) -> bool {
        matches!(self, Block::Paragraph { content, .. } if content.is_empty())
    }

    pub fn content(&self) -> Option<&Vec<Inline>> {
        match self {
            Block::Paragraph { content, .. } | Block::Heading { content, .. } => Some(content),
            _ => None,
        }
    }

    pub fn content_mut(&mut self) -> Option<&mut Vec<Inline>> {
        match self {
            Block::Paragraph { content, .. } | Block::Heading { content, .. } => Some(content),
            _ => None,
        }
    }

    pub fn indent(&self) -> Option<u8> {
        match self {
            Block::Paragraph { indent, .. } | Block::Heading { indent, .. } => Some(*indent),
            _ => None,
        }
    }

    pub fn indent_mut(&mut self) -> Option<&mut u8> {
        match self {
            Block::Paragraph { indent, .. } | Block::Heading { indent, .. } => Some(indent),
            _ => None,
        }
    }

    /// Plain text of a textblock, hard breaks as `\n`.
    pub fn text(&self) -> String {
        self.content()
            .map(|content| inline::plain_text(content))
            .unwrap_or_default()
    }

    fn normalize(&mut self) {
        match self {
            Block::Paragraph { indent, content } | Block::Heading { indent, content, .. } => {
                *indent = (*indent).min(MAX_INDENT);
                inline::normalize(content);
            }
            Block::Blockquote { blocks, .. } => {
                normalize_container(blocks);
            }
            Block::BulletList { items } | Block::OrderedList { items, .. } => {
                for item in items.iter_mut() {
                    normalize_container(item);
                }
            }
            Block::Table { rows } => {
                for cell in rows.iter_mut().flatten() {
                    inline::normalize(cell);
                }
            }
            _ => {}
        }
        if let Block::Heading { level, .. } = self {
            *level = (*level).clamp(1, 6);
        }
    }
}

/// Nested containers must never be empty, otherwise they have no addressable content.
fn normalize_container(blocks: &mut Vec<Block>) {
    for block in blocks.iter_mut() {
        block.normalize();
    }
    if blocks.is_empty() {
        blocks.push(Block::empty_paragraph());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct BlockPath(pub Vec<usize>);

impl BlockPath {
    pub fn top(index: usize) -> Self {
        BlockPath(vec![index])
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Path of the container holding this block, and the block's index in it.
    pub fn split_last(&self) -> Option<(&[usize], usize)> {
        self.0.split_last().map(|(last, prefix)| (prefix, *last))
    }

    pub fn sibling(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        if let Some(last) = indices.last_mut() {
            *last = index;
        }
        BlockPath(indices)
    }

    pub fn child(&self, indices: &[usize]) -> Self {
        let mut out = self.0.clone();
        out.extend_from_slice(indices);
        BlockPath(out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub path: BlockPath,
    pub offset: usize,
}

impl Position {
    pub fn new(path: BlockPath, offset: usize) -> Self {
        Self { path, offset }
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path
            .cmp(&other.path)
            .then(self.offset.cmp(&other.offset))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Position,
    pub head: Position,
}

impl Selection {
    pub fn cursor(position: Position) -> Self {
        Self {
            anchor: position.clone(),
            head: position,
        }
    }

    pub fn range(anchor: Position, head: Position) -> Self {
        Self { anchor, head }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    pub fn from(&self) -> &Position {
        self.anchor.borrow_min(&self.head)
    }

    pub fn to(&self) -> &Position {
        if self.anchor >= self.head {
            &self.anchor
        } else {
            &self.head
        }
    }
}

impl Position {
    fn borrow_min<'a>(&'a self, other: &'a Position) -> &'a Position {
        if self <= other {
            self
        } else {
            other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self { blocks: Vec::new() };
        doc.normalize();
        doc
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut doc = Self { blocks };
        doc.normalize();
        doc
    }

    /// Restores every document invariant. Idempotent.
    pub fn normalize(&mut self) {
        for block in self.blocks.iter_mut() {
            block.normalize();
        }
        let has_trailing = self
            .blocks
            .last()
            .map(Block::is_empty_paragraph)
            .unwrap_or(false);
        if !has_trailing {
            self.blocks.push(Block::empty_paragraph());
        }
    }

    pub fn block_at(&self, path: &BlockPath) -> Option<&Block> {
        let (prefix, index) = path.split_last()?;
        container(&self.blocks, prefix)?.get(index)
    }

    pub fn block_at_mut(&mut self, path: &BlockPath) -> Option<&mut Block> {
        let (prefix, index) = path.split_last()?;
        container_mut(&mut self.blocks, prefix)?.get_mut(index)
    }

    pub fn container_mut(&mut self, prefix: &[usize]) -> Option<&mut Vec<Block>> {
        container_mut(&mut self.blocks, prefix)
    }

    /// Blocks enclosing the block at `path`, outermost first. List items are
    /// plain block lists and do not appear.
    pub fn ancestors(&self, path: &BlockPath) -> Vec<&Block> {
        let mut out = Vec::new();
        let Some((mut rest, _)) = path.split_last() else {
            return out;
        };
        let mut blocks: &[Block] = &self.blocks;
        while let Some((first, tail)) = rest.split_first() {
            let Some(block) = blocks.get(*first) else {
                break;
            };
            out.push(block);
            match block {
                Block::Blockquote { blocks: inner, .. } => {
                    blocks = inner.as_slice();
                    rest = tail;
                }
                Block::BulletList { items } | Block::OrderedList { items, .. } => {
                    let Some((item, tail)) = tail.split_first() else {
                        break;
                    };
                    let Some(item) = items.get(*item) else {
                        break;
                    };
                    blocks = item.as_slice();
                    rest = tail;
                }
                _ => break,
            }
        }
        out
    }

    /// Every paragraph and heading in document order.
    pub fn textblock_paths(&self) -> Vec<BlockPath> {
        let mut out = Vec::new();
        let mut prefix = Vec::new();
        collect_textblocks(&self.blocks, &mut prefix, &mut out);
        out
    }

    /// Textblocks touched by the range `from..=to`, in document order.
    pub fn textblocks_between(&self, from: &BlockPath, to: &BlockPath) -> Vec<BlockPath> {
        self.textblock_paths()
            .into_iter()
            .filter(|path| path >= from && path <= to)
            .collect()
    }

    /// Position at the very end of the document (inside the trailing paragraph).
    pub fn end_position(&self) -> Position {
        let path = self
            .textblock_paths()
            .pop()
            .unwrap_or_else(|| BlockPath::top(0));
        let offset = self
            .block_at(&path)
            .and_then(Block::content)
            .map(|content| inline::content_len(content))
            .unwrap_or(0);
        Position::new(path, offset)
    }

    pub fn is_blank(&self) -> bool {
        self.blocks.iter().all(Block::is_empty_paragraph)
    }

    /// Paragraphs from plain text. Blank lines separate paragraphs, single
    /// newlines become hard breaks, and each four-space group leading the
    /// first line is one indent level.
    pub fn from_plain_text(text: &str) -> Self {
        let text = text.replace("\r\n", "\n");
        let blocks = text
            .split("\n\n")
            .map(|chunk| chunk.trim_matches('\n'))
            .filter(|chunk| !chunk.trim().is_empty())
            .map(|chunk| {
                let first = chunk.lines().next().unwrap_or("");
                let spaces = first.len() - first.trim_start_matches(' ').len();
                let indent = (spaces / 4).min(MAX_INDENT as usize) as u8;
                let pad = " ".repeat(indent as usize * 4);
                let mut content = Vec::new();
                for (i, line) in chunk.lines().enumerate() {
                    if i > 0 {
                        content.push(Inline::HardBreak);
                    }
                    content.push(Inline::text(line.strip_prefix(pad.as_str()).unwrap_or(line)));
                }
                Block::Paragraph { indent, content }
            })
            .collect();
        Self::from_blocks(blocks)
    }
}

fn container<'a>(blocks: &'a [Block], prefix: &[usize]) -> Option<&'a [Block]> {
    let Some((first, rest)) = prefix.split_first() else {
        return Some(blocks);
    };
    match blocks.get(*first)? {
        Block::Blockquote { blocks, .. } => container(blocks, rest),
        Block::BulletList { items } | Block::OrderedList { items, .. } => {
            let (item, rest) = rest.split_first()?;
            container(items.get(*item)?, rest)
        }
        _ => None,
    }
}

fn container_mut<'a>(blocks: &'a mut Vec<Block>, prefix: &[usize]) -> Option<&'a mut Vec<Block>> {
    let Some((first, rest)) = prefix.split_first() else {
        return Some(blocks);
    };
    match blocks.get_mut(*first)? {
        Block::Blockquote { blocks, .. } => container_mut(blocks, rest),
        Block::BulletList { items } | Block::OrderedList { items, .. } => {
            let (item, rest) = rest.split_first()?;
            container_mut(items.get_mut(*item)?, rest)
        }
        _ => None,
    }
}

fn collect_textblocks(blocks: &[Block], prefix: &mut Vec<usize>, out: &mut Vec<BlockPath>) {
    for (i, block) in blocks.iter().enumerate() {
        prefix.push(i);
        match block {
            Block::Paragraph { .. } | Block::Heading { .. } => out.push(BlockPath(prefix.clone())),
            Block::Blockquote { blocks, .. } => collect_textblocks(blocks, prefix, out),
            Block::BulletList { items } | Block::OrderedList { items, .. } => {
                for (k, item) in items.iter().enumerate() {
                    prefix.push(k);
                    collect_textblocks(item, prefix, out);
                    prefix.pop();
                }
            }
            _ => {}
        }
        prefix.pop();
    }
}
