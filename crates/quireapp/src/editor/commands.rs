//! The concrete editor commands.
//!
//! Each command is a small value type. Input checks live in `validate`, state
//! checks in `can_apply`; `apply` may assume both passed.

use super::{textblock_len, Command, EditorState, Transaction};
use crate::doc::{
    inline, schema, Block, BlockPath, Document, Equation, FileAttachment, Inline, Mark, Position,
    Selection, MAX_INDENT,
};
use crate::error::{QuireError, Result};

/// Textblocks an indent-style command acts on: the cursor's block, or every
/// textblock the selection touches.
fn target_blocks(doc: &Document, sel: &Selection) -> Vec<BlockPath> {
    if sel.is_collapsed() {
        return doc
            .block_at(&sel.head.path)
            .filter(|b| b.is_textblock())
            .map(|_| vec![sel.head.path.clone()])
            .unwrap_or_default();
    }
    doc.textblocks_between(&sel.from().path, &sel.to().path)
}

fn cursor_in_textblock(state: &EditorState) -> bool {
    state.cursor_block().is_some()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Indent;

impl Command for Indent {
    fn name(&self) -> &'static str {
        "indent"
    }

    fn can_apply(&self, state: &EditorState) -> bool {
        target_blocks(&state.doc, &state.selection)
            .iter()
            .filter_map(|p| state.doc.block_at(p).and_then(Block::indent))
            .any(|indent| indent < MAX_INDENT)
    }

    fn apply(&self, tr: &mut Transaction) -> Result<bool> {
        let mut changed = false;
        for path in target_blocks(&tr.doc, &tr.selection) {
            if let Some(indent) = tr.doc.block_at_mut(&path).and_then(Block::indent_mut) {
                if *indent < MAX_INDENT {
                    *indent += 1;
                    changed = true;
                }
            }
        }
        Ok(changed)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Outdent;

impl Command for Outdent {
    fn name(&self) -> &'static str {
        "outdent"
    }

    fn can_apply(&self, state: &EditorState) -> bool {
        target_blocks(&state.doc, &state.selection)
            .iter()
            .filter_map(|p| state.doc.block_at(p).and_then(Block::indent))
            .any(|indent| indent > 0)
    }

    fn apply(&self, tr: &mut Transaction) -> Result<bool> {
        let mut changed = false;
        for path in target_blocks(&tr.doc, &tr.selection) {
            if let Some(indent) = tr.doc.block_at_mut(&path).and_then(Block::indent_mut) {
                if *indent > 0 {
                    *indent -= 1;
                    changed = true;
                }
            }
        }
        Ok(changed)
    }
}

/// Add or overwrite a mark over the selection; with a cursor, store it for the next input.
fn set_mark(tr: &mut Transaction, mark: &Mark) -> bool {
    if tr.selection.is_collapsed() {
        let mut marks = tr.active_marks();
        marks.retain(|m| !m.same_type(mark));
        marks.push(mark.clone());
        inline::canonical_marks(&mut marks);
        tr.stored_marks = Some(marks);
        return true;
    }
    let mut changed = false;
    for (path, from, to) in tr.selected_ranges() {
        if let Some(content) = tr.doc.block_at_mut(&path).and_then(Block::content_mut) {
            changed |= inline::add_mark(content, from, to, mark);
        }
    }
    changed
}

fn unset_mark(tr: &mut Transaction, mark: &Mark) -> bool {
    if tr.selection.is_collapsed() {
        let mut marks = tr.active_marks();
        let before = marks.len();
        marks.retain(|m| !m.same_type(mark));
        let changed = marks.len() != before;
        tr.stored_marks = Some(marks);
        return changed;
    }
    let mut changed = false;
    for (path, from, to) in tr.selected_ranges() {
        if let Some(content) = tr.doc.block_at_mut(&path).and_then(Block::content_mut) {
            changed |= inline::remove_mark(content, from, to, mark);
        }
    }
    changed
}

/// Attach an invisible data tag to the selection. An empty value removes it.
#[derive(Debug, Clone)]
pub struct SetDataTag {
    pub value: String,
}

impl SetDataTag {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    fn mark(&self) -> Mark {
        Mark::DataTag {
            tag_data: self.value.clone(),
        }
    }
}

impl Command for SetDataTag {
    fn name(&self) -> &'static str {
        "setDataTag"
    }

    fn can_apply(&self, state: &EditorState) -> bool {
        cursor_in_textblock(state) || !state.selected_ranges().is_empty()
    }

    fn apply(&self, tr: &mut Transaction) -> Result<bool> {
        if self.value.is_empty() {
            return Ok(unset_mark(tr, &self.mark()));
        }
        Ok(set_mark(tr, &self.mark()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UnsetDataTag;

impl Command for UnsetDataTag {
    fn name(&self) -> &'static str {
        "unsetDataTag"
    }

    fn can_apply(&self, state: &EditorState) -> bool {
        SetDataTag::new("").can_apply(state)
    }

    fn apply(&self, tr: &mut Transaction) -> Result<bool> {
        SetDataTag::new("").apply(tr)
    }
}

/// Toggle a formatting mark: removed when the whole selection already has it.
#[derive(Debug, Clone)]
pub struct ToggleMark {
    pub mark: Mark,
}

impl ToggleMark {
    pub fn new(mark: Mark) -> Self {
        Self { mark }
    }
}

impl Command for ToggleMark {
    fn name(&self) -> &'static str {
        "toggleMark"
    }

    fn validate(&self) -> Result<()> {
        match &self.mark {
            Mark::Link { href } if href.trim().is_empty() => {
                Err(QuireError::validation("link target cannot be empty"))
            }
            _ => Ok(()),
        }
    }

    fn can_apply(&self, state: &EditorState) -> bool {
        cursor_in_textblock(state) || !state.selected_ranges().is_empty()
    }

    fn apply(&self, tr: &mut Transaction) -> Result<bool> {
        let present = if tr.selection.is_collapsed() {
            tr.active_marks().iter().any(|m| m.same_type(&self.mark))
        } else {
            let ranges = tr.selected_ranges();
            !ranges.is_empty()
                && ranges.iter().all(|(path, from, to)| {
                    from == to
                        || tr
                            .doc
                            .block_at(path)
                            .and_then(Block::content)
                            .map(|c| inline::range_has_mark(c, *from, *to, &self.mark))
                            .unwrap_or(false)
                })
        };
        if present {
            Ok(unset_mark(tr, &self.mark))
        } else {
            Ok(set_mark(tr, &self.mark))
        }
    }
}

/// Remove the selected content. Returns where the cursor lands.
///
/// Textblocks sharing a container are joined; a range spanning different
/// containers only loses its text.
fn delete_selection(tr: &mut Transaction) -> Option<Position> {
    if tr.selection.is_collapsed() {
        return Some(tr.selection.head.clone());
    }
    let ranges = tr.selected_ranges();
    let (first, start, _) = ranges.first()?.clone();
    let (last, _, _) = ranges.last()?.clone();
    for (path, from, to) in ranges.iter().rev() {
        if let Some(content) = tr.doc.block_at_mut(path).and_then(Block::content_mut) {
            inline::delete_range(content, *from, *to);
        }
    }
    if first != last {
        if let (Some((first_prefix, fi)), Some((last_prefix, li))) =
            (first.split_last(), last.split_last())
        {
            if first_prefix == last_prefix && fi < li {
                let container = tr.doc.container_mut(first_prefix)?;
                let tail = container
                    .get(li)
                    .and_then(Block::content)
                    .cloned()
                    .unwrap_or_default();
                container.drain(fi + 1..=li);
                if let Some(content) = container.get_mut(fi).and_then(Block::content_mut) {
                    content.extend(tail);
                    inline::normalize(content);
                }
            }
        }
    }
    Some(Position::new(first, start))
}

/// Type text at the cursor, replacing any selection. Newlines become hard breaks.
#[derive(Debug, Clone)]
pub struct InsertText {
    pub text: String,
}

impl InsertText {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Command for InsertText {
    fn name(&self) -> &'static str {
        "insertText"
    }

    fn validate(&self) -> Result<()> {
        if self.text.is_empty() {
            return Err(QuireError::validation("nothing to insert"));
        }
        Ok(())
    }

    fn can_apply(&self, state: &EditorState) -> bool {
        cursor_in_textblock(state)
    }

    fn apply(&self, tr: &mut Transaction) -> Result<bool> {
        // Marks are resolved before the selection is removed.
        let marks = tr.active_marks();
        let Some(at) = delete_selection(tr) else {
            return Ok(false);
        };
        let Some(content) = tr.doc.block_at_mut(&at.path).and_then(Block::content_mut) else {
            return Ok(false);
        };

        let (mut left, right) = inline::split_at(content, at.offset);
        let mut inserted = 0;
        for (i, line) in self.text.split('\n').enumerate() {
            if i > 0 {
                left.push(Inline::HardBreak);
                inserted += 1;
            }
            left.push(Inline::marked(line, marks.clone()));
            inserted += line.chars().count();
        }
        left.extend(right);
        inline::normalize(&mut left);
        *content = left;

        tr.stored_marks = None;
        tr.set_cursor(at.path, at.offset + inserted);
        Ok(true)
    }
}

/// Split the cursor's textblock in two (Enter). The new block keeps the indent;
/// splitting at the end of a heading continues with a paragraph.
#[derive(Debug, Clone, Copy, Default)]
pub struct SplitBlock;

impl Command for SplitBlock {
    fn name(&self) -> &'static str {
        "splitBlock"
    }

    fn can_apply(&self, state: &EditorState) -> bool {
        cursor_in_textblock(state)
    }

    fn apply(&self, tr: &mut Transaction) -> Result<bool> {
        let Some(at) = delete_selection(tr) else {
            return Ok(false);
        };
        let Some((prefix, index)) = at.path.split_last() else {
            return Ok(false);
        };
        let Some(container) = tr.doc.container_mut(prefix) else {
            return Ok(false);
        };
        let Some(block) = container.get_mut(index) else {
            return Ok(false);
        };
        let len = block.content().map(|c| inline::content_len(c)).unwrap_or(0);
        let Some(content) = block.content_mut() else {
            return Ok(false);
        };
        let (left, right) = inline::split_at(content, at.offset);
        *content = left;

        let new_block = match block {
            Block::Heading { level, indent, .. } if at.offset < len => Block::Heading {
                level: *level,
                indent: *indent,
                content: right,
            },
            other => Block::Paragraph {
                indent: other.indent().unwrap_or(0),
                content: right,
            },
        };
        container.insert(index + 1, new_block);
        tr.set_cursor(at.path.sibling(index + 1), 0);
        Ok(true)
    }
}

/// Turn the selected textblocks into headings of `level`.
#[derive(Debug, Clone, Copy)]
pub struct SetHeading {
    pub level: u8,
}

impl SetHeading {
    pub fn new(level: u8) -> Self {
        Self { level }
    }
}

impl Command for SetHeading {
    fn name(&self) -> &'static str {
        "setHeading"
    }

    fn validate(&self) -> Result<()> {
        if !(1..=6).contains(&self.level) {
            return Err(QuireError::validation(format!(
                "heading level must be 1-6, got {}",
                self.level
            )));
        }
        Ok(())
    }

    fn can_apply(&self, state: &EditorState) -> bool {
        target_blocks(&state.doc, &state.selection).iter().any(|p| {
            !matches!(state.doc.block_at(p), Some(Block::Heading { level, .. }) if *level == self.level)
        })
    }

    fn apply(&self, tr: &mut Transaction) -> Result<bool> {
        let mut changed = false;
        for path in target_blocks(&tr.doc, &tr.selection) {
            if let Some(block) = tr.doc.block_at_mut(&path) {
                let indent = block.indent().unwrap_or(0);
                let content = block.content().cloned().unwrap_or_default();
                let next = Block::Heading {
                    level: self.level,
                    indent,
                    content,
                };
                if *block != next {
                    *block = next;
                    changed = true;
                }
            }
        }
        Ok(changed)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SetParagraph;

impl Command for SetParagraph {
    fn name(&self) -> &'static str {
        "setParagraph"
    }

    fn can_apply(&self, state: &EditorState) -> bool {
        target_blocks(&state.doc, &state.selection)
            .iter()
            .any(|p| matches!(state.doc.block_at(p), Some(Block::Heading { .. })))
    }

    fn apply(&self, tr: &mut Transaction) -> Result<bool> {
        let mut changed = false;
        for path in target_blocks(&tr.doc, &tr.selection) {
            if let Some(block) = tr.doc.block_at_mut(&path) {
                if let Block::Heading {
                    indent, content, ..
                } = block
                {
                    *block = Block::Paragraph {
                        indent: *indent,
                        content: std::mem::take(content),
                    };
                    changed = true;
                }
            }
        }
        Ok(changed)
    }
}

/// Wrap the cursor's textblock in a citation blockquote.
#[derive(Debug, Clone, Default)]
pub struct InsertBlockquote {
    pub cite: Option<String>,
}

impl InsertBlockquote {
    pub fn new(cite: Option<String>) -> Self {
        Self { cite }
    }
}

impl Command for InsertBlockquote {
    fn name(&self) -> &'static str {
        "insertBlockquote"
    }

    fn validate(&self) -> Result<()> {
        if matches!(&self.cite, Some(c) if c.trim().is_empty()) {
            return Err(QuireError::validation("citation cannot be blank"));
        }
        Ok(())
    }

    fn can_apply(&self, state: &EditorState) -> bool {
        cursor_in_textblock(state)
    }

    fn apply(&self, tr: &mut Transaction) -> Result<bool> {
        let head = tr.selection.head.clone();
        let Some(block) = tr.doc.block_at_mut(&head.path) else {
            return Ok(false);
        };
        let inner = std::mem::replace(block, Block::HorizontalRule);
        *block = Block::Blockquote {
            cite: self.cite.clone(),
            blocks: vec![inner],
        };
        tr.set_cursor(head.path.child(&[0]), head.offset);
        Ok(true)
    }
}

/// Insert an atomic block after the cursor's block, in the same container, and
/// move the cursor to the textblock that follows it.
fn insert_atom(tr: &mut Transaction, atom: Block) -> bool {
    let head = tr.selection.head.clone();
    let Some((prefix, index)) = head.path.split_last() else {
        return false;
    };
    let Some(container) = tr.doc.container_mut(prefix) else {
        return false;
    };
    if index >= container.len() {
        return false;
    }
    container.insert(index + 1, atom);
    if !container
        .get(index + 2)
        .map(Block::is_textblock)
        .unwrap_or(false)
    {
        container.insert(index + 2, Block::empty_paragraph());
    }
    tr.set_cursor(head.path.sibling(index + 2), 0);
    true
}

/// The cursor must sit in a textblock, and every node enclosing it must
/// accept block children.
fn can_insert_atom(state: &EditorState) -> bool {
    let path = &state.selection.head.path;
    if textblock_len(&state.doc, path).is_none() {
        return false;
    }
    state
        .doc
        .ancestors(path)
        .into_iter()
        .all(|block| schema::node_spec(block).accepts_block_nodes())
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(QuireError::validation(format!("{} is required", what)));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SetFileAttachment {
    pub file: FileAttachment,
}

impl SetFileAttachment {
    pub fn new(file: FileAttachment) -> Self {
        Self { file }
    }
}

impl Command for SetFileAttachment {
    fn name(&self) -> &'static str {
        "setFileAttachment"
    }

    fn validate(&self) -> Result<()> {
        require(&self.file.src, "file source")?;
        require(&self.file.file_name, "file name")?;
        require(&self.file.file_type, "file type")
    }

    fn can_apply(&self, state: &EditorState) -> bool {
        can_insert_atom(state)
    }

    fn apply(&self, tr: &mut Transaction) -> Result<bool> {
        Ok(insert_atom(tr, Block::FileAttachment(self.file.clone())))
    }
}

#[derive(Debug, Clone)]
pub struct SetEquation {
    pub latex: String,
}

impl SetEquation {
    pub fn new(latex: impl Into<String>) -> Self {
        Self {
            latex: latex.into(),
        }
    }
}

impl Command for SetEquation {
    fn name(&self) -> &'static str {
        "setEquation"
    }

    fn validate(&self) -> Result<()> {
        require(&self.latex, "latex")
    }

    fn can_apply(&self, state: &EditorState) -> bool {
        can_insert_atom(state)
    }

    fn apply(&self, tr: &mut Transaction) -> Result<bool> {
        Ok(insert_atom(
            tr,
            Block::Equation(Equation {
                latex: self.latex.clone(),
            }),
        ))
    }
}

#[derive(Debug, Clone)]
pub struct InsertImage {
    pub src: String,
    pub alt: Option<String>,
}

impl InsertImage {
    pub fn new(src: impl Into<String>, alt: Option<String>) -> Self {
        Self {
            src: src.into(),
            alt,
        }
    }
}

impl Command for InsertImage {
    fn name(&self) -> &'static str {
        "insertImage"
    }

    fn validate(&self) -> Result<()> {
        require(&self.src, "image source")
    }

    fn can_apply(&self, state: &EditorState) -> bool {
        can_insert_atom(state)
    }

    fn apply(&self, tr: &mut Transaction) -> Result<bool> {
        Ok(insert_atom(
            tr,
            Block::Image {
                src: self.src.clone(),
                alt: self.alt.clone(),
            },
        ))
    }
}
