//! # Editor State and Commands
//!
//! [`EditorState`] is the committed state of one open note: the document, the
//! selection, the stored marks that the next typed text will receive, and a
//! monotonically increasing `version`.
//!
//! Every mutation goes through [`EditorState::execute`], which runs a
//! [`Command`] as a transaction:
//!
//! 1. `validate()` checks the command's own input. An error aborts before
//!    anything is touched.
//! 2. `can_apply()` checks the current state. `false` means "not applicable":
//!    the command returns `Ok(false)` and nothing changes.
//! 3. `apply()` runs against a [`Transaction`], a working copy of the state.
//! 4. The working copy is normalized (trailing paragraph, valid selection) and
//!    committed. `version` is bumped only when the document changed.
//!
//! Nothing a command does is observable unless the whole transaction commits.
//! Consumers that react to edits (pagination) key off `version`.

pub mod commands;

use crate::doc::{inline, Block, BlockPath, Document, Mark, Position, Selection};
use crate::error::Result;
use tracing::debug;

pub use commands::{
    Indent, InsertBlockquote, InsertImage, InsertText, Outdent, SetDataTag, SetEquation,
    SetFileAttachment, SetHeading, SetParagraph, SplitBlock, ToggleMark, UnsetDataTag,
};

pub const DEFAULT_HISTORY_DEPTH: usize = 100;

pub trait Command {
    fn name(&self) -> &'static str;

    /// Reject malformed input before any state is inspected.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn can_apply(&self, state: &EditorState) -> bool;

    /// Mutate the working copy. Returns whether anything changed.
    fn apply(&self, tr: &mut Transaction) -> Result<bool>;
}

/// Working copy a command mutates. Discarded unless the command succeeds.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub doc: Document,
    pub selection: Selection,
    pub stored_marks: Option<Vec<Mark>>,
}

impl Transaction {
    /// Textblock paths covered by the selection, with the char range inside each.
    pub fn selected_ranges(&self) -> Vec<(BlockPath, usize, usize)> {
        selected_ranges(&self.doc, &self.selection)
    }

    pub fn set_cursor(&mut self, path: BlockPath, offset: usize) {
        self.selection = Selection::cursor(Position::new(path, offset));
    }

    pub fn active_marks(&self) -> Vec<Mark> {
        active_marks(&self.doc, &self.selection, self.stored_marks.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    doc: Document,
    selection: Selection,
}

#[derive(Debug, Clone)]
pub struct History {
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
    depth: usize,
}

impl History {
    pub fn new(depth: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            depth,
        }
    }

    fn record(&mut self, snapshot: Snapshot) {
        if self.depth == 0 {
            return;
        }
        self.undo.push(snapshot);
        if self.undo.len() > self.depth {
            self.undo.remove(0);
        }
        self.redo.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

#[derive(Debug, Clone)]
pub struct EditorState {
    pub doc: Document,
    pub selection: Selection,
    pub stored_marks: Option<Vec<Mark>>,
    pub version: u64,
    history: History,
}

impl EditorState {
    /// Open a document with the cursor at its start.
    pub fn new(mut doc: Document) -> Self {
        doc.normalize();
        let selection = Selection::cursor(first_position(&doc));
        Self {
            doc,
            selection,
            stored_marks: None,
            version: 0,
            history: History::default(),
        }
    }

    pub fn with_history_depth(mut self, depth: usize) -> Self {
        self.history = History::new(depth);
        self
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Move the selection. Positions are clamped to valid textblock offsets.
    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = Selection::range(
            clamp_position(&self.doc, &selection.anchor),
            clamp_position(&self.doc, &selection.head),
        );
        self.stored_marks = None;
    }

    pub fn set_cursor(&mut self, path: BlockPath, offset: usize) {
        self.set_selection(Selection::cursor(Position::new(path, offset)));
    }

    /// The textblock holding the selection head, if the head is in one.
    pub fn cursor_block(&self) -> Option<&Block> {
        self.doc
            .block_at(&self.selection.head.path)
            .filter(|b| b.is_textblock())
    }

    pub fn selected_ranges(&self) -> Vec<(BlockPath, usize, usize)> {
        selected_ranges(&self.doc, &self.selection)
    }

    /// Marks the next typed character would receive.
    pub fn active_marks(&self) -> Vec<Mark> {
        active_marks(&self.doc, &self.selection, self.stored_marks.as_deref())
    }

    pub fn execute(&mut self, command: &dyn Command) -> Result<bool> {
        command.validate()?;
        if !command.can_apply(self) {
            debug!(command = command.name(), "command not applicable");
            return Ok(false);
        }

        let mut tr = Transaction {
            doc: self.doc.clone(),
            selection: self.selection.clone(),
            stored_marks: self.stored_marks.clone(),
        };
        if !command.apply(&mut tr)? {
            return Ok(false);
        }

        tr.doc.normalize();
        let selection = Selection::range(
            clamp_position(&tr.doc, &tr.selection.anchor),
            clamp_position(&tr.doc, &tr.selection.head),
        );

        let doc_changed = tr.doc != self.doc;
        if doc_changed {
            let previous = Snapshot {
                doc: std::mem::replace(&mut self.doc, tr.doc),
                selection: std::mem::replace(&mut self.selection, selection),
            };
            self.history.record(previous);
            self.version += 1;
        } else {
            self.selection = selection;
        }
        self.stored_marks = tr.stored_marks;
        debug!(
            command = command.name(),
            version = self.version,
            doc_changed,
            "command applied"
        );
        Ok(true)
    }

    pub fn can_apply(&self, command: &dyn Command) -> bool {
        command.validate().is_ok() && command.can_apply(self)
    }

    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo.pop() else {
            return false;
        };
        let current = self.swap_in(snapshot);
        self.history.redo.push(current);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo.pop() else {
            return false;
        };
        let current = self.swap_in(snapshot);
        self.history.undo.push(current);
        true
    }

    fn swap_in(&mut self, snapshot: Snapshot) -> Snapshot {
        let current = Snapshot {
            doc: std::mem::replace(&mut self.doc, snapshot.doc),
            selection: std::mem::replace(&mut self.selection, snapshot.selection),
        };
        self.stored_marks = None;
        self.version += 1;
        current
    }
}

pub(crate) fn first_position(doc: &Document) -> Position {
    doc.textblock_paths()
        .into_iter()
        .next()
        .map(|path| Position::new(path, 0))
        .unwrap_or_else(|| doc.end_position())
}

fn active_marks(doc: &Document, selection: &Selection, stored: Option<&[Mark]>) -> Vec<Mark> {
    if let Some(marks) = stored {
        return marks.to_vec();
    }
    let head = &selection.head;
    doc.block_at(&head.path)
        .and_then(Block::content)
        .map(|content| inline::marks_at(content, head.offset))
        .unwrap_or_default()
}

pub(crate) fn textblock_len(doc: &Document, path: &BlockPath) -> Option<usize> {
    doc.block_at(path)
        .and_then(Block::content)
        .map(|content| inline::content_len(content))
}

/// Snap a position onto a textblock: the same one if it still exists, otherwise
/// the first textblock at or after it, otherwise the document end.
pub(crate) fn clamp_position(doc: &Document, pos: &Position) -> Position {
    if let Some(len) = textblock_len(doc, &pos.path) {
        return Position::new(pos.path.clone(), pos.offset.min(len));
    }
    doc.textblock_paths()
        .into_iter()
        .find(|path| path >= &pos.path)
        .map(|path| Position::new(path, 0))
        .unwrap_or_else(|| doc.end_position())
}

fn selected_ranges(doc: &Document, selection: &Selection) -> Vec<(BlockPath, usize, usize)> {
    let from = selection.from();
    let to = selection.to();
    doc.textblocks_between(&from.path, &to.path)
        .into_iter()
        .filter_map(|path| {
            let len = textblock_len(doc, &path)?;
            let start = if path == from.path { from.offset.min(len) } else { 0 };
            let end = if path == to.path { to.offset.min(len) } else { len };
            Some((path, start, end.max(start)))
        })
        .collect()
}
