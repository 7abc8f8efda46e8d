//! Note content: load into an [`EditorState`], save back, render, paginate.
//!
//! Notes are stored as document HTML in the node's `content`. A note with no
//! content opens as an empty document.

use crate::commands::{stored_record, CmdMessage, CmdResult};
use crate::config::EditorSettings;
use crate::doc::export::{self, ExportFormat};
use crate::doc::{inline, Document, Position, Selection};
use crate::editor::{Command, EditorState};
use crate::error::{QuireError, Result};
use crate::model::{NodeKind, TreeNodeRecord};
use crate::store::{TreeBackend, UpdateNodeRequest};
use tracing::debug;
use uuid::Uuid;

fn note_record<B: TreeBackend>(backend: &mut B, id: Uuid) -> Result<TreeNodeRecord> {
    let record = stored_record(backend, id)?;
    if record.kind != NodeKind::Note {
        return Err(QuireError::validation(format!(
            "'{}' is a {}, not a note",
            record.name, record.kind
        )));
    }
    Ok(record)
}

fn parse_content(record: &TreeNodeRecord) -> Result<Document> {
    match record.content.as_deref() {
        Some(html) if !html.trim().is_empty() => Document::from_html(html),
        _ => Ok(Document::new()),
    }
}

/// Open a note for editing.
pub fn open<B: TreeBackend>(
    backend: &mut B,
    id: Uuid,
    settings: &EditorSettings,
) -> Result<(TreeNodeRecord, EditorState)> {
    let record = note_record(backend, id)?;
    let doc = parse_content(&record)?;
    debug!(%id, blocks = doc.blocks.len(), "note opened");
    Ok((
        record,
        EditorState::new(doc).with_history_depth(settings.history_depth),
    ))
}

/// Persist the committed document of `state` as the note's content.
pub fn save<B: TreeBackend>(backend: &mut B, id: Uuid, state: &EditorState) -> Result<CmdResult> {
    write(backend, id, &state.doc)
}

/// Replace the note's content with `doc`.
pub fn write<B: TreeBackend>(backend: &mut B, id: Uuid, doc: &Document) -> Result<CmdResult> {
    note_record(backend, id)?;
    let mut doc = doc.clone();
    doc.normalize();
    let record = backend.update_node(
        id,
        UpdateNodeRequest {
            name: None,
            content: Some(doc.to_html()),
        },
    )?;
    let message = CmdMessage::success(format!("Saved '{}'", record.name));
    Ok(CmdResult::default()
        .with_affected_nodes(vec![record])
        .with_message(message))
}

pub fn show<B: TreeBackend>(backend: &mut B, id: Uuid, format: ExportFormat) -> Result<CmdResult> {
    let record = note_record(backend, id)?;
    let doc = parse_content(&record)?;
    let output = match format {
        // The stored form, without the standalone page wrapper.
        ExportFormat::Html => doc.to_html(),
        other => export::render(&doc, &record.name, other)?,
    };
    Ok(CmdResult::default().with_output(output))
}

/// What part of the target block an edit acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockSpan {
    /// A cursor at the end of the block, as if the user had clicked there.
    #[default]
    End,
    /// The block's whole text selected.
    Whole,
}

/// Run one editor command on top-level block `block` (its first textblock,
/// for containers), then save if it changed anything.
pub fn edit<B: TreeBackend>(
    backend: &mut B,
    id: Uuid,
    block: usize,
    span: BlockSpan,
    command: &dyn Command,
    settings: &EditorSettings,
) -> Result<CmdResult> {
    let (record, mut state) = open(backend, id, settings)?;
    let path = state
        .doc
        .textblock_paths()
        .into_iter()
        .find(|p| p.indices().first() == Some(&block))
        .ok_or_else(|| {
            QuireError::validation(format!("block {} of '{}' has no text", block, record.name))
        })?;
    let len = state
        .doc
        .block_at(&path)
        .and_then(|b| b.content())
        .map(|c| inline::content_len(c))
        .unwrap_or(0);
    match span {
        BlockSpan::End => state.set_cursor(path, len),
        BlockSpan::Whole => state.set_selection(Selection::range(
            Position::new(path.clone(), 0),
            Position::new(path, len),
        )),
    }

    let version = state.version;
    if !state.execute(command)? {
        return Ok(CmdResult::default().with_message(CmdMessage::warning(format!(
            "{} does not apply to block {}",
            command.name(),
            block
        ))));
    }
    if state.version == version {
        return Ok(CmdResult::default()
            .with_message(CmdMessage::info(format!("{}: nothing to change", command.name()))));
    }
    let mut result = save(backend, id, &state)?;
    result.messages = vec![CmdMessage::success(format!(
        "{} applied to '{}'",
        command.name(),
        record.name
    ))];
    Ok(result)
}

/// Lay the note out as pages with the configured geometry.
pub fn pages<B: TreeBackend>(
    backend: &mut B,
    id: Uuid,
    settings: &EditorSettings,
) -> Result<CmdResult> {
    let record = note_record(backend, id)?;
    let doc = parse_content(&record)?;
    let pages = settings.paginator().layout(&doc);

    let mut result = CmdResult::default();
    for page in pages.iter().filter(|p| p.is_overflowing()) {
        result.add_message(CmdMessage::warning(format!(
            "page {} overflows: a block is taller than the page body",
            page.number
        )));
    }
    result.pages = pages;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{node, store};
    use crate::doc::Block;
    use crate::doc::Mark;
    use crate::editor::{Indent, SetEquation, ToggleMark};

    fn settings() -> EditorSettings {
        EditorSettings::default()
    }

    #[test]
    fn empty_note_opens_blank() {
        let mut s = store();
        let n = node(&mut s, "n", NodeKind::Note, None);
        let (_, state) = open(&mut s, n, &settings()).unwrap();
        assert!(state.doc.is_blank());
        assert_eq!(state.version, 0);
    }

    #[test]
    fn folders_are_not_notes() {
        let mut s = store();
        let f = node(&mut s, "f", NodeKind::Folder, None);
        assert!(open(&mut s, f, &settings()).unwrap_err().is_rejection());
    }

    #[test]
    fn save_then_open_round_trips() {
        let mut s = store();
        let n = node(&mut s, "n", NodeKind::Note, None);
        let doc = Document::from_blocks(vec![
            Block::heading(1, "Title"),
            Block::Paragraph {
                indent: 3,
                content: vec![crate::doc::Inline::text("deep")],
            },
        ]);
        write(&mut s, n, &doc).unwrap();
        let (_, state) = open(&mut s, n, &settings()).unwrap();
        assert_eq!(state.doc, doc);
    }

    #[test]
    fn edit_indents_and_saves() {
        let mut s = store();
        let n = node(&mut s, "n", NodeKind::Note, None);
        write(&mut s, n, &Document::from_plain_text("one\n\ntwo")).unwrap();

        let res = edit(&mut s, n, 1, BlockSpan::End, &Indent, &settings()).unwrap();
        assert_eq!(res.messages[0].level, crate::commands::MessageLevel::Success);
        let (_, state) = open(&mut s, n, &settings()).unwrap();
        assert_eq!(state.doc.blocks[1].indent(), Some(1));
        assert_eq!(state.doc.blocks[0].indent(), Some(0));
    }

    #[test]
    fn edit_inserts_atom_after_block() {
        let mut s = store();
        let n = node(&mut s, "n", NodeKind::Note, None);
        write(&mut s, n, &Document::from_plain_text("intro")).unwrap();
        edit(&mut s, n, 0, BlockSpan::End, &SetEquation::new("E=mc^2"), &settings()).unwrap();
        let (_, state) = open(&mut s, n, &settings()).unwrap();
        assert_eq!(state.doc.blocks[1].name(), "equation");
    }

    #[test]
    fn edit_out_of_range_block() {
        let mut s = store();
        let n = node(&mut s, "n", NodeKind::Note, None);
        assert!(edit(&mut s, n, 9, BlockSpan::End, &Indent, &settings()).is_err());
    }

    #[test]
    fn show_renders_text() {
        let mut s = store();
        let n = node(&mut s, "n", NodeKind::Note, None);
        write(&mut s, n, &Document::from_plain_text("hello")).unwrap();
        let out = show(&mut s, n, ExportFormat::Text).unwrap().output.unwrap();
        assert_eq!(out, "hello\n");
    }

    #[test]
    fn pages_for_empty_note() {
        let mut s = store();
        let n = node(&mut s, "n", NodeKind::Note, None);
        let res = pages(&mut s, n, &settings()).unwrap();
        assert_eq!(res.pages.len(), 1);
        assert!(res.messages.is_empty());
    }

    #[test]
    fn whole_span_marks_the_block_text() {
        let mut s = store();
        let n = node(&mut s, "n", NodeKind::Note, None);
        write(&mut s, n, &Document::from_plain_text("strong words")).unwrap();

        let at_end = edit(&mut s, n, 0, BlockSpan::End, &ToggleMark::new(Mark::Bold), &settings());
        assert_eq!(at_end.unwrap().messages[0].level, crate::commands::MessageLevel::Info);

        edit(&mut s, n, 0, BlockSpan::Whole, &ToggleMark::new(Mark::Bold), &settings()).unwrap();
        let (_, state) = open(&mut s, n, &settings()).unwrap();
        assert_eq!(
            state.doc.blocks[0].content().unwrap(),
            &vec![crate::doc::Inline::marked("strong words", vec![Mark::Bold])]
        );
    }
}
