//! # CLI Layer
//!
//! The CLI layer is the **only** place in the codebase that:
//! - Knows about terminal I/O (stdout, stderr, stdin)
//! - Handles argument parsing
//! - Formats output for human consumption
//!
//! ## Responsibilities
//!
//! 1. **Argument Parsing**: Convert shell arguments into typed commands via clap
//! 2. **Context Setup**: Logging, data directory, settings and the API
//! 3. **Dispatch**: Route each command to the API facade
//! 4. **Output Formatting**: Styled text or JSON via `render.rs`

use super::logging;
use super::render::{render_delete_preview, render_json, render_result};
use super::setup::{
    Cli, Commands, ConfigCommands, EditOp, NoteCommands, RefCommands, ResourceCommands,
};
use anyhow::{bail, Context, Result};
use clap::Parser;
use quireapp::api::QuireApi;
use quireapp::commands::config::ConfigAction;
use quireapp::commands::note::BlockSpan;
use quireapp::commands::{CmdMessage, CmdResult, QuirePaths};
use quireapp::config::EditorSettings;
use quireapp::doc::export::ExportFormat;
use quireapp::doc::{Document, FileAttachment, Mark};
use quireapp::editor::{
    Command, Indent, InsertBlockquote, InsertImage, InsertText, Outdent, SetDataTag, SetEquation,
    SetFileAttachment, SetHeading, SetParagraph, SplitBlock, ToggleMark, UnsetDataTag,
};
use quireapp::model::{NodeKind, ResourcePayload};
use quireapp::references::ReferenceItem;
use quireapp::store::{FsBackend, FsStore, LocalStore};
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

type Api = QuireApi<FsStore>;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let paths = QuirePaths::resolve(cli.data_dir.clone())?;
    debug!(data_dir = %paths.data.display(), "starting");
    let settings = EditorSettings::load(&paths.data)
        .with_context(|| format!("loading settings from {}", paths.data.display()))?;
    let store = LocalStore::new(FsBackend::new(paths.data.clone()));
    let mut api = QuireApi::new(store, paths, settings)?;

    let mut show_ids = false;
    let command = cli.command.unwrap_or(Commands::Tree {
        collapsed: false,
        ids: false,
    });
    if let Commands::Tree { ids, .. } = &command {
        show_ids = *ids;
    }

    let result = dispatch(&mut api, command)?;
    let rendered = if cli.json {
        render_json(&result)?
    } else {
        render_result(&result, show_ids)
    };
    print!("{}", rendered);
    Ok(())
}

fn dispatch(api: &mut Api, command: Commands) -> Result<CmdResult> {
    let result = match command {
        Commands::Tree { collapsed, .. } => api.list(!collapsed)?,
        Commands::Add { kind, inside, name } => {
            let kind: NodeKind = kind.parse()?;
            api.create(&name.join(" "), kind, inside.as_deref())?
        }
        Commands::Rename { target, name } => api.rename(&target, &name.join(" "))?,
        Commands::Delete { target, yes } => handle_delete(api, &target, yes)?,
        Commands::Move {
            target,
            to,
            position,
        } => api.move_node(&target, to.as_deref(), position)?,
        Commands::Reorder { target, position } => api.reorder(&target, position)?,
        Commands::Note { action } => handle_note(api, action)?,
        Commands::Export {
            target,
            format,
            output,
            archive,
        } => {
            if archive {
                let dir = output.unwrap_or_else(|| PathBuf::from("."));
                api.export_archive(&dir)?
            } else {
                let target = target.context("a note to export is required")?;
                let format = format.map(ExportFormat::from).unwrap_or_else(|| {
                    output
                        .as_deref()
                        .and_then(Path::to_str)
                        .map(ExportFormat::from_filename)
                        .unwrap_or(ExportFormat::Text)
                });
                api.export_note(&target, format, output.as_deref())?
            }
        }
        Commands::Ref { action } => match action.unwrap_or(RefCommands::List) {
            RefCommands::List => api.references()?,
            RefCommands::Add {
                author,
                year,
                title,
                publication,
                doi,
                url,
            } => {
                let mut item = ReferenceItem::new(author, year, title, publication);
                if let Some(doi) = doi {
                    item = item.with_doi(doi);
                }
                if let Some(url) = url {
                    item = item.with_url(url);
                }
                api.add_reference(item)?
            }
            RefCommands::Rm { target } => api.remove_reference(&target)?,
        },
        Commands::Resource { action } => {
            match action.unwrap_or(ResourceCommands::List { kind: None }) {
                ResourceCommands::List { kind } => api.resources(kind.as_deref())?,
                ResourceCommands::Add { title, payload } => {
                    let payload: ResourcePayload = serde_json::from_str(&payload)
                        .context("payload must be a JSON object with a \"type\" field")?;
                    api.add_resource(&title, payload)?
                }
                ResourceCommands::Rename { target, title } => {
                    api.retitle_resource(&target, &title)?
                }
                ResourceCommands::Rm { target } => api.remove_resource(&target)?,
            }
        }
        Commands::Config { action } => {
            let action = match action {
                None => ConfigAction::ShowAll,
                Some(ConfigCommands::Get { key }) => ConfigAction::Get(key),
                Some(ConfigCommands::Set { key, value }) => ConfigAction::Set(key, value),
            };
            api.config(action)?
        }
    };
    Ok(result)
}

fn handle_delete(api: &mut Api, target: &str, yes: bool) -> Result<CmdResult> {
    if !yes {
        let preview = api.delete_preview(target)?;
        if !io::stdin().is_terminal() {
            bail!(
                "{} Pass --yes to confirm.",
                render_delete_preview(&preview)
            );
        }
        eprint!("{} Continue? [y/N] ", render_delete_preview(&preview));
        io::stderr().flush()?;
        let mut answer = String::new();
        io::stdin().read_line(&mut answer)?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            return Ok(CmdResult::default().with_message(CmdMessage::info("Nothing deleted.")));
        }
    }
    Ok(api.delete(target)?)
}

fn handle_note(api: &mut Api, action: NoteCommands) -> Result<CmdResult> {
    let result = match action {
        NoteCommands::Show { target, format } => api.show_note(&target, format.into())?,
        NoteCommands::Write { target, file } => {
            let raw = match &file {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let doc = parse_input(&raw)?;
            api.write_note(&target, &doc)?
        }
        NoteCommands::Edit { target, block, op } => {
            let (span, command) = edit_command(op);
            api.edit_note(&target, block, span, command.as_ref())?
        }
        NoteCommands::Pages { target } => api.note_pages(&target)?,
    };
    Ok(result)
}

/// HTML when the input starts with a tag, plain text otherwise.
fn parse_input(raw: &str) -> Result<Document> {
    if raw.trim_start().starts_with('<') {
        Ok(Document::from_html(raw)?)
    } else {
        Ok(Document::from_plain_text(raw))
    }
}

fn edit_command(op: EditOp) -> (BlockSpan, Box<dyn Command>) {
    match op {
        EditOp::Indent => (BlockSpan::End, Box::new(Indent)),
        EditOp::Outdent => (BlockSpan::End, Box::new(Outdent)),
        EditOp::Heading { level } => (BlockSpan::End, Box::new(SetHeading::new(level))),
        EditOp::Paragraph => (BlockSpan::End, Box::new(SetParagraph)),
        EditOp::Quote { cite } => (BlockSpan::End, Box::new(InsertBlockquote::new(cite))),
        EditOp::Split => (BlockSpan::End, Box::new(SplitBlock)),
        EditOp::Append { text } => (BlockSpan::End, Box::new(InsertText::new(text.join(" ")))),
        EditOp::Equation { latex } => (BlockSpan::End, Box::new(SetEquation::new(latex))),
        EditOp::Image { src, alt } => (BlockSpan::End, Box::new(InsertImage::new(src, alt))),
        EditOp::Attach {
            src,
            name,
            file_type,
        } => {
            let name = name.unwrap_or_else(|| file_name_of(&src));
            let file_type = file_type.unwrap_or_else(|| guess_file_type(&name).to_string());
            (
                BlockSpan::End,
                Box::new(SetFileAttachment::new(FileAttachment::new(
                    src, name, file_type,
                ))),
            )
        }
        EditOp::Bold => (BlockSpan::Whole, Box::new(ToggleMark::new(Mark::Bold))),
        EditOp::Italic => (BlockSpan::Whole, Box::new(ToggleMark::new(Mark::Italic))),
        EditOp::Underline => (BlockSpan::Whole, Box::new(ToggleMark::new(Mark::Underline))),
        EditOp::Strike => (BlockSpan::Whole, Box::new(ToggleMark::new(Mark::Strike))),
        EditOp::Code => (BlockSpan::Whole, Box::new(ToggleMark::new(Mark::Code))),
        EditOp::Link { href } => (
            BlockSpan::Whole,
            Box::new(ToggleMark::new(Mark::Link { href })),
        ),
        EditOp::Tag { value } => (BlockSpan::Whole, Box::new(SetDataTag::new(value))),
        EditOp::Untag => (BlockSpan::Whole, Box::new(UnsetDataTag)),
    }
}

fn file_name_of(src: &str) -> String {
    src.rsplit(['/', '\\'])
        .find(|part| !part.is_empty())
        .unwrap_or(src)
        .to_string()
}

fn guess_file_type(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "csv" => "text/csv",
        "txt" => "text/plain",
        "json" => "application/json",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_defaults_from_src() {
        assert_eq!(file_name_of("https://x.org/files/paper.pdf"), "paper.pdf");
        assert_eq!(file_name_of("paper.pdf"), "paper.pdf");
        assert_eq!(guess_file_type("paper.PDF"), "application/pdf");
        assert_eq!(guess_file_type("README"), "application/octet-stream");
    }

    #[test]
    fn marks_select_the_whole_block() {
        let (span, command) = edit_command(EditOp::Bold);
        assert_eq!(span, BlockSpan::Whole);
        assert_eq!(command.name(), "toggleMark");
        let (span, _) = edit_command(EditOp::Indent);
        assert_eq!(span, BlockSpan::End);
    }

    #[test]
    fn input_format_is_sniffed() {
        let doc = parse_input("<h1>Title</h1><p>body</p>").unwrap();
        assert_eq!(doc.blocks[0].name(), "heading");
        let doc = parse_input("just text").unwrap();
        assert_eq!(doc.blocks[0].text(), "just text");
    }
}
