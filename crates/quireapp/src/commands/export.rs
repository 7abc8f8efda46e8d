use crate::commands::{load_tree, note, CmdMessage, CmdResult};
use crate::config::EditorSettings;
use crate::doc::export::{self, ExportFormat};
use crate::doc::Document;
use crate::error::{QuireError, Result};
use crate::model::NodeKind;
use crate::store::TreeBackend;
use crate::tree::{Tree, TreeNode};
use chrono::Utc;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use uuid::Uuid;

/// Export one note. Writes to `out` when given, otherwise returns the
/// rendered text as output.
pub fn run<B: TreeBackend>(
    backend: &mut B,
    id: Uuid,
    format: ExportFormat,
    out: Option<&Path>,
) -> Result<CmdResult> {
    let rendered = match format {
        ExportFormat::Html => {
            let (record, state) = note::open(backend, id, &EditorSettings::default())?;
            export::to_standalone_html(&state.doc, &record.name)
        }
        other => note::show(backend, id, other)?
            .output
            .ok_or_else(|| QuireError::Render("note rendered nothing".into()))?,
    };
    let Some(path) = out else {
        return Ok(CmdResult::default().with_output(rendered));
    };
    fs::write(path, rendered)?;
    let mut result = CmdResult::default();
    result.paths.push(path.to_path_buf());
    result.add_message(CmdMessage::success(format!(
        "Exported to {}",
        path.display()
    )));
    Ok(result)
}

/// Archive every note as standalone HTML into a `.tar.gz` inside `out_dir`,
/// mirroring the folder structure.
pub fn archive<B: TreeBackend>(backend: &mut B, out_dir: &Path) -> Result<CmdResult> {
    let tree = load_tree(backend)?;
    let entries = note_entries(&tree)?;
    if entries.is_empty() {
        return Ok(CmdResult::default().with_message(CmdMessage::info("No notes to export.")));
    }

    let filename = format!("quire-{}.tar.gz", Utc::now().format("%Y-%m-%d_%H-%M-%S"));
    let path = out_dir.join(filename);
    let file = File::create(&path)?;
    write_archive(file, &entries)?;

    let mut result = CmdResult::default();
    result.paths.push(path.clone());
    result.add_message(CmdMessage::success(format!(
        "Exported {} notes to {}",
        entries.len(),
        path.display()
    )));
    Ok(result)
}

/// `(entry name, standalone html)` for every note, in tree order.
fn note_entries(tree: &Tree) -> Result<Vec<(String, String)>> {
    fn walk(
        nodes: &[TreeNode],
        dir: &str,
        out: &mut Vec<(String, String)>,
    ) -> Result<()> {
        for node in nodes {
            let safe = sanitize_filename(&node.name);
            match node.kind {
                NodeKind::Note => {
                    let doc = match node.content.as_deref() {
                        Some(html) if !html.trim().is_empty() => Document::from_html(html)?,
                        _ => Document::new(),
                    };
                    let id = node.id.to_string();
                    out.push((
                        format!("{}/{}-{}.html", dir, safe, &id[..8]),
                        export::to_standalone_html(&doc, &node.name),
                    ));
                }
                NodeKind::Folder => walk(&node.children, &format!("{}/{}", dir, safe), out)?,
                NodeKind::Object => {}
            }
        }
        Ok(())
    }
    let mut out = Vec::new();
    walk(&tree.roots, "quire", &mut out)?;
    Ok(out)
}

fn write_archive<W: Write>(writer: W, entries: &[(String, String)]) -> Result<()> {
    let enc = GzEncoder::new(writer, Compression::default());
    let mut tar = tar::Builder::new(enc);

    for (name, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        tar.append_data(&mut header, name, content.as_bytes())
            .map_err(QuireError::Io)?;
    }

    tar.into_inner()
        .map_err(QuireError::Io)?
        .finish()
        .map_err(QuireError::Io)?;
    Ok(())
}

pub fn sanitize_filename(name: &str) -> String {
    let clean = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim()
        .to_string();
    if clean.is_empty() {
        "untitled".to_string()
    } else {
        clean
    }
}

/// `name.ext` for a single-note export.
pub fn output_filename(title: &str, format: ExportFormat) -> String {
    format!("{}.{}", sanitize_filename(title), format.extension())
}
