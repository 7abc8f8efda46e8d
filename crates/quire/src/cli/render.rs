//! Turns `CmdResult`s into terminal text.
//!
//! Every function here returns a `String` and prints nothing, so output can be
//! checked in tests from canned results.

use super::styles::STYLES;
use chrono::{DateTime, Utc};
use quireapp::commands::{CmdMessage, CmdResult, MessageLevel};
use quireapp::model::{NodeKind, Resource};
use quireapp::pagination::Page;
use quireapp::references::ReferenceItem;
use quireapp::tree::{DeletePreview, TreeRow};
use std::fmt::Write;
use unicode_width::UnicodeWidthStr;

const LINE_WIDTH: usize = 80;
const ID_WIDTH: usize = 8;

/// Everything in `result`, in a fixed order: body, then messages.
pub fn render_result(result: &CmdResult, show_ids: bool) -> String {
    let mut out = String::new();
    if !result.rows.is_empty() {
        out.push_str(&render_rows(&result.rows, show_ids));
    }
    if !result.pages.is_empty() {
        out.push_str(&render_pages(&result.pages));
    }
    if !result.resources.is_empty() {
        out.push_str(&render_resources(&result.resources));
    }
    if !result.references.is_empty() {
        out.push_str(&render_references(&result.references));
    }
    if !result.settings.is_empty() {
        out.push_str(&render_settings(&result.settings));
    }
    if let Some(text) = &result.output {
        out.push_str(text);
        if !text.ends_with('\n') {
            out.push('\n');
        }
    }
    out.push_str(&render_messages(&result.messages));
    out
}

pub fn render_json(result: &CmdResult) -> serde_json::Result<String> {
    let mut json = serde_json::to_string_pretty(result)?;
    json.push('\n');
    Ok(json)
}

pub fn render_messages(messages: &[CmdMessage]) -> String {
    let mut out = String::new();
    for message in messages {
        let style = match message.level {
            MessageLevel::Info => &STYLES.info,
            MessageLevel::Success => &STYLES.success,
            MessageLevel::Warning => &STYLES.warning,
            MessageLevel::Error => &STYLES.error,
        };
        let _ = writeln!(out, "{}", style.apply_to(&message.content));
    }
    out
}

fn short_id(id: &uuid::Uuid) -> String {
    id.to_string()[..ID_WIDTH].to_string()
}

pub fn render_rows(rows: &[TreeRow], show_ids: bool) -> String {
    let mut out = String::new();
    for row in rows {
        let marker = match (row.kind, row.has_children, row.expanded) {
            (NodeKind::Folder, true, true) => "▾ ",
            (NodeKind::Folder, true, false) => "▸ ",
            _ => "  ",
        };
        let (style, label) = match row.kind {
            NodeKind::Folder => (&STYLES.folder, format!("{}/", row.name)),
            NodeKind::Note => (&STYLES.note, row.name.clone()),
            NodeKind::Object => (&STYLES.object, row.name.clone()),
        };
        let style = if row.selected { &STYLES.selected } else { style };
        let name = style.apply_to(label);
        if show_ids {
            let _ = write!(out, "{} ", STYLES.id.apply_to(short_id(&row.id)));
        }
        let _ = writeln!(out, "{}{}{}", "  ".repeat(row.depth), marker, name);
    }
    out
}

pub fn render_pages(pages: &[Page]) -> String {
    let mut out = String::new();
    for page in pages {
        let blocks = match page.body.blocks() {
            Some(range) if !range.is_empty() => format!("blocks {}-{}", range.start, range.end - 1),
            _ => "empty".to_string(),
        };
        let state = if page.is_overflowing() {
            STYLES.warning.apply_to("overflowing")
        } else {
            STYLES.muted.apply_to("ok")
        };
        let _ = writeln!(
            out,
            "{:<12} {:<16} {:>7.1}px  {}",
            page.footer.as_text().unwrap_or_default(),
            blocks,
            page.body.height,
            state
        );
    }
    out
}

pub fn render_resources(resources: &[Resource]) -> String {
    let mut out = String::new();
    for resource in resources {
        let kind = format!("{:<9}", resource.payload.kind());
        let time = format_time_ago(resource.updated_at);
        let fixed = ID_WIDTH + 1 + kind.width() + 1 + time.width() + 2;
        let title = truncate_to_width(&resource.title, LINE_WIDTH.saturating_sub(fixed));
        let padding = LINE_WIDTH
            .saturating_sub(fixed)
            .saturating_sub(title.width());
        let _ = writeln!(
            out,
            "{} {} {}{}  {}",
            STYLES.id.apply_to(short_id(&resource.id)),
            STYLES.key.apply_to(kind),
            title,
            " ".repeat(padding),
            STYLES.time.apply_to(time)
        );
    }
    out
}

pub fn render_references(items: &[ReferenceItem]) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(
            out,
            "{} [{}] {}",
            STYLES.id.apply_to(short_id(&item.id)),
            i + 1,
            item.citation()
        );
    }
    out
}

pub fn render_settings(settings: &[(String, String)]) -> String {
    let mut out = String::new();
    for (key, value) in settings {
        let _ = writeln!(out, "{} = {}", STYLES.key.apply_to(key), value);
    }
    out
}

pub fn render_delete_preview(preview: &DeletePreview) -> String {
    let nested = match preview.descendants {
        0 => String::new(),
        1 => " and 1 item inside it".to_string(),
        n => format!(" and {} items inside it", n),
    };
    format!(
        "This deletes {} '{}'{}.",
        preview.kind,
        STYLES.title.apply_to(&preview.name),
        nested
    )
}

pub fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    let formatter = timeago::Formatter::new();
    formatter.convert(duration.to_std().unwrap_or_default())
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use quireapp::model::ResourcePayload;
    use uuid::Uuid;

    fn plain() {
        console::set_colors_enabled(false);
    }

    fn row(name: &str, kind: NodeKind, depth: usize, has_children: bool) -> TreeRow {
        TreeRow {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            depth,
            has_children,
            expanded: true,
            selected: false,
        }
    }

    #[test]
    fn rows_are_indented_by_depth() {
        plain();
        let rows = vec![
            row("Thesis", NodeKind::Folder, 0, true),
            row("Intro", NodeKind::Note, 1, false),
            row("data.csv", NodeKind::Object, 1, false),
        ];
        let out = render_rows(&rows, false);
        assert_eq!(out, "▾ Thesis/\n    Intro\n    data.csv\n");
    }

    #[test]
    fn ids_prefix_rows() {
        plain();
        let r = row("n", NodeKind::Note, 0, false);
        let out = render_rows(std::slice::from_ref(&r), true);
        assert!(out.starts_with(&r.id.to_string()[..8]));
    }

    #[test]
    fn delete_preview_counts_nested_items() {
        plain();
        let preview = DeletePreview {
            id: Uuid::new_v4(),
            name: "Book".into(),
            kind: NodeKind::Folder,
            descendants: 3,
        };
        assert_eq!(
            render_delete_preview(&preview),
            "This deletes folder 'Book' and 3 items inside it."
        );
    }

    #[test]
    fn output_then_messages() {
        plain();
        let result = CmdResult::default()
            .with_output("body")
            .with_message(CmdMessage::success("done"));
        assert_eq!(render_result(&result, false), "body\ndone\n");
    }

    #[test]
    fn resources_fit_the_line() {
        plain();
        let resource = Resource::new(
            "A very long title ".repeat(10),
            ResourcePayload::Formula {
                latex: "x".into(),
            },
        );
        let out = render_resources(&[resource]);
        let line = out.lines().next().unwrap();
        assert!(line.width() <= LINE_WIDTH);
        assert!(line.contains("formula"));
        assert!(line.contains('…'));
    }

    #[test]
    fn json_skips_empty_fields() {
        let result = CmdResult::default().with_output("x");
        let json = render_json(&result).unwrap();
        assert!(json.contains("\"output\": \"x\""));
        assert!(!json.contains("rows"));
    }

    #[test]
    fn truncate_respects_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("abcdefghij", 5), "abcd…");
    }
}
