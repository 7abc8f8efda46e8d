//! Rendering documents for people rather than for storage.
//!
//! Markdown goes through `pulldown-cmark` events and `pulldown-cmark-to-cmark`,
//! so escaping is handled by the serializer. Underline and data tags have no
//! Markdown form and are dropped; equations become `math` fenced blocks.

use super::{Block, Document, Inline, Mark};
use crate::error::{QuireError, Result};
use pulldown_cmark::{Alignment, CodeBlockKind, CowStr, Event, HeadingLevel, LinkType, Tag, TagEnd};
use pulldown_cmark_to_cmark::cmark;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Html,
    Text,
    Markdown,
}

impl ExportFormat {
    /// Detect format from a filename extension. Unknown extensions export as text.
    pub fn from_filename(filename: &str) -> Self {
        let lower = filename.to_lowercase();
        if lower.ends_with(".md") || lower.ends_with(".markdown") {
            ExportFormat::Markdown
        } else if lower.ends_with(".html") || lower.ends_with(".htm") {
            ExportFormat::Html
        } else {
            ExportFormat::Text
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Text => "txt",
            ExportFormat::Markdown => "md",
        }
    }
}

pub fn render(doc: &Document, title: &str, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Html => Ok(to_standalone_html(doc, title)),
        ExportFormat::Text => Ok(to_plain_text(doc)),
        ExportFormat::Markdown => to_markdown(doc),
    }
}

pub fn to_standalone_html(doc: &Document, title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        super::html::escape_text(title),
        doc.to_html()
    )
}

/// Blocks that carry something worth exporting. The trailing empty paragraph does not.
fn exported_blocks(doc: &Document) -> &[Block] {
    let blocks = doc.blocks.as_slice();
    match blocks.split_last() {
        Some((last, rest)) if last.is_empty_paragraph() => rest,
        _ => blocks,
    }
}

pub fn to_plain_text(doc: &Document) -> String {
    let parts: Vec<String> = exported_blocks(doc).iter().map(block_text).collect();
    let mut out = parts.join("\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn block_text(block: &Block) -> String {
    match block {
        Block::Paragraph { indent, .. } | Block::Heading { indent, .. } => {
            let pad = "    ".repeat(*indent as usize);
            block
                .text()
                .lines()
                .map(|line| format!("{}{}", pad, line))
                .collect::<Vec<_>>()
                .join("\n")
        }
        Block::Blockquote { cite, blocks } => {
            let mut inner = blocks.iter().map(block_text).collect::<Vec<_>>().join("\n\n");
            if let Some(cite) = cite {
                inner.push_str(&format!("\n\n-- {}", cite));
            }
            prefix_lines(&inner, "> ")
        }
        Block::BulletList { items } => list_text(items, |_| "- ".to_string()),
        Block::OrderedList { start, items } => {
            list_text(items, |i| format!("{}. ", *start as usize + i))
        }
        Block::CodeBlock { text, .. } => text.clone(),
        Block::HorizontalRule => "---".to_string(),
        Block::Image { src, alt } => format!("[image: {}]", alt.as_deref().unwrap_or(src)),
        Block::FileAttachment(file) => format!("[file: {}]", file.file_name),
        Block::Equation(eq) => eq.latex.clone(),
        Block::Table { rows } => rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| super::inline::plain_text(cell))
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn list_text<F: Fn(usize) -> String>(items: &[Vec<Block>], bullet: F) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let marker = bullet(i);
            let body = item.iter().map(block_text).collect::<Vec<_>>().join("\n");
            let hang = " ".repeat(marker.chars().count());
            let mut lines = body.lines();
            let mut out = format!("{}{}", marker, lines.next().unwrap_or(""));
            for line in lines {
                out.push('\n');
                out.push_str(&hang);
                out.push_str(line);
            }
            out
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn prefix_lines(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                prefix.trim_end().to_string()
            } else {
                format!("{}{}", prefix, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn to_markdown(doc: &Document) -> Result<String> {
    let parts = exported_blocks(doc)
        .iter()
        .map(block_markdown)
        .collect::<Result<Vec<_>>>()?;
    let mut out = parts.join("\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    Ok(out)
}

fn block_markdown(block: &Block) -> Result<String> {
    if let Block::Blockquote { cite, blocks } = block {
        let mut parts = blocks.iter().map(block_markdown).collect::<Result<Vec<_>>>()?;
        if let Some(cite) = cite {
            parts.push(format!("-- {}", cite));
        }
        return Ok(prefix_lines(&parts.join("\n\n"), "> "));
    }
    let mut events = Vec::new();
    block_events(block, &mut events);
    let mut out = String::new();
    cmark(events.iter(), &mut out).map_err(|e| QuireError::Render(e.to_string()))?;
    Ok(out.trim_matches('\n').to_string())
}

fn heading_level(level: u8) -> HeadingLevel {
    match level {
        1 => HeadingLevel::H1,
        2 => HeadingLevel::H2,
        3 => HeadingLevel::H3,
        4 => HeadingLevel::H4,
        5 => HeadingLevel::H5,
        _ => HeadingLevel::H6,
    }
}

fn block_events(block: &Block, events: &mut Vec<Event<'static>>) {
    match block {
        Block::Paragraph { content, .. } => {
            events.push(Event::Start(Tag::Paragraph));
            inline_events(content, events);
            events.push(Event::End(TagEnd::Paragraph));
        }
        Block::Heading { level, content, .. } => {
            let level = heading_level(*level);
            events.push(Event::Start(Tag::Heading {
                level,
                id: None,
                classes: Vec::new(),
                attrs: Vec::new(),
            }));
            inline_events(content, events);
            events.push(Event::End(TagEnd::Heading(level)));
        }
        // Quotes nested inside lists lose their marker and keep their content.
        Block::Blockquote { blocks, .. } => {
            for inner in blocks {
                block_events(inner, events);
            }
        }
        Block::BulletList { items } => list_events(None, items, events),
        Block::OrderedList { start, items } => list_events(Some(*start as u64), items, events),
        Block::CodeBlock { language, text } => {
            code_events(language.clone().unwrap_or_default(), text, events)
        }
        Block::HorizontalRule => events.push(Event::Rule),
        Block::Image { src, alt } => {
            events.push(Event::Start(Tag::Paragraph));
            events.push(Event::Start(Tag::Image {
                link_type: LinkType::Inline,
                dest_url: CowStr::from(src.clone()),
                title: CowStr::from(""),
                id: CowStr::from(""),
            }));
            if let Some(alt) = alt {
                events.push(Event::Text(CowStr::from(alt.clone())));
            }
            events.push(Event::End(TagEnd::Image));
            events.push(Event::End(TagEnd::Paragraph));
        }
        Block::FileAttachment(file) => {
            events.push(Event::Start(Tag::Paragraph));
            events.push(Event::Start(link_tag(&file.src)));
            events.push(Event::Text(CowStr::from(file.file_name.clone())));
            events.push(Event::End(TagEnd::Link));
            events.push(Event::End(TagEnd::Paragraph));
        }
        Block::Equation(eq) => code_events("math".to_string(), &eq.latex, events),
        Block::Table { rows } => table_events(rows, events),
    }
}

fn code_events(info: String, text: &str, events: &mut Vec<Event<'static>>) {
    let mut body = text.to_string();
    if !body.ends_with('\n') {
        body.push('\n');
    }
    events.push(Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(CowStr::from(info)))));
    events.push(Event::Text(CowStr::from(body)));
    events.push(Event::End(TagEnd::CodeBlock));
}

fn list_events(start: Option<u64>, items: &[Vec<Block>], events: &mut Vec<Event<'static>>) {
    events.push(Event::Start(Tag::List(start)));
    for item in items {
        events.push(Event::Start(Tag::Item));
        for block in item {
            block_events(block, events);
        }
        events.push(Event::End(TagEnd::Item));
    }
    events.push(Event::End(TagEnd::List(start.is_some())));
}

fn table_events(rows: &[Vec<Vec<Inline>>], events: &mut Vec<Event<'static>>) {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return;
    }
    events.push(Event::Start(Tag::Table(vec![Alignment::None; columns])));
    for (i, row) in rows.iter().enumerate() {
        let (start, end) = if i == 0 {
            (Tag::TableHead, TagEnd::TableHead)
        } else {
            (Tag::TableRow, TagEnd::TableRow)
        };
        events.push(Event::Start(start));
        for col in 0..columns {
            events.push(Event::Start(Tag::TableCell));
            if let Some(cell) = row.get(col) {
                inline_events(cell, events);
            }
            events.push(Event::End(TagEnd::TableCell));
        }
        events.push(Event::End(end));
    }
    events.push(Event::End(TagEnd::Table));
}

fn link_tag(href: &str) -> Tag<'static> {
    Tag::Link {
        link_type: LinkType::Inline,
        dest_url: CowStr::from(href.to_string()),
        title: CowStr::from(""),
        id: CowStr::from(""),
    }
}

fn inline_events(content: &[Inline], events: &mut Vec<Event<'static>>) {
    for inline in content {
        let (text, marks) = match inline {
            Inline::HardBreak => {
                events.push(Event::HardBreak);
                continue;
            }
            Inline::Text { text, marks } => (text, marks),
        };
        let mut closers = Vec::new();
        for mark in marks {
            let pair = match mark {
                Mark::Link { href } => Some((link_tag(href), TagEnd::Link)),
                Mark::Bold => Some((Tag::Strong, TagEnd::Strong)),
                Mark::Italic => Some((Tag::Emphasis, TagEnd::Emphasis)),
                Mark::Strike => Some((Tag::Strikethrough, TagEnd::Strikethrough)),
                Mark::Code | Mark::Underline | Mark::DataTag { .. } => None,
            };
            if let Some((start, end)) = pair {
                events.push(Event::Start(start));
                closers.push(end);
            }
        }
        if marks.contains(&Mark::Code) {
            events.push(Event::Code(CowStr::from(text.clone())));
        } else {
            events.push(Event::Text(CowStr::from(text.clone())));
        }
        while let Some(end) = closers.pop() {
            events.push(Event::End(end));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::{Equation, FileAttachment};

    fn sample() -> Document {
        Document::from_blocks(vec![
            Block::heading(1, "Results"),
            Block::Paragraph {
                indent: 1,
                content: vec![
                    Inline::text("plain "),
                    Inline::marked("bold", vec![Mark::Bold]),
                    Inline::text(" and "),
                    Inline::marked(
                        "tagged",
                        vec![Mark::DataTag {
                            tag_data: "ref-7".into(),
                        }],
                    ),
                ],
            },
            Block::Equation(Equation {
                latex: "E = mc^2".into(),
            }),
            Block::FileAttachment(FileAttachment::new("files/data.csv", "data.csv", "text/csv")),
        ])
    }

    #[test]
    fn format_detection_from_filename() {
        assert_eq!(ExportFormat::from_filename("a.MD"), ExportFormat::Markdown);
        assert_eq!(ExportFormat::from_filename("a.markdown"), ExportFormat::Markdown);
        assert_eq!(ExportFormat::from_filename("a.htm"), ExportFormat::Html);
        assert_eq!(ExportFormat::from_filename("notes"), ExportFormat::Text);
    }

    #[test]
    fn plain_text_indents_and_skips_trailing_paragraph() {
        let text = to_plain_text(&sample());
        assert!(text.starts_with("Results\n\n    plain bold and tagged"));
        assert!(text.contains("E = mc^2"));
        assert!(text.contains("[file: data.csv]"));
        assert!(text.ends_with("]\n"));
    }

    #[test]
    fn markdown_renders_marks_and_custom_nodes() {
        let md = to_markdown(&sample()).unwrap();
        assert!(md.contains("# Results"));
        assert!(md.contains("**bold**"));
        assert!(md.contains("tagged"));
        assert!(!md.contains("ref-7"));
        assert!(md.contains("```math"));
        assert!(md.contains("[data.csv](files/data.csv)"));
    }

    #[test]
    fn markdown_quotes_blockquotes() {
        let doc = Document::from_blocks(vec![Block::Blockquote {
            cite: Some("Smith 2020".into()),
            blocks: vec![Block::paragraph("quoted line")],
        }]);
        let md = to_markdown(&doc).unwrap();
        assert!(md.contains("> quoted line"));
        assert!(md.contains("> -- Smith 2020"));
    }

    #[test]
    fn standalone_html_wraps_storage_html() {
        let html = to_standalone_html(&sample(), "A & B");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>A &amp; B</title>"));
        assert!(html.contains(r#"data-type="equation""#));
    }

    #[test]
    fn empty_document_exports_empty() {
        let doc = Document::new();
        assert_eq!(to_plain_text(&doc), "");
        assert_eq!(to_markdown(&doc).unwrap(), "");
    }
}
