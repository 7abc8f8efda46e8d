//! Mapping between [`Document`] and the stored element tree.
//!
//! Serialization emits no insignificant whitespace, so text nodes seen while
//! parsing inline content are always meaningful. At block level, whitespace-only
//! text is formatting and is dropped; other bare inline content is gathered into
//! a paragraph.

use super::html::{self, Element, HtmlNode};
use super::schema::{
    self, DATA_TAG_ATTR, DATA_TYPE_ATTR, EQUATION_TYPE, FILE_ATTACHMENT_TYPE, FILE_NAME_ATTR,
    FILE_TYPE_ATTR, LATEX_ATTR,
};
use super::{inline, Block, Document, Equation, FileAttachment, Inline, Mark};
use crate::error::Result;

impl Document {
    pub fn to_html(&self) -> String {
        html::serialize(&blocks_to_nodes(&self.blocks))
    }

    /// Parse stored HTML. The result is normalized, so an empty input yields an
    /// empty document holding just the trailing paragraph.
    pub fn from_html(input: &str) -> Result<Self> {
        let nodes = html::parse(input)?;
        Ok(Document::from_blocks(parse_blocks(&nodes)))
    }
}

pub fn blocks_to_nodes(blocks: &[Block]) -> Vec<HtmlNode> {
    blocks
        .iter()
        .map(|b| HtmlNode::Element(block_to_element(b)))
        .collect()
}

fn textblock(tag: String, indent: u8, content: &[Inline]) -> Element {
    let mut el = Element::new(tag);
    if let Some((name, value)) = schema::render_indent(indent) {
        el.set_attr(name, value);
    }
    el.children = inlines_to_nodes(content);
    el
}

fn block_to_element(block: &Block) -> Element {
    match block {
        Block::Paragraph { indent, content } => textblock("p".into(), *indent, content),
        Block::Heading {
            level,
            indent,
            content,
        } => textblock(format!("h{}", level), *indent, content),
        Block::Blockquote { cite, blocks } => {
            let mut el = Element::new("blockquote");
            if let Some(cite) = cite {
                el.set_attr("cite", cite.clone());
            }
            el.children = blocks_to_nodes(blocks);
            el
        }
        Block::BulletList { items } => list_element(Element::new("ul"), items),
        Block::OrderedList { start, items } => {
            let mut el = Element::new("ol");
            if *start != 1 {
                el.set_attr("start", start.to_string());
            }
            list_element(el, items)
        }
        Block::CodeBlock { language, text } => {
            let mut code = Element::new("code");
            if let Some(lang) = language {
                code.set_attr("class", format!("language-{}", lang));
            }
            Element::new("pre").child(HtmlNode::Element(code.text_child(text.clone())))
        }
        Block::HorizontalRule => Element::new("hr"),
        Block::Image { src, alt } => {
            let mut el = Element::new("img").attr("src", src.clone());
            if let Some(alt) = alt {
                el.set_attr("alt", alt.clone());
            }
            el
        }
        Block::FileAttachment(file) => Element::new("a")
            .attr(DATA_TYPE_ATTR, FILE_ATTACHMENT_TYPE)
            .attr("href", file.src.clone())
            .attr(FILE_NAME_ATTR, file.file_name.clone())
            .attr(FILE_TYPE_ATTR, file.file_type.clone())
            .text_child(file.file_name.clone()),
        Block::Equation(eq) => Element::new("div")
            .attr(DATA_TYPE_ATTR, EQUATION_TYPE)
            .attr(LATEX_ATTR, eq.latex.clone())
            .text_child(eq.latex.clone()),
        Block::Table { rows } => {
            let body = rows.iter().fold(Element::new("tbody"), |body, row| {
                let tr = row.iter().fold(Element::new("tr"), |tr, cell| {
                    let mut td = Element::new("td");
                    td.children = inlines_to_nodes(cell);
                    tr.child(HtmlNode::Element(td))
                });
                body.child(HtmlNode::Element(tr))
            });
            Element::new("table").child(HtmlNode::Element(body))
        }
    }
}

fn list_element(mut el: Element, items: &[Vec<Block>]) -> Element {
    for item in items {
        let mut li = Element::new("li");
        li.children = blocks_to_nodes(item);
        el.children.push(HtmlNode::Element(li));
    }
    el
}

fn mark_element(mark: &Mark) -> Element {
    match mark {
        Mark::Link { href } => Element::new("a").attr("href", href.clone()),
        Mark::Bold => Element::new("strong"),
        Mark::Italic => Element::new("em"),
        Mark::Underline => Element::new("u"),
        Mark::Strike => Element::new("s"),
        Mark::Code => Element::new("code"),
        Mark::DataTag { tag_data } => Element::new("span").attr(DATA_TAG_ATTR, tag_data.clone()),
    }
}

pub fn inlines_to_nodes(content: &[Inline]) -> Vec<HtmlNode> {
    content
        .iter()
        .map(|inline| match inline {
            Inline::HardBreak => HtmlNode::Element(Element::new("br")),
            Inline::Text { text, marks } => {
                // Marks are canonical (outermost first), so wrap from the innermost out.
                marks
                    .iter()
                    .rev()
                    .fold(HtmlNode::Text(text.clone()), |inner, mark| {
                        HtmlNode::Element(mark_element(mark).child(inner))
                    })
            }
        })
        .collect()
}

fn is_inline_element(el: &Element) -> bool {
    if el.get_attr(DATA_TYPE_ATTR) == Some(FILE_ATTACHMENT_TYPE) {
        return false;
    }
    matches!(
        el.tag.as_str(),
        "a" | "strong" | "b" | "em" | "i" | "u" | "s" | "strike" | "del" | "code" | "span" | "br"
            | "sub" | "sup" | "mark" | "small"
    )
}

pub fn parse_blocks(nodes: &[HtmlNode]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut pending: Vec<HtmlNode> = Vec::new();

    for node in nodes {
        let is_inline = match node {
            HtmlNode::Text(text) => {
                if text.trim().is_empty() && pending.is_empty() {
                    continue;
                }
                true
            }
            HtmlNode::Element(el) => is_inline_element(el),
        };
        if is_inline {
            pending.push(node.clone());
            continue;
        }
        flush_pending(&mut pending, &mut blocks);
        if let HtmlNode::Element(el) = node {
            parse_block_element(el, &mut blocks);
        }
    }
    flush_pending(&mut pending, &mut blocks);
    blocks
}

fn flush_pending(pending: &mut Vec<HtmlNode>, blocks: &mut Vec<Block>) {
    if pending.is_empty() {
        return;
    }
    let mut content = parse_inlines(pending);
    inline::normalize(&mut content);
    pending.clear();
    let is_whitespace = inline::plain_text(&content).trim().is_empty()
        && !content.iter().any(|i| matches!(i, Inline::HardBreak));
    if !is_whitespace {
        blocks.push(Block::Paragraph { indent: 0, content });
    }
}

fn parse_block_element(el: &Element, blocks: &mut Vec<Block>) {
    let tag = el.tag.as_str();
    match tag {
        "p" => blocks.push(Block::Paragraph {
            indent: schema::parse_indent(el.get_attr(schema::INDENT_ATTR)),
            content: parse_inlines(&el.children),
        }),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => blocks.push(Block::Heading {
            level: tag[1..].parse().unwrap_or(1),
            indent: schema::parse_indent(el.get_attr(schema::INDENT_ATTR)),
            content: parse_inlines(&el.children),
        }),
        "blockquote" => blocks.push(Block::Blockquote {
            cite: el.get_attr("cite").map(str::to_string),
            blocks: parse_blocks(&el.children),
        }),
        "ul" => blocks.push(Block::BulletList {
            items: parse_list_items(el),
        }),
        "ol" => blocks.push(Block::OrderedList {
            start: el
                .get_attr("start")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(1),
            items: parse_list_items(el),
        }),
        "pre" => {
            let code = el.children.iter().find_map(|c| match c {
                HtmlNode::Element(e) if e.tag == "code" => Some(e),
                _ => None,
            });
            let language = code
                .and_then(|c| c.get_attr("class"))
                .and_then(|class| {
                    class
                        .split_whitespace()
                        .find_map(|c| c.strip_prefix("language-"))
                })
                .map(str::to_string);
            let text = code.map(Element::text_content).unwrap_or_else(|| el.text_content());
            blocks.push(Block::CodeBlock { language, text });
        }
        "hr" => blocks.push(Block::HorizontalRule),
        "img" => {
            if let Some(src) = el.get_attr("src") {
                blocks.push(Block::Image {
                    src: src.to_string(),
                    alt: el.get_attr("alt").map(str::to_string),
                });
            }
        }
        "a" if el.get_attr(DATA_TYPE_ATTR) == Some(FILE_ATTACHMENT_TYPE) => {
            let text = el.text_content();
            blocks.push(Block::FileAttachment(FileAttachment {
                src: el.get_attr("href").unwrap_or_default().to_string(),
                file_name: el
                    .get_attr(FILE_NAME_ATTR)
                    .map(str::to_string)
                    .unwrap_or(text),
                file_type: el.get_attr(FILE_TYPE_ATTR).unwrap_or_default().to_string(),
            }));
        }
        "div" if el.get_attr(DATA_TYPE_ATTR) == Some(EQUATION_TYPE) => {
            let latex = el
                .get_attr(LATEX_ATTR)
                .map(str::to_string)
                .unwrap_or_else(|| el.text_content());
            blocks.push(Block::Equation(Equation { latex }));
        }
        "table" => blocks.push(Block::Table {
            rows: parse_table_rows(el),
        }),
        // Unknown containers are transparent.
        _ => blocks.extend(parse_blocks(&el.children)),
    }
}

fn parse_list_items(list: &Element) -> Vec<Vec<Block>> {
    list.children
        .iter()
        .filter_map(|c| match c {
            HtmlNode::Element(li) if li.tag == "li" => Some(parse_blocks(&li.children)),
            _ => None,
        })
        .collect()
}

fn parse_table_rows(table: &Element) -> Vec<Vec<Vec<Inline>>> {
    let mut rows = Vec::new();
    collect_rows(&table.children, &mut rows);
    rows
}

fn collect_rows(nodes: &[HtmlNode], rows: &mut Vec<Vec<Vec<Inline>>>) {
    for node in nodes {
        let HtmlNode::Element(el) = node else {
            continue;
        };
        match el.tag.as_str() {
            "tr" => {
                let cells = el
                    .children
                    .iter()
                    .filter_map(|c| match c {
                        HtmlNode::Element(td) if td.tag == "td" || td.tag == "th" => {
                            Some(parse_cell(td))
                        }
                        _ => None,
                    })
                    .collect();
                rows.push(cells);
            }
            _ => collect_rows(&el.children, rows),
        }
    }
}

/// Cells hold inline content; paragraphs inside a cell are flattened with hard breaks.
fn parse_cell(td: &Element) -> Vec<Inline> {
    let mut content = Vec::new();
    for child in &td.children {
        match child {
            HtmlNode::Element(p) if p.tag == "p" => {
                if !content.is_empty() {
                    content.push(Inline::HardBreak);
                }
                content.extend(parse_inlines(&p.children));
            }
            other => content.extend(parse_inlines(std::slice::from_ref(other))),
        }
    }
    content
}

pub fn parse_inlines(nodes: &[HtmlNode]) -> Vec<Inline> {
    let mut out = Vec::new();
    walk_inlines(nodes, &[], &mut out);
    out
}

fn walk_inlines(nodes: &[HtmlNode], marks: &[Mark], out: &mut Vec<Inline>) {
    for node in nodes {
        match node {
            HtmlNode::Text(text) => out.push(Inline::marked(text.clone(), marks.to_vec())),
            HtmlNode::Element(el) if el.tag == "br" => out.push(Inline::HardBreak),
            HtmlNode::Element(el) => {
                let mut inner = marks.to_vec();
                if let Some(mark) = element_mark(el) {
                    inner.push(mark);
                }
                walk_inlines(&el.children, &inner, out);
            }
        }
    }
}

fn element_mark(el: &Element) -> Option<Mark> {
    match el.tag.as_str() {
        "strong" | "b" => Some(Mark::Bold),
        "em" | "i" => Some(Mark::Italic),
        "u" => Some(Mark::Underline),
        "s" | "strike" | "del" => Some(Mark::Strike),
        "code" => Some(Mark::Code),
        "a" => el.get_attr("href").map(|href| Mark::Link {
            href: href.to_string(),
        }),
        "span" => el.get_attr(DATA_TAG_ATTR).map(|tag| Mark::DataTag {
            tag_data: tag.to_string(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::MAX_INDENT;

    fn round_trip(doc: &Document) -> Document {
        Document::from_html(&doc.to_html()).unwrap()
    }

    fn tag(value: &str) -> Mark {
        Mark::DataTag {
            tag_data: value.to_string(),
        }
    }

    #[test]
    fn file_attachment_survives_round_trip() {
        let doc = Document::from_blocks(vec![Block::FileAttachment(FileAttachment::new(
            "https://files.example.org/42",
            "a.pdf",
            "application/pdf",
        ))]);
        let html = doc.to_html();
        assert!(html.contains(r#"data-type="file-attachment""#));
        assert!(html.contains(r#"data-file-name="a.pdf""#));
        assert_eq!(round_trip(&doc), doc);
    }

    #[test]
    fn equation_survives_round_trip() {
        let doc = Document::from_blocks(vec![Block::Equation(Equation {
            latex: r"\frac{a}{b} < c & d".into(),
        })]);
        assert!(doc.to_html().contains(r#"data-type="equation""#));
        assert_eq!(round_trip(&doc), doc);
    }

    #[test]
    fn indent_is_omitted_when_zero() {
        let doc = Document::from_blocks(vec![
            Block::paragraph("flat"),
            Block::Paragraph {
                indent: 3,
                content: vec![Inline::text("deep")],
            },
        ]);
        let html = doc.to_html();
        assert!(html.starts_with("<p>flat</p>"));
        assert!(html.contains(r#"<p data-indent="3">deep</p>"#));
        assert_eq!(round_trip(&doc), doc);
    }

    #[test]
    fn indent_out_of_range_is_clamped_on_parse() {
        let doc = Document::from_html(r#"<p data-indent="12">x</p>"#).unwrap();
        assert_eq!(doc.blocks[0].indent(), Some(MAX_INDENT));
    }

    #[test]
    fn data_tag_is_invisible_and_lossless() {
        let doc = Document::from_blocks(vec![Block::Paragraph {
            indent: 0,
            content: vec![
                Inline::text("see "),
                Inline::marked("this", vec![Mark::Bold, tag("cite:smith2020")]),
            ],
        }]);
        let html = doc.to_html();
        assert!(html.contains(r#"<span data-tag="cite:smith2020">this</span>"#));
        assert_eq!(round_trip(&doc), doc);
    }

    #[test]
    fn structural_blocks_round_trip() {
        let doc = Document::from_blocks(vec![
            Block::heading(2, "Method"),
            Block::Blockquote {
                cite: Some("Smith 2020".into()),
                blocks: vec![Block::paragraph("quoted")],
            },
            Block::OrderedList {
                start: 3,
                items: vec![vec![Block::paragraph("three")], vec![Block::paragraph("four")]],
            },
            Block::BulletList {
                items: vec![vec![Block::paragraph("dot")]],
            },
            Block::CodeBlock {
                language: Some("rust".into()),
                text: "fn main() {\n    x < y;\n}".into(),
            },
            Block::HorizontalRule,
            Block::Image {
                src: "fig1.png".into(),
                alt: Some("Figure 1".into()),
            },
            Block::Table {
                rows: vec![vec![vec![Inline::text("a")], vec![Inline::text("b")]]],
            },
            Block::Paragraph {
                indent: 1,
                content: vec![
                    Inline::marked(
                        "link",
                        vec![Mark::Link {
                            href: "https://example.org/?a=1&b=2".into(),
                        }],
                    ),
                    Inline::HardBreak,
                    Inline::marked("code", vec![Mark::Code]),
                ],
            },
        ]);
        assert_eq!(round_trip(&doc), doc);
    }

    #[test]
    fn bare_inline_content_becomes_a_paragraph() {
        let doc = Document::from_html("hello <b>world</b>\n<p>next</p>").unwrap();
        assert_eq!(doc.blocks[0].text(), "hello world\n");
        assert_eq!(doc.blocks[1].text(), "next");
    }

    #[test]
    fn unknown_wrappers_are_transparent() {
        let doc = Document::from_html("<html><body><section><p>x</p></section></body></html>")
            .unwrap();
        assert_eq!(doc.blocks[0], Block::paragraph("x"));
    }
}
