//! # Schema Extensions
//!
//! Declares every node and mark type the document understands, the way a
//! rich-text schema extension would: a name, whether the node is atomic,
//! whether it holds block children, and for marks whether they are inclusive.
//!
//! Attribute conversions live next to the declarations so the storage codec
//! ([`super::codec`]) and the commands agree on defaults:
//!
//! | Type | Storage attribute | Default | Serialized when |
//! |------|-------------------|---------|-----------------|
//! | paragraph / heading | `data-indent` | `0` | indent > 0 |
//! | fileAttachment | `href`, `data-file-name`, `data-file-type` | required | always |
//! | equation | `data-latex` | required | always |
//! | dataTag | `data-tag` | required | always |
//! | blockquote | `cite` | none | present |

use super::{Block, Mark, MAX_INDENT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeSpec {
    pub name: &'static str,
    /// No cursor may enter an atom's interior.
    pub atom: bool,
    /// Container whose children are blocks (a cursor inside may receive inserted blocks).
    pub block_container: bool,
}

impl NodeSpec {
    /// Whether block nodes (atoms included) may be inserted among this node's children.
    pub fn accepts_block_nodes(&self) -> bool {
        self.block_container && !self.atom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkSpec {
    pub name: &'static str,
    /// Text typed at the mark's end boundary inherits the mark.
    pub inclusive: bool,
}

pub const DATA_TYPE_ATTR: &str = "data-type";
pub const INDENT_ATTR: &str = "data-indent";
pub const FILE_ATTACHMENT_TYPE: &str = "file-attachment";
pub const FILE_NAME_ATTR: &str = "data-file-name";
pub const FILE_TYPE_ATTR: &str = "data-file-type";
pub const EQUATION_TYPE: &str = "equation";
pub const LATEX_ATTR: &str = "data-latex";
pub const DATA_TAG_ATTR: &str = "data-tag";

const fn block(name: &'static str, atom: bool, block_container: bool) -> NodeSpec {
    NodeSpec {
        name,
        atom,
        block_container,
    }
}

pub const PARAGRAPH: NodeSpec = block("paragraph", false, false);
pub const HEADING: NodeSpec = block("heading", false, false);
pub const BLOCKQUOTE: NodeSpec = block("blockquote", false, true);
pub const BULLET_LIST: NodeSpec = block("bulletList", false, true);
pub const ORDERED_LIST: NodeSpec = block("orderedList", false, true);
pub const CODE_BLOCK: NodeSpec = block("codeBlock", false, false);
pub const HORIZONTAL_RULE: NodeSpec = block("horizontalRule", true, false);
pub const IMAGE: NodeSpec = block("image", true, false);
pub const FILE_ATTACHMENT: NodeSpec = block("fileAttachment", true, false);
pub const EQUATION: NodeSpec = block("equation", true, false);
pub const TABLE: NodeSpec = block("table", false, false);

pub fn node_spec(block: &Block) -> &'static NodeSpec {
    match block {
        Block::Paragraph { .. } => &PARAGRAPH,
        Block::Heading { .. } => &HEADING,
        Block::Blockquote { .. } => &BLOCKQUOTE,
        Block::BulletList { .. } => &BULLET_LIST,
        Block::OrderedList { .. } => &ORDERED_LIST,
        Block::CodeBlock { .. } => &CODE_BLOCK,
        Block::HorizontalRule => &HORIZONTAL_RULE,
        Block::Image { .. } => &IMAGE,
        Block::FileAttachment(_) => &FILE_ATTACHMENT,
        Block::Equation(_) => &EQUATION,
        Block::Table { .. } => &TABLE,
    }
}

pub fn mark_spec(mark: &Mark) -> &'static MarkSpec {
    const LINK: MarkSpec = MarkSpec {
        name: "link",
        inclusive: false,
    };
    const BOLD: MarkSpec = MarkSpec {
        name: "bold",
        inclusive: true,
    };
    const ITALIC: MarkSpec = MarkSpec {
        name: "italic",
        inclusive: true,
    };
    const UNDERLINE: MarkSpec = MarkSpec {
        name: "underline",
        inclusive: true,
    };
    const STRIKE: MarkSpec = MarkSpec {
        name: "strike",
        inclusive: true,
    };
    const CODE: MarkSpec = MarkSpec {
        name: "code",
        inclusive: true,
    };
    const DATA_TAG: MarkSpec = MarkSpec {
        name: "dataTag",
        inclusive: true,
    };
    match mark {
        Mark::Link { .. } => &LINK,
        Mark::Bold => &BOLD,
        Mark::Italic => &ITALIC,
        Mark::Underline => &UNDERLINE,
        Mark::Strike => &STRIKE,
        Mark::Code => &CODE,
        Mark::DataTag { .. } => &DATA_TAG,
    }
}

/// Reads `data-indent`. Missing, malformed or negative values fall back to 0;
/// values above the maximum clamp to it.
pub fn parse_indent(raw: Option<&str>) -> u8 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .map(|v| v.clamp(0, MAX_INDENT as i64) as u8)
        .unwrap_or(0)
}

/// The `data-indent` attribute to emit, if any. Zero is the default and is omitted.
pub fn render_indent(indent: u8) -> Option<(&'static str, String)> {
    (indent > 0).then(|| (INDENT_ATTR, indent.min(MAX_INDENT).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::{Equation, FileAttachment};

    #[test]
    fn indent_attribute_defaults_and_clamps() {
        assert_eq!(parse_indent(None), 0);
        assert_eq!(parse_indent(Some("abc")), 0);
        assert_eq!(parse_indent(Some("-3")), 0);
        assert_eq!(parse_indent(Some("2")), 2);
        assert_eq!(parse_indent(Some("17")), MAX_INDENT);
    }

    #[test]
    fn zero_indent_is_not_serialized() {
        assert_eq!(render_indent(0), None);
        assert_eq!(render_indent(3), Some((INDENT_ATTR, "3".to_string())));
    }

    #[test]
    fn custom_nodes_are_atomic_blocks() {
        let attachment = Block::FileAttachment(FileAttachment::new("s", "a.pdf", "application/pdf"));
        let equation = Block::Equation(Equation { latex: "x".into() });
        assert!(node_spec(&attachment).atom);
        assert!(node_spec(&equation).atom);
        assert!(!node_spec(&Block::empty_paragraph()).atom);
    }

    #[test]
    fn only_containers_accept_block_nodes() {
        let quote = Block::Blockquote {
            cite: None,
            blocks: vec![Block::paragraph("q")],
        };
        let list = Block::BulletList {
            items: vec![vec![Block::paragraph("i")]],
        };
        assert!(node_spec(&quote).accepts_block_nodes());
        assert!(node_spec(&list).accepts_block_nodes());
        assert!(!node_spec(&Block::paragraph("p")).accepts_block_nodes());
        let equation = Block::Equation(Equation { latex: "x".into() });
        assert!(!node_spec(&equation).accepts_block_nodes());
        assert!(!node_spec(&Block::Table { rows: Vec::new() }).accepts_block_nodes());
    }

    #[test]
    fn data_tag_is_inclusive_link_is_not() {
        let tag = Mark::DataTag {
            tag_data: "t".into(),
        };
        assert!(tag.is_inclusive());
        assert!(!Mark::Link { href: "x".into() }.is_inclusive());
    }
}
