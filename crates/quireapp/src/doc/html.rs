//! # Storage Format
//!
//! Documents are stored as an HTML-like structural tree: elements with a tag,
//! ordered attributes and children, plus text nodes. This module only knows
//! about that generic tree; mapping it to and from [`super::Document`] is the
//! job of [`super::codec`].
//!
//! The parser is deliberately forgiving. It accepts what editors emit and what
//! users paste: unquoted attributes, uppercase tags, stray closing tags,
//! comments and doctypes. Unclosed elements are closed at end of input.

use crate::error::{QuireError, Result};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "wbr",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlNode {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<HtmlNode>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn child(mut self, node: HtmlNode) -> Self {
        self.children.push(node);
        self
    }

    pub fn text_child(self, text: impl Into<String>) -> Self {
        self.child(HtmlNode::Text(text.into()))
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.tag.as_str())
    }

    /// Concatenated text of all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[HtmlNode], out: &mut String) {
    for node in nodes {
        match node {
            HtmlNode::Text(t) => out.push_str(t),
            HtmlNode::Element(el) if el.tag == "br" => out.push('\n'),
            HtmlNode::Element(el) => collect_text(&el.children, out),
        }
    }
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

pub fn serialize(nodes: &[HtmlNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &HtmlNode, out: &mut String) {
    match node {
        HtmlNode::Text(text) => out.push_str(&escape_text(text)),
        HtmlNode::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for (name, value) in &el.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }
            out.push('>');
            if el.is_void() {
                return;
            }
            for child in &el.children {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}

/// Parse a fragment into a list of top-level nodes.
pub fn parse(input: &str) -> Result<Vec<HtmlNode>> {
    Parser::new(input).run()
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    // Root plus every open element; the root is never popped.
    stack: Vec<Element>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            stack: vec![Element::new("#root")],
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn run(mut self) -> Result<Vec<HtmlNode>> {
        while self.pos < self.src.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.skip_past("-->");
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.skip_past(">");
            } else if rest.starts_with("</") {
                self.close_tag()?;
            } else if rest.starts_with('<')
                && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic())
            {
                self.open_tag()?;
            } else {
                self.text();
            }
        }
        while self.stack.len() > 1 {
            self.pop();
        }
        let root = self.stack.pop().unwrap_or_default();
        Ok(root.children)
    }

    fn skip_past(&mut self, needle: &str) {
        match self.rest().find(needle) {
            Some(i) => self.pos += i + needle.len(),
            None => self.pos = self.src.len(),
        }
    }

    fn push_node(&mut self, node: HtmlNode) {
        if let Some(top) = self.stack.last_mut() {
            if let (HtmlNode::Text(new), Some(HtmlNode::Text(prev))) =
                (&node, top.children.last_mut())
            {
                prev.push_str(new);
                return;
            }
            top.children.push(node);
        }
    }

    fn pop(&mut self) {
        if self.stack.len() > 1 {
            if let Some(el) = self.stack.pop() {
                self.push_node(HtmlNode::Element(el));
            }
        }
    }

    fn text(&mut self) {
        let rest = self.rest();
        // A '<' that does not start markup is literal text.
        let end = rest
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '<')
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let raw = &rest[..end];
        self.pos += end;
        self.push_node(HtmlNode::Text(decode_entities(raw)));
    }

    fn close_tag(&mut self) -> Result<()> {
        let rest = self.rest();
        let end = rest
            .find('>')
            .ok_or_else(|| QuireError::Parse(format!("unterminated closing tag at {}", self.pos)))?;
        let name = rest[2..end].trim().to_ascii_lowercase();
        self.pos += end + 1;
        // Stray closing tags are ignored; otherwise close everything up to the match.
        if let Some(depth) = self.stack.iter().rposition(|el| el.tag == name) {
            if depth > 0 {
                while self.stack.len() > depth {
                    self.pop();
                }
            }
        }
        Ok(())
    }

    fn open_tag(&mut self) -> Result<()> {
        let start = self.pos;
        self.pos += 1;
        let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == '-' || c == ':');
        let mut el = Element::new(name.to_ascii_lowercase());
        let mut self_closing = false;
        loop {
            self.skip_ws();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(QuireError::Parse(format!("unterminated tag at {}", start)));
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                self_closing = true;
                break;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break;
            }
            if rest.starts_with('/') {
                self.pos += 1;
                continue;
            }
            let attr_name = self
                .take_while(|c| !c.is_whitespace() && c != '=' && c != '>' && c != '/')
                .to_ascii_lowercase();
            if attr_name.is_empty() {
                // Skip a character we cannot interpret to guarantee progress.
                self.pos += rest.chars().next().map(char::len_utf8).unwrap_or(1);
                continue;
            }
            self.skip_ws();
            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_ws();
                self.attr_value()
            } else {
                String::new()
            };
            if el.get_attr(&attr_name).is_none() {
                el.attrs.push((attr_name, value));
            }
        }
        if self_closing || el.is_void() {
            self.push_node(HtmlNode::Element(el));
        } else {
            self.stack.push(el);
        }
        Ok(())
    }

    fn attr_value(&mut self) -> String {
        let rest = self.rest();
        if let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') {
            let body = &rest[1..];
            let end = body.find(quote).unwrap_or(body.len());
            let raw = &body[..end];
            self.pos += 1 + end + usize::from(end < body.len());
            decode_entities(raw)
        } else {
            decode_entities(self.take_while(|c| !c.is_whitespace() && c != '>'))
        }
    }

    fn take_while<F: Fn(char) -> bool>(&mut self, pred: F) -> &'a str {
        let rest = self.rest();
        let end = rest
            .char_indices()
            .find(|(_, c)| !pred(*c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }

    fn skip_ws(&mut self) {
        self.take_while(char::is_whitespace);
    }
}

pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|end| *end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            decode_entity(entity).map(|c| (c, end + 1))
        });
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(node: &HtmlNode) -> &Element {
        match node {
            HtmlNode::Element(e) => e,
            HtmlNode::Text(t) => panic!("expected element, got text {t:?}"),
        }
    }

    #[test]
    fn parses_nested_elements_and_attributes() {
        let nodes = parse(r#"<p data-indent="2">a <strong>b</strong></p>"#).unwrap();
        assert_eq!(nodes.len(), 1);
        let p = el(&nodes[0]);
        assert_eq!(p.tag, "p");
        assert_eq!(p.get_attr("data-indent"), Some("2"));
        assert_eq!(p.children.len(), 2);
        assert_eq!(p.text_content(), "a b");
    }

    #[test]
    fn tolerates_unquoted_uppercase_and_void_tags() {
        let nodes = parse("<P CLASS=x>one<BR>two</p><hr/>").unwrap();
        let p = el(&nodes[0]);
        assert_eq!(p.get_attr("class"), Some("x"));
        assert_eq!(p.text_content(), "one\ntwo");
        assert_eq!(el(&nodes[1]).tag, "hr");
    }

    #[test]
    fn skips_comments_and_stray_closers() {
        let nodes = parse("<!-- note --><p>x</span></p>").unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(el(&nodes[0]).text_content(), "x");
    }

    #[test]
    fn closes_unclosed_elements_at_end() {
        let nodes = parse("<div><p>open").unwrap();
        let div = el(&nodes[0]);
        assert_eq!(el(&div.children[0]).text_content(), "open");
    }

    #[test]
    fn escapes_and_decodes_entities() {
        let original = r#"a < b & "c" > d"#;
        let node = HtmlNode::Element(Element::new("span").attr("title", original).text_child(original));
        let html = serialize(std::slice::from_ref(&node));
        assert!(!html.contains("\"c\" >"));
        let back = parse(&html).unwrap();
        assert_eq!(back, vec![node]);
        assert_eq!(decode_entities("&#65;&#x42;&unknown;"), "AB&unknown;");
    }

    #[test]
    fn unterminated_tag_is_a_parse_error() {
        assert!(parse("<p class=").is_err());
    }
}
