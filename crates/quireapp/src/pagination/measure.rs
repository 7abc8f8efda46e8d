//! Block height estimation.
//!
//! There is no rendering engine behind the paginator, so heights are
//! estimated: text is wrapped at an average glyph width, using the terminal
//! display width of each character (wide CJK glyphs count double).

use crate::doc::{inline, Block, Inline};
use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

pub trait Measure {
    /// Height in pixels of `block` laid out in a column `width` pixels wide,
    /// including the spacing that follows it.
    fn block_height(&self, block: &Block, width: f64) -> f64;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMetrics {
    pub font_size: f64,
    /// Multiple of `font_size`.
    pub line_height: f64,
    /// Average glyph advance as a fraction of `font_size`.
    pub char_width_ratio: f64,
    pub paragraph_spacing: f64,
    /// Horizontal step per indent level, also used for quote and list nesting.
    pub indent_width: f64,
    pub image_height: f64,
    pub equation_height: f64,
    pub attachment_height: f64,
    pub rule_height: f64,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            line_height: 1.5,
            char_width_ratio: 0.5,
            paragraph_spacing: 8.0,
            indent_width: 24.0,
            image_height: 300.0,
            equation_height: 48.0,
            attachment_height: 40.0,
            rule_height: 17.0,
        }
    }
}

const HEADING_SCALE: [f64; 6] = [2.0, 1.5, 1.25, 1.1, 1.0, 0.9];

impl TextMetrics {
    fn line_px(&self, font_size: f64) -> f64 {
        font_size * self.line_height
    }

    /// Number of wrapped lines `text` takes at `width`. Empty text is one line.
    pub fn wrapped_lines(&self, text: &str, width: f64, font_size: f64) -> usize {
        let glyph = (font_size * self.char_width_ratio).max(1.0);
        let per_line = ((width / glyph).floor() as usize).max(1);
        text.split('\n')
            .map(|line| {
                let cols = UnicodeWidthStr::width(line);
                cols.div_ceil(per_line).max(1)
            })
            .sum()
    }

    fn text_height(&self, content: &[Inline], width: f64, font_size: f64) -> f64 {
        let text = inline::plain_text(content);
        self.wrapped_lines(&text, width, font_size) as f64 * self.line_px(font_size)
    }

    fn blocks_height(&self, blocks: &[Block], width: f64) -> f64 {
        blocks.iter().map(|b| self.block_height(b, width)).sum()
    }
}

impl Measure for TextMetrics {
    fn block_height(&self, block: &Block, width: f64) -> f64 {
        let nested = (width - self.indent_width).max(self.indent_width);
        let body = match block {
            Block::Paragraph { indent, content } => {
                let w = (width - *indent as f64 * self.indent_width).max(self.indent_width);
                self.text_height(content, w, self.font_size)
            }
            Block::Heading {
                level,
                indent,
                content,
            } => {
                let scale = HEADING_SCALE[((*level).clamp(1, 6) - 1) as usize];
                let w = (width - *indent as f64 * self.indent_width).max(self.indent_width);
                self.text_height(content, w, self.font_size * scale)
            }
            // Nested blocks carry their own spacing.
            Block::Blockquote { blocks, .. } => return self.blocks_height(blocks, nested),
            Block::BulletList { items } | Block::OrderedList { items, .. } => {
                return items
                    .iter()
                    .map(|item| self.blocks_height(item, nested))
                    .sum();
            }
            Block::CodeBlock { text, .. } => {
                let small = self.font_size * 0.875;
                self.wrapped_lines(text, width, small) as f64 * self.line_px(small)
            }
            Block::HorizontalRule => self.rule_height,
            Block::Image { .. } => self.image_height,
            Block::FileAttachment(_) => self.attachment_height,
            Block::Equation(_) => self.equation_height,
            Block::Table { rows } => {
                let cols = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
                let cell_width = width / cols as f64;
                rows.iter()
                    .map(|row| {
                        row.iter()
                            .map(|cell| self.text_height(cell, cell_width, self.font_size))
                            .fold(self.line_px(self.font_size), f64::max)
                    })
                    .sum()
            }
        };
        body + self.paragraph_spacing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::Equation;

    const WIDTH: f64 = 602.0;

    #[test]
    fn empty_paragraph_is_one_line() {
        let m = TextMetrics::default();
        assert_eq!(m.block_height(&Block::empty_paragraph(), WIDTH), 24.0 + 8.0);
    }

    #[test]
    fn long_text_wraps() {
        let m = TextMetrics::default();
        // 8px glyphs: 75 columns per line at 602px.
        assert_eq!(m.wrapped_lines(&"x".repeat(75), WIDTH, 16.0), 1);
        assert_eq!(m.wrapped_lines(&"x".repeat(76), WIDTH, 16.0), 2);
        assert_eq!(m.wrapped_lines("a\nb", WIDTH, 16.0), 2);
    }

    #[test]
    fn wide_glyphs_take_two_columns() {
        let m = TextMetrics::default();
        assert_eq!(m.wrapped_lines(&"字".repeat(38), WIDTH, 16.0), 2);
    }

    #[test]
    fn indent_narrows_the_column() {
        let m = TextMetrics::default();
        let text = "x".repeat(75);
        let flat = m.block_height(&Block::paragraph(text.clone()), WIDTH);
        let deep = m.block_height(
            &Block::Paragraph {
                indent: 4,
                content: vec![Inline::text(text)],
            },
            WIDTH,
        );
        assert!(deep > flat);
    }

    #[test]
    fn atoms_have_fixed_heights() {
        let m = TextMetrics::default();
        let eq = Block::Equation(Equation {
            latex: "\\int_0^1 x\\,dx".repeat(50),
        });
        assert_eq!(m.block_height(&eq, WIDTH), 48.0 + 8.0);
    }
}
