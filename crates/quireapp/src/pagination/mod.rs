//! # Pagination
//!
//! Emulates fixed-size printed pages over one continuous document. Pages are
//! a derived view-model: they are recomputed from the committed document and
//! never stored.
//!
//! Layout is a greedy fill over top-level blocks. Each block is measured by a
//! [`Measure`] implementation; blocks are appended to the current page until
//! the next one would push the body past [`PageLayout::max_body_height`], at
//! which point a continuation page is started. A block taller than a whole
//! page body is never split: it sits alone on its page, and that page is
//! reported as [`PageState::Overflowing`]. Overflow is a signal, not an error.
//!
//! Layout passes are driven by [`scheduler::PaginationScheduler`], which
//! batches change notifications into at most one pass per frame.

pub mod measure;
pub mod scheduler;

use crate::doc::{Block, Document};
use crate::error::{QuireError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::debug;

pub use measure::{Measure, TextMetrics};
pub use scheduler::PaginationScheduler;

/// Page geometry in CSS pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_width: f64,
    pub page_height: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub header_height: f64,
    pub footer_height: f64,
    /// Fraction of the content height the body may fill before a page overflows.
    pub overflow_threshold: f64,
}

impl PageLayout {
    /// A4 at 96 dpi with one-inch margins.
    pub fn a4() -> Self {
        Self {
            page_width: 794.0,
            page_height: 1123.0,
            margin_top: 96.0,
            margin_bottom: 96.0,
            margin_left: 96.0,
            margin_right: 96.0,
            header_height: 40.0,
            footer_height: 40.0,
            overflow_threshold: 0.95,
        }
    }

    pub fn content_width(&self) -> f64 {
        (self.page_width - self.margin_left - self.margin_right).max(0.0)
    }

    /// Page height minus margins minus the reserved header and footer.
    pub fn content_height(&self) -> f64 {
        (self.page_height
            - self.margin_top
            - self.margin_bottom
            - self.header_height
            - self.footer_height)
            .max(0.0)
    }

    pub fn max_body_height(&self) -> f64 {
        self.content_height() * self.overflow_threshold
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.overflow_threshold > 0.0 && self.overflow_threshold <= 1.0) {
            return Err(QuireError::Config(format!(
                "overflow threshold must be in (0, 1], got {}",
                self.overflow_threshold
            )));
        }
        if self.content_width() <= 0.0 || self.content_height() <= 0.0 {
            return Err(QuireError::Config(
                "margins, header and footer leave no room for content".into(),
            ));
        }
        Ok(())
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::a4()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageState {
    Measuring,
    Stable,
    Overflowing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionContent {
    Text(String),
    /// Indices into `Document::blocks`.
    Blocks(Range<usize>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentRegion {
    pub content: RegionContent,
    pub height: f64,
}

impl ContentRegion {
    fn text(text: impl Into<String>, height: f64) -> Self {
        Self {
            content: RegionContent::Text(text.into()),
            height,
        }
    }

    pub fn blocks(&self) -> Option<Range<usize>> {
        match &self.content {
            RegionContent::Blocks(range) => Some(range.clone()),
            RegionContent::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            RegionContent::Text(text) => Some(text),
            RegionContent::Blocks(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    /// 1-based.
    pub number: usize,
    pub header: ContentRegion,
    pub body: ContentRegion,
    pub footer: ContentRegion,
    pub state: PageState,
}

impl Page {
    pub fn is_overflowing(&self) -> bool {
        self.state == PageState::Overflowing
    }

    pub fn block_count(&self) -> usize {
        self.body.blocks().map(|r| r.len()).unwrap_or(0)
    }
}

pub fn footer_text(number: usize, total: usize) -> String {
    format!("page {} / {}", number, total)
}

/// Blocks gathered for the page being filled.
struct PageCursor {
    start: usize,
    end: usize,
    height: f64,
}

impl PageCursor {
    fn new(start: usize) -> Self {
        Self {
            start,
            end: start,
            height: 0.0,
        }
    }

    fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone)]
pub struct Paginator<M: Measure = TextMetrics> {
    page_layout: PageLayout,
    measure: M,
    header_text: String,
}

impl Paginator<TextMetrics> {
    pub fn a4() -> Self {
        Self::new(PageLayout::a4(), TextMetrics::default())
    }
}

impl<M: Measure> Paginator<M> {
    pub fn new(page_layout: PageLayout, measure: M) -> Self {
        Self {
            page_layout,
            measure,
            header_text: String::new(),
        }
    }

    pub fn page_layout(&self) -> &PageLayout {
        &self.page_layout
    }

    pub fn set_page_layout(&mut self, page_layout: PageLayout) {
        self.page_layout = page_layout;
    }

    pub fn measure(&self) -> &M {
        &self.measure
    }

    pub fn measure_mut(&mut self) -> &mut M {
        &mut self.measure
    }

    pub fn header_text(&self) -> &str {
        &self.header_text
    }

    pub fn set_header_text(&mut self, text: impl Into<String>) {
        self.header_text = text.into();
    }

    /// Classify a measured body height against the configured threshold.
    pub fn measure_page(&self, body_height: f64) -> PageState {
        if body_height > self.page_layout.max_body_height() {
            PageState::Overflowing
        } else {
            PageState::Stable
        }
    }

    pub fn block_height(&self, block: &Block) -> f64 {
        self.measure
            .block_height(block, self.page_layout.content_width())
    }

    /// Lay out the whole document. Always yields at least one page.
    pub fn layout(&self, doc: &Document) -> Vec<Page> {
        let max = self.page_layout.max_body_height();
        let mut bodies: Vec<PageCursor> = Vec::new();
        let mut cursor = PageCursor::new(0);

        for (i, block) in doc.blocks.iter().enumerate() {
            let height = self.block_height(block);
            if !cursor.is_empty() && cursor.height + height > max {
                bodies.push(cursor);
                cursor = PageCursor::new(i);
            }
            cursor.end = i + 1;
            cursor.height += height;
        }
        bodies.push(cursor);

        let total = bodies.len();
        let pages: Vec<Page> = bodies
            .into_iter()
            .enumerate()
            .map(|(i, body)| {
                let mut page = Page {
                    number: i + 1,
                    header: ContentRegion::text(
                        self.header_text.clone(),
                        self.page_layout.header_height,
                    ),
                    body: ContentRegion {
                        content: RegionContent::Blocks(body.start..body.end),
                        height: body.height,
                    },
                    footer: ContentRegion::text(
                        footer_text(i + 1, total),
                        self.page_layout.footer_height,
                    ),
                    state: PageState::Measuring,
                };
                page.state = self.measure_page(page.body.height);
                page
            })
            .collect();

        let overflowing = pages.iter().filter(|p| p.is_overflowing()).count();
        debug!(
            blocks = doc.blocks.len(),
            pages = total,
            overflowing,
            "layout pass"
        );
        pages
    }
}

impl Default for Paginator<TextMetrics> {
    fn default() -> Self {
        Self::a4()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every block has the same fixed height, except images which have their own.
    struct Fixed {
        block: f64,
        image: f64,
    }

    impl Measure for Fixed {
        fn block_height(&self, block: &Block, _width: f64) -> f64 {
            match block {
                Block::Image { .. } => self.image,
                _ => self.block,
            }
        }
    }

    fn paginator(block: f64, image: f64) -> Paginator<Fixed> {
        Paginator::new(PageLayout::a4(), Fixed { block, image })
    }

    fn paragraphs(n: usize) -> Document {
        Document::from_blocks((0..n).map(|i| Block::paragraph(format!("p{}", i))).collect())
    }

    #[test]
    fn a4_geometry() {
        let layout = PageLayout::a4();
        assert_eq!(layout.content_height(), 1123.0 - 192.0 - 80.0);
        assert_eq!(layout.content_width(), 794.0 - 192.0);
        assert!((layout.max_body_height() - 851.0 * 0.95).abs() < 1e-9);
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn invalid_threshold_is_a_config_error() {
        let layout = PageLayout {
            overflow_threshold: 1.5,
            ..PageLayout::a4()
        };
        assert!(matches!(layout.validate(), Err(QuireError::Config(_))));
    }

    #[test]
    fn threshold_property() {
        let p = Paginator::a4();
        let max = p.page_layout().max_body_height();
        assert_eq!(p.measure_page(max), PageState::Stable);
        assert_eq!(p.measure_page(max + 0.5), PageState::Overflowing);
        assert_eq!(p.measure_page(0.0), PageState::Stable);
    }

    #[test]
    fn empty_document_has_one_stable_page() {
        let pages = Paginator::a4().layout(&Document::new());
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].state, PageState::Stable);
        assert_eq!(pages[0].footer.as_text(), Some("page 1 / 1"));
    }

    #[test]
    fn greedy_fill_creates_continuation_pages() {
        // 808.45 max body height fits 8 blocks of 100px per page.
        let doc = paragraphs(19); // plus the trailing paragraph = 20 blocks
        let pages = paginator(100.0, 100.0).layout(&doc);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].body.blocks(), Some(0..8));
        assert_eq!(pages[1].body.blocks(), Some(8..16));
        assert_eq!(pages[2].body.blocks(), Some(16..20));
        assert!(pages.iter().all(|p| p.state == PageState::Stable));
        let numbers: Vec<usize> = pages.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(pages[1].footer.as_text(), Some("page 2 / 3"));
    }

    #[test]
    fn oversized_atom_overflows_alone_and_is_not_split() {
        let doc = Document::from_blocks(vec![
            Block::paragraph("before"),
            Block::Image {
                src: "huge.png".into(),
                alt: None,
            },
            Block::paragraph("after"),
        ]);
        let pages = paginator(50.0, 2000.0).layout(&doc);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].body.blocks(), Some(0..1));
        assert_eq!(pages[1].body.blocks(), Some(1..2));
        assert_eq!(pages[1].state, PageState::Overflowing);
        assert_eq!(pages[1].body.height, 2000.0);
        assert_eq!(pages[2].body.blocks(), Some(2..4));
        assert_eq!(pages[2].state, PageState::Stable);
    }

    #[test]
    fn every_block_lands_on_exactly_one_page() {
        let doc = paragraphs(57);
        let pages = paginator(37.0, 0.0).layout(&doc);
        let mut next = 0;
        for page in &pages {
            let range = page.body.blocks().unwrap();
            assert_eq!(range.start, next);
            next = range.end;
        }
        assert_eq!(next, doc.blocks.len());
    }

    #[test]
    fn header_text_is_repeated_on_every_page() {
        let mut p = paginator(500.0, 0.0);
        p.set_header_text("Draft");
        let pages = p.layout(&paragraphs(3));
        assert!(pages.len() > 1);
        assert!(pages.iter().all(|pg| pg.header.as_text() == Some("Draft")));
    }
}
