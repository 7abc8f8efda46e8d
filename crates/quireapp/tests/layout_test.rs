use quireapp::config::EditorSettings;
use quireapp::doc::{Block, Document};
use quireapp::pagination::{PageState, Paginator};

fn paragraphs(n: usize) -> Document {
    let text = vec!["p"; n].join("\n\n");
    Document::from_plain_text(&text)
}

// One-line paragraphs are 24px of text plus 8px spacing at the defaults.
// A4 leaves 851px of body, 808.45px under the 0.95 threshold: 25 per page.

#[test]
fn a4_fills_pages_greedily() {
    let doc = paragraphs(30);
    assert_eq!(doc.blocks.len(), 31);

    let pages = Paginator::a4().layout(&doc);
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].block_count(), 25);
    assert_eq!(pages[1].block_count(), 6);
    assert!(pages.iter().all(|p| p.state == PageState::Stable));
    assert_eq!(pages[0].footer.as_text(), Some("page 1 / 2"));
    assert_eq!(pages[1].body.blocks(), Some(25..31));
}

#[test]
fn lower_threshold_means_more_pages() {
    let mut settings = EditorSettings::default();
    settings.set("page.overflow_threshold", "0.5").unwrap();
    settings.header_text = "Draft".into();

    let pages = settings.paginator().layout(&paragraphs(30));
    let counts: Vec<usize> = pages.iter().map(|p| p.block_count()).collect();
    assert_eq!(counts, vec![13, 13, 5]);
    assert!(pages.iter().all(|p| p.header.as_text() == Some("Draft")));
}

#[test]
fn oversized_block_gets_its_own_overflowing_page() {
    let long = (0..80).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
    let doc = Document::from_blocks(vec![
        Block::paragraph("before"),
        Block::CodeBlock {
            language: None,
            text: long,
        },
        Block::paragraph("after"),
    ]);

    let pages = Paginator::a4().layout(&doc);
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[1].body.blocks(), Some(1..2));
    assert!(pages[1].is_overflowing());
    assert!(!pages[0].is_overflowing());
    assert!(!pages[2].is_overflowing());
}

#[test]
fn empty_document_is_one_page() {
    let pages = Paginator::a4().layout(&Document::new());
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].footer.as_text(), Some("page 1 / 1"));
}
