//! Batches document change notifications into layout passes.
//!
//! Edits call [`PaginationScheduler::notify`] with the version they committed.
//! The frame loop calls [`PaginationScheduler::on_frame`]; a pass runs only if
//! a notification arrived and the committed state has moved past the last
//! version that was laid out. Any number of edits between two frames cost a
//! single pass.
//!
//! Versions only order edits within one [`EditorState`]. Opening another
//! document goes through [`PaginationScheduler::attach`], which forgets the
//! previous document's versions.

use super::{Measure, Page, Paginator};
use crate::editor::EditorState;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct PaginationScheduler {
    pending: Option<u64>,
    laid_out: Option<u64>,
    pages: Vec<Page>,
    passes: usize,
}

impl PaginationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `version` was committed.
    pub fn notify(&mut self, version: u64) {
        self.pending = Some(self.pending.map_or(version, |p| p.max(version)));
    }

    pub fn is_dirty(&self) -> bool {
        self.pending.is_some()
    }

    /// Run at most one layout pass against the committed state.
    ///
    /// Returns the new pages when a pass ran. A notification for a version the
    /// state has not committed yet stays pending.
    pub fn on_frame<M: Measure>(
        &mut self,
        paginator: &Paginator<M>,
        state: &EditorState,
    ) -> Option<&[Page]> {
        let pending = self.pending?;
        if pending > state.version {
            return None;
        }
        self.pending = None;
        if self.laid_out == Some(state.version) {
            return None;
        }
        self.pages = paginator.layout(&state.doc);
        self.laid_out = Some(state.version);
        self.passes += 1;
        debug!(
            version = state.version,
            pass = self.passes,
            "pagination pass"
        );
        Some(&self.pages)
    }

    /// Switch to a freshly opened document and lay it out now.
    pub fn attach<M: Measure>(
        &mut self,
        paginator: &Paginator<M>,
        state: &EditorState,
    ) -> &[Page] {
        self.reset();
        self.force(paginator, state)
    }

    /// Forget every pending and laid-out version along with the pages.
    pub fn reset(&mut self) {
        self.pending = None;
        self.laid_out = None;
        self.pages.clear();
    }

    /// Lay out immediately, ignoring batching.
    pub fn force<M: Measure>(&mut self, paginator: &Paginator<M>, state: &EditorState) -> &[Page] {
        self.pending = None;
        self.pages = paginator.layout(&state.doc);
        self.laid_out = Some(state.version);
        self.passes += 1;
        &self.pages
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn laid_out_version(&self) -> Option<u64> {
        self.laid_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::{Block, Document};
    use crate::editor::InsertText;

    fn open() -> (EditorState, Paginator, PaginationScheduler) {
        let state = EditorState::new(Document::from_blocks(vec![Block::paragraph("x")]));
        let mut scheduler = PaginationScheduler::new();
        let paginator = Paginator::a4();
        scheduler.attach(&paginator, &state);
        (state, paginator, scheduler)
    }

    #[test]
    fn rapid_edits_cost_one_pass_per_frame() {
        let (mut state, paginator, mut scheduler) = open();
        for _ in 0..10 {
            state.execute(&InsertText::new("a")).unwrap();
            scheduler.notify(state.version);
        }
        assert!(scheduler.on_frame(&paginator, &state).is_some());
        assert!(scheduler.on_frame(&paginator, &state).is_none());
        assert_eq!(scheduler.passes(), 2);
        assert_eq!(scheduler.laid_out_version(), Some(10));
    }

    #[test]
    fn idle_frames_do_nothing() {
        let (state, paginator, mut scheduler) = open();
        assert!(scheduler.on_frame(&paginator, &state).is_none());
        assert_eq!(scheduler.passes(), 1);
    }

    #[test]
    fn uncommitted_version_waits() {
        let (state, paginator, mut scheduler) = open();
        scheduler.notify(state.version + 1);
        assert!(scheduler.on_frame(&paginator, &state).is_none());
        assert!(scheduler.is_dirty());
    }

    #[test]
    fn notification_for_already_laid_out_version_is_dropped() {
        let (state, paginator, mut scheduler) = open();
        scheduler.notify(state.version);
        assert!(scheduler.on_frame(&paginator, &state).is_none());
        assert!(!scheduler.is_dirty());
        assert_eq!(scheduler.passes(), 1);
    }

    #[test]
    fn another_document_starts_from_scratch() {
        let (_, paginator, mut scheduler) = open();
        let other = EditorState::new(Document::from_blocks(vec![
            Block::paragraph("one"),
            Block::paragraph("two"),
        ]));
        assert_eq!(other.version, 0);

        scheduler.reset();
        scheduler.notify(other.version);
        let pages = scheduler.on_frame(&paginator, &other).unwrap();
        assert_eq!(pages[0].body.blocks(), Some(0..other.doc.blocks.len()));
        assert_eq!(scheduler.laid_out_version(), Some(0));

        let pages = scheduler.attach(&paginator, &other).len();
        assert_eq!(pages, 1);
        assert_eq!(scheduler.passes(), 3);
    }
}
