//! # API Facade
//!
//! The API layer is a **thin facade** over the command layer and the single
//! entry point for every quire operation, whatever the UI.
//!
//! ## Role and Responsibilities
//!
//! The API facade:
//! - **Dispatches** to the appropriate command function
//! - **Normalizes inputs**: node and resource references given as text (a
//!   UUID, a unique name, or a unique UUID prefix) become UUIDs
//! - **Keeps the session view**: the loaded [`Tree`] with its selection and
//!   expansion, and the last error as a banner message
//! - **Returns structured types** (`Result<CmdResult>`)
//!
//! ## What the API Does NOT Do
//!
//! - **Business logic**: that belongs in `commands/*.rs`
//! - **I/O operations**: no stdout, stderr or prompts
//! - **Retries**: a failed call is reported once and left to the user
//!
//! ## Mutate, Then Reload
//!
//! Every tree mutation goes to the backend first. Only when it succeeds is the
//! whole tree reloaded from the backend, so the local view never diverges from
//! what the backend holds. A failed mutation leaves the local tree untouched,
//! records the error in [`QuireApi::banner`] and returns it.
//!
//! ## Generic Over Backends
//!
//! `QuireApi<B>` works with anything implementing both [`TreeBackend`] and
//! [`ResourceBackend`]:
//! - Local: `QuireApi<FsStore>`
//! - Remote: `QuireApi<HttpBackend<T>>`
//! - Testing: `QuireApi<MemStore>`
//!
//! ## Testing Strategy
//!
//! API tests verify dispatch, reference resolution and the reload/banner
//! behavior. Command logic is tested in the command modules.

use crate::commands::note::BlockSpan;
use crate::commands::{self, config::ConfigAction, CmdResult, QuirePaths};
use crate::config::EditorSettings;
use crate::doc::export::ExportFormat;
use crate::doc::Document;
use crate::editor::{Command, EditorState};
use crate::error::{QuireError, Result};
use crate::model::{NodeKind, ResourcePayload, TreeNodeRecord};
use crate::references::ReferenceItem;
use crate::store::{ResourceBackend, TreeBackend};
use crate::tree::{DeletePreview, Tree, TreeRow};
use std::path::Path;
use tracing::{debug, warn};
use uuid::Uuid;

/// The main API facade for quire operations.
pub struct QuireApi<B: TreeBackend + ResourceBackend> {
    backend: B,
    paths: QuirePaths,
    settings: EditorSettings,
    tree: Tree,
    banner: Option<String>,
}

/// Shortest id prefix accepted as a reference.
const MIN_PREFIX: usize = 4;

/// Resolve `input` against `(id, name)` candidates: full UUID, then unique
/// case-insensitive name, then unique UUID prefix.
fn resolve_among<'a>(
    input: &str,
    what: &str,
    candidates: impl Iterator<Item = (Uuid, &'a str)> + Clone,
) -> Result<Uuid> {
    let input = input.trim();
    if input.is_empty() {
        return Err(QuireError::validation(format!("empty {} reference", what)));
    }
    if let Ok(id) = Uuid::parse_str(input) {
        if candidates.clone().any(|(c, _)| c == id) {
            return Ok(id);
        }
    }
    let lower = input.to_lowercase();
    let by_name: Vec<Uuid> = candidates
        .clone()
        .filter(|(_, name)| name.to_lowercase() == lower)
        .map(|(id, _)| id)
        .collect();
    let matches = if !by_name.is_empty() || lower.len() < MIN_PREFIX {
        by_name
    } else {
        candidates
            .filter(|(id, _)| id.to_string().starts_with(&lower))
            .map(|(id, _)| id)
            .collect()
    };
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(QuireError::Api(format!("no {} matches '{}'", what, input))),
        many => Err(QuireError::Api(format!(
            "'{}' matches {} {}s, use a longer id",
            input,
            many.len(),
            what
        ))),
    }
}

impl<B: TreeBackend + ResourceBackend> QuireApi<B> {
    /// Connect and load the tree.
    pub fn new(backend: B, paths: QuirePaths, settings: EditorSettings) -> Result<Self> {
        let mut api = Self {
            backend,
            paths,
            settings,
            tree: Tree::new(),
            banner: None,
        };
        api.reload()?;
        Ok(api)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn paths(&self) -> &QuirePaths {
        &self.paths
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Message for the last failed call, cleared by the next success.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn clear_banner(&mut self) {
        self.banner = None;
    }

    /// Replace the local tree with the backend's, keeping view state.
    pub fn reload(&mut self) -> Result<()> {
        let records = self.backend.list_nodes();
        let records = self.track(records)?;
        let fresh = Tree::from_records(records);
        self.tree.replace_nodes(fresh.roots);
        debug!(nodes = self.tree.len(), "tree reloaded");
        Ok(())
    }

    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.banner = None;
                Ok(value)
            }
            Err(err) => {
                warn!(error = %err, "operation failed");
                self.banner = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn mutate(&mut self, op: impl FnOnce(&mut B) -> Result<CmdResult>) -> Result<CmdResult> {
        let result = op(&mut self.backend);
        let result = self.track(result)?;
        self.reload()?;
        Ok(result)
    }

    /// Turn a user-supplied node reference into an id.
    pub fn resolve(&self, input: &str) -> Result<Uuid> {
        let nodes: Vec<(Uuid, String)> = self
            .tree
            .to_records()
            .into_iter()
            .map(|r| (r.id, r.name))
            .collect();
        resolve_among(input, "node", nodes.iter().map(|(id, n)| (*id, n.as_str())))
    }

    fn resolve_opt(&self, input: Option<&str>) -> Result<Option<Uuid>> {
        input.map(|i| self.resolve(i)).transpose()
    }

    pub fn resolve_resource(&mut self, input: &str) -> Result<Uuid> {
        let resources = self.backend.list_resources();
        let resources = self.track(resources)?;
        resolve_among(
            input,
            "resource",
            resources.iter().map(|r| (r.id, r.title.as_str())),
        )
    }

    // --- Tree ---

    pub fn rows(&self) -> Vec<TreeRow> {
        self.tree.flatten()
    }

    pub fn list(&mut self, expand_all: bool) -> Result<CmdResult> {
        let selected = self.tree.selected;
        let result = commands::list::run(&mut self.backend, expand_all, selected);
        self.track(result)
    }

    pub fn select(&mut self, target: &str) -> Result<Uuid> {
        let id = self.resolve(target)?;
        self.tree.select(id)?;
        Ok(id)
    }

    pub fn toggle_expand(&mut self, target: &str) -> Result<bool> {
        let id = self.resolve(target)?;
        self.tree.toggle_expand(id)
    }

    pub fn create(
        &mut self,
        name: &str,
        kind: NodeKind,
        parent: Option<&str>,
    ) -> Result<CmdResult> {
        let parent = self.resolve_opt(parent)?;
        self.mutate(|b| commands::create::run(b, name, kind, parent, None))
    }

    pub fn rename(&mut self, target: &str, name: &str) -> Result<CmdResult> {
        let id = self.resolve(target)?;
        self.mutate(|b| commands::rename::run(b, id, name))
    }

    pub fn delete_preview(&mut self, target: &str) -> Result<DeletePreview> {
        let id = self.resolve(target)?;
        self.tree.delete_preview(id)
    }

    /// Delete after the client has confirmed the preview.
    pub fn delete(&mut self, target: &str) -> Result<CmdResult> {
        let id = self.resolve(target)?;
        self.mutate(|b| commands::delete::run(b, id))
    }

    pub fn move_node(
        &mut self,
        target: &str,
        new_parent: Option<&str>,
        position: Option<u32>,
    ) -> Result<CmdResult> {
        let id = self.resolve(target)?;
        let parent = self.resolve_opt(new_parent)?;
        self.mutate(|b| commands::move_node::run(b, id, parent, position))
    }

    pub fn reorder(&mut self, target: &str, position: u32) -> Result<CmdResult> {
        let id = self.resolve(target)?;
        self.mutate(|b| commands::reorder::run(b, id, position))
    }

    // --- Notes ---

    pub fn open_note(&mut self, target: &str) -> Result<(TreeNodeRecord, EditorState)> {
        let id = self.resolve(target)?;
        let opened = commands::note::open(&mut self.backend, id, &self.settings);
        self.track(opened)
    }

    pub fn save_note(&mut self, id: Uuid, state: &EditorState) -> Result<CmdResult> {
        self.mutate(|b| commands::note::save(b, id, state))
    }

    pub fn write_note(&mut self, target: &str, doc: &Document) -> Result<CmdResult> {
        let id = self.resolve(target)?;
        self.mutate(|b| commands::note::write(b, id, doc))
    }

    pub fn show_note(&mut self, target: &str, format: ExportFormat) -> Result<CmdResult> {
        let id = self.resolve(target)?;
        let shown = commands::note::show(&mut self.backend, id, format);
        self.track(shown)
    }

    pub fn edit_note(
        &mut self,
        target: &str,
        block: usize,
        span: BlockSpan,
        command: &dyn Command,
    ) -> Result<CmdResult> {
        let id = self.resolve(target)?;
        let settings = self.settings.clone();
        self.mutate(|b| commands::note::edit(b, id, block, span, command, &settings))
    }

    pub fn note_pages(&mut self, target: &str) -> Result<CmdResult> {
        let id = self.resolve(target)?;
        let pages = commands::note::pages(&mut self.backend, id, &self.settings);
        self.track(pages)
    }

    pub fn export_note(
        &mut self,
        target: &str,
        format: ExportFormat,
        out: Option<&Path>,
    ) -> Result<CmdResult> {
        let id = self.resolve(target)?;
        let exported = commands::export::run(&mut self.backend, id, format, out);
        self.track(exported)
    }

    pub fn export_archive(&mut self, out_dir: &Path) -> Result<CmdResult> {
        let exported = commands::export::archive(&mut self.backend, out_dir);
        self.track(exported)
    }

    // --- Resources & references ---

    pub fn resources(&mut self, kind: Option<&str>) -> Result<CmdResult> {
        let listed = commands::resources::list(&mut self.backend, kind);
        self.track(listed)
    }

    pub fn add_resource(&mut self, title: &str, payload: ResourcePayload) -> Result<CmdResult> {
        let added = commands::resources::add(&mut self.backend, title, payload);
        self.track(added)
    }

    pub fn retitle_resource(&mut self, target: &str, title: &str) -> Result<CmdResult> {
        let id = self.resolve_resource(target)?;
        let updated = commands::resources::retitle(&mut self.backend, id, title);
        self.track(updated)
    }

    pub fn remove_resource(&mut self, target: &str) -> Result<CmdResult> {
        let id = self.resolve_resource(target)?;
        let removed = commands::resources::remove(&mut self.backend, id);
        self.track(removed)
    }

    pub fn references(&mut self) -> Result<CmdResult> {
        let listed = commands::resources::references(&mut self.backend);
        self.track(listed)
    }

    pub fn add_reference(&mut self, item: ReferenceItem) -> Result<CmdResult> {
        let added = commands::resources::add_reference(&mut self.backend, item);
        self.track(added)
    }

    pub fn remove_reference(&mut self, target: &str) -> Result<CmdResult> {
        let id = self.resolve_resource(target)?;
        let removed = commands::resources::remove_reference(&mut self.backend, id);
        self.track(removed)
    }

    // --- Settings ---

    pub fn config(&mut self, action: ConfigAction) -> Result<CmdResult> {
        let is_set = matches!(action, ConfigAction::Set(..));
        let result = commands::config::run(&self.paths, action);
        let result = self.track(result)?;
        if is_set {
            self.settings = EditorSettings::load(&self.paths.data)?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LocalStore, MemBackend, MemStore};

    fn api() -> QuireApi<MemStore> {
        QuireApi::new(
            LocalStore::new(MemBackend::new()),
            QuirePaths::new("/nonexistent/quire"),
            EditorSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn successful_mutation_reloads() {
        let mut api = api();
        api.create("Docs", NodeKind::Folder, None).unwrap();
        api.create("Plan", NodeKind::Note, Some("docs")).unwrap();
        assert_eq!(api.tree().len(), 2);
        assert!(api.banner().is_none());
    }

    #[test]
    fn failed_mutation_keeps_tree_and_sets_banner() {
        let mut api = api();
        api.create("A", NodeKind::Folder, None).unwrap();
        api.create("B", NodeKind::Folder, Some("A")).unwrap();
        api.create("C", NodeKind::Folder, Some("B")).unwrap();
        let before = api.tree().clone();

        let err = api.move_node("B", Some("C"), None).unwrap_err();
        assert!(matches!(err, QuireError::Cycle));
        assert_eq!(api.tree(), &before);
        assert_eq!(
            api.banner(),
            Some("Cannot move a node under its own descendant")
        );

        api.rename("C", "D").unwrap();
        assert!(api.banner().is_none());
    }

    #[test]
    fn unauthorized_backend_surfaces_once() {
        let mut api = api();
        api.create("A", NodeKind::Folder, None).unwrap();
        api.backend().backend().set_simulate_unauthorized(true);
        assert!(matches!(
            api.rename("A", "B"),
            Err(QuireError::Unauthorized)
        ));
        assert_eq!(api.banner(), Some("Not authenticated, please log in again"));
        assert_eq!(api.tree().roots[0].name, "A");
    }

    #[test]
    fn resolves_prefix_and_name() {
        let mut api = api();
        api.create("Alpha", NodeKind::Note, None).unwrap();
        let id = api.tree().roots[0].id;
        assert_eq!(api.resolve(&id.to_string()[..6]).unwrap(), id);
        assert_eq!(api.resolve("alpha").unwrap(), id);
        assert!(api.resolve("beta").is_err());
        assert!(api.resolve(" ").unwrap_err().is_rejection());
    }

    #[test]
    fn ambiguous_names_need_an_id() {
        let mut api = api();
        api.create("dup", NodeKind::Note, None).unwrap();
        api.create("dup", NodeKind::Note, None).unwrap();
        let err = api.resolve("dup").unwrap_err();
        assert!(err.to_string().contains("matches 2 nodes"));
    }

    #[test]
    fn selection_survives_reload() {
        let mut api = api();
        api.create("A", NodeKind::Folder, None).unwrap();
        api.create("n", NodeKind::Note, Some("A")).unwrap();
        let n = api.select("n").unwrap();
        api.create("other", NodeKind::Note, None).unwrap();
        assert_eq!(api.tree().selected, Some(n));
        assert_eq!(api.rows().len(), 3);
    }

    #[test]
    fn note_session_round_trip() {
        let mut api = api();
        api.create("n", NodeKind::Note, None).unwrap();
        let (record, mut state) = api.open_note("n").unwrap();
        state.execute(&crate::editor::InsertText::new("hello")).unwrap();
        api.save_note(record.id, &state).unwrap();
        let out = api.show_note("n", ExportFormat::Text).unwrap().output;
        assert_eq!(out.as_deref(), Some("hello\n"));
    }

    #[test]
    fn file_store_survives_a_new_session() {
        use crate::store::StorageBackend;
        let env = crate::test_utils::TestEnv::new();
        let paths = QuirePaths::new(env.root.clone());
        let mut api =
            QuireApi::new(env.reopen(), paths.clone(), EditorSettings::default()).unwrap();
        api.create("Thesis", NodeKind::Folder, None).unwrap();
        api.create("Chapter", NodeKind::Note, Some("thesis")).unwrap();
        api.reorder("chapter", 5).unwrap();

        let again = QuireApi::new(env.reopen(), paths, EditorSettings::default()).unwrap();
        let stored = env.store.backend().load_nodes().unwrap();
        assert_eq!(again.tree(), &Tree::from_records(stored));
        assert_eq!(again.tree().roots[0].children[0].name, "Chapter");
    }
}
