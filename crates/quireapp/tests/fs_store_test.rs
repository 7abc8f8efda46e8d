use quireapp::commands::{note, resources};
use quireapp::doc::{Block, Document};
use quireapp::model::{NodeKind, ResourcePayload};
use quireapp::references::ReferenceItem;
use quireapp::store::{
    CreateNodeRequest, FsBackend, LocalStore, MoveNodeRequest, ResourceBackend, StorageBackend,
    TreeBackend,
};
use std::fs;
use tempfile::TempDir;

fn setup() -> (TempDir, LocalStore<FsBackend>) {
    let dir = TempDir::new().unwrap();
    let store = LocalStore::new(FsBackend::new(dir.path().to_path_buf()));
    (dir, store)
}

#[test]
fn test_empty_directory_has_empty_tree() {
    let (_dir, mut store) = setup();
    assert!(store.list_nodes().unwrap().is_empty());
    assert!(store.list_resources().unwrap().is_empty());
}

#[test]
fn test_atomic_write_leaves_no_temp_files() {
    let (dir, mut store) = setup();
    store
        .create_node(CreateNodeRequest::new("Docs", NodeKind::Folder, None))
        .unwrap();

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["tree.json".to_string()]);
}

#[test]
fn test_failed_rename_removes_temp_file() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("tree.json")).unwrap();
    let backend = FsBackend::new(dir.path().to_path_buf());

    assert!(backend.save_nodes(&[]).is_err());
    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["tree.json".to_string()]);
}

#[test]
fn test_corrupted_tree_file_is_an_error() {
    let (dir, mut store) = setup();
    fs::write(dir.path().join("tree.json"), "{ not json").unwrap();
    assert!(store.list_nodes().is_err());
}

#[test]
fn test_rejected_move_leaves_file_untouched() {
    let (dir, mut store) = setup();
    let a = store
        .create_node(CreateNodeRequest::new("A", NodeKind::Folder, None))
        .unwrap();
    let b = store
        .create_node(CreateNodeRequest::new("B", NodeKind::Folder, Some(a.id)))
        .unwrap();
    let before = fs::read_to_string(dir.path().join("tree.json")).unwrap();

    let err = store
        .move_node(
            a.id,
            MoveNodeRequest {
                new_parent_id: Some(b.id),
                position: None,
            },
        )
        .unwrap_err();
    assert!(err.is_rejection());
    let after = fs::read_to_string(dir.path().join("tree.json")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_note_content_persists_across_stores() {
    let (dir, mut store) = setup();
    let n = store
        .create_node(CreateNodeRequest::new("Draft", NodeKind::Note, None))
        .unwrap();
    let doc = Document::from_blocks(vec![Block::heading(2, "Method"), Block::paragraph("text")]);
    note::write(&mut store, n.id, &doc).unwrap();

    let mut reopened = LocalStore::new(FsBackend::new(dir.path().to_path_buf()));
    let (_, state) = note::open(&mut reopened, n.id, &Default::default()).unwrap();
    assert_eq!(state.doc, doc);
}

#[test]
fn test_resources_file_holds_payload_json() {
    let (dir, mut store) = setup();
    resources::add(
        &mut store,
        "Euler",
        ResourcePayload::Formula {
            latex: "e^{i\\pi}+1=0".into(),
        },
    )
    .unwrap();
    resources::add_reference(
        &mut store,
        ReferenceItem::new("Knuth", "1984", "Literate Programming", "The Computer Journal"),
    )
    .unwrap();

    let records = FsBackend::new(dir.path().to_path_buf())
        .load_resources()
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].kind, "formula");
    assert!(records[1].content.contains("Knuth"));

    let refs = resources::references(&mut store).unwrap().references;
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].year, "1984");
}
