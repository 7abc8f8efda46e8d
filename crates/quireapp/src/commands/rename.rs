use crate::commands::{load_tree, CmdMessage, CmdResult};
use crate::error::{QuireError, Result};
use crate::store::{TreeBackend, UpdateNodeRequest};
use uuid::Uuid;

pub fn run<B: TreeBackend>(backend: &mut B, id: Uuid, name: &str) -> Result<CmdResult> {
    let mut tree = load_tree(backend)?;
    let old = tree
        .find(id)
        .map(|n| n.name.clone())
        .ok_or(QuireError::NodeNotFound(id))?;
    tree.rename(id, name)?;

    let record = backend.update_node(
        id,
        UpdateNodeRequest {
            name: Some(name.trim().to_string()),
            content: None,
        },
    )?;
    let message = CmdMessage::success(format!("Renamed '{}' to '{}'", old, record.name));
    Ok(CmdResult::default()
        .with_affected_nodes(vec![record])
        .with_message(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{node, store};
    use crate::model::NodeKind;

    #[test]
    fn renames() {
        let mut s = store();
        let id = node(&mut s, "old", NodeKind::Folder, None);
        let res = run(&mut s, id, "new").unwrap();
        assert_eq!(res.affected_nodes[0].name, "new");
        assert_eq!(s.list_nodes().unwrap()[0].name, "new");
    }

    #[test]
    fn blank_name_changes_nothing() {
        let mut s = store();
        let id = node(&mut s, "keep", NodeKind::Note, None);
        assert!(run(&mut s, id, "  ").unwrap_err().is_rejection());
        assert_eq!(s.list_nodes().unwrap()[0].name, "keep");
    }
}
