use crate::commands::{load_tree, stored_record, CmdMessage, CmdResult};
use crate::error::{QuireError, Result};
use crate::store::{MoveNodeRequest, TreeBackend};
use uuid::Uuid;

/// Reparent `id` under `new_parent` (`None` for the top level).
///
/// The cycle check runs on the current tree before the backend is called.
pub fn run<B: TreeBackend>(
    backend: &mut B,
    id: Uuid,
    new_parent: Option<Uuid>,
    position: Option<u32>,
) -> Result<CmdResult> {
    let mut tree = load_tree(backend)?;
    let name = tree
        .find(id)
        .map(|n| n.name.clone())
        .ok_or(QuireError::NodeNotFound(id))?;

    if tree.parent_of(id)? == new_parent && position.is_none() {
        return Ok(CmdResult::default()
            .with_message(CmdMessage::info(format!("'{}' is already there", name))));
    }

    tree.move_node(id, new_parent, position.map(|p| p as usize))?;
    backend.move_node(
        id,
        MoveNodeRequest {
            new_parent_id: new_parent,
            position,
        },
    )?;

    let target = match new_parent {
        Some(p) => tree
            .find(p)
            .map(|n| format!("'{}'", n.name))
            .ok_or(QuireError::NodeNotFound(p))?,
        None => "the top level".to_string(),
    };
    let record = stored_record(backend, id)?;
    Ok(CmdResult::default()
        .with_affected_nodes(vec![record])
        .with_message(CmdMessage::success(format!(
            "Moved '{}' to {}",
            name, target
        ))))
}
