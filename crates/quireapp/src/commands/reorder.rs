use crate::commands::{load_tree, stored_record, CmdMessage, CmdResult};
use crate::error::{QuireError, Result};
use crate::store::{ReorderNodeRequest, TreeBackend};
use uuid::Uuid;

/// Move `id` to `position` among its siblings. Positions past the end clamp
/// to the last slot.
pub fn run<B: TreeBackend>(backend: &mut B, id: Uuid, position: u32) -> Result<CmdResult> {
    let mut tree = load_tree(backend)?;
    let name = tree
        .find(id)
        .map(|n| n.name.clone())
        .ok_or(QuireError::NodeNotFound(id))?;
    let landed = tree.reorder(id, position as usize)?;

    backend.reorder_node(
        id,
        ReorderNodeRequest {
            new_position: landed as u32,
        },
    )?;
    let record = stored_record(backend, id)?;
    Ok(CmdResult::default()
        .with_affected_nodes(vec![record])
        .with_message(CmdMessage::success(format!(
            "Moved '{}' to position {}",
            name,
            landed + 1
        ))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{node, store};
    use crate::model::NodeKind;

    #[test]
    fn reorder_integrity() {
        let mut s = store();
        let ids: Vec<Uuid> = (0..5)
            .map(|i| node(&mut s, &format!("n{}", i), NodeKind::Note, None))
            .collect();

        let res = run(&mut s, ids[1], 42).unwrap();
        assert_eq!(res.affected_nodes[0].position, 4);

        let mut nodes = s.list_nodes().unwrap();
        nodes.sort_by_key(|n| n.position);
        let order: Vec<Uuid> = nodes.iter().map(|n| n.id).collect();
        assert_eq!(order, vec![ids[0], ids[2], ids[3], ids[4], ids[1]]);
        let positions: Vec<u32> = nodes.iter().map(|n| n.position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 4]);
    }
}
