use crate::commands::{load_tree, CmdMessage, CmdResult};
use crate::error::{QuireError, Result};
use crate::model::NodeKind;
use crate::store::{CreateNodeRequest, TreeBackend};
use crate::tree::TreeNode;
use uuid::Uuid;

pub fn run<B: TreeBackend>(
    backend: &mut B,
    name: &str,
    kind: NodeKind,
    parent: Option<Uuid>,
    content: Option<String>,
) -> Result<CmdResult> {
    // Dry run against the current tree so a remote backend only sees valid requests.
    let mut tree = load_tree(backend)?;
    tree.add(parent, TreeNode::new(name, kind))?;

    let record = backend.create_node(CreateNodeRequest {
        name: name.trim().to_string(),
        kind,
        parent_id: parent,
        content,
    })?;
    let location = match parent {
        Some(p) => tree
            .find(p)
            .map(|n| format!(" in '{}'", n.name))
            .ok_or(QuireError::NodeNotFound(p))?,
        None => String::new(),
    };
    let message = CmdMessage::success(format!("Created {} '{}'{}", kind, record.name, location));
    Ok(CmdResult::default()
        .with_affected_nodes(vec![record])
        .with_message(message))
}
