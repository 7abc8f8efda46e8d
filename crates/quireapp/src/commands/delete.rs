//! Cascading delete, in two steps: [`preview`] tells the client what would go,
//! [`run`] removes it once the client has confirmed.

use crate::commands::{load_tree, CmdMessage, CmdResult};
use crate::error::Result;
use crate::store::TreeBackend;
use crate::tree::DeletePreview;
use uuid::Uuid;

pub fn preview<B: TreeBackend>(backend: &mut B, id: Uuid) -> Result<DeletePreview> {
    load_tree(backend)?.delete_preview(id)
}

pub fn run<B: TreeBackend>(backend: &mut B, id: Uuid) -> Result<CmdResult> {
    let preview = preview(backend, id)?;
    backend.delete_node(id)?;
    let message = match preview.descendants {
        0 => format!("Deleted {} '{}'", preview.kind, preview.name),
        1 => format!(
            "Deleted {} '{}' and 1 item inside it",
            preview.kind, preview.name
        ),
        n => format!(
            "Deleted {} '{}' and {} items inside it",
            preview.kind, preview.name, n
        ),
    };
    Ok(CmdResult::default().with_message(CmdMessage::success(message)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{node, store};
    use crate::error::QuireError;
    use crate::model::NodeKind;

    #[test]
    fn preview_counts_descendants() {
        let mut s = store();
        let a = node(&mut s, "A", NodeKind::Folder, None);
        let b = node(&mut s, "B", NodeKind::Folder, Some(a));
        node(&mut s, "c", NodeKind::Note, Some(b));
        node(&mut s, "d", NodeKind::Note, Some(a));

        let p = preview(&mut s, a).unwrap();
        assert_eq!(p.descendants, 3);
        // Preview does not mutate.
        assert_eq!(s.list_nodes().unwrap().len(), 4);
    }

    #[test]
    fn run_cascades() {
        let mut s = store();
        let a = node(&mut s, "A", NodeKind::Folder, None);
        node(&mut s, "c", NodeKind::Note, Some(a));
        let keep = node(&mut s, "keep", NodeKind::Note, None);

        let res = run(&mut s, a).unwrap();
        assert_eq!(res.messages[0].content, "Deleted folder 'A' and 1 item inside it");
        let left = s.list_nodes().unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, keep);
        assert_eq!(left[0].position, 0);
    }

    #[test]
    fn missing_node() {
        let mut s = store();
        assert!(matches!(
            run(&mut s, Uuid::new_v4()),
            Err(QuireError::NodeNotFound(_))
        ));
    }
}
