use crate::commands::{load_tree, CmdMessage, CmdResult};
use crate::error::Result;
use crate::store::TreeBackend;
use uuid::Uuid;

/// Visible rows of the tree.
///
/// With `expand_all` every folder is open; otherwise only the ancestors of
/// `selected` are, which is what the explorer shows after a selection.
pub fn run<B: TreeBackend>(
    backend: &mut B,
    expand_all: bool,
    selected: Option<Uuid>,
) -> Result<CmdResult> {
    let mut tree = load_tree(backend)?;
    if expand_all {
        tree.expand_all();
    }
    if let Some(id) = selected {
        tree.select(id)?;
    }
    let mut result = CmdResult {
        rows: tree.flatten(),
        ..CmdResult::default()
    };
    if result.rows.is_empty() {
        result.add_message(CmdMessage::info("Nothing here yet."));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{node, store};
    use crate::model::NodeKind;

    #[test]
    fn collapsed_by_default() {
        let mut s = store();
        let a = node(&mut s, "A", NodeKind::Folder, None);
        node(&mut s, "n", NodeKind::Note, Some(a));
        assert_eq!(run(&mut s, false, None).unwrap().rows.len(), 1);
        assert_eq!(run(&mut s, true, None).unwrap().rows.len(), 2);
    }

    #[test]
    fn empty_tree_says_so() {
        let mut s = store();
        let res = run(&mut s, true, None).unwrap();
        assert!(res.rows.is_empty());
        assert_eq!(res.messages.len(), 1);
    }

    #[test]
    fn selection_reveals_the_row() {
        let mut s = store();
        let a = node(&mut s, "A", NodeKind::Folder, None);
        let b = node(&mut s, "B", NodeKind::Folder, Some(a));
        let n = node(&mut s, "n", NodeKind::Note, Some(b));
        let rows = run(&mut s, false, Some(n)).unwrap().rows;
        assert_eq!(rows.len(), 3);
        assert!(rows[2].selected);
        assert_eq!(rows[2].depth, 2);
    }
}
