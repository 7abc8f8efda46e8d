//! # Note Tree
//!
//! The navigation model: a forest of folders, objects and notes, plus the
//! view state the explorer needs (which node is selected, which folders are
//! expanded).
//!
//! Every mutating operation checks its preconditions first and returns an
//! error without touching the tree when one fails. In particular
//! [`Tree::move_node`] runs the descendant check before detaching anything, so
//! a rejected reparent is never partially applied.
//!
//! Sibling `position`s are always the contiguous range `0..n` in child order;
//! each operation renumbers the sibling lists it touched.

use crate::error::{QuireError, Result};
use crate::model::{NodeKind, TreeNodeRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub id: Uuid,
    pub name: String,
    pub kind: NodeKind,
    pub position: u32,
    pub children: Vec<TreeNode>,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TreeNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            position: 0,
            children: Vec::new(),
            content: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn folder(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Folder)
    }

    pub fn note(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Note)
    }

    fn from_record(record: TreeNodeRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            kind: record.kind,
            position: record.position,
            children: Vec::new(),
            content: record.content,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    fn to_record(&self, parent_id: Option<Uuid>) -> TreeNodeRecord {
        TreeNodeRecord {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind,
            parent_id,
            position: self.position,
            content: self.content.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Number of nodes below this one.
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.descendant_count())
            .sum()
    }

    fn collect_ids(&self, out: &mut Vec<Uuid>) {
        for child in &self.children {
            out.push(child.id);
            child.collect_ids(out);
        }
    }
}

/// What a cascading delete would remove. Shown to the user before confirming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletePreview {
    pub id: Uuid,
    pub name: String,
    pub kind: NodeKind,
    pub descendants: usize,
}

/// One visible line of the explorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeRow {
    pub id: Uuid,
    pub name: String,
    pub kind: NodeKind,
    pub depth: usize,
    pub has_children: bool,
    pub expanded: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tree {
    pub roots: Vec<TreeNode>,
    pub selected: Option<Uuid>,
    pub expanded: HashSet<Uuid>,
}

fn renumber(siblings: &mut [TreeNode]) {
    for (i, node) in siblings.iter_mut().enumerate() {
        node.position = i as u32;
    }
}

fn find_in(nodes: &[TreeNode], id: Uuid) -> Option<&TreeNode> {
    for node in nodes {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_in(&node.children, id) {
            return Some(found);
        }
    }
    None
}

fn find_in_mut(nodes: &mut [TreeNode], id: Uuid) -> Option<&mut TreeNode> {
    for node in nodes {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_in_mut(&mut node.children, id) {
            return Some(found);
        }
    }
    None
}

fn path_in(nodes: &[TreeNode], id: Uuid, path: &mut Vec<Uuid>) -> bool {
    for node in nodes {
        path.push(node.id);
        if node.id == id || path_in(&node.children, id, path) {
            return true;
        }
        path.pop();
    }
    false
}

fn detach_from(nodes: &mut Vec<TreeNode>, id: Uuid) -> Option<TreeNode> {
    if let Some(idx) = nodes.iter().position(|n| n.id == id) {
        let node = nodes.remove(idx);
        renumber(nodes);
        return Some(node);
    }
    nodes
        .iter_mut()
        .find_map(|n| detach_from(&mut n.children, id))
}

fn flatten_into(tree: &Tree, nodes: &[TreeNode], depth: usize, rows: &mut Vec<TreeRow>) {
    for node in nodes {
        let expanded = tree.expanded.contains(&node.id);
        rows.push(TreeRow {
            id: node.id,
            name: node.name.clone(),
            kind: node.kind,
            depth,
            has_children: !node.children.is_empty(),
            expanded,
            selected: tree.selected == Some(node.id),
        });
        if expanded {
            flatten_into(tree, &node.children, depth + 1, rows);
        }
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(QuireError::validation("name cannot be empty"));
    }
    Ok(name.to_string())
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the tree from flat records.
    ///
    /// Children are ordered by their stored position and then renumbered.
    /// Records whose parent is missing become roots; records only reachable
    /// through a parent cycle are dropped.
    pub fn from_records(records: Vec<TreeNodeRecord>) -> Self {
        let known: HashSet<Uuid> = records.iter().map(|r| r.id).collect();
        let mut by_parent: HashMap<Option<Uuid>, Vec<TreeNodeRecord>> = HashMap::new();
        for record in records {
            let parent = match record.parent_id {
                Some(p) if !known.contains(&p) => {
                    warn!(id = %record.id, parent = %p, "orphaned node promoted to root");
                    None
                }
                other => other,
            };
            by_parent.entry(parent).or_default().push(record);
        }

        fn build(
            parent: Option<Uuid>,
            by_parent: &mut HashMap<Option<Uuid>, Vec<TreeNodeRecord>>,
        ) -> Vec<TreeNode> {
            let mut records = by_parent.remove(&parent).unwrap_or_default();
            records.sort_by_key(|r| r.position);
            let mut nodes: Vec<TreeNode> = records
                .into_iter()
                .map(|record| {
                    let id = record.id;
                    let mut node = TreeNode::from_record(record);
                    node.children = build(Some(id), by_parent);
                    node
                })
                .collect();
            renumber(&mut nodes);
            nodes
        }

        let roots = build(None, &mut by_parent);
        let dropped: usize = by_parent.values().map(Vec::len).sum();
        if dropped > 0 {
            warn!(dropped, "nodes unreachable from any root were dropped");
        }
        Self {
            roots,
            ..Self::default()
        }
    }

    /// Flatten to records in depth-first order.
    pub fn to_records(&self) -> Vec<TreeNodeRecord> {
        fn walk(nodes: &[TreeNode], parent: Option<Uuid>, out: &mut Vec<TreeNodeRecord>) {
            for node in nodes {
                out.push(node.to_record(parent));
                walk(&node.children, Some(node.id), out);
            }
        }
        let mut out = Vec::new();
        walk(&self.roots, None, &mut out);
        out
    }

    /// Replace the nodes, keeping selection and expansion for ids that survive.
    pub fn replace_nodes(&mut self, roots: Vec<TreeNode>) {
        self.roots = roots;
        if let Some(sel) = self.selected {
            if self.find(sel).is_none() {
                self.selected = None;
            }
        }
        let alive: HashSet<Uuid> = self.all_ids().into_iter().collect();
        self.expanded.retain(|id| alive.contains(id));
    }

    pub fn len(&self) -> usize {
        self.roots.iter().map(|r| 1 + r.descendant_count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn all_ids(&self) -> Vec<Uuid> {
        let mut out = Vec::new();
        for root in &self.roots {
            out.push(root.id);
            root.collect_ids(&mut out);
        }
        out
    }

    pub fn find(&self, id: Uuid) -> Option<&TreeNode> {
        find_in(&self.roots, id)
    }

    pub fn find_mut(&mut self, id: Uuid) -> Option<&mut TreeNode> {
        find_in_mut(&mut self.roots, id)
    }

    fn get(&self, id: Uuid) -> Result<&TreeNode> {
        self.find(id).ok_or(QuireError::NodeNotFound(id))
    }

    /// Ids from a root down to `id`, inclusive.
    pub fn path_to(&self, id: Uuid) -> Option<Vec<Uuid>> {
        let mut path = Vec::new();
        path_in(&self.roots, id, &mut path).then_some(path)
    }

    pub fn parent_of(&self, id: Uuid) -> Result<Option<Uuid>> {
        let path = self.path_to(id).ok_or(QuireError::NodeNotFound(id))?;
        Ok(path.len().checked_sub(2).map(|i| path[i]))
    }

    /// All ids below `id`, depth first.
    pub fn descendant_ids(&self, id: Uuid) -> Result<Vec<Uuid>> {
        let mut out = Vec::new();
        self.get(id)?.collect_ids(&mut out);
        Ok(out)
    }

    /// Depth-first search from `ancestor` through its descendants for `candidate`.
    pub fn is_descendant(&self, ancestor: Uuid, candidate: Uuid) -> bool {
        let Some(start) = self.find(ancestor) else {
            return false;
        };
        let mut stack: Vec<&TreeNode> = start.children.iter().collect();
        while let Some(node) = stack.pop() {
            if node.id == candidate {
                return true;
            }
            stack.extend(node.children.iter());
        }
        false
    }

    fn siblings_mut(&mut self, parent: Option<Uuid>) -> Result<&mut Vec<TreeNode>> {
        match parent {
            None => Ok(&mut self.roots),
            Some(p) => Ok(&mut self
                .find_mut(p)
                .ok_or(QuireError::NodeNotFound(p))?
                .children),
        }
    }

    fn check_container(&self, parent: Option<Uuid>) -> Result<()> {
        if let Some(p) = parent {
            let node = self.get(p)?;
            if !node.kind.accepts_children() {
                return Err(QuireError::validation(format!(
                    "'{}' is a {} and cannot contain other nodes",
                    node.name, node.kind
                )));
            }
        }
        Ok(())
    }

    /// Select `id` and expand its ancestors so the row is visible.
    pub fn select(&mut self, id: Uuid) -> Result<()> {
        let path = self.path_to(id).ok_or(QuireError::NodeNotFound(id))?;
        self.expanded.extend(path[..path.len() - 1].iter().copied());
        self.selected = Some(id);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Flip the expansion of `id`. Returns whether it is now expanded.
    pub fn toggle_expand(&mut self, id: Uuid) -> Result<bool> {
        self.get(id)?;
        if self.expanded.remove(&id) {
            Ok(false)
        } else {
            self.expanded.insert(id);
            Ok(true)
        }
    }

    /// Append `node` under `parent` (or as a root).
    pub fn add(&mut self, parent: Option<Uuid>, mut node: TreeNode) -> Result<Uuid> {
        node.name = validate_name(&node.name)?;
        if self.find(node.id).is_some() {
            return Err(QuireError::validation(format!(
                "node {} already exists",
                node.id
            )));
        }
        self.check_container(parent)?;
        let id = node.id;
        let siblings = self.siblings_mut(parent)?;
        node.position = siblings.len() as u32;
        siblings.push(node);
        debug!(%id, ?parent, "node added");
        Ok(id)
    }

    pub fn rename(&mut self, id: Uuid, name: &str) -> Result<()> {
        let name = validate_name(name)?;
        let node = self.find_mut(id).ok_or(QuireError::NodeNotFound(id))?;
        node.name = name;
        node.updated_at = Utc::now();
        Ok(())
    }

    pub fn delete_preview(&self, id: Uuid) -> Result<DeletePreview> {
        let node = self.get(id)?;
        Ok(DeletePreview {
            id,
            name: node.name.clone(),
            kind: node.kind,
            descendants: node.descendant_count(),
        })
    }

    /// Remove `id` and everything below it. Returns every removed id.
    pub fn delete(&mut self, id: Uuid) -> Result<Vec<Uuid>> {
        let node = detach_from(&mut self.roots, id).ok_or(QuireError::NodeNotFound(id))?;
        let mut removed = vec![node.id];
        node.collect_ids(&mut removed);
        if self.selected.is_some_and(|s| removed.contains(&s)) {
            self.selected = None;
        }
        for gone in &removed {
            self.expanded.remove(gone);
        }
        debug!(%id, removed = removed.len(), "node deleted");
        Ok(removed)
    }

    /// Reparent `id` under `new_parent` (`None` for the root level).
    ///
    /// The node lands at `position` among its new siblings, clamped to the end,
    /// or is appended when no position is given. Moving a node under itself
    /// or one of its descendants fails with [`QuireError::Cycle`] and leaves
    /// the tree unchanged.
    pub fn move_node(
        &mut self,
        id: Uuid,
        new_parent: Option<Uuid>,
        position: Option<usize>,
    ) -> Result<()> {
        self.get(id)?;
        if let Some(target) = new_parent {
            if target == id || self.is_descendant(id, target) {
                warn!(%id, %target, "rejected move under own descendant");
                return Err(QuireError::Cycle);
            }
        }
        self.check_container(new_parent)?;

        let mut node = detach_from(&mut self.roots, id).ok_or(QuireError::NodeNotFound(id))?;
        node.updated_at = Utc::now();
        let siblings = self.siblings_mut(new_parent)?;
        let at = position.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(at, node);
        renumber(siblings);
        debug!(%id, ?new_parent, at, "node moved");
        Ok(())
    }

    /// Move `id` to index `position` among its siblings, clamped to the last
    /// slot. Returns the final position.
    pub fn reorder(&mut self, id: Uuid, position: usize) -> Result<usize> {
        let parent = self.parent_of(id)?;
        let siblings = self.siblings_mut(parent)?;
        let from = siblings
            .iter()
            .position(|n| n.id == id)
            .ok_or(QuireError::NodeNotFound(id))?;
        let node = siblings.remove(from);
        let at = position.min(siblings.len());
        siblings.insert(at, node);
        renumber(siblings);
        Ok(at)
    }

    /// Visible rows in display order. Children of collapsed nodes are hidden.
    pub fn flatten(&self) -> Vec<TreeRow> {
        let mut rows = Vec::new();
        flatten_into(self, &self.roots, 0, &mut rows);
        rows
    }

    /// Expand every node that has children.
    pub fn expand_all(&mut self) {
        fn walk(nodes: &[TreeNode], out: &mut HashSet<Uuid>) {
            for node in nodes {
                if !node.children.is_empty() {
                    out.insert(node.id);
                    walk(&node.children, out);
                }
            }
        }
        walk(&self.roots, &mut self.expanded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `{A: [B: [C]]}`, all folders.
    fn abc() -> (Tree, Uuid, Uuid, Uuid) {
        let mut tree = Tree::new();
        let a = tree.add(None, TreeNode::folder("A")).unwrap();
        let b = tree.add(Some(a), TreeNode::folder("B")).unwrap();
        let c = tree.add(Some(b), TreeNode::folder("C")).unwrap();
        (tree, a, b, c)
    }

    fn names(nodes: &[TreeNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    fn positions(nodes: &[TreeNode]) -> Vec<u32> {
        nodes.iter().map(|n| n.position).collect()
    }

    #[test]
    fn reparent_under_descendant_is_rejected() {
        let (mut tree, _, b, c) = abc();
        let before = tree.clone();
        let err = tree.move_node(b, Some(c), None).unwrap_err();
        assert!(matches!(err, QuireError::Cycle));
        assert_eq!(tree, before);
    }

    #[test]
    fn move_under_itself_is_rejected() {
        let (mut tree, a, _, _) = abc();
        assert!(matches!(
            tree.move_node(a, Some(a), None),
            Err(QuireError::Cycle)
        ));
    }

    #[test]
    fn move_to_root_and_back() {
        let (mut tree, a, b, c) = abc();
        tree.move_node(c, None, None).unwrap();
        assert_eq!(names(&tree.roots), vec!["A", "C"]);
        assert_eq!(tree.parent_of(c).unwrap(), None);

        tree.move_node(c, Some(a), Some(0)).unwrap();
        let a_node = tree.find(a).unwrap();
        assert_eq!(names(&a_node.children), vec!["C", "B"]);
        assert_eq!(positions(&a_node.children), vec![0, 1]);
        assert!(tree.find(b).unwrap().children.is_empty());
    }

    #[test]
    fn notes_cannot_hold_children() {
        let mut tree = Tree::new();
        let note = tree.add(None, TreeNode::note("Draft")).unwrap();
        let err = tree.add(Some(note), TreeNode::note("Child")).unwrap_err();
        assert!(matches!(err, QuireError::Validation(_)));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn cascade_delete_leaves_no_orphans() {
        let (mut tree, a, b, c) = abc();
        tree.add(Some(a), TreeNode::note("sibling")).unwrap();
        tree.select(c).unwrap();

        let preview = tree.delete_preview(b).unwrap();
        assert_eq!(preview.descendants, 1);

        let removed = tree.delete(b).unwrap();
        assert_eq!(removed, vec![b, c]);
        for id in tree.all_ids() {
            assert!(!removed.contains(&id));
        }
        assert_eq!(tree.selected, None);
        assert!(!tree.expanded.contains(&b));
        assert_eq!(positions(&tree.find(a).unwrap().children), vec![0]);
    }

    #[test]
    fn reorder_clamps_and_renumbers() {
        let mut tree = Tree::new();
        let ids: Vec<Uuid> = ["a", "b", "c", "d"]
            .iter()
            .map(|n| tree.add(None, TreeNode::note(*n)).unwrap())
            .collect();

        assert_eq!(tree.reorder(ids[0], 99).unwrap(), 3);
        assert_eq!(names(&tree.roots), vec!["b", "c", "d", "a"]);
        assert_eq!(positions(&tree.roots), vec![0, 1, 2, 3]);

        assert_eq!(tree.reorder(ids[2], 0).unwrap(), 0);
        assert_eq!(names(&tree.roots), vec!["c", "b", "d", "a"]);
        assert_eq!(positions(&tree.roots), vec![0, 1, 2, 3]);
    }

    #[test]
    fn empty_names_are_rejected() {
        let (mut tree, a, _, _) = abc();
        assert!(tree.rename(a, "   ").is_err());
        assert_eq!(tree.find(a).unwrap().name, "A");
        assert!(tree.add(None, TreeNode::folder("")).is_err());
        tree.rename(a, "  Archive ").unwrap();
        assert_eq!(tree.find(a).unwrap().name, "Archive");
    }

    #[test]
    fn flatten_honors_expansion() {
        let (mut tree, a, b, c) = abc();
        assert_eq!(tree.flatten().len(), 1);

        assert!(tree.toggle_expand(a).unwrap());
        let rows = tree.flatten();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].depth, 1);
        assert!(rows[1].has_children);

        tree.select(c).unwrap();
        let rows = tree.flatten();
        assert_eq!(rows.len(), 3);
        assert!(rows[2].selected);
        assert!(tree.expanded.contains(&b));

        assert!(!tree.toggle_expand(a).unwrap());
        assert_eq!(tree.flatten().len(), 1);
    }

    #[test]
    fn records_round_trip() {
        let (mut tree, a, _, _) = abc();
        tree.add(Some(a), TreeNode::note("n")).unwrap();
        let records = tree.to_records();
        assert_eq!(records.len(), 4);
        let rebuilt = Tree::from_records(records);
        assert_eq!(rebuilt.roots, tree.roots);
    }

    #[test]
    fn from_records_sorts_and_promotes_orphans() {
        let (tree, a, b, _) = abc();
        let mut records = tree.to_records();
        records.reverse();
        // Point B at a parent that does not exist.
        let missing = Uuid::new_v4();
        for r in records.iter_mut() {
            if r.id == b {
                r.parent_id = Some(missing);
                r.position = 7;
            }
        }
        let rebuilt = Tree::from_records(records);
        assert_eq!(names(&rebuilt.roots), vec!["A", "B"]);
        assert_eq!(positions(&rebuilt.roots), vec![0, 1]);
        assert!(rebuilt.find(a).unwrap().children.is_empty());
    }

    #[test]
    fn path_and_descendants() {
        let (tree, a, b, c) = abc();
        assert_eq!(tree.path_to(c).unwrap(), vec![a, b, c]);
        assert_eq!(tree.descendant_ids(a).unwrap(), vec![b, c]);
        assert!(tree.is_descendant(a, c));
        assert!(!tree.is_descendant(c, a));
        assert!(tree.path_to(Uuid::new_v4()).is_none());
    }
}
