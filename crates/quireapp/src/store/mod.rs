//! # Storage Layer
//!
//! Two traits describe what the application needs from a backend:
//!
//! - [`TreeBackend`]: CRUD plus move/reorder on tree nodes.
//! - [`ResourceBackend`]: CRUD on typed resources.
//!
//! Both take typed request values. Callers never assemble paths or query
//! strings; that mapping lives in the backend ([`http::HttpBackend`] turns
//! each request into one REST call).
//!
//! ## Local storage
//!
//! [`LocalStore`] implements both traits on top of a raw [`StorageBackend`]
//! that only knows how to load and save flat records. Each operation loads
//! the records, rebuilds the [`Tree`], applies the operation through the tree
//! model (so cycle checks and position renumbering are shared with the UI
//! model) and writes everything back. Nothing is written when the operation
//! is rejected.
//!
//! - [`mem_backend::MemBackend`]: in memory, with failure simulation for tests.
//! - [`fs_backend::FsBackend`]: JSON files in a data directory.
//!
//! ## Storage Layout
//!
//! ```text
//! <data dir>/
//! ├── tree.json         # Vec<TreeNodeRecord>
//! ├── resources.json    # Vec<ResourceRecord>
//! └── settings.toml     # EditorSettings (see config)
//! ```

use crate::error::{QuireError, Result};
use crate::model::{NodeKind, Resource, ResourcePayload, ResourceRecord, TreeNodeRecord};
use crate::tree::{Tree, TreeNode};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

pub mod fs_backend;
pub mod http;
pub mod mem_backend;
#[cfg(feature = "remote")]
pub mod remote;

pub use fs_backend::FsBackend;
pub use http::{HttpBackend, TokenStore, Transport};
pub use mem_backend::MemBackend;
#[cfg(feature = "remote")]
pub use remote::ReqwestTransport;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateNodeRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl CreateNodeRequest {
    pub fn new(name: impl Into<String>, kind: NodeKind, parent_id: Option<Uuid>) -> Self {
        Self {
            name: name.into(),
            kind,
            parent_id,
            content: None,
        }
    }
}

/// Fields left as `None` are not changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateNodeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveNodeRequest {
    pub new_parent_id: Option<Uuid>,
    /// Appends when absent.
    #[serde(default)]
    pub position: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderNodeRequest {
    pub new_position: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateResourceRequest {
    pub title: String,
    pub payload: ResourcePayload,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateResourceRequest {
    pub title: Option<String>,
    pub payload: Option<ResourcePayload>,
}

pub trait TreeBackend {
    fn list_nodes(&mut self) -> Result<Vec<TreeNodeRecord>>;
    fn create_node(&mut self, req: CreateNodeRequest) -> Result<TreeNodeRecord>;
    fn update_node(&mut self, id: Uuid, req: UpdateNodeRequest) -> Result<TreeNodeRecord>;
    /// Removes the node and all of its descendants.
    fn delete_node(&mut self, id: Uuid) -> Result<()>;
    fn move_node(&mut self, id: Uuid, req: MoveNodeRequest) -> Result<()>;
    fn reorder_node(&mut self, id: Uuid, req: ReorderNodeRequest) -> Result<()>;
}

pub trait ResourceBackend {
    fn list_resources(&mut self) -> Result<Vec<Resource>>;
    fn get_resource(&mut self, id: Uuid) -> Result<Resource>;
    fn create_resource(&mut self, req: CreateResourceRequest) -> Result<Resource>;
    fn update_resource(&mut self, id: Uuid, req: UpdateResourceRequest) -> Result<Resource>;
    fn delete_resource(&mut self, id: Uuid) -> Result<()>;
}

/// Abstract interface for raw storage I/O.
///
/// Handles the "how" of persistence; [`LocalStore`] handles the "what".
pub trait StorageBackend {
    /// Missing storage loads as an empty list.
    fn load_nodes(&self) -> Result<Vec<TreeNodeRecord>>;

    /// MUST replace the stored nodes atomically.
    fn save_nodes(&self, nodes: &[TreeNodeRecord]) -> Result<()>;

    fn load_resources(&self) -> Result<Vec<ResourceRecord>>;

    fn save_resources(&self, resources: &[ResourceRecord]) -> Result<()>;

    /// Human-readable location, for status output.
    fn location(&self) -> String;
}

/// Tree and resource backend over a raw [`StorageBackend`].
pub struct LocalStore<S: StorageBackend> {
    backend: S,
}

pub type MemStore = LocalStore<MemBackend>;
pub type FsStore = LocalStore<FsBackend>;

impl<S: StorageBackend> LocalStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    fn load_tree(&self) -> Result<Tree> {
        Ok(Tree::from_records(self.backend.load_nodes()?))
    }

    /// Apply `op` to the stored tree and persist on success.
    fn with_tree<T>(&self, op: impl FnOnce(&mut Tree) -> Result<T>) -> Result<T> {
        let mut tree = self.load_tree()?;
        let out = op(&mut tree)?;
        self.backend.save_nodes(&tree.to_records())?;
        Ok(out)
    }

    fn load_resources(&self) -> Result<Vec<Resource>> {
        self.backend
            .load_resources()?
            .into_iter()
            .map(Resource::from_record)
            .collect()
    }

    fn save_resources(&self, resources: &[Resource]) -> Result<()> {
        let records = resources
            .iter()
            .map(Resource::to_record)
            .collect::<Result<Vec<_>>>()?;
        self.backend.save_resources(&records)
    }
}

impl<S: StorageBackend> TreeBackend for LocalStore<S> {
    fn list_nodes(&mut self) -> Result<Vec<TreeNodeRecord>> {
        Ok(self.load_tree()?.to_records())
    }

    fn create_node(&mut self, req: CreateNodeRequest) -> Result<TreeNodeRecord> {
        let mut node = TreeNode::new(req.name, req.kind);
        node.content = req.content;
        let parent = req.parent_id;
        self.with_tree(|tree| {
            let id = tree.add(parent, node)?;
            let node = tree.find(id).ok_or(QuireError::NodeNotFound(id))?;
            Ok(TreeNodeRecord {
                id,
                name: node.name.clone(),
                kind: node.kind,
                parent_id: parent,
                position: node.position,
                content: node.content.clone(),
                created_at: node.created_at,
                updated_at: node.updated_at,
            })
        })
    }

    fn update_node(&mut self, id: Uuid, req: UpdateNodeRequest) -> Result<TreeNodeRecord> {
        self.with_tree(|tree| {
            if let Some(name) = &req.name {
                tree.rename(id, name)?;
            }
            let parent_id = tree.parent_of(id)?;
            let node = tree.find_mut(id).ok_or(QuireError::NodeNotFound(id))?;
            if let Some(content) = req.content {
                node.content = Some(content);
            }
            node.updated_at = Utc::now();
            Ok(TreeNodeRecord {
                id,
                name: node.name.clone(),
                kind: node.kind,
                parent_id,
                position: node.position,
                content: node.content.clone(),
                created_at: node.created_at,
                updated_at: node.updated_at,
            })
        })
    }

    fn delete_node(&mut self, id: Uuid) -> Result<()> {
        let removed = self.with_tree(|tree| tree.delete(id))?;
        debug!(%id, removed = removed.len(), "deleted from store");
        Ok(())
    }

    fn move_node(&mut self, id: Uuid, req: MoveNodeRequest) -> Result<()> {
        self.with_tree(|tree| {
            tree.move_node(id, req.new_parent_id, req.position.map(|p| p as usize))
        })
    }

    fn reorder_node(&mut self, id: Uuid, req: ReorderNodeRequest) -> Result<()> {
        self.with_tree(|tree| tree.reorder(id, req.new_position as usize).map(|_| ()))
    }
}

impl<S: StorageBackend> ResourceBackend for LocalStore<S> {
    fn list_resources(&mut self) -> Result<Vec<Resource>> {
        self.load_resources()
    }

    fn get_resource(&mut self, id: Uuid) -> Result<Resource> {
        self.load_resources()?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or(QuireError::ResourceNotFound(id))
    }

    fn create_resource(&mut self, req: CreateResourceRequest) -> Result<Resource> {
        req.payload.validate()?;
        let mut resources = self.load_resources()?;
        let resource = Resource::new(req.title, req.payload);
        resources.push(resource.clone());
        self.save_resources(&resources)?;
        Ok(resource)
    }

    fn update_resource(&mut self, id: Uuid, req: UpdateResourceRequest) -> Result<Resource> {
        if let Some(payload) = &req.payload {
            payload.validate()?;
        }
        let mut resources = self.load_resources()?;
        let resource = resources
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(QuireError::ResourceNotFound(id))?;
        if let Some(title) = req.title {
            resource.title = title;
        }
        if let Some(payload) = req.payload {
            resource.payload = payload;
        }
        resource.updated_at = Utc::now();
        let updated = resource.clone();
        self.save_resources(&resources)?;
        Ok(updated)
    }

    fn delete_resource(&mut self, id: Uuid) -> Result<()> {
        let mut resources = self.load_resources()?;
        let before = resources.len();
        resources.retain(|r| r.id != id);
        if resources.len() == before {
            return Err(QuireError::ResourceNotFound(id));
        }
        self.save_resources(&resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemStore {
        LocalStore::new(MemBackend::new())
    }

    fn folder(store: &mut MemStore, name: &str, parent: Option<Uuid>) -> Uuid {
        store
            .create_node(CreateNodeRequest::new(name, NodeKind::Folder, parent))
            .unwrap()
            .id
    }

    #[test]
    fn create_assigns_trailing_position() {
        let mut s = store();
        let a = folder(&mut s, "A", None);
        let b = s
            .create_node(CreateNodeRequest::new("b", NodeKind::Note, Some(a)))
            .unwrap();
        let c = s
            .create_node(CreateNodeRequest::new("c", NodeKind::Note, Some(a)))
            .unwrap();
        assert_eq!((b.position, c.position), (0, 1));
        assert_eq!(c.parent_id, Some(a));
        assert_eq!(s.list_nodes().unwrap().len(), 3);
    }

    #[test]
    fn rejected_move_writes_nothing() {
        let mut s = store();
        let a = folder(&mut s, "A", None);
        let b = folder(&mut s, "B", Some(a));
        let c = folder(&mut s, "C", Some(b));
        let before = s.list_nodes().unwrap();

        let err = s
            .move_node(
                b,
                MoveNodeRequest {
                    new_parent_id: Some(c),
                    position: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, QuireError::Cycle));
        assert_eq!(s.list_nodes().unwrap(), before);
    }

    #[test]
    fn write_failure_surfaces_and_keeps_data() {
        let mut s = store();
        let a = folder(&mut s, "A", None);
        s.backend().set_simulate_write_error(true);
        let err = s
            .update_node(
                a,
                UpdateNodeRequest {
                    name: Some("renamed".into()),
                    content: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, QuireError::Store(_)));
        s.backend().set_simulate_write_error(false);
        assert_eq!(s.list_nodes().unwrap()[0].name, "A");
    }

    #[test]
    fn update_content_keeps_name() {
        let mut s = store();
        let n = s
            .create_node(CreateNodeRequest::new("n", NodeKind::Note, None))
            .unwrap();
        let updated = s
            .update_node(
                n.id,
                UpdateNodeRequest {
                    name: None,
                    content: Some("<p>hi</p>".into()),
                },
            )
            .unwrap();
        assert_eq!(updated.name, "n");
        assert_eq!(updated.content.as_deref(), Some("<p>hi</p>"));
    }

    #[test]
    fn resource_crud() {
        let mut s = store();
        let r = s
            .create_resource(CreateResourceRequest {
                title: "eq".into(),
                payload: ResourcePayload::Formula {
                    latex: "e^{i\\pi}".into(),
                },
            })
            .unwrap();
        assert_eq!(s.get_resource(r.id).unwrap(), r);

        let updated = s
            .update_resource(
                r.id,
                UpdateResourceRequest {
                    title: Some("Euler".into()),
                    payload: None,
                },
            )
            .unwrap();
        assert_eq!(updated.title, "Euler");

        s.delete_resource(r.id).unwrap();
        assert!(matches!(
            s.get_resource(r.id),
            Err(QuireError::ResourceNotFound(_))
        ));
        assert!(s.delete_resource(r.id).is_err());
    }

    #[test]
    fn invalid_payload_is_rejected() {
        let mut s = store();
        let err = s
            .create_resource(CreateResourceRequest {
                title: "clip".into(),
                payload: ResourcePayload::Video {
                    url: "".into(),
                    duration_secs: None,
                },
            })
            .unwrap_err();
        assert!(err.is_rejection());
        assert!(s.list_resources().unwrap().is_empty());
    }
}
