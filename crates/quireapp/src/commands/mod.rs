//! # Command Layer
//!
//! The tree, note and resource operations of quire. Each command lives in its
//! own submodule as plain functions over a backend.
//!
//! ## Role and Responsibilities
//!
//! - Validate input and run the operation against a [`TreeBackend`] or
//!   [`ResourceBackend`](crate::store::ResourceBackend).
//! - Check tree rules (cycles, containers, empty names) locally before the
//!   backend is asked to change anything, so a remote backend never sees a
//!   request the tree model would reject.
//! - Return a structured [`CmdResult`].
//!
//! ## What Commands Do NOT Do
//!
//! - **Any I/O** beyond the backend: no stdout, stderr or terminal concerns.
//! - **Argument parsing** or id prefix resolution: that is the client's job.
//! - **Prompts**: deletion returns a preview first; the client decides how to
//!   confirm.
//!
//! ## Testing Strategy
//!
//! Command tests use `LocalStore<MemBackend>` and check `CmdResult` contents
//! and the stored tree after each operation, including failure paths.
//!
//! ## Command Modules
//!
//! - [`create`], [`rename`], [`delete`], [`move_node`], [`reorder`]: tree edits
//! - [`list`]: the tree as visible rows
//! - [`note`]: open, save, edit and paginate notes
//! - [`export`]: one note to HTML/text/Markdown, or every note to a tar.gz
//! - [`resources`]: resource and reference management
//! - [`config`]: editor settings

use crate::error::{QuireError, Result};
use crate::model::{Resource, TreeNodeRecord};
use crate::pagination::Page;
use crate::references::ReferenceItem;
use crate::store::TreeBackend;
use crate::tree::{Tree, TreeRow};
use directories::ProjectDirs;
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

pub mod config;
pub mod create;
pub mod delete;
pub mod export;
pub mod list;
pub mod move_node;
pub mod note;
pub mod rename;
pub mod reorder;
pub mod resources;

/// Where a local installation keeps its files.
#[derive(Debug, Clone)]
pub struct QuirePaths {
    pub data: PathBuf,
}

impl QuirePaths {
    pub fn new(data: impl Into<PathBuf>) -> Self {
        Self { data: data.into() }
    }

    /// `explicit` when given, else the platform data directory.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = explicit {
            return Ok(Self::new(dir));
        }
        ProjectDirs::from("", "", "quire")
            .map(|dirs| Self::new(dirs.data_dir()))
            .ok_or_else(|| {
                QuireError::Config("no home directory; set a data directory explicitly".into())
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct CmdResult {
    /// Nodes created or changed, as stored after the operation.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub affected_nodes: Vec<TreeNodeRecord>,
    /// Visible tree rows, for listings.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<TreeRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<Page>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Resource>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<ReferenceItem>,
    /// Rendered text (note bodies, exports written to stdout).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<PathBuf>,
    /// `(key, value)` pairs for the config command.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub settings: Vec<(String, String)>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_message(mut self, message: CmdMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_affected_nodes(mut self, nodes: Vec<TreeNodeRecord>) -> Self {
        self.affected_nodes = nodes;
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }
}

/// Current tree as stored by the backend.
pub fn load_tree<B: TreeBackend>(backend: &mut B) -> Result<Tree> {
    Ok(Tree::from_records(backend.list_nodes()?))
}

/// Stored record for `id` after an operation.
pub(crate) fn stored_record<B: TreeBackend>(
    backend: &mut B,
    id: Uuid,
) -> Result<TreeNodeRecord> {
    backend
        .list_nodes()?
        .into_iter()
        .find(|r| r.id == id)
        .ok_or(QuireError::NodeNotFound(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_data_dir_wins() {
        let paths = QuirePaths::resolve(Some(PathBuf::from("/tmp/quire-data"))).unwrap();
        assert_eq!(paths.data, PathBuf::from("/tmp/quire-data"));
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::model::NodeKind;
    use crate::store::{CreateNodeRequest, LocalStore, MemBackend, MemStore, TreeBackend};
    use uuid::Uuid;

    pub fn store() -> MemStore {
        LocalStore::new(MemBackend::new())
    }

    pub fn node(store: &mut MemStore, name: &str, kind: NodeKind, parent: Option<Uuid>) -> Uuid {
        store
            .create_node(CreateNodeRequest::new(name, kind, parent))
            .unwrap()
            .id
    }
}
