use super::StorageBackend;
use crate::error::{QuireError, Result};
use crate::model::{ResourceRecord, TreeNodeRecord};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const TREE_FILE: &str = "tree.json";
const RESOURCES_FILE: &str = "resources.json";

pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_dir(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).map_err(QuireError::Io)?;
        }
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let path = self.root.join(name);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path).map_err(QuireError::Io)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(QuireError::Serialization)
    }

    fn write_json<T: Serialize>(&self, name: &str, items: &[T]) -> Result<()> {
        self.ensure_dir(&self.root)?;
        let content = serde_json::to_string_pretty(items).map_err(QuireError::Serialization)?;
        write_atomic(&self.root.join(name), &content)
    }
}

/// Write to a temp file in the same directory, then rename over `path`.
/// The temp file is removed again if the rename fails.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_file = dir.join(format!(".{}-{}.tmp", name, Uuid::new_v4()));
    fs::write(&tmp_file, content).map_err(QuireError::Io)?;
    if let Err(e) = fs::rename(&tmp_file, path) {
        let _ = fs::remove_file(&tmp_file);
        return Err(QuireError::Io(e));
    }
    Ok(())
}

impl StorageBackend for FsBackend {
    fn load_nodes(&self) -> Result<Vec<TreeNodeRecord>> {
        self.read_json(TREE_FILE)
    }

    fn save_nodes(&self, nodes: &[TreeNodeRecord]) -> Result<()> {
        self.write_json(TREE_FILE, nodes)
    }

    fn load_resources(&self) -> Result<Vec<ResourceRecord>> {
        self.read_json(RESOURCES_FILE)
    }

    fn save_resources(&self, resources: &[ResourceRecord]) -> Result<()> {
        self.write_json(RESOURCES_FILE, resources)
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}
