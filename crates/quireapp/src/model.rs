//! # Wire and Storage Records
//!
//! The in-memory tree ([`crate::tree::Tree`]) is recursive. Backends speak a
//! flat form instead: one [`TreeNodeRecord`] per node carrying its
//! `parent_id` and sibling `position`. Both the filesystem backend and the
//! HTTP boundary use this shape.
//!
//! Resources are stored with their type-specific payload serialized to a
//! JSON string in the `content` field ([`ResourceRecord`]). In memory that
//! payload is a proper sum type, [`ResourcePayload`], with one case per kind,
//! each carrying only the fields that kind needs.

use crate::error::{QuireError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    /// A file-like object (uploaded asset, linked resource).
    Object,
    Note,
}

impl NodeKind {
    /// Only folders hold children.
    pub fn accepts_children(&self) -> bool {
        matches!(self, NodeKind::Folder)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Folder => "folder",
            NodeKind::Object => "object",
            NodeKind::Note => "note",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = QuireError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "folder" | "dir" => Ok(NodeKind::Folder),
            "object" | "file" => Ok(NodeKind::Object),
            "note" => Ok(NodeKind::Note),
            other => Err(QuireError::validation(format!(
                "unknown node type '{}' (expected folder, object or note)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNodeRecord {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub position: u32,
    /// Stored document HTML for notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResourcePayload {
    Citation {
        author: String,
        year: String,
        title: String,
        publication: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        doi: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    Image {
        src: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Table {
        rows: Vec<Vec<String>>,
    },
    Formula {
        latex: String,
    },
    Video {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_secs: Option<u32>,
    },
    Audio {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_secs: Option<u32>,
    },
    Code {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        source: String,
    },
    Text {
        body: String,
    },
}

impl ResourcePayload {
    pub fn kind(&self) -> &'static str {
        match self {
            ResourcePayload::Citation { .. } => "citation",
            ResourcePayload::Image { .. } => "image",
            ResourcePayload::Table { .. } => "table",
            ResourcePayload::Formula { .. } => "formula",
            ResourcePayload::Video { .. } => "video",
            ResourcePayload::Audio { .. } => "audio",
            ResourcePayload::Code { .. } => "code",
            ResourcePayload::Text { .. } => "text",
        }
    }

    /// Required fields must be non-blank.
    pub fn validate(&self) -> Result<()> {
        let required: Vec<(&str, &str)> = match self {
            ResourcePayload::Citation {
                author,
                year,
                title,
                ..
            } => vec![("author", author), ("year", year), ("title", title)],
            ResourcePayload::Image { src, .. } => vec![("src", src)],
            ResourcePayload::Table { .. } => Vec::new(),
            ResourcePayload::Formula { latex } => vec![("latex", latex)],
            ResourcePayload::Video { url, .. } | ResourcePayload::Audio { url, .. } => {
                vec![("url", url)]
            }
            ResourcePayload::Code { source, .. } => vec![("source", source)],
            ResourcePayload::Text { body } => vec![("body", body)],
        };
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(QuireError::validation(format!(
                    "{} resource requires a {}",
                    self.kind(),
                    field
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub payload: ResourcePayload,
}

impl Resource {
    pub fn new(title: impl Into<String>, payload: ResourcePayload) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            created_at: now,
            updated_at: now,
            payload,
        }
    }

    pub fn to_record(&self) -> Result<ResourceRecord> {
        Ok(ResourceRecord {
            id: self.id,
            title: self.title.clone(),
            kind: self.payload.kind().to_string(),
            content: serde_json::to_string(&self.payload)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    pub fn from_record(record: ResourceRecord) -> Result<Self> {
        let payload: ResourcePayload = serde_json::from_str(&record.content)?;
        Ok(Self {
            id: record.id,
            title: record.title,
            created_at: record.created_at,
            updated_at: record.updated_at,
            payload,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// JSON-serialized [`ResourcePayload`].
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_kind_parses_aliases() {
        assert_eq!("Folder".parse::<NodeKind>().unwrap(), NodeKind::Folder);
        assert_eq!("file".parse::<NodeKind>().unwrap(), NodeKind::Object);
        assert!("pdf".parse::<NodeKind>().is_err());
    }

    #[test]
    fn tree_record_uses_type_on_the_wire() {
        let now = Utc::now();
        let record = TreeNodeRecord {
            id: Uuid::new_v4(),
            name: "Drafts".into(),
            kind: NodeKind::Folder,
            parent_id: None,
            position: 0,
            content: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "folder");
        assert!(json.get("content").is_none());
    }

    #[test]
    fn resource_payload_travels_as_json_string() {
        let resource = Resource::new(
            "Fig. 2",
            ResourcePayload::Image {
                src: "fig2.png".into(),
                alt: None,
                caption: Some("Growth".into()),
            },
        );
        let record = resource.to_record().unwrap();
        assert_eq!(record.kind, "image");
        assert!(record.content.contains(r#""type":"image""#));
        assert!(!record.content.contains("alt"));
        assert_eq!(Resource::from_record(record).unwrap(), resource);
    }

    #[test]
    fn payload_validation_names_the_missing_field() {
        let err = ResourcePayload::Formula { latex: " ".into() }
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("latex"));
        assert!(ResourcePayload::Table { rows: vec![] }.validate().is_ok());
    }

    #[test]
    fn malformed_content_is_a_serialization_error() {
        let now = Utc::now();
        let record = ResourceRecord {
            id: Uuid::new_v4(),
            title: "x".into(),
            kind: "text".into(),
            content: "{not json".into(),
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(
            Resource::from_record(record),
            Err(QuireError::Serialization(_))
        ));
    }
}
