//! Citation metadata attached to a project.
//!
//! References persist as `citation` resources; [`ReferenceItem`] is the
//! editing view over one of them.

use crate::error::{QuireError, Result};
use crate::model::{Resource, ResourcePayload};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceItem {
    pub id: Uuid,
    pub author: String,
    pub year: String,
    pub title: String,
    pub publication: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ReferenceItem {
    pub fn new(
        author: impl Into<String>,
        year: impl Into<String>,
        title: impl Into<String>,
        publication: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            author: author.into(),
            year: year.into(),
            title: title.into(),
            publication: publication.into(),
            doi: None,
            url: None,
        }
    }

    pub fn with_doi(mut self, doi: impl Into<String>) -> Self {
        self.doi = Some(doi.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("author", &self.author),
            ("title", &self.title),
            ("year", &self.year),
        ] {
            if value.trim().is_empty() {
                return Err(QuireError::validation(format!(
                    "reference {} is required",
                    field
                )));
            }
        }
        let year = self.year.trim();
        if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(QuireError::validation(format!(
                "reference year must be four digits, got '{}'",
                year
            )));
        }
        Ok(())
    }

    /// `Author (Year). Title. Publication. doi:X` with the url as fallback.
    pub fn citation(&self) -> String {
        let mut out = format!(
            "{} ({}). {}.",
            self.author.trim(),
            self.year.trim(),
            self.title.trim()
        );
        if !self.publication.trim().is_empty() {
            out.push(' ');
            out.push_str(self.publication.trim());
            out.push('.');
        }
        if let Some(doi) = self.doi.as_deref().filter(|d| !d.trim().is_empty()) {
            out.push_str(" doi:");
            out.push_str(doi.trim());
        } else if let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            out.push(' ');
            out.push_str(url.trim());
        }
        out
    }

    pub fn to_resource(&self) -> Resource {
        let mut resource = Resource::new(
            self.title.clone(),
            ResourcePayload::Citation {
                author: self.author.clone(),
                year: self.year.clone(),
                title: self.title.clone(),
                publication: self.publication.clone(),
                doi: self.doi.clone(),
                url: self.url.clone(),
            },
        );
        resource.id = self.id;
        resource
    }

    /// `None` for resources of any other kind.
    pub fn from_resource(resource: &Resource) -> Option<Self> {
        match &resource.payload {
            ResourcePayload::Citation {
                author,
                year,
                title,
                publication,
                doi,
                url,
            } => Some(Self {
                id: resource.id,
                author: author.clone(),
                year: year.clone(),
                title: title.clone(),
                publication: publication.clone(),
                doi: doi.clone(),
                url: url.clone(),
            }),
            _ => None,
        }
    }
}

/// Ordered references of one project. Items change only by explicit add/remove.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceList {
    items: Vec<ReferenceItem>,
}

impl ReferenceList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_resources<'a>(resources: impl IntoIterator<Item = &'a Resource>) -> Self {
        Self {
            items: resources
                .into_iter()
                .filter_map(ReferenceItem::from_resource)
                .collect(),
        }
    }

    pub fn items(&self) -> &[ReferenceItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&ReferenceItem> {
        self.items.iter().find(|r| r.id == id)
    }

    pub fn add(&mut self, item: ReferenceItem) -> Result<()> {
        item.validate()?;
        if self.get(item.id).is_some() {
            return Err(QuireError::validation(format!(
                "reference {} already listed",
                item.id
            )));
        }
        self.items.push(item);
        Ok(())
    }

    pub fn remove(&mut self, id: Uuid) -> Result<ReferenceItem> {
        let idx = self
            .items
            .iter()
            .position(|r| r.id == id)
            .ok_or(QuireError::ResourceNotFound(id))?;
        Ok(self.items.remove(idx))
    }

    /// Numbered bibliography, one citation per line.
    pub fn bibliography(&self) -> Vec<String> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, r)| format!("[{}] {}", i + 1, r.citation()))
            .collect()
    }
}
