//! Resource management, and references as a view over `citation` resources.

use crate::commands::{CmdMessage, CmdResult};
use crate::error::{QuireError, Result};
use crate::model::ResourcePayload;
use crate::references::{ReferenceItem, ReferenceList};
use crate::store::{CreateResourceRequest, ResourceBackend, UpdateResourceRequest};
use uuid::Uuid;

pub fn list<B: ResourceBackend>(backend: &mut B, kind: Option<&str>) -> Result<CmdResult> {
    let mut resources = backend.list_resources()?;
    if let Some(kind) = kind {
        resources.retain(|r| r.payload.kind() == kind);
    }
    resources.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(CmdResult {
        resources,
        ..CmdResult::default()
    })
}

pub fn add<B: ResourceBackend>(
    backend: &mut B,
    title: &str,
    payload: ResourcePayload,
) -> Result<CmdResult> {
    if title.trim().is_empty() {
        return Err(QuireError::validation("resource title cannot be empty"));
    }
    let kind = payload.kind();
    let resource = backend.create_resource(CreateResourceRequest {
        title: title.trim().to_string(),
        payload,
    })?;
    let message = CmdMessage::success(format!("Added {} '{}'", kind, resource.title));
    Ok(CmdResult {
        resources: vec![resource],
        ..CmdResult::default()
    }
    .with_message(message))
}

pub fn retitle<B: ResourceBackend>(backend: &mut B, id: Uuid, title: &str) -> Result<CmdResult> {
    if title.trim().is_empty() {
        return Err(QuireError::validation("resource title cannot be empty"));
    }
    let resource = backend.update_resource(
        id,
        UpdateResourceRequest {
            title: Some(title.trim().to_string()),
            payload: None,
        },
    )?;
    let message = CmdMessage::success(format!("Renamed resource to '{}'", resource.title));
    Ok(CmdResult {
        resources: vec![resource],
        ..CmdResult::default()
    }
    .with_message(message))
}

pub fn remove<B: ResourceBackend>(backend: &mut B, id: Uuid) -> Result<CmdResult> {
    let resource = backend.get_resource(id)?;
    backend.delete_resource(id)?;
    Ok(CmdResult::default().with_message(CmdMessage::success(format!(
        "Removed {} '{}'",
        resource.payload.kind(),
        resource.title
    ))))
}

pub fn references<B: ResourceBackend>(backend: &mut B) -> Result<CmdResult> {
    let resources = backend.list_resources()?;
    let list = ReferenceList::from_resources(&resources);
    let mut result = CmdResult::default();
    if list.is_empty() {
        result.add_message(CmdMessage::info("No references yet."));
    }
    result.references = list.items().to_vec();
    Ok(result)
}

pub fn add_reference<B: ResourceBackend>(
    backend: &mut B,
    item: ReferenceItem,
) -> Result<CmdResult> {
    item.validate()?;
    let resource = item.to_resource();
    let created = backend.create_resource(CreateResourceRequest {
        title: resource.title,
        payload: resource.payload,
    })?;
    let stored = ReferenceItem::from_resource(&created)
        .ok_or_else(|| QuireError::Store("citation came back as another kind".into()))?;
    let message = CmdMessage::success(format!("Added reference: {}", stored.citation()));
    let mut result = CmdResult::default().with_message(message);
    result.references.push(stored);
    Ok(result)
}

pub fn remove_reference<B: ResourceBackend>(backend: &mut B, id: Uuid) -> Result<CmdResult> {
    let resource = backend.get_resource(id)?;
    if ReferenceItem::from_resource(&resource).is_none() {
        return Err(QuireError::validation(format!(
            "'{}' is a {} resource, not a reference",
            resource.title,
            resource.payload.kind()
        )));
    }
    remove(backend, id)
}
