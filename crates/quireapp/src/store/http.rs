//! REST backend.
//!
//! Each [`TreeBackend`]/[`ResourceBackend`] call becomes exactly one
//! [`ApiRequest`], which knows its method, path and JSON body. The actual
//! network hop is behind [`Transport`] so the mapping can be tested without a
//! server.
//!
//! | request            | method | path                          |
//! |--------------------|--------|-------------------------------|
//! | list nodes         | GET    | `/tree-nodes`                 |
//! | create node        | POST   | `/tree-nodes`                 |
//! | update node        | PUT    | `/tree-nodes/{id}`            |
//! | delete node        | DELETE | `/tree-nodes/{id}`            |
//! | move node          | PATCH  | `/tree-nodes/{id}/move`       |
//! | reorder node       | PATCH  | `/tree-nodes/{id}/reorder`    |
//! | list resources     | GET    | `/api/resources`              |
//! | get/put/delete one | ...    | `/api/resources/{id}`         |
//!
//! Every request needs a session token. Without one the call fails with
//! [`QuireError::Unauthorized`] before anything is sent. A 401 clears the
//! stored token and surfaces the same way. Any other non-2xx status becomes
//! [`QuireError::Backend`]. Nothing is retried.
//!
//! [`TokenStore::load`] keeps the token in `token.json` in the data
//! directory, so a session survives restarts and a rejected one is forgotten.
//! A blocking `reqwest` transport lives in [`super::remote`] behind the
//! `remote` feature.

use super::fs_backend::write_atomic;
use super::{
    CreateNodeRequest, CreateResourceRequest, MoveNodeRequest, ReorderNodeRequest,
    ResourceBackend, TreeBackend, UpdateNodeRequest, UpdateResourceRequest,
};
use crate::error::{QuireError, Result};
use crate::model::{Resource, ResourcePayload, ResourceRecord, TreeNodeRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request and returns the response, whatever its status.
/// Errors are for transport failures only.
pub trait Transport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Resource body on the wire: the payload travels as a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceBody {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiRequest {
    ListNodes,
    CreateNode(CreateNodeRequest),
    UpdateNode(Uuid, UpdateNodeRequest),
    DeleteNode(Uuid),
    MoveNode(Uuid, MoveNodeRequest),
    ReorderNode(Uuid, ReorderNodeRequest),
    ListResources,
    GetResource(Uuid),
    CreateResource(ResourceBody),
    UpdateResource(Uuid, ResourceBody),
    DeleteResource(Uuid),
}

impl ApiRequest {
    pub fn method(&self) -> Method {
        match self {
            ApiRequest::ListNodes | ApiRequest::ListResources | ApiRequest::GetResource(_) => {
                Method::Get
            }
            ApiRequest::CreateNode(_) | ApiRequest::CreateResource(_) => Method::Post,
            ApiRequest::UpdateNode(..) | ApiRequest::UpdateResource(..) => Method::Put,
            ApiRequest::MoveNode(..) | ApiRequest::ReorderNode(..) => Method::Patch,
            ApiRequest::DeleteNode(_) | ApiRequest::DeleteResource(_) => Method::Delete,
        }
    }

    pub fn path(&self) -> String {
        match self {
            ApiRequest::ListNodes | ApiRequest::CreateNode(_) => "/tree-nodes".to_string(),
            ApiRequest::UpdateNode(id, _) | ApiRequest::DeleteNode(id) => {
                format!("/tree-nodes/{}", id)
            }
            ApiRequest::MoveNode(id, _) => format!("/tree-nodes/{}/move", id),
            ApiRequest::ReorderNode(id, _) => format!("/tree-nodes/{}/reorder", id),
            ApiRequest::ListResources | ApiRequest::CreateResource(_) => {
                "/api/resources".to_string()
            }
            ApiRequest::GetResource(id)
            | ApiRequest::UpdateResource(id, _)
            | ApiRequest::DeleteResource(id) => format!("/api/resources/{}", id),
        }
    }

    pub fn body(&self) -> Result<Option<String>> {
        let body = match self {
            ApiRequest::CreateNode(req) => serde_json::to_string(req)?,
            ApiRequest::UpdateNode(_, req) => serde_json::to_string(req)?,
            ApiRequest::MoveNode(_, req) => serde_json::to_string(req)?,
            ApiRequest::ReorderNode(_, req) => serde_json::to_string(req)?,
            ApiRequest::CreateResource(body) | ApiRequest::UpdateResource(_, body) => {
                serde_json::to_string(body)?
            }
            _ => return Ok(None),
        };
        Ok(Some(body))
    }
}

pub const TOKEN_FILE: &str = "token.json";

#[derive(Serialize, Deserialize)]
struct StoredToken {
    token: String,
}

/// Holds the bearer token for the current session.
///
/// A store opened with [`TokenStore::load`] writes every change through to
/// its file; one built with [`TokenStore::new`] lives in memory only.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    token: Option<String>,
    path: Option<PathBuf>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            path: None,
        }
    }

    /// Open the token persisted in `dir`. A missing file means no session.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(TOKEN_FILE);
        let token = match fs::read_to_string(&path) {
            Ok(content) => {
                let stored: StoredToken = serde_json::from_str(&content)?;
                Some(stored.token).filter(|t| !t.is_empty())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            token,
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set(&mut self, token: impl Into<String>) -> Result<()> {
        let token = token.into();
        if let Some(path) = &self.path {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            let content = serde_json::to_string_pretty(&StoredToken {
                token: token.clone(),
            })?;
            write_atomic(path, &content)?;
        }
        self.token = Some(token);
        Ok(())
    }

    pub fn get(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.token = None;
        if let Some(path) = &self.path {
            match fs::remove_file(path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
                _ => {}
            }
        }
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "error", alias = "detail")]
    message: String,
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

pub struct HttpBackend<T: Transport> {
    transport: T,
    tokens: TokenStore,
}

impl<T: Transport> HttpBackend<T> {
    pub fn new(transport: T, tokens: TokenStore) -> Self {
        Self { transport, tokens }
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn tokens_mut(&mut self) -> &mut TokenStore {
        &mut self.tokens
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn build(req: &ApiRequest, token: &str) -> Result<HttpRequest> {
        let body = req.body()?;
        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("Authorization".to_string(), format!("Bearer {}", token)),
        ];
        if body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        Ok(HttpRequest {
            method: req.method(),
            path: req.path(),
            headers,
            body,
        })
    }

    fn call(&mut self, req: ApiRequest) -> Result<String> {
        let Some(token) = self.tokens.get() else {
            warn!(path = %req.path(), "no session token, sign in first");
            return Err(QuireError::Unauthorized);
        };
        let request = Self::build(&req, token)?;
        debug!(method = %request.method, path = %request.path, "api request");
        let response = self.transport.send(&request)?;
        if response.is_success() {
            return Ok(response.body);
        }
        if response.status == 401 {
            warn!(path = %request.path, "session rejected, clearing token");
            if let Err(e) = self.tokens.clear() {
                warn!(error = %e, "could not remove stored token");
            }
            return Err(QuireError::Unauthorized);
        }
        let message = error_message(&response.body);
        warn!(status = response.status, path = %request.path, %message, "api request failed");
        Err(QuireError::Backend {
            status: response.status,
            message,
        })
    }

    fn call_json<R: serde::de::DeserializeOwned>(&mut self, req: ApiRequest) -> Result<R> {
        let body = self.call(req)?;
        serde_json::from_str(&body).map_err(QuireError::Serialization)
    }

    fn resource_body(title: String, payload: &ResourcePayload) -> Result<ResourceBody> {
        Ok(ResourceBody {
            title,
            kind: payload.kind().to_string(),
            content: serde_json::to_string(payload)?,
        })
    }
}

impl<T: Transport> TreeBackend for HttpBackend<T> {
    fn list_nodes(&mut self) -> Result<Vec<TreeNodeRecord>> {
        self.call_json(ApiRequest::ListNodes)
    }

    fn create_node(&mut self, req: CreateNodeRequest) -> Result<TreeNodeRecord> {
        self.call_json(ApiRequest::CreateNode(req))
    }

    fn update_node(&mut self, id: Uuid, req: UpdateNodeRequest) -> Result<TreeNodeRecord> {
        self.call_json(ApiRequest::UpdateNode(id, req))
    }

    fn delete_node(&mut self, id: Uuid) -> Result<()> {
        self.call(ApiRequest::DeleteNode(id)).map(|_| ())
    }

    fn move_node(&mut self, id: Uuid, req: MoveNodeRequest) -> Result<()> {
        self.call(ApiRequest::MoveNode(id, req)).map(|_| ())
    }

    fn reorder_node(&mut self, id: Uuid, req: ReorderNodeRequest) -> Result<()> {
        self.call(ApiRequest::ReorderNode(id, req)).map(|_| ())
    }
}

impl<T: Transport> ResourceBackend for HttpBackend<T> {
    fn list_resources(&mut self) -> Result<Vec<Resource>> {
        let records: Vec<ResourceRecord> = self.call_json(ApiRequest::ListResources)?;
        records.into_iter().map(Resource::from_record).collect()
    }

    fn get_resource(&mut self, id: Uuid) -> Result<Resource> {
        let record: ResourceRecord = self.call_json(ApiRequest::GetResource(id))?;
        Resource::from_record(record)
    }

    fn create_resource(&mut self, req: CreateResourceRequest) -> Result<Resource> {
        req.payload.validate()?;
        let body = Self::resource_body(req.title, &req.payload)?;
        let record: ResourceRecord = self.call_json(ApiRequest::CreateResource(body))?;
        Resource::from_record(record)
    }

    /// The REST boundary has no partial update, so the current resource is
    /// fetched and merged first.
    fn update_resource(&mut self, id: Uuid, req: UpdateResourceRequest) -> Result<Resource> {
        if let Some(payload) = &req.payload {
            payload.validate()?;
        }
        let current = self.get_resource(id)?;
        let title = req.title.unwrap_or(current.title);
        let payload = req.payload.unwrap_or(current.payload);
        let body = Self::resource_body(title, &payload)?;
        let record: ResourceRecord = self.call_json(ApiRequest::UpdateResource(id, body))?;
        Resource::from_record(record)
    }

    fn delete_resource(&mut self, id: Uuid) -> Result<()> {
        self.call(ApiRequest::DeleteResource(id)).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeKind;
    use chrono::Utc;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned responses and records what was sent.
    #[derive(Default)]
    struct Scripted {
        responses: RefCell<VecDeque<HttpResponse>>,
        sent: RefCell<Vec<HttpRequest>>,
    }

    impl Scripted {
        fn reply(self, status: u16, body: &str) -> Self {
            self.responses.borrow_mut().push_back(HttpResponse {
                status,
                body: body.to_string(),
            });
            self
        }
    }

    impl Transport for Scripted {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
            self.sent.borrow_mut().push(request.clone());
            self.responses
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| QuireError::Api("no scripted response".into()))
        }
    }

    fn backend(transport: Scripted) -> HttpBackend<Scripted> {
        HttpBackend::new(transport, TokenStore::with_token("t0k"))
    }

    #[test]
    fn routes_match_the_rest_boundary() {
        let id = Uuid::nil();
        let cases = [
            (ApiRequest::ListNodes, Method::Get, "/tree-nodes".to_string()),
            (ApiRequest::DeleteNode(id), Method::Delete, format!("/tree-nodes/{}", id)),
            (
                ApiRequest::MoveNode(
                    id,
                    MoveNodeRequest {
                        new_parent_id: None,
                        position: Some(1),
                    },
                ),
                Method::Patch,
                format!("/tree-nodes/{}/move", id),
            ),
            (
                ApiRequest::ReorderNode(id, ReorderNodeRequest { new_position: 2 }),
                Method::Patch,
                format!("/tree-nodes/{}/reorder", id),
            ),
            (ApiRequest::ListResources, Method::Get, "/api/resources".to_string()),
            (ApiRequest::GetResource(id), Method::Get, format!("/api/resources/{}", id)),
        ];
        for (req, method, path) in cases {
            assert_eq!(req.method(), method);
            assert_eq!(req.path(), path);
        }
    }

    #[test]
    fn move_body_uses_wire_field_names() {
        let parent = Uuid::new_v4();
        let req = ApiRequest::MoveNode(
            Uuid::new_v4(),
            MoveNodeRequest {
                new_parent_id: Some(parent),
                position: Some(3),
            },
        );
        let body: serde_json::Value = serde_json::from_str(&req.body().unwrap().unwrap()).unwrap();
        assert_eq!(body["new_parent_id"], parent.to_string());
        assert_eq!(body["position"], 3);
        assert!(ApiRequest::ListNodes.body().unwrap().is_none());
    }

    #[test]
    fn bearer_token_is_attached() {
        let mut b = backend(Scripted::default().reply(200, "[]"));
        assert!(b.list_nodes().unwrap().is_empty());
        let sent = b.transport().sent.borrow();
        assert_eq!(sent[0].header("authorization"), Some("Bearer t0k"));
        assert_eq!(sent[0].header("content-type"), None);
    }

    #[test]
    fn unauthorized_clears_token() {
        let mut b = backend(Scripted::default().reply(401, "").reply(200, "[]"));
        assert!(matches!(b.list_nodes(), Err(QuireError::Unauthorized)));
        assert!(!b.tokens().is_authenticated());

        assert!(matches!(b.list_nodes(), Err(QuireError::Unauthorized)));
        assert_eq!(b.transport().sent.borrow().len(), 1);
    }

    #[test]
    fn missing_token_sends_nothing() {
        let mut b = HttpBackend::new(Scripted::default().reply(200, "[]"), TokenStore::new());
        assert!(matches!(b.list_nodes(), Err(QuireError::Unauthorized)));
        assert!(b.transport().sent.borrow().is_empty());
    }

    #[test]
    fn token_persists_until_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let mut tokens = TokenStore::load(dir.path()).unwrap();
        assert!(!tokens.is_authenticated());
        tokens.set("s3cret").unwrap();

        let mut reloaded = TokenStore::load(dir.path()).unwrap();
        assert_eq!(reloaded.get(), Some("s3cret"));
        reloaded.clear().unwrap();

        assert!(!TokenStore::load(dir.path()).unwrap().is_authenticated());
        assert!(!dir.path().join(TOKEN_FILE).exists());
    }

    #[test]
    fn rejected_session_removes_stored_token() {
        let dir = tempfile::tempdir().unwrap();
        let mut tokens = TokenStore::load(dir.path()).unwrap();
        tokens.set("stale").unwrap();

        let mut b = HttpBackend::new(Scripted::default().reply(401, ""), tokens);
        assert!(matches!(b.list_nodes(), Err(QuireError::Unauthorized)));
        assert!(TokenStore::load(dir.path()).unwrap().get().is_none());
    }

    #[test]
    fn server_errors_carry_status_and_message() {
        let mut b = backend(Scripted::default().reply(409, r#"{"detail":"name taken"}"#));
        let err = b
            .create_node(CreateNodeRequest::new("x", NodeKind::Note, None))
            .unwrap_err();
        match err {
            QuireError::Backend { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "name taken");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn resource_payload_is_sent_as_json_string() {
        let now = Utc::now().to_rfc3339();
        let id = Uuid::new_v4();
        let reply = format!(
            r#"{{"id":"{id}","title":"c","type":"code","content":"{{\"type\":\"code\",\"source\":\"fn main() {{}}\"}}","created_at":"{now}","updated_at":"{now}"}}"#
        );
        let mut b = backend(Scripted::default().reply(201, &reply));
        let created = b
            .create_resource(CreateResourceRequest {
                title: "c".into(),
                payload: ResourcePayload::Code {
                    language: None,
                    source: "fn main() {}".into(),
                },
            })
            .unwrap();
        assert_eq!(created.id, id);

        let sent = b.transport().sent.borrow();
        let body: ResourceBody = serde_json::from_str(sent[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body.kind, "code");
        let payload: ResourcePayload = serde_json::from_str(&body.content).unwrap();
        assert_eq!(
            payload,
            ResourcePayload::Code {
                language: None,
                source: "fn main() {}".into()
            }
        );
    }
}
