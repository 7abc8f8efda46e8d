//! Blocking `reqwest` transport for [`HttpBackend`](super::HttpBackend).
//!
//! ```ignore
//! let transport = ReqwestTransport::new("https://notes.example.com")?;
//! let tokens = TokenStore::load(&paths.data)?;
//! let backend = HttpBackend::new(transport, tokens);
//! ```

use super::http::{HttpRequest, HttpResponse, Method, Transport};
use crate::error::{QuireError, Result};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(30);

pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(QuireError::Config(format!(
                "server url must start with http:// or https://, got '{}'",
                base_url
            )));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(TIMEOUT)
            .build()
            .map_err(|e| QuireError::Api(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(method(request.method), self.url(&request.path));
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        let response = builder
            .send()
            .map_err(|e| QuireError::Api(format!("{} {}: {}", request.method, request.path, e)))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| QuireError::Api(e.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}
