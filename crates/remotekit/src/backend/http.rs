//! HTTP management API backend.
//!
//! Objects live under `{base}/resources/{type}`:
//!
//! | Operation | Request                          | Response body             |
//! |-----------|----------------------------------|---------------------------|
//! | create    | `POST` with `{"attributes"}`     | `{"id", "computed"}`      |
//! | read      | `GET ?id=…`                      | `{"attributes"}`          |
//! | update    | `PATCH ?id=…` with `{"changes"}` | `{"computed"}`            |
//! | delete    | `DELETE ?id=…`                   | empty                     |
//!
//! Status codes map onto [`ErrorCategory`](crate::ErrorCategory): 404 is
//! not-found, 429 throttled, 5xx unavailable, any other 4xx rejected.

use crate::backend::Backend;
use crate::error::{Error, Result};
use declarative::{AttributeUpdate, Attributes};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP backend for a JSON management API.
pub struct HttpBackend {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    /// Create a backend for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, resource_type: &str) -> String {
        format!("{}/resources/{}", self.base_url, resource_type)
    }

    fn authorize<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        let request = request
            .header("Accept", "application/json")
            .header("User-Agent", concat!("remotekit/", env!("CARGO_PKG_VERSION")));
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }
}

#[derive(Serialize)]
struct CreateRequest<'a> {
    attributes: &'a Attributes,
}

#[derive(Deserialize)]
struct CreateResponse {
    id: String,
    #[serde(default)]
    computed: Attributes,
}

#[derive(Deserialize)]
struct ReadResponse {
    attributes: Attributes,
}

#[derive(Serialize)]
struct UpdateRequest<'a> {
    changes: &'a AttributeUpdate,
}

#[derive(Deserialize)]
struct UpdateResponse {
    #[serde(default)]
    computed: Attributes,
}

impl Backend for HttpBackend {
    fn create(&self, resource_type: &str, attributes: &Attributes) -> Result<(String, Attributes)> {
        let url = self.collection_url(resource_type);
        log::debug!("POST {url}");

        let response: CreateResponse = self
            .authorize(self.agent.post(&url))
            .send_json(CreateRequest { attributes })?
            .body_mut()
            .read_json()?;

        if response.id.is_empty() {
            return Err(Error::InvalidResponse("create returned an empty id".to_string()));
        }
        Ok((response.id, response.computed))
    }

    fn read(&self, resource_type: &str, external_id: &str) -> Result<Attributes> {
        let url = self.collection_url(resource_type);
        log::debug!("GET {url}?id={external_id}");

        let response: ReadResponse = self
            .authorize(self.agent.get(&url))
            .query("id", external_id)
            .call()?
            .body_mut()
            .read_json()?;

        Ok(response.attributes)
    }

    fn update(
        &self,
        resource_type: &str,
        external_id: &str,
        changes: &AttributeUpdate,
    ) -> Result<Attributes> {
        let url = self.collection_url(resource_type);
        log::debug!("PATCH {url}?id={external_id}");

        let response: UpdateResponse = self
            .authorize(self.agent.patch(&url))
            .query("id", external_id)
            .send_json(UpdateRequest { changes })?
            .body_mut()
            .read_json()?;

        Ok(response.computed)
    }

    fn delete(&self, resource_type: &str, external_id: &str) -> Result<()> {
        let url = self.collection_url(resource_type);
        log::debug!("DELETE {url}?id={external_id}");

        self.authorize(self.agent.delete(&url))
            .query("id", external_id)
            .call()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
