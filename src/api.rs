//! HTTP client for the Ragtify backend API.
//!
//! A thin typed wrapper over the `/api/v1` endpoints. Unary endpoints decode
//! their JSON bodies here; [`ApiClient::open_chat_stream`] hands the raw
//! streaming response to the chat session, which consumes it incrementally.

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::ChatError;
use crate::models::{
    ChatRequest, PayloadCreateRequest, PayloadCreateResponse, PayloadDeleteResponse,
    PayloadRecord, ProcessResponse, SearchRequest, SearchResponse, SettingsEnvelope, SettingsMap,
    SettingsUpdateResponse,
};

/// Typed access to the backend REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client for `base_url` (the `/api/v1` root; a trailing slash
    /// is tolerated). `request_timeout` bounds unary calls only — chat
    /// streams run under the session's own deadline.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ============ Settings ============

    pub async fn fetch_settings(&self) -> Result<SettingsMap> {
        let resp = self
            .http
            .get(self.url("/settings/"))
            .send()
            .await
            .context("Failed to reach backend for settings")?;
        let envelope: SettingsEnvelope = read_json(resp, "fetch settings").await?;
        Ok(envelope.settings)
    }

    pub async fn update_settings(&self, settings: SettingsMap) -> Result<SettingsUpdateResponse> {
        let resp = self
            .http
            .put(self.url("/settings/"))
            .json(&SettingsEnvelope { settings })
            .send()
            .await
            .context("Failed to reach backend for settings update")?;
        read_json(resp, "update settings").await
    }

    // ============ Payloads ============

    pub async fn list_payloads(&self) -> Result<Vec<PayloadRecord>> {
        let resp = self
            .http
            .get(self.url("/content/"))
            .send()
            .await
            .context("Failed to reach backend for payload list")?;
        read_json(resp, "list payloads").await
    }

    pub async fn create_payload(
        &self,
        request: &PayloadCreateRequest,
    ) -> Result<PayloadCreateResponse> {
        let resp = self
            .http
            .post(self.url("/content/"))
            .json(request)
            .send()
            .await
            .context("Failed to reach backend for payload create")?;
        read_json(resp, "create payload").await
    }

    pub async fn delete_payload(&self, id: i64) -> Result<PayloadDeleteResponse> {
        let resp = self
            .http
            .delete(self.url(&format!("/content/{id}")))
            .send()
            .await
            .context("Failed to reach backend for payload delete")?;
        read_json(resp, "delete payload").await
    }

    /// Ask the backend to sync buffered payloads into the vector store.
    pub async fn process_payloads(&self, collection: Option<&str>) -> Result<ProcessResponse> {
        let mut builder = self.http.post(self.url("/content/process"));
        if let Some(collection) = collection {
            builder = builder.query(&[("collection_name", collection)]);
        }
        let resp = builder
            .send()
            .await
            .context("Failed to reach backend for payload processing")?;
        read_json(resp, "process payloads").await
    }

    pub async fn search_payloads(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let resp = self
            .http
            .post(self.url("/content/search"))
            .json(request)
            .send()
            .await
            .context("Failed to reach backend for search")?;
        read_json(resp, "search payloads").await
    }

    // ============ Chat ============

    /// Send a chat request and return the streaming response as soon as
    /// headers arrive. The status is not checked here — the session decides
    /// how to terminate on a non-success code without touching the body.
    ///
    /// `overall` is the session's wall-clock bound; the transport backstop
    /// sits slightly beyond it so deadline classification stays with the
    /// session.
    pub async fn open_chat_stream(
        &self,
        request: &ChatRequest,
        overall: Duration,
    ) -> Result<reqwest::Response, ChatError> {
        self.http
            .post(self.url("/content/chat"))
            .timeout(overall + Duration::from_secs(5))
            .json(request)
            .send()
            .await
            .map_err(|source| ChatError::Network { source })
    }
}

/// Decode a JSON body after checking the status, with the backend's own
/// error text preserved in the failure message.
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response, what: &str) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("Backend error {} during {}: {}", status, what, body);
    }
    resp.json::<T>()
        .await
        .with_context(|| format!("Invalid response body during {}", what))
}
