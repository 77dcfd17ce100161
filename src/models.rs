//! Wire types for the Ragtify backend API.
//!
//! These types mirror the request and response bodies of the `/api/v1`
//! endpoints. Payload bodies are free-form on the backend side, so the three
//! well-known fields are typed and everything else is preserved untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Settings key holding the model name used for generation and embeddings.
pub const SETTING_MODEL: &str = "llama_model";
/// Settings key holding the collection queried when none is specified.
pub const SETTING_COLLECTION: &str = "default_collection_name";

/// Outbound body of `POST /content/chat`. Built fresh per submission and
/// immutable once sent.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
}

/// One decoded line of the chat NDJSON stream.
///
/// The backend emits `{"response": "<token>"}` lines; any other fields are
/// ignored. A record without `response` is valid and simply carries no text.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamRecord {
    #[serde(default)]
    pub response: Option<String>,
}

/// The well-known payload fields, with everything else carried through.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// A payload record as returned by `GET /content/`.
#[derive(Debug, Clone, Deserialize)]
pub struct PayloadRecord {
    pub id: i64,
    #[serde(default)]
    pub source_id: Option<String>,
    pub collection_name: String,
    pub payload: PayloadFields,
}

/// Body of `POST /content/`.
#[derive(Debug, Clone, Serialize)]
pub struct PayloadCreateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    pub collection_name: String,
    pub payload: PayloadFields,
}

/// Response of `POST /content/`.
#[derive(Debug, Clone, Deserialize)]
pub struct PayloadCreateResponse {
    pub status: String,
    pub id: i64,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub collection_name: Option<String>,
}

/// Response of `DELETE /content/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PayloadDeleteResponse {
    pub status: String,
    pub id: i64,
}

/// Response of `POST /content/process`. When the buffer is empty the backend
/// answers with a bare status and no counts.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessResponse {
    pub status: String,
    #[serde(default)]
    pub content_processed: u64,
    #[serde(default)]
    pub collections: Vec<String>,
}

/// Flat key/value map of backend runtime settings. Values may be unset.
pub type SettingsMap = BTreeMap<String, Option<String>>;

/// Envelope wrapping the settings map on both `GET` and `PUT /settings/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsEnvelope {
    pub settings: SettingsMap,
}

/// Response of `PUT /settings/`.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsUpdateResponse {
    pub status: String,
    #[serde(default)]
    pub updated: Vec<String>,
}

/// Body of `POST /content/search`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Response of `POST /content/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

/// One scored hit from the vector store. The payload carries the indexed
/// fields plus whatever else was stored alongside them.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub id: i64,
    pub score: f64,
    #[serde(default)]
    pub payload: Value,
}
