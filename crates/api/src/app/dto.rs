use axum::Json;
use axum::extract::rejection::JsonRejection;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use conduit_authn::{Key, KeyType};
use conduit_core::{Error, Metadata};
use conduit_things::PageMetadata;

use crate::app::errors;

/// Default listing window when the query does not set one.
pub const DEFAULT_LIMIT: u64 = 10;

/// Unwrap a JSON body, answering 400 with the usual error body when it does
/// not decode.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| errors::error_response(Error::malformed(e.body_text())))
}

// -------------------------
// Identity
// -------------------------

#[derive(Debug, Deserialize)]
pub struct IssueKeyRequest {
    #[serde(rename = "type")]
    pub key_type: KeyType,
    /// Lifetime in seconds. Absent means the key never expires.
    #[serde(default)]
    pub duration: Option<u64>,
}

impl IssueKeyRequest {
    /// Only API keys are issued over the public surface; user and recovery
    /// keys come from trusted internal flows through `/rpc/issue`.
    pub fn into_template(self) -> Result<Key, Error> {
        if self.key_type != KeyType::Api {
            return Err(Error::malformed("only api keys can be issued here"));
        }

        let key = Key::new(KeyType::Api);
        let Some(secs) = self.duration else {
            return Ok(key);
        };

        let expires_at = i64::try_from(secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|d| Utc::now().checked_add_signed(d))
            .ok_or_else(|| Error::malformed("key duration out of range"))?;
        Ok(key.with_expiry(expires_at))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcIssueRequest {
    pub issuer: String,
    #[serde(rename = "type")]
    pub key_type: KeyType,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IdentifyRequest {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityResponse {
    pub id: String,
}

// -------------------------
// Registry
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct UpdateEntityRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Deserialize)]
pub struct UpdateKeyRequest {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    pub project_ids: Vec<String>,
    pub thing_ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessByKeyRequest {
    pub project_id: String,
    pub key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessByIdRequest {
    pub project_id: String,
    pub thing_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ThingIdentifyRequest {
    pub key: String,
}

/// `?offset=&limit=&name=&metadata=` on listing routes. `metadata` is a JSON
/// object the listed entities must contain.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub name: Option<String>,
    pub metadata: Option<String>,
}

impl ListQuery {
    pub fn page(self) -> Result<PageMetadata, Error> {
        let mut page = PageMetadata::window(
            self.offset.unwrap_or(0),
            self.limit.unwrap_or(DEFAULT_LIMIT),
        );
        if let Some(name) = self.name.filter(|n| !n.is_empty()) {
            page = page.with_name(name);
        }
        if let Some(raw) = self.metadata.filter(|m| !m.is_empty()) {
            let metadata: Metadata = serde_json::from_str(&raw)
                .map_err(|_| Error::malformed("metadata filter is not a JSON object"))?;
            page = page.with_metadata(metadata);
        }
        Ok(page)
    }
}

// -------------------------
// Errors
// -------------------------

/// Error body as written by [`errors::json_error`].
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default)]
    pub message: String,
}
