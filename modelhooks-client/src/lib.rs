//! # Modelhooks Client
//!
//! HTTP client for the manager sync service, usable as the
//! `ManagerNotifier` of a model's manager integration.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use modelhooks_types::{ManagerNotifier, NotifyError};
use reqwest::Client;
use serde::Serialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC-SHA256 of the request body.
pub const SIGNATURE_HEADER: &str = "X-Manager-Signature";

/// Path of the sync endpoint on the manager service.
pub const SYNC_PATH: &str = "/api/sync";

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Signing error: {0}")]
    Signing(String),
}

impl From<ClientError> for NotifyError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api { status, message } => NotifyError::Rejected { status, message },
            other => NotifyError::Transport(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncRequest<'a> {
    owner_id: &'a str,
}

/// Signs `payload` with HMAC-SHA256, hex encoded.
pub fn sign_payload(payload: &[u8], secret: &str) -> Result<String, ClientError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ClientError::Signing(e.to_string()))?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Manager service client.
pub struct ManagerClient {
    base_url: String,
    token: Option<String>,
    secret: Option<String>,
    http: Client,
}

impl ManagerClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            secret: None,
            http: Client::new(),
        }
    }

    /// Sends `Authorization: Bearer <token>` with every call.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Signs every body with `secret`.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Tells the manager that data owned by `owner_id` changed.
    pub async fn sync(&self, owner_id: &str) -> Result<(), ClientError> {
        let body = serde_json::to_vec(&SyncRequest { owner_id })?;

        let mut req = self
            .http
            .post(format!("{}{}", self.base_url, SYNC_PATH))
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        if let Some(secret) = &self.secret {
            req = req.header(SIGNATURE_HEADER, sign_payload(&body, secret)?);
        }

        let resp = req.body(body).send().await?;
        self.handle_response(resp).await
    }

    async fn handle_response(&self, resp: reqwest::Response) -> Result<(), ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or(body);
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ManagerNotifier for ManagerClient {
    async fn send_data(&self, owner_id: &str) -> Result<(), NotifyError> {
        tracing::debug!(%owner_id, base_url = %self.base_url, "syncing with manager");
        self.sync(owner_id).await.map_err(NotifyError::from)
    }
}
