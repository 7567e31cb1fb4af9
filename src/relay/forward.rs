//! Upstream forwarding: one POST per eligible message, fire-once.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{ConfigError, ForwardError};

/// Channel identifier sent as `source`.
pub const SOURCE: &str = "telegram";

/// `user` value when the sender identity is unavailable.
pub const FALLBACK_USER: &str = "telegram";

/// Body of `POST {API_BASE}/receipts/upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForwardRequest {
    pub qr: String,
    pub user: String,
    pub source: &'static str,
}

impl ForwardRequest {
    pub fn new(payload: &str, sender_id: Option<&str>) -> Self {
        Self {
            qr: payload.to_string(),
            user: sender_id.unwrap_or(FALLBACK_USER).to_string(),
            source: SOURCE,
        }
    }
}

/// Upstream response body, echoed back to the user as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ForwardResult(serde_json::Value);

impl ForwardResult {
    /// The `{"status":"error"}` sentinel.
    pub fn error() -> Self {
        Self(serde_json::json!({ "status": "error" }))
    }

    pub fn from_value(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// The `status` field, when upstream returned one.
    pub fn status(&self) -> Option<&str> {
        self.0.get("status").and_then(serde_json::Value::as_str)
    }

    /// Compact JSON rendering, keys in upstream order.
    pub fn to_json_string(&self) -> String {
        self.0.to_string()
    }
}

/// The upstream receipt service.
#[async_trait]
pub trait ReceiptApi: Send + Sync {
    /// Upload one receipt payload.
    async fn upload(&self, request: &ForwardRequest) -> Result<ForwardResult, ForwardError>;
}

/// `ReceiptApi` over HTTP, sharing one pooled client.
pub struct HttpReceiptApi {
    client: reqwest::Client,
    upload_url: String,
    timeout: Duration,
}

impl HttpReceiptApi {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            upload_url: format!("{}/receipts/upload", api_base.trim_end_matches('/')),
            timeout,
        })
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    fn map_reqwest(&self, e: reqwest::Error) -> ForwardError {
        if e.is_timeout() {
            ForwardError::Timeout(self.timeout)
        } else {
            ForwardError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl ReceiptApi for HttpReceiptApi {
    async fn upload(&self, request: &ForwardRequest) -> Result<ForwardResult, ForwardError> {
        let resp = self
            .client
            .post(&self.upload_url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_reqwest(e))?;

        let status = resp.status();
        let is_json = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(is_json_content_type);
        let body = resp.bytes().await.map_err(|e| self.map_reqwest(e))?;

        // Error responses with a JSON body are echoed like successes
        let parsed = if is_json {
            serde_json::from_slice::<serde_json::Value>(&body).map_err(|e| e.to_string())
        } else {
            Err("response is not application/json".to_string())
        };

        let value = match (parsed, status.is_success()) {
            (Ok(value), true) => value,
            (Ok(value), false) => {
                tracing::warn!(status = status.as_u16(), "Receipt API returned an error status");
                value
            }
            (Err(reason), true) => return Err(ForwardError::InvalidBody(reason)),
            (Err(_), false) => {
                return Err(ForwardError::Status {
                    status: status.as_u16(),
                });
            }
        };

        Ok(ForwardResult::from_value(value))
    }
}

/// `application/json` or any `+json` media type, parameters ignored.
fn is_json_content_type(value: &str) -> bool {
    let mime = value.split(';').next().unwrap_or_default().trim();
    mime.eq_ignore_ascii_case("application/json")
        || mime.to_ascii_lowercase().ends_with("+json")
}

/// Forward `payload` on behalf of `sender_id`.
///
/// Never fails: any upstream problem is logged and replaced by
/// [`ForwardResult::error`]. No retries.
pub async fn forward(
    api: &dyn ReceiptApi,
    payload: &str,
    sender_id: Option<&str>,
) -> ForwardResult {
    let request = ForwardRequest::new(payload, sender_id);

    match api.upload(&request).await {
        Ok(result) => {
            tracing::debug!(user = %request.user, status = ?result.status(), "Receipt forwarded");
            result
        }
        Err(e) => {
            tracing::warn!(user = %request.user, error = %e, "Receipt forward failed");
            ForwardResult::error()
        }
    }
}
