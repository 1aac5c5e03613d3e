//! REST key-value store client.
//!
//! # Protocol
//! ```text
//! GET {endpoint}/{namespace}/{group}/{key}  → 200 JSON body | 404
//! PUT {endpoint}/{namespace}/{group}/{key}  ← JSON body
//! ```
//!
//! Deadlines are applied by the caller (`read_bounded`); reqwest timeouts that
//! still surface here are reported as transient `StoreError::Timeout`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde_json::Value;
use url::Url;

use crate::config::schema::StoreConfig;
use crate::observability::metrics;
use crate::store::{runtime_handle, validate_key, KvStore, StoreError, StoreResult};

/// Writes that never complete are abandoned after this long.
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for a remote key-value service.
#[derive(Clone)]
pub struct HttpStore {
    client: Client,
    base: Url,
    auth_token: Option<String>,
}

impl HttpStore {
    /// Create a client for the endpoint, namespace and group in `config`.
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        let endpoint = config.endpoint.trim_end_matches('/');
        let base = Url::parse(&format!("{}/{}/{}/", endpoint, config.namespace, config.group)).map_err(|e| {
            StoreError::Unavailable(format!("invalid store endpoint '{}': {}", config.endpoint, e))
        })?;

        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.read_timeout_ms.max(1)))
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base,
            auth_token: config.auth_token.clone(),
        })
    }

    fn key_url(&self, key: &str) -> StoreResult<Url> {
        validate_key(key)?;
        self.base
            .join(key)
            .map_err(|_| StoreError::InvalidKey(key.to_string()))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn transport_error(e: reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::Timeout
    } else {
        StoreError::Transport(e.to_string())
    }
}

#[async_trait]
impl KvStore for HttpStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let url = self.key_url(key)?;
        let response = self
            .authorized(self.client.get(url))
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let text = response.text().await.map_err(transport_error)?;
                serde_json::from_str(&text)
                    .map(Some)
                    .map_err(|e| StoreError::Decode(e.to_string()))
            }
            status => Err(StoreError::Status(status.as_u16())),
        }
    }

    fn put_no_wait(&self, key: &str, value: Value) -> StoreResult<()> {
        let url = self.key_url(key)?;
        let body = serde_json::to_vec(&value).map_err(|e| StoreError::Encode(e.to_string()))?;
        let handle = runtime_handle()?;

        let request = self
            .authorized(self.client.put(url))
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(WRITE_TIMEOUT)
            .body(body);
        let key = key.to_string();

        handle.spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(key = %key, "Store write acknowledged");
                    metrics::record_store_write_result("ok");
                }
                Ok(response) => {
                    tracing::warn!(key = %key, status = %response.status(), "Store write rejected");
                    metrics::record_store_write_result("status");
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Store write failed");
                    metrics::record_store_write_result("transport");
                }
            }
        });
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}
