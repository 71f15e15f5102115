use anyhow::{Result, anyhow};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::store::TokenStore;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const GET_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

pub const NOT_AUTHENTICATED: &str = "Not authenticated";

/// Shared helper for outbound authorized calls: reads the injected store,
/// attaches the bearer header, and applies the per-call deadline.
///
/// Every authorized call short-circuits locally with [`NOT_AUTHENTICATED`]
/// when no token is stored, so no payload leaks into an unauthenticated
/// submission attempt. Idempotent GETs retry a bounded number of times with
/// linear backoff on transport failure; POSTs are never retried here.
pub struct Gateway {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
}

impl Gateway {
    pub fn new(base_url: &str, store: Arc<dyn TokenStore>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
        }
    }

    /// Read the stored token, failing with [`NOT_AUTHENTICATED`] when absent.
    pub fn require_token(&self) -> Result<String> {
        self.store
            .load()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow!(NOT_AUTHENTICATED))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Authorized GET with bounded linear-backoff retry on transport failure.
    pub async fn authorized_get(&self, path: &str) -> Result<reqwest::Response> {
        let token = self.require_token()?;
        let url = self.url(path);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .http
                .get(&url)
                .header("Authorization", format!("Bearer {}", token))
                .send()
                .await
            {
                Ok(resp) => return Ok(resp),
                Err(e) if attempt < GET_ATTEMPTS => {
                    debug!("GET {} attempt {} failed: {}", path, attempt, e);
                    tokio::time::sleep(RETRY_BASE_DELAY * attempt).await;
                }
                Err(e) => return Err(anyhow!("Request to {} failed: {}", path, e)),
            }
        }
    }

    /// Authorized POST. Not retried; callers that must survive ambiguous
    /// failures attach an idempotency key instead.
    pub async fn authorized_post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        idempotency_key: Option<&str>,
    ) -> Result<reqwest::Response> {
        let token = self.require_token()?;

        let mut req = self
            .http
            .post(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
            .json(body);
        if let Some(key) = idempotency_key {
            req = req.header("x-idempotency-key", key);
        }

        req.send()
            .await
            .map_err(|e| anyhow!("Request to {} failed: {}", path, e))
    }
}

/// Pull a human-readable message out of a non-2xx response body.
/// Decodes a structured `{"error": "..."}` shape opportunistically, falling
/// back to the supplied generic message.
pub fn remote_error(body: &str, fallback: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if !parsed.error.is_empty() => parsed.error,
        _ => fallback.to_string(),
    }
}
