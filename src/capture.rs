use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::gateway::{Gateway, NOT_AUTHENTICATED, remote_error};
use crate::host::BrowserHost;
use crate::protocol::{JournalSubmissionResult, TradeDetails};

/// Fixed tag identifying this submission channel to the backend.
pub const SUBMISSION_SOURCE: &str = "extension";

const SUBMIT_FALLBACK: &str = "Failed to create journal entry";

const INGESTION_PATH: &str = "/journal/entries";

/// The capture → enrich → submit pipeline.
///
/// Three stages, each terminal on failure for the invocation: acquire the
/// visible surface, resolve the credential locally, submit the composed
/// request. No partial retry; callers re-invoke the whole pipeline.
pub struct CapturePipeline {
    gateway: Arc<Gateway>,
    host: Arc<dyn BrowserHost>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IngestionReceipt {
    journal_id: String,
    trade_id: String,
}

fn failed(error: Option<&str>) -> JournalSubmissionResult {
    JournalSubmissionResult {
        success: false,
        journal_id: None,
        trade_id: None,
        error: error.map(str::to_string),
    }
}

impl CapturePipeline {
    pub fn new(gateway: Arc<Gateway>, host: Arc<dyn BrowserHost>) -> Self {
        Self { gateway, host }
    }

    /// Stage 1: capture the visible surface as a base64 image payload.
    pub fn acquire(&self) -> anyhow::Result<String> {
        self.host.capture_visible_tab()
    }

    /// Stages 2–3: resolve the credential, then submit the composed capture.
    ///
    /// Credential absence terminates before any network call so the payload
    /// never leaks into an unauthenticated submission attempt.
    pub async fn submit(
        &self,
        screenshot: &str,
        details: &TradeDetails,
        timestamp: &str,
    ) -> JournalSubmissionResult {
        if self.gateway.require_token().is_err() {
            debug!("Journal submission short-circuited: no stored token");
            return failed(Some(NOT_AUTHENTICATED));
        }

        let payload = json!({
            "screenshot": screenshot,
            "tradeDetails": details,
            "timestamp": timestamp,
            "source": SUBMISSION_SOURCE,
        });
        let idempotency_key = Uuid::new_v4().to_string();

        let resp = match self
            .gateway
            .authorized_post(INGESTION_PATH, &payload, Some(&idempotency_key))
            .await
        {
            Ok(resp) => resp,
            Err(e) if e.to_string() == NOT_AUTHENTICATED => {
                return failed(Some(NOT_AUTHENTICATED));
            }
            Err(e) => {
                warn!("Journal submission transport failure: {}", e);
                return failed(Some(SUBMIT_FALLBACK));
            }
        };

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return failed(Some(&remote_error(&body, SUBMIT_FALLBACK)));
        }

        match serde_json::from_str::<IngestionReceipt>(&body) {
            Ok(receipt) => JournalSubmissionResult {
                success: true,
                journal_id: Some(receipt.journal_id),
                trade_id: Some(receipt.trade_id),
                error: None,
            },
            Err(e) => {
                warn!("Ingestion endpoint returned 2xx with malformed body: {}", e);
                failed(Some(SUBMIT_FALLBACK))
            }
        }
    }

    /// Full pipeline: acquire, resolve, submit. A stage-1 failure (capture
    /// denied, no visible surface) reports bare `success: false`.
    pub async fn run(&self, details: &TradeDetails, timestamp: &str) -> JournalSubmissionResult {
        let screenshot = match self.acquire() {
            Ok(shot) => shot,
            Err(e) => {
                warn!("Capture stage failed: {}", e);
                return failed(None);
            }
        };
        self.submit(&screenshot, details, timestamp).await
    }
}
