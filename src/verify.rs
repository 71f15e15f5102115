use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Normalized result of a token verification. Fail-closed: any transport
/// failure, non-2xx status, or body without `authenticated: true` yields
/// `authenticated: false`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verification {
    pub authenticated: bool,
    pub user_id: Option<String>,
    pub email: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyBody {
    #[serde(default)]
    authenticated: bool,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// Client for the remote verify-token endpoint. The token travels as a query
/// parameter over GET. No retry; callers that need one re-invoke.
pub struct VerificationClient {
    http: reqwest::Client,
    verify_url: String,
}

impl VerificationClient {
    pub fn new(verify_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(VERIFY_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            verify_url: verify_url.to_string(),
        }
    }

    pub async fn verify(&self, token: &str) -> Verification {
        let url = format!("{}?token={}", self.verify_url, urlencoding::encode(token));

        let resp = match self.http.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                debug!("Token verification transport failure: {}", e);
                return Verification::default();
            }
        };

        if !resp.status().is_success() {
            debug!("Token verification rejected: {}", resp.status());
            return Verification::default();
        }

        let body: VerifyBody = match resp.json().await {
            Ok(body) => body,
            Err(e) => {
                debug!("Token verification body unreadable: {}", e);
                return Verification::default();
            }
        };

        if !body.authenticated {
            return Verification::default();
        }

        Verification {
            authenticated: true,
            user_id: body.user_id,
            email: body.email,
        }
    }
}
