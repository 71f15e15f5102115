use anyhow::Result;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::host::BrowserHost;
use crate::protocol::UserInfo;
use crate::store::TokenStore;
use crate::verify::VerificationClient;

/// Phase of the external sign-in protocol. Verification is pull-based and
/// never cached, so `Verified`/`Invalid` reflect the most recent check only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Unauthenticated,
    AwaitingExternalSignIn,
    TokenReceived,
    Verified,
    Invalid,
}

/// Derived, in-memory authentication view. Recomputed per request; never
/// cached, so an externally revoked token is detected on the next call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub is_authenticated: bool,
    pub user: Option<UserInfo>,
}

impl AuthSession {
    fn anonymous() -> Self {
        Self {
            is_authenticated: false,
            user: None,
        }
    }
}

/// Tracks the sign-in flow across the extension/web-app trust boundary.
///
/// The two contexts cannot call each other directly, so sign-in is a
/// fire-and-forget open of the login URL followed by an asynchronous,
/// at-most-once completion signal. The signal is a liveness hint only: the
/// token itself is written to the store by the web-side collaborator, and
/// callers must poll check-auth as the fallback when the signal is lost.
pub struct AuthFlow {
    phase: Mutex<AuthPhase>,
    completed: AtomicBool,
    completion: Notify,
}

impl AuthFlow {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(AuthPhase::Unauthenticated),
            completed: AtomicBool::new(false),
            completion: Notify::new(),
        }
    }

    pub fn phase(&self) -> AuthPhase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_phase(&self, phase: AuthPhase) {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner()) = phase;
    }

    /// Open a browsing context at the login URL. Fire-and-forget: the flow
    /// does not block waiting for the external context to finish.
    pub fn begin_sign_in(&self, host: &dyn BrowserHost, login_url: &str) -> Result<()> {
        host.open_url(login_url)?;
        self.set_phase(AuthPhase::AwaitingExternalSignIn);
        debug!("Sign-in flow opened at {}", login_url);
        Ok(())
    }

    /// Consume the one-way completion signal from the external context.
    /// On success the phase advances and any waiter is woken; the token is
    /// NOT fetched here.
    pub fn handle_completion(&self, success: bool) {
        if success {
            self.set_phase(AuthPhase::TokenReceived);
            self.completed.store(true, Ordering::SeqCst);
            self.completion.notify_waiters();
        } else {
            warn!("External sign-in reported failure");
            self.set_phase(AuthPhase::Unauthenticated);
        }
    }

    /// Whether a completion signal has arrived since the last sign-in began.
    pub fn completion_seen(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    /// Wait for the next completion signal. Delivery of the signal is not
    /// guaranteed; pair this with a deadline and poll check-auth as fallback.
    pub async fn wait_for_completion(&self) {
        if self.completed.load(Ordering::SeqCst) {
            return;
        }
        self.completion.notified().await;
    }

    /// Derive the current session by re-reading the store and re-verifying.
    /// With no stored token the verification endpoint is never contacted.
    pub async fn derive_session(
        &self,
        store: &dyn TokenStore,
        verifier: &VerificationClient,
    ) -> AuthSession {
        let Some(token) = store.load() else {
            self.set_phase(AuthPhase::Unauthenticated);
            return AuthSession::anonymous();
        };

        let verification = verifier.verify(&token).await;
        if !verification.authenticated {
            self.set_phase(AuthPhase::Invalid);
            return AuthSession::anonymous();
        }

        self.set_phase(AuthPhase::Verified);
        AuthSession {
            is_authenticated: true,
            user: Some(UserInfo {
                id: verification.user_id.unwrap_or_default(),
                email: verification.email.unwrap_or_default(),
            }),
        }
    }
}

impl Default for AuthFlow {
    fn default() -> Self {
        Self::new()
    }
}
