use std::sync::Arc;
use tracing::debug;

use crate::api;
use crate::capture::CapturePipeline;
use crate::config::BridgeConfig;
use crate::gateway::Gateway;
use crate::host::BrowserHost;
use crate::protocol::{Request, Response};
use crate::session::AuthFlow;
use crate::store::TokenStore;
use crate::verify::VerificationClient;

/// The mediator: the single entry point bridging UI surfaces, the token
/// store, and the remote endpoints.
///
/// `dispatch` maps each request type to exactly one handler. Handlers return
/// response-shaped values for every failure mode, so the response sink is
/// resolved exactly once by construction and no error escapes the router.
/// Handlers share no in-flight state; concurrent requests are independent.
pub struct Mediator {
    config: BridgeConfig,
    store: Arc<dyn TokenStore>,
    host: Arc<dyn BrowserHost>,
    verifier: VerificationClient,
    gateway: Arc<Gateway>,
    pipeline: CapturePipeline,
    auth: AuthFlow,
}

impl Mediator {
    pub fn new(config: BridgeConfig, store: Arc<dyn TokenStore>, host: Arc<dyn BrowserHost>) -> Self {
        let verifier = VerificationClient::new(&config.verify_url());
        let gateway = Arc::new(Gateway::new(&config.api_base_url, store.clone()));
        let pipeline = CapturePipeline::new(gateway.clone(), host.clone());
        Self {
            config,
            store,
            host,
            verifier,
            gateway,
            pipeline,
            auth: AuthFlow::new(),
        }
    }

    pub async fn dispatch(&self, request: Request) -> Response {
        debug!("Dispatching {}", request.kind());
        match request {
            Request::CheckAuth => self.check_auth().await,
            Request::CaptureScreenshot => self.capture_screenshot(),
            Request::CreateJournalEntry {
                screenshot,
                trade_details,
                timestamp,
            } => Response::CreateJournalEntry(
                self.pipeline
                    .submit(&screenshot, &trade_details, &timestamp)
                    .await,
            ),
            Request::GetStrategies => self.get_strategies().await,
            Request::SendChatMessage {
                message,
                strategy_context,
                conversation_history,
            } => {
                self.send_chat_message(message, strategy_context, conversation_history)
                    .await
            }
            Request::OpenAuthFlow => self.open_auth_flow(),
            Request::OpenSidePanel => self.open_side_panel(),
            Request::AuthCompleteNotification { success } => {
                self.auth.handle_completion(success);
                Response::AuthCompleteNotification { received: true }
            }
        }
    }

    /// Re-derives the session on every call; nothing is cached, so external
    /// revocation shows up on the next check.
    async fn check_auth(&self) -> Response {
        let session = self
            .auth
            .derive_session(self.store.as_ref(), &self.verifier)
            .await;
        Response::CheckAuth {
            is_authenticated: session.is_authenticated,
            user: session.user,
        }
    }

    fn capture_screenshot(&self) -> Response {
        match self.pipeline.acquire() {
            Ok(screenshot) => Response::CaptureScreenshot {
                screenshot,
                success: true,
            },
            Err(e) => {
                debug!("Screenshot capture failed: {}", e);
                Response::CaptureScreenshot {
                    screenshot: String::new(),
                    success: false,
                }
            }
        }
    }

    async fn get_strategies(&self) -> Response {
        match api::fetch_strategies(&self.gateway).await {
            Ok(strategies) => Response::GetStrategies {
                strategies,
                success: true,
                error: None,
            },
            Err(e) => Response::GetStrategies {
                strategies: Vec::new(),
                success: false,
                error: Some(e.to_string()),
            },
        }
    }

    async fn send_chat_message(
        &self,
        message: String,
        strategy_context: Option<String>,
        history: Option<Vec<crate::protocol::ChatTurn>>,
    ) -> Response {
        match api::send_chat(
            &self.gateway,
            &message,
            strategy_context.as_deref(),
            history.as_deref(),
        )
        .await
        {
            Ok(reply) => Response::SendChatMessage {
                message: reply.message,
                success: true,
                suggested_actions: reply.suggested_actions,
                related_rules: reply.related_rules,
            },
            Err(e) => Response::SendChatMessage {
                message: e.to_string(),
                success: false,
                suggested_actions: None,
                related_rules: None,
            },
        }
    }

    fn open_auth_flow(&self) -> Response {
        match self
            .auth
            .begin_sign_in(self.host.as_ref(), &self.config.login_url)
        {
            Ok(()) => Response::OpenAuthFlow {
                success: true,
                auth_url: Some(self.config.login_url.clone()),
            },
            Err(e) => {
                debug!("Failed to open sign-in context: {}", e);
                Response::OpenAuthFlow {
                    success: false,
                    auth_url: None,
                }
            }
        }
    }

    fn open_side_panel(&self) -> Response {
        match self.host.open_side_panel() {
            Ok(()) => Response::OpenSidePanel {
                success: true,
                error: None,
            },
            // Capability failure: success false, no further detail.
            Err(_) => Response::OpenSidePanel {
                success: false,
                error: None,
            },
        }
    }
}
