use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::gateway::{Gateway, NOT_AUTHENTICATED, remote_error};
use crate::protocol::{ChatTurn, Strategy};

const STRATEGIES_FALLBACK: &str = "Failed to load strategies";
const CHAT_FALLBACK: &str = "Failed to send chat message";

#[derive(Deserialize)]
struct StrategiesBody {
    strategies: Vec<Strategy>,
}

/// Fetch the caller's strategies from the backend.
///
/// Errors carry a user-facing message only: the missing-credential case keeps
/// its specific text, everything else collapses to a generic one.
pub async fn fetch_strategies(gateway: &Gateway) -> Result<Vec<Strategy>> {
    let resp = match gateway.authorized_get("/strategies").await {
        Ok(resp) => resp,
        Err(e) if e.to_string() == NOT_AUTHENTICATED => return Err(e),
        Err(e) => {
            debug!("Strategies request failed: {}", e);
            return Err(anyhow!(STRATEGIES_FALLBACK));
        }
    };

    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(anyhow!(remote_error(&body, STRATEGIES_FALLBACK)));
    }

    let parsed: StrategiesBody =
        serde_json::from_str(&body).map_err(|_| anyhow!(STRATEGIES_FALLBACK))?;
    Ok(parsed.strategies)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    strategy_context: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversation_history: Option<&'a [ChatTurn]>,
}

/// Assistant reply from the chat endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub message: String,
    #[serde(default)]
    pub suggested_actions: Option<Vec<String>>,
    #[serde(default)]
    pub related_rules: Option<Vec<String>>,
}

/// Send one chat message, with optional strategy context and history.
pub async fn send_chat(
    gateway: &Gateway,
    message: &str,
    strategy_context: Option<&str>,
    history: Option<&[ChatTurn]>,
) -> Result<ChatReply> {
    let request = ChatRequest {
        message,
        strategy_context,
        conversation_history: history,
    };

    let resp = match gateway.authorized_post("/chat", &request, None).await {
        Ok(resp) => resp,
        Err(e) if e.to_string() == NOT_AUTHENTICATED => return Err(e),
        Err(e) => {
            debug!("Chat request failed: {}", e);
            return Err(anyhow!(CHAT_FALLBACK));
        }
    };

    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(anyhow!(remote_error(&body, CHAT_FALLBACK)));
    }

    serde_json::from_str(&body).map_err(|_| anyhow!(CHAT_FALLBACK))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTokenStore;
    use crate::testutil::{capturing_http_server, mock_http_server};
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    fn gateway(addr: std::net::SocketAddr, token: Option<&str>) -> Gateway {
        let store: Arc<dyn crate::store::TokenStore> = match token {
            Some(t) => Arc::new(MemoryTokenStore::with_token(t)),
            None => Arc::new(MemoryTokenStore::new()),
        };
        Gateway::new(&format!("http://{}", addr), store)
    }

    #[tokio::test]
    async fn fetch_strategies_parses_list() {
        let body = r#"{"strategies":[{"id":"s1","name":"Breakout"},{"id":"s2","name":"Reversal","description":"fade extremes"}]}"#;
        let (addr, _) = mock_http_server(body, 200).await;
        let strategies = fetch_strategies(&gateway(addr, Some("tok"))).await.unwrap();
        assert_eq!(strategies.len(), 2);
        assert_eq!(strategies[0].id, "s1");
        assert_eq!(strategies[1].description.as_deref(), Some("fade extremes"));
    }

    #[tokio::test]
    async fn fetch_strategies_without_token_never_calls_backend() {
        let (addr, hits) = mock_http_server(r#"{"strategies":[]}"#, 200).await;
        let err = fetch_strategies(&gateway(addr, None)).await.unwrap_err();
        assert_eq!(err.to_string(), NOT_AUTHENTICATED);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_strategies_surfaces_structured_error() {
        let (addr, _) = mock_http_server(r#"{"error":"Plan expired"}"#, 400).await;
        let err = fetch_strategies(&gateway(addr, Some("tok"))).await.unwrap_err();
        assert_eq!(err.to_string(), "Plan expired");
    }

    #[tokio::test]
    async fn fetch_strategies_generic_on_unparsable_body() {
        let (addr, _) = mock_http_server("<html>", 500).await;
        let err = fetch_strategies(&gateway(addr, Some("tok"))).await.unwrap_err();
        assert_eq!(err.to_string(), STRATEGIES_FALLBACK);
    }

    #[tokio::test]
    async fn send_chat_round_trip() {
        let body = r#"{"message":"Try a tighter stop.","suggestedActions":["review-risk"],"relatedRules":["max-2-percent"]}"#;
        let (addr, requests) = capturing_http_server(body, 200).await;
        let history = [ChatTurn {
            role: "user".to_string(),
            content: "how did I do?".to_string(),
        }];
        let reply = send_chat(
            &gateway(addr, Some("tok")),
            "rate my entry",
            Some("s1"),
            Some(&history),
        )
        .await
        .unwrap();
        assert_eq!(reply.message, "Try a tighter stop.");
        assert_eq!(reply.suggested_actions.unwrap(), vec!["review-risk"]);
        assert_eq!(reply.related_rules.unwrap(), vec!["max-2-percent"]);

        let raw = requests.lock().unwrap()[0].clone();
        assert!(raw.contains(r#""strategyContext":"s1""#));
        assert!(raw.contains(r#""conversationHistory""#));
    }

    #[tokio::test]
    async fn send_chat_omits_absent_optionals() {
        let body = r#"{"message":"ok"}"#;
        let (addr, requests) = capturing_http_server(body, 200).await;
        let reply = send_chat(&gateway(addr, Some("tok")), "hello", None, None)
            .await
            .unwrap();
        assert_eq!(reply.message, "ok");
        assert_eq!(reply.suggested_actions, None);

        let raw = requests.lock().unwrap()[0].clone();
        assert!(!raw.contains("strategyContext"));
        assert!(!raw.contains("conversationHistory"));
    }

    #[tokio::test]
    async fn send_chat_generic_on_remote_rejection() {
        let (addr, _) = mock_http_server("boom", 500).await;
        let err = send_chat(&gateway(addr, Some("tok")), "hi", None, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), CHAT_FALLBACK);
    }
}
