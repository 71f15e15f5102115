use anyhow::{Result, anyhow};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::protocol::{Inbound, Outbound};
use crate::router::Mediator;

/// Accept UI-surface connections on loopback and bridge frames to the
/// mediator. Each request runs in its own task; responses are matched back
/// to their request by envelope id and may complete out of order.
pub async fn run(mediator: Arc<Mediator>, port: u16) -> Result<()> {
    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .map_err(|e| anyhow!("Failed to bind surface server on port {}: {}", port, e))?;
    info!("Surface server listening on 127.0.0.1:{}", port);

    loop {
        let (stream, peer) = listener.accept().await?;
        let mediator = mediator.clone();
        tokio::spawn(async move {
            debug!("Surface connected from {}", peer);
            if let Err(e) = handle_connection(mediator, stream).await {
                debug!("Surface {} closed: {}", peer, e);
            }
        });
    }
}

async fn handle_connection(mediator: Arc<Mediator>, stream: TcpStream) -> Result<()> {
    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| anyhow!("WebSocket handshake failed: {}", e))?;
    let (mut write, mut read) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

    // Writer task: single owner of the sink, fed by all in-flight handlers.
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            match serde_json::to_string(&outbound) {
                Ok(json) => {
                    if write.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Failed to serialize response: {}", e),
            }
        }
    });

    while let Some(message) = read.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let inbound: Inbound = match serde_json::from_str(&text) {
                    Ok(inbound) => inbound,
                    Err(e) => {
                        warn!("Dropping malformed frame: {}", e);
                        continue;
                    }
                };
                let mediator = mediator.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let response = mediator.dispatch(inbound.request).await;
                    let _ = tx.send(Outbound {
                        id: inbound.id,
                        response,
                    });
                });
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("WebSocket read error: {}", e);
                break;
            }
        }
    }

    drop(tx);
    let _ = writer.await;
    Ok(())
}
