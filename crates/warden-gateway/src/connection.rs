use std::collections::HashSet;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use warden_types::api::Claims;
use warden_types::events::{GatewayCommand, GatewayEvent};

use crate::dispatcher::Dispatcher;

/// How long a client has to send Identify before the socket is dropped.
const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Heartbeat interval: server sends a Ping every 30 seconds.
/// If 2 consecutive Pongs are missed, the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Handle a single subscriber connection (typically the bot runtime).
///
/// Protocol: the client identifies with a JWT, optionally narrows delivery
/// with Subscribe, and then receives one event per committed mutation. Events
/// that fired while the client was disconnected are gone; the client is
/// expected to resynchronize through the REST surface after reconnecting.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher, jwt_secret: String) {
    let (mut sender, mut receiver) = socket.split();

    let subject = match wait_for_identify(&mut receiver, &jwt_secret).await {
        Some(subject) => subject,
        None => {
            warn!("Gateway client failed to identify, closing");
            return;
        }
    };

    info!("{} connected to gateway", subject);

    let ready = GatewayEvent::Ready {
        subject: subject.clone(),
    };
    if send_event(&mut sender, &ready).await.is_err() {
        return;
    }

    // Guilds this connection cares about; empty set means everything.
    let mut subscribed: HashSet<String> = HashSet::new();

    let mut broadcast_rx = dispatcher.subscribe();
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;
    let mut missed_heartbeats: u8 = 0;
    let mut pong_received = true;

    loop {
        tokio::select! {
            result = broadcast_rx.recv() => {
                let event = match result {
                    Ok(event) => event,
                    Err(RecvError::Lagged(n)) => {
                        // The subscriber fell behind; skipped events are not
                        // replayed, it must resync via REST.
                        warn!("{} lagged by {} events", subject, n);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                if let Some(guild_id) = event.guild_id()
                    && !subscribed.is_empty()
                    && !subscribed.contains(guild_id)
                {
                    continue;
                }

                if send_event(&mut sender, &event).await.is_err() {
                    break;
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<GatewayCommand>(&text) {
                            Ok(GatewayCommand::Subscribe { guild_ids }) => {
                                subscribed = guild_ids.into_iter().collect();
                            }
                            Ok(GatewayCommand::Identify { .. }) => {
                                // Already identified; ignore.
                            }
                            Err(e) => warn!("{} sent unparseable command: {}", subject, e),
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        pong_received = true;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("{} socket error: {}", subject, e);
                        break;
                    }
                }
            }
            _ = heartbeat.tick() => {
                if pong_received {
                    missed_heartbeats = 0;
                } else {
                    missed_heartbeats += 1;
                    if missed_heartbeats >= 2 {
                        warn!("{} heartbeat timeout, dropping connection", subject);
                        break;
                    }
                }
                pong_received = false;
                if sender.send(Message::Ping(vec![].into())).await.is_err() {
                    break;
                }
            }
        }
    }

    info!("{} disconnected from gateway", subject);
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &GatewayEvent,
) -> Result<(), ()> {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to serialize gateway event: {}", e);
            return Ok(());
        }
    };
    sender.send(Message::Text(text.into())).await.map_err(|_| ())
}

/// Reads messages until an Identify command with a valid JWT arrives, or the
/// timeout elapses. Returns the token subject.
async fn wait_for_identify(
    receiver: &mut SplitStream<WebSocket>,
    jwt_secret: &str,
) -> Option<String> {
    let identify = tokio::time::timeout(IDENTIFY_TIMEOUT, async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg
                && let Ok(GatewayCommand::Identify { token }) =
                    serde_json::from_str::<GatewayCommand>(&text)
            {
                return Some(token);
            }
        }
        None
    })
    .await
    .ok()??;

    let token_data = decode::<Claims>(
        &identify,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;

    Some(token_data.claims.sub)
}
