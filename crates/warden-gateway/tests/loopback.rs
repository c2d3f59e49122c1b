//! Drives a real gateway connection over loopback TCP: an axum server
//! upgrades the socket into `handle_connection`, and a tungstenite client
//! plays the subscriber role.

use std::time::Duration;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{EncodingKey, Header, encode};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use warden_gateway::connection;
use warden_gateway::dispatcher::Dispatcher;
use warden_types::api::Claims;
use warden_types::events::{GatewayCommand, GatewayEvent};

const SECRET: &str = "loopback-secret";

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Clone)]
struct GatewayState {
    dispatcher: Dispatcher,
    jwt_secret: String,
}

async fn ws_upgrade(State(state): State<GatewayState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.dispatcher.clone(), state.jwt_secret.clone())
    })
}

/// Binds an ephemeral port, serves the gateway route on it, and returns the
/// client URL.
async fn spawn_gateway(dispatcher: Dispatcher) -> String {
    let app = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(GatewayState {
            dispatcher,
            jwt_secret: SECRET.to_string(),
        });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{addr}/gateway")
}

fn mint_token(secret: &str) -> String {
    let claims = Claims {
        sub: "bot".to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

async fn send_command(ws: &mut WsClient, command: &GatewayCommand) {
    let text = serde_json::to_string(command).unwrap();
    ws.send(Message::Text(text.into())).await.unwrap();
}

async fn next_event(ws: &mut WsClient) -> GatewayEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(msg) = ws.next().await {
            if let Ok(Message::Text(text)) = msg {
                return serde_json::from_str(&text).unwrap();
            }
        }
        panic!("socket closed before an event arrived");
    })
    .await
    .expect("timed out waiting for an event")
}

#[tokio::test]
async fn identify_with_bad_token_closes_without_ready() {
    let url = spawn_gateway(Dispatcher::new()).await;
    let (mut ws, _) = connect_async(&url).await.unwrap();

    send_command(
        &mut ws,
        &GatewayCommand::Identify {
            token: mint_token("some-other-secret"),
        },
    )
    .await;

    let received = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Text(text)) => return Some(text.to_string()),
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => {}
            }
        }
        None
    })
    .await
    .expect("server did not close the socket");

    assert!(received.is_none(), "got a frame after bad token: {received:?}");
}

#[tokio::test]
async fn identify_then_ready() {
    let url = spawn_gateway(Dispatcher::new()).await;
    let (mut ws, _) = connect_async(&url).await.unwrap();

    send_command(
        &mut ws,
        &GatewayCommand::Identify {
            token: mint_token(SECRET),
        },
    )
    .await;

    match next_event(&mut ws).await {
        GatewayEvent::Ready { subject } => assert_eq!(subject, "bot"),
        other => panic!("expected Ready, got {other:?}"),
    }
}

#[tokio::test]
async fn subscribe_narrows_delivery_to_listed_guilds() {
    let dispatcher = Dispatcher::new();
    let url = spawn_gateway(dispatcher.clone()).await;
    let (mut ws, _) = connect_async(&url).await.unwrap();

    send_command(
        &mut ws,
        &GatewayCommand::Identify {
            token: mint_token(SECRET),
        },
    )
    .await;
    assert!(matches!(
        next_event(&mut ws).await,
        GatewayEvent::Ready { .. }
    ));

    send_command(
        &mut ws,
        &GatewayCommand::Subscribe {
            guild_ids: vec!["g2".to_string()],
        },
    )
    .await;
    // Give the connection task a moment to apply the subscription before
    // events start flowing.
    tokio::time::sleep(Duration::from_millis(200)).await;

    dispatcher.publish(GatewayEvent::GuildDelete {
        guild_id: "g1".to_string(),
    });
    dispatcher.publish(GatewayEvent::GuildDelete {
        guild_id: "g2".to_string(),
    });

    let event = next_event(&mut ws).await;
    assert_eq!(event.guild_id(), Some("g2"), "filtered guild leaked through");
}
