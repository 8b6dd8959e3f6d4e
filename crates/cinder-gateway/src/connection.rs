use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::{info, warn};
use uuid::Uuid;

use cinder_types::api::Claims;
use cinder_types::events::{GatewayCommand, GatewayEvent};

use crate::dispatcher::Dispatcher;

/// The client must send Identify within this window or the socket is closed.
const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Server pings on this interval; two consecutive missed pongs (~30s) drop
/// the connection.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

fn encode(event: &GatewayEvent) -> Message {
    // GatewayEvent serialization is infallible by construction
    Message::Text(serde_json::to_string(event).unwrap().into())
}

/// Drive one WebSocket connection: Identify handshake, Ready, initial
/// presence roster, then pump targeted and broadcast events until either
/// side drops.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher, jwt_secret: String) {
    let (mut sink, mut stream) = socket.split();

    let Some(claims) = identify(&mut stream, &jwt_secret).await else {
        warn!("gateway client failed to identify, closing");
        return;
    };
    let (user_id, username) = (claims.sub, claims.username);
    info!("{} ({}) connected to gateway", username, user_id);

    let ready = GatewayEvent::Ready {
        user_id,
        username: username.clone(),
    };
    if sink.send(encode(&ready)).await.is_err() {
        return;
    }

    let ticket = dispatcher.open_session(user_id, &username).await;
    let conn_id = ticket.conn_id;
    let mut targeted = ticket.events;

    // The new client learns who was already here; everyone else learned
    // about this client from the open_session broadcast.
    for (peer_id, peer_name) in ticket.peers {
        let event = GatewayEvent::PresenceUpdate {
            user_id: peer_id,
            username: peer_name,
            online: true,
        };
        if sink.send(encode(&event)).await.is_err() {
            dispatcher.close_session(user_id, conn_id).await;
            return;
        }
    }

    let mut broadcasts = dispatcher.subscribe();
    let pong_seen = Arc::new(AtomicBool::new(true));
    let pong_seen_rx = pong_seen.clone();

    // Outbound pump: targeted events, broadcasts, and the heartbeat.
    let mut pump = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed: u8 = 0;

        loop {
            let message = tokio::select! {
                event = targeted.recv() => match event {
                    Some(event) => encode(&event),
                    None => break,
                },
                result = broadcasts.recv() => match result {
                    Ok(event) => encode(&event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!("broadcast receiver lagged by {} events", n);
                        continue;
                    }
                    Err(_) => break,
                },
                _ = heartbeat.tick() => {
                    if pong_seen.swap(false, Ordering::Acquire) {
                        missed = 0;
                    } else {
                        missed += 1;
                        if missed >= 2 {
                            warn!("heartbeat timeout ({} missed pongs), dropping connection", missed);
                            break;
                        }
                    }
                    Message::Ping(vec![].into())
                }
            };

            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    // Inbound loop, on this task. The only command a client sends is
    // Identify, already consumed — what's left is pongs and close frames.
    loop {
        tokio::select! {
            _ = &mut pump => break,
            frame = stream.next() => {
                let Some(Ok(msg)) = frame else { break };
                match msg {
                    Message::Pong(_) => {
                        pong_seen_rx.store(true, Ordering::Release);
                    }
                    Message::Text(text) => {
                        if serde_json::from_str::<GatewayCommand>(&text).is_err() {
                            warn!(
                                "{} ({}) sent an unrecognized command: {}",
                                username,
                                user_id,
                                &text[..text.len().min(200)]
                            );
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    }
    pump.abort();

    dispatcher.close_session(user_id, conn_id).await;
    info!("{} ({}) disconnected from gateway", username, user_id);
}

/// First text frame must be a valid Identify carrying a token this server's
/// secret verifies, within the handshake window.
async fn identify(stream: &mut SplitStream<WebSocket>, jwt_secret: &str) -> Option<Claims> {
    let first_text = tokio::time::timeout(IDENTIFY_TIMEOUT, async {
        while let Some(Ok(msg)) = stream.next().await {
            if let Message::Text(text) = msg {
                return Some(text);
            }
        }
        None
    })
    .await
    .ok()??;

    let GatewayCommand::Identify { token } = serde_json::from_str(&first_text).ok()?;

    decode::<Claims>(
        &token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}
