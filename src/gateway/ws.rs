//! WebSocket endpoint for the realtime event stream
//!
//! Clients connect to `/ws/{user_id}?token=...` and exchange JSON text
//! frames. Outbound events arrive through the connection registry; inbound
//! frames are decoded and handed to the session router. A newer connection
//! for the same user supersedes the older one.

use crate::gateway::http::GatewayState;
use crate::gateway::session::SessionRouter;
use crate::registry::ChannelEventSink;
use crate::types::{ClientEvent, ServerEvent, UserId};
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Outbound events queued per connection before the send timeout drops them
const OUTBOUND_BUFFER: usize = 64;

/// Query parameters accepted by the WebSocket route
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: String,
}

/// Upgrade handler for `/ws/{user_id}`
pub async fn ws_upgrade(
    State(state): State<Arc<GatewayState>>,
    Path(user_id): Path<UserId>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket, user_id, query.token))
}

/// Run one WebSocket session from authentication to teardown
async fn handle_socket(
    state: Arc<GatewayState>,
    mut socket: WebSocket,
    user_id: UserId,
    token: String,
) {
    // Authenticate after the upgrade so the client receives a close frame
    // instead of a bare HTTP rejection
    let identity = match state.authenticator.authenticate(&token).await {
        Ok(identity) if identity.user_id == user_id => identity,
        Ok(identity) => {
            warn!(
                "Token for user {} presented on socket for user {}",
                identity.user_id, user_id
            );
            reject_socket(socket).await;
            return;
        }
        Err(e) => {
            debug!("WebSocket authentication failed for user {}: {}", user_id, e);
            reject_socket(socket).await;
            return;
        }
    };

    let username = resolve_username(&state, user_id, identity.username).await;

    let (tx, mut rx) = mpsc::channel::<ServerEvent>(OUTBOUND_BUFFER);
    let sink = Arc::new(ChannelEventSink::new(tx));
    let connection_id = state.rooms.connect(user_id, username.clone(), sink).await;

    if let Err(e) = state.storage.set_online(user_id, true).await {
        warn!("Failed to mark user {} online: {}", user_id, e);
    }

    info!(
        "User {} ({}) connected over WebSocket (connection {})",
        user_id, username, connection_id
    );

    let router = SessionRouter::new(state.rooms.clone(), state.metrics_collector.clone());
    let mut heartbeat = tokio::time::interval(state.heartbeat_interval);
    // The first interval tick completes immediately
    heartbeat.tick().await;

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                match outbound {
                    Some(event) => {
                        let json = match serde_json::to_string(&event) {
                            Ok(json) => json,
                            Err(e) => {
                                warn!("Failed to serialize event for user {}: {}", user_id, e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    // The registry dropped our sender: a newer connection took over
                    None => {
                        debug!(
                            "Connection {} for user {} superseded",
                            connection_id, user_id
                        );
                        break;
                    }
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        // A frame that is not JSON ends the session. JSON with
                        // an unrecognized type is ignored so newer clients can
                        // talk to older deployments.
                        let value: serde_json::Value = match serde_json::from_str(&text) {
                            Ok(value) => value,
                            Err(e) => {
                                debug!("Malformed frame from user {}: {}", user_id, e);
                                break;
                            }
                        };
                        match serde_json::from_value::<ClientEvent>(value) {
                            Ok(event) => router.dispatch(user_id, &username, event).await,
                            Err(e) => {
                                debug!("Ignoring unrecognized event from user {}: {}", user_id, e);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("WebSocket error for user {}: {}", user_id, e);
                        break;
                    }
                }
            }
            _ = heartbeat.tick() => {
                if socket.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    // Tear down presence only if this is still the user's current connection
    if state.rooms.disconnect(user_id, connection_id).await {
        if let Err(e) = state.storage.set_online(user_id, false).await {
            warn!("Failed to mark user {} offline: {}", user_id, e);
        }
        info!(
            "User {} disconnected (connection {})",
            user_id, connection_id
        );
    }
}

/// Close an unauthenticated socket with a policy violation frame
async fn reject_socket(mut socket: WebSocket) {
    let frame = CloseFrame {
        code: close_code::POLICY,
        reason: "Invalid token".into(),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        debug!("Failed to send close frame: {}", e);
    }
}

/// Pick the display name for a session: stored profile first, then the
/// token's claim, then a placeholder
async fn resolve_username(
    state: &GatewayState,
    user_id: UserId,
    claimed: Option<String>,
) -> String {
    match state.storage.fetch_profile(user_id).await {
        Ok(Some(profile)) => profile.username,
        Ok(None) => claimed.unwrap_or_else(|| format!("User{}", user_id)),
        Err(e) => {
            warn!("Failed to load profile for user {}: {}", user_id, e);
            claimed.unwrap_or_else(|| format!("User{}", user_id))
        }
    }
}
