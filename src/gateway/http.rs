//! HTTP control plane for match management
//!
//! Exposes the REST surface clients use to arrange duels: creating and
//! starting matches, submitting solve times and reading match state.
//! Every route requires a bearer token; the WebSocket route authenticates
//! during the upgrade handshake instead.

use crate::auth::{Authenticator, Identity};
use crate::error::ArenaError;
use crate::gateway::messages::{
    CreateMatchRequest, ErrorBody, MatchListQuery, SubmitResultRequest,
};
use crate::gateway::ws;
use crate::matches::{MatchController, MatchStorage};
use crate::metrics::MetricsCollector;
use crate::rooms::RoomMultiplexer;
use crate::types::MatchStatus;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Shared state behind every gateway route
pub struct GatewayState {
    pub controller: MatchController,
    pub authenticator: Arc<dyn Authenticator>,
    pub storage: Arc<dyn MatchStorage>,
    pub rooms: Arc<RoomMultiplexer>,
    pub metrics_collector: Arc<MetricsCollector>,
    /// How often WebSocket connections are pinged
    pub heartbeat_interval: Duration,
}

/// Error wrapper that maps domain failures onto HTTP responses
pub struct ApiError(anyhow::Error);

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(err)
    }
}

impl From<ArenaError> for ApiError {
    fn from(err: ArenaError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self.0.downcast_ref::<ArenaError>() {
            Some(err) => {
                let status = match err {
                    ArenaError::MatchNotFound { .. }
                    | ArenaError::UserNotFound { .. }
                    | ArenaError::NoOpponentAvailable => StatusCode::NOT_FOUND,
                    ArenaError::NotParticipant { .. } => StatusCode::FORBIDDEN,
                    ArenaError::InvalidTransition { .. }
                    | ArenaError::DuplicateSubmission { .. }
                    | ArenaError::InvalidOpponent { .. }
                    | ArenaError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
                    ArenaError::AuthenticationFailed { .. } => StatusCode::UNAUTHORIZED,
                    ArenaError::StorageError { .. } => StatusCode::SERVICE_UNAVAILABLE,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                debug!("Request failed: {}", err);
                (status, err.to_string())
            }
            None => {
                error!("Unhandled gateway error: {:?}", self.0);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { detail })).into_response()
    }
}

/// Resolve the caller's identity from the `Authorization` header
async fn authenticate_bearer(
    state: &GatewayState,
    headers: &HeaderMap,
) -> Result<Identity, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ArenaError::AuthenticationFailed {
            reason: "Missing authorization header".to_string(),
        })?;

    let token = value.strip_prefix("Bearer ").unwrap_or(value);

    state
        .authenticator
        .authenticate(token)
        .await
        .map_err(ApiError::from)
}

/// Create a match against a chosen opponent, or a random one when the
/// body omits `opponent_id`
async fn create_match(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Json(body): Json<CreateMatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let timer = state.metrics_collector.start_timer();
    let identity = authenticate_bearer(&state, &headers).await?;

    let duel = state
        .controller
        .create_match(identity.user_id, body.opponent_id)
        .await?;

    state
        .metrics_collector
        .record_gateway_operation("create_match", timer.stop());

    Ok((StatusCode::CREATED, Json(duel)))
}

/// Create a match against a randomly chosen online opponent
async fn find_opponent(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let timer = state.metrics_collector.start_timer();
    let identity = authenticate_bearer(&state, &headers).await?;

    let duel = state.controller.create_match(identity.user_id, None).await?;

    state
        .metrics_collector
        .record_gateway_operation("find_opponent", timer.stop());

    Ok((StatusCode::CREATED, Json(duel)))
}

/// Move a waiting match to `active`; only a participant may start it
async fn start_match(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Path(match_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let timer = state.metrics_collector.start_timer();
    let identity = authenticate_bearer(&state, &headers).await?;

    let duel = state
        .controller
        .start_match(&match_id, identity.user_id)
        .await?;

    state
        .metrics_collector
        .record_gateway_operation("start_match", timer.stop());

    Ok(Json(duel))
}

/// Record a participant's solve time; the second submission settles
/// the match
async fn submit_result(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Path(match_id): Path<String>,
    Json(body): Json<SubmitResultRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let timer = state.metrics_collector.start_timer();
    let identity = authenticate_bearer(&state, &headers).await?;

    let duel = state
        .controller
        .submit_result(&match_id, identity.user_id, body.solve_time_ms)
        .await?;

    state
        .metrics_collector
        .record_gateway_operation("submit_result", timer.stop());

    Ok(Json(duel))
}

/// Fetch one match. Any authenticated user may read match state, so
/// spectators can follow a duel they have joined over WebSocket.
async fn get_match(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Path(match_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let timer = state.metrics_collector.start_timer();
    authenticate_bearer(&state, &headers).await?;

    let duel = state.controller.get_match(&match_id).await?;

    state
        .metrics_collector
        .record_gateway_operation("get_match", timer.stop());

    Ok(Json(duel))
}

/// List the caller's matches, newest first, optionally filtered by status
async fn list_matches(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Query(query): Query<MatchListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let timer = state.metrics_collector.start_timer();
    let identity = authenticate_bearer(&state, &headers).await?;

    let status = match query.status.as_deref() {
        Some(raw) => Some(MatchStatus::parse(raw).ok_or_else(|| {
            ArenaError::InvalidRequest {
                reason: format!("Unknown match status: {}", raw),
            }
        })?),
        None => None,
    };
    let limit = query.limit.unwrap_or(20);

    let matches = state
        .controller
        .list_for_user(identity.user_id, status, limit)
        .await?;

    state
        .metrics_collector
        .record_gateway_operation("list_matches", timer.stop());

    Ok(Json(matches))
}

/// Build the gateway router with all REST routes and the WebSocket upgrade
pub fn build_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/api/matches", post(create_match).get(list_matches))
        .route("/api/matches/find-opponent", post(find_opponent))
        .route("/api/matches/{match_id}/start", post(start_match))
        .route("/api/matches/{match_id}/result", post(submit_result))
        .route("/api/matches/{match_id}", get(get_match))
        .route("/ws/{user_id}", get(ws::ws_upgrade))
        .with_state(state)
}
