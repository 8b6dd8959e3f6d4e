use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use cinder_types::api::{Claims, MatchResponse, UpdatePreviewRequest};
use cinder_types::events::GatewayEvent;

use crate::error::{ApiError, engine_error, join_error};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MatchQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor-based pagination — pass the `created_at` of the oldest match
    /// from the previous page to fetch older ones.
    pub before: Option<DateTime<Utc>>,
}

fn default_limit() -> u32 {
    50
}

pub async fn list_matches(
    State(state): State<AppState>,
    Query(query): Query<MatchQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = claims.sub;

    let engine_state = state.clone();
    let matches = tokio::task::spawn_blocking(move || {
        engine_state
            .engine
            .list_matches(user, query.limit, query.before)
    })
    .await
    .map_err(join_error)?
    .map_err(engine_error)?;

    let body: Vec<MatchResponse> = matches.into_iter().map(MatchResponse::from).collect();
    Ok(Json(body))
}

/// Chat-collaborator hook: record the newest message preview on an
/// existing match. Only mutates — a missing key is 404, never a create.
pub async fn update_preview(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdatePreviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = claims.sub;

    let engine_state = state.clone();
    let match_key = key.clone();
    let updated = tokio::task::spawn_blocking(move || {
        engine_state
            .engine
            .update_preview(&match_key, caller, &req.text, req.timestamp)
    })
    .await
    .map_err(join_error)?
    .map_err(engine_error)?;

    if let (Some(text), Some(at)) = (updated.last_message.clone(), updated.last_message_at) {
        let event = GatewayEvent::PreviewUpdate {
            key: updated.key.clone(),
            last_message: text,
            last_message_at: at,
        };
        state.dispatcher.push_to_members(updated.members, event).await;
    }

    Ok(Json(MatchResponse::from(updated)))
}
