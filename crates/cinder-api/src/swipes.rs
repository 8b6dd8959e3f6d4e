use axum::{Extension, Json, extract::State, response::IntoResponse};

use cinder_engine::EngineError;
use cinder_types::api::{Claims, RecordSwipeRequest, RecordSwipeResponse, ResetSwipesResponse};
use cinder_types::events::GatewayEvent;

use crate::error::{ApiError, engine_error, join_error};
use crate::state::AppState;

/// The composite swipe operation. Quota exhaustion is a normal outcome —
/// `accepted: false` on a 200 — so the UI branches on the body, not on an
/// error status.
pub async fn record_swipe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RecordSwipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = claims.sub;

    // Run blocking DB work off the async runtime
    let engine_state = state.clone();
    let result = tokio::task::spawn_blocking(move || {
        engine_state
            .engine
            .record_swipe(actor, req.target_id, req.direction)
    })
    .await
    .map_err(join_error)?;

    match result {
        Ok(receipt) => {
            // Push the celebration to both members exactly once — only the
            // call that actually created the record fires it.
            if receipt.match_created {
                if let Some(m) = &receipt.matched {
                    let event = GatewayEvent::MatchCreate {
                        key: m.key.clone(),
                        members: m.members,
                        created_at: m.created_at,
                    };
                    state.dispatcher.push_to_members(m.members, event).await;
                }
            }

            Ok(Json(RecordSwipeResponse {
                accepted: true,
                remaining: receipt.remaining,
                matched: receipt.matched.map(Into::into),
            }))
        }
        Err(EngineError::QuotaExceeded { .. }) => Ok(Json(RecordSwipeResponse {
            accepted: false,
            remaining: 0,
            matched: None,
        })),
        Err(e) => Err(engine_error(e)),
    }
}

pub async fn reset_swipes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = claims.sub;

    let engine_state = state.clone();
    let deleted = tokio::task::spawn_blocking(move || engine_state.engine.reset_swipes(actor))
        .await
        .map_err(join_error)?
        .map_err(engine_error)?;

    Ok(Json(ResetSwipesResponse { deleted }))
}
