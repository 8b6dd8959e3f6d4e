use axum::{Extension, Json, extract::State, response::IntoResponse};

use cinder_types::api::{ActivateBoostResponse, Claims};

use crate::error::{ApiError, engine_error, join_error};
use crate::state::AppState;

/// Activate a visibility boost. Entitlement comes from the tier's
/// capability flag; an unexpired boost is rejected, not extended.
pub async fn activate_boost(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = claims.sub;

    let engine_state = state.clone();
    let expires_at = tokio::task::spawn_blocking(move || engine_state.engine.activate_boost(user))
        .await
        .map_err(join_error)?
        .map_err(engine_error)?;

    Ok(Json(ActivateBoostResponse { expires_at }))
}
