use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use cinder_types::api::{AccountResponse, UpsertAccountRequest};

use crate::error::{ApiError, engine_error, join_error};
use crate::state::AppState;

/// Provisioning and tier changes, owned by the external account-management
/// collaborator (guarded by the internal token, not a user JWT). Tier
/// changes merge field-by-field — quota and boost state survive.
pub async fn upsert_account(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpsertAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let engine_state = state.clone();
    let account = tokio::task::spawn_blocking(move || {
        engine_state
            .engine
            .upsert_account(user_id, &req.tier, req.display_name.as_deref())
    })
    .await
    .map_err(join_error)?
    .map_err(engine_error)?;

    Ok((StatusCode::OK, Json(AccountResponse::from(account))))
}

pub async fn get_account(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let engine_state = state.clone();
    let account = tokio::task::spawn_blocking(move || engine_state.engine.get_account(user_id))
        .await
        .map_err(join_error)?
        .map_err(engine_error)?;

    Ok(Json(AccountResponse::from(account)))
}
