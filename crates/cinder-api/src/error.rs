use axum::Json;
use axum::http::StatusCode;
use tracing::error;

use cinder_engine::EngineError;
use cinder_types::api::ErrorResponse;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map the engine taxonomy onto HTTP. Every variant keeps a stable `code`
/// so the UI can branch without string-matching messages.
pub fn engine_error(err: EngineError) -> ApiError {
    let (status, code) = match &err {
        EngineError::QuotaExceeded { .. } => (StatusCode::TOO_MANY_REQUESTS, "quota_exceeded"),
        EngineError::InvalidTarget => (StatusCode::BAD_REQUEST, "invalid_target"),
        EngineError::AccountNotFound(_) => (StatusCode::NOT_FOUND, "account_not_found"),
        EngineError::TransactionConflict => (StatusCode::SERVICE_UNAVAILABLE, "try_again"),
        EngineError::BoostAlreadyActive { .. } => (StatusCode::CONFLICT, "boost_already_active"),
        EngineError::BoostNotEntitled { .. } => (StatusCode::FORBIDDEN, "boost_not_entitled"),
        EngineError::UnknownTier { .. } => (StatusCode::BAD_REQUEST, "unknown_tier"),
        EngineError::MatchNotFound(_) => (StatusCode::NOT_FOUND, "match_not_found"),
        EngineError::NotMatchMember(_) => (StatusCode::FORBIDDEN, "not_match_member"),
        EngineError::Storage(e) => {
            error!("storage error: {e:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal")
        }
    };

    let message = if code == "internal" {
        "internal error".to_string()
    } else {
        err.to_string()
    };

    (
        status,
        Json(ErrorResponse {
            code,
            error: message,
        }),
    )
}

pub fn join_error(err: tokio::task::JoinError) -> ApiError {
    error!("spawn_blocking join error: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            code: "internal",
            error: "internal error".to_string(),
        }),
    )
}
