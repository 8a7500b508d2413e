use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use recap_types::api::{ApiKeyRequest, ApiKeyStatus};

use crate::error::AppError;
use crate::state::{AppState, run_blocking};

/// GET /settings/api-key
///
/// Reports whether a credential is available. The key itself is never
/// returned.
pub async fn api_key_status(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let stored = run_blocking(&state, |store| Ok(store.get_api_key()?)).await?;

    Ok(Json(ApiKeyStatus {
        configured: stored.is_some() || state.default_api_key.is_some(),
    }))
}

/// PUT /settings/api-key
pub async fn set_api_key(
    State(state): State<AppState>,
    payload: Result<Json<ApiKeyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let api_key = req
        .api_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or_else(|| AppError::Validation("apiKey is required".to_string()))?;

    run_blocking(&state, move |store| Ok(store.set_api_key(&api_key)?)).await?;
    info!("Stored API key updated");

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /settings/api-key
pub async fn clear_api_key(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    run_blocking(&state, |store| Ok(store.clear_api_key()?)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /data
///
/// Wipes messages, emails and the stored key. Accounts survive.
pub async fn clear_all_data(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    run_blocking(&state, |store| Ok(store.clear_all()?)).await?;
    info!("All messages, emails and settings cleared");
    Ok(StatusCode::NO_CONTENT)
}
