use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use rand_core::OsRng;
use tracing::{info, warn};
use uuid::Uuid;

use recap_db::DuplicateUsername;
use recap_types::api::{CredentialsRequest, LoginResponse, SignupResponse};
use recap_types::models::UserRecord;

use crate::error::AppError;
use crate::state::{AppState, run_blocking};

fn require_credentials(req: CredentialsRequest) -> Result<(String, String), AppError> {
    match (req.username, req.password) {
        (Some(username), Some(password))
            if !username.trim().is_empty() && !password.is_empty() =>
        {
            Ok((username.trim().to_string(), password))
        }
        _ => Err(AppError::Validation(
            "Username and password are required".to_string(),
        )),
    }
}

/// POST /signup
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let (username, password) = require_credentials(req)?;

    let user = run_blocking(&state, move |store| {
        if store.get_user_by_username(&username)?.is_some() {
            return Err(AppError::UsernameTaken);
        }

        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Password hashing failed: {e}"))?
            .to_string();

        let user = UserRecord {
            id: Uuid::new_v4(),
            username,
            password_hash,
            created_at: Utc::now(),
        };

        // A concurrent signup can still win the race; the UNIQUE index catches it.
        store.create_user(&user).map_err(|e| {
            if e.is::<DuplicateUsername>() {
                AppError::UsernameTaken
            } else {
                AppError::Internal(e)
            }
        })?;

        Ok(user)
    })
    .await?;

    info!("Created user {} ({})", user.username, user.id);

    Ok((StatusCode::CREATED, Json(SignupResponse { id: user.id })))
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let (username, password) = require_credentials(req)?;

    let user_id = run_blocking(&state, move |store| {
        let Some(user) = store.get_user_by_username(&username)? else {
            warn!("Login rejected: unknown user '{}'", username);
            return Err(AppError::InvalidCredentials);
        };

        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|e| anyhow::anyhow!("Stored password hash is corrupt: {e}"))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| {
                warn!("Login rejected: wrong password for '{}'", username);
                AppError::InvalidCredentials
            })?;

        Ok(user.id)
    })
    .await?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        user_id,
    }))
}
