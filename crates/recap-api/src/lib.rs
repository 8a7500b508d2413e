pub mod auth;
pub mod emails;
pub mod error;
pub mod messages;
pub mod settings;
pub mod state;

use axum::{
    Json, Router,
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};

pub use error::AppError;
pub use state::{AppState, AppStateInner};

/// All routes. Cross-cutting layers (CORS, tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route(
            "/messages",
            get(messages::list_messages).post(messages::create_message),
        )
        .route("/messages/{id}", delete(messages::delete_message))
        .route("/weeks", get(messages::list_weeks))
        .route("/emails", get(emails::list_emails))
        .route(
            "/emails/{id}",
            put(emails::update_email).delete(emails::delete_email),
        )
        .route("/emails/weekly", post(emails::generate_weekly))
        .route("/emails/monthly", post(emails::generate_monthly))
        .route(
            "/settings/api-key",
            get(settings::api_key_status)
                .put(settings::set_api_key)
                .delete(settings::clear_api_key),
        )
        .route("/data", delete(settings::clear_all_data))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
