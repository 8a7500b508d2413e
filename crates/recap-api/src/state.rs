use std::sync::Arc;

use tracing::error;

use recap_ai::TextGenerator;
use recap_db::Store;

use crate::error::AppError;

pub type AppState = Arc<AppStateInner>;

/// Shared application state injected into all route handlers.
pub struct AppStateInner {
    pub store: Arc<dyn Store>,
    pub model: Arc<dyn TextGenerator>,
    /// Server-wide credential used when neither the request nor the stored
    /// settings carry one.
    pub default_api_key: Option<String>,
}

impl AppStateInner {
    pub fn new(store: Arc<dyn Store>, model: Arc<dyn TextGenerator>) -> Self {
        Self {
            store,
            model,
            default_api_key: None,
        }
    }

    pub fn with_default_api_key(mut self, api_key: Option<String>) -> Self {
        self.default_api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }
}

/// Runs blocking store work off the async runtime.
pub async fn run_blocking<F, T>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&dyn Store) -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            AppError::Internal(anyhow::anyhow!("Background task failed: {e}"))
        })?
}
