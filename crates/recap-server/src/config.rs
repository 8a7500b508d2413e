use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use recap_ai::GeminiConfig;
use recap_ai::client::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// `RECAP_DB_PATH` value that selects the in-process store.
pub const IN_MEMORY: &str = ":memory:";

/// Server configuration loaded from environment variables.
/// Everything has a default; only malformed numbers fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Fallback credential when neither the request nor the stored settings
    /// carry one.
    pub gemini_api_key: Option<String>,
    pub gemini: GeminiConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = var("RECAP_PORT", "3001")
            .parse::<u16>()
            .context("RECAP_PORT must be a valid port number")?;

        let timeout = lookup("GEMINI_TIMEOUT_SECS")
            .map(|secs| {
                secs.parse::<u64>()
                    .context("GEMINI_TIMEOUT_SECS must be a whole number of seconds")
            })
            .transpose()?
            .map(Duration::from_secs);

        Ok(Config {
            db_path: PathBuf::from(var("RECAP_DB_PATH", "recap.db")),
            host: var("RECAP_HOST", "0.0.0.0"),
            port,
            gemini_api_key: lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()),
            gemini: GeminiConfig {
                base_url: var("GEMINI_BASE_URL", DEFAULT_BASE_URL),
                model: var("GEMINI_MODEL", DEFAULT_MODEL),
                timeout,
            },
        })
    }

    pub fn in_memory(&self) -> bool {
        self.db_path.as_os_str() == IN_MEMORY
    }
}
