use crate::state::Feed;
use crate::types::{Result, WatcherError};
use std::env;

/// Process-wide settings, derived from environment variables. A `.env` file
/// is loaded when present.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub env: String,
    pub log_level: String,
    pub rapidapi_key: String,
    pub imgbb_key: String,
}

impl WatcherConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            rapidapi_key: required("RAPIDAPI_KEY")?,
            imgbb_key: required("IMGBB_KEY")?,
        })
    }

    pub fn is_development(&self) -> bool {
        self.env == "development"
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).map_err(|_| WatcherError::MissingEnv(key.to_string()))
}

/// The static feed set watched at startup. Each feed gets its own
/// independent poll loop.
pub fn default_feeds() -> Vec<Feed> {
    vec![
        Feed::new("hakkoFun", "@hakkoFun"),
        Feed::new("launchcoin", "@launchcoin"),
    ]
}
