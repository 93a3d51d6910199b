use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized representation of one fetched post, with its author embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub user_id: String,
    pub text: String,
    /// Text with short links replaced by their expanded form.
    pub processed_text: String,
    pub medias: Vec<String>,
    pub is_reply: bool,
    pub related_tweet_id: String,
    pub favorite_count: u64,
    pub quote_count: u64,
    pub reply_count: u64,
    pub retweet_count: u64,
    pub bookmark_count: u64,
    pub view_count: u64,
    pub created_at: DateTime<Utc>,
    pub user: TweetAuthor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetAuthor {
    pub id: String,
    pub name: String,
    pub screen_name: String,
    pub location: String,
    pub description: String,
    pub website: String,
    pub followers_count: u64,
    pub following_count: u64,
    pub favourites_count: u64,
    pub statuses_count: u64,
    pub media_count: u64,
    pub verified: bool,
    pub profile_image_url: String,
    pub profile_banner_url: String,
    pub created_at: DateTime<Utc>,
}

/// Ticker and name extracted from a post's text. Empty `ticker` means no
/// match; callers filter on emptiness rather than an Option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinCandidate {
    pub ticker: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Tweet-Watcher/1.0".to_string(),
            timeout_seconds: 7,
            max_retries: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 10_000,
        }
    }
}

/// Bounds for the adaptive polling interval.
#[derive(Debug, Clone)]
pub struct PollTuning {
    pub initial_delay_ms: u64,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for PollTuning {
    fn default() -> Self {
        Self {
            initial_delay_ms: 5_000,
            min_delay_ms: 2_000,
            max_delay_ms: 600_000,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Search accepts at most {max} queries, got {got}")]
    TooManyQueries { max: usize, got: usize },

    #[error("None of the query terms found in the fetched tweets")]
    QueryTermsMissing,

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, WatcherError>;
