pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod poller;
pub mod renderer;
pub mod search;
pub mod state;
pub mod timeline;
pub mod types;

pub use config::WatcherConfig;
pub use fetcher::Fetcher;
pub use poller::{next_delay_ms, CycleOutcome, LaunchCandidate, Poller};
pub use renderer::{build_tweet_html, ChromiumImager, TweetImager};
pub use search::{build_search_query, SearchClient, SearchKind};
pub use state::Feed;
pub use types::*;
