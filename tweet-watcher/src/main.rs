use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tweet_watcher::renderer::{ChromiumImager, TweetImager};
use tweet_watcher::{config, FetchConfig, PollTuning, Poller, SearchClient, WatcherConfig};

const SEARCH_BASE_URL: &str = "https://twitter283.p.rapidapi.com";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WatcherConfig::from_env()?;
    init_tracing(&config);

    info!("Starting tweet watcher");

    let search = Arc::new(SearchClient::new(
        SEARCH_BASE_URL,
        config.rapidapi_key.clone(),
        FetchConfig::default(),
    ));
    let imager: Arc<dyn TweetImager> = Arc::new(ChromiumImager::new(config.imgbb_key.clone()));

    let mut handles = Vec::new();
    for feed in config::default_feeds() {
        info!("Watching feed {} ({})", feed.name(), feed.query());
        let mut poller = Poller::new(
            feed,
            search.clone(),
            imager.clone(),
            PollTuning::default(),
        );
        handles.push(tokio::spawn(async move { poller.run().await }));
    }

    for handle in handles {
        handle.await?;
    }

    Ok(())
}

fn init_tracing(config: &WatcherConfig) {
    let filter = EnvFilter::new(&config.log_level);
    if config.is_development() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    }
}
