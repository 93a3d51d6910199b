use crate::extractor;
use crate::renderer::TweetImager;
use crate::search::{SearchClient, SearchKind};
use crate::state::Feed;
use crate::types::{CoinCandidate, PollTuning, Result, Tweet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info};

/// One launch candidate surfaced by a poll cycle: a record whose text
/// carried the ticker pattern, with its resolved image URL if any.
#[derive(Debug, Clone)]
pub struct LaunchCandidate {
    pub tweet_id: String,
    pub coin: CoinCandidate,
    pub image_url: Option<String>,
}

#[derive(Debug)]
pub struct CycleOutcome {
    /// Size of the full fetched batch; drives the delay adjustment.
    pub fetched: usize,
    pub candidates: Vec<LaunchCandidate>,
}

/// Adaptive poll loop for a single feed. The loop owns its feed state and
/// never terminates on error; failures only stretch the polling interval.
pub struct Poller {
    feed: Feed,
    search: Arc<SearchClient>,
    imager: Arc<dyn TweetImager>,
    tuning: PollTuning,
    is_running: Arc<RwLock<bool>>,
}

impl Poller {
    pub fn new(
        feed: Feed,
        search: Arc<SearchClient>,
        imager: Arc<dyn TweetImager>,
        tuning: PollTuning,
    ) -> Self {
        Self {
            feed,
            search,
            imager,
            tuning,
            is_running: Arc::new(RwLock::new(true)),
        }
    }

    /// Shared flag for stopping the loop at the next cycle boundary.
    pub fn run_flag(&self) -> Arc<RwLock<bool>> {
        self.is_running.clone()
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    /// Execute one poll cycle: scoped search, high-water-mark update, ticker
    /// filtering, and image resolution for each survivor.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let args = self.feed.scoped_args();
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

        let tweets = self
            .search
            .search(&[self.feed.query()], &arg_refs, SearchKind::Latest)
            .await?;

        if let Some(first) = tweets.first() {
            self.feed.record_seen(&first.id);
        }

        let mut candidates = Vec::new();
        for tweet in &tweets {
            let coin = extractor::extract_ticker_and_name(&tweet.text);
            if coin.ticker.is_empty() {
                continue;
            }
            let image_url = self.resolve_image(tweet).await;
            candidates.push(LaunchCandidate {
                tweet_id: tweet.id.clone(),
                coin,
                image_url,
            });
        }

        Ok(CycleOutcome {
            fetched: tweets.len(),
            candidates,
        })
    }

    /// Use an attached media URL when the record has one; otherwise take the
    /// slow path and render the record to a hosted image.
    async fn resolve_image(&self, tweet: &Tweet) -> Option<String> {
        match tweet.medias.first() {
            Some(url) => Some(url.clone()),
            None => self.imager.render_and_upload(tweet).await,
        }
    }

    pub async fn run(&mut self) {
        let mut delay_ms = self.tuning.initial_delay_ms;

        while *self.is_running.read().await {
            match self.run_cycle().await {
                Ok(outcome) => {
                    for candidate in &outcome.candidates {
                        info!(
                            "Feed {}: launch candidate ticker={} name={} image={:?} (tweet {})",
                            self.feed.name(),
                            candidate.coin.ticker,
                            candidate.coin.name,
                            candidate.image_url,
                            candidate.tweet_id
                        );
                    }
                    delay_ms = next_delay_ms(delay_ms, outcome.fetched, &self.tuning);
                }
                Err(e) => {
                    error!("Error in polling for tweets on feed {}: {}", self.feed.name(), e);
                    delay_ms = self.tuning.max_delay_ms;
                }
            }

            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        info!("Poller for feed {} stopped", self.feed.name());
    }
}

/// Multiplicative delay adjustment with hysteresis thresholds on batch size.
/// The previous delay is the base; the result stays within the tuning bounds.
pub fn next_delay_ms(current_ms: u64, batch_size: usize, tuning: &PollTuning) -> u64 {
    if batch_size >= 20 {
        let next = tuning.min_delay_ms.max((current_ms as f64 * 0.7).round() as u64);
        info!(
            "High activity ({} tweets), reducing polling interval to {}ms",
            batch_size, next
        );
        next
    } else if batch_size < 8 {
        let next = tuning.max_delay_ms.min((current_ms as f64 * 1.5).round() as u64);
        info!(
            "Low activity ({} tweets), increasing polling interval to {}ms",
            batch_size, next
        );
        next
    } else if batch_size < 15 {
        let next = tuning.max_delay_ms.min((current_ms as f64 * 1.1).round() as u64);
        info!(
            "Moderate-low activity ({} tweets), slightly increasing polling interval to {}ms",
            batch_size, next
        );
        next
    } else {
        info!(
            "Moderate activity ({} tweets), maintaining polling interval at {}ms",
            batch_size, current_ms
        );
        current_ms
    }
}
