use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tweet_watcher::renderer::TweetImager;
use tweet_watcher::types::{Result as WatcherResult, Tweet, WatcherError};
use tweet_watcher::{
    build_search_query, next_delay_ms, Feed, FetchConfig, PollTuning, Poller, SearchClient,
    SearchKind,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config() -> FetchConfig {
    FetchConfig {
        initial_backoff_ms: 10,
        max_backoff_ms: 50,
        ..Default::default()
    }
}

fn search_payload(tweets: Vec<Value>) -> Value {
    let entries: Vec<Value> = tweets
        .into_iter()
        .map(|t| {
            json!({
                "content": {
                    "__typename": "TimelineTimelineItem",
                    "content": { "tweet_results": { "result": t } }
                }
            })
        })
        .collect();

    json!({
        "data": {
            "search_by_raw_query": {
                "search_timeline": {
                    "timeline": { "instructions": [{ "entries": entries }] }
                }
            }
        }
    })
}

fn tweet(id: &str, text: &str, medias: Vec<&str>) -> Value {
    let mut result = json!({
        "__typename": "Tweet",
        "rest_id": id,
        "core": {
            "user_results": {
                "result": {
                    "rest_id": "u1",
                    "core": {
                        "name": "Alice",
                        "screen_name": "alice",
                        "created_at": "Wed Oct 10 20:19:24 +0000 2018"
                    }
                }
            }
        },
        "legacy": {
            "full_text": text,
            "user_id_str": "u1",
            "created_at": "Wed Oct 10 20:19:24 +0000 2018",
            "favorite_count": 0,
            "quote_count": 0,
            "reply_count": 0,
            "retweet_count": 0,
            "bookmark_count": 0
        }
    });
    if !medias.is_empty() {
        let media: Vec<Value> = medias
            .iter()
            .map(|m| json!({ "media_url_https": m, "type": "photo" }))
            .collect();
        result["legacy"]["extended_entities"] = json!({ "media": media });
    }
    result
}

struct FakeImager {
    uploads: AtomicUsize,
}

impl FakeImager {
    fn new() -> Self {
        Self {
            uploads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TweetImager for FakeImager {
    async fn render(&self, _tweet: &Tweet) -> WatcherResult<Vec<u8>> {
        Ok(vec![0u8; 4])
    }

    async fn upload(&self, _image: &[u8]) -> WatcherResult<Option<String>> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(Some("https://img.example/rendered.png".to_string()))
    }
}

#[test]
fn delay_recurrence_follows_activity_bands() {
    let tuning = PollTuning::default();
    let mut delay = tuning.initial_delay_ms;

    let steps = [(25usize, 3500u64), (5, 5250), (12, 5775), (17, 5775)];
    for (size, expected) in steps {
        delay = next_delay_ms(delay, size, &tuning);
        assert_eq!(delay, expected, "after batch of {}", size);
    }
}

#[test]
fn delay_is_clamped_to_tuning_bounds() {
    let tuning = PollTuning::default();

    // Already at the floor: high activity cannot push below it.
    assert_eq!(next_delay_ms(tuning.min_delay_ms, 25, &tuning), tuning.min_delay_ms);
    // Already at the ceiling: low activity cannot push above it.
    assert_eq!(next_delay_ms(tuning.max_delay_ms, 0, &tuning), tuning.max_delay_ms);
    // Moderate-low activity also respects the ceiling.
    assert_eq!(next_delay_ms(tuning.max_delay_ms, 10, &tuning), tuning.max_delay_ms);
}

#[test]
fn first_poll_has_no_since_filter() {
    let feed = Feed::new("test", "@launchcoin");

    assert!(feed.is_first_poll());
    assert!(feed.scoped_args().is_empty());
    assert_eq!(build_search_query(&[feed.query()], &[]), "(@launchcoin)");
}

#[test]
fn recorded_high_water_mark_scopes_the_next_query() {
    let mut feed = Feed::new("test", "@launchcoin");
    feed.record_seen("42");

    assert!(!feed.is_first_poll());
    assert_eq!(feed.last_seen_id(), Some("42"));

    let args = feed.scoped_args();
    assert_eq!(args, vec!["since_id:42".to_string()]);

    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    assert_eq!(
        build_search_query(&[feed.query()], &arg_refs),
        "(@launchcoin) since_id:42"
    );
}

#[tokio::test]
async fn cycle_filters_candidates_and_advances_the_high_water_mark() {
    let server = MockServer::start().await;

    // First poll: unscoped query, two tweets, one carrying the pattern.
    Mock::given(method("GET"))
        .and(path("/Search"))
        .and(query_param("q", "(@launchcoin)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_payload(vec![
            tweet("100", "Launching $MOON + moon_shot now", vec![]),
            tweet("99", "gm", vec![]),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    // Second poll: scoped by the first batch's newest id.
    Mock::given(method("GET"))
        .and(path("/Search"))
        .and(query_param("q", "(@launchcoin) since_id:100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_payload(vec![])))
        .expect(1)
        .mount(&server)
        .await;

    let search = Arc::new(SearchClient::new(&server.uri(), "test-key", fast_config()));
    let imager = Arc::new(FakeImager::new());
    let mut poller = Poller::new(
        Feed::new("test", "@launchcoin"),
        search,
        imager.clone(),
        PollTuning::default(),
    );

    let outcome = poller.run_cycle().await.unwrap();
    assert_eq!(outcome.fetched, 2);
    assert_eq!(outcome.candidates.len(), 1);
    assert_eq!(outcome.candidates[0].coin.ticker, "MOON");
    assert_eq!(outcome.candidates[0].coin.name, "moon_shot");
    assert_eq!(
        outcome.candidates[0].image_url.as_deref(),
        Some("https://img.example/rendered.png")
    );
    assert_eq!(poller.feed().last_seen_id(), Some("100"));
    assert!(!poller.feed().is_first_poll());

    let outcome = poller.run_cycle().await.unwrap();
    assert_eq!(outcome.fetched, 0);
    assert!(outcome.candidates.is_empty());
    // An empty batch leaves the high-water mark untouched.
    assert_eq!(poller.feed().last_seen_id(), Some("100"));
}

#[tokio::test]
async fn attached_media_skips_the_render_path() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_payload(vec![tweet(
            "200",
            "$PEPE + pepe_coin with art",
            vec!["https://pbs.example/art.jpg"],
        )])))
        .mount(&server)
        .await;

    let search = Arc::new(SearchClient::new(&server.uri(), "test-key", fast_config()));
    let imager = Arc::new(FakeImager::new());
    let mut poller = Poller::new(
        Feed::new("test", "@launchcoin"),
        search,
        imager.clone(),
        PollTuning::default(),
    );

    let outcome = poller.run_cycle().await.unwrap();

    assert_eq!(
        outcome.candidates[0].image_url.as_deref(),
        Some("https://pbs.example/art.jpg")
    );
    assert_eq!(imager.uploads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn run_stops_at_the_cycle_boundary_when_flagged_off() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_payload(vec![])))
        .mount(&server)
        .await;

    let search = Arc::new(SearchClient::new(&server.uri(), "test-key", fast_config()));
    let imager = Arc::new(FakeImager::new());
    let tuning = PollTuning {
        initial_delay_ms: 10,
        min_delay_ms: 10,
        max_delay_ms: 50,
    };
    let mut poller = Poller::new(Feed::new("test", "@launchcoin"), search, imager, tuning);
    let flag = poller.run_flag();

    let task = tokio::spawn(async move { poller.run().await });
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    *flag.write().await = false;

    tokio::time::timeout(std::time::Duration::from_secs(2), task)
        .await
        .expect("poller should stop at the cycle boundary")
        .unwrap();
}

#[tokio::test]
async fn sanity_check_raises_when_no_long_query_term_matches() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_payload(vec![tweet(
            "300",
            "entirely unrelated chatter",
            vec![],
        )])))
        .mount(&server)
        .await;

    let search = SearchClient::new(&server.uri(), "test-key", fast_config());
    let long_query = "EwZHZ6tHqLjsbDfkrTdHCTcPdq2MCiFRvXsHFtGGpump";
    let err = search
        .search(&[long_query], &[], SearchKind::Latest)
        .await
        .unwrap_err();

    assert!(matches!(err, WatcherError::QueryTermsMissing));
}

#[tokio::test]
async fn more_than_ten_queries_is_rejected() {
    let search = SearchClient::new("http://localhost:9", "test-key", fast_config());
    let queries: Vec<&str> = vec!["q"; 11];

    let err = search
        .search(&queries, &[], SearchKind::Top)
        .await
        .unwrap_err();

    assert!(matches!(err, WatcherError::TooManyQueries { got: 11, .. }));
}
