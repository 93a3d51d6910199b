use serde_json::{json, Value};
use tweet_watcher::{FetchConfig, Fetcher};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config() -> FetchConfig {
    FetchConfig {
        initial_backoff_ms: 10,
        max_backoff_ms: 50,
        ..Default::default()
    }
}

#[tokio::test]
async fn retries_transient_failures_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(fast_config());
    let result: Option<Value> = fetcher
        .get_json(&format!("{}/data", server.uri()), &[], None)
        .await;

    assert_eq!(result, Some(json!({ "ok": true })));
    // Two failed attempts plus the successful one.
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn bad_request_short_circuits_to_default() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad query"))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(fast_config());
    let default = json!({ "fallback": true });
    let result: Option<Value> = fetcher
        .get_json(&format!("{}/data", server.uri()), &[], Some(default.clone()))
        .await;

    assert_eq!(result, Some(default));
    // No retries for the permanently non-retryable class.
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn exhausted_retries_resolve_to_default() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(fast_config());
    let result: Option<Value> = fetcher
        .get_json(&format!("{}/data", server.uri()), &[], None)
        .await;

    assert_eq!(result, None);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn request_headers_are_forwarded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .and(wiremock::matchers::header("x-rapidapi-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(fast_config());
    let result: Option<Value> = fetcher
        .get_json(
            &format!("{}/data", server.uri()),
            &[("x-rapidapi-key", "secret")],
            None,
        )
        .await;

    assert_eq!(result, Some(json!({ "ok": true })));
}

#[tokio::test]
async fn post_requests_carry_the_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/submit"))
        .and(wiremock::matchers::body_json(json!({ "q": "hello" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accepted": true })))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(fast_config());
    let body = json!({ "q": "hello" });
    let result: Option<Value> = fetcher
        .request_json(
            reqwest::Method::POST,
            &format!("{}/submit", server.uri()),
            &[],
            Some(&body),
            None,
        )
        .await;

    assert_eq!(result, Some(json!({ "accepted": true })));
}

#[tokio::test]
async fn undecodable_body_counts_as_a_failed_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(fast_config());
    let result: Option<Value> = fetcher
        .get_json(&format!("{}/data", server.uri()), &[], None)
        .await;

    assert_eq!(result, None);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}
