use crate::types::{FetchConfig, Result, WatcherError};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{error, warn};

/// HTTP JSON fetcher with a fixed per-attempt timeout and bounded
/// exponential-backoff retry. A 400 response short-circuits to the default
/// value; exhausted retries also resolve to the default value, so callers
/// must treat a returned default as "no data" rather than an error.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

enum Attempted<T> {
    Payload(T),
    BadRequest,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Self {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        default: Option<T>,
    ) -> Option<T> {
        self.request_json(Method::GET, url, headers, None, default).await
    }

    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<&serde_json::Value>,
        default: Option<T>,
    ) -> Option<T> {
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_millis(self.config.initial_backoff_ms),
            initial_interval: Duration::from_millis(self.config.initial_backoff_ms),
            max_interval: Duration::from_millis(self.config.max_backoff_ms),
            multiplier: 2.0,
            randomization_factor: 0.0,
            max_elapsed_time: None,
            ..Default::default()
        };

        for attempt in 1..=self.config.max_retries {
            match self.attempt(method.clone(), url, headers, body).await {
                Ok(Attempted::Payload(value)) => return Some(value),
                Ok(Attempted::BadRequest) => {
                    warn!("400 error for {}. Returning default response.", url);
                    return default;
                }
                Err(e) => {
                    if attempt >= self.config.max_retries {
                        error!(
                            "Max retries ({}) reached for fetching {}. Giving up.",
                            self.config.max_retries, url
                        );
                        break;
                    }

                    let wait = backoff
                        .next_backoff()
                        .unwrap_or_else(|| Duration::from_millis(self.config.max_backoff_ms));
                    warn!(
                        "Error fetching {}: {}. Retry {}/{}. Waiting {:?}",
                        url, e, attempt, self.config.max_retries, wait
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }

        default
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> Result<Attempted<T>> {
        let mut request = self.client.request(method, url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::BAD_REQUEST {
            return Ok(Attempted::BadRequest);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WatcherError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Attempted::Payload(response.json().await?))
    }
}
