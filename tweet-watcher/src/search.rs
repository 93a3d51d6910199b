use crate::fetcher::Fetcher;
use crate::timeline::{self, SearchResponse};
use crate::types::{FetchConfig, Result, Tweet, WatcherError};
use tracing::{debug, warn};
use url::Url;

pub const MAX_QUERIES: usize = 10;
const RESULT_COUNT: u32 = 100;

/// Query terms shorter than this are too generic to be expected verbatim in
/// result text, so the sanity check skips them.
const SANITY_MIN_QUERY_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Top,
    Latest,
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::Top => "Top",
            SearchKind::Latest => "Latest",
        }
    }
}

/// Client for the external search endpoint. Queries go through the retrying
/// fetcher; an exhausted fetch is treated as an empty result set.
pub struct SearchClient {
    fetcher: Fetcher,
    base_url: String,
    api_key: String,
}

impl SearchClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        fetch_config: FetchConfig,
    ) -> Self {
        Self {
            fetcher: Fetcher::new(fetch_config),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub async fn search(
        &self,
        queries: &[&str],
        args: &[&str],
        kind: SearchKind,
    ) -> Result<Vec<Tweet>> {
        if queries.len() > MAX_QUERIES {
            return Err(WatcherError::TooManyQueries {
                max: MAX_QUERIES,
                got: queries.len(),
            });
        }

        let q = build_search_query(queries, args);
        let mut url = Url::parse(&format!("{}/Search", self.base_url))?;
        url.query_pairs_mut()
            .append_pair("q", &q)
            .append_pair("type", kind.as_str())
            .append_pair("count", &RESULT_COUNT.to_string());
        debug!("Searching: {}", q);

        let host = url.host_str().unwrap_or_default().to_string();
        let headers = [
            ("x-rapidapi-host", host.as_str()),
            ("x-rapidapi-key", self.api_key.as_str()),
        ];

        let response: Option<SearchResponse> =
            self.fetcher.get_json(url.as_str(), &headers, None).await;
        let Some(response) = response else {
            warn!("Search for {:?} yielded no data", queries);
            return Ok(Vec::new());
        };

        let tweets = timeline::collect_tweets(response);
        check_query_terms(queries, &tweets)?;

        Ok(tweets)
    }
}

/// Combine queries with OR and append auxiliary filter tokens, e.g.
/// `(a OR b) since_id:42`. Empty fragments are dropped.
pub fn build_search_query(queries: &[&str], args: &[&str]) -> String {
    let combined_query = queries
        .iter()
        .map(|q| q.trim())
        .filter(|q| !q.is_empty())
        .collect::<Vec<_>>()
        .join(" OR ");

    let combined_args = args
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if combined_args.is_empty() {
        format!("({})", combined_query)
    } else {
        format!("({}) {}", combined_query, combined_args)
    }
}

/// Sanity check: with a non-empty result set, at least one long query term
/// must appear in some record's processed text, or the batch is garbage.
fn check_query_terms(queries: &[&str], tweets: &[Tweet]) -> Result<()> {
    if tweets.is_empty() {
        return Ok(());
    }

    let found = tweets.iter().any(|tweet| {
        queries.iter().any(|query| {
            if query.len() < SANITY_MIN_QUERY_LEN {
                return true;
            }
            tweet
                .processed_text
                .to_lowercase()
                .contains(&query.to_lowercase())
        })
    });

    if found {
        Ok(())
    } else {
        Err(WatcherError::QueryTermsMissing)
    }
}
