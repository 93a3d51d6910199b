use crate::types::CoinCandidate;
use regex::Regex;
use std::sync::LazyLock;

static TICKER_AND_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z0-9]+)\s*\+\s*([A-Za-z0-9_]+)").unwrap());

/// Extract a ticker and name from text matching the "$tick + name" pattern.
/// Only the first match is used. Returns empty strings when the pattern is
/// absent, so callers filter on an empty ticker.
pub fn extract_ticker_and_name(text: &str) -> CoinCandidate {
    match TICKER_AND_NAME.captures(text) {
        Some(caps) => CoinCandidate {
            ticker: caps[1].to_string(),
            name: caps[2].to_string(),
            description: text.to_string(),
        },
        None => CoinCandidate::default(),
    }
}
