use crate::types::{Tweet, TweetAuthor};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{error, info};

const TIMELINE_ITEM: &str = "TimelineTimelineItem";
const VISIBILITY_WRAPPER: &str = "TweetWithVisibilityResults";

/// Twitter's `created_at` format, e.g. "Wed Oct 10 20:19:24 +0000 2018".
const TWITTER_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

// Raw shape of the search endpoint's timeline payload. Every level below the
// root is optional or defaulted, so absent substructure can never fail
// deserialization; only a missing legacy block drops a record, and that is
// handled (and logged) per entry in `collect_tweets`.

#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Option<SearchData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchData {
    #[serde(default)]
    pub search_by_raw_query: Option<SearchByRawQuery>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchByRawQuery {
    #[serde(default)]
    pub search_timeline: Option<SearchTimeline>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchTimeline {
    #[serde(default)]
    pub timeline: Option<Timeline>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Instruction {
    #[serde(default)]
    pub entries: Vec<TimelineEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TimelineEntry {
    #[serde(default)]
    pub content: Option<EntryContent>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EntryContent {
    #[serde(rename = "__typename", default)]
    pub typename: String,
    #[serde(default)]
    pub content: Option<ItemContent>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemContent {
    #[serde(default)]
    pub tweet_results: Option<TweetResults>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TweetResults {
    #[serde(default)]
    pub result: Option<TweetResult>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TweetResult {
    #[serde(rename = "__typename", default)]
    pub typename: String,
    /// Present only on the visibility-results indirection layer.
    #[serde(default)]
    pub tweet: Option<Box<TweetResult>>,
    #[serde(default)]
    pub rest_id: String,
    #[serde(default)]
    pub core: Option<TweetCore>,
    #[serde(default)]
    pub legacy: Option<TweetLegacy>,
    #[serde(default)]
    pub view_count_info: Option<ViewCountInfo>,
}

impl TweetResult {
    fn unwrap_visibility(self) -> TweetResult {
        if self.typename == VISIBILITY_WRAPPER {
            if let Some(inner) = self.tweet {
                return *inner;
            }
        }
        self
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TweetCore {
    #[serde(default)]
    pub user_results: Option<UserResults>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserResults {
    #[serde(default)]
    pub result: Option<UserResult>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserResult {
    #[serde(default)]
    pub rest_id: String,
    #[serde(default)]
    pub core: Option<UserCore>,
    #[serde(default)]
    pub avatar: Option<ImageRef>,
    #[serde(default)]
    pub banner: Option<ImageRef>,
    #[serde(default)]
    pub location: Option<UserLocation>,
    #[serde(default)]
    pub profile_bio: Option<ProfileBio>,
    #[serde(default)]
    pub relationship_counts: Option<RelationshipCounts>,
    #[serde(default)]
    pub tweet_counts: Option<TweetCounts>,
    #[serde(default)]
    pub action_counts: Option<ActionCounts>,
    #[serde(default)]
    pub verification: Option<Verification>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserCore {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub screen_name: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImageRef {
    #[serde(default)]
    pub image_url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserLocation {
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileBio {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub entities: Option<BioEntities>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BioEntities {
    #[serde(default)]
    pub url: Option<BioUrls>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BioUrls {
    #[serde(default)]
    pub urls: Vec<UrlEntity>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RelationshipCounts {
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub following: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct TweetCounts {
    #[serde(default)]
    pub tweets: u64,
    #[serde(default)]
    pub media_tweets: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActionCounts {
    #[serde(default)]
    pub favorites_count: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct Verification {
    #[serde(default)]
    pub is_blue_verified: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct TweetLegacy {
    #[serde(default)]
    pub full_text: String,
    #[serde(default)]
    pub user_id_str: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub in_reply_to_status_id_str: Option<String>,
    #[serde(default)]
    pub favorite_count: u64,
    #[serde(default)]
    pub quote_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub bookmark_count: u64,
    #[serde(default)]
    pub entities: Option<TweetEntities>,
    #[serde(default)]
    pub extended_entities: Option<ExtendedEntities>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TweetEntities {
    #[serde(default)]
    pub urls: Vec<UrlEntity>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct UrlEntity {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub expanded_url: String,
    #[serde(default)]
    pub display_url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExtendedEntities {
    #[serde(default)]
    pub media: Vec<MediaEntity>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MediaEntity {
    #[serde(default)]
    pub media_url_https: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewCountInfo {
    #[serde(default)]
    pub count: String,
}

impl SearchResponse {
    fn entries(self) -> Vec<TimelineEntry> {
        self.data
            .and_then(|d| d.search_by_raw_query)
            .and_then(|s| s.search_timeline)
            .and_then(|t| t.timeline)
            .map(|t| t.instructions)
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|i| i.entries)
            .unwrap_or_default()
    }
}

/// Flatten the nested timeline payload into domain records, preserving API
/// order (newest first). Entries that are not timeline items, lack a tweet
/// result, or lack the legacy block are dropped with a diagnostic; they are
/// never surfaced as errors.
pub fn collect_tweets(response: SearchResponse) -> Vec<Tweet> {
    let mut tweets = Vec::new();

    for entry in response.entries() {
        let Some(content) = entry.content else {
            continue;
        };
        if content.typename != TIMELINE_ITEM {
            continue;
        }

        let result = content
            .content
            .and_then(|c| c.tweet_results)
            .and_then(|r| r.result);
        let Some(result) = result else {
            error!("Invalid response structure while fetching search: entry without tweet result");
            continue;
        };

        let TweetResult {
            rest_id,
            core,
            legacy,
            view_count_info,
            ..
        } = result.unwrap_visibility();

        let Some(legacy) = legacy else {
            info!("Tweet result {} does not have legacy data, skipping", rest_id);
            continue;
        };

        tweets.push(build_tweet(rest_id, core, legacy, view_count_info));
    }

    tweets
}

fn build_tweet(
    rest_id: String,
    core: Option<TweetCore>,
    legacy: TweetLegacy,
    view_count_info: Option<ViewCountInfo>,
) -> Tweet {
    let user = build_author(core.and_then(|c| c.user_results).and_then(|u| u.result));

    let url_entities = legacy.entities.map(|e| e.urls).unwrap_or_default();
    let processed_text = expand_short_links(&legacy.full_text, &url_entities);

    let medias = legacy
        .extended_entities
        .map(|e| {
            e.media
                .into_iter()
                .map(|m| m.media_url_https)
                .filter(|u| !u.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let view_count = view_count_info
        .map(|v| v.count.parse().unwrap_or(0))
        .unwrap_or(0);

    Tweet {
        id: rest_id,
        user_id: legacy.user_id_str,
        text: legacy.full_text,
        processed_text,
        medias,
        is_reply: legacy.in_reply_to_status_id_str.is_some(),
        related_tweet_id: legacy.in_reply_to_status_id_str.unwrap_or_default(),
        favorite_count: legacy.favorite_count,
        quote_count: legacy.quote_count,
        reply_count: legacy.reply_count,
        retweet_count: legacy.retweet_count,
        bookmark_count: legacy.bookmark_count,
        view_count,
        created_at: parse_twitter_time(&legacy.created_at),
        user,
    }
}

fn build_author(user: Option<UserResult>) -> TweetAuthor {
    let user = user.unwrap_or_default();
    let core = user.core.unwrap_or_default();
    let bio = user.profile_bio.unwrap_or_default();
    let counts = user.relationship_counts.unwrap_or_default();
    let tweet_counts = user.tweet_counts.unwrap_or_default();

    let website = bio
        .entities
        .and_then(|e| e.url)
        .and_then(|u| u.urls.into_iter().next())
        .map(|u| u.expanded_url)
        .unwrap_or_default();

    TweetAuthor {
        id: user.rest_id,
        name: core.name,
        screen_name: core.screen_name,
        location: user.location.map(|l| l.location).unwrap_or_default(),
        description: bio.description,
        website,
        followers_count: counts.followers,
        following_count: counts.following,
        favourites_count: user
            .action_counts
            .map(|a| a.favorites_count)
            .unwrap_or_default(),
        statuses_count: tweet_counts.tweets,
        media_count: tweet_counts.media_tweets,
        verified: user
            .verification
            .map(|v| v.is_blue_verified)
            .unwrap_or_default(),
        profile_image_url: user.avatar.map(|a| a.image_url).unwrap_or_default(),
        profile_banner_url: user.banner.map(|b| b.image_url).unwrap_or_default(),
        created_at: parse_twitter_time(&core.created_at),
    }
}

/// Replace each short-link entity with its expanded form, one occurrence per
/// entity, in entity-list order. Entities sharing the same literal substring
/// consume successive occurrences; behavior for overlapping-but-unequal
/// literals is inherited from exact-string matching.
pub fn expand_short_links(text: &str, urls: &[UrlEntity]) -> String {
    let mut processed = text.to_string();
    for entity in urls {
        if entity.url.is_empty() {
            continue;
        }
        processed = processed.replacen(&entity.url, &entity.expanded_url, 1);
    }
    processed
}

pub fn parse_twitter_time(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_str(raw, TWITTER_TIME_FORMAT)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
