use crate::types::{Result, Tweet, WatcherError};
use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{error, info, warn};

const DEFAULT_UPLOAD_URL: &str = "https://api.imgbb.com/1/upload";

const CARD_WIDTH: u32 = 550;
const CARD_HEIGHT: u32 = 400;

/// Settle time after the DOM reports all images loaded.
const RENDER_SETTLE: Duration = Duration::from_millis(500);

/// Capability for turning a record into a hosted image. Injected into the
/// poll loop so tests can substitute a fake implementation.
#[async_trait]
pub trait TweetImager: Send + Sync {
    async fn render(&self, tweet: &Tweet) -> Result<Vec<u8>>;

    /// Upload an image, returning its public URL. `None` means the host
    /// rejected the upload; that is not an error.
    async fn upload(&self, image: &[u8]) -> Result<Option<String>>;

    /// Render and upload, downgrading every failure to `None`. The poll loop
    /// must survive a record whose image cannot be produced.
    async fn render_and_upload(&self, tweet: &Tweet) -> Option<String> {
        let image = match self.render(tweet).await {
            Ok(image) => image,
            Err(e) => {
                error!("Failed to render tweet {}: {}", tweet.id, e);
                return None;
            }
        };

        match self.upload(&image).await {
            Ok(url) => url,
            Err(e) => {
                error!("Error uploading image for tweet {}: {}", tweet.id, e);
                None
            }
        }
    }
}

/// Renders a record as a styled card in headless Chromium and uploads the
/// screenshot to the image host.
pub struct ChromiumImager {
    client: reqwest::Client,
    upload_url: String,
    imgbb_key: String,
}

impl ChromiumImager {
    pub fn new(imgbb_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            imgbb_key: imgbb_key.into(),
        }
    }

    pub fn with_upload_url(mut self, url: impl Into<String>) -> Self {
        self.upload_url = url.into();
        self
    }

    async fn render_card(page: &Page, tweet: &Tweet) -> Result<Vec<u8>> {
        page.set_content(build_tweet_html(tweet))
            .await
            .map_err(browser_err)?;

        // Let every <img> finish loading (or erroring) before the shot.
        page.evaluate(WAIT_FOR_IMAGES_JS).await.map_err(browser_err)?;
        tokio::time::sleep(RENDER_SETTLE).await;

        let card = page
            .find_element(".tweet-container")
            .await
            .map_err(browser_err)?;
        card.screenshot(CaptureScreenshotFormat::Png)
            .await
            .map_err(browser_err)
    }
}

#[async_trait]
impl TweetImager for ChromiumImager {
    async fn render(&self, tweet: &Tweet) -> Result<Vec<u8>> {
        let config = BrowserConfig::builder()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .viewport(Viewport {
                width: CARD_WIDTH,
                height: CARD_HEIGHT,
                device_scale_factor: Some(2.0),
                ..Default::default()
            })
            .build()
            .map_err(WatcherError::Browser)?;

        let (mut browser, mut handler) = Browser::launch(config).await.map_err(browser_err)?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let result = async {
            let page = browser.new_page("about:blank").await.map_err(browser_err)?;
            Self::render_card(&page, tweet).await
        }
        .await;

        // The browser must be closed on every exit path; a leaked Chromium
        // subprocess outlives the render call.
        if let Err(e) = browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        let _ = handler_task.await;

        result
    }

    async fn upload(&self, image: &[u8]) -> Result<Option<String>> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let form = reqwest::multipart::Form::new().text("image", encoded);

        let response = self
            .client
            .post(&self.upload_url)
            .query(&[("key", self.imgbb_key.as_str())])
            .multipart(form)
            .send()
            .await?;

        let upload: UploadResponse = response.json().await?;
        if upload.success {
            info!("Tweet image uploaded successfully");
            Ok(upload.data.map(|d| d.url).filter(|u| !u.is_empty()))
        } else {
            error!("Failed to upload image: host reported success=false");
            Ok(None)
        }
    }
}

fn browser_err(e: chromiumoxide::error::CdpError) -> WatcherError {
    WatcherError::Browser(e.to_string())
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<UploadData>,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    #[serde(default)]
    url: String,
}

const WAIT_FOR_IMAGES_JS: &str = r#"
new Promise((resolve) => {
  const images = document.querySelectorAll('img');
  if (images.length === 0) { resolve(true); return; }
  let loaded = 0;
  const done = () => { loaded++; if (loaded === images.length) resolve(true); };
  images.forEach((img) => {
    if (img.complete) { done(); }
    else {
      img.addEventListener('load', done);
      img.addEventListener('error', done);
    }
  });
})
"#;

static HASHTAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#(\w+)").unwrap());
static MENTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@(\w+)").unwrap());
static CASHTAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$(\w+)").unwrap());
static SHORT_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(https://t\.co/\w+)").unwrap());

const VERIFIED_BADGE: &str = r#"<svg viewBox="0 0 22 22" aria-label="Verified account" role="img" style="width: 16px; height: 16px; margin-left: 4px; vertical-align: middle; display: inline-block;"><g><path fill="#1DA1F2" d="M20.396 11c-.018-.646-.215-1.275-.57-1.816-.354-.54-.852-.972-1.438-1.246.223-.607.27-1.264.14-1.897-.131-.634-.437-1.218-.882-1.687-.47-.445-1.053-.75-1.687-.882-.633-.13-1.29-.083-1.897.14-.273-.587-.704-1.086-1.245-1.44S11.647 1.62 11 1.604c-.646.017-1.273.213-1.813.568s-.969.854-1.24 1.44c-.608-.223-1.267-.272-1.902-.14-.635.13-1.22.436-1.69.882-.445.47-.749 1.055-.878 1.688-.13.633-.08 1.29.144 1.896-.587.274-1.087.705-1.443 1.245-.356.54-.555 1.17-.574 1.817.02.647.218 1.276.574 1.817.356.54.856.972 1.443 1.245-.224.606-.274 1.263-.144 1.896.13.634.433 1.218.877 1.688.47.443 1.054.747 1.687.878.633.132 1.29.084 1.897-.136.274.586.705 1.084 1.246 1.439.54.354 1.17.551 1.816.569.647-.016 1.276-.213 1.817-.567s.972-.854 1.245-1.44c.604.239 1.266.296 1.903.164.636-.132 1.22-.447 1.68-.907.46-.46.776-1.044.908-1.681s.075-1.299-.165-1.903c.586-.274 1.084-.705 1.439-1.246.354-.54.551-1.17.569-1.816zM9.662 14.85l-3.429-3.428 1.293-1.302 2.072 2.072 4.4-4.794 1.347 1.246z"></path></g></svg>"#;

const TWEET_CARD_CSS: &str = r#"
body {
  margin: 0;
  padding: 0;
  background-color: white;
  font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif;
}
.tweet-container {
  width: 500px;
  padding: 16px;
  border: 1px solid #e1e8ed;
  border-radius: 12px;
  margin: 16px auto;
  background-color: white;
}
.tweet-header {
  display: flex;
  align-items: center;
  margin-bottom: 12px;
}
.profile-image {
  width: 48px;
  height: 48px;
  border-radius: 50%;
  margin-right: 12px;
}
.user-info {
  flex: 1;
}
.user-name {
  font-weight: bold;
  font-size: 15px;
  color: #14171a;
  margin: 0;
  display: flex;
  align-items: center;
}
.user-handle {
  color: #657786;
  font-size: 15px;
  margin: 0;
}
.tweet-content {
  font-size: 16px;
  line-height: 1.4;
  color: #14171a;
  margin-bottom: 12px;
  white-space: pre-wrap;
  word-wrap: break-word;
}
.tweet-date {
  color: #657786;
  font-size: 14px;
}
"#;

/// Build the HTML card for a record: avatar, display name with optional
/// verified badge, handle, colorized text, and a formatted timestamp.
pub fn build_tweet_html(tweet: &Tweet) -> String {
    let name = escape_html(&tweet.user.name);
    let handle = escape_html(&tweet.user.screen_name);
    let content = colorize(&escape_html(&tweet.text)).replace('\n', "<br>");
    let badge = if tweet.user.verified { VERIFIED_BADGE } else { "" };
    let date = tweet.created_at.format("%-I:%M %p · %b %-d, %Y");

    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="UTF-8">
    <style>{css}</style>
  </head>
  <body>
    <div class="tweet-container">
      <div class="tweet-header">
        <img class="profile-image" src="{avatar}" alt="{name}" />
        <div class="user-info">
          <p class="user-name">{name}{badge}</p>
          <p class="user-handle">@{handle}</p>
        </div>
      </div>
      <div class="tweet-content">{content}</div>
      <div class="tweet-date">{date}</div>
    </div>
  </body>
</html>"#,
        css = TWEET_CARD_CSS,
        avatar = escape_html(&tweet.user.profile_image_url),
        name = name,
        badge = badge,
        handle = handle,
        content = content,
        date = date,
    )
}

/// Wrap hashtags, mentions, cashtags, and short links in accent-colored
/// spans, mirroring how the post reads on the platform.
fn colorize(text: &str) -> String {
    let text = HASHTAG.replace_all(text, r#"<span style="color: #1DA1F2;">#$1</span>"#);
    let text = MENTION.replace_all(&text, r#"<span style="color: #1DA1F2;">@$1</span>"#);
    let text = CASHTAG.replace_all(&text, r#"<span style="color: #1DA1F2;">$$$1</span>"#);
    SHORT_LINK
        .replace_all(&text, r#"<span style="color: #1DA1F2;">$1</span>"#)
        .into_owned()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
