use crate::service::TokenAutomation;
use crate::types::{CreateTokenRequest, FillerError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, warn};

const CREATE_FORM_URL: &str = "https://www.doubleup.fun/pumpup/create";
const DEFAULT_MIGRATION_TARGET: &str = "Bluefin";

/// Fixed wait for the result page or popup to materialize after submitting.
/// There is no deeper verification of success than the absence of an error.
const SUBMIT_SETTLE: Duration = Duration::from_secs(5);

/// Drives the creation form in headless Chromium. A browser is launched per
/// submission and closed on every exit path.
pub struct BrowserTokenCreator {
    form_url: String,
}

impl BrowserTokenCreator {
    pub fn new() -> Self {
        Self {
            form_url: CREATE_FORM_URL.to_string(),
        }
    }

    pub fn with_form_url(mut self, url: impl Into<String>) -> Self {
        self.form_url = url.into();
        self
    }

    async fn fill_and_submit(&self, page: &Page, request: &CreateTokenRequest) -> Result<()> {
        page.goto(self.form_url.as_str()).await.map_err(browser_err)?;
        page.wait_for_navigation().await.map_err(browser_err)?;

        fill_input(page, r#"input[name="name"]"#, &request.name).await?;
        fill_input(page, r#"input[name="symbol"]"#, &request.symbol).await?;
        fill_input(page, r#"textarea[name="description"]"#, &request.description).await?;

        if let Some(image_url) = &request.image_url {
            fill_input(page, r#"input[name="imageUrl"]"#, image_url).await?;
        }

        // The extra options sit behind a disclosure; expand it when present.
        click_by_text(page, "show more options").await?;

        let target = request
            .migration_target
            .as_deref()
            .unwrap_or(DEFAULT_MIGRATION_TARGET);
        select_option(page, "select", target).await?;

        if let Some(link) = &request.twitter_link {
            fill_input(page, r#"input[name="twitterLink"]"#, link).await?;
        }
        if let Some(link) = &request.telegram_link {
            fill_input(page, r#"input[name="telegramLink"]"#, link).await?;
        }
        if let Some(link) = &request.website_link {
            fill_input(page, r#"input[name="websiteLink"]"#, link).await?;
        }

        click_by_text(page, "Create Token").await?;
        tokio::time::sleep(SUBMIT_SETTLE).await;

        Ok(())
    }
}

impl Default for BrowserTokenCreator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenAutomation for BrowserTokenCreator {
    async fn create(&self, request: &CreateTokenRequest) -> Result<()> {
        let config = BrowserConfig::builder()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .build()
            .map_err(FillerError::Browser)?;

        let (mut browser, mut handler) = Browser::launch(config).await.map_err(browser_err)?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let result = async {
            let page = browser.new_page("about:blank").await.map_err(browser_err)?;
            self.fill_and_submit(&page, request).await
        }
        .await;

        // Close on every exit path; a leaked Chromium subprocess outlives
        // the request.
        if let Err(e) = browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        let _ = handler_task.await;

        result
    }
}

fn browser_err(e: chromiumoxide::error::CdpError) -> FillerError {
    FillerError::Browser(e.to_string())
}

/// Escape a value for injection into a single-quoted JS string literal.
/// Values only ever land in string positions, never in code positions.
fn sanitize_js_string(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

async fn eval_success(page: &Page, script: String) -> Result<bool> {
    let result = page.evaluate(script).await.map_err(browser_err)?;
    let value: serde_json::Value = result
        .into_value()
        .map_err(|e| FillerError::Automation(format!("failed to read script result: {e:?}")))?;

    Ok(value
        .as_object()
        .and_then(|o| o.get("success"))
        .and_then(|v| v.as_bool())
        .unwrap_or(false))
}

async fn fill_input(page: &Page, selector: &str, value: &str) -> Result<()> {
    let script = format!(
        r#"(() => {{
            const el = document.querySelector('{}');
            if (el) {{
                el.value = '{}';
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                return {{ success: true }};
            }}
            return {{ success: false }};
        }})()"#,
        sanitize_js_string(selector),
        sanitize_js_string(value)
    );

    if eval_success(page, script).await? {
        Ok(())
    } else {
        Err(FillerError::Automation(format!(
            "form element {} not found",
            selector
        )))
    }
}

async fn select_option(page: &Page, selector: &str, value: &str) -> Result<()> {
    let script = format!(
        r#"(() => {{
            const sel = document.querySelector('{}');
            if (sel) {{
                sel.value = '{}';
                sel.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return {{ success: true }};
            }}
            return {{ success: false }};
        }})()"#,
        sanitize_js_string(selector),
        sanitize_js_string(value)
    );

    if eval_success(page, script).await? {
        Ok(())
    } else {
        Err(FillerError::Automation(format!(
            "select element {} not found",
            selector
        )))
    }
}

/// Click the first element whose text contains the given fragment. A missing
/// element is not an error; the form hides some controls behind state.
async fn click_by_text(page: &Page, text: &str) -> Result<()> {
    let script = format!(
        r#"(() => {{
            const nodes = [...document.querySelectorAll('button, a, span, div')];
            const target = nodes.find(
                (n) => n.textContent && n.textContent.trim().toLowerCase().includes('{}')
            );
            if (target) {{ target.click(); return {{ success: true }}; }}
            return {{ success: false }};
        }})()"#,
        sanitize_js_string(&text.to_lowercase())
    );

    if !eval_success(page, script).await? {
        debug!("No element with text {:?} found, continuing", text);
    }
    Ok(())
}
