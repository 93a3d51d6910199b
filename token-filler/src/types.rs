use serde::{Deserialize, Serialize};

/// Token descriptor accepted by the creation endpoints (camelCase on the wire).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenRequest {
    pub name: String,
    pub symbol: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migration_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_link: Option<String>,
}

impl CreateTokenRequest {
    /// Validate required fields and optional URL fields. Returns every
    /// problem found, not just the first.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("name must not be empty".to_string());
        }
        if self.symbol.trim().is_empty() {
            errors.push("symbol must not be empty".to_string());
        }
        if self.description.trim().is_empty() {
            errors.push("description must not be empty".to_string());
        }

        let links = [
            ("imageUrl", &self.image_url),
            ("twitterLink", &self.twitter_link),
            ("telegramLink", &self.telegram_link),
            ("websiteLink", &self.website_link),
        ];
        for (field, value) in links {
            if let Some(value) = value {
                if url::Url::parse(value).is_err() {
                    errors.push(format!("{} must be a valid URL", field));
                }
            }
        }

        errors
    }
}

/// Per-item outcome. Batch responses carry one of these per descriptor, in
/// input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCreateResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TokenCreateResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FillerError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Token automation failed: {0}")]
    Automation(String),
}

pub type Result<T> = std::result::Result<T, FillerError>;
