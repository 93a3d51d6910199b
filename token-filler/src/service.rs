use crate::types::{CreateTokenRequest, Result, TokenCreateResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

/// Capability for driving the external creation form. Injected into the
/// service so tests can substitute a fake implementation.
#[async_trait]
pub trait TokenAutomation: Send + Sync {
    async fn create(&self, request: &CreateTokenRequest) -> Result<()>;
}

pub struct TokenService {
    automation: Arc<dyn TokenAutomation>,
}

impl TokenService {
    pub fn new(automation: Arc<dyn TokenAutomation>) -> Self {
        Self { automation }
    }

    /// Validate one descriptor and run it through the form automation.
    /// Failures of either step come back as a failed result, not an error.
    pub async fn create_token(&self, request: &CreateTokenRequest) -> TokenCreateResult {
        let problems = request.validate();
        if !problems.is_empty() {
            return TokenCreateResult::failed(problems.join("; "));
        }

        match self.automation.create(request).await {
            Ok(()) => {
                info!("Token created: {} ({})", request.name, request.symbol);
                TokenCreateResult::ok("Token creation process triggered.")
            }
            Err(e) => {
                error!("Token automation failed for {}: {}", request.name, e);
                TokenCreateResult::failed(e.to_string())
            }
        }
    }

    /// Process a batch of descriptors. A failing item never aborts the
    /// batch; each descriptor gets its own result, in input order.
    pub async fn batch_create(&self, requests: &[CreateTokenRequest]) -> Vec<TokenCreateResult> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.create_token(request).await);
        }
        results
    }
}
