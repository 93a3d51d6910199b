use crate::service::TokenService;
use crate::types::{CreateTokenRequest, TokenCreateResult};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use tracing::info;

pub fn router(service: Arc<TokenService>) -> Router {
    Router::new()
        .route("/token/auto-create", post(auto_create))
        .route("/token/batch-auto-create", post(batch_auto_create))
        .with_state(service)
}

async fn auto_create(
    State(service): State<Arc<TokenService>>,
    Json(request): Json<CreateTokenRequest>,
) -> (StatusCode, Json<TokenCreateResult>) {
    let problems = request.validate();
    if !problems.is_empty() {
        let result = TokenCreateResult::failed(problems.join("; "));
        return (StatusCode::BAD_REQUEST, Json(result));
    }

    let result = service.create_token(&request).await;
    let status = if result.success {
        StatusCode::CREATED
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(result))
}

/// Batch creation never aborts on a single descriptor: every item is
/// validated and processed independently, and the response carries one
/// result per item in input order.
async fn batch_auto_create(
    State(service): State<Arc<TokenService>>,
    Json(requests): Json<Vec<CreateTokenRequest>>,
) -> (StatusCode, Json<Vec<TokenCreateResult>>) {
    info!("Batch auto-create with {} descriptors", requests.len());
    let results = service.batch_create(&requests).await;
    (StatusCode::CREATED, Json(results))
}
