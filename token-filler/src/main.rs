use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use token_filler::{router, BrowserTokenCreator, TokenService};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let automation = Arc::new(BrowserTokenCreator::new());
    let service = Arc::new(TokenService::new(automation));
    let app = router(service);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Token filler listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

    let filter = EnvFilter::new(&log_level);
    if app_env == "development" {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    }
}
