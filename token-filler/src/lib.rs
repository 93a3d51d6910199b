pub mod browser;
pub mod routes;
pub mod service;
pub mod types;

pub use browser::BrowserTokenCreator;
pub use routes::router;
pub use service::{TokenAutomation, TokenService};
pub use types::{CreateTokenRequest, FillerError, TokenCreateResult};
