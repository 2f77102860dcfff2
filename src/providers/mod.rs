pub mod geocode;
pub mod pricing;
pub mod route;

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;
use tracing::warn;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const USER_AGENT: &str = concat!("ride-hub/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service replied {0}")]
    UnexpectedStatus(StatusCode),

    #[error("malformed response: {0}")]
    Malformed(String),
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|err| {
            warn!(error = %err, "http client builder failed, using defaults");
            reqwest::Client::new()
        })
}
