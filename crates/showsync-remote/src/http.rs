use crate::error::RemoteError;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

pub fn create_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("showsync/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Turn a non-2xx response into a classified error.
pub async fn check_status(response: Response, what: &str) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response.text().await.unwrap_or_default();
    warn!("{} failed: {} - {}", what, status, error_text);
    Err(RemoteError::from_status(
        status.as_u16(),
        format!("{}: {}", what, error_text),
    ))
}

/// Read the body and decode it, keeping a short excerpt of bodies that fail to parse.
pub async fn parse_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, RemoteError> {
    let response_text = response.text().await?;
    serde_json::from_str(&response_text).map_err(|e| {
        warn!(
            "Failed to parse {} response as JSON: {}. Response length: {}",
            what,
            e,
            response_text.len()
        );
        if response_text.len() < 500 {
            debug!("{} raw response: {}", what, response_text);
        }
        RemoteError::Parse(format!("{}: {}", what, e))
    })
}

pub fn header_u32(response: &Response, name: &str) -> Option<u32> {
    response
        .headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse().ok())
}
