//! Shared HTTP plumbing for the REST clients.

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::error::FetchError;

/// Build the pooled HTTP client shared by every exchange client.
///
/// `timeout` bounds each individual request.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("spread-collector/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")
}

/// Send a request and decode a JSON body.
///
/// Non-success statuses become [`FetchError::Status`] carrying the body text.
/// The body is read as text first so a malformed payload is reported as a
/// decode error and not as a transport failure.
pub async fn fetch_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, FetchError> {
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FetchError::Status { status, body });
    }

    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}
