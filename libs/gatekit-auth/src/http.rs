//! Shared outbound HTTP plumbing for key-set, credential and membership calls.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::errors::TransportError;

/// Build the process-wide client with a fixed request timeout.
///
/// # Errors
///
/// Returns [`TransportError::Client`] if the TLS backend cannot initialize.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, TransportError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(TransportError::Client)
}

/// Send `request`, require a 2xx status and decode the JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    url: &str,
) -> Result<T, TransportError> {
    let response = request.send().await.map_err(|source| TransportError::Request {
        url: url.to_owned(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Status {
            url: url.to_owned(),
            status: status.as_u16(),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|source| TransportError::Request {
            url: url.to_owned(),
            source,
        })?;

    serde_json::from_slice(&body).map_err(|e| TransportError::InvalidResponse {
        url: url.to_owned(),
        reason: e.to_string(),
    })
}
