//! License validation service
//!
//! One outbound call to the configured validation endpoint. There is no
//! bypass key; an invalid license is a hard boot failure for the caller
//! to enforce.

use anyhow::{bail, Context};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct LicenseResponse {
    valid: bool,
    #[serde(default)]
    reason: Option<String>,
}

/// Validate `key` against the license endpoint.
///
/// `Ok(true)` means accepted, `Ok(false)` rejected (with the reason
/// logged), `Err` means the endpoint could not be consulted.
pub async fn verify(
    client: &reqwest::Client,
    api_url: &str,
    key: &str,
) -> anyhow::Result<bool> {
    let response = client
        .post(api_url)
        .json(&json!({ "key": key }))
        .send()
        .await
        .context("license endpoint unreachable")?;

    if !response.status().is_success() {
        bail!("license endpoint returned {}", response.status());
    }

    let body: LicenseResponse = response
        .json()
        .await
        .context("license response was not valid JSON")?;
    if !body.valid {
        tracing::warn!(
            reason = %body.reason.unwrap_or_default(),
            "License key rejected"
        );
        return Ok(false);
    }
    Ok(true)
}
