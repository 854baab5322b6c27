//! Token refresh wire call
//!
//! POSTs the current refresh token to the backend's dedicated refresh
//! endpoint and parses the fresh pair out of the response envelope. This is
//! the only endpoint the session talks to directly; everything else goes
//! through the request client, which calls into here from its 401 path.

use serde::Deserialize;
use tracing::debug;

use crate::constants::REFRESH_ROUTE;
use crate::error::{Error, Result};
use crate::session::TokenPair;

/// Backend response envelope for the refresh endpoint.
///
/// The payload sits under `data`, like every other endpoint of this API.
#[derive(Debug, Deserialize)]
struct RefreshEnvelope {
    data: TokenPair,
}

/// Exchange the current refresh token for a fresh pair.
///
/// Any non-success status is a refresh failure. 401/403 are reported as
/// rejected credentials and everything else as a refresh error; callers
/// treat both the same way (session end) but the distinction is kept for
/// the logs.
pub async fn refresh(
    client: &reqwest::Client,
    base_url: &str,
    refresh_token: &str,
) -> Result<TokenPair> {
    let url = format!("{}{}", base_url.trim_end_matches('/'), REFRESH_ROUTE);
    let response = client
        .post(&url)
        .json(&serde_json::json!({ "refresh_token": refresh_token }))
        .send()
        .await
        .map_err(|e| Error::Http(format!("refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        // 401/403 means the refresh token is expired or revoked
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Error::RefreshRejected(format!(
                "refresh endpoint returned {status}: {body}"
            )));
        }

        return Err(Error::Refresh(format!(
            "refresh endpoint returned {status}: {body}"
        )));
    }

    let envelope = response
        .json::<RefreshEnvelope>()
        .await
        .map_err(|e| Error::Refresh(format!("invalid refresh response: {e}")))?;
    debug!("obtained fresh token pair");
    Ok(envelope.data)
}
