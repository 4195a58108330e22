//! Credential pair model and the refresh-token exchange call.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AuthError, Result};

/// Access/refresh token pair issued by the token endpoint at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    /// Short-lived bearer token attached to API calls.
    pub access: String,
    /// Longer-lived token used solely to obtain a new access token.
    pub refresh: String,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

/// Exchange a refresh token for a new access token.
///
/// Calls `POST {base}/token/refresh/` with `{"refresh": <token>}` and expects
/// a 2xx response with `{"access": <token>}`. A single attempt is made; any
/// other status or body shape is an error.
pub async fn refresh_access_token(
    http: &reqwest::Client,
    base_url: &Url,
    refresh_token: &str,
) -> Result<String> {
    let url = base_url
        .join("token/refresh/")
        .map_err(|e| AuthError::Backend(format!("Invalid token endpoint URL: {}", e)))?;

    let response = http
        .post(url)
        .json(&RefreshRequest {
            refresh: refresh_token,
        })
        .send()
        .await
        .map_err(|e| AuthError::Network(format!("Token refresh request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(AuthError::Backend(format!(
            "Token refresh failed ({}): {}",
            status, body
        )));
    }

    let parsed: RefreshResponse = response
        .json()
        .await
        .map_err(|e| AuthError::Backend(format!("Failed to parse refresh response: {}", e)))?;

    Ok(parsed.access)
}
