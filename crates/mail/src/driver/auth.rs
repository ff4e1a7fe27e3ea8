//! OAuth2 access token refresh
//!
//! Connections store an access/refresh token pair. When the provider rejects
//! the access token, the driver trades the refresh token for a new one here.
//! A refresh answered with `invalid_grant` means the grant was revoked and is
//! surfaced as a fatal provider error.

use log::{info, warn};
use serde::Deserialize;

use super::api::TokenErrorResponse;
use crate::config::GmailCredentials;
use crate::error::{Error, ErrorKind, Result};

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    expires_in: Option<u64>,
}

/// Exchanges refresh tokens for access tokens
pub struct TokenRefresher {
    credentials: GmailCredentials,
}

impl TokenRefresher {
    /// Google OAuth2 token endpoint
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    pub fn new(credentials: GmailCredentials) -> Self {
        Self { credentials }
    }

    /// Request a fresh access token
    pub fn refresh(&self, agent: &ureq::Agent, refresh_token: &str) -> Result<String> {
        let mut response = agent
            .post(Self::TOKEN_URL)
            .send_form([
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .map_err(|e| Error::with_source(ErrorKind::Network, e.into()))?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| Error::with_source(ErrorKind::Network, e.into()))?;

        parse_token_response(status, &body)
    }
}

/// Interpret the token endpoint's answer
fn parse_token_response(status: u16, body: &str) -> Result<String> {
    if (200..300).contains(&status) {
        let token: TokenResponse = serde_json::from_str(body)
            .map_err(|e| Error::with_source(ErrorKind::Provider, e.into()))?;
        info!("Refreshed access token");
        return Ok(token.access_token);
    }

    match serde_json::from_str::<TokenErrorResponse>(body) {
        Ok(err) => {
            warn!(
                "Token refresh rejected: {} ({})",
                err.error,
                err.error_description.as_deref().unwrap_or("no description")
            );
            Err(Error::provider(err.error))
        }
        Err(_) => Err(Error::provider(format!("token refresh failed with status {}", status))),
    }
}
