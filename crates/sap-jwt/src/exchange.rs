//! JWT bearer token exchange
//!
//! Trades a verified user token for a token issued to this application, using
//! the `urn:ietf:params:oauth:grant-type:jwt-bearer` grant against the
//! identity provider's token endpoint (usually taken from the
//! `token_endpoint` of its OpenID configuration).

use crate::error::{Error, Result};
use crate::http::{HttpClient, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

/// Grant type sent to the token endpoint
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Parameters of one jwt-bearer exchange
#[derive(Debug, Clone)]
pub struct JwtBearerRequest {
    /// OAuth client id of this application
    pub client_id: String,
    /// OAuth client secret of this application
    pub client_secret: SecretString,
    /// Token to exchange
    pub assertion: String,
    /// Requested token format (default `jwt`)
    pub token_format: String,
    /// Requested response type (default `token`)
    pub response_type: String,
}

impl JwtBearerRequest {
    /// Create a request with default token format and response type
    pub fn new(
        client_id: impl Into<String>,
        client_secret: SecretString,
        assertion: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            assertion: assertion.into(),
            token_format: "jwt".to_string(),
            response_type: "token".to_string(),
        }
    }
}

/// Token endpoint response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Issued access token
    pub access_token: String,
    /// Token type, normally `bearer`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Lifetime in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Refresh token, if issued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Granted scopes, space separated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Provider-specific fields
    #[serde(flatten)]
    pub additional: HashMap<String, serde_json::Value>,
}

/// Client for the jwt-bearer grant
#[derive(Clone)]
pub struct TokenExchangeClient {
    http: Arc<dyn HttpClient>,
}

impl TokenExchangeClient {
    /// Create a client posting through `http`
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// Exchange `request.assertion` at `token_endpoint`
    ///
    /// # Errors
    ///
    /// - [`Error::MissingInput`] if the endpoint or assertion is empty
    /// - [`Error::TokenExchange`] on transport failure, a non-2xx status, or
    ///   an undecodable response
    pub async fn exchange(
        &self,
        token_endpoint: &str,
        request: &JwtBearerRequest,
    ) -> Result<TokenResponse> {
        if token_endpoint.trim().is_empty() {
            return Err(Error::MissingInput("token endpoint"));
        }
        if request.assertion.is_empty() {
            return Err(Error::MissingInput("assertion"));
        }

        info!(
            token_endpoint = token_endpoint,
            client_id = %request.client_id,
            "Exchanging token with jwt-bearer grant"
        );

        let form = [
            ("client_id", request.client_id.as_str()),
            ("client_secret", request.client_secret.expose_secret().as_str()),
            ("grant_type", JWT_BEARER_GRANT_TYPE),
            ("token_format", request.token_format.as_str()),
            ("response_type", request.response_type.as_str()),
            ("assertion", request.assertion.as_str()),
        ];

        let response = self
            .http
            .post_form(
                token_endpoint,
                &[("User-Agent", USER_AGENT), ("Accept", "application/json")],
                &form,
            )
            .await
            .map_err(|e| exchange_error(token_endpoint, e.to_string()))?;

        if !response.is_success() {
            return Err(exchange_error(
                token_endpoint,
                format!("HTTP {}", response.status),
            ));
        }

        response
            .json()
            .map_err(|e| exchange_error(token_endpoint, format!("invalid token response: {e}")))
    }
}

fn exchange_error(url: &str, reason: String) -> Error {
    error!(token_endpoint = url, reason = %reason, "Token exchange failed");
    Error::TokenExchange {
        url: url.to_string(),
        reason,
    }
}

impl std::fmt::Debug for TokenExchangeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenExchangeClient")
            .field("http", &"<dyn HttpClient>")
            .finish()
    }
}
