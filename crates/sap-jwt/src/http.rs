//! HTTP transport seam
//!
//! The verifier never talks to the network directly. Document fetches and the
//! token exchange go through [`HttpClient`], which callers can replace (tests
//! use a recording implementation). [`ReqwestHttpClient`] is the default.
//!
//! Implementations must fail fast: return an error instead of hanging, so
//! timeouts belong to the transport.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// `User-Agent` sent with every outbound request
pub const USER_AGENT: &str = "appgyver/sap-jwt";

/// Transport failure
#[derive(Debug, Clone, Error)]
pub enum HttpError {
    /// The request could not be sent or the response could not be read
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The client could not be constructed
    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

/// Response from an outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a response
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// HTTP client for outbound requests (JWKS, OIDC discovery, token endpoint)
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue a GET request
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, HttpError>;

    /// Issue a POST with an `application/x-www-form-urlencoded` body
    async fn post_form(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        form: &[(&str, &str)],
    ) -> Result<HttpResponse, HttpError>;
}

/// [`HttpClient`] backed by `reqwest`
///
/// Redirects are not followed: a key endpoint that redirects elsewhere would
/// bypass the host checks done before the request.
#[cfg(feature = "reqwest-client")]
#[derive(Clone)]
pub struct ReqwestHttpClient {
    inner: reqwest::Client,
}

#[cfg(feature = "reqwest-client")]
impl ReqwestHttpClient {
    /// Create a client with redirects disabled and a 10 second timeout
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Client`] if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, HttpError> {
        let inner = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| HttpError::Client(e.to_string()))?;

        Ok(Self { inner })
    }

    /// Wrap an existing reqwest client
    ///
    /// # Warning
    /// Ensure the client is configured with `redirect::Policy::none()`.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { inner: client }
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<HttpResponse, HttpError> {
        let response = request
            .send()
            .await
            .map_err(|e| HttpError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| HttpError::Request(format!("failed to read response body: {e}")))?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(feature = "reqwest-client")]
#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, HttpError> {
        let mut request = self.inner.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        self.execute(request).await
    }

    async fn post_form(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        form: &[(&str, &str)],
    ) -> Result<HttpResponse, HttpError> {
        let mut request = self.inner.post(url).form(form);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        self.execute(request).await
    }
}

#[cfg(feature = "reqwest-client")]
impl std::fmt::Debug for ReqwestHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestHttpClient")
            .field("inner", &"<reqwest::Client>")
            .finish()
    }
}
