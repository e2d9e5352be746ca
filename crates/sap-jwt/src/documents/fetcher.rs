//! Single-shot document fetches

use super::{DocumentKind, OpenIdConfiguration};
use crate::error::{Error, Result};
use crate::http::{HttpClient, USER_AGENT};
use jsonwebtoken::jwk::JwkSet;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{error, info};

/// Fetches and decodes JWKS and OIDC discovery documents
///
/// Each call issues exactly one GET. There are no retries; a failure is
/// reported as [`Error::Fetch`] naming the document kind and URL.
#[derive(Clone)]
pub struct KeyDocumentFetcher {
    http: Arc<dyn HttpClient>,
}

impl KeyDocumentFetcher {
    /// Create a fetcher over `http`
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// Fetch the raw body of a document
    ///
    /// # Errors
    ///
    /// - [`Error::MissingInput`] if `url` is empty (no request is made)
    /// - [`Error::Fetch`] on transport failure or a non-2xx status
    pub async fn fetch_raw(&self, kind: DocumentKind, url: &str) -> Result<Vec<u8>> {
        if url.trim().is_empty() {
            return Err(Error::MissingInput(match kind {
                DocumentKind::Jwks => "JWKS URL",
                DocumentKind::OpenIdConfiguration => "OpenID configuration URL",
            }));
        }

        info!(kind = %kind, url = url, "Fetching key document");

        let response = self
            .http
            .get(
                url,
                &[("User-Agent", USER_AGENT), ("Accept", "application/json")],
            )
            .await
            .map_err(|e| {
                error!(kind = %kind, url = url, error = %e, "Key document request failed");
                Error::fetch(kind, url, e.to_string())
            })?;

        if !response.is_success() {
            error!(
                kind = %kind,
                url = url,
                status = response.status,
                "Key document endpoint returned error status"
            );
            return Err(Error::fetch(kind, url, format!("HTTP {}", response.status)));
        }

        Ok(response.body)
    }

    /// Fetch and decode a document
    ///
    /// # Errors
    ///
    /// As [`fetch_raw`](Self::fetch_raw), plus [`Error::Fetch`] if the body is
    /// not valid JSON for `T`.
    pub async fn fetch<T: DeserializeOwned>(&self, kind: DocumentKind, url: &str) -> Result<T> {
        let body = self.fetch_raw(kind, url).await?;
        decode_document(kind, url, &body)
    }

    /// Fetch a JWKS
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub async fn fetch_jwks(&self, url: &str) -> Result<JwkSet> {
        self.fetch(DocumentKind::Jwks, url).await
    }

    /// Fetch an OIDC discovery document
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub async fn fetch_openid_configuration(&self, url: &str) -> Result<OpenIdConfiguration> {
        self.fetch(DocumentKind::OpenIdConfiguration, url).await
    }
}

impl std::fmt::Debug for KeyDocumentFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyDocumentFetcher")
            .field("http", &"<dyn HttpClient>")
            .finish()
    }
}

pub(super) fn decode_document<T: DeserializeOwned>(
    kind: DocumentKind,
    url: &str,
    body: &[u8],
) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| {
        error!(kind = %kind, url = url, error = %e, "Failed to parse key document");
        Error::fetch(kind, url, format!("invalid JSON: {e}"))
    })
}
