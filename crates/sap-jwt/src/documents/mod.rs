//! # Remote key documents
//!
//! Fetching and caching of the two documents the verifier needs from an
//! identity provider:
//!
//! - **JWKS** - the key set used to check token signatures
//! - **OpenID configuration** - discovery metadata at
//!   `{site}/.well-known/openid-configuration`, whose `jwks_uri` names the JWKS
//!
//! [`KeyDocumentFetcher`] performs one GET per call. [`DocumentCache`] puts a
//! TTL store in front of it so repeated verifications reuse documents for up
//! to 30 minutes.

mod cache;
mod fetcher;

pub use cache::{DEFAULT_NAMESPACE, DEFAULT_TTL, DocumentCache};
pub use fetcher::KeyDocumentFetcher;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Path of the OIDC discovery document relative to the provider site
pub const OPENID_CONFIGURATION_PATH: &str = "/.well-known/openid-configuration";

/// The kinds of documents fetched from an identity provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// JSON Web Key Set
    Jwks,
    /// OIDC discovery metadata
    OpenIdConfiguration,
}

impl DocumentKind {
    /// Stable name used in cache keys and error messages
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jwks => "jwks",
            Self::OpenIdConfiguration => "openid-configuration",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OIDC discovery document
///
/// `jwks_uri` is what the verifier follows. `issuer` and `token_endpoint` are
/// typed for callers that pass them on, for example to
/// [`TokenExchangeClient::exchange`](crate::exchange::TokenExchangeClient::exchange).
/// Everything else is kept in `additional`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenIdConfiguration {
    /// Issuer identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// Location of the provider's JWKS
    pub jwks_uri: String,

    /// Token endpoint, used for the jwt-bearer exchange
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,

    /// All other metadata
    #[serde(flatten)]
    pub additional: HashMap<String, serde_json::Value>,
}

/// Discovery document URL for a provider site
///
/// ```rust
/// use sap_jwt::documents::openid_configuration_url;
///
/// assert_eq!(
///     openid_configuration_url("https://tenant.example.com/"),
///     "https://tenant.example.com/.well-known/openid-configuration"
/// );
/// ```
pub fn openid_configuration_url(site: &str) -> String {
    format!(
        "{}{}",
        site.trim_end_matches('/'),
        OPENID_CONFIGURATION_PATH
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(DocumentKind::Jwks.to_string(), "jwks");
        assert_eq!(
            DocumentKind::OpenIdConfiguration.to_string(),
            "openid-configuration"
        );
    }

    #[test]
    fn test_openid_configuration_url() {
        assert_eq!(
            openid_configuration_url("https://tenant.example.com"),
            "https://tenant.example.com/.well-known/openid-configuration"
        );
        assert_eq!(
            openid_configuration_url("https://tenant.example.com//"),
            "https://tenant.example.com/.well-known/openid-configuration"
        );
    }

    #[test]
    fn test_openid_configuration_keeps_unknown_fields() {
        let config: OpenIdConfiguration = serde_json::from_str(
            r#"{
                "issuer": "https://tenant.example.com/oauth/token",
                "jwks_uri": "https://tenant.example.com/token_keys",
                "token_endpoint": "https://tenant.example.com/oauth/token",
                "grant_types_supported": ["urn:ietf:params:oauth:grant-type:jwt-bearer"]
            }"#,
        )
        .unwrap();

        assert_eq!(config.jwks_uri, "https://tenant.example.com/token_keys");
        assert_eq!(
            config.token_endpoint.as_deref(),
            Some("https://tenant.example.com/oauth/token")
        );
        assert!(config.additional.contains_key("grant_types_supported"));
    }

    #[test]
    fn test_openid_configuration_requires_jwks_uri() {
        let result = serde_json::from_str::<OpenIdConfiguration>(r#"{"issuer": "x"}"#);
        assert!(result.is_err());
    }
}
