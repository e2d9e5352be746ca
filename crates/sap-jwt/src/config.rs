//! Verification configuration types
//!
//! [`TrustConfig`] describes what one verification call expects from a token.
//! [`VerifierOptions`] holds the decode settings shared by every call made
//! through a verifier.

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};

/// Per-call expectations for a token
///
/// # Example
///
/// ```rust
/// use sap_jwt::TrustConfig;
///
/// let trust = TrustConfig::new("xsapp!b4711")
///     .with_issuer("https://tenant.authentication.sap.hana.ondemand.com/oauth/token")
///     .with_client_id("sb-xsapp!b4711")
///     .with_uaadomain("authentication.sap.hana.ondemand.com");
///
/// assert_eq!(trust.audience, "xsapp!b4711");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Expected `iss` claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// Expected audience, matched exactly or as `<prefix>|<audience>`
    pub audience: String,
    /// The caller's own client id; enables the `azp` check when it equals
    /// the token's `client_id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Trusted domain suffix for keys declared in the token's `jku` header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uaadomain: Option<String>,
}

impl TrustConfig {
    /// Create a trust configuration expecting `audience`
    pub fn new(audience: impl Into<String>) -> Self {
        Self {
            audience: audience.into(),
            ..Self::default()
        }
    }

    /// Set the expected issuer
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Set the caller's client id
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set the trusted domain suffix used for header-driven key resolution
    pub fn with_uaadomain(mut self, uaadomain: impl Into<String>) -> Self {
        self.uaadomain = Some(uaadomain.into());
        self
    }
}

/// Decode settings applied to every token
///
/// Defaults: `RS256` only, issuer verification on, 60 seconds of leeway for
/// `exp` and `iat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierOptions {
    /// Signature algorithms a token header may declare
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<Algorithm>,
    /// Require `TrustConfig::issuer` and check the `iss` claim against it
    #[serde(default = "default_validate_issuer")]
    pub validate_issuer: bool,
    /// Clock skew tolerance in seconds
    #[serde(default = "default_leeway_secs")]
    pub leeway_secs: u64,
}

fn default_algorithms() -> Vec<Algorithm> {
    vec![Algorithm::RS256]
}

fn default_validate_issuer() -> bool {
    true
}

fn default_leeway_secs() -> u64 {
    60
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self {
            algorithms: default_algorithms(),
            validate_issuer: default_validate_issuer(),
            leeway_secs: default_leeway_secs(),
        }
    }
}

impl VerifierOptions {
    /// Replace the algorithm allow-list
    ///
    /// # Security Warning
    ///
    /// Only list asymmetric algorithms when keys come from a JWKS endpoint.
    pub fn with_algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.algorithms = algorithms;
        self
    }

    /// Turn issuer verification on or off
    pub fn with_issuer_validation(mut self, validate: bool) -> Self {
        self.validate_issuer = validate;
        self
    }

    /// Set clock skew tolerance in seconds
    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }

    /// Whether `alg` is on the allow-list
    pub fn allows(&self, alg: Algorithm) -> bool {
        self.algorithms.contains(&alg)
    }
}
