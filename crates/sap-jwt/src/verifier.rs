//! Token verification
//!
//! [`TokenVerifier::verify`] runs the checks in a fixed order:
//!
//! 1. Read the header and reject algorithms outside the allow-list.
//! 2. Resolve the key set (static, JWKS URL, discovery, or trusted `jku`).
//! 3. Select the key named by the header's `kid` and decode the token with
//!    signature, issuer, and expiry checks.
//! 4. Check `iat` against the clock.
//! 5. Apply the audience rule and, when it applies, the `azp` rule.
//!
//! Failures in steps 1, 3 and 4 are [`Error::Verification`]. Claim rules only
//! run on a payload whose signature has been verified.

use crate::claims::{
    Claims, should_validate_authorized_party, validate_audience, validate_authorized_party,
};
use crate::config::{TrustConfig, VerifierOptions};
use crate::documents::{DEFAULT_NAMESPACE, DEFAULT_TTL, DocumentCache, KeyDocumentFetcher};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::resolver::{KeyResolver, KeySource};
use crate::store::CacheStore;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{DecodingKey, Header, TokenData, Validation, decode, decode_header};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A token that passed every check
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    /// Verified payload
    pub claims: Claims,
    /// Token header
    pub header: Header,
}

/// Verifies tokens against a trust configuration
///
/// # Example
///
/// ```rust,no_run
/// use sap_jwt::{KeySource, TokenVerifier, TrustConfig};
///
/// # async fn example(token: &str) -> Result<(), sap_jwt::Error> {
/// let verifier = TokenVerifier::builder().build()?;
///
/// let trust = TrustConfig::new("xsapp!b4711")
///     .with_issuer("https://tenant.authentication.sap.hana.ondemand.com/oauth/token")
///     .with_client_id("sb-xsapp!b4711");
///
/// let source = KeySource::JwksUri(
///     "https://tenant.authentication.sap.hana.ondemand.com/token_keys".to_string(),
/// );
///
/// let verified = verifier.verify(token, &source, &trust).await?;
/// println!("token for {:?}", verified.claims.sub);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    resolver: KeyResolver,
    options: VerifierOptions,
}

impl TokenVerifier {
    /// Create a verifier
    pub fn new(resolver: KeyResolver, options: VerifierOptions) -> Self {
        Self { resolver, options }
    }

    /// Start building a verifier
    pub fn builder() -> TokenVerifierBuilder {
        TokenVerifierBuilder::default()
    }

    /// Decode settings in use
    pub fn options(&self) -> &VerifierOptions {
        &self.options
    }

    /// The key resolver in use
    pub fn resolver(&self) -> &KeyResolver {
        &self.resolver
    }

    /// Verify `token` with keys from `source` against `trust`
    ///
    /// # Errors
    ///
    /// - [`Error::MissingInput`] for an empty token or audience, or a missing
    ///   issuer while issuer verification is on
    /// - [`Error::Verification`] for malformed tokens, disallowed algorithms,
    ///   unknown keys, bad signatures, wrong issuers, and time checks
    /// - [`Error::TrustBoundary`] and [`Error::Fetch`] from key resolution
    /// - [`Error::AudienceValidation`] and [`Error::AuthorizedPartyValidation`]
    ///   from the claim rules
    pub async fn verify(
        &self,
        token: &str,
        source: &KeySource,
        trust: &TrustConfig,
    ) -> Result<VerifiedToken> {
        if token.trim().is_empty() {
            return Err(Error::MissingInput("token"));
        }
        if trust.audience.is_empty() {
            return Err(Error::MissingInput("expected audience"));
        }
        let issuer = match trust.issuer.as_deref() {
            Some(issuer) if !issuer.is_empty() => Some(issuer),
            _ if self.options.validate_issuer => return Err(Error::MissingInput("expected issuer")),
            _ => None,
        };

        let header = decode_header(token).map_err(|e| {
            debug!(error = %e, "Failed to decode JWT header");
            Error::decode("Invalid JWT header", e)
        })?;

        if !self.options.allows(header.alg) {
            warn!(
                algorithm = ?header.alg,
                allowed = ?self.options.algorithms,
                "JWT algorithm not allowed"
            );
            return Err(Error::verification(format!(
                "Algorithm {:?} not allowed",
                header.alg
            )));
        }

        let keys = self.resolver.resolve(source, token, &header, trust).await?;
        let decoding_key = select_key(&keys, &header)?;

        let mut validation = Validation::new(header.alg);
        validation.validate_aud = false;
        validation.validate_exp = true;
        validation.leeway = self.options.leeway_secs;
        // jsonwebtoken only compares iss when present, so it must be required
        if let Some(issuer) = issuer.filter(|_| self.options.validate_issuer) {
            validation.set_required_spec_claims(&["exp", "iss"]);
            validation.set_issuer(&[issuer]);
        } else {
            validation.set_required_spec_claims(&["exp"]);
        }

        let TokenData { claims, header } =
            decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
                warn!(error = %e, kid = ?header.kid, "JWT validation failed");
                Error::decode("JWT validation failed", e)
            })?;

        check_issued_at(&claims, self.options.leeway_secs)?;

        if !validate_audience(&claims, &trust.audience) {
            warn!(expected = %trust.audience, aud = ?claims.aud, "JWT audience rejected");
            return Err(Error::AudienceValidation {
                expected: trust.audience.clone(),
                received: claims.aud,
            });
        }

        if let Some(client_id) = trust.client_id.as_deref()
            && should_validate_authorized_party(&claims, client_id)
        {
            validate_authorized_party(&claims, client_id).inspect_err(|e| {
                warn!(error = %e, "JWT authorized party rejected");
            })?;
        }

        debug!(
            issuer = ?claims.iss,
            subject = ?claims.sub,
            client_id = ?claims.client_id,
            algorithm = ?header.alg,
            "JWT verification successful"
        );

        Ok(VerifiedToken { claims, header })
    }
}

/// The key named by the header's `kid`
fn select_key(keys: &JwkSet, header: &Header) -> Result<DecodingKey> {
    let kid = header.kid.as_deref().ok_or_else(|| {
        warn!("JWT missing kid (key ID) in header");
        Error::verification("JWT must include kid (key ID) in header")
    })?;

    let jwk = keys.find(kid).ok_or_else(|| {
        warn!(kid = kid, "Key ID not found in JWKS");
        Error::verification(format!("Key ID '{kid}' not found in JWKS"))
    })?;

    DecodingKey::from_jwk(jwk).map_err(|e| {
        warn!(kid = kid, error = %e, "Failed to create decoding key from JWK");
        Error::decode("Invalid JWK", e)
    })
}

/// Reject tokens issued further in the future than the leeway allows
fn check_issued_at(claims: &Claims, leeway_secs: u64) -> Result<()> {
    let Some(iat) = claims.iat else {
        return Ok(());
    };

    let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
    if iat > now.saturating_add(leeway_secs) {
        warn!(iat = iat, now = now, "JWT issued in the future");
        return Err(Error::verification("Token issued in the future (iat claim)"));
    }
    Ok(())
}

/// Builder for [`TokenVerifier`]
///
/// With default features, an unset HTTP client becomes
/// [`ReqwestHttpClient`](crate::http::ReqwestHttpClient) and an unset store
/// becomes [`MemoryStore`](crate::store::MemoryStore).
#[derive(Default)]
pub struct TokenVerifierBuilder {
    http: Option<Arc<dyn HttpClient>>,
    store: Option<Arc<dyn CacheStore>>,
    options: VerifierOptions,
    namespace: Option<String>,
    ttl: Option<Duration>,
}

impl TokenVerifierBuilder {
    /// Use `http` for document fetches
    pub fn http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Cache documents in `store`
    pub fn store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Decode settings
    pub fn options(mut self, options: VerifierOptions) -> Self {
        self.options = options;
        self
    }

    /// Cache key namespace (default `sapjwt`)
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Cache entry lifetime (default 30 minutes)
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Build the verifier
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingInput`] if no HTTP client was given and none
    /// can be created (the `reqwest-client` feature is off, or the default
    /// client fails to initialize).
    pub fn build(self) -> Result<TokenVerifier> {
        let http = match self.http {
            Some(http) => http,
            None => default_http_client()?,
        };
        let store = match self.store {
            Some(store) => store,
            None => default_store(),
        };

        let documents = DocumentCache::new(KeyDocumentFetcher::new(http), store)
            .with_namespace(self.namespace.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()))
            .with_ttl(self.ttl.unwrap_or(DEFAULT_TTL));

        Ok(TokenVerifier::new(KeyResolver::new(documents), self.options))
    }
}

#[cfg(feature = "reqwest-client")]
fn default_http_client() -> Result<Arc<dyn HttpClient>> {
    let client = crate::http::ReqwestHttpClient::new().map_err(|e| {
        warn!(error = %e, "Failed to create default HTTP client");
        Error::MissingInput("HTTP client")
    })?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "reqwest-client"))]
fn default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::MissingInput("HTTP client"))
}

#[cfg(feature = "memory-store")]
fn default_store() -> Arc<dyn CacheStore> {
    Arc::new(crate::store::MemoryStore::new())
}

#[cfg(not(feature = "memory-store"))]
fn default_store() -> Arc<dyn CacheStore> {
    Arc::new(crate::store::NoopStore)
}

impl std::fmt::Debug for TokenVerifierBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifierBuilder")
            .field("http", &self.http.as_ref().map(|_| "<dyn HttpClient>"))
            .field("store", &self.store.as_ref().map(|_| "<dyn CacheStore>"))
            .field("options", &self.options)
            .field("namespace", &self.namespace)
            .field("ttl", &self.ttl)
            .finish()
    }
}
