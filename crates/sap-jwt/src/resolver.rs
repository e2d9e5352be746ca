//! Key resolution and the `jku` trust gate
//!
//! A verification call gets its keys from one of four sources (see
//! [`KeySource`]). Three of them are chosen by the caller and trusted as
//! given. The fourth, [`KeySource::TokenHeader`], follows the `jku` URL from
//! the token's own unverified header, so the URL passes two checks before
//! anything is fetched:
//!
//! 1. Its host must lie inside the configured `uaadomain`.
//! 2. Its host must equal the host of the token's (unverified) `iss` claim.
//!
//! The first pins keys to the identity provider's domain, the second pins
//! them to the tenant the token claims to come from. Only then is the JWKS
//! fetched; the signature check that follows proves the token itself.

use crate::claims::peek_unverified_issuer;
use crate::config::TrustConfig;
use crate::documents::{DocumentCache, openid_configuration_url};
use crate::error::{Error, Result};
use jsonwebtoken::Header;
use jsonwebtoken::jwk::JwkSet;
use std::borrow::Cow;
use tracing::{debug, error};
use url::Url;

/// Where the keys for a verification call come from
#[derive(Debug, Clone)]
pub enum KeySource {
    /// A key set the caller already holds
    Static(JwkSet),
    /// A JWKS URL the caller trusts
    JwksUri(String),
    /// A provider site; the JWKS is found through
    /// `{site}/.well-known/openid-configuration`
    Discovery(String),
    /// The token's `jku` header, gated by `TrustConfig::uaadomain`
    TokenHeader,
}

/// Produces the key set for one verification call
#[derive(Debug, Clone)]
pub struct KeyResolver {
    documents: DocumentCache,
}

impl KeyResolver {
    /// Create a resolver fetching through `documents`
    pub fn new(documents: DocumentCache) -> Self {
        Self { documents }
    }

    /// The document cache used for remote key sets
    pub fn documents(&self) -> &DocumentCache {
        &self.documents
    }

    /// Resolve the key set for `token`
    ///
    /// `header` must be the decoded header of `token`.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingInput`] if a required URL, `uaadomain`, or `jku` is
    ///   absent
    /// - [`Error::TrustBoundary`] if a `jku` fails the trust gate; no request
    ///   is made in that case
    /// - [`Error::Verification`] if the payload cannot be read for the issuer
    /// - [`Error::Fetch`] if a document cannot be fetched
    pub async fn resolve<'a>(
        &self,
        source: &'a KeySource,
        token: &str,
        header: &Header,
        trust: &TrustConfig,
    ) -> Result<Cow<'a, JwkSet>> {
        match source {
            KeySource::Static(keys) => Ok(Cow::Borrowed(keys)),
            KeySource::JwksUri(url) => self.documents.jwks(url).await.map(Cow::Owned),
            KeySource::Discovery(site) => {
                if site.trim().is_empty() {
                    return Err(Error::MissingInput("discovery site"));
                }
                let config = self
                    .documents
                    .openid_configuration(&openid_configuration_url(site))
                    .await?;
                debug!(site = %site, jwks_uri = %config.jwks_uri, "Discovered JWKS URI");
                self.documents.jwks(&config.jwks_uri).await.map(Cow::Owned)
            }
            KeySource::TokenHeader => {
                let uaadomain = trust
                    .uaadomain
                    .as_deref()
                    .filter(|d| !d.trim().is_empty())
                    .ok_or(Error::MissingInput("uaadomain"))?;
                let jku = header
                    .jku
                    .as_deref()
                    .filter(|u| !u.trim().is_empty())
                    .ok_or(Error::MissingInput("jku header"))?;
                let issuer = peek_unverified_issuer(token)?;

                let jwks_url = check_jku_trust(jku, issuer.as_deref(), uaadomain)?;
                self.documents
                    .jwks(jwks_url.as_str())
                    .await
                    .map(Cow::Owned)
            }
        }
    }
}

/// Check a `jku` URL against the trusted domain and the token's issuer
///
/// Returns the parsed URL to fetch on success.
///
/// # Errors
///
/// Returns [`Error::TrustBoundary`] if the `jku` is not an https URL, its
/// host is outside `uaadomain`, the issuer is missing or not a URL, or the
/// two hosts differ.
pub fn check_jku_trust(jku: &str, issuer: Option<&str>, uaadomain: &str) -> Result<Url> {
    let jku_url = Url::parse(jku).map_err(|e| reject(jku, format!("jku is not a valid URL: {e}")))?;

    if jku_url.scheme() != "https" {
        return Err(reject(jku, "jku must use https"));
    }

    let jku_host = jku_url
        .host_str()
        .ok_or_else(|| reject(jku, "jku has no host"))?;

    let domain = normalize_domain(uaadomain);
    if domain.is_empty() || !host_in_domain(jku_host, &domain) {
        return Err(reject(
            jku,
            format!("jku host '{jku_host}' is outside trusted domain '{domain}'"),
        ));
    }

    let issuer = issuer.ok_or_else(|| reject(jku, "token has no iss claim"))?;
    let issuer_url = Url::parse(issuer)
        .map_err(|e| reject(issuer, format!("iss is not a valid URL: {e}")))?;
    let issuer_host = issuer_url
        .host_str()
        .ok_or_else(|| reject(issuer, "iss has no host"))?;

    if !jku_host.eq_ignore_ascii_case(issuer_host) {
        return Err(reject(
            jku,
            format!("jku host '{jku_host}' does not match iss host '{issuer_host}'"),
        ));
    }

    debug!(jku = %jku_url, "jku passed trust checks");
    Ok(jku_url)
}

fn reject(url: &str, reason: impl Into<String>) -> Error {
    let err = Error::untrusted(url, reason);
    error!(error = %err, "Rejected token key source");
    err
}

fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// `host` equals `domain` or is a subdomain of it
fn host_in_domain(host: &str, domain: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const UAA_DOMAIN: &str = "authentication.sap.hana.ondemand.com";
    const TENANT_A_ISS: &str = "https://tenant-a.authentication.sap.hana.ondemand.com/oauth/token";
    const TENANT_A_JKU: &str = "https://tenant-a.authentication.sap.hana.ondemand.com/token_keys";

    fn reason(err: Error) -> String {
        match err {
            Error::TrustBoundary { reason, .. } => reason,
            other => panic!("expected trust error, got {other:?}"),
        }
    }

    #[test]
    fn test_trusted_jku() {
        let url = check_jku_trust(TENANT_A_JKU, Some(TENANT_A_ISS), UAA_DOMAIN).unwrap();
        assert_eq!(url.as_str(), TENANT_A_JKU);
    }

    #[test]
    fn test_jku_outside_domain() {
        let err = check_jku_trust(
            "https://evil.example.com/token_keys",
            Some("https://evil.example.com/oauth/token"),
            UAA_DOMAIN,
        )
        .unwrap_err();
        assert!(reason(err).contains("outside trusted domain"));
    }

    #[test]
    fn test_domain_check_needs_label_boundary() {
        let err = check_jku_trust(
            "https://evilauthentication.sap.hana.ondemand.com/token_keys",
            Some("https://evilauthentication.sap.hana.ondemand.com/oauth/token"),
            UAA_DOMAIN,
        )
        .unwrap_err();
        assert!(reason(err).contains("outside trusted domain"));
    }

    #[test]
    fn test_domain_check_ignores_path_and_query() {
        let err = check_jku_trust(
            "https://evil.example.com/authentication.sap.hana.ondemand.com",
            Some(TENANT_A_ISS),
            UAA_DOMAIN,
        )
        .unwrap_err();
        assert!(reason(err).contains("outside trusted domain"));

        let err = check_jku_trust(
            "https://evil.example.com/keys?h=tenant-a.authentication.sap.hana.ondemand.com",
            Some(TENANT_A_ISS),
            UAA_DOMAIN,
        )
        .unwrap_err();
        assert!(reason(err).contains("outside trusted domain"));
    }

    #[test]
    fn test_userinfo_does_not_spoof_host() {
        let err = check_jku_trust(
            "https://tenant-a.authentication.sap.hana.ondemand.com@evil.example.com/token_keys",
            Some(TENANT_A_ISS),
            UAA_DOMAIN,
        )
        .unwrap_err();
        assert!(reason(err).contains("outside trusted domain"));
    }

    #[test]
    fn test_cross_tenant_jku() {
        let err = check_jku_trust(
            TENANT_A_JKU,
            Some("https://tenant-b.authentication.sap.hana.ondemand.com/oauth/token"),
            UAA_DOMAIN,
        )
        .unwrap_err();
        assert!(reason(err).contains("does not match iss host"));
    }

    #[test]
    fn test_domain_is_checked_before_issuer() {
        let err = check_jku_trust("https://evil.example.com/keys", None, UAA_DOMAIN).unwrap_err();
        assert!(reason(err).contains("outside trusted domain"));
    }

    #[test]
    fn test_missing_or_malformed_issuer() {
        let err = check_jku_trust(TENANT_A_JKU, None, UAA_DOMAIN).unwrap_err();
        assert!(reason(err).contains("no iss"));

        let err = check_jku_trust(TENANT_A_JKU, Some("tenant-a"), UAA_DOMAIN).unwrap_err();
        assert!(reason(err).contains("iss is not a valid URL"));
    }

    #[test]
    fn test_malformed_jku() {
        let err = check_jku_trust("not a url", Some(TENANT_A_ISS), UAA_DOMAIN).unwrap_err();
        assert!(reason(err).contains("jku is not a valid URL"));

        let err = check_jku_trust(
            "http://tenant-a.authentication.sap.hana.ondemand.com/token_keys",
            Some(TENANT_A_ISS),
            UAA_DOMAIN,
        )
        .unwrap_err();
        assert!(reason(err).contains("https"));
    }

    #[test]
    fn test_host_comparison_is_case_insensitive() {
        let url = check_jku_trust(
            "https://Tenant-A.Authentication.SAP.hana.ondemand.com/token_keys",
            Some(TENANT_A_ISS),
            ".Authentication.sap.hana.ondemand.com",
        )
        .unwrap();
        assert_eq!(url.host_str(), Some("tenant-a.authentication.sap.hana.ondemand.com"));
    }

    #[test]
    fn test_empty_domain_trusts_nothing() {
        let err = check_jku_trust(TENANT_A_JKU, Some(TENANT_A_ISS), "  ").unwrap_err();
        assert!(reason(err).contains("outside trusted domain"));
    }

    #[test]
    fn test_host_in_domain() {
        assert!(host_in_domain("a.example.com", "example.com"));
        assert!(host_in_domain("example.com", "example.com"));
        assert!(!host_in_domain("badexample.com", "example.com"));
        assert!(!host_in_domain("example.com.evil.net", "example.com"));
    }
}
