//! Get-or-populate cache in front of [`KeyDocumentFetcher`]

use super::fetcher::decode_document;
use super::{DocumentKind, KeyDocumentFetcher, OpenIdConfiguration};
use crate::error::Result;
use crate::store::CacheStore;
use jsonwebtoken::jwk::JwkSet;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Prefix of every cache key
pub const DEFAULT_NAMESPACE: &str = "sapjwt";

/// Lifetime of a cached document
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Document cache keyed by `(kind, url)`
///
/// Raw response bodies are stored under `"<namespace>:<kind>:<url>"`. The
/// store is best-effort: read or write failures are logged and the document
/// is fetched directly instead.
///
/// Concurrent misses for the same key may each fetch; fetches are idempotent
/// and the last write wins.
///
/// # Example
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use sap_jwt::documents::{DocumentCache, KeyDocumentFetcher};
/// # use sap_jwt::http::ReqwestHttpClient;
/// # use sap_jwt::store::MemoryStore;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = KeyDocumentFetcher::new(Arc::new(ReqwestHttpClient::new()?));
/// let cache = DocumentCache::new(fetcher, Arc::new(MemoryStore::new()));
///
/// // First call fetches, later calls within 30 minutes are served from the store
/// let jwks = cache.jwks("https://tenant.authentication.sap.hana.ondemand.com/token_keys").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DocumentCache {
    fetcher: KeyDocumentFetcher,
    store: Arc<dyn CacheStore>,
    namespace: String,
    ttl: Duration,
}

impl DocumentCache {
    /// Create a cache with the default namespace and TTL
    pub fn new(fetcher: KeyDocumentFetcher, store: Arc<dyn CacheStore>) -> Self {
        Self {
            fetcher,
            store,
            namespace: DEFAULT_NAMESPACE.to_string(),
            ttl: DEFAULT_TTL,
        }
    }

    /// Use a different key namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Use a different entry lifetime
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Cache key for a document
    pub fn cache_key(&self, kind: DocumentKind, url: &str) -> String {
        format!("{}:{}:{}", self.namespace, kind, url)
    }

    /// Entry lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached document, fetching and storing it on a miss
    ///
    /// # Errors
    ///
    /// Returns the fetcher's error when the document is not cached and cannot
    /// be fetched or decoded. Cache failures are never returned.
    pub async fn fetch<T: DeserializeOwned>(&self, kind: DocumentKind, url: &str) -> Result<T> {
        let key = self.cache_key(kind, url);

        match self.store.get(&key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<T>(&bytes) {
                Ok(document) => {
                    debug!(kind = %kind, url = url, "Using cached key document");
                    return Ok(document);
                }
                Err(e) => {
                    warn!(kind = %kind, url = url, error = %e, "Discarding undecodable cache entry");
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(kind = %kind, url = url, error = %e, "Cache read failed, fetching directly");
            }
        }

        let body = self.fetcher.fetch_raw(kind, url).await?;
        let document = decode_document(kind, url, &body)?;

        // Only bodies that decoded are stored
        if let Err(e) = self.store.set(&key, &body, self.ttl).await {
            warn!(kind = %kind, url = url, error = %e, "Cache write failed");
        }

        Ok(document)
    }

    /// Cached JWKS
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub async fn jwks(&self, url: &str) -> Result<JwkSet> {
        self.fetch(DocumentKind::Jwks, url).await
    }

    /// Cached OIDC discovery document
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub async fn openid_configuration(&self, url: &str) -> Result<OpenIdConfiguration> {
        self.fetch(DocumentKind::OpenIdConfiguration, url).await
    }
}

impl std::fmt::Debug for DocumentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCache")
            .field("fetcher", &self.fetcher)
            .field("namespace", &self.namespace)
            .field("ttl", &self.ttl)
            .finish()
    }
}
