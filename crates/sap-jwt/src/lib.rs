//! # sap-jwt - XSUAA Token Verification
//!
//! Verifies OpenID Connect JWTs issued by SAP XSUAA and resolves the keys
//! needed to do so, including keys declared by the token's own `jku` header
//! under domain-trust rules.
//!
//! ## Key Features
//!
//! - **Signature and time checks** - delegated to `jsonwebtoken`, with an
//!   algorithm allow-list enforced before any key is looked up
//! - **XSUAA audience rule** - `aud` entries match exactly or as
//!   `<instance-id>|<app-id>`
//! - **Authorized party** - `azp` is checked when the caller is the token's
//!   own client
//! - **Trusted `jku`** - header-declared key URLs must lie in the configured
//!   `uaadomain` and on the issuer's host before they are fetched
//! - **Document cache** - JWKS and OIDC discovery documents cached for 30
//!   minutes in a pluggable TTL store
//! - **jwt-bearer exchange** - trade a user token at the token endpoint
//!
//! ## Architecture
//!
//! - [`verifier`] - [`TokenVerifier`], orchestrates one verification call
//! - [`resolver`] - [`KeySource`] and the `jku` trust gate
//! - [`claims`] - [`Claims`] and the audience / authorized-party rules
//! - [`documents`] - JWKS and discovery fetcher plus [`DocumentCache`]
//! - [`http`] / [`store`] - transport and cache seams
//! - [`exchange`] - jwt-bearer grant client
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sap_jwt::{KeySource, TokenVerifier, TrustConfig};
//!
//! # async fn example(token: &str) -> Result<(), sap_jwt::Error> {
//! let verifier = TokenVerifier::builder().build()?;
//!
//! // Keys from the token's jku header, which must be on the issuer's host
//! // inside the trusted domain
//! let trust = TrustConfig::new("xsapp!b4711")
//!     .with_issuer("https://tenant.authentication.sap.hana.ondemand.com/oauth/token")
//!     .with_client_id("sb-xsapp!b4711")
//!     .with_uaadomain("authentication.sap.hana.ondemand.com");
//!
//! let verified = verifier.verify(token, &KeySource::TokenHeader, &trust).await?;
//! println!("zone: {:?}", verified.claims.additional.get("zid"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `reqwest-client` (default) - [`http::ReqwestHttpClient`]
//! - `memory-store` (default) - [`store::MemoryStore`]

pub mod claims;
pub mod config;
pub mod documents;
pub mod error;
pub mod exchange;
pub mod http;
pub mod resolver;
pub mod store;
pub mod verifier;

#[doc(inline)]
pub use claims::Claims;
#[doc(inline)]
pub use config::{TrustConfig, VerifierOptions};
#[doc(inline)]
pub use documents::{DocumentCache, DocumentKind, KeyDocumentFetcher, OpenIdConfiguration};
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use resolver::{KeyResolver, KeySource};
#[doc(inline)]
pub use verifier::{TokenVerifier, TokenVerifierBuilder, VerifiedToken};

// Key set types appear in the public API
pub use jsonwebtoken::jwk::JwkSet;
pub use jsonwebtoken::{Algorithm, Header};
