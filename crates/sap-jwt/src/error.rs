//! Error taxonomy for token verification
//!
//! Every operation returns [`Result`] with one flat [`Error`] enumeration.
//! Variants carry the offending URL or claim values so callers can log the
//! precise cause without string matching.

use crate::documents::DocumentKind;
use jsonwebtoken::errors::ErrorKind;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Verification and key resolution errors
#[derive(Debug, Error)]
pub enum Error {
    /// A remote document could not be fetched or decoded
    #[error("Failed to fetch '{kind}' from '{url}': {reason}")]
    Fetch {
        /// Which document was requested
        kind: DocumentKind,
        /// The URL that was requested
        url: String,
        /// Transport error, HTTP status, or decode failure
        reason: String,
    },

    /// The token failed decoding, signature, issuer, or time checks
    #[error("Token verification failed: {message}")]
    Verification {
        /// Human readable cause
        message: String,
        /// Underlying decode primitive error, when there is one
        #[source]
        source: Option<jsonwebtoken::errors::Error>,
    },

    /// None of the token's `aud` entries matched the expected audience
    #[error("Invalid audience: expected '{expected}', token has {received:?}")]
    AudienceValidation {
        /// Audience the caller expected
        expected: String,
        /// Audience entries present in the token
        received: Vec<String>,
    },

    /// The token's `azp` claim did not match the expected client
    #[error("Invalid authorized party: expected '{expected}', token has {received:?}")]
    AuthorizedPartyValidation {
        /// Client id the caller expected
        expected: String,
        /// `azp` claim present in the token
        received: Option<String>,
    },

    /// A key source declared by the token is not trusted
    #[error("Untrusted key source '{url}': {reason}")]
    TrustBoundary {
        /// The offending URL as found in the token
        url: String,
        /// Which rule rejected it
        reason: String,
    },

    /// A required input was absent or empty
    #[error("Missing {0}")]
    MissingInput(&'static str),

    /// The jwt-bearer token exchange failed
    #[error("Token exchange with '{url}' failed: {reason}")]
    TokenExchange {
        /// Token endpoint URL
        url: String,
        /// Transport error, HTTP status, or decode failure
        reason: String,
    },
}

impl Error {
    pub(crate) fn fetch(kind: DocumentKind, url: &str, reason: impl Into<String>) -> Self {
        Self::Fetch {
            kind,
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn verification(message: impl Into<String>) -> Self {
        Self::Verification {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn decode(message: &str, source: jsonwebtoken::errors::Error) -> Self {
        Self::Verification {
            message: format!("{message}: {source}"),
            source: Some(source),
        }
    }

    pub(crate) fn untrusted(url: &str, reason: impl Into<String>) -> Self {
        Self::TrustBoundary {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Kind of the underlying decode error, for `Verification` errors raised
    /// by the decode primitive
    pub fn decode_error_kind(&self) -> Option<&ErrorKind> {
        match self {
            Self::Verification {
                source: Some(source),
                ..
            } => Some(source.kind()),
            _ => None,
        }
    }

    /// Whether this error was raised by the jku trust gate
    pub fn is_trust_violation(&self) -> bool {
        matches!(self, Self::TrustBoundary { .. })
    }
}
