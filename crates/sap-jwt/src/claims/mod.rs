//! Token payload model and claim rules
//!
//! [`Claims`] is the decoded payload. It is only handed out after the
//! signature check has succeeded; the one exception is
//! [`peek_unverified_issuer`], which the key resolver uses to bind a `jku`
//! header to the issuer the token claims.

mod validator;

pub use validator::{
    AUDIENCE_DELIMITER, should_validate_authorized_party, validate_audience,
    validate_authorized_party,
};

use crate::error::{Error, Result};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Token claims
///
/// Registered and XSUAA-specific claims are typed; everything else is kept in
/// `additional`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer (iss)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Subject (sub)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Audience (aud), a single string or an array in the token
    #[serde(
        default,
        deserialize_with = "deserialize_audience",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub aud: Vec<String>,

    /// Authorized party (azp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,

    /// OAuth client the token was issued to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Expiration time (exp), Unix timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,

    /// Issued at (iat), Unix timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,

    /// Application claims
    #[serde(flatten)]
    pub additional: HashMap<String, serde_json::Value>,
}

/// Accept `"aud": "x"`, `"aud": ["x", "y"]`, or `"aud": null`
fn deserialize_audience<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Audience {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<Audience>::deserialize(deserializer)? {
        Some(Audience::One(aud)) => vec![aud],
        Some(Audience::Many(aud)) => aud,
        None => Vec::new(),
    })
}

#[derive(Deserialize)]
struct IssuerOnly {
    #[serde(default)]
    iss: Option<String>,
}

/// Read the `iss` claim without checking the signature
///
/// The result must not be trusted on its own. It is only used to check that a
/// token's `jku` header points at the tenant the token claims to come from,
/// before the signature check proves the claim.
///
/// # Errors
///
/// Returns [`Error::Verification`] if the token is not a three-part compact
/// JWT or its payload is not base64url-encoded JSON.
pub fn peek_unverified_issuer(token: &str) -> Result<Option<String>> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(Error::verification("Invalid JWT format")),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| Error::verification(format!("Invalid JWT payload encoding: {e}")))?;

    let claims: IssuerOnly = serde_json::from_slice(&bytes)
        .map_err(|e| Error::verification(format!("Invalid JWT claims: {e}")))?;

    Ok(claims.iss)
}
