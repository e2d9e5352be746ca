//! Audience and authorized-party rules
//!
//! XSUAA issues tokens whose `aud` entries are either a plain app id
//! (`xsapp!b4711`) or a composite `<instance-id>|<app-id>`
//! (`sb-xyz!b446|xsapp!b4711`). An expected audience matches an entry that
//! equals it or that ends with `|` followed by it. A bare suffix without the
//! delimiter (`notxsapp!b4711`) never matches.

use super::Claims;
use crate::error::{Error, Result};

/// Separator between instance id and app id in composite audiences
pub const AUDIENCE_DELIMITER: char = '|';

/// Whether any `aud` entry matches `expected_audience`
///
/// An empty `expected_audience` matches nothing.
pub fn validate_audience(claims: &Claims, expected_audience: &str) -> bool {
    if expected_audience.is_empty() {
        return false;
    }

    claims
        .aud
        .iter()
        .any(|aud| audience_matches(aud, expected_audience))
}

fn audience_matches(aud: &str, expected: &str) -> bool {
    aud == expected
        || aud
            .strip_suffix(expected)
            .is_some_and(|prefix| prefix.ends_with(AUDIENCE_DELIMITER))
}

/// Whether the `azp` rule applies to this caller
///
/// Only when the caller's `client_id` is non-empty and is the token's own
/// `client_id`. Tokens issued to a different client for several audiences
/// skip the check.
pub fn should_validate_authorized_party(claims: &Claims, client_id: &str) -> bool {
    !client_id.is_empty() && claims.client_id.as_deref() == Some(client_id)
}

/// Check that `azp` is present and equals `authorized_party`
///
/// # Errors
///
/// Returns [`Error::AuthorizedPartyValidation`] with the expected and
/// received values.
pub fn validate_authorized_party(claims: &Claims, authorized_party: &str) -> Result<()> {
    if claims.azp.as_deref() == Some(authorized_party) {
        return Ok(());
    }

    Err(Error::AuthorizedPartyValidation {
        expected: authorized_party.to_string(),
        received: claims.azp.clone(),
    })
}
