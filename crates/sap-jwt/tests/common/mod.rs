//! Common test utilities for integration tests
//!
//! Signed fixture tokens, a recording in-memory HTTP client for trust-gate
//! tests, and a wiremock identity provider for transport tests.

#![allow(dead_code)]

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use sap_jwt::http::{HttpClient, HttpError, HttpResponse};
use sap_jwt::store::NoopStore;
use sap_jwt::{JwkSet, TokenVerifier, VerifierOptions};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

pub const SIGNING_KEY: &[u8] = include_bytes!("../fixtures/signing_key.pem");
pub const SIGNING_JWKS: &str = include_str!("../fixtures/signing_jwks.json");
pub const ATTACKER_KEY: &[u8] = include_bytes!("../fixtures/attacker_key.pem");
pub const ATTACKER_JWKS: &str = include_str!("../fixtures/attacker_jwks.json");

pub const KID: &str = "key-1";
pub const UAA_DOMAIN: &str = "authentication.sap.hana.ondemand.com";
pub const TENANT_A_ISS: &str = "https://tenant-a.authentication.sap.hana.ondemand.com/oauth/token";
pub const TENANT_A_JKU: &str = "https://tenant-a.authentication.sap.hana.ondemand.com/token_keys";
pub const TENANT_B_ISS: &str = "https://tenant-b.authentication.sap.hana.ondemand.com/oauth/token";
pub const TENANT_B_JKU: &str = "https://tenant-b.authentication.sap.hana.ondemand.com/token_keys";

/// Get current Unix timestamp
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs()
}

pub fn signing_jwks() -> JwkSet {
    serde_json::from_str(SIGNING_JWKS).expect("Invalid fixture JWKS")
}

/// Claims of a token for `app!t1`, valid for ten minutes
pub fn app_claims(iss: &str) -> serde_json::Value {
    let now = current_timestamp();
    json!({
        "iss": iss,
        "sub": "user-4711",
        "aud": ["app!t1", "sb-x!b1|app!t1"],
        "client_id": "app!t1",
        "azp": "app!t1",
        "zid": "tenant-a",
        "iat": now,
        "exp": now + 600,
    })
}

/// Sign `claims` with the fixture key (RS256)
pub fn sign(claims: &serde_json::Value, kid: Option<&str>, jku: Option<&str>) -> String {
    sign_with(SIGNING_KEY, claims, kid, jku)
}

/// Sign `claims` with the attacker's key (RS256)
pub fn sign_as_attacker(claims: &serde_json::Value, kid: Option<&str>, jku: Option<&str>) -> String {
    sign_with(ATTACKER_KEY, claims, kid, jku)
}

fn sign_with(
    key: &[u8],
    claims: &serde_json::Value,
    kid: Option<&str>,
    jku: Option<&str>,
) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.typ = Some("JWT".to_string());
    header.kid = kid.map(str::to_string);
    header.jku = jku.map(str::to_string);

    let key = EncodingKey::from_rsa_pem(key).expect("Invalid RSA key");
    encode(&header, claims, &key).expect("Failed to encode test JWT")
}

/// Flip one character in the middle of the signature
pub fn tamper_signature(token: &str) -> String {
    let (signed, signature) = token.rsplit_once('.').expect("Token has no signature");
    let mut bytes = signature.as_bytes().to_vec();
    let middle = bytes.len() / 2;
    bytes[middle] = if bytes[middle] == b'A' { b'B' } else { b'A' };
    format!("{signed}.{}", String::from_utf8(bytes).expect("ASCII signature"))
}

/// In-memory [`HttpClient`] serving canned responses by URL and recording
/// every request
#[derive(Default)]
pub struct RecordingHttpClient {
    responses: Mutex<HashMap<String, HttpResponse>>,
    requests: Mutex<Vec<String>>,
}

impl RecordingHttpClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Serve `body` with status 200 at `url`
    pub fn serve(&self, url: &str, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), HttpResponse::new(200, body));
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpClient for RecordingHttpClient {
    async fn get(&self, url: &str, _headers: &[(&str, &str)]) -> Result<HttpResponse, HttpError> {
        self.requests.lock().unwrap().push(url.to_string());
        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| HttpResponse::new(404, "not found")))
    }

    async fn post_form(
        &self,
        url: &str,
        _headers: &[(&str, &str)],
        _form: &[(&str, &str)],
    ) -> Result<HttpResponse, HttpError> {
        self.requests.lock().unwrap().push(url.to_string());
        Ok(HttpResponse::new(404, "not found"))
    }
}

/// Verifier over `http` without caching, default options
pub fn verifier_over(http: Arc<RecordingHttpClient>) -> TokenVerifier {
    TokenVerifier::builder()
        .http_client(http)
        .store(Arc::new(NoopStore))
        .options(VerifierOptions::default())
        .build()
        .expect("Failed to build verifier")
}

/// Identity provider mock server
pub struct MockIdp {
    pub server: MockServer,
    pub jwks_endpoint: String,
    pub discovery_endpoint: String,
    pub token_endpoint: String,
}

impl MockIdp {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();

        Self {
            jwks_endpoint: format!("{}/token_keys", base_url),
            discovery_endpoint: format!("{}/.well-known/openid-configuration", base_url),
            token_endpoint: format!("{}/oauth/token", base_url),
            server,
        }
    }

    /// Serve the fixture JWKS, expecting exactly `times` requests
    pub async fn mock_jwks(&self, times: u64) {
        Mock::given(method("GET"))
            .and(path("/token_keys"))
            .and(header("User-Agent", "appgyver/sap-jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SIGNING_JWKS))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Serve a discovery document pointing at this server's JWKS
    pub async fn mock_discovery(&self, times: u64) {
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .and(header("User-Agent", "appgyver/sap-jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issuer": self.token_endpoint,
                "jwks_uri": self.jwks_endpoint,
                "token_endpoint": self.token_endpoint,
            })))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Fail every request to `endpoint_path` with `status`
    pub async fn mock_status(&self, endpoint_path: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(endpoint_path))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }
}
