// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase ID token verification.

use crate::config::Config;
use crate::models::VerifiedIdentity;
use anyhow::Context;
use axum::http::HeaderValue;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const FIREBASE_ISSUER_PREFIX: &str = "https://securetoken.google.com/";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;
const MAX_UID_LEN: usize = 128;

/// Identity verification error categories.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IdentityError {
    /// The token is missing/invalid or claims do not match expectations.
    #[error("token rejected: {0}")]
    Rejected(String),
    /// Key material could not be fetched.
    #[error("identity verification unavailable: {0}")]
    Transient(String),
}

#[derive(Clone)]
enum VerifierMode {
    Firebase,
    StaticSecret { decoding_key: Arc<DecodingKey> },
}

#[derive(Clone)]
struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// Verifier for Firebase Authentication ID tokens.
pub struct FirebaseVerifier {
    http_client: reqwest::Client,
    project_id: String,
    issuer: String,
    mode: VerifierMode,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
}

impl FirebaseVerifier {
    /// Create a verifier from configuration.
    ///
    /// `AUTH_DEV_SECRET` switches to static-secret mode.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        match &config.auth_dev_secret {
            Some(secret) => {
                tracing::warn!("AUTH_DEV_SECRET set: accepting HS256 development tokens");
                Self::new_with_secret(&config.firebase_project_id, secret)
            }
            None => Self::new(&config.firebase_project_id),
        }
    }

    /// Create a production verifier that fetches and caches Google's
    /// securetoken signing keys.
    pub fn new(project_id: &str) -> anyhow::Result<Self> {
        let verifier = Self::build(project_id, VerifierMode::Firebase)?;

        tracing::info!(
            project_id = %verifier.project_id,
            issuer = %verifier.issuer,
            "Initialized Firebase ID token verifier"
        );

        Ok(verifier)
    }

    /// Create a verifier that accepts HS256 tokens signed with a shared secret.
    ///
    /// This is intended for local development and integration tests.
    pub fn new_with_secret(project_id: &str, secret: &[u8]) -> anyhow::Result<Self> {
        if secret.is_empty() {
            anyhow::bail!("static identity secret must not be empty");
        }

        Self::build(
            project_id,
            VerifierMode::StaticSecret {
                decoding_key: Arc::new(DecodingKey::from_secret(secret)),
            },
        )
    }

    fn build(project_id: &str, mode: VerifierMode) -> anyhow::Result<Self> {
        if project_id.trim().is_empty() {
            anyhow::bail!("Firebase project id must not be empty");
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building JWKS HTTP client")?;

        Ok(Self {
            http_client,
            project_id: project_id.to_string(),
            issuer: format!("{FIREBASE_ISSUER_PREFIX}{project_id}"),
            mode,
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Verify a Firebase ID token from an Authorization header.
    pub async fn verify_bearer(
        &self,
        auth_header: Option<&HeaderValue>,
    ) -> Result<VerifiedIdentity, IdentityError> {
        let token = extract_bearer_token(auth_header)?;
        self.verify_token(token).await
    }

    /// Verify a raw Firebase ID token.
    pub async fn verify_token(&self, token: &str) -> Result<VerifiedIdentity, IdentityError> {
        let header = decode_header(token)
            .map_err(|e| IdentityError::Rejected(format!("invalid JWT header: {e}")))?;

        let algorithm = match self.mode {
            VerifierMode::StaticSecret { .. } => Algorithm::HS256,
            VerifierMode::Firebase => Algorithm::RS256,
        };

        if header.alg != algorithm {
            return Err(IdentityError::Rejected(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }

        let decoding_key = match &self.mode {
            VerifierMode::StaticSecret { decoding_key } => decoding_key.clone(),
            VerifierMode::Firebase => {
                let kid = header
                    .kid
                    .as_deref()
                    .ok_or_else(|| IdentityError::Rejected("missing JWT kid".to_string()))?;
                self.decoding_key_for_kid(kid).await?
            }
        };

        let mut validation = Validation::new(algorithm);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        let claims = decode::<FirebaseIdTokenClaims>(token, decoding_key.as_ref(), &validation)
            .map_err(|e| IdentityError::Rejected(format!("JWT validation failed: {e}")))?
            .claims;

        validate_subject(&claims.sub)?;
        validate_not_future("iat", claims.iat)?;
        validate_not_future("auth_time", claims.auth_time)?;

        tracing::debug!(uid = %claims.sub, "Verified Firebase ID token");

        Ok(VerifiedIdentity {
            uid: claims.sub,
            email: claims.email,
            name: claims.name,
        })
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, IdentityError> {
        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        // Keys rotate; an unknown kid forces a refetch.
        for force_refresh in [false, true] {
            self.refresh_jwks(force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(IdentityError::Rejected(format!(
            "JWT kid not found in JWKS after refresh: {kid}"
        )))
    }

    async fn lookup_cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        let now = Instant::now();
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_jwks(&self, force_refresh: bool) -> Result<(), IdentityError> {
        let _guard = self.refresh_lock.lock().await;

        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if cache
                .as_ref()
                .is_some_and(|entry| entry.expires_at > Instant::now())
            {
                return Ok(());
            }
        }

        tracing::debug!(jwks_uri = FIREBASE_JWKS_URL, "Refreshing Firebase JWKS cache");

        let response = self
            .http_client
            .get(FIREBASE_JWKS_URL)
            .send()
            .await
            .map_err(|e| IdentityError::Transient(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(IdentityError::Transient(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = cache_ttl_from_headers(response.headers(), DEFAULT_CACHE_TTL);

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| IdentityError::Transient(format!("invalid JWKS JSON: {e}")))?;

        let keys_by_kid = usable_keys(jwks);
        if keys_by_kid.is_empty() {
            return Err(IdentityError::Transient(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        *self.jwks_cache.write().await = Some(JwksCacheEntry {
            keys_by_kid,
            expires_at: Instant::now() + ttl,
        });

        tracing::debug!(ttl_secs = ttl.as_secs(), "Firebase JWKS cache refreshed");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
    #[serde(rename = "use")]
    use_: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirebaseIdTokenClaims {
    sub: String,
    iat: Option<u64>,
    auth_time: Option<u64>,
    email: Option<String>,
    name: Option<String>,
}

fn usable_keys(jwks: Jwks) -> HashMap<String, Arc<DecodingKey>> {
    let mut keys_by_kid = HashMap::new();

    for jwk in jwks.keys {
        if jwk.kty != "RSA" || jwk.kid.trim().is_empty() {
            continue;
        }
        if jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
            continue;
        }
        if jwk.use_.as_deref().is_some_and(|use_| use_ != "sig") {
            continue;
        }

        match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
            Ok(key) => {
                keys_by_kid.insert(jwk.kid, Arc::new(key));
            }
            Err(e) => {
                tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
            }
        }
    }

    keys_by_kid
}

fn extract_bearer_token(auth_header: Option<&HeaderValue>) -> Result<&str, IdentityError> {
    let value = auth_header
        .ok_or_else(|| IdentityError::Rejected("missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| IdentityError::Rejected("invalid Authorization header".to_string()))?;

    let token = value.strip_prefix("Bearer ").ok_or_else(|| {
        IdentityError::Rejected("Authorization header must be Bearer token".to_string())
    })?;

    let token = token.trim();
    if token.is_empty() {
        return Err(IdentityError::Rejected("Bearer token is empty".to_string()));
    }

    Ok(token)
}

fn validate_subject(sub: &str) -> Result<(), IdentityError> {
    if sub.is_empty() || sub.len() > MAX_UID_LEN {
        return Err(IdentityError::Rejected(
            "sub claim must be 1-128 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_not_future(claim: &str, value: Option<u64>) -> Result<(), IdentityError> {
    let Some(value) = value else {
        return Err(IdentityError::Rejected(format!("missing {claim} claim")));
    };

    if value > now_unix_secs() + CLOCK_SKEW_SECS {
        return Err(IdentityError::Rejected(format!(
            "{claim} claim is in the future"
        )));
    }

    Ok(())
}

fn cache_ttl_from_headers(headers: &reqwest::header::HeaderMap, fallback: Duration) -> Duration {
    headers
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_cache_control_max_age)
        .map_or(fallback, Duration::from_secs)
}

fn parse_cache_control_max_age(value: &str) -> Option<u64> {
    value.split(',').find_map(|directive| {
        directive
            .trim()
            .strip_prefix("max-age=")
            .and_then(|raw| raw.trim_matches('"').parse::<u64>().ok())
    })
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const PROJECT: &str = "test-project";
    const SECRET: &[u8] = b"unit-test-secret";

    fn verifier() -> FirebaseVerifier {
        FirebaseVerifier::new_with_secret(PROJECT, SECRET).unwrap()
    }

    fn sign(claims: serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap()
    }

    fn claims(sub: &str) -> serde_json::Value {
        let now = now_unix_secs();
        json!({
            "iss": format!("https://securetoken.google.com/{PROJECT}"),
            "aud": PROJECT,
            "sub": sub,
            "iat": now,
            "auth_time": now,
            "exp": now + 3600,
            "email": "hiker@example.com",
            "name": "Hiker"
        })
    }

    #[test]
    fn parse_cache_control_max_age_valid() {
        assert_eq!(
            parse_cache_control_max_age("public, max-age=19766, must-revalidate"),
            Some(19766)
        );
        assert_eq!(parse_cache_control_max_age("max-age=60"), Some(60));
        assert_eq!(parse_cache_control_max_age("max-age=\"120\""), Some(120));
    }

    #[test]
    fn parse_cache_control_max_age_invalid() {
        assert_eq!(parse_cache_control_max_age("public, immutable"), None);
        assert_eq!(parse_cache_control_max_age("max-age=abc"), None);
        assert_eq!(parse_cache_control_max_age(""), None);
    }

    #[test]
    fn extract_bearer_token_errors() {
        assert!(matches!(
            extract_bearer_token(None),
            Err(IdentityError::Rejected(_))
        ));

        let bad = HeaderValue::from_static("Basic abc");
        assert!(matches!(
            extract_bearer_token(Some(&bad)),
            Err(IdentityError::Rejected(_))
        ));

        let empty = HeaderValue::from_static("Bearer ");
        assert!(matches!(
            extract_bearer_token(Some(&empty)),
            Err(IdentityError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn static_secret_token_verifies() {
        let token = sign(claims("firebase-uid-1"));
        let header = HeaderValue::from_str(&format!("Bearer {token}")).unwrap();

        let identity = verifier().verify_bearer(Some(&header)).await.unwrap();
        assert_eq!(identity.uid, "firebase-uid-1");
        assert_eq!(identity.email.as_deref(), Some("hiker@example.com"));
        assert_eq!(identity.name.as_deref(), Some("Hiker"));
    }

    #[tokio::test]
    async fn wrong_audience_rejected() {
        let mut c = claims("uid");
        c["aud"] = json!("other-project");
        let result = verifier().verify_token(&sign(c)).await;
        assert!(matches!(result, Err(IdentityError::Rejected(_))));
    }

    #[tokio::test]
    async fn wrong_issuer_rejected() {
        let mut c = claims("uid");
        c["iss"] = json!("https://accounts.google.com");
        let result = verifier().verify_token(&sign(c)).await;
        assert!(matches!(result, Err(IdentityError::Rejected(_))));
    }

    #[tokio::test]
    async fn expired_token_rejected() {
        let mut c = claims("uid");
        c["exp"] = json!(now_unix_secs() - 3600);
        let result = verifier().verify_token(&sign(c)).await;
        assert!(matches!(result, Err(IdentityError::Rejected(_))));
    }

    #[tokio::test]
    async fn bad_subject_rejected() {
        let result = verifier().verify_token(&sign(claims(""))).await;
        assert!(matches!(result, Err(IdentityError::Rejected(_))));

        let long = "x".repeat(129);
        let result = verifier().verify_token(&sign(claims(&long))).await;
        assert!(matches!(result, Err(IdentityError::Rejected(_))));
    }

    #[tokio::test]
    async fn future_auth_time_rejected() {
        let mut c = claims("uid");
        c["auth_time"] = json!(now_unix_secs() + 600);
        let result = verifier().verify_token(&sign(c)).await;
        assert!(matches!(result, Err(IdentityError::Rejected(_))));
    }

    #[tokio::test]
    async fn wrong_secret_rejected() {
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims("uid"),
            &EncodingKey::from_secret(b"someone-else"),
        )
        .unwrap();
        let result = verifier().verify_token(&token).await;
        assert!(matches!(result, Err(IdentityError::Rejected(_))));
    }

    #[test]
    fn empty_project_rejected() {
        assert!(FirebaseVerifier::new_with_secret("", SECRET).is_err());
        assert!(FirebaseVerifier::new_with_secret(PROJECT, b"").is_err());
    }
}
