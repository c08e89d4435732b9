//! Issuer signing keys, fetched from a JWKS endpoint.
//!
//! # Design Decisions
//! - Keys live in an `ArcSwap` so lookups never take a lock
//! - An unknown `kid` forces one refresh (key rotation), serialized by a mutex
//!   so concurrent misses share a single fetch
//! - Refreshes are spaced by a cooldown; unknown kids inside it are rejected
//!   from the cached set without contacting the issuer
//! - Stale keys keep serving if a refresh fails

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::auth::AuthError;

/// JSON Web Key structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type (RSA, EC)
    pub kty: String,
    pub kid: String,
    #[serde(rename = "use", default)]
    pub key_use: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    /// RSA modulus
    #[serde(default)]
    pub n: Option<String>,
    /// RSA exponent
    #[serde(default)]
    pub e: Option<String>,
    /// EC x coordinate
    #[serde(default)]
    pub x: Option<String>,
    /// EC y coordinate
    #[serde(default)]
    pub y: Option<String>,
    #[serde(default)]
    pub crv: Option<String>,
}

/// JSON Web Key Set structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

/// A usable verification key.
#[derive(Clone)]
pub struct SigningKey {
    pub key: DecodingKey,
    pub algorithm: Algorithm,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

struct KeySet {
    keys: HashMap<String, SigningKey>,
    fetched_at: Instant,
}

pub const DEFAULT_REFRESH_COOLDOWN: Duration = Duration::from_secs(30);

pub struct JwksCache {
    url: String,
    http: reqwest::Client,
    ttl: Duration,
    current: ArcSwapOption<KeySet>,
    /// Time of the last fetch attempt, successful or not.
    refresh: Mutex<Option<Instant>>,
    refresh_cooldown: Duration,
}

impl JwksCache {
    pub fn new(url: impl Into<String>, ttl: Duration) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AuthError::KeySource(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            http,
            ttl,
            current: ArcSwapOption::empty(),
            refresh: Mutex::new(None),
            refresh_cooldown: DEFAULT_REFRESH_COOLDOWN,
        })
    }

    /// Minimum spacing between two fetches of the key set.
    pub fn with_refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.refresh_cooldown = cooldown;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Look up the key for `kid`, fetching the key set when it is stale or
    /// does not know the key yet.
    pub async fn key(&self, kid: &str) -> Result<SigningKey, AuthError> {
        if let Some(key) = self.lookup(kid, true) {
            return Ok(key);
        }

        let mut last_attempt = self.refresh.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(key) = self.lookup(kid, true) {
            return Ok(key);
        }

        if last_attempt.is_some_and(|at| at.elapsed() < self.refresh_cooldown) {
            tracing::debug!(kid = %kid, "JWKS refresh cooling down, answering from cache");
            return self.lookup(kid, false).ok_or_else(|| {
                if self.current.load().is_some() {
                    AuthError::UnknownKey(kid.to_string())
                } else {
                    AuthError::KeySource("JWKS unavailable, refresh cooling down".to_string())
                }
            });
        }
        *last_attempt = Some(Instant::now());

        match self.fetch().await {
            Ok(set) => self.current.store(Some(Arc::new(set))),
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "JWKS refresh failed");
                return self.lookup(kid, false).ok_or(e);
            }
        }

        self.lookup(kid, false)
            .ok_or_else(|| AuthError::UnknownKey(kid.to_string()))
    }

    fn lookup(&self, kid: &str, fresh_only: bool) -> Option<SigningKey> {
        let guard = self.current.load();
        let set = (*guard).as_ref()?;
        if fresh_only && set.fetched_at.elapsed() >= self.ttl {
            return None;
        }
        set.keys.get(kid).cloned()
    }

    async fn fetch(&self) -> Result<KeySet, AuthError> {
        tracing::info!(url = %self.url, "fetching JWKS");

        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AuthError::KeySource(format!("failed to fetch JWKS: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthError::KeySource(format!(
                "JWKS fetch failed with status: {}",
                response.status()
            )));
        }

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| AuthError::KeySource(format!("invalid JWKS document: {e}")))?;

        Ok(KeySet {
            keys: signing_keys(&jwks),
            fetched_at: Instant::now(),
        })
    }
}

/// Convert the usable keys of a JWKS document, skipping the rest.
pub fn signing_keys(jwks: &Jwks) -> HashMap<String, SigningKey> {
    let mut keys = HashMap::new();

    for jwk in &jwks.keys {
        if jwk.key_use.as_deref().is_some_and(|u| u != "sig") {
            continue;
        }
        match to_signing_key(jwk) {
            Some(key) => {
                keys.insert(jwk.kid.clone(), key);
            }
            None => tracing::debug!(kid = %jwk.kid, kty = %jwk.kty, "skipping unusable JWK"),
        }
    }

    keys
}

fn to_signing_key(jwk: &Jwk) -> Option<SigningKey> {
    match jwk.kty.as_str() {
        "RSA" => {
            let key = DecodingKey::from_rsa_components(jwk.n.as_deref()?, jwk.e.as_deref()?).ok()?;
            let algorithm = match jwk.alg.as_deref() {
                Some(alg) => Algorithm::from_str(alg).ok()?,
                None => Algorithm::RS256,
            };
            matches!(
                algorithm,
                Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512
            )
            .then_some(SigningKey { key, algorithm })
        }
        "EC" => {
            let key = DecodingKey::from_ec_components(jwk.x.as_deref()?, jwk.y.as_deref()?).ok()?;
            let algorithm = match (jwk.alg.as_deref(), jwk.crv.as_deref()) {
                (Some(alg), _) => Algorithm::from_str(alg).ok()?,
                (None, Some("P-384")) => Algorithm::ES384,
                (None, _) => Algorithm::ES256,
            };
            matches!(algorithm, Algorithm::ES256 | Algorithm::ES384)
                .then_some(SigningKey { key, algorithm })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::Router;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MODULUS: &str = "sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1WlUzewbgBHod5pcM9H95GQRV3JDXboIRROSBigeC5yjU1hGzHHyXss8UDprecbAYxknTcQkhslANGRUZmdTOQ5qTRsLAt6BTYuyvVRdhS8exSZEy_c4gs_7svlJJQ4H9_NxsiIoLwAEk7-Q3UXERGYw_75IDrGA84-lA_-Ct4eTlXHBIY2EaV7t7LjJaynVJCpkv4LKjTTAumiGUIuQhrNhZLuF_RJLqHpM2kgWFLU7-VTdL1VbC2tejvcI2BlMkEpk1BzBZI0KQB0GaDWFLN-aEAw3vRw";

    fn rsa(kid: &str, alg: Option<&str>, key_use: Option<&str>) -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            kid: kid.to_string(),
            key_use: key_use.map(str::to_string),
            alg: alg.map(str::to_string),
            n: Some(MODULUS.to_string()),
            e: Some("AQAB".to_string()),
            x: None,
            y: None,
            crv: None,
        }
    }

    #[test]
    fn test_signing_keys_filters_unusable() {
        let jwks = Jwks {
            keys: vec![
                rsa("sig-key", Some("RS256"), Some("sig")),
                rsa("default-alg", None, None),
                rsa("enc-key", Some("RS256"), Some("enc")),
                rsa("hmac-alg", Some("HS256"), Some("sig")),
                Jwk {
                    kty: "oct".to_string(),
                    ..rsa("symmetric", None, None)
                },
            ],
        };

        let keys = signing_keys(&jwks);
        let mut kids: Vec<_> = keys.keys().cloned().collect();
        kids.sort();
        assert_eq!(kids, vec!["default-alg", "sig-key"]);
        assert_eq!(keys["default-alg"].algorithm, Algorithm::RS256);
    }

    #[test]
    fn test_jwks_document_parses() {
        let doc = format!(
            r#"{{"keys":[{{"kty":"RSA","kid":"k1","use":"sig","alg":"RS256","n":"{MODULUS}","e":"AQAB"}}]}}"#
        );
        let jwks: Jwks = serde_json::from_str(&doc).unwrap();
        assert_eq!(signing_keys(&jwks).len(), 1);
    }

    /// Serve a one-key JWKS document and count how often it is fetched.
    async fn counting_issuer(hits: Arc<AtomicUsize>) -> String {
        let doc = format!(
            r#"{{"keys":[{{"kty":"RSA","kid":"k1","use":"sig","alg":"RS256","n":"{MODULUS}","e":"AQAB"}}]}}"#
        );
        let app = Router::new().route(
            "/jwks",
            get(move || {
                let hits = hits.clone();
                let doc = doc.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    doc
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/jwks")
    }

    #[tokio::test]
    async fn test_unknown_kids_inside_cooldown_do_not_refetch() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = counting_issuer(hits.clone()).await;
        let cache = JwksCache::new(url, Duration::from_secs(3600)).unwrap();

        let key = cache.key("k1").await.unwrap();
        assert_eq!(key.algorithm, Algorithm::RS256);

        for i in 0..20 {
            let err = cache.key(&format!("forged-{i}")).await.unwrap_err();
            assert!(matches!(err, AuthError::UnknownKey(_)));
        }

        assert!(cache.key("k1").await.is_ok());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_kid_refetches_once_cooldown_elapsed() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = counting_issuer(hits.clone()).await;
        let cache = JwksCache::new(url, Duration::from_secs(3600))
            .unwrap()
            .with_refresh_cooldown(Duration::ZERO);

        cache.key("k1").await.unwrap();
        for i in 0..3 {
            let err = cache.key(&format!("rotated-{i}")).await.unwrap_err();
            assert!(matches!(err, AuthError::UnknownKey(_)));
        }

        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_signing_key_debug_hides_key_material() {
        let keys = signing_keys(&Jwks {
            keys: vec![rsa("k1", Some("RS384"), Some("sig"))],
        });
        let rendered = format!("{:?}", keys["k1"]);
        assert_eq!(rendered, "SigningKey { algorithm: RS384, .. }");
    }

    #[tokio::test]
    async fn test_unreachable_issuer_is_key_source_error() {
        let cache = JwksCache::new("http://127.0.0.1:9/jwks.json", Duration::from_secs(60)).unwrap();
        let err = cache.key("k1").await.unwrap_err();
        assert!(matches!(err, AuthError::KeySource(_)));
    }
}
