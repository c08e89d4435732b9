use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};

use crate::auth::claims::Claims;
use crate::auth::jwks::JwksCache;
use crate::auth::AuthError;
use crate::config::AuthConfig;

/// Verifies a raw bearer token and returns its claims.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError>;
}

enum KeySource {
    Secret(DecodingKey),
    Jwks(JwksCache),
}

/// JWT verification against the configured identity issuer.
pub struct JwtVerifier {
    issuer: String,
    audience: Option<String>,
    token_use: Option<String>,
    leeway_secs: u64,
    keys: KeySource,
}

impl JwtVerifier {
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let keys = match &config.hs256_secret {
            Some(secret) => KeySource::Secret(DecodingKey::from_secret(secret.as_bytes())),
            None => KeySource::Jwks(
                JwksCache::new(
                    config.resolved_jwks_url(),
                    Duration::from_secs(config.jwks_cache_ttl_secs),
                )?
                .with_refresh_cooldown(Duration::from_secs(config.jwks_refresh_cooldown_secs)),
            ),
        };

        Ok(Self {
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            token_use: config.token_use.clone(),
            leeway_secs: config.leeway_secs,
            keys,
        })
    }

    /// Verifier for HS256 tokens signed with a shared secret.
    pub fn with_secret(issuer: impl Into<String>, secret: &[u8]) -> Self {
        Self {
            issuer: issuer.into(),
            audience: None,
            token_use: None,
            leeway_secs: 60,
            keys: KeySource::Secret(DecodingKey::from_secret(secret)),
        }
    }

    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    #[must_use]
    pub fn with_token_use(mut self, token_use: impl Into<String>) -> Self {
        self.token_use = Some(token_use.into());
        self
    }

    async fn key_for(&self, kid: Option<&str>) -> Result<(DecodingKey, Algorithm), AuthError> {
        match &self.keys {
            KeySource::Secret(key) => Ok((key.clone(), Algorithm::HS256)),
            KeySource::Jwks(cache) => {
                let kid = kid.ok_or_else(|| AuthError::Malformed("missing kid in header".to_string()))?;
                let signing = cache.key(kid).await?;
                Ok((signing.key, signing.algorithm))
            }
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header =
            decode_header(token).map_err(|e| AuthError::Malformed(format!("invalid header: {e}")))?;

        let (key, algorithm) = self.key_for(header.kid.as_deref()).await?;
        if header.alg != algorithm {
            return Err(AuthError::Malformed(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }

        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.validate_aud = false;
        validation.leeway = self.leeway_secs;

        let claims = decode::<Claims>(token, &key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidIssuer => AuthError::IssuerMismatch,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::Malformed(e.to_string()),
            })?
            .claims;

        if let Some(audience) = &self.audience {
            if !claims.issued_for(audience) {
                return Err(AuthError::AudienceMismatch);
            }
        }

        if let Some(expected) = &self.token_use {
            if claims.token_use.as_deref() != Some(expected.as_str()) {
                return Err(AuthError::TokenUse(
                    claims.token_use.clone().unwrap_or_default(),
                ));
            }
        }

        Ok(claims)
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::Missing)?;
    let value = value.to_str().map_err(|_| AuthError::BadScheme)?;

    let (scheme, token) = value.trim().split_once(' ').ok_or(AuthError::BadScheme)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::BadScheme);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;
    use std::time::{SystemTime, UNIX_EPOCH};

    const ISSUER: &str = "https://issuer.example.com/pool";
    const SECRET: &[u8] = b"unit-test-secret";

    fn now() -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
    }

    fn mint(claims: serde_json::Value, secret: &[u8]) -> String {
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    fn valid_claims() -> serde_json::Value {
        json!({
            "sub": "user-1",
            "iss": ISSUER,
            "exp": now() + 3600,
            "aud": "client-a",
            "token_use": "id",
        })
    }

    #[tokio::test]
    async fn test_valid_token() {
        let verifier = JwtVerifier::with_secret(ISSUER, SECRET)
            .with_audience("client-a")
            .with_token_use("id");
        let claims = verifier.verify(&mint(valid_claims(), SECRET)).await.unwrap();
        assert_eq!(claims.sub, "user-1");
    }

    #[tokio::test]
    async fn test_rejections() {
        let verifier = JwtVerifier::with_secret(ISSUER, SECRET)
            .with_audience("client-a")
            .with_token_use("id");

        let mut expired = valid_claims();
        expired["exp"] = json!(now() - 3600);
        assert_eq!(
            verifier.verify(&mint(expired, SECRET)).await,
            Err(AuthError::Expired)
        );

        let mut foreign = valid_claims();
        foreign["iss"] = json!("https://other.example.com");
        assert_eq!(
            verifier.verify(&mint(foreign, SECRET)).await,
            Err(AuthError::IssuerMismatch)
        );

        assert_eq!(
            verifier.verify(&mint(valid_claims(), b"wrong-secret")).await,
            Err(AuthError::InvalidSignature)
        );

        let mut other_client = valid_claims();
        other_client["aud"] = json!("client-b");
        assert_eq!(
            verifier.verify(&mint(other_client, SECRET)).await,
            Err(AuthError::AudienceMismatch)
        );

        let mut access = valid_claims();
        access["token_use"] = json!("access");
        assert_eq!(
            verifier.verify(&mint(access, SECRET)).await,
            Err(AuthError::TokenUse("access".to_string()))
        );

        assert!(matches!(
            verifier.verify("not-a-jwt").await,
            Err(AuthError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_algorithm_must_match_key_source() {
        let verifier = JwtVerifier::with_secret(ISSUER, SECRET);
        let token = encode(
            &Header::new(Algorithm::HS384),
            &valid_claims(),
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();
        assert!(matches!(
            verifier.verify(&token).await,
            Err(AuthError::Malformed(_))
        ));
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), Err(AuthError::Missing));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Ok("abc123"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer   abc123 "));
        assert_eq!(bearer_token(&headers), Ok("abc123"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&headers), Err(AuthError::BadScheme));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), Err(AuthError::BadScheme));
    }
}
