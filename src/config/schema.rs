//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Bearer token verification.
    pub auth: AuthConfig,

    /// Where authorized requests are forwarded.
    pub backend: BackendConfig,

    /// CORS headers attached to every response.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8443").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Maximum requests in flight (backpressure).
    pub max_concurrent_requests: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8443".to_string(),
            tls: None,
            max_concurrent_requests: 10_000,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upper bound for one backend call, in seconds. Expiry is a backend error.
    pub backend_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { backend_secs: 29 }
    }
}

/// Identity issuer settings for the authorizer.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    /// Expected `iss` claim.
    pub issuer: String,

    /// Expected `aud` (or `client_id`) claim. Unchecked when absent.
    pub audience: Option<String>,

    /// JWKS document URL. Defaults to `{issuer}/.well-known/jwks.json`.
    pub jwks_url: Option<String>,

    /// Shared HS256 secret. Replaces JWKS when set; meant for development.
    pub hs256_secret: Option<String>,

    /// Required `token_use` claim (e.g. "id"). Unchecked when absent.
    pub token_use: Option<String>,

    /// How long fetched keys stay fresh, in seconds.
    pub jwks_cache_ttl_secs: u64,

    /// Minimum spacing between JWKS fetches triggered by unknown key ids,
    /// in seconds.
    pub jwks_refresh_cooldown_secs: u64,

    /// Clock skew tolerated on `exp`, in seconds.
    pub leeway_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            audience: None,
            jwks_url: None,
            hs256_secret: None,
            token_use: None,
            jwks_cache_ttl_secs: 3600,
            jwks_refresh_cooldown_secs: 30,
            leeway_secs: 60,
        }
    }
}

impl AuthConfig {
    /// The JWKS URL, explicit or derived from the issuer.
    pub fn resolved_jwks_url(&self) -> String {
        match &self.jwks_url {
            Some(url) => url.clone(),
            None => format!(
                "{}/.well-known/jwks.json",
                self.issuer.trim_end_matches('/')
            ),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the upstream handler (e.g. "http://127.0.0.1:8080").
    pub upstream_url: String,

    /// Largest request body buffered for forwarding, in bytes.
    pub max_body_bytes: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            upstream_url: "http://127.0.0.1:8080".to_string(),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Response header values. Defaults are what browser clients expect.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CorsConfig {
    pub allow_origin: String,
    pub allow_headers: String,
    pub allow_methods: String,

    /// Answer `OPTIONS` preflights at the edge, before authorization.
    pub preflight: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_headers: "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Requested-With"
                .to_string(),
            allow_methods: "GET,POST,PUT,DELETE,OPTIONS".to_string(),
            preflight: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_defaults_match_browser_contract() {
        let cors = CorsConfig::default();
        assert_eq!(cors.allow_origin, "*");
        assert_eq!(
            cors.allow_headers,
            "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Requested-With"
        );
        assert_eq!(cors.allow_methods, "GET,POST,PUT,DELETE,OPTIONS");
    }

    #[test]
    fn test_jwks_url_derived_from_issuer() {
        let auth = AuthConfig {
            issuer: "https://cognito-idp.us-east-1.amazonaws.com/us-east-1_abc/".to_string(),
            ..AuthConfig::default()
        };
        assert_eq!(
            auth.resolved_jwks_url(),
            "https://cognito-idp.us-east-1.amazonaws.com/us-east-1_abc/.well-known/jwks.json"
        );

        let explicit = AuthConfig {
            jwks_url: Some("https://keys.example.com/jwks".to_string()),
            ..auth
        };
        assert_eq!(explicit.resolved_jwks_url(), "https://keys.example.com/jwks");
    }
}
