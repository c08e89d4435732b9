//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Ensure the authorizer has a key source
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("listener.max_concurrent_requests must be greater than zero")]
    MaxConcurrentRequests,

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("auth.issuer must be set")]
    MissingIssuer,

    #[error("auth has no usable key source: {0}")]
    KeySource(String),

    #[error("backend.upstream_url `{0}` is not an http URL")]
    UpstreamUrl(String),

    #[error("backend.max_body_bytes must be greater than zero")]
    MaxBodyBytes,

    #[error("cors.{0} is not a valid header value")]
    CorsHeader(&'static str),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.max_concurrent_requests == 0 {
        errors.push(ValidationError::MaxConcurrentRequests);
    }
    if config.timeouts.backend_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("backend_secs"));
    }

    let auth = &config.auth;
    if auth.issuer.trim().is_empty() {
        errors.push(ValidationError::MissingIssuer);
    }
    match &auth.hs256_secret {
        Some(secret) if secret.is_empty() => errors.push(ValidationError::KeySource(
            "auth.hs256_secret is empty".to_string(),
        )),
        Some(_) => {}
        None if !auth.issuer.trim().is_empty() || auth.jwks_url.is_some() => {
            if !has_scheme(&auth.resolved_jwks_url(), &["http", "https"]) {
                errors.push(ValidationError::KeySource(format!(
                    "JWKS url `{}` is not an http(s) URL",
                    auth.resolved_jwks_url()
                )));
            }
        }
        None => {}
    }

    // The upstream client speaks plain HTTP only.
    if !has_scheme(&config.backend.upstream_url, &["http"]) {
        errors.push(ValidationError::UpstreamUrl(
            config.backend.upstream_url.clone(),
        ));
    }
    if config.backend.max_body_bytes == 0 {
        errors.push(ValidationError::MaxBodyBytes);
    }

    let cors = &config.cors;
    for (name, value) in [
        ("allow_origin", &cors.allow_origin),
        ("allow_headers", &cors.allow_headers),
        ("allow_methods", &cors.allow_methods),
    ] {
        if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::CorsHeader(name));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn has_scheme(value: &str, schemes: &[&str]) -> bool {
    Url::parse(value)
        .map(|url| schemes.contains(&url.scheme()) && url.has_host())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.auth.issuer = "https://issuer.example.com/pool".to_string();
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert_eq!(validate_config(&valid()), Ok(()));
    }

    #[test]
    fn test_default_config_needs_issuer() {
        let errors = validate_config(&GatewayConfig::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingIssuer]);
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid();
        config.listener.bind_address = "not-an-address".to_string();
        config.listener.max_concurrent_requests = 0;
        config.timeouts.backend_secs = 0;
        config.backend.upstream_url = "ftp://files".to_string();
        config.cors.allow_methods = "GET\nPOST".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::MaxConcurrentRequests));
        assert!(errors.contains(&ValidationError::ZeroTimeout("backend_secs")));
        assert!(errors.contains(&ValidationError::CorsHeader("allow_methods")));
    }

    #[test]
    fn test_upstream_must_be_plain_http() {
        let mut config = valid();
        config.backend.upstream_url = "https://backend.internal".to_string();
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::UpstreamUrl(
                "https://backend.internal".to_string()
            )])
        );
    }

    #[test]
    fn test_empty_secret_rejected() {
        let mut config = valid();
        config.auth.hs256_secret = Some(String::new());
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::KeySource(_)));
    }

    #[test]
    fn test_issuer_must_be_url_without_secret() {
        let mut config = valid();
        config.auth.issuer = "local-dev".to_string();
        assert!(validate_config(&config).is_err());

        config.auth.hs256_secret = Some("dev-secret".to_string());
        assert_eq!(validate_config(&config), Ok(()));
    }
}
