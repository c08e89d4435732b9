//! Base URL normalization.

use url::Url;

use crate::error::ClientError;

const HTTPS: &str = "https://";
const HTTP: &str = "http://";

/// Force the edge base URL onto https.
///
/// `https://` URLs are kept, `http://` is rewritten to `https://`, and a bare
/// host gets the scheme prepended. Only an empty or unparseable value fails.
pub fn normalize_base_url(raw: &str) -> Result<Url, ClientError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ClientError::InvalidBaseUrl("base url is empty".to_string()));
    }

    let secured = if let Some(rest) = strip_scheme(trimmed, HTTPS) {
        format!("{HTTPS}{rest}")
    } else if let Some(rest) = strip_scheme(trimmed, HTTP) {
        tracing::debug!(base_url = %trimmed, "rewriting base url to https");
        format!("{HTTPS}{rest}")
    } else {
        format!("{HTTPS}{trimmed}")
    };

    Url::parse(&secured).map_err(|e| ClientError::InvalidBaseUrl(format!("{trimmed}: {e}")))
}

fn strip_scheme<'a>(value: &'a str, scheme: &str) -> Option<&'a str> {
    let prefix = value.get(..scheme.len())?;
    prefix
        .eq_ignore_ascii_case(scheme)
        .then(|| &value[scheme.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_kept() {
        let url = normalize_base_url("https://api.example.com/prod").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/prod");
    }

    #[test]
    fn test_http_rewritten() {
        let url = normalize_base_url("http://api.example.com/prod/").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/prod/");

        let url = normalize_base_url("HTTP://api.example.com").unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn test_bare_host_gets_scheme() {
        let url = normalize_base_url("abc.execute-api.us-east-1.amazonaws.com/prod").unwrap();
        assert_eq!(
            url.as_str(),
            "https://abc.execute-api.us-east-1.amazonaws.com/prod"
        );
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(
            normalize_base_url("   "),
            Err(ClientError::InvalidBaseUrl(_))
        ));
    }
}
