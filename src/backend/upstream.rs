//! Forwarding to an HTTP upstream.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the upstream base URL
//! - Strip hop-by-hop headers before forwarding
//! - Treat upstream 2xx as the handler's success; anything else is an error
//!   with the upstream payload kept verbatim

use std::str::FromStr;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{header, HeaderMap, HeaderName, Request, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::backend::{BackendError, BackendHandler, BackendReply, BackendRequest};

/// Hop-by-hop headers (RFC 9110 §7.6.1) plus `host`, which the client
/// recomputes for the upstream authority.
static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    header::HOST,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Largest upstream response body read into memory.
const MAX_RESPONSE_BYTES: usize = 32 * 1024 * 1024;

pub struct UpstreamBackend {
    client: Client<HttpConnector, Body>,
    scheme: Scheme,
    authority: Authority,
    base_path: String,
}

impl UpstreamBackend {
    pub fn new(upstream_url: &str) -> Result<Self, BackendError> {
        let url = Url::parse(upstream_url)
            .map_err(|e| BackendError::Unavailable(format!("invalid upstream url: {e}")))?;

        let scheme = match url.scheme() {
            "http" => Scheme::HTTP,
            other => {
                return Err(BackendError::Unavailable(format!(
                    "unsupported upstream scheme `{other}`"
                )))
            }
        };

        let host = url
            .host_str()
            .ok_or_else(|| BackendError::Unavailable("upstream url has no host".to_string()))?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let authority = Authority::from_str(&authority)
            .map_err(|e| BackendError::Unavailable(format!("invalid upstream authority: {e}")))?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            client,
            scheme,
            authority,
            base_path: url.path().trim_end_matches('/').to_string(),
        })
    }

    fn target_uri(&self, uri: &Uri) -> Result<Uri, BackendError> {
        let path_and_query = uri
            .path_and_query()
            .map(PathAndQuery::as_str)
            .unwrap_or("/");
        let path_and_query = PathAndQuery::from_str(&format!("{}{}", self.base_path, path_and_query))
            .map_err(|e| BackendError::InvalidRequest(format!("invalid path: {e}")))?;

        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| BackendError::InvalidRequest(format!("invalid upstream uri: {e}")))
    }
}

pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named in `Connection` are hop-by-hop too.
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_str(name.trim()).ok())
        .collect();

    for name in HOP_BY_HOP.iter().chain(named.iter()) {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove("proxy-connection");
}

#[async_trait]
impl BackendHandler for UpstreamBackend {
    async fn handle(&self, request: BackendRequest) -> Result<BackendReply, BackendError> {
        let uri = self.target_uri(&request.uri)?;

        let mut headers = request.headers;
        strip_hop_by_hop(&mut headers);

        let mut outbound = Request::builder()
            .method(request.method)
            .uri(uri)
            .body(Body::from(request.body))
            .map_err(|e| BackendError::InvalidRequest(e.to_string()))?;
        *outbound.headers_mut() = headers;

        let response = self
            .client
            .request(outbound)
            .await
            .map_err(|e| BackendError::Unavailable(format!("upstream request failed: {e}")))?;

        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), MAX_RESPONSE_BYTES)
            .await
            .map_err(|e| BackendError::Unavailable(format!("failed to read upstream body: {e}")))?;
        let content_type = parts.headers.get(header::CONTENT_TYPE).cloned();

        if parts.status.is_success() {
            Ok(BackendReply {
                status: parts.status,
                content_type,
                body,
            })
        } else {
            Err(BackendError::Status {
                status: parts.status,
                content_type,
                body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_target_uri_keeps_path_and_query() {
        let backend = UpstreamBackend::new("http://127.0.0.1:8080/api/").unwrap();
        let uri = backend
            .target_uri(&Uri::from_static("/apps/inv1?page=2"))
            .unwrap();
        assert_eq!(uri.to_string(), "http://127.0.0.1:8080/api/apps/inv1?page=2");

        let root = UpstreamBackend::new("http://backend").unwrap();
        assert_eq!(
            root.target_uri(&Uri::from_static("/")).unwrap().to_string(),
            "http://backend/"
        );
    }

    #[test]
    fn test_rejects_unsupported_scheme() {
        assert!(UpstreamBackend::new("ftp://files").is_err());
        assert!(UpstreamBackend::new("not a url").is_err());
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-trace-hop"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-trace-hop", HeaderValue::from_static("1"));
        headers.insert(header::HOST, HeaderValue::from_static("edge.example.com"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 2);
        assert!(headers.contains_key(header::AUTHORIZATION));
        assert!(headers.contains_key(header::CONTENT_TYPE));
    }
}
