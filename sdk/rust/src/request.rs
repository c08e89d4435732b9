//! Request and response values exchanged with the edge.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ClientError;

/// A request about to be sent. Built fresh per call.
///
/// Header names are case-insensitive; `Authorization` is owned by the client
/// and overwritten (or removed) at send time.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl OutboundRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach a JSON body and the matching content type.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ClientError> {
        let bytes = serde_json::to_vec(body)?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(bytes);
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Idempotent reads are the only requests a retry policy may resend.
    pub fn is_idempotent_read(&self) -> bool {
        matches!(self.method, Method::GET | Method::HEAD)
    }

    pub(crate) fn into_parts(self) -> (Method, String, HeaderMap, Option<Vec<u8>>) {
        (self.method, self.path, self.headers, self.body)
    }
}

/// A 2xx answer from the edge.
#[derive(Debug, Clone)]
pub struct InboundResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl InboundResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Read a named list field out of a JSON object body.
    ///
    /// A missing field, a non-JSON body, or a field of the wrong shape all
    /// yield an empty list rather than an error.
    pub fn list_field<T: DeserializeOwned>(&self, field: &str) -> Vec<T> {
        let Ok(mut payload) = serde_json::from_slice::<serde_json::Value>(&self.body) else {
            tracing::warn!(field, "response body is not JSON, using empty list");
            return Vec::new();
        };

        match payload.get_mut(field).map(serde_json::Value::take) {
            None | Some(serde_json::Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!(field, error = %e, "malformed list field, using empty list");
                Vec::new()
            }),
        }
    }
}
