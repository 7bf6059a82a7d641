//! Request and response values exchanged between the page, the router, the
//! cache and the network.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// Body of the synthetic response served when an API call cannot reach the network.
pub const OFFLINE_API_BODY: &str = r#"{"error":"Network error","message":"No connection"}"#;

/// How the page issued a request.
///
/// Only `Navigate` changes routing; the other modes are carried for completeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    Navigate,
    #[default]
    SameOrigin,
    NoCors,
    Cors,
}

/// An outbound request intercepted from the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub url: Url,
    #[serde(default)]
    pub mode: RequestMode,
}

impl Request {
    /// A plain `GET` request for a subresource.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url, mode: RequestMode::SameOrigin }
    }

    /// A document navigation request.
    pub fn navigate(url: Url) -> Self {
        Self { method: "GET".into(), url, mode: RequestMode::Navigate }
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Only `GET` requests are looked up in or written to the cache.
    pub fn is_cacheable(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// Cache entry key: the URL without its fragment, or `None` when the
    /// request is not cacheable.
    pub fn cache_key(&self) -> Option<String> {
        if !self.is_cacheable() {
            return None;
        }
        let mut url = self.url.clone();
        url.set_fragment(None);
        Some(url.into())
    }
}

/// A response snapshot: status, headers and the complete body.
///
/// The body is reference counted, so `clone()` hands out an independent
/// handle to the same bytes. Cache writers always receive such a clone while
/// the original goes back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Bytes>) -> Self {
        Self { url: url.into(), status, status_text: String::new(), headers: Vec::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Synthetic 503 returned for API requests when the network is unreachable.
    pub fn service_unavailable_json() -> Self {
        Self {
            url: String::new(),
            status: 503,
            status_text: "Service Unavailable".into(),
            headers: vec![("content-type".into(), "application/json".into())],
            body: Bytes::from_static(OFFLINE_API_BODY.as_bytes()),
        }
    }

    /// True for statuses in the 200..=299 range.
    pub fn ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Case-insensitive header lookup returning the first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
