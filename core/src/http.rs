//! HTTP request and response values.
//!
//! # Design
//! Requests and responses are plain data. `Client::build_*` produces an
//! `HttpRequest`, and `Client::parse_*` consumes an `HttpResponse`, so the
//! marshaling and error-translation rules can be exercised without a socket.
//! `Client::execute` is the only place that performs I/O.
//!
//! `url` never carries the query string; query parameters stay in `query`
//! until the transport encodes them.

use ureq::http::StatusCode;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// First query value for `key`, if any.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First header value for `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
///
/// `body` is the payload decoded as UTF-8, with invalid sequences replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Statuses 200 through 399 count as success; redirects the transport
    /// did not follow are handed to the decoder as-is.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }

    /// Canonical reason phrase for the status, or an empty string for codes
    /// the registry does not name.
    pub fn reason(&self) -> &'static str {
        StatusCode::from_u16(self.status)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or("")
    }
}
