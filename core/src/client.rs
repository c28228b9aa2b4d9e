//! Request builder, response parser and blocking executor for auto-api.
//!
//! # Design
//! `Client` holds an immutable `ClientConfig` plus a `ureq::Agent`, and keeps
//! no per-call state, so one instance can be shared across threads. Every
//! operation is split into a `build_*` method that produces an `HttpRequest`
//! and a `parse_*` method that consumes an `HttpResponse`; the `get_*`
//! methods glue the two together around a single blocking round trip.
//!
//! GET endpoints authenticate with an `api_key` query parameter, which is
//! always the first pair and cannot be overridden by caller filters. The
//! offer-by-URL lookup authenticates with the `x-api-key` header instead and
//! never carries the key in its URL.

use std::fmt;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, Error, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{OfferInfoRequest, OfferParams};

/// How much of an undecodable body is quoted in the error message.
const BODY_PREVIEW_CHARS: usize = 200;

/// Blocking client for the auto-api.com listings API.
#[derive(Clone)]
pub struct Client {
    config: ClientConfig,
    agent: ureq::Agent,
}

impl Client {
    /// Client with the default base URL, API version and 30 second timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_config(ClientConfig::new(api_key))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        // Status codes are interpreted by `check_status`, not by ureq.
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { config, agent }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Request builders
    // -----------------------------------------------------------------------

    pub fn build_filters(&self, source: &str) -> HttpRequest {
        self.source_request(source, "filters", Vec::new())
    }

    pub fn build_offers(&self, source: &str, params: &OfferParams) -> HttpRequest {
        self.source_request(source, "offers", params.to_query())
    }

    pub fn build_offer(&self, source: &str, inner_id: &str) -> HttpRequest {
        self.source_request(source, "offer", vec![("inner_id".to_string(), inner_id.to_string())])
    }

    /// `date` is passed through verbatim; the API expects `yyyy-mm-dd`.
    pub fn build_change_id(&self, source: &str, date: &str) -> HttpRequest {
        self.source_request(source, "change_id", vec![("date".to_string(), date.to_string())])
    }

    pub fn build_changes(&self, source: &str, change_id: i64) -> HttpRequest {
        self.source_request(source, "changes", vec![("change_id".to_string(), change_id.to_string())])
    }

    /// The URL lookup lives under `/api/v1` whatever version is configured.
    pub fn build_offer_by_url(&self, url: &str) -> Result<HttpRequest> {
        let body = serde_json::to_string(&OfferInfoRequest { url })?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}/api/v1/offer/info", self.config.base_url()),
            query: Vec::new(),
            headers: vec![
                ("content-type".to_string(), "application/json".to_string()),
                ("x-api-key".to_string(), self.config.api_key().to_string()),
            ],
            body: Some(body),
        })
    }

    fn source_request(&self, source: &str, endpoint: &str, params: Vec<(String, String)>) -> HttpRequest {
        let mut query = vec![("api_key".to_string(), self.config.api_key().to_string())];
        query.extend(params.into_iter().filter(|(key, _)| key != "api_key"));
        HttpRequest {
            method: HttpMethod::Get,
            url: format!(
                "{}/api/{}/{source}/{endpoint}",
                self.config.base_url(),
                self.config.api_version()
            ),
            query,
            headers: Vec::new(),
            body: None,
        }
    }

    // -----------------------------------------------------------------------
    // Response parsers
    // -----------------------------------------------------------------------

    /// Check the status, then decode the body as JSON.
    pub fn parse_json(&self, response: HttpResponse) -> Result<Value> {
        check_status(&response)?;
        Ok(decode(&response)?)
    }

    pub fn parse_filters(&self, response: HttpResponse) -> Result<Value> {
        self.parse_json(response)
    }

    pub fn parse_offers(&self, response: HttpResponse) -> Result<Value> {
        self.parse_json(response)
    }

    pub fn parse_offer(&self, response: HttpResponse) -> Result<Value> {
        self.parse_json(response)
    }

    pub fn parse_changes(&self, response: HttpResponse) -> Result<Value> {
        self.parse_json(response)
    }

    pub fn parse_offer_by_url(&self, response: HttpResponse) -> Result<Value> {
        self.parse_json(response)
    }

    /// Extract `change_id` as an integer. Zero is a valid cursor.
    pub fn parse_change_id(&self, response: HttpResponse) -> Result<i64> {
        let value = self.parse_json(response)?;
        value
            .get("change_id")
            .and_then(coerce_integer)
            .ok_or(Error::UnexpectedResponse { field: "change_id" })
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Available filters for a source (brands, models, body types, ...).
    #[instrument(skip(self))]
    pub fn get_filters(&self, source: &str) -> Result<Value> {
        self.parse_filters(self.execute(self.build_filters(source))?)
    }

    /// One page of offers matching `params`.
    #[instrument(skip(self))]
    pub fn get_offers(&self, source: &str, params: &OfferParams) -> Result<Value> {
        self.parse_offers(self.execute(self.build_offers(source, params))?)
    }

    /// A single offer by its inner id.
    #[instrument(skip(self))]
    pub fn get_offer(&self, source: &str, inner_id: &str) -> Result<Value> {
        self.parse_offer(self.execute(self.build_offer(source, inner_id))?)
    }

    /// First change-feed cursor for a date (`yyyy-mm-dd`).
    #[instrument(skip(self))]
    pub fn get_change_id(&self, source: &str, date: &str) -> Result<i64> {
        self.parse_change_id(self.execute(self.build_change_id(source, date))?)
    }

    /// One batch of the change feed starting at `change_id`.
    #[instrument(skip(self))]
    pub fn get_changes(&self, source: &str, change_id: i64) -> Result<Value> {
        self.parse_changes(self.execute(self.build_changes(source, change_id))?)
    }

    /// Offer data for a listing URL on any supported marketplace.
    #[instrument(skip(self))]
    pub fn get_offer_by_url(&self, url: &str) -> Result<Value> {
        self.parse_offer_by_url(self.execute(self.build_offer_by_url(url)?)?)
    }

    /// Perform one round trip. Any status code comes back as a response;
    /// only transport failures are errors here.
    pub fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(method = ?request.method, url = %request.url, "sending request");

        let mut response = match request.method {
            HttpMethod::Get => {
                let mut builder = self
                    .agent
                    .get(&request.url)
                    .query_pairs(request.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()?
            }
            HttpMethod::Post => {
                let mut builder = self
                    .agent
                    .post(&request.url)
                    .query_pairs(request.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                match &request.body {
                    Some(body) => builder.send(body.as_bytes())?,
                    None => builder.send_empty()?,
                }
            }
        };

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();
        // Body size is left to the decoder; bytes that are not UTF-8 are
        // replaced so the status and JSON checks still run.
        let bytes = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()?;
        let body = String::from_utf8_lossy(&bytes).into_owned();
        debug!(status, %content_type, bytes = bytes.len(), "received response");

        Ok(HttpResponse { status, body })
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Translate a failing status into an `ApiError`.
///
/// The body's `message` field becomes the error message when present; only
/// then is the decoded body attached. 401 and 403 become auth errors.
fn check_status(response: &HttpResponse) -> std::result::Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }

    let status = response.status;
    let (message, body) = match serde_json::from_str::<Value>(&response.body) {
        Ok(Value::Object(map)) if map.get("message").is_some_and(|m| !m.is_null()) => {
            let message = match &map["message"] {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            (message, Some(Value::Object(map)))
        }
        _ => {
            let fallback = format!("API error: {status} {}", response.reason());
            (fallback.trim_end().to_string(), None)
        }
    };

    let err = match status {
        401 | 403 => ApiError::auth(message, status),
        _ => match body {
            Some(body) => ApiError::new(message, status).with_body(body),
            None => ApiError::new(message, status),
        },
    };
    warn!(status, kind = ?err.kind(), message = %err.message(), "API request failed");
    Err(err)
}

fn decode(response: &HttpResponse) -> std::result::Result<Value, ApiError> {
    serde_json::from_str(&response.body).map_err(|_| {
        let preview: String = response.body.chars().take(BODY_PREVIEW_CHARS).collect();
        warn!(status = response.status, "response body is not JSON");
        ApiError::new(format!("Invalid JSON response: {preview}"), response.status)
    })
}

/// Integers, decimal strings and floats (truncated toward zero) all count.
fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .map(f64::trunc)
                .filter(|f| f.is_finite() && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
