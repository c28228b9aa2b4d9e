//! Error types for the auto-api client.
//!
//! # Design
//! `ApiError` covers everything the remote API told us went wrong: a failing
//! HTTP status or a body that is not JSON. Authentication failures (401/403)
//! are the same struct tagged `ErrorKind::Auth`, so code that only cares about
//! "the API rejected the call" handles both with one match arm, while
//! `is_auth()` narrows when it matters. An auth error never carries a
//! response body.
//!
//! Transport failures (timeouts, DNS, refused connections) are not API errors
//! and surface separately as `Error::Transport`.

use serde_json::Value;
use thiserror::Error;

/// Message of the default authentication error.
pub const DEFAULT_AUTH_MESSAGE: &str = "Invalid or missing API key";

pub type Result<T> = std::result::Result<T, Error>;

/// Which flavour of API failure an `ApiError` is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Any failing status other than 401/403, or an undecodable body.
    Api,
    /// The server rejected the API key (HTTP 401 or 403).
    Auth,
}

/// A failure reported by the remote API.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    status_code: u16,
    response_body: Option<Value>,
}

impl ApiError {
    pub fn new(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            kind: ErrorKind::Api,
            message: message.into(),
            status_code,
            response_body: None,
        }
    }

    /// Attach the decoded error body. Has no effect on auth errors.
    pub fn with_body(mut self, body: Value) -> Self {
        if self.kind == ErrorKind::Api {
            self.response_body = Some(body);
        }
        self
    }

    pub fn auth(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            kind: ErrorKind::Auth,
            ..Self::new(message, status_code)
        }
    }

    /// The default auth error: missing or unrecognised key, HTTP 401.
    pub fn invalid_key() -> Self {
        Self::auth(DEFAULT_AUTH_MESSAGE, 401)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_auth(&self) -> bool {
        self.kind == ErrorKind::Auth
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn response_body(&self) -> Option<&Value> {
        self.response_body.as_ref()
    }
}

/// Errors returned by `Client`.
#[derive(Debug, Error)]
pub enum Error {
    /// The API answered with a failure (see `ApiError::kind`).
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The request never produced a response: timeout, DNS, TLS, I/O.
    #[error("transport error: {0}")]
    Transport(#[from] ureq::Error),

    /// A successful JSON response lacked a field in a usable shape.
    #[error("response field `{field}` is missing or not an integer")]
    UnexpectedResponse { field: &'static str },

    /// The request payload could not be serialized to JSON.
    #[error("failed to serialize request body: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// The API error, if this is one (auth errors included).
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        self.as_api().is_some_and(ApiError::is_auth)
    }
}
