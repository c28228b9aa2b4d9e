//! Blocking client for the auto-api.com vehicle listings API.
//!
//! # Overview
//! auto-api.com aggregates car listings from several marketplaces
//! ("sources", e.g. `encar`, `mobile_de`). This crate wraps its REST surface:
//! filter metadata, paginated offers, single offers, the incremental change
//! feed, and offer lookup by listing URL.
//!
//! ```no_run
//! use auto_api::{Client, OfferParams};
//!
//! fn main() -> auto_api::Result<()> {
//!     let client = Client::new("your-api-key");
//!     let offers = client.get_offers("encar", &OfferParams::page(1))?;
//!     println!("{}", offers["meta"]);
//!     Ok(())
//! }
//! ```
//!
//! # Design
//! - `Client` is stateless apart from its immutable config and is safe to
//!   share between threads.
//! - Each operation is split into `build_*` (produces an `HttpRequest`) and
//!   `parse_*` (consumes an `HttpResponse`); `get_*` runs both around one
//!   blocking request.
//! - No retries, caching or pagination auto-follow: callers feed
//!   `meta.next_page` / `meta.next_change_id` back in themselves.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use client::Client;
pub use config::{ClientConfig, DEFAULT_API_VERSION, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use error::{ApiError, Error, ErrorKind, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use types::{OfferInfoRequest, OfferParams};
