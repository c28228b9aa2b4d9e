//! In-process imitation of the auto-api.com REST surface.
//!
//! # Design
//! Serves canned listings from `fixtures::catalog()` behind the same URL
//! scheme and authentication rules as the real API, so the client can be
//! exercised end to end over real HTTP. A few reserved source names inject
//! failures the real API produces only occasionally.

pub mod fixtures;

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::debug;

use fixtures::{Catalog, Listing, Source};

/// The only key the mock accepts.
pub const API_KEY: &str = "test-key";
/// A key the mock recognises but refuses with 403.
pub const REVOKED_KEY: &str = "revoked-key";
/// Source answering 200 with an HTML body.
pub const BROKEN_SOURCE: &str = "broken";
/// Source answering 500 with a JSON body lacking `message`.
pub const FAILING_SOURCE: &str = "failing";
/// Offers and changes per page.
pub const PAGE_SIZE: usize = 2;

pub type Db = Arc<Catalog>;

#[derive(Deserialize)]
pub struct OfferInfo {
    pub url: String,
}

pub fn app() -> Router {
    let db: Db = Arc::new(fixtures::catalog());
    Router::new()
        .route(
            "/api/{version}/{source}/{endpoint}",
            get(dispatch_get).post(dispatch_post),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn error(status: StatusCode, message: &str) -> Response {
    reply(status, json!({ "message": message }))
}

fn authorize(key: Option<&str>) -> Result<(), Response> {
    match key {
        Some(API_KEY) => Ok(()),
        Some(REVOKED_KEY) => Err(error(StatusCode::FORBIDDEN, "API key revoked")),
        _ => Err(error(StatusCode::UNAUTHORIZED, "Invalid API key")),
    }
}

async fn dispatch_get(
    State(db): State<Db>,
    Path((version, source, endpoint)): Path<(String, String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    debug!(%version, %source, %endpoint, "GET");
    if let Err(rejected) = authorize(params.get("api_key").map(String::as_str)) {
        return rejected;
    }
    if version != "v2" {
        return error(StatusCode::NOT_FOUND, "Unsupported API version");
    }

    match source.as_str() {
        BROKEN_SOURCE => return (StatusCode::OK, "<html>upstream exploded</html>").into_response(),
        FAILING_SOURCE => {
            return reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "upstream unavailable" }),
            )
        }
        _ => {}
    }

    let Some(src) = db.source(&source) else {
        return error(StatusCode::NOT_FOUND, "Source not found");
    };

    match endpoint.as_str() {
        "filters" => reply(StatusCode::OK, src.filters()),
        "offers" => offers(src, &params),
        "offer" => offer(src, &params),
        "change_id" => change_id(src, &params),
        "changes" => changes(src, &params),
        _ => error(StatusCode::NOT_FOUND, "Endpoint not found"),
    }
}

async fn dispatch_post(
    State(db): State<Db>,
    Path((version, source, endpoint)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(input): Json<OfferInfo>,
) -> Response {
    debug!(%version, %source, %endpoint, "POST");
    if (version.as_str(), source.as_str(), endpoint.as_str()) != ("v1", "offer", "info") {
        return error(StatusCode::NOT_FOUND, "Endpoint not found");
    }
    if let Err(rejected) = authorize(headers.get("x-api-key").and_then(|v| v.to_str().ok())) {
        return rejected;
    }

    match db.find_by_url(&input.url) {
        Some((source, listing)) => {
            let mut body = json!(listing);
            body["source"] = json!(source);
            reply(StatusCode::OK, body)
        }
        None => error(StatusCode::NOT_FOUND, "Offer not found"),
    }
}

fn summary(listing: &Listing) -> Value {
    json!({ "inner_id": listing.inner_id, "data": listing })
}

fn offers(src: &Source, params: &HashMap<String, String>) -> Response {
    let page = match params.get("page").map(|p| p.parse::<usize>()) {
        None => 1,
        Some(Ok(page)) if page >= 1 => page,
        _ => return error(StatusCode::UNPROCESSABLE_ENTITY, "Invalid page"),
    };

    let matching: Vec<&Listing> = src
        .listings
        .iter()
        .filter(|listing| matches_filters(listing, params))
        .collect();
    let start = (page - 1) * PAGE_SIZE;
    let result: Vec<Value> = matching
        .iter()
        .skip(start)
        .take(PAGE_SIZE)
        .map(|listing| summary(listing))
        .collect();
    let next_page = (start + PAGE_SIZE < matching.len()).then_some(page + 1);

    reply(
        StatusCode::OK,
        json!({
            "result": result,
            "meta": { "page": page, "next_page": next_page, "limit": PAGE_SIZE },
        }),
    )
}

fn matches_filters(listing: &Listing, params: &HashMap<String, String>) -> bool {
    let text = |key: &str, actual: &str| {
        params
            .get(key)
            .is_none_or(|wanted| wanted.eq_ignore_ascii_case(actual))
    };
    let number = |key: &str| params.get(key).and_then(|v| v.parse::<u64>().ok());
    let at_least = |key: &str, actual: u64| number(key).is_none_or(|min| actual >= min);
    let at_most = |key: &str, actual: u64| number(key).is_none_or(|max| actual <= max);

    text("brand", &listing.mark)
        && text("model", &listing.model)
        && text("color", &listing.color)
        && text("transmission", &listing.transmission_type)
        && text("body_type", &listing.body_type)
        && at_least("year_from", listing.year.into())
        && at_most("year_to", listing.year.into())
        && at_least("mileage_from", listing.km_age)
        && at_most("mileage_to", listing.km_age)
        && at_least("price_from", listing.price)
        && at_most("price_to", listing.price)
}

fn offer(src: &Source, params: &HashMap<String, String>) -> Response {
    let Some(inner_id) = params.get("inner_id") else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "inner_id is required");
    };
    match src.listings.iter().find(|listing| &listing.inner_id == inner_id) {
        Some(listing) => reply(StatusCode::OK, summary(listing)),
        None => error(StatusCode::NOT_FOUND, "Offer not found"),
    }
}

fn is_iso_date(date: &str) -> bool {
    let bytes = date.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

fn change_id(src: &Source, params: &HashMap<String, String>) -> Response {
    let Some(date) = params.get("date").filter(|d| is_iso_date(d)) else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "Invalid date format, expected yyyy-mm-dd");
    };
    // Dates after the last change point just past the end of the feed.
    let id = match src
        .changes
        .iter()
        .find(|change| change.date.as_str() >= date.as_str())
    {
        Some(change) => change.change_id,
        None => src.changes.last().map_or(0, |change| change.change_id + 1),
    };
    reply(StatusCode::OK, json!({ "change_id": id }))
}

fn changes(src: &Source, params: &HashMap<String, String>) -> Response {
    let Some(cursor) = params.get("change_id").and_then(|v| v.parse::<i64>().ok()) else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "change_id must be an integer");
    };
    let pending: Vec<_> = src
        .changes
        .iter()
        .filter(|change| change.change_id >= cursor)
        .collect();
    let batch: Vec<_> = pending.iter().take(PAGE_SIZE).collect();
    let next_change_id = pending.get(PAGE_SIZE).map(|change| change.change_id);

    reply(
        StatusCode::OK,
        json!({
            "result": batch,
            "meta": {
                "cur_change_id": cursor,
                "next_change_id": next_change_id,
                "limit": PAGE_SIZE,
            },
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn encar() -> Source {
        fixtures::catalog().source("encar").cloned().unwrap()
    }

    #[test]
    fn authorize_accepts_only_the_known_key() {
        assert!(authorize(Some(API_KEY)).is_ok());
        let revoked = authorize(Some(REVOKED_KEY)).unwrap_err();
        assert_eq!(revoked.status(), StatusCode::FORBIDDEN);
        let missing = authorize(None).unwrap_err();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn iso_dates() {
        assert!(is_iso_date("2025-01-15"));
        assert!(!is_iso_date("2025-1-15"));
        assert!(!is_iso_date("15/01/2025"));
    }

    #[test]
    fn filters_match_brand_case_insensitively() {
        let src = encar();
        let hyundai = params(&[("brand", "hyundai")]);
        let count = src
            .listings
            .iter()
            .filter(|l| matches_filters(l, &hyundai))
            .count();
        assert_eq!(count, 3);
    }

    #[test]
    fn numeric_bounds_are_inclusive() {
        let src = encar();
        let bounds = params(&[("year_from", "2021"), ("price_to", "27900")]);
        let ids: Vec<_> = src
            .listings
            .iter()
            .filter(|l| matches_filters(l, &bounds))
            .map(|l| l.inner_id.as_str())
            .collect();
        assert_eq!(ids, vec!["40427050", "40427051"]);
    }

    #[test]
    fn filters_collect_distinct_values() {
        let filters = encar().filters();
        assert_eq!(filters["mark"], json!(["Genesis", "Hyundai", "Kia"]));
        assert_eq!(filters["transmission_type"], json!(["automatic", "manual"]));
    }

    #[test]
    fn find_by_url_reports_source() {
        let catalog = fixtures::catalog();
        let (source, listing) = catalog
            .find_by_url("https://suchen.mobile.de/fahrzeuge/details.html?id=1001")
            .unwrap();
        assert_eq!(source, "mobile_de");
        assert_eq!(listing.model, "X5");
    }
}
