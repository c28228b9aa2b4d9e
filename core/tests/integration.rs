//! End-to-end tests against the live mock server.
//!
//! # Design
//! Each test starts the mock server on a random port in a background thread
//! with its own tokio runtime, then drives the blocking client over real
//! HTTP. This covers what the unit tests cannot: query encoding, header
//! transmission, and transport failures. A bare TCP responder covers bodies
//! the mock never sends: invalid UTF-8, empty, and larger than 10 MiB.

use std::io::{Read, Write};
use std::net::SocketAddr;
use std::time::Duration;

use auto_api::{ApiError, Client, ClientConfig, Error, ErrorKind, OfferParams};
use mock_server::{API_KEY, BROKEN_SOURCE, FAILING_SOURCE, REVOKED_KEY};

/// Start the mock server on a random port and return its address.
fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

/// Answer a single request with a hand-written status line and raw body,
/// for payloads axum would never produce.
fn serve_raw_once(status_line: &'static str, body: Vec<u8>) -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }
        // 204 responses must not declare a length.
        let length = if status_line.starts_with("204") {
            String::new()
        } else {
            format!("Content-Length: {}\r\n", body.len())
        };
        let head = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\n{length}Connection: close\r\n\r\n"
        );
        stream.write_all(head.as_bytes()).unwrap();
        stream.write_all(&body).unwrap();
        stream.flush().unwrap();
    });

    addr
}

fn client_for(addr: SocketAddr, key: &str) -> Client {
    // Trailing slash on purpose: the client must strip it.
    Client::with_config(ClientConfig::new(key).with_base_url(&format!("http://{addr}/")))
}

fn api_error<T: std::fmt::Debug>(result: auto_api::Result<T>) -> ApiError {
    match result {
        Err(Error::Api(err)) => err,
        other => panic!("expected an API error, got {other:?}"),
    }
}

#[test]
fn full_walkthrough() {
    let addr = start_server();
    let client = client_for(addr, API_KEY);

    // Step 1: filters.
    let filters = client.get_filters("encar").unwrap();
    assert_eq!(filters["mark"][1], "Hyundai");

    // Step 2: first page of filtered offers.
    let params = OfferParams {
        page: Some(1),
        brand: Some("Hyundai".to_string()),
        ..OfferParams::default()
    };
    let offers = client.get_offers("encar", &params).unwrap();
    let result = offers["result"].as_array().unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(offers["meta"]["next_page"], 2);

    // Step 3: follow pagination by hand.
    let next = OfferParams {
        page: offers["meta"]["next_page"].as_u64().map(|p| p as u32),
        ..params
    };
    let page_two = client.get_offers("encar", &next).unwrap();
    assert_eq!(page_two["result"][0]["data"]["model"], "Avante");
    assert!(page_two["meta"]["next_page"].is_null());

    // Step 4: single offer.
    let inner_id = result[0]["inner_id"].as_str().unwrap();
    let offer = client.get_offer("encar", inner_id).unwrap();
    assert_eq!(offer["data"]["seller_type"], "dealer");

    // Step 5: change feed from a date.
    let change_id = client.get_change_id("encar", "2025-01-15").unwrap();
    assert_eq!(change_id, 101);
    let changes = client.get_changes("encar", change_id).unwrap();
    assert_eq!(changes["result"].as_array().unwrap().len(), 2);
    let next_change_id = changes["meta"]["next_change_id"].as_i64().unwrap();
    let more = client.get_changes("encar", next_change_id).unwrap();
    assert_eq!(more["result"][0]["change_type"], "removed");

    // Step 6: lookup by listing URL.
    let info = client
        .get_offer_by_url("https://www.encar.com/dc/dc_cardetailview.do?carid=40427050")
        .unwrap();
    assert_eq!(info["model"], "Sonata");
}

#[test]
fn bad_key_is_auth_error() {
    let addr = start_server();
    let err = api_error(client_for(addr, "invalid-key").get_offers("encar", &OfferParams::page(1)));
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(err.status_code(), 401);
    assert_eq!(err.message(), "Invalid API key");
    assert!(err.response_body().is_none());
}

#[test]
fn revoked_key_is_auth_error() {
    let addr = start_server();
    let err = api_error(client_for(addr, REVOKED_KEY).get_filters("encar"));
    assert!(err.is_auth());
    assert_eq!(err.status_code(), 403);
}

#[test]
fn offer_by_url_authenticates_with_header() {
    let addr = start_server();
    let err = api_error(client_for(addr, "invalid-key").get_offer_by_url("https://example.com"));
    assert!(err.is_auth());

    let err = api_error(client_for(addr, API_KEY).get_offer_by_url("https://example.com/car/0"));
    assert!(!err.is_auth());
    assert_eq!(err.status_code(), 404);
    assert_eq!(err.message(), "Offer not found");
}

#[test]
fn unknown_source_is_plain_api_error() {
    let addr = start_server();
    let err = api_error(client_for(addr, API_KEY).get_filters("unknown_source"));
    assert_eq!(err.kind(), ErrorKind::Api);
    assert_eq!(err.status_code(), 404);
    assert_eq!(
        err.response_body().and_then(|b| b["message"].as_str()),
        Some("Source not found")
    );
}

#[test]
fn error_without_message_uses_fallback() {
    let addr = start_server();
    let err = api_error(client_for(addr, API_KEY).get_filters(FAILING_SOURCE));
    assert_eq!(err.message(), "API error: 500 Internal Server Error");
    assert!(err.response_body().is_none());
}

#[test]
fn html_body_is_invalid_json() {
    let addr = start_server();
    let err = api_error(client_for(addr, API_KEY).get_filters(BROKEN_SOURCE));
    assert_eq!(err.status_code(), 200);
    assert_eq!(err.message(), "Invalid JSON response: <html>upstream exploded</html>");
}

#[test]
fn custom_version_reaches_server() {
    let addr = start_server();
    let client = Client::with_config(
        ClientConfig::new(API_KEY)
            .with_base_url(&format!("http://{addr}"))
            .with_api_version("v3"),
    );
    let err = api_error(client.get_filters("encar"));
    assert_eq!(err.message(), "Unsupported API version");

    // The URL lookup is pinned to v1 and still works.
    let info = client
        .get_offer_by_url("https://suchen.mobile.de/fahrzeuge/details.html?id=1001")
        .unwrap();
    assert_eq!(info["mark"], "BMW");
}

#[test]
fn connection_refused_is_transport_error() {
    // Grab a free port, then close it so nothing is listening.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let err = client_for(addr, API_KEY).get_filters("encar").unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got {err:?}");
    assert!(err.as_api().is_none());
}

#[test]
fn silent_server_times_out() {
    // Accepts connections via the backlog but never answers.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let client = Client::with_config(
        ClientConfig::new(API_KEY)
            .with_base_url(&format!("http://{addr}"))
            .with_timeout(Duration::from_millis(300)),
    );
    let err = client.get_filters("encar").unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got {err:?}");
    drop(listener);
}

#[test]
fn client_is_shareable_across_threads() {
    let addr = start_server();
    let client = client_for(addr, API_KEY);
    let handles: Vec<_> = ["encar", "mobile_de"]
        .into_iter()
        .map(|source| {
            let client = client.clone();
            std::thread::spawn(move || client.get_filters(source).unwrap())
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap()["mark"].is_array());
    }
}

#[test]
fn non_utf8_error_body_uses_fallback_message() {
    let addr = serve_raw_once("500 Internal Server Error", b"<html>\xff\xfe broken</html>".to_vec());
    let err = api_error(client_for(addr, API_KEY).get_filters("encar"));
    assert_eq!(err.kind(), ErrorKind::Api);
    assert_eq!(err.status_code(), 500);
    assert_eq!(err.message(), "API error: 500 Internal Server Error");
}

#[test]
fn non_utf8_success_body_is_invalid_json() {
    let addr = serve_raw_once("200 OK", b"<html>\xff\xfe broken</html>".to_vec());
    let err = api_error(client_for(addr, API_KEY).get_filters("encar"));
    assert_eq!(err.status_code(), 200);
    assert!(err.message().starts_with("Invalid JSON response: <html>"), "{}", err.message());
    assert!(err.message().contains('\u{FFFD}'));
}

#[test]
fn body_larger_than_ten_mebibytes_is_decoded() {
    let pad = "a".repeat(11 * 1024 * 1024);
    let body = format!(r#"{{"pad":"{pad}"}}"#).into_bytes();
    let addr = serve_raw_once("200 OK", body);
    let value = client_for(addr, API_KEY).get_filters("encar").unwrap();
    assert_eq!(value["pad"].as_str().map(str::len), Some(pad.len()));
}

#[test]
fn empty_success_body_is_invalid_json() {
    let addr = serve_raw_once("200 OK", Vec::new());
    let err = api_error(client_for(addr, API_KEY).get_filters("encar"));
    assert_eq!(err.status_code(), 200);
    assert_eq!(err.message(), "Invalid JSON response: ");
}

#[test]
fn no_content_is_invalid_json() {
    let addr = serve_raw_once("204 No Content", Vec::new());
    let err = api_error(client_for(addr, API_KEY).get_offer("encar", "40427050"));
    assert_eq!(err.status_code(), 204);
    assert_eq!(err.message(), "Invalid JSON response: ");
}
