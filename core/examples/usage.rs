//! Walk through every operation against the live API.
//!
//! ```sh
//! AUTO_API_KEY=... cargo run -p auto-api --example usage
//! ```
//!
//! Point `AUTO_API_URL` at a running `mock-server` (key `test-key`) to try it
//! offline.

use auto_api::{Client, ClientConfig, Error, OfferParams, DEFAULT_BASE_URL};
use tracing_subscriber::EnvFilter;

fn main() -> auto_api::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let key = std::env::var("AUTO_API_KEY").unwrap_or_else(|_| "your-api-key".to_string());
    let base_url = std::env::var("AUTO_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let client = Client::with_config(ClientConfig::new(key).with_base_url(&base_url));
    let source = "encar";

    let filters = client.get_filters(source)?;
    println!("Available brands: {}", filters["mark"]);
    println!("Body types: {}", filters["body_type"]);

    let params = OfferParams {
        page: Some(1),
        brand: Some("Hyundai".to_string()),
        year_from: Some(2020),
        price_to: Some(50000),
        ..OfferParams::default()
    };
    let offers = client.get_offers(source, &params)?;
    println!("\n--- Offers (page {}) ---", offers["meta"]["page"]);
    let items = offers["result"].as_array().cloned().unwrap_or_default();
    for item in &items {
        let d = &item["data"];
        println!("{} {} {} - ${} ({} km)", d["mark"], d["model"], d["year"], d["price"], d["km_age"]);
    }

    if let Some(next_page) = offers["meta"]["next_page"].as_u64() {
        let next = OfferParams {
            page: u32::try_from(next_page).ok(),
            ..params
        };
        let more = client.get_offers(source, &next)?;
        println!("Next page has {} offers", more["result"].as_array().map_or(0, Vec::len));
    }

    let inner_id = items
        .first()
        .and_then(|item| item["inner_id"].as_str())
        .unwrap_or("40427050");
    let offer = client.get_offer(source, inner_id)?;
    println!("\n--- Single offer ---");
    println!("URL: {}", offer["data"]["url"]);
    println!("Seller: {}", offer["data"]["seller_type"]);

    let change_id = client.get_change_id(source, "2025-01-15")?;
    println!("\n--- Changes from 2025-01-15 (change_id: {change_id}) ---");
    let changes = client.get_changes(source, change_id)?;
    for change in changes["result"].as_array().into_iter().flatten() {
        println!("[{}] {}", change["change_type"], change["inner_id"]);
    }
    if let Some(next_change_id) = changes["meta"]["next_change_id"].as_i64() {
        let more = client.get_changes(source, next_change_id)?;
        println!("Next batch: {} changes", more["result"].as_array().map_or(0, Vec::len));
    }

    let info = client.get_offer_by_url("https://www.encar.com/dc/dc_cardetailview.do?carid=40427050")?;
    println!("\n--- Offer by URL ---");
    println!("{} {} {} - ${}", info["mark"], info["model"], info["year"], info["price"]);

    let bad_client = Client::with_config(ClientConfig::new("invalid-key").with_base_url(&base_url));
    match bad_client.get_offers(source, &OfferParams::page(1)) {
        Err(Error::Api(err)) if err.is_auth() => {
            println!("\nAuth error: {} (HTTP {})", err.message(), err.status_code())
        }
        Err(Error::Api(err)) => println!("\nAPI error: {} (HTTP {})", err.message(), err.status_code()),
        Err(other) => return Err(other),
        Ok(_) => println!("\nUnexpectedly accepted an invalid key"),
    }

    Ok(())
}
