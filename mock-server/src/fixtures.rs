//! Canned marketplace data served by the mock.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A vehicle listing as the marketplace scraper stores it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub inner_id: String,
    pub mark: String,
    pub model: String,
    pub year: u32,
    pub price: u64,
    pub km_age: u64,
    pub color: String,
    pub transmission_type: String,
    pub body_type: String,
    pub seller_type: String,
    pub url: String,
    pub images: Vec<String>,
}

/// One entry of a source's change feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub change_id: i64,
    pub inner_id: String,
    pub change_type: String,
    pub date: String,
}

#[derive(Clone, Debug, Default)]
pub struct Source {
    pub listings: Vec<Listing>,
    pub changes: Vec<Change>,
}

impl Source {
    /// Distinct filter values across all listings.
    pub fn filters(&self) -> Value {
        let mut marks = BTreeSet::new();
        let mut models: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut transmissions = BTreeSet::new();
        let mut bodies = BTreeSet::new();
        let mut colors = BTreeSet::new();
        for listing in &self.listings {
            marks.insert(listing.mark.as_str());
            models
                .entry(listing.mark.as_str())
                .or_default()
                .insert(listing.model.as_str());
            transmissions.insert(listing.transmission_type.as_str());
            bodies.insert(listing.body_type.as_str());
            colors.insert(listing.color.as_str());
        }
        json!({
            "mark": marks,
            "model": models,
            "transmission_type": transmissions,
            "body_type": bodies,
            "color": colors,
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub sources: BTreeMap<String, Source>,
}

impl Catalog {
    pub fn source(&self, name: &str) -> Option<&Source> {
        self.sources.get(name)
    }

    /// Find a listing by its marketplace URL, with the source it belongs to.
    pub fn find_by_url(&self, url: &str) -> Option<(&str, &Listing)> {
        self.sources.iter().find_map(|(name, source)| {
            source
                .listings
                .iter()
                .find(|listing| listing.url == url)
                .map(|listing| (name.as_str(), listing))
        })
    }
}

#[allow(clippy::too_many_arguments)]
fn listing(
    inner_id: &str,
    mark: &str,
    model: &str,
    year: u32,
    price: u64,
    km_age: u64,
    color: &str,
    transmission_type: &str,
    body_type: &str,
    url: &str,
) -> Listing {
    Listing {
        inner_id: inner_id.to_string(),
        mark: mark.to_string(),
        model: model.to_string(),
        year,
        price,
        km_age,
        color: color.to_string(),
        transmission_type: transmission_type.to_string(),
        body_type: body_type.to_string(),
        seller_type: "dealer".to_string(),
        url: url.to_string(),
        images: vec![format!("https://img.example.com/{inner_id}/1.jpg")],
    }
}

fn change(change_id: i64, inner_id: &str, change_type: &str, date: &str) -> Change {
    Change {
        change_id,
        inner_id: inner_id.to_string(),
        change_type: change_type.to_string(),
        date: date.to_string(),
    }
}

pub fn catalog() -> Catalog {
    let encar_url = |id: &str| format!("https://www.encar.com/dc/dc_cardetailview.do?carid={id}");
    let encar = Source {
        listings: vec![
            listing("40427050", "Hyundai", "Sonata", 2021, 21500, 38000, "white", "automatic", "sedan", &encar_url("40427050")),
            listing("40427051", "Hyundai", "Tucson", 2022, 27900, 15000, "black", "automatic", "suv", &encar_url("40427051")),
            listing("40427052", "Kia", "K5", 2019, 16800, 72000, "gray", "automatic", "sedan", &encar_url("40427052")),
            listing("40427053", "Hyundai", "Avante", 2018, 11200, 95000, "silver", "manual", "sedan", &encar_url("40427053")),
            listing("40427054", "Genesis", "GV80", 2023, 58900, 8000, "black", "automatic", "suv", &encar_url("40427054")),
        ],
        changes: vec![
            change(100, "40427050", "added", "2025-01-14"),
            change(101, "40427051", "added", "2025-01-15"),
            change(102, "40427050", "changed", "2025-01-15"),
            change(103, "40427049", "removed", "2025-01-15"),
            change(104, "40427054", "added", "2025-01-16"),
        ],
    };

    let mobile_url = |id: &str| format!("https://suchen.mobile.de/fahrzeuge/details.html?id={id}");
    let mobile_de = Source {
        listings: vec![
            listing("md-1001", "BMW", "X5", 2020, 45000, 61000, "blue", "automatic", "suv", &mobile_url("1001")),
            listing("md-1002", "Volkswagen", "Golf", 2017, 12900, 88000, "red", "manual", "hatchback", &mobile_url("1002")),
        ],
        changes: vec![change(7, "md-1001", "added", "2025-01-10")],
    };

    Catalog {
        sources: BTreeMap::from([
            ("encar".to_string(), encar),
            ("mobile_de".to_string(), mobile_de),
        ]),
    }
}
