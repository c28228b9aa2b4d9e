//! Request payloads for the auto-api endpoints.
//!
//! Responses are returned as `serde_json::Value`: the remote schema differs
//! per marketplace and grows without notice.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Filters for the offers listing. Unset fields are not sent.
///
/// `page` is expected by the remote API but not enforced here. Filter names
/// without a dedicated field go in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OfferParams {
    pub page: Option<u32>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub configuration: Option<String>,
    pub complectation: Option<String>,
    pub transmission: Option<String>,
    pub color: Option<String>,
    pub body_type: Option<String>,
    pub engine_type: Option<String>,
    pub year_from: Option<u32>,
    pub year_to: Option<u32>,
    pub mileage_from: Option<u64>,
    pub mileage_to: Option<u64>,
    pub price_from: Option<u64>,
    pub price_to: Option<u64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl OfferParams {
    /// Filters for a single page with no other constraints.
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }

    /// Query pairs for every set filter, named fields first.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let named = [
            ("page", self.page.map(|v| v.to_string())),
            ("brand", self.brand.clone()),
            ("model", self.model.clone()),
            ("configuration", self.configuration.clone()),
            ("complectation", self.complectation.clone()),
            ("transmission", self.transmission.clone()),
            ("color", self.color.clone()),
            ("body_type", self.body_type.clone()),
            ("engine_type", self.engine_type.clone()),
            ("year_from", self.year_from.map(|v| v.to_string())),
            ("year_to", self.year_to.map(|v| v.to_string())),
            ("mileage_from", self.mileage_from.map(|v| v.to_string())),
            ("mileage_to", self.mileage_to.map(|v| v.to_string())),
            ("price_from", self.price_from.map(|v| v.to_string())),
            ("price_to", self.price_to.map(|v| v.to_string())),
        ];

        named
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
            .chain(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())))
            .collect()
    }
}

/// Body of the offer-by-URL lookup.
#[derive(Debug, Clone, Serialize)]
pub struct OfferInfoRequest<'a> {
    pub url: &'a str,
}
