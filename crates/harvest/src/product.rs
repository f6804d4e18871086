// ABOUTME: Product record types: the ephemeral raw record seen on a page and the validated canonical product.
// ABOUTME: Validation turns a RawProductRecord into a CanonicalProduct or a typed Rejection.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::normalize::identity::resolve_external_id;

/// A product candidate as it was read from one listing item.
///
/// Lives only inside the page extractor; every field is best-effort.
#[derive(Debug, Clone, PartialEq)]
pub struct RawProductRecord {
    pub name: Option<String>,
    pub price_text: Option<String>,
    /// Parsed price, `None` when the text was absent or had no numeric value.
    pub price: Option<f64>,
    /// Absolute image URL.
    pub image: Option<String>,
    /// Absolute product URL.
    pub url: Option<String>,
    pub in_stock: bool,
    pub category: Option<String>,
}

impl Default for RawProductRecord {
    fn default() -> Self {
        Self {
            name: None,
            price_text: None,
            price: None,
            image: None,
            url: None,
            in_stock: true,
            category: None,
        }
    }
}

impl RawProductRecord {
    /// Validates the record and promotes it to a canonical product.
    pub fn into_canonical(
        self,
        source_id: u64,
        currency: &str,
    ) -> Result<CanonicalProduct, Rejection> {
        let name = match self.name {
            Some(n) if !n.trim().is_empty() => n,
            _ => return Err(Rejection::MissingName),
        };
        let price = match (&self.price_text, self.price) {
            (None, _) => return Err(Rejection::MissingPrice),
            (Some(text), None) => {
                return Err(Rejection::UnparsablePrice {
                    text: text.clone(),
                })
            }
            (Some(_), Some(p)) if p <= 0.0 => return Err(Rejection::NonPositivePrice { price: p }),
            (Some(_), Some(p)) => p,
        };

        let external_id = resolve_external_id(self.url.as_deref(), &name, price);
        Ok(CanonicalProduct {
            source_id,
            external_id,
            name,
            url: self.url,
            image_url: self.image,
            price,
            currency: currency.to_string(),
            in_stock: self.in_stock,
            category: self.category,
        })
    }
}

/// Why a raw record was not promoted to a canonical product.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    MissingName,
    MissingPrice,
    UnparsablePrice { text: String },
    NonPositivePrice { price: f64 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingName => write!(f, "missing name"),
            Rejection::MissingPrice => write!(f, "missing price"),
            Rejection::UnparsablePrice { text } => write!(f, "unparsable price {:?}", text),
            Rejection::NonPositivePrice { price } => write!(f, "non-positive price {}", price),
        }
    }
}

/// A validated, normalized product eligible for a crawl result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalProduct {
    pub source_id: u64,
    pub external_id: String,
    pub name: String,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub price: f64,
    pub currency: String,
    pub in_stock: bool,
    pub category: Option<String>,
}
