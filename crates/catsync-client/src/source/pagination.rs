//! Product listing envelopes and next-page detection.
//!
//! The listing may come back as a bare array or wrapped in an envelope.
//! Two pagination styles are recognized:
//!
//! ```text
//! {"count": 120, "next": "https://host/source_api/products/?page=2", "results": [...]}
//! {"page": 1, "total_pages": 3, "products": [...]}
//! ```
//!
//! A bare array, or an envelope without either signal, is a single page.

use serde_json::Value;

use crate::parse::parse_quantity;
use crate::types::RawProduct;

const LIST_KEYS: &[&str] = &["results", "products", "data", "items"];
const TOTAL_PAGES_KEYS: &[&str] = &["total_pages", "num_pages", "pages"];
const HAS_MORE_KEYS: &[&str] = &["has_more", "has_next"];

/// Where the next page of a listing lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// Absolute or relative URL advertised by the server.
    Url(String),
    /// Page number to request with the original filter.
    Number(u32),
}

/// One parsed page of the products listing.
#[derive(Debug, Default)]
pub struct ProductPage {
    pub products: Vec<RawProduct>,
    pub next: Option<NextPage>,
    /// Entries that were not JSON objects and were dropped.
    pub skipped: usize,
}

/// Parses a listing response into products and a next-page pointer.
///
/// Returns `None` when the response has no recognizable product list.
#[must_use]
pub fn parse_product_page(body: &Value) -> Option<ProductPage> {
    let (items, envelope) = match body {
        Value::Array(items) => (items, None),
        Value::Object(obj) => {
            let items = LIST_KEYS
                .iter()
                .filter_map(|k| obj.get(*k))
                .find_map(Value::as_array)?;
            (items, Some(obj))
        }
        _ => return None,
    };

    let mut page = ProductPage::default();
    for item in items {
        match RawProduct::from_value(item.clone()) {
            Some(product) => page.products.push(product),
            None => page.skipped += 1,
        }
    }
    page.next = envelope.and_then(next_page);
    Some(page)
}

/// Next-page pointer advertised by any response envelope. Bare arrays and
/// envelopes without a signal yield `None`.
#[must_use]
pub fn next_page_of(body: &Value) -> Option<NextPage> {
    body.as_object().and_then(next_page)
}

fn next_page(envelope: &serde_json::Map<String, Value>) -> Option<NextPage> {
    if let Some(url) = envelope
        .get("next")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return Some(NextPage::Url(url.to_owned()));
    }

    let current = envelope
        .get("page")
        .or_else(|| envelope.get("current_page"))
        .and_then(parse_quantity)
        .and_then(|p| u32::try_from(p).ok())?;

    let total = TOTAL_PAGES_KEYS
        .iter()
        .filter_map(|k| envelope.get(*k))
        .find_map(parse_quantity);
    let has_more = HAS_MORE_KEYS
        .iter()
        .filter_map(|k| envelope.get(*k))
        .find_map(Value::as_bool);

    let more = match (total, has_more) {
        (Some(total), _) => i64::from(current) < total,
        (None, Some(flag)) => flag,
        (None, None) => false,
    };
    more.then(|| NextPage::Number(current + 1))
}
