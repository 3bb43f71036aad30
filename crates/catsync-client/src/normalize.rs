//! Normalization from raw source records to [`catsync_core::NormalizedProduct`].
//!
//! Each target field is read from the first present key in its mapping
//! list. Value-level parsing (prices, timestamps, measurements) is delegated
//! to [`crate::parse`]; this module owns the field mapping, defaults, and
//! the inventory join.

use catsync_core::products::is_currency_code;
use catsync_core::{InventoryLevel, NormalizedProduct, Price};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::error::NormalizeError;
use crate::parse::{
    currency_in_text, parse_amount, parse_dimensions, parse_measurement, parse_timestamp,
    value_as_string,
};
use crate::types::{InventoryIndex, InventoryRecord, RawProduct};

const NAME_KEYS: &[&str] = &["name", "title", "product_name"];
const DESCRIPTION_KEYS: &[&str] = &[
    "description",
    "long_description",
    "short_description",
    "body",
    "summary",
];
const CATEGORY_KEYS: &[&str] = &["category", "category_name", "product_type", "type"];
const PRICE_KEYS: &[&str] = &["price", "unit_price", "list_price", "base_price", "pricing"];
const PRICE_AMOUNT_KEYS: &[&str] = &["amount", "value", "price"];
const CURRENCY_KEYS: &[&str] = &["currency", "currency_code"];
const STATUS_KEYS: &[&str] = &["status", "state", "availability_status"];
const ACTIVE_FLAG_KEYS: &[&str] = &["active", "is_active"];
const UPDATED_KEYS: &[&str] = &[
    "last_updated",
    "lastUpdated",
    "updated_at",
    "modified_at",
    "modified",
    "updated",
];
const NESTED_ATTRIBUTE_KEYS: &[&str] = &["attributes", "specifications", "specs"];
const TOP_LEVEL_ATTRIBUTE_KEYS: &[&str] = &[
    "weight",
    "dimensions",
    "color",
    "size",
    "material",
    "brand",
    "manufacturer",
    "model",
];
const WEIGHT_UNIT_KEYS: &[&str] = &["weight_unit", "weightUnit"];
const DIMENSION_UNIT_KEYS: &[&str] = &["dimension_unit", "dimensions_unit", "dimensionUnit"];

const DEFAULT_CATEGORY: &str = "uncategorized";
const DEFAULT_STATUS: &str = "active";

/// Per-run inputs that keep normalization deterministic.
#[derive(Debug, Clone)]
pub struct NormalizeContext {
    /// ISO 4217 code used when a record carries no currency.
    pub default_currency: String,
    /// `lastUpdated` for records without a parseable timestamp; fixed per run.
    pub fallback_timestamp: DateTime<Utc>,
}

impl NormalizeContext {
    #[must_use]
    pub fn new(default_currency: &str, fallback_timestamp: DateTime<Utc>) -> Self {
        Self {
            default_currency: default_currency.to_ascii_uppercase(),
            fallback_timestamp,
        }
    }
}

/// Outcome of normalizing a full product listing.
#[derive(Debug, Default)]
pub struct NormalizationResult {
    /// Valid products in listing order.
    pub products: Vec<NormalizedProduct>,
    /// Records excluded from the batch.
    pub failures: Vec<NormalizeError>,
    /// Ids that had no inventory record and were given zero stock.
    pub missing_inventory: Vec<String>,
}

/// Normalizes one source record joined with its inventory record.
///
/// A missing inventory record yields zero stock with a logged warning.
///
/// # Errors
///
/// - [`NormalizeError::MissingProductId`] when no id key is present.
/// - [`NormalizeError::MissingField`] when `name` or `price` is absent.
/// - [`NormalizeError::InvalidField`] for unparseable prices or currencies
///   and negative inventory quantities.
/// - [`NormalizeError::Violation`] when the built product breaks a target
///   invariant (e.g. negative price).
pub fn normalize_product(
    raw: &RawProduct,
    inventory: Option<&InventoryRecord>,
    ctx: &NormalizeContext,
) -> Result<NormalizedProduct, NormalizeError> {
    let product_id = raw.product_id().ok_or(NormalizeError::MissingProductId)?;

    let name = raw
        .first_of(NAME_KEYS)
        .and_then(value_as_string)
        .ok_or_else(|| NormalizeError::MissingField {
            product_id: product_id.clone(),
            field: "name",
        })?;

    let description = raw
        .first_of(DESCRIPTION_KEYS)
        .and_then(value_as_string)
        .unwrap_or_default();

    let category = raw
        .first_of(CATEGORY_KEYS)
        .and_then(category_name)
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_owned());

    let price = normalize_price(raw, &product_id, ctx)?;
    let inventory = normalize_inventory(inventory, &product_id)?;

    let last_updated = match raw.first_of(UPDATED_KEYS).and_then(parse_timestamp) {
        Some(ts) => ts,
        None => {
            tracing::debug!(%product_id, "no parseable timestamp; using run start time");
            ctx.fallback_timestamp
        }
    };

    let product = NormalizedProduct {
        attributes: collect_attributes(raw),
        status: normalize_status(raw),
        product_id,
        name,
        description,
        category,
        price,
        inventory,
        last_updated,
    };

    product
        .validate()
        .map_err(|violation| NormalizeError::Violation {
            product_id: product.product_id.clone(),
            violation,
        })?;

    Ok(product)
}

/// Normalizes every record, joining inventory by exact product id.
///
/// Failures are collected per record and logged; they never abort the batch.
#[must_use]
pub fn normalize_all(
    raws: &[RawProduct],
    inventory: &InventoryIndex,
    ctx: &NormalizeContext,
) -> NormalizationResult {
    let mut result = NormalizationResult::default();

    for raw in raws {
        let record = raw.product_id().and_then(|id| inventory.get(&id));
        match normalize_product(raw, record, ctx) {
            Ok(product) => {
                if record.is_none() {
                    result.missing_inventory.push(product.product_id.clone());
                }
                result.products.push(product);
            }
            Err(e) => {
                tracing::warn!(
                    product_id = e.product_id().unwrap_or("<none>"),
                    error = %e,
                    "excluding product from batch"
                );
                result.failures.push(e);
            }
        }
    }

    result
}

fn category_name(value: &Value) -> Option<String> {
    match value {
        Value::Object(obj) => obj.get("name").and_then(value_as_string),
        other => value_as_string(other),
    }
}

fn normalize_price(
    raw: &RawProduct,
    product_id: &str,
    ctx: &NormalizeContext,
) -> Result<Price, NormalizeError> {
    let invalid = |reason: String| NormalizeError::InvalidField {
        product_id: product_id.to_owned(),
        field: "price",
        reason,
    };

    let value = raw
        .first_of(PRICE_KEYS)
        .ok_or_else(|| NormalizeError::MissingField {
            product_id: product_id.to_owned(),
            field: "price",
        })?;

    let (amount, embedded_currency) = match value {
        Value::Object(obj) => {
            let amount = PRICE_AMOUNT_KEYS
                .iter()
                .filter_map(|k| obj.get(*k))
                .find_map(parse_amount);
            let currency = CURRENCY_KEYS
                .iter()
                .filter_map(|k| obj.get(*k))
                .find_map(value_as_string);
            (amount, currency)
        }
        Value::String(s) => (parse_amount(value), currency_in_text(s)),
        other => (parse_amount(other), None),
    };

    let amount: Decimal =
        amount.ok_or_else(|| invalid(format!("cannot parse amount from {value}")))?;

    let currency = embedded_currency
        .or_else(|| raw.first_of(CURRENCY_KEYS).and_then(value_as_string))
        .map_or_else(|| ctx.default_currency.clone(), |c| c.to_ascii_uppercase());
    if !is_currency_code(&currency) {
        return Err(NormalizeError::InvalidField {
            product_id: product_id.to_owned(),
            field: "currency",
            reason: format!("\"{currency}\" is not an ISO 4217 code"),
        });
    }

    Ok(Price { amount, currency })
}

fn normalize_inventory(
    record: Option<&InventoryRecord>,
    product_id: &str,
) -> Result<InventoryLevel, NormalizeError> {
    let Some(record) = record else {
        tracing::warn!(%product_id, "no inventory record; defaulting to zero stock");
        return Ok(InventoryLevel::default());
    };

    let non_negative = |qty: i64, field: &'static str| {
        u64::try_from(qty).map_err(|_| NormalizeError::InvalidField {
            product_id: product_id.to_owned(),
            field,
            reason: format!("negative quantity {qty}"),
        })
    };

    Ok(InventoryLevel {
        available: non_negative(record.available, "inventory.available")?,
        reserved: non_negative(record.reserved, "inventory.reserved")?,
    })
}

/// Lowercased status with whitespace collapsed to underscores; falls back
/// to a boolean active flag, then to `"active"`.
fn normalize_status(raw: &RawProduct) -> String {
    if let Some(status) = raw.first_of(STATUS_KEYS).and_then(value_as_string) {
        return status
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_lowercase();
    }
    match raw.first_of(ACTIVE_FLAG_KEYS).and_then(Value::as_bool) {
        Some(false) => "inactive".to_owned(),
        _ => DEFAULT_STATUS.to_owned(),
    }
}

/// Gathers nested attribute objects and known top-level attribute keys,
/// then shapes `weight` and `dimensions` into `{value, unit}` /
/// `{length, width, height, unit}` objects where the source allows.
fn collect_attributes(raw: &RawProduct) -> Map<String, Value> {
    let mut attrs = Map::new();

    for key in NESTED_ATTRIBUTE_KEYS {
        match raw.fields.get(*key) {
            Some(Value::Object(obj)) => {
                for (k, v) in obj {
                    attrs.insert(k.clone(), v.clone());
                }
            }
            // [{"name": "color", "value": "red"}, ...]
            Some(Value::Array(items)) => {
                for item in items.iter().filter_map(Value::as_object) {
                    if let (Some(name), Some(value)) =
                        (item.get("name").and_then(value_as_string), item.get("value"))
                    {
                        attrs.insert(name, value.clone());
                    }
                }
            }
            _ => {}
        }
    }

    for key in TOP_LEVEL_ATTRIBUTE_KEYS {
        if let Some(value) = raw.fields.get(*key).filter(|v| !v.is_null()) {
            attrs.insert((*key).to_owned(), value.clone());
        }
    }

    let unit_from = |keys: &[&str], attrs: &Map<String, Value>| {
        keys.iter()
            .filter_map(|k| raw.fields.get(*k).or_else(|| attrs.get(*k)))
            .find_map(value_as_string)
    };
    let weight_unit = unit_from(WEIGHT_UNIT_KEYS, &attrs);
    let dimension_unit = unit_from(DIMENSION_UNIT_KEYS, &attrs);
    for key in WEIGHT_UNIT_KEYS.iter().chain(DIMENSION_UNIT_KEYS) {
        attrs.remove(*key);
    }

    if let Some(weight) = attrs.get("weight").cloned() {
        let shaped = match weight {
            Value::Number(n) => weight_unit.map(|unit| {
                let mut m = Map::new();
                m.insert("value".to_owned(), Value::Number(n));
                m.insert("unit".to_owned(), Value::String(unit));
                m
            }),
            Value::String(s) => parse_measurement(&s),
            _ => None,
        };
        if let Some(m) = shaped {
            attrs.insert("weight".to_owned(), Value::Object(m));
        }
    }

    let shaped_dimensions = match attrs.get("dimensions") {
        Some(Value::String(s)) => parse_dimensions(s),
        Some(Value::Object(obj)) => Some(obj.clone()),
        _ => None,
    };
    if let Some(mut dimensions) = shaped_dimensions {
        if let Some(unit) = dimension_unit {
            dimensions
                .entry("unit")
                .or_insert_with(|| Value::String(unit));
        }
        attrs.insert("dimensions".to_owned(), Value::Object(dimensions));
    }

    attrs
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
