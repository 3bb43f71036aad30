//! Source API record types.
//!
//! The source schema is not fixed, so products are carried as opaque JSON
//! objects and only the id is interpreted here. Inventory responses are
//! flattened into an [`InventoryIndex`] keyed by product id.
//!
//! ## Accepted inventory shapes
//!
//! ```text
//! [{"product_id": "A1", "available": 5, "reserved": 1}, ...]
//! {"A1": {"available": 5, "reserved": 1}, "B2": 3}
//! {"inventory": <either of the above>}   // also results / data / items
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::parse::{parse_quantity, value_as_string};

/// Keys that identify a product, in priority order.
pub(crate) const PRODUCT_ID_KEYS: &[&str] = &["product_id", "productId", "id", "sku"];

const AVAILABLE_KEYS: &[&str] = &[
    "available",
    "quantity_available",
    "available_quantity",
    "quantity",
    "stock",
    "in_stock",
    "qty",
];

const RESERVED_KEYS: &[&str] = &[
    "reserved",
    "quantity_reserved",
    "reserved_quantity",
    "allocated",
];

const ENVELOPE_KEYS: &[&str] = &["inventory", "results", "data", "items", "inventory_status"];

/// A product record as returned by the source API, untouched until
/// normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawProduct {
    pub fields: Map<String, Value>,
}

impl RawProduct {
    /// Wraps a JSON value; `None` unless it is an object.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Returns the first non-null value among `keys`.
    #[must_use]
    pub fn first_of(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .filter_map(|k| self.fields.get(*k))
            .find(|v| !v.is_null())
    }

    /// The source product id as a string; numeric ids are stringified.
    #[must_use]
    pub fn product_id(&self) -> Option<String> {
        PRODUCT_ID_KEYS
            .iter()
            .filter_map(|k| self.fields.get(*k))
            .find_map(value_as_string)
    }

    /// Overlays `detail` onto this record; detail keys win, listing-only
    /// keys are kept. Null detail values do not erase listing values.
    pub fn merge_detail(&mut self, detail: RawProduct) {
        for (key, value) in detail.fields {
            if value.is_null() && self.fields.contains_key(&key) {
                continue;
            }
            self.fields.insert(key, value);
        }
    }
}

/// Stock for one product. Quantities stay signed so normalization can
/// reject negative source values instead of silently clamping them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRecord {
    pub product_id: String,
    pub available: i64,
    pub reserved: i64,
}

impl InventoryRecord {
    /// Parses a record from an object carrying its own id field.
    fn from_object(obj: &Map<String, Value>) -> Option<Self> {
        let product_id = PRODUCT_ID_KEYS
            .iter()
            .filter_map(|k| obj.get(*k))
            .find_map(value_as_string)?;
        Some(Self::with_id(product_id, obj))
    }

    fn with_id(product_id: String, obj: &Map<String, Value>) -> Self {
        let quantity = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| obj.get(*k))
                .find_map(parse_quantity)
                .unwrap_or(0)
        };
        Self {
            available: quantity(AVAILABLE_KEYS),
            reserved: quantity(RESERVED_KEYS),
            product_id,
        }
    }
}

/// Inventory records keyed by exact product id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryIndex {
    records: HashMap<String, InventoryRecord>,
}

impl InventoryIndex {
    /// Flattens any accepted inventory response shape into an index.
    ///
    /// Entries that cannot be interpreted are skipped. Later entries for the
    /// same id replace earlier ones.
    #[must_use]
    pub fn from_response(value: &Value) -> Self {
        let mut index = Self::default();
        index.absorb(value);
        index
    }

    fn absorb(&mut self, value: &Value) {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(record) = item.as_object().and_then(InventoryRecord::from_object) {
                        self.insert(record);
                    }
                }
            }
            Value::Object(obj) => {
                if let Some(inner) = ENVELOPE_KEYS
                    .iter()
                    .filter_map(|k| obj.get(*k))
                    .find(|v| v.is_array() || v.is_object())
                {
                    self.absorb(inner);
                } else if let Some(record) = InventoryRecord::from_object(obj) {
                    self.insert(record);
                } else {
                    for (id, entry) in obj {
                        match entry {
                            Value::Object(fields) => {
                                self.insert(InventoryRecord::with_id(id.clone(), fields));
                            }
                            Value::Number(_) => {
                                if let Some(available) = parse_quantity(entry) {
                                    self.insert(InventoryRecord {
                                        product_id: id.clone(),
                                        available,
                                        reserved: 0,
                                    });
                                }
                            }
                            _ => {}
                        }
                    }
                }
            }
            _ => {}
        }
    }

    pub fn insert(&mut self, record: InventoryRecord) {
        self.records.insert(record.product_id.clone(), record);
    }

    /// Merges another index into this one; `other` wins on conflicts.
    pub fn extend(&mut self, other: InventoryIndex) {
        self.records.extend(other.records);
    }

    #[must_use]
    pub fn get(&self, product_id: &str) -> Option<&InventoryRecord> {
        self.records.get(product_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
