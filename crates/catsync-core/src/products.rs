use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A product in the target import schema.
///
/// Field names serialize in camelCase to match the import endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedProduct {
    /// Source product id, always carried as a string.
    pub product_id: String,
    pub name: String,
    /// Empty when the source has no description.
    pub description: String,
    pub category: String,
    pub price: Price,
    pub inventory: InventoryLevel,
    /// Free-form nested mapping, e.g. `weight` and `dimensions` with unit fields.
    pub attributes: serde_json::Map<String, serde_json::Value>,
    /// Lowercased source status: `"active"`, `"inactive"`, `"discontinued"`, ...
    pub status: String,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// ISO 4217 currency code (e.g., `"USD"`).
    pub currency: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLevel {
    pub available: u64,
    pub reserved: u64,
}

/// An invariant a [`NormalizedProduct`] failed to satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductViolation {
    #[error("productId is empty")]
    EmptyProductId,

    #[error("name is empty")]
    EmptyName,

    #[error("price amount {0} is negative")]
    NegativePrice(Decimal),

    #[error("currency \"{0}\" is not an ISO 4217 code")]
    InvalidCurrency(String),
}

impl NormalizedProduct {
    /// Checks the invariants every submitted product must hold.
    ///
    /// Inventory quantities are unsigned, so non-negativity holds by
    /// construction.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProductViolation`] found.
    pub fn validate(&self) -> Result<(), ProductViolation> {
        if self.product_id.trim().is_empty() {
            return Err(ProductViolation::EmptyProductId);
        }
        if self.name.trim().is_empty() {
            return Err(ProductViolation::EmptyName);
        }
        if self.price.amount.is_sign_negative() && !self.price.amount.is_zero() {
            return Err(ProductViolation::NegativePrice(self.price.amount));
        }
        if !is_currency_code(&self.price.currency) {
            return Err(ProductViolation::InvalidCurrency(self.price.currency.clone()));
        }
        Ok(())
    }
}

/// Three uppercase ASCII letters. Does not check the code against the
/// ISO 4217 registry.
#[must_use]
pub fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}

/// Request body for the target import endpoint: `{"products": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportBatch {
    pub products: Vec<NormalizedProduct>,
}

impl ImportBatch {
    /// Builds a batch keeping the first occurrence of each `productId`.
    ///
    /// Returns the batch and the ids of the dropped duplicates, in input order.
    #[must_use]
    pub fn from_products(products: Vec<NormalizedProduct>) -> (Self, Vec<String>) {
        let mut seen: HashSet<String> = HashSet::with_capacity(products.len());
        let mut kept = Vec::with_capacity(products.len());
        let mut duplicates = Vec::new();

        for product in products {
            if seen.insert(product.product_id.clone()) {
                kept.push(product);
            } else {
                duplicates.push(product.product_id);
            }
        }

        (Self { products: kept }, duplicates)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
