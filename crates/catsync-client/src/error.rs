use catsync_core::ProductViolation;
use thiserror::Error;

/// Failures from a single HTTP exchange.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Connection, DNS, TLS, or timeout failure from the underlying client.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Parse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Failures from the source API gateway.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("pagination limit reached for {url}: exceeded {max_pages} pages")]
    PaginationLimit { url: String, max_pages: usize },

    #[error("unexpected response shape from {context}: {reason}")]
    UnexpectedShape { context: String, reason: String },
}

/// A source record that could not be turned into a valid target product.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("source record has no product id")]
    MissingProductId,

    #[error("product {product_id}: missing required field {field}")]
    MissingField {
        product_id: String,
        field: &'static str,
    },

    #[error("product {product_id}: invalid {field}: {reason}")]
    InvalidField {
        product_id: String,
        field: &'static str,
        reason: String,
    },

    #[error("product {product_id}: {violation}")]
    Violation {
        product_id: String,
        violation: ProductViolation,
    },
}

impl NormalizeError {
    /// The offending product id, when the record had one.
    #[must_use]
    pub fn product_id(&self) -> Option<&str> {
        match self {
            Self::MissingProductId => None,
            Self::MissingField { product_id, .. }
            | Self::InvalidField { product_id, .. }
            | Self::Violation { product_id, .. } => Some(product_id),
        }
    }
}
