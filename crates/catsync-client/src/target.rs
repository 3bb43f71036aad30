//! Write gateway for the target import API.

use catsync_core::{ImportBatch, NormalizedProduct};
use reqwest::Url;
use serde::Serialize;

use crate::error::HttpError;
use crate::http::{join, parse_base_url, HttpClient};

const IMPORT_PATH: &str = "target_api/import/";

/// Result of an import call that reached the target API.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    /// 2xx response body.
    Accepted(serde_json::Value),
    /// 400 response body describing why the batch was refused.
    Rejected(serde_json::Value),
}

impl ImportOutcome {
    #[must_use]
    pub fn body(&self) -> &serde_json::Value {
        match self {
            Self::Accepted(body) | Self::Rejected(body) => body,
        }
    }

    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

#[derive(Serialize)]
struct ImportPayload<'a> {
    products: &'a [NormalizedProduct],
}

#[derive(Clone)]
pub struct TargetApi {
    http: HttpClient,
    import_url: Url,
    api_key: String,
}

impl std::fmt::Debug for TargetApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetApi")
            .field("import_url", &self.import_url)
            .field("api_key", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl TargetApi {
    /// Creates a gateway rooted at `base_url` that authenticates with
    /// `Authorization: Bearer <api_key>`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::InvalidUrl`] if `base_url` is not a valid base URL.
    pub fn new(http: HttpClient, base_url: &str, api_key: &str) -> Result<Self, HttpError> {
        let base = parse_base_url(base_url)?;
        Ok(Self {
            http,
            import_url: join(&base, IMPORT_PATH)?,
            api_key: api_key.to_owned(),
        })
    }

    #[must_use]
    pub fn import_url(&self) -> &Url {
        &self.import_url
    }

    /// Submits `products` as `{"products": [...]}`. `None` on transport or
    /// unexpected-status failure.
    pub async fn import_products(&self, products: &[NormalizedProduct]) -> Option<ImportOutcome> {
        match self.try_import_products(products).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!(count = products.len(), error = %e, "import request failed");
                None
            }
        }
    }

    /// Submits a prepared [`ImportBatch`]. `None` on failure.
    pub async fn submit_batch(&self, batch: &ImportBatch) -> Option<ImportOutcome> {
        self.import_products(&batch.products).await
    }

    /// Submits `products` as `{"products": [...]}`.
    ///
    /// # Errors
    ///
    /// Propagates any [`HttpError`] from [`HttpClient::post_json`].
    pub async fn try_import_products(
        &self,
        products: &[NormalizedProduct],
    ) -> Result<ImportOutcome, HttpError> {
        let payload = ImportPayload { products };
        let response = self
            .http
            .post_json(self.import_url.as_str(), &payload, Some(self.api_key.as_str()))
            .await?;

        if response.is_rejection() {
            tracing::warn!(count = products.len(), body = %response.body, "import rejected");
            Ok(ImportOutcome::Rejected(response.body))
        } else {
            tracing::info!(count = products.len(), "import accepted");
            Ok(ImportOutcome::Accepted(response.body))
        }
    }
}
