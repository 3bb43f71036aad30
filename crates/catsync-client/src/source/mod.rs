//! Read-only gateway for the source API: product listing, product detail,
//! and inventory status.
//!
//! Each operation comes in two forms. The `try_*` methods return typed
//! errors; the plain methods log the error and return `None`, so callers
//! treat `None` as "this data source is unavailable" and decide whether
//! to continue.

pub mod pagination;

use reqwest::Url;

use crate::error::{HttpError, SourceError};
use crate::http::{join, parse_base_url, HttpClient};
use crate::types::{InventoryIndex, RawProduct};

use self::pagination::{next_page_of, parse_product_page, NextPage};

const PRODUCTS_PATH: &str = "source_api/products/";
const INVENTORY_PATH: &str = "source_api/inventory-status/";

/// Query parameter carrying the requested ids on inventory calls.
pub const INVENTORY_IDS_PARAM: &str = "product_ids";

/// Maximum number of listing pages to follow. Guards against cycling
/// `next` links.
pub const MAX_PAGES: usize = 200;

/// Recognized query options for the products listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub category: Option<String>,
    /// Additional integration-specific parameters, sent verbatim.
    pub extra: Vec<(String, String)>,
}

impl ProductFilter {
    #[must_use]
    pub fn from_app_config(config: &catsync_core::AppConfig) -> Self {
        Self {
            page: None,
            page_size: config.page_size,
            category: config.category.clone(),
            extra: Vec::new(),
        }
    }

    /// Query pairs in a stable order; unset options are omitted.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page".to_owned(), page.to_string()));
        }
        if let Some(size) = self.page_size {
            pairs.push(("page_size".to_owned(), size.to_string()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category".to_owned(), category.clone()));
        }
        pairs.extend(self.extra.iter().cloned());
        pairs
    }

    fn with_page(&self, page: u32) -> Self {
        Self {
            page: Some(page),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceApi {
    http: HttpClient,
    products_url: Url,
    inventory_url: Url,
}

impl SourceApi {
    /// Creates a gateway rooted at `base_url` (e.g. `https://host`).
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::InvalidUrl`] if `base_url` is not a valid base URL.
    pub fn new(http: HttpClient, base_url: &str) -> Result<Self, HttpError> {
        let base = parse_base_url(base_url)?;
        Ok(Self {
            http,
            products_url: join(&base, PRODUCTS_PATH)?,
            inventory_url: join(&base, INVENTORY_PATH)?,
        })
    }

    #[must_use]
    pub fn products_url(&self) -> &Url {
        &self.products_url
    }

    /// Fetches every product, following pagination. `None` if any page fails.
    pub async fn list_products(&self, filter: &ProductFilter) -> Option<Vec<RawProduct>> {
        match self.try_list_products(filter).await {
            Ok(products) => {
                tracing::info!(count = products.len(), "fetched product listing");
                Some(products)
            }
            Err(e) => {
                tracing::error!(error = %e, "product listing unavailable");
                None
            }
        }
    }

    /// Fetches every product, following pagination.
    ///
    /// All-or-nothing: on any page failure the products from earlier pages
    /// are discarded and the error is returned.
    ///
    /// # Errors
    ///
    /// - [`SourceError::Http`] for transport, status, or JSON failures.
    /// - [`SourceError::UnexpectedShape`] when a page has no product list.
    /// - [`SourceError::PaginationLimit`] past [`MAX_PAGES`] pages.
    pub async fn try_list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<RawProduct>, SourceError> {
        let mut all_products = Vec::new();
        let mut next: Option<NextPage> = None;
        let mut page_count = 0usize;

        loop {
            page_count += 1;
            if page_count > MAX_PAGES {
                return Err(SourceError::PaginationLimit {
                    url: self.products_url.to_string(),
                    max_pages: MAX_PAGES,
                });
            }

            let body = match &next {
                None => self.fetch_products_json(filter).await?,
                Some(NextPage::Number(page)) => {
                    self.fetch_products_json(&filter.with_page(*page)).await?
                }
                Some(NextPage::Url(link)) => {
                    let url = join(&self.products_url, link)?;
                    self.http.get_json(url.as_str(), &[]).await?
                }
            };

            let page = parse_product_page(&body).ok_or_else(|| SourceError::UnexpectedShape {
                context: self.products_url.to_string(),
                reason: "response contains no product list".to_owned(),
            })?;
            if page.skipped > 0 {
                tracing::warn!(skipped = page.skipped, "dropped non-object listing entries");
            }
            tracing::debug!(
                page = page_count,
                count = page.products.len(),
                "fetched products page"
            );

            all_products.extend(page.products);
            next = page.next;
            if next.is_none() {
                break;
            }
        }

        Ok(all_products)
    }

    /// Fetches one listing page as raw JSON, without pagination.
    ///
    /// # Errors
    ///
    /// Propagates any [`HttpError`] from the request.
    pub async fn fetch_products_json(
        &self,
        filter: &ProductFilter,
    ) -> Result<serde_json::Value, HttpError> {
        let pairs = filter.query_pairs();
        self.http
            .get_json(self.products_url.as_str(), &borrow_pairs(&pairs))
            .await
    }

    /// Fetches one product's detail record. `None` on failure.
    pub async fn get_product_detail(&self, product_id: &str) -> Option<RawProduct> {
        match self.try_get_product_detail(product_id).await {
            Ok(detail) => Some(detail),
            Err(e) => {
                tracing::warn!(%product_id, error = %e, "product detail unavailable");
                None
            }
        }
    }

    /// Fetches one product's detail record from `{products}/{id}/`.
    ///
    /// A `{"product": {...}}` wrapper is unwrapped.
    ///
    /// # Errors
    ///
    /// - [`SourceError::Http`] for transport, status, or JSON failures.
    /// - [`SourceError::UnexpectedShape`] when the body is not an object.
    pub async fn try_get_product_detail(
        &self,
        product_id: &str,
    ) -> Result<RawProduct, SourceError> {
        let body = self.fetch_product_detail_json(product_id).await?;
        let body = match body {
            serde_json::Value::Object(mut obj)
                if obj.len() == 1 && obj.get("product").is_some_and(serde_json::Value::is_object) =>
            {
                obj.remove("product").unwrap_or_default()
            }
            other => other,
        };
        RawProduct::from_value(body).ok_or_else(|| SourceError::UnexpectedShape {
            context: format!("product detail {product_id}"),
            reason: "expected a JSON object".to_owned(),
        })
    }

    /// Fetches one product's detail as raw JSON.
    ///
    /// # Errors
    ///
    /// Propagates any [`HttpError`] from the request.
    pub async fn fetch_product_detail_json(
        &self,
        product_id: &str,
    ) -> Result<serde_json::Value, HttpError> {
        let url = self.detail_url(product_id)?;
        self.http.get_json(url.as_str(), &[]).await
    }

    /// Fetches inventory for `product_ids` in one call. `None` on failure.
    pub async fn get_inventory(&self, product_ids: &[String]) -> Option<InventoryIndex> {
        match self.try_get_inventory(product_ids).await {
            Ok(index) => Some(index),
            Err(e) => {
                tracing::error!(ids = product_ids.len(), error = %e, "inventory unavailable");
                None
            }
        }
    }

    /// Fetches inventory in chunks of `batch_size` ids and merges the results.
    ///
    /// `None` if any chunk fails, so a partial inventory is never mistaken
    /// for a complete one.
    pub async fn get_inventory_batched(
        &self,
        product_ids: &[String],
        batch_size: usize,
    ) -> Option<InventoryIndex> {
        let mut index = InventoryIndex::default();
        for (chunk_no, chunk) in product_ids.chunks(batch_size.max(1)).enumerate() {
            match self.try_get_inventory(chunk).await {
                Ok(part) => index.extend(part),
                Err(e) => {
                    tracing::error!(
                        chunk = chunk_no,
                        ids = chunk.len(),
                        error = %e,
                        "inventory chunk unavailable"
                    );
                    return None;
                }
            }
        }
        tracing::info!(
            requested = product_ids.len(),
            records = index.len(),
            "fetched inventory"
        );
        Some(index)
    }

    /// Fetches inventory for `product_ids`, passed as a comma-separated
    /// `product_ids` query parameter.
    ///
    /// Paginated replies are followed the same way as the product listing,
    /// all-or-nothing.
    ///
    /// # Errors
    ///
    /// - [`SourceError::Http`] for transport, status, or JSON failures.
    /// - [`SourceError::PaginationLimit`] past [`MAX_PAGES`] pages.
    pub async fn try_get_inventory(
        &self,
        product_ids: &[String],
    ) -> Result<InventoryIndex, SourceError> {
        let mut index = InventoryIndex::default();
        let mut body = self.fetch_inventory_page(product_ids, None).await?;
        let mut page_count = 1usize;

        loop {
            index.extend(InventoryIndex::from_response(&body));
            let Some(next) = next_page_of(&body) else {
                break;
            };

            page_count += 1;
            if page_count > MAX_PAGES {
                return Err(SourceError::PaginationLimit {
                    url: self.inventory_url.to_string(),
                    max_pages: MAX_PAGES,
                });
            }
            tracing::debug!(page = page_count, "fetching next inventory page");

            body = match next {
                NextPage::Number(page) => {
                    self.fetch_inventory_page(product_ids, Some(page)).await?
                }
                NextPage::Url(link) => {
                    let url = join(&self.inventory_url, &link)?;
                    self.http.get_json(url.as_str(), &[]).await?
                }
            };
        }

        Ok(index)
    }

    /// Fetches inventory as raw JSON. An empty id slice sends no filter.
    ///
    /// # Errors
    ///
    /// Propagates any [`HttpError`] from the request.
    pub async fn fetch_inventory_json(
        &self,
        product_ids: &[String],
    ) -> Result<serde_json::Value, HttpError> {
        self.fetch_inventory_page(product_ids, None).await
    }

    async fn fetch_inventory_page(
        &self,
        product_ids: &[String],
        page: Option<u32>,
    ) -> Result<serde_json::Value, HttpError> {
        let mut pairs = Vec::new();
        if !product_ids.is_empty() {
            pairs.push((INVENTORY_IDS_PARAM.to_owned(), product_ids.join(",")));
        }
        if let Some(page) = page {
            pairs.push(("page".to_owned(), page.to_string()));
        }
        self.http
            .get_json(self.inventory_url.as_str(), &borrow_pairs(&pairs))
            .await
    }

    /// `{products}/{id}/` with the id percent-encoded as a path segment.
    fn detail_url(&self, product_id: &str) -> Result<Url, HttpError> {
        let mut url = self.products_url.clone();
        url.path_segments_mut()
            .map_err(|()| HttpError::InvalidUrl {
                url: self.products_url.to_string(),
                reason: "cannot be a base URL".to_owned(),
            })?
            .pop_if_empty()
            .push(product_id)
            .push("");
        Ok(url)
    }
}

fn borrow_pairs(pairs: &[(String, String)]) -> Vec<(&str, &str)> {
    pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> SourceApi {
        let http = HttpClient::new(5, "catsync-test/0.1", false).expect("client");
        SourceApi::new(http, base).expect("gateway")
    }

    #[test]
    fn endpoints_are_joined_onto_base_with_or_without_slash() {
        for base in ["https://example.com", "https://example.com/"] {
            let api = api(base);
            assert_eq!(
                api.products_url.as_str(),
                "https://example.com/source_api/products/"
            );
            assert_eq!(
                api.inventory_url.as_str(),
                "https://example.com/source_api/inventory-status/"
            );
        }
    }

    #[test]
    fn detail_url_appends_id_with_trailing_slash() {
        let url = api("https://example.com").detail_url("A1").unwrap();
        assert_eq!(url.as_str(), "https://example.com/source_api/products/A1/");
    }

    #[test]
    fn detail_url_encodes_id() {
        let url = api("https://example.com").detail_url("a/b c").unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/source_api/products/a%2Fb%20c/"
        );
    }

    #[test]
    fn filter_query_pairs_skip_unset_options() {
        assert!(ProductFilter::default().query_pairs().is_empty());

        let filter = ProductFilter {
            page: None,
            page_size: Some(50),
            category: Some("electronics".to_owned()),
            extra: vec![("ordering".to_owned(), "id".to_owned())],
        };
        assert_eq!(
            filter.query_pairs(),
            vec![
                ("page_size".to_owned(), "50".to_owned()),
                ("category".to_owned(), "electronics".to_owned()),
                ("ordering".to_owned(), "id".to_owned()),
            ]
        );
    }

    #[test]
    fn with_page_keeps_other_options() {
        let filter = ProductFilter {
            page_size: Some(10),
            ..ProductFilter::default()
        };
        let paged = filter.with_page(3);
        assert_eq!(paged.page, Some(3));
        assert_eq!(paged.page_size, Some(10));
    }
}
