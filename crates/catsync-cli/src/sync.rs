//! The sync run: fetch products → merge details → fetch inventory →
//! normalize → submit.
//!
//! Every expected failure ends the run with a [`RunReport`] rather than an
//! error; the binary exits 0 for all of them.

use std::collections::HashSet;

use catsync_client::{
    normalize_all, ImportOutcome, InventoryIndex, NormalizeContext, ProductFilter, RawProduct,
    SourceApi, TargetApi,
};
use catsync_core::{AppConfig, ImportBatch};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SyncMode {
    Submit,
    /// Stop after normalization and hand the batch back instead of posting it.
    DryRun,
}

/// How the run ended.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) enum Submission {
    #[default]
    NotAttempted,
    ProductsUnavailable,
    InventoryUnavailable,
    NothingToSubmit,
    DryRun(ImportBatch),
    Accepted(serde_json::Value),
    Rejected(serde_json::Value),
    /// The import call did not reach a 2xx/400 response.
    Failed,
}

impl Submission {
    fn label(&self) -> &'static str {
        match self {
            Self::NotAttempted => "not_attempted",
            Self::ProductsUnavailable => "products_unavailable",
            Self::InventoryUnavailable => "inventory_unavailable",
            Self::NothingToSubmit => "nothing_to_submit",
            Self::DryRun(_) => "dry_run",
            Self::Accepted(_) => "accepted",
            Self::Rejected(_) => "rejected",
            Self::Failed => "failed",
        }
    }
}

/// Counters for one run, logged as a single summary line.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RunReport {
    pub fetched: usize,
    pub details_merged: usize,
    pub normalized: usize,
    pub rejected_records: usize,
    pub duplicates_dropped: usize,
    pub missing_inventory: usize,
    pub submitted: usize,
    pub submission: Submission,
}

impl RunReport {
    pub(crate) fn log_summary(&self) {
        let outcome = self.submission.label();
        match &self.submission {
            Submission::ProductsUnavailable
            | Submission::InventoryUnavailable
            | Submission::Rejected(_)
            | Submission::Failed => tracing::warn!(
                fetched = self.fetched,
                normalized = self.normalized,
                rejected_records = self.rejected_records,
                duplicates_dropped = self.duplicates_dropped,
                missing_inventory = self.missing_inventory,
                submitted = self.submitted,
                outcome,
                "sync finished with problems"
            ),
            _ => tracing::info!(
                fetched = self.fetched,
                details_merged = self.details_merged,
                normalized = self.normalized,
                rejected_records = self.rejected_records,
                duplicates_dropped = self.duplicates_dropped,
                missing_inventory = self.missing_inventory,
                submitted = self.submitted,
                outcome,
                "sync finished"
            ),
        }
    }
}

/// Runs one sync. `started_at` stamps products without a source timestamp,
/// so repeated normalization of the same data yields the same batch.
pub(crate) async fn run_sync(
    source: &SourceApi,
    target: &TargetApi,
    config: &AppConfig,
    filter: &ProductFilter,
    mode: SyncMode,
    started_at: DateTime<Utc>,
) -> RunReport {
    let mut report = RunReport::default();

    let Some(mut products) = source.list_products(filter).await else {
        tracing::error!("product listing unavailable; nothing will be submitted");
        report.submission = Submission::ProductsUnavailable;
        return report;
    };
    report.fetched = products.len();

    if products.is_empty() {
        tracing::info!("no products to submit");
        report.submission = Submission::NothingToSubmit;
        return report;
    }

    if config.fetch_details {
        report.details_merged =
            merge_details(source, &mut products, config.detail_concurrency).await;
    }

    let ids = unique_ids(&products);
    let Some(inventory) = source
        .get_inventory_batched(&ids, config.inventory_batch_size)
        .await
    else {
        tracing::error!("inventory unavailable; aborting batch rather than submitting zero stock");
        report.submission = Submission::InventoryUnavailable;
        return report;
    };

    let batch = build_batch(&products, &inventory, config, started_at, &mut report);
    if batch.is_empty() {
        tracing::info!("no products to submit");
        report.submission = Submission::NothingToSubmit;
        return report;
    }

    if mode == SyncMode::DryRun {
        tracing::info!(count = batch.len(), "dry run; batch not submitted");
        report.submission = Submission::DryRun(batch);
        return report;
    }

    report.submitted = batch.len();
    report.submission = match target.submit_batch(&batch).await {
        Some(ImportOutcome::Accepted(body)) => {
            tracing::info!(response = %body, "import response");
            Submission::Accepted(body)
        }
        Some(ImportOutcome::Rejected(body)) => {
            tracing::warn!(response = %body, "import rejected by target API");
            Submission::Rejected(body)
        }
        None => Submission::Failed,
    };
    report
}

/// Fetches detail for every listed product and overlays it in place.
///
/// Up to `concurrency` requests are in flight; results are applied by
/// listing index so order is unaffected. Returns how many records gained
/// detail.
async fn merge_details(
    source: &SourceApi,
    products: &mut [RawProduct],
    concurrency: usize,
) -> usize {
    let details: Vec<(usize, Option<RawProduct>)> = stream::iter(products.iter().enumerate())
        .map(|(idx, raw)| async move {
            let detail = match raw.product_id() {
                Some(id) => source.get_product_detail(&id).await,
                None => None,
            };
            (idx, detail)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut merged = 0;
    for (idx, detail) in details {
        if let Some(detail) = detail {
            products[idx].merge_detail(detail);
            merged += 1;
        }
    }
    if merged < products.len() {
        tracing::warn!(
            merged,
            total = products.len(),
            "some product details unavailable; using listing data"
        );
    }
    merged
}

/// Product ids in listing order, without repeats.
fn unique_ids(products: &[RawProduct]) -> Vec<String> {
    let mut seen = HashSet::new();
    products
        .iter()
        .filter_map(RawProduct::product_id)
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

fn build_batch(
    products: &[RawProduct],
    inventory: &InventoryIndex,
    config: &AppConfig,
    started_at: DateTime<Utc>,
    report: &mut RunReport,
) -> ImportBatch {
    let ctx = NormalizeContext::new(&config.default_currency, started_at);
    let result = normalize_all(products, inventory, &ctx);
    report.rejected_records = result.failures.len();
    report.missing_inventory = result.missing_inventory.len();

    let (batch, duplicates) = ImportBatch::from_products(result.products);
    for product_id in &duplicates {
        tracing::warn!(%product_id, "duplicate productId dropped from batch");
    }
    report.duplicates_dropped = duplicates.len();
    report.normalized = batch.len();
    batch
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
