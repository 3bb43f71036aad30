//! `catsync sample`: dumps raw source responses so the field mapping can be
//! checked against live data. Nothing is normalized or submitted.

use catsync_client::source::pagination::parse_product_page;
use catsync_client::{HttpError, ProductFilter, SourceApi};

/// How many listed ids to request inventory for when sampling.
const SAMPLE_INVENTORY_IDS: usize = 5;

/// Prints the first listing page, one product detail, and inventory for the
/// sampled ids. Each section that fails is logged and skipped.
///
/// # Errors
///
/// Returns an error only if printing JSON fails.
pub(crate) async fn run_sample(
    source: &SourceApi,
    filter: &ProductFilter,
    product_id: Option<&str>,
) -> anyhow::Result<()> {
    let listing = source.fetch_products_json(filter).await;
    let listed_ids: Vec<String> = listing
        .as_ref()
        .ok()
        .and_then(parse_product_page)
        .map(|page| {
            page.products
                .iter()
                .filter_map(catsync_client::RawProduct::product_id)
                .take(SAMPLE_INVENTORY_IDS)
                .collect()
        })
        .unwrap_or_default();
    print_section("products (first page)", listing)?;

    let detail_id = product_id
        .map(str::to_owned)
        .or_else(|| listed_ids.first().cloned());
    match &detail_id {
        Some(id) => {
            let detail = source.fetch_product_detail_json(id).await;
            print_section(&format!("product detail {id}"), detail)?;
        }
        None => tracing::warn!("no product id available; skipping detail sample"),
    }

    let inventory_ids = if listed_ids.is_empty() {
        detail_id.into_iter().collect()
    } else {
        listed_ids
    };
    let inventory = source.fetch_inventory_json(&inventory_ids).await;
    print_section(
        &format!("inventory for [{}]", inventory_ids.join(", ")),
        inventory,
    )?;

    Ok(())
}

fn print_section(
    title: &str,
    body: Result<serde_json::Value, HttpError>,
) -> anyhow::Result<()> {
    match body {
        Ok(value) => {
            println!("== {title} ==");
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Err(e) => tracing::error!(section = title, error = %e, "sample request failed"),
    }
    Ok(())
}
