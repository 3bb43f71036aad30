use crate::app_config::AppConfig;
use crate::ConfigError;

const DEFAULT_BASE_URL: &str = "https://cofactr.pythonanywhere.com";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can pass a `HashMap`
/// lookup instead of calling `set_var`/`remove_var`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        optional(var).unwrap_or_else(|| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match optional(var) {
            None => Ok(default),
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                invalid(var, format!("expected true/false, got \"{raw}\""))
            }),
        }
    };

    let source_base_url = or_default("CATSYNC_SOURCE_BASE_URL", DEFAULT_BASE_URL);
    let target_base_url = or_default("CATSYNC_TARGET_BASE_URL", &source_base_url);
    for (var, url) in [
        ("CATSYNC_SOURCE_BASE_URL", &source_base_url),
        ("CATSYNC_TARGET_BASE_URL", &target_base_url),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(invalid(var, format!("\"{url}\" is not an http(s) URL")));
        }
    }

    let target_api_key = optional("CATSYNC_TARGET_API_KEY")
        .map(|raw| strip_bearer(&raw))
        .filter(|key| !key.is_empty());

    let accept_invalid_certs = parse_bool("CATSYNC_ACCEPT_INVALID_CERTS", false)?;
    let request_timeout_secs = parse_u64("CATSYNC_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("CATSYNC_USER_AGENT", "catsync/0.1 (catalog-sync)");

    let default_currency = or_default("CATSYNC_DEFAULT_CURRENCY", "USD")
        .trim()
        .to_ascii_uppercase();
    if default_currency.len() != 3 || !default_currency.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(invalid(
            "CATSYNC_DEFAULT_CURRENCY",
            format!("\"{default_currency}\" is not an ISO 4217 code"),
        ));
    }

    let page_size = optional("CATSYNC_PAGE_SIZE")
        .map(|raw| {
            raw.trim()
                .parse::<u32>()
                .map_err(|e| invalid("CATSYNC_PAGE_SIZE", e.to_string()))
        })
        .transpose()?;
    let category = optional("CATSYNC_CATEGORY");

    let inventory_batch_size = parse_usize("CATSYNC_INVENTORY_BATCH_SIZE", "100")?;
    if inventory_batch_size == 0 {
        return Err(invalid(
            "CATSYNC_INVENTORY_BATCH_SIZE",
            "must be at least 1".to_string(),
        ));
    }
    let fetch_details = parse_bool("CATSYNC_FETCH_DETAILS", true)?;
    let detail_concurrency = parse_usize("CATSYNC_DETAIL_CONCURRENCY", "4")?.max(1);
    let log_level = or_default("CATSYNC_LOG_LEVEL", "info");

    Ok(AppConfig {
        source_base_url,
        target_base_url,
        target_api_key,
        accept_invalid_certs,
        request_timeout_secs,
        user_agent,
        default_currency,
        page_size,
        category,
        inventory_batch_size,
        fetch_details,
        detail_concurrency,
        log_level,
    })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Accepts either a bare token or a full `Bearer <token>` header value.
fn strip_bearer(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
