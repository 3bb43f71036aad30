use crate::ConfigError;

#[derive(Clone)]
pub struct AppConfig {
    pub source_base_url: String,
    pub target_base_url: String,
    /// Bare token; the `Bearer ` scheme is added by the target client.
    /// Only commands that submit to the target API need it.
    pub target_api_key: Option<String>,
    /// Disables TLS certificate validation for every request. Only for
    /// environments whose endpoints serve self-signed certificates.
    pub accept_invalid_certs: bool,
    /// `0` leaves the transport default in place.
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub default_currency: String,
    pub page_size: Option<u32>,
    pub category: Option<String>,
    pub inventory_batch_size: usize,
    pub fetch_details: bool,
    pub detail_concurrency: usize,
    pub log_level: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("source_base_url", &self.source_base_url)
            .field("target_base_url", &self.target_base_url)
            .field("target_api_key", &"[redacted]")
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("default_currency", &self.default_currency)
            .field("page_size", &self.page_size)
            .field("category", &self.category)
            .field("inventory_batch_size", &self.inventory_batch_size)
            .field("fetch_details", &self.fetch_details)
            .field("detail_concurrency", &self.detail_concurrency)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl AppConfig {
    /// The target API key, for commands that submit to the target API.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `CATSYNC_TARGET_API_KEY`
    /// was not set.
    pub fn require_target_api_key(&self) -> Result<&str, ConfigError> {
        self.target_api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("CATSYNC_TARGET_API_KEY".to_string()))
    }
}
