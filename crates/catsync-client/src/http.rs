//! Minimal JSON-over-HTTP client shared by the source and target gateways.
//!
//! Wraps `reqwest` with the status classification both APIs need: GET
//! accepts only 2xx, POST additionally passes 400 bodies through as
//! application-level errors. Every request and its outcome is logged.

use std::time::{Duration, Instant};

use reqwest::{header, Client, StatusCode, Url};
use serde::Serialize;

use crate::error::HttpError;

/// A parsed JSON body together with the status it arrived with.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl JsonResponse {
    /// `true` for a 400 response carrying an application-level error body.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        self.status == StatusCode::BAD_REQUEST.as_u16()
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Builds a client with the given timeout, `User-Agent`, and TLS policy.
    ///
    /// `timeout_secs == 0` leaves the transport default (no overall timeout).
    /// `accept_invalid_certs` disables certificate validation for every
    /// request made through this client.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Transport`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        accept_invalid_certs: bool,
    ) -> Result<Self, HttpError> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent);

        if timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }

        if accept_invalid_certs {
            tracing::warn!("TLS certificate validation is DISABLED for all API requests");
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Builds a client from the application config.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::new`].
    pub fn from_app_config(config: &catsync_core::AppConfig) -> Result<Self, HttpError> {
        Self::new(
            config.request_timeout_secs,
            &config.user_agent,
            config.accept_invalid_certs,
        )
    }

    /// Sends a GET and parses the body as JSON.
    ///
    /// Non-empty `params` are percent-encoded into the query string; an empty
    /// slice leaves `url` untouched.
    ///
    /// # Errors
    ///
    /// - [`HttpError::InvalidUrl`] if `url` does not parse.
    /// - [`HttpError::Transport`] on network or TLS failure.
    /// - [`HttpError::Status`] on any non-2xx status.
    /// - [`HttpError::Parse`] if the body is not valid JSON.
    pub async fn get_json(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, HttpError> {
        let url = build_url(url, params)?;
        let started = Instant::now();
        tracing::debug!(%url, "GET");

        let response = match self.client.get(url.clone()).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(%url, error = %e, "GET failed");
                return Err(e.into());
            }
        };
        let status = response.status();
        let body = response.text().await?;
        log_outcome("GET", &url, status, started);

        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        parse_body(&url, &body)
    }

    /// Sends `body` as a JSON POST with an optional bearer token.
    ///
    /// Both 2xx and 400 responses yield the parsed body; callers tell them
    /// apart with [`JsonResponse::is_rejection`].
    ///
    /// # Errors
    ///
    /// - [`HttpError::InvalidUrl`] if `url` does not parse.
    /// - [`HttpError::Transport`] on network or TLS failure.
    /// - [`HttpError::Status`] on any status other than 2xx or 400.
    /// - [`HttpError::Parse`] if a 2xx/400 body is not valid JSON.
    pub async fn post_json<T>(
        &self,
        url: &str,
        body: &T,
        bearer_token: Option<&str>,
    ) -> Result<JsonResponse, HttpError>
    where
        T: Serialize + ?Sized,
    {
        let url = build_url(url, &[])?;
        let started = Instant::now();
        tracing::debug!(%url, "POST");

        let mut request = self
            .client
            .post(url.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json")
            .json(body);
        if let Some(token) = bearer_token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(%url, error = %e, "POST failed");
                return Err(e.into());
            }
        };
        let status = response.status();
        let text = response.text().await?;
        log_outcome("POST", &url, status, started);

        if !(status.is_success() || status == StatusCode::BAD_REQUEST) {
            return Err(HttpError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(JsonResponse {
            status: status.as_u16(),
            body: parse_body(&url, &text)?,
        })
    }
}

/// Parses `base` and appends `params` as percent-encoded query pairs.
///
/// # Errors
///
/// Returns [`HttpError::InvalidUrl`] if `base` is not an absolute URL.
pub fn build_url(base: &str, params: &[(&str, &str)]) -> Result<Url, HttpError> {
    let mut url = Url::parse(base).map_err(|e| HttpError::InvalidUrl {
        url: base.to_owned(),
        reason: e.to_string(),
    })?;
    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in params {
            pairs.append_pair(k, v);
        }
    }
    Ok(url)
}

/// Parses a base URL, ensuring exactly one trailing slash so relative
/// joins append instead of replacing the last path segment.
pub(crate) fn parse_base_url(base_url: &str) -> Result<Url, HttpError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|e| HttpError::InvalidUrl {
        url: base_url.to_owned(),
        reason: e.to_string(),
    })
}

pub(crate) fn join(base: &Url, path: &str) -> Result<Url, HttpError> {
    base.join(path).map_err(|e| HttpError::InvalidUrl {
        url: format!("{base} + {path}"),
        reason: e.to_string(),
    })
}

fn parse_body(url: &Url, body: &str) -> Result<serde_json::Value, HttpError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::warn!(%url, error = %e, "response body is not valid JSON");
        HttpError::Parse {
            context: url.to_string(),
            source: e,
        }
    })
}

fn log_outcome(method: &str, url: &Url, status: StatusCode, started: Instant) {
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    if status.is_success() {
        tracing::info!(method, %url, status = status.as_u16(), elapsed_ms, "request completed");
    } else {
        tracing::warn!(
            method,
            %url,
            status = status.as_u16(),
            reason = status.canonical_reason().unwrap_or("unknown"),
            elapsed_ms,
            "request returned error status"
        );
    }
}
