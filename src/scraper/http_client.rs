use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{COOKIE, HeaderValue};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Typed fetch failures. No retry at this layer or anywhere above it; a failed
/// period is re-run manually by the operator.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The organizer served its login page instead of the report, usually with
    /// HTTP 200. Only a fresh cookie recovers this.
    #[error("session expired: the organizer returned its login page")]
    AuthExpired,

    #[error("HTTP status {0}")]
    Http(u16),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

pub struct HttpClient {
    inner: reqwest::Client,
    login_markers: Vec<String>,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout_secs: u64, login_markers: &[String]) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .gzip(true)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { inner, login_markers: login_markers.to_vec() })
    }

    /// GET a report page with the operator's session cookie. Succeeds only
    /// with a 2xx status and a body that is not the login page.
    pub async fn get_report_page(
        &self,
        url: &Url,
        cookie: &HeaderValue,
    ) -> Result<String, FetchError> {
        debug!("GET {}", url);

        let resp = self.inner.get(url.clone()).header(COOKIE, cookie.clone()).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }

        let body = resp.text().await?;
        if self.looks_like_login(&body) {
            return Err(FetchError::AuthExpired);
        }
        Ok(body)
    }

    /// The organizer answers expired sessions with 200 + login markup rather
    /// than 401/403.
    fn looks_like_login(&self, body: &str) -> bool {
        self.login_markers.iter().any(|m| body.contains(m.as_str()))
    }
}

/// Normalized `Cookie` header value for a raw browser cookie string. Built
/// once per scraper; a cookie with characters illegal in a header is a
/// configuration error, not a per-fetch one.
pub fn cookie_header_value(raw: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(&build_cookie_header(raw))
        .context("cookie string contains characters illegal in a header")
}

/// Rebuild a normalized `Cookie` header from a raw browser cookie string.
/// Pairs without `=` are dropped; the locale cookie is always forced to `ja`
/// so the markup matches the layouts the extractors expect.
pub fn build_cookie_header(raw: &str) -> String {
    let mut pairs: Vec<(String, String)> = Vec::new();

    for part in raw.split(';') {
        let Some((name, value)) = part.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        pairs.push((name.to_string(), value.trim().to_string()));
    }

    match pairs.iter_mut().find(|(name, _)| name == "lang") {
        Some(pair) => pair.1 = "ja".to_string(),
        None => pairs.push(("lang".to_string(), "ja".to_string())),
    }

    pairs
        .iter()
        .map(|(n, v)| format!("{}={}", n, v))
        .collect::<Vec<_>>()
        .join("; ")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
