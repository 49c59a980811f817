//! Tomba technology API client.
//!
//! Issues `GET {base_url}/technology/{domain}` authenticated with the
//! `X-Tomba-Key` and `X-Tomba-Secret` headers and hands back the JSON body
//! untouched.

use crate::error::TechFinderError;
use crate::protocols::TechnologyLookup;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{StatusCode, Url};
use std::time::Duration;

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.tomba.io/v1";

/// Per-request timeout used unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const KEY_HEADER: &str = "X-Tomba-Key";
const SECRET_HEADER: &str = "X-Tomba-Secret";

/// HTTP client for the Tomba technology endpoint.
///
/// Credentials are set after construction with the fluent setters, in any
/// order, and must both be present before the first lookup.
///
/// # Example
///
/// ```rust,no_run
/// use tech_finder_lib::{TechnologyLookup, TombaClient};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut client = TombaClient::new();
///     client.set_key("ta_xxxx").set_secret("ts_xxxx");
///
///     let response = client.list_technologies("stripe.com").await?;
///     println!("{}", response);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct TombaClient {
    http_client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    key: Option<String>,
    secret: Option<String>,
}

impl TombaClient {
    /// Create an unauthenticated client pointed at the production API.
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            key: None,
            secret: None,
        }
    }

    /// Set the API key.
    pub fn set_key<K: Into<String>>(&mut self, key: K) -> &mut Self {
        self.key = Some(key.into());
        self
    }

    /// Set the API secret.
    pub fn set_secret<S: Into<String>>(&mut self, secret: S) -> &mut Self {
        self.secret = Some(secret.into());
        self
    }

    /// Point the client at a different API root (e.g. a staging host).
    pub fn with_base_url<U: Into<String>>(mut self, base_url: U) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build the technology endpoint URL for `domain`.
    ///
    /// The domain is pushed as a single path segment so it is percent-encoded.
    pub fn technology_url(&self, domain: &str) -> Result<Url, TechFinderError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            TechFinderError::config(format!("Invalid API base URL '{}': {}", self.base_url, e))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                TechFinderError::config(format!(
                    "API base URL '{}' cannot have a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push("technology")
            .push(domain);

        Ok(url)
    }

    fn credentials(&self) -> Result<(&str, &str), TechFinderError> {
        match (self.key.as_deref(), self.secret.as_deref()) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Ok((key, secret))
            }
            _ => Err(TechFinderError::config(
                "Tomba API key and secret are required",
            )),
        }
    }

    // Timeouts report the configured limit, not the library default.
    fn transport_error(&self, err: reqwest::Error) -> TechFinderError {
        if err.is_timeout() {
            TechFinderError::timeout("Technology lookup", self.timeout)
        } else {
            TechFinderError::from(err)
        }
    }

    async fn request(&self, domain: &str) -> Result<serde_json::Value, TechFinderError> {
        let (key, secret) = self.credentials()?;
        let url = self.technology_url(domain)?;

        tracing::debug!(%url, "requesting technologies");

        let response = self
            .http_client
            .get(url)
            .timeout(self.timeout)
            .header(KEY_HEADER, key)
            .header(SECRET_HEADER, secret)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("tech-finder/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        tracing::debug!(domain, status = status.as_u16(), "technology lookup response");

        if status.is_success() {
            let body = response.text().await.map_err(|e| self.transport_error(e))?;
            return serde_json::from_str(&body).map_err(|e| TechFinderError::ParseError {
                message: format!("Failed to parse API response: {}", e),
                content: Some(body),
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(TechFinderError::api_with_status(
            domain,
            error_message_from_body(status, &body),
            status.as_u16(),
        ))
    }
}

impl Default for TombaClient {
    fn default() -> Self {
        Self::new()
    }
}

// Credentials stay out of debug output.
impl std::fmt::Debug for TombaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TombaClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("key", &self.key.as_ref().map(|_| "***"))
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .finish()
    }
}

#[async_trait]
impl TechnologyLookup for TombaClient {
    async fn list_technologies(&self, domain: &str) -> Result<serde_json::Value, TechFinderError> {
        self.request(domain).await
    }
}

/// Pull a human-readable message out of an error response body.
///
/// The API reports errors as `{"errors": {"message": ...}}`; a top-level
/// `message` or `error` string is accepted too. Falls back to the status.
fn error_message_from_body(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json.pointer("/errors/message")
                .or_else(|| json.get("message"))
                .or_else(|| json.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .filter(|m| !m.trim().is_empty());

    from_json.unwrap_or_else(|| match status {
        StatusCode::UNAUTHORIZED => "Invalid Tomba API credentials".to_string(),
        StatusCode::TOO_MANY_REQUESTS => "Tomba API rate limit exceeded".to_string(),
        code => format!(
            "Tomba API returned {}",
            code.canonical_reason()
                .map(|r| format!("{} {}", code.as_u16(), r))
                .unwrap_or_else(|| code.as_u16().to_string())
        ),
    })
}
