//! HTTP transport
//!
//! The fetcher talks to the wire through [`HttpTransport`] so tests can
//! script responses. [`ReqwestTransport`] is the production implementation:
//! one blocking client per fetcher, built with a bounded timeout and a
//! descriptive user agent.

use reqwest::blocking::Client;
use std::time::Duration;

use crate::error::{ConfigError, FetchError};

/// Outgoing GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub query: Vec<(&'static str, String)>,
    pub headers: Vec<(&'static str, String)>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    pub fn header(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((key, value.into()));
        self
    }

    /// URL with the query string appended, for logging
    pub fn display_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let qs = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.url, qs)
    }
}

/// Status and body of a completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking GET transport.
///
/// Implementations map every transport failure to [`FetchError::Timeout`]
/// or [`FetchError::NetworkError`]; any HTTP status, including errors, is
/// an `Ok` response.
pub trait HttpTransport: Send + Sync {
    fn get(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError>;
}

/// `reqwest` blocking client transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(2)
            .tcp_nodelay(true)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        let mut builder = self
            .client
            .get(&request.url)
            .query(&request.query)
            .header(reqwest::header::ACCEPT, "application/json");

        for (key, value) in &request.headers {
            builder = builder.header(*key, value);
        }

        let response = builder.send()?;
        let status = response.status().as_u16();

        // Error bodies are informational only
        let body = if response.status().is_success() {
            response.text()?
        } else {
            response.text().unwrap_or_default()
        };

        Ok(HttpResponse { status, body })
    }
}
