//! Fetcher Configuration
//!
//! Immutable settings handed to the fetcher at construction:
//! - Endpoint URL validation (HTTPS unless loopback)
//! - Request timeout bounds
//! - Rate-limit handling policy, with bounded pause and retries
//! - Cache bucket width

use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// CoinGecko API base URL
pub const COINGECKO_API_BASE: &str = "https://api.coingecko.com/api/v3";
pub const COINGECKO_PRO_API_BASE: &str = "https://pro-api.coingecko.com/api/v3";

/// Environment override for the API base URL
pub const ENV_API_BASE: &str = "NARRATIVE_API_BASE";
/// Environment source for a pro API key
pub const ENV_API_KEY: &str = "COINGECKO_API_KEY";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CACHE_BUCKET: Duration = Duration::from_secs(300);
/// Longest sleep after a 429
pub const MAX_RATE_LIMIT_PAUSE: Duration = Duration::from_secs(60);
/// Most extra attempts after a 429
pub const MAX_RATE_LIMIT_RETRIES: u32 = 5;
pub const DEFAULT_USER_AGENT: &str = concat!(
    "narrative-divergence/",
    env!("CARGO_PKG_VERSION"),
    " (price history reader)"
);

/// What the fetcher does when the API answers 429
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateLimitPolicy {
    /// Return `RateLimited` immediately
    #[default]
    FailFast,
    /// Sleep, then return `RateLimited` without retrying
    PauseThenFail(Duration),
    /// Sleep and resend, up to `max_retries` extra attempts
    RetryAfterPause { pause: Duration, max_retries: u32 },
}

impl RateLimitPolicy {
    /// Build from CLI-style numbers: no pause means fail fast
    pub fn from_parts(pause: Duration, max_retries: u32) -> Self {
        match (pause.is_zero(), max_retries) {
            (true, 0) => RateLimitPolicy::FailFast,
            (false, 0) => RateLimitPolicy::PauseThenFail(pause),
            (_, max_retries) => RateLimitPolicy::RetryAfterPause { pause, max_retries },
        }
    }

    pub fn pause(&self) -> Option<Duration> {
        match self {
            RateLimitPolicy::FailFast => None,
            RateLimitPolicy::PauseThenFail(pause) => Some(*pause),
            RateLimitPolicy::RetryAfterPause { pause, .. } => Some(*pause),
        }
    }

    pub fn max_retries(&self) -> u32 {
        match self {
            RateLimitPolicy::RetryAfterPause { max_retries, .. } => *max_retries,
            _ => 0,
        }
    }
}

/// Market-data fetcher configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    /// API base URL, without trailing slash
    pub base_url: String,
    /// Optional API key for pro tier
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
    pub rate_limit: RateLimitPolicy,
    pub cache_bucket: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl FetcherConfig {
    /// Free-tier defaults
    pub fn new() -> Self {
        Self {
            base_url: COINGECKO_API_BASE.to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            rate_limit: RateLimitPolicy::default(),
            cache_bucket: DEFAULT_CACHE_BUCKET,
        }
    }

    /// Defaults with overrides from `NARRATIVE_API_BASE` / `COINGECKO_API_KEY`
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::new();

        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.trim().is_empty()) {
            config = config.with_api_key(key.trim());
        }
        if let Some(base) = lookup(ENV_API_BASE).filter(|b| !b.trim().is_empty()) {
            config = config.with_base_url(base.trim());
        }

        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set a pro API key. The free base URL is swapped for the pro one;
    /// a custom base URL is left alone.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        if self.base_url == COINGECKO_API_BASE {
            self.base_url = COINGECKO_PRO_API_BASE.to_string();
        }
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_rate_limit(mut self, policy: RateLimitPolicy) -> Self {
        self.rate_limit = policy;
        self
    }

    pub fn with_cache_bucket(mut self, width: Duration) -> Self {
        self.cache_bucket = width;
        self
    }

    /// Check every field; the fetcher refuses an invalid config
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url(&self.base_url)?;

        if self.timeout.is_zero() || self.timeout > MAX_TIMEOUT {
            return Err(ConfigError::InvalidTimeout {
                max_secs: MAX_TIMEOUT.as_secs(),
            });
        }

        let pause = self.rate_limit.pause().unwrap_or(Duration::ZERO);
        if pause > MAX_RATE_LIMIT_PAUSE || self.rate_limit.max_retries() > MAX_RATE_LIMIT_RETRIES {
            return Err(ConfigError::InvalidRateLimit {
                max_pause_secs: MAX_RATE_LIMIT_PAUSE.as_secs(),
                max_retries: MAX_RATE_LIMIT_RETRIES,
            });
        }

        if self.cache_bucket < Duration::from_secs(1) {
            return Err(ConfigError::InvalidBucket);
        }

        Ok(())
    }
}

/// Parse and vet an API base URL.
///
/// Plain HTTP is only accepted for loopback hosts, which is what local
/// mock servers use.
pub fn validate_base_url(base_url: &str) -> Result<Url, ConfigError> {
    let parsed = Url::parse(base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", base_url, e)))?;

    let host = parsed
        .host_str()
        .ok_or_else(|| ConfigError::InvalidUrl(format!("{}: missing host", base_url)))?;

    match parsed.scheme() {
        "https" => Ok(parsed),
        "http" if is_loopback_host(host) => Ok(parsed),
        "http" => Err(ConfigError::InsecureUrl(base_url.to_string())),
        other => Err(ConfigError::InvalidUrl(format!(
            "{}: unsupported scheme {}",
            base_url, other
        ))),
    }
}

fn is_loopback_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "[::1]" | "::1")
        || host.starts_with("127.")
}
