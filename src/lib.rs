//! Narrative Divergence Core Library
//!
//! Fetches daily cryptocurrency price history and summarizes it for a
//! dashboard.
//!
//! # Architecture
//!
//! This crate provides:
//! - **charts**: CoinGecko fetcher, time series, metrics, memoization
//! - **pipeline**: fetch-then-summarize per token, plus text rendering
//! - **config**: immutable fetcher configuration
//! - **error**: typed fetch failures with user-facing messages
//! - **utils**: HTTP transport, bucketed cache, logging
//!
//! # Example
//!
//! ```rust,ignore
//! use narrative_divergence::{CoinGeckoClient, FetcherConfig, LookbackDays, compute_metrics};
//!
//! let client = CoinGeckoClient::new(FetcherConfig::from_env())?;
//! let series = client.fetch_price_series("bitcoin", LookbackDays::new(14)?)?;
//! match compute_metrics(&series) {
//!     Some(m) => println!("{:+.2}% over 14 days", m.price_change_pct),
//!     None => println!("not enough data"),
//! }
//! ```

pub mod charts;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod types;
pub mod utils;

// Re-export key types for convenience
pub use charts::{
    compute_metrics, CachedFetcher, ChartCalculator, CoinGeckoClient, LookbackDays, PriceMetrics,
    PricePoint, PriceSource, TimeSeries, DEFAULT_TOKENS,
};
pub use config::{FetcherConfig, RateLimitPolicy};
pub use error::{ConfigError, ErrorCode, ErrorReport, FetchError};
pub use pipeline::{render_text, summarize_token, summarize_tokens};
pub use types::{ApiResponse, TokenOutcome, TokenReport};
