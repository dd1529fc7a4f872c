//! Price history and metrics module
//!
//! Provides:
//! - Historical daily prices from CoinGecko
//! - Validated, immutable time series
//! - Summary metrics (change, volatility, extrema)
//! - Time-bucketed memoization of fetches

pub mod types;
pub mod source;
pub mod coingecko;
pub mod calculator;
pub mod cached;
#[cfg(test)]
pub(crate) mod testing;

pub use types::*;
pub use source::*;
pub use coingecko::*;
pub use calculator::*;
pub use cached::*;
