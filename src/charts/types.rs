//! Price series types and data structures

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::error::ConfigError;

/// Lookback window in days, validated to the range the API accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LookbackDays(u32);

impl LookbackDays {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 365;

    /// Dashboard slider default
    pub const DEFAULT: LookbackDays = LookbackDays(14);

    pub fn new(days: u32) -> Result<Self, ConfigError> {
        if (Self::MIN..=Self::MAX).contains(&days) {
            Ok(Self(days))
        } else {
            Err(ConfigError::DaysOutOfRange {
                value: days,
                min: Self::MIN,
                max: Self::MAX,
            })
        }
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for LookbackDays {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for LookbackDays {
    type Error = ConfigError;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        Self::new(days)
    }
}

impl fmt::Display for LookbackDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Single price point with timestamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    /// Sample time, UTC
    pub timestamp: DateTime<Utc>,
    /// Price in USD
    pub price: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }

    /// Build from a unix timestamp in milliseconds.
    /// Returns `None` when the instant is outside chrono's range.
    pub fn from_millis(timestamp_ms: i64, price: f64) -> Option<Self> {
        DateTime::from_timestamp_millis(timestamp_ms).map(|timestamp| Self { timestamp, price })
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// Reasons a sequence of points cannot form a [`TimeSeries`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeriesError {
    #[error("timestamp at index {index} is not after the previous one")]
    NotIncreasing { index: usize },

    #[error("price at index {index} is not a finite non-negative number: {price}")]
    InvalidPrice { index: usize, price: f64 },
}

/// Ordered, immutable price history.
///
/// Timestamps are strictly increasing and prices are finite and
/// non-negative; both are checked once in [`TimeSeries::new`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TimeSeries {
    points: Vec<PricePoint>,
}

impl TimeSeries {
    pub fn new(points: Vec<PricePoint>) -> Result<Self, SeriesError> {
        for (index, point) in points.iter().enumerate() {
            if !point.price.is_finite() || point.price < 0.0 {
                return Err(SeriesError::InvalidPrice {
                    index,
                    price: point.price,
                });
            }
            if index > 0 && point.timestamp <= points[index - 1].timestamp {
                return Err(SeriesError::NotIncreasing { index });
            }
        }

        Ok(Self { points })
    }

    pub fn empty() -> Self {
        Self { points: Vec::new() }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Prices in timestamp order
    pub fn prices(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.price)
    }
}

/// Token ids of the dashboard's default selection
pub const DEFAULT_TOKENS: [&str; 3] = [
    KnownTokenIds::BITCOIN,
    KnownTokenIds::ETHEREUM,
    KnownTokenIds::SOLANA,
];

/// Known CoinGecko token IDs for common assets
pub struct KnownTokenIds;

impl KnownTokenIds {
    pub const BITCOIN: &'static str = "bitcoin";
    pub const ETHEREUM: &'static str = "ethereum";
    pub const SOLANA: &'static str = "solana";
    pub const CARDANO: &'static str = "cardano";
    pub const DOGECOIN: &'static str = "dogecoin";
    pub const POLKADOT: &'static str = "polkadot";
    pub const CHAINLINK: &'static str = "chainlink";
    pub const AVALANCHE: &'static str = "avalanche-2";
    pub const POLYGON: &'static str = "matic-network";

    /// Get token ID from ticker symbol
    pub fn from_symbol(symbol: &str) -> Option<&'static str> {
        match symbol.to_uppercase().as_str() {
            "BTC" => Some(Self::BITCOIN),
            "ETH" => Some(Self::ETHEREUM),
            "SOL" => Some(Self::SOLANA),
            "ADA" => Some(Self::CARDANO),
            "DOGE" => Some(Self::DOGECOIN),
            "DOT" => Some(Self::POLKADOT),
            "LINK" => Some(Self::CHAINLINK),
            "AVAX" => Some(Self::AVALANCHE),
            "MATIC" | "POL" => Some(Self::POLYGON),
            _ => None,
        }
    }

    /// Resolve user input that may be either a symbol or an id
    pub fn resolve(input: &str) -> String {
        let trimmed = input.trim();
        Self::from_symbol(trimmed)
            .map(str::to_string)
            .unwrap_or_else(|| trimmed.to_lowercase())
    }
}

/// Title-case a token id for display ("avalanche-2" -> "Avalanche-2")
pub fn display_name(token_id: &str) -> String {
    let mut out = String::with_capacity(token_id.len());
    let mut at_word_start = true;
    for ch in token_id.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}
