//! Price metrics over a time series

use serde::Serialize;

use super::types::*;
use crate::log_warn;

const MODULE: &str = "charts::calculator";

/// Summary statistics for one [`TimeSeries`].
///
/// Only produced for series with at least two points and a non-zero
/// opening price; callers receive `None` otherwise. Every field is finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceMetrics {
    /// Change from first to last price, in percent
    pub price_change_pct: f64,
    /// Sample standard deviation of consecutive returns, in percent.
    /// `None` when fewer than two usable returns exist.
    pub volatility_pct: Option<f64>,
    pub max_price: f64,
    pub min_price: f64,
    pub current_price: f64,
}

/// Stateless metrics calculator
pub struct ChartCalculator;

impl ChartCalculator {
    /// Compute [`PriceMetrics`] for a series
    pub fn compute_metrics(series: &TimeSeries) -> Option<PriceMetrics> {
        if series.len() < 2 {
            return None;
        }

        let first = series.first()?.price;
        let current_price = series.last()?.price;
        let price_change_pct = Self::percentage_change(first, current_price)?;

        let prices: Vec<f64> = series.prices().collect();
        let (min_price, max_price) = Self::extrema(&prices)?;

        Some(PriceMetrics {
            price_change_pct,
            volatility_pct: Self::volatility(&prices)
                .map(|v| v * 100.0)
                .filter(|v| v.is_finite()),
            max_price,
            min_price,
            current_price,
        })
    }

    /// Calculate percentage change; `None` when `old` is zero or the
    /// ratio overflows (subnormal `old`)
    pub fn percentage_change(old: f64, new: f64) -> Option<f64> {
        if old == 0.0 {
            return None;
        }
        let pct = ((new - old) / old) * 100.0;
        if !pct.is_finite() {
            log_warn!(MODULE, "Percent change is not finite", old = old, new = new);
            return None;
        }
        Some(pct)
    }

    /// Period-over-period returns, skipping pairs whose base price is zero
    /// and pairs whose ratio is not finite
    pub fn returns(prices: &[f64]) -> Vec<f64> {
        prices
            .windows(2)
            .enumerate()
            .filter_map(|(i, w)| {
                if w[0] == 0.0 {
                    log_warn!(MODULE, "Skipping return with zero base price", index = i + 1);
                    return None;
                }

                let r = (w[1] - w[0]) / w[0];
                if !r.is_finite() {
                    log_warn!(MODULE, "Skipping non-finite return", index = i + 1, base = w[0]);
                    return None;
                }
                Some(r)
            })
            .collect()
    }

    /// Sample standard deviation of returns (n-1 denominator), as a fraction
    pub fn volatility(prices: &[f64]) -> Option<f64> {
        Self::sample_std_dev(&Self::returns(prices))
    }

    pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
        if values.len() < 2 {
            return None;
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let sd = variance.sqrt();

        // Huge finite inputs can still overflow the sum of squares
        if sd.is_finite() {
            Some(sd)
        } else {
            log_warn!(MODULE, "Standard deviation overflowed", samples = values.len());
            None
        }
    }

    /// (min, max) over prices
    pub fn extrema(prices: &[f64]) -> Option<(f64, f64)> {
        let min = prices.iter().cloned().reduce(f64::min)?;
        let max = prices.iter().cloned().reduce(f64::max)?;
        Some((min, max))
    }
}

/// Free-function form of [`ChartCalculator::compute_metrics`]
pub fn compute_metrics(series: &TimeSeries) -> Option<PriceMetrics> {
    ChartCalculator::compute_metrics(series)
}
