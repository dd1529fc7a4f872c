//! Fetch-and-summarize pipeline
//!
//! Runs fetch then metrics for each requested token and produces one
//! [`TokenReport`] per token, in request order.

use std::fmt::Write as _;

use crate::charts::{compute_metrics, LookbackDays, PriceSource};
use crate::types::{TokenOutcome, TokenReport};

/// Fetch and summarize a single token
pub fn summarize_token<S: PriceSource + ?Sized>(
    source: &S,
    token_id: &str,
    days: LookbackDays,
) -> TokenReport {
    match source.fetch_price_series(token_id, days) {
        Ok(series) => {
            let metrics = compute_metrics(&series);
            TokenReport::new(token_id, days, TokenOutcome::Ok { series, metrics })
        }
        Err(error) => TokenReport::failed(token_id, days, error),
    }
}

/// Summarize several tokens concurrently, one thread per token.
/// Output order matches `token_ids`.
pub fn summarize_tokens<S: PriceSource + ?Sized>(
    source: &S,
    token_ids: &[String],
    days: LookbackDays,
) -> Vec<TokenReport> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = token_ids
            .iter()
            .map(|token_id| scope.spawn(move || summarize_token(source, token_id, days)))
            .collect();

        handles
            .into_iter()
            .zip(token_ids)
            .map(|(handle, token_id)| {
                handle.join().unwrap_or_else(|_| {
                    TokenReport::failed(
                        token_id,
                        days,
                        crate::error::FetchError::network("fetch worker panicked"),
                    )
                })
            })
            .collect()
    })
}

/// Format an optional value, `n/a` when absent
fn fmt_opt(value: Option<f64>, f: impl Fn(f64) -> String) -> String {
    value.map(f).unwrap_or_else(|| "n/a".to_string())
}

fn fmt_usd(value: f64) -> String {
    if value >= 1.0 {
        format!("${:.2}", value)
    } else {
        format!("${:.6}", value)
    }
}

fn fmt_pct(value: f64) -> String {
    format!("{:+.2}%", value)
}

/// Human-readable block for one report
pub fn render_text(report: &TokenReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({}, {}d)", report.display_name, report.token_id, report.days);

    match &report.outcome {
        TokenOutcome::Ok { series, metrics } => {
            let _ = writeln!(out, "  points:        {}", series.len());
            if let (Some(first), Some(last)) = (series.first(), series.last()) {
                let _ = writeln!(
                    out,
                    "  range:         {} .. {}",
                    first.timestamp.format("%Y-%m-%d"),
                    last.timestamp.format("%Y-%m-%d")
                );
            }

            let m = metrics.as_ref();
            let _ = writeln!(out, "  price change:  {}", fmt_opt(m.map(|m| m.price_change_pct), fmt_pct));
            let _ = writeln!(
                out,
                "  volatility:    {}",
                fmt_opt(m.and_then(|m| m.volatility_pct), |v| format!("{:.2}%", v))
            );
            let _ = writeln!(out, "  current price: {}", fmt_opt(m.map(|m| m.current_price), fmt_usd));
            let _ = writeln!(out, "  max price:     {}", fmt_opt(m.map(|m| m.max_price), fmt_usd));
            let _ = writeln!(out, "  min price:     {}", fmt_opt(m.map(|m| m.min_price), fmt_usd));

            if metrics.is_none() {
                let _ = writeln!(out, "  (not enough data to compute metrics)");
            }
        }
        TokenOutcome::Failed { error, .. } => {
            let _ = writeln!(out, "  error: {}", error.user_message());
        }
    }

    out
}
