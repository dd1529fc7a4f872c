//! Shared types handed to the presentation layer
//!
//! Everything here serializes to JSON so a UI (or the CLI's `--json`
//! mode) can render it without touching the pipeline internals.

use serde::Serialize;

use crate::charts::{display_name, LookbackDays, PriceMetrics, TimeSeries};
use crate::error::{ErrorReport, FetchError};

// =============================================================================
// Token Reports
// =============================================================================

/// Outcome of fetching and summarizing one token
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenReport {
    pub token_id: String,
    /// Title-cased id for headings
    pub display_name: String,
    pub days: LookbackDays,
    #[serde(flatten)]
    pub outcome: TokenOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TokenOutcome {
    /// Series fetched; metrics may still be absent
    Ok {
        series: TimeSeries,
        metrics: Option<PriceMetrics>,
    },
    Failed {
        #[serde(skip)]
        error: FetchError,
        #[serde(rename = "error")]
        report: ErrorReport,
    },
}

impl TokenReport {
    pub fn new(token_id: &str, days: LookbackDays, outcome: TokenOutcome) -> Self {
        Self {
            token_id: token_id.to_string(),
            display_name: display_name(token_id),
            days,
            outcome,
        }
    }

    pub fn failed(token_id: &str, days: LookbackDays, error: FetchError) -> Self {
        let report = ErrorReport::from(&error);
        Self::new(token_id, days, TokenOutcome::Failed { error, report })
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, TokenOutcome::Ok { .. })
    }

    pub fn metrics(&self) -> Option<&PriceMetrics> {
        match &self.outcome {
            TokenOutcome::Ok { metrics, .. } => metrics.as_ref(),
            TokenOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match &self.outcome {
            TokenOutcome::Ok { .. } => None,
            TokenOutcome::Failed { error, .. } => Some(error),
        }
    }
}

// =============================================================================
// Response Envelope
// =============================================================================

/// Success/failure envelope for JSON consumers
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorReport>,
}

impl From<TokenReport> for ApiResponse<TokenReport> {
    fn from(report: TokenReport) -> Self {
        let error = report.error().map(ErrorReport::from);
        Self {
            success: report.is_ok(),
            data: Some(report),
            error,
        }
    }
}
