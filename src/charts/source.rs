//! Price source abstraction

use std::sync::Arc;

use super::types::{LookbackDays, TimeSeries};
use crate::error::FetchError;

/// Anything that can produce a price series for a token
pub trait PriceSource: Send + Sync {
    fn fetch_price_series(
        &self,
        token_id: &str,
        days: LookbackDays,
    ) -> Result<TimeSeries, FetchError>;
}

impl<T: PriceSource + ?Sized> PriceSource for Arc<T> {
    fn fetch_price_series(
        &self,
        token_id: &str,
        days: LookbackDays,
    ) -> Result<TimeSeries, FetchError> {
        (**self).fetch_price_series(token_id, days)
    }
}
