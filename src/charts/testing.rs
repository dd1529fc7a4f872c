//! Scripted transport and counting source for unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::source::PriceSource;
use super::types::{LookbackDays, PricePoint, TimeSeries};
use crate::error::FetchError;
use crate::utils::{HttpRequest, HttpResponse, HttpTransport};

/// Replays queued results and records every request
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, FetchError>>>,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: &str) -> Self {
        self.push(Ok(HttpResponse::new(status, body)))
    }

    pub fn fail(self, error: FetchError) -> Self {
        self.push(Err(error))
    }

    fn push(self, result: Result<HttpResponse, FetchError>) -> Self {
        self.responses.lock().unwrap().push_back(result);
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl HttpTransport for ScriptedTransport {
    fn get(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::network("no scripted response left")))
    }
}

/// Price source that counts calls and returns a fixed series
pub struct CountingSource {
    pub calls: AtomicUsize,
    pub result: Result<TimeSeries, FetchError>,
}

impl CountingSource {
    pub fn ok(prices: &[f64]) -> Self {
        let points = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| PricePoint::from_millis(i as i64 * 86_400_000, p).unwrap())
            .collect();
        Self {
            calls: AtomicUsize::new(0),
            result: Ok(TimeSeries::new(points).unwrap()),
        }
    }

    pub fn err(error: FetchError) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            result: Err(error),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PriceSource for CountingSource {
    fn fetch_price_series(&self, _token_id: &str, _days: LookbackDays) -> Result<TimeSeries, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}
