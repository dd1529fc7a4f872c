//! CoinGecko API client for price history
//!
//! API Endpoints used:
//! - /coins/{id}/market_chart - Historical prices, sampled daily

use std::sync::Arc;
use std::time::Instant;

use super::source::PriceSource;
use super::types::*;
use crate::config::{FetcherConfig, RateLimitPolicy};
use crate::error::{ConfigError, FetchError};
use crate::utils::{HttpRequest, HttpTransport, ReqwestTransport};
use crate::{log_debug, log_info, log_warn};

const MODULE: &str = "charts::coingecko";

/// Quote currency for every request
pub const VS_CURRENCY: &str = "usd";
/// Sampling interval for every request
pub const INTERVAL: &str = "daily";

/// Header carrying a pro-tier key
const API_KEY_HEADER: &str = "x-cg-pro-api-key";

/// CoinGecko market-chart client.
///
/// Holds only immutable configuration and a transport, so one instance can
/// serve concurrent fetches for different tokens.
#[derive(Clone)]
pub struct CoinGeckoClient {
    config: FetcherConfig,
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for CoinGeckoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinGeckoClient")
            .field("base_url", &self.config.base_url)
            .field("api_key", &self.config.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.config.timeout)
            .field("rate_limit", &self.config.rate_limit)
            .finish()
    }
}

impl CoinGeckoClient {
    /// Create a client backed by a real HTTP connection pool
    pub fn new(config: FetcherConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.timeout, &config.user_agent)?;
        Ok(Self {
            config,
            transport: Arc::new(transport),
        })
    }

    /// Create a client over a caller-supplied transport
    pub fn with_transport(
        config: FetcherConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, transport })
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Build the market chart request for historical data
    /// GET /coins/{id}/market_chart?vs_currency=usd&days={days}&interval=daily
    pub fn market_chart_request(
        &self,
        token_id: &str,
        days: LookbackDays,
    ) -> Result<HttpRequest, FetchError> {
        validate_token_id(token_id)?;

        let url = format!(
            "{}/coins/{}/market_chart",
            self.config.base_url,
            urlencoding::encode(token_id)
        );

        let mut request = HttpRequest::get(url)
            .query("vs_currency", VS_CURRENCY)
            .query("days", days.get())
            .query("interval", INTERVAL);

        if let Some(ref key) = self.config.api_key {
            request = request.header(API_KEY_HEADER, key.clone());
        }

        Ok(request)
    }

    /// Full request URL, for display and logging
    pub fn market_chart_url(&self, token_id: &str, days: LookbackDays) -> Result<String, FetchError> {
        self.market_chart_request(token_id, days)
            .map(|request| request.display_url())
    }

    /// Fetch and validate a price series.
    ///
    /// A 429 answer is handled according to the configured
    /// [`RateLimitPolicy`]; every other failure returns on the first attempt.
    pub fn fetch_price_series(
        &self,
        token_id: &str,
        days: LookbackDays,
    ) -> Result<TimeSeries, FetchError> {
        let request = self.market_chart_request(token_id, days)?;
        let started = Instant::now();
        let mut retries = 0u32;

        log_debug!(MODULE, "Requesting market chart", url = request.display_url());

        loop {
            let response = self.transport.get(&request).map_err(|e| {
                log_warn!(MODULE, "Transport failure", token_id = token_id, error = e);
                e
            })?;

            if response.status == 429 {
                log_warn!(
                    MODULE,
                    "Rate limited",
                    token_id = token_id,
                    attempt = retries + 1
                );

                match self.config.rate_limit {
                    RateLimitPolicy::FailFast => return Err(FetchError::RateLimited),
                    RateLimitPolicy::PauseThenFail(pause) => {
                        std::thread::sleep(pause);
                        return Err(FetchError::RateLimited);
                    }
                    RateLimitPolicy::RetryAfterPause { pause, max_retries } if retries < max_retries => {
                        std::thread::sleep(pause);
                        retries += 1;
                        continue;
                    }
                    RateLimitPolicy::RetryAfterPause { .. } => return Err(FetchError::RateLimited),
                }
            }

            if !response.is_success() {
                log_warn!(MODULE, "Unexpected HTTP status", token_id = token_id, status = response.status);
                return Err(FetchError::HttpError(response.status));
            }

            let series = parse_market_chart(&response.body).map_err(|e| {
                log_warn!(MODULE, "Rejected payload", token_id = token_id, error = e);
                e
            })?;

            log_info!(
                MODULE,
                "Fetched price series",
                token_id = token_id,
                days = days,
                points = series.len(),
                elapsed_ms = started.elapsed().as_millis()
            );

            return Ok(series);
        }
    }
}

impl PriceSource for CoinGeckoClient {
    fn fetch_price_series(
        &self,
        token_id: &str,
        days: LookbackDays,
    ) -> Result<TimeSeries, FetchError> {
        CoinGeckoClient::fetch_price_series(self, token_id, days)
    }
}

/// Token ids become a URL path segment; reject anything that cannot be one
fn validate_token_id(token_id: &str) -> Result<(), FetchError> {
    let invalid = token_id.is_empty()
        || token_id
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '?' | '#' | '\\'));

    if invalid {
        Err(FetchError::InvalidToken(token_id.to_string()))
    } else {
        Ok(())
    }
}

/// Parse a market chart JSON body into a [`TimeSeries`].
///
/// Only the `prices` field is read: an array of `[timestamp_ms, price]`
/// pairs in ascending time order. Order is preserved, never re-sorted.
pub fn parse_market_chart(json: &str) -> Result<TimeSeries, FetchError> {
    let parsed: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| FetchError::malformed(format!("invalid JSON: {}", e)))?;

    let prices = parsed
        .as_object()
        .ok_or_else(|| FetchError::malformed("top-level value is not an object"))?
        .get("prices")
        .ok_or_else(|| FetchError::malformed("missing prices field"))?
        .as_array()
        .ok_or_else(|| FetchError::malformed("prices is not an array"))?;

    if prices.is_empty() {
        return Err(FetchError::EmptyPayload);
    }

    let mut points = Vec::with_capacity(prices.len());
    for (index, entry) in prices.iter().enumerate() {
        let pair = match entry.as_array() {
            Some(pair) if pair.len() == 2 => pair,
            _ => {
                return Err(FetchError::malformed(format!(
                    "entry {} is not a [timestamp, price] pair",
                    index
                )))
            }
        };

        let timestamp_ms = json_to_millis(&pair[0]).ok_or_else(|| {
            FetchError::malformed(format!("entry {} has an invalid timestamp", index))
        })?;
        let price = pair[1].as_f64().ok_or_else(|| {
            FetchError::malformed(format!("entry {} has a non-numeric price", index))
        })?;

        let point = PricePoint::from_millis(timestamp_ms, price).ok_or_else(|| {
            FetchError::malformed(format!("entry {} timestamp is out of range", index))
        })?;
        points.push(point);
    }

    TimeSeries::new(points).map_err(|e| FetchError::malformed(e.to_string()))
}

/// Integral milliseconds; CoinGecko sends integers but floats with no
/// fractional part are accepted too
fn json_to_millis(value: &serde_json::Value) -> Option<i64> {
    if let Some(ms) = value.as_i64() {
        return Some(ms);
    }
    let ms = value.as_f64()?;
    if ms.is_finite() && ms.fract() == 0.0 && ms.abs() < i64::MAX as f64 {
        Some(ms as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::testing::ScriptedTransport;
    use std::time::Duration;

    const REFERENCE: &str = r#"{"prices": [[0,100],[86400000,110],[172800000,90]]}"#;

    fn days(n: u32) -> LookbackDays {
        LookbackDays::new(n).unwrap()
    }

    fn client_with(transport: ScriptedTransport, config: FetcherConfig) -> (CoinGeckoClient, Arc<ScriptedTransport>) {
        let transport = Arc::new(transport);
        let client = CoinGeckoClient::with_transport(config, transport.clone()).unwrap();
        (client, transport)
    }

    #[test]
    fn test_market_chart_url() {
        let (client, _) = client_with(ScriptedTransport::new(), FetcherConfig::new());
        let url = client.market_chart_url("bitcoin", days(7)).unwrap();
        assert_eq!(
            url,
            "https://api.coingecko.com/api/v3/coins/bitcoin/market_chart?vs_currency=usd&days=7&interval=daily"
        );
    }

    #[test]
    fn test_api_key_sent_as_header() {
        let config = FetcherConfig::new().with_api_key("CG-test-key");
        let (client, _) = client_with(ScriptedTransport::new(), config);
        let request = client.market_chart_request("ethereum", days(30)).unwrap();

        assert!(request.url.starts_with("https://pro-api.coingecko.com"));
        assert!(!request.display_url().contains("CG-test-key"));
        assert_eq!(request.headers, vec![(API_KEY_HEADER, "CG-test-key".to_string())]);
    }

    #[test]
    fn test_invalid_token_ids() {
        let (client, transport) = client_with(ScriptedTransport::new(), FetcherConfig::new());
        for bad in ["", " ", "bit coin", "../admin", "a?b", "a#b"] {
            let err = client.fetch_price_series(bad, days(7)).unwrap_err();
            assert_eq!(err, FetchError::InvalidToken(bad.to_string()));
        }
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn test_parse_reference_payload() {
        let series = parse_market_chart(REFERENCE).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.points()[1].timestamp_ms(), 86_400_000);
        assert_eq!(series.last().unwrap().price, 90.0);
    }

    #[test]
    fn test_parse_ignores_other_fields() {
        let json = r#"{
            "prices": [[1704067200000, 42000.5], [1704153600000, 43500.75]],
            "total_volumes": [[1704067200000, 25000000000]],
            "market_caps": "whatever"
        }"#;
        let series = parse_market_chart(json).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.first().unwrap().price, 42000.5);
    }

    #[test]
    fn test_parse_float_timestamps() {
        let series = parse_market_chart(r#"{"prices": [[1000.0, 1.5], [2000.0, 2.5]]}"#).unwrap();
        assert_eq!(series.points()[0].timestamp_ms(), 1000);

        let err = parse_market_chart(r#"{"prices": [[1000.5, 1.5]]}"#).unwrap_err();
        assert!(matches!(err, FetchError::MalformedPayload(_)));
    }

    #[test]
    fn test_parse_missing_prices() {
        let err = parse_market_chart(r#"{"total_volumes": []}"#).unwrap_err();
        assert!(matches!(err, FetchError::MalformedPayload(_)));
    }

    #[test]
    fn test_parse_empty_prices() {
        assert_eq!(parse_market_chart(r#"{"prices": []}"#), Err(FetchError::EmptyPayload));
    }

    #[test]
    fn test_parse_wrong_shapes() {
        for body in [
            "not json",
            "[]",
            r#"{"prices": {}}"#,
            r#"{"prices": [[1000]]}"#,
            r#"{"prices": [[1000, 1.0, 2.0]]}"#,
            r#"{"prices": [["1000", 1.0]]}"#,
            r#"{"prices": [[1000, null]]}"#,
            r#"{"prices": [[1000, -5.0]]}"#,
            r#"{"prices": [1000, 1.0]}"#,
        ] {
            let err = parse_market_chart(body).unwrap_err();
            assert!(matches!(err, FetchError::MalformedPayload(_)), "{} -> {:?}", body, err);
        }
    }

    #[test]
    fn test_parse_rejects_non_increasing() {
        let err = parse_market_chart(r#"{"prices": [[1000,10],[500,20]]}"#).unwrap_err();
        assert!(matches!(err, FetchError::MalformedPayload(_)));

        let err = parse_market_chart(r#"{"prices": [[1000,10],[1000,20]]}"#).unwrap_err();
        assert!(matches!(err, FetchError::MalformedPayload(_)));
    }

    #[test]
    fn test_fetch_success() {
        let (client, transport) = client_with(ScriptedTransport::new().respond(200, REFERENCE), FetcherConfig::new());
        let series = client.fetch_price_series("bitcoin", days(3)).unwrap();
        assert_eq!(series.len(), 3);

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.ends_with("/coins/bitcoin/market_chart"));
        assert!(requests[0].query.contains(&("days", "3".to_string())));
        assert!(requests[0].query.contains(&("interval", "daily".to_string())));
    }

    #[test]
    fn test_fetch_status_mapping() {
        let cases = [
            (429, FetchError::RateLimited),
            (500, FetchError::HttpError(500)),
            (404, FetchError::HttpError(404)),
            (301, FetchError::HttpError(301)),
        ];
        for (status, expected) in cases {
            let (client, _) = client_with(ScriptedTransport::new().respond(status, "{}"), FetcherConfig::new());
            assert_eq!(client.fetch_price_series("bitcoin", days(7)), Err(expected));
        }
    }

    #[test]
    fn test_fetch_empty_payload() {
        let (client, _) = client_with(ScriptedTransport::new().respond(200, r#"{"prices": []}"#), FetcherConfig::new());
        assert_eq!(client.fetch_price_series("bitcoin", days(7)), Err(FetchError::EmptyPayload));
    }

    #[test]
    fn test_transport_errors_pass_through() {
        let (client, _) = client_with(ScriptedTransport::new().fail(FetchError::Timeout), FetcherConfig::new());
        assert_eq!(client.fetch_price_series("bitcoin", days(7)), Err(FetchError::Timeout));

        let (client, _) = client_with(
            ScriptedTransport::new().fail(FetchError::network("connection reset")),
            FetcherConfig::new(),
        );
        assert!(matches!(
            client.fetch_price_series("bitcoin", days(7)),
            Err(FetchError::NetworkError(_))
        ));
    }

    #[test]
    fn test_rate_limit_fail_fast_does_not_retry() {
        let transport = ScriptedTransport::new().respond(429, "").respond(200, REFERENCE);
        let (client, transport) = client_with(transport, FetcherConfig::new());

        assert_eq!(client.fetch_price_series("bitcoin", days(7)), Err(FetchError::RateLimited));
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_rate_limit_pause_then_fail() {
        let pause = Duration::from_millis(20);
        let config = FetcherConfig::new().with_rate_limit(RateLimitPolicy::PauseThenFail(pause));
        let transport = ScriptedTransport::new().respond(429, "").respond(200, REFERENCE);
        let (client, transport) = client_with(transport, config);

        let started = Instant::now();
        assert_eq!(client.fetch_price_series("bitcoin", days(7)), Err(FetchError::RateLimited));
        assert!(started.elapsed() >= pause);
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_rate_limit_retry_recovers() {
        let config = FetcherConfig::new().with_rate_limit(RateLimitPolicy::RetryAfterPause {
            pause: Duration::from_millis(1),
            max_retries: 2,
        });
        let transport = ScriptedTransport::new()
            .respond(429, "")
            .respond(429, "")
            .respond(200, REFERENCE);
        let (client, transport) = client_with(transport, config);

        assert_eq!(client.fetch_price_series("bitcoin", days(7)).unwrap().len(), 3);
        assert_eq!(transport.request_count(), 3);
    }

    #[test]
    fn test_rate_limit_retry_exhausted() {
        let config = FetcherConfig::new().with_rate_limit(RateLimitPolicy::RetryAfterPause {
            pause: Duration::from_millis(1),
            max_retries: 1,
        });
        let transport = ScriptedTransport::new()
            .respond(429, "")
            .respond(429, "")
            .respond(200, REFERENCE);
        let (client, transport) = client_with(transport, config);

        assert_eq!(client.fetch_price_series("bitcoin", days(7)), Err(FetchError::RateLimited));
        assert_eq!(transport.request_count(), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = FetcherConfig::new().with_base_url("http://example.com");
        let result = CoinGeckoClient::with_transport(config, Arc::new(ScriptedTransport::new()));
        assert!(matches!(result, Err(ConfigError::InsecureUrl(_))));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let (client, _) = client_with(ScriptedTransport::new(), FetcherConfig::new().with_api_key("CG-hidden"));
        let debug = format!("{:?}", client);
        assert!(!debug.contains("CG-hidden"));
    }
}
