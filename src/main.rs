use anyhow::{bail, Context, Result};
use clap::Parser;
use narrative_divergence::charts::KnownTokenIds;
use narrative_divergence::utils::logging;
use narrative_divergence::{
    render_text, summarize_tokens, ApiResponse, CachedFetcher, CoinGeckoClient, FetcherConfig,
    LookbackDays, RateLimitPolicy, TokenReport, DEFAULT_TOKENS,
};
use std::time::Duration;

/// Fetch daily price history for crypto tokens and print summary metrics
#[derive(Parser, Debug)]
#[command(name = "narrative-divergence", version)]
struct Cli {
    /// Token id or ticker symbol; repeat for several (default: bitcoin, ethereum, solana)
    #[arg(short, long = "token", value_name = "ID")]
    tokens: Vec<String>,

    /// Days of history
    #[arg(short, long, default_value_t = 14, value_parser = clap::value_parser!(u32).range(1..=365))]
    days: u32,

    /// API base URL (overrides NARRATIVE_API_BASE)
    #[arg(long, value_name = "URL")]
    api_base: Option<String>,

    /// CoinGecko pro API key (overrides COINGECKO_API_KEY)
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..=10))]
    timeout_secs: u64,

    /// Pause after a 429 answer, in milliseconds (0 = fail immediately, max 60000)
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u64).range(0..=60_000))]
    rate_limit_pause_ms: u64,

    /// Extra attempts after a 429 answer (max 5)
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..=5))]
    rate_limit_retries: u32,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn fetcher_config(&self) -> FetcherConfig {
        let mut config = FetcherConfig::from_env();

        if let Some(ref key) = self.api_key {
            config = config.with_api_key(key.clone());
        }
        if let Some(ref base) = self.api_base {
            config = config.with_base_url(base.clone());
        }

        config
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_rate_limit(RateLimitPolicy::from_parts(
                Duration::from_millis(self.rate_limit_pause_ms),
                self.rate_limit_retries,
            ))
    }

    /// Resolved token ids, duplicates removed, order kept
    fn token_ids(&self) -> Vec<String> {
        let raw: Vec<String> = if self.tokens.is_empty() {
            DEFAULT_TOKENS.iter().map(|t| t.to_string()).collect()
        } else {
            self.tokens.iter().map(|t| KnownTokenIds::resolve(t)).collect()
        };

        let mut ids = Vec::with_capacity(raw.len());
        for id in raw {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        logging::enable_debug();
    }

    let config = cli.fetcher_config();
    let client = CoinGeckoClient::new(config.clone()).context("invalid fetcher configuration")?;
    let fetcher = CachedFetcher::from_config(client, &config);

    let days = LookbackDays::new(cli.days)?;
    let tokens = cli.token_ids();
    let reports = summarize_tokens(&fetcher, &tokens, days);

    if cli.json {
        let envelopes: Vec<ApiResponse<TokenReport>> =
            reports.iter().cloned().map(ApiResponse::from).collect();
        println!("{}", serde_json::to_string_pretty(&envelopes)?);
    } else {
        for report in &reports {
            println!("{}", render_text(report));
        }
    }

    if !reports.is_empty() && reports.iter().all(|r| !r.is_ok()) {
        bail!("all {} token fetches failed", reports.len());
    }

    Ok(())
}
