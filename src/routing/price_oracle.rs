//! USD price oracle backed by a CoinGecko-style price API
//!
//! Prices here are advisory inputs for synthetic route estimation, not
//! correctness-critical state. The cache is read-through with a 5 minute
//! TTL; derived exchange rates get their own shorter window. Outbound
//! calls are spaced at least ~1.1s apart process-wide to stay inside the
//! provider's free-tier rate limit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use super::tokens::Token;

const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Freshness window for cached USD prices
const PRICE_TTL: Duration = Duration::from_secs(300);

/// Freshness window for derived exchange rates
const RATE_TTL: Duration = Duration::from_secs(60);

/// Minimum spacing between outbound price API calls, process-wide
const MIN_FETCH_INTERVAL: Duration = Duration::from_millis(1100);

/// Best-effort USD pricing for route estimation.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// USD price for a token. Never fails: degrades to a stale cached
    /// value, then to the token's hard-coded fallback constant.
    async fn usd_price(&self, token: Token) -> f64;
}

#[derive(Debug, Clone, Copy)]
struct CachedValue {
    value: f64,
    fetched_at: Instant,
}

impl CachedValue {
    fn fresh(value: f64) -> Self {
        Self {
            value,
            fetched_at: Instant::now(),
        }
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

#[derive(Debug, Deserialize)]
struct SimplePriceEntry {
    usd: f64,
}

/// Read-through price cache over the external price API
pub struct PriceOracle {
    http: Client,
    base_url: String,
    cache: RwLock<HashMap<Token, CachedValue>>,
    rate_cache: RwLock<HashMap<(Token, Token), CachedValue>>,
    // Timestamp gate serializing outbound calls; held across the sleep so
    // concurrent callers queue behind it.
    last_fetch: Mutex<Option<Instant>>,
    outbound_calls: AtomicU64,
}

impl PriceOracle {
    pub fn new(http: Client) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            cache: RwLock::new(HashMap::new()),
            rate_cache: RwLock::new(HashMap::new()),
            last_fetch: Mutex::new(None),
            outbound_calls: AtomicU64::new(0),
        }
    }

    /// Outbound price API calls issued since construction
    pub fn outbound_calls(&self) -> u64 {
        self.outbound_calls.load(Ordering::Relaxed)
    }

    /// Cache-through price fetch that surfaces failures. Callers wanting
    /// the never-fail contract go through [`PriceSource::usd_price`].
    pub async fn fetch_price_with_cache(&self, token: Token) -> Result<f64> {
        {
            let cache = self.cache.read().await;
            if let Some(hit) = cache.get(&token) {
                if hit.is_fresh(PRICE_TTL) {
                    debug!("price cache hit for {}: {}", token, hit.value);
                    return Ok(hit.value);
                }
            }
        }

        let fetched = self.fetch_remote(token).await?;
        self.cache
            .write()
            .await
            .insert(token, CachedValue::fresh(fetched));
        Ok(fetched)
    }

    /// Derived `base/quote` exchange rate with its own 60s cache window
    pub async fn exchange_rate(&self, base: Token, quote: Token) -> f64 {
        {
            let rates = self.rate_cache.read().await;
            if let Some(hit) = rates.get(&(base, quote)) {
                if hit.is_fresh(RATE_TTL) {
                    return hit.value;
                }
            }
        }

        let base_usd = self.usd_price(base).await;
        let quote_usd = self.usd_price(quote).await;
        let rate = if quote_usd > 0.0 {
            base_usd / quote_usd
        } else {
            0.0
        };

        self.rate_cache
            .write()
            .await
            .insert((base, quote), CachedValue::fresh(rate));
        rate
    }

    async fn fetch_remote(&self, token: Token) -> Result<f64> {
        self.throttle().await;
        self.outbound_calls.fetch_add(1, Ordering::Relaxed);

        let provider_id = token.price_provider_id();
        let url = format!("{}/simple/price", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("ids", provider_id), ("vs_currencies", "usd")])
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("price API returned status {}", response.status());
        }

        let body: HashMap<String, SimplePriceEntry> = response.json().await?;
        let entry = body
            .get(provider_id)
            .ok_or_else(|| anyhow!("price API response missing entry for {}", provider_id))?;

        if entry.usd <= 0.0 {
            bail!("price API returned non-positive price for {}", provider_id);
        }

        debug!("fetched {} price: {} USD", token, entry.usd);
        Ok(entry.usd)
    }

    async fn throttle(&self) {
        let mut last = self.last_fetch.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < MIN_FETCH_INTERVAL {
                tokio::time::sleep(MIN_FETCH_INTERVAL - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    #[cfg(test)]
    pub(crate) async fn seed_price(&self, token: Token, usd: f64, age: Duration) {
        self.cache.write().await.insert(
            token,
            CachedValue {
                value: usd,
                fetched_at: Instant::now() - age,
            },
        );
    }
}

#[async_trait]
impl PriceSource for PriceOracle {
    async fn usd_price(&self, token: Token) -> f64 {
        match self.fetch_price_with_cache(token).await {
            Ok(price) => price,
            Err(e) => {
                let cache = self.cache.read().await;
                if let Some(stale) = cache.get(&token) {
                    warn!(
                        "price fetch for {} failed ({}); serving value {:.0}s stale",
                        token,
                        e,
                        stale.fetched_at.elapsed().as_secs_f64()
                    );
                    stale.value
                } else {
                    warn!(
                        "price fetch for {} failed ({}); using fallback constant",
                        token, e
                    );
                    token.fallback_usd_price()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Unroutable address: connections fail immediately, no network needed
    const DEAD_URL: &str = "http://127.0.0.1:9/api/v3";

    fn oracle() -> PriceOracle {
        PriceOracle::with_base_url(Client::new(), DEAD_URL)
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_outbound_call() {
        let oracle = oracle();
        oracle
            .seed_price(Token::Apt, 4.85, Duration::from_secs(0))
            .await;

        let price = oracle.usd_price(Token::Apt).await;
        assert_eq!(price, 4.85);
        assert_eq!(oracle.outbound_calls(), 0);
    }

    #[tokio::test]
    async fn test_expired_cache_refetches_and_serves_stale_on_failure() {
        let oracle = oracle();
        oracle
            .seed_price(Token::Apt, 4.85, PRICE_TTL + Duration::from_secs(1))
            .await;

        // Fetch against the dead endpoint fails; stale value wins over the
        // fallback constant.
        let price = oracle.usd_price(Token::Apt).await;
        assert_eq!(price, 4.85);
        assert_eq!(oracle.outbound_calls(), 1);
    }

    #[tokio::test]
    async fn test_no_cache_falls_back_to_constant() {
        let oracle = oracle();

        assert_eq!(oracle.usd_price(Token::Usdc).await, 1.0);
        assert_eq!(oracle.usd_price(Token::Usdt).await, 1.0);
        assert_eq!(oracle.outbound_calls(), 2);
    }

    #[tokio::test]
    async fn test_fetch_with_cache_surfaces_failure() {
        let oracle = oracle();
        assert!(oracle.fetch_price_with_cache(Token::Apt).await.is_err());
    }

    #[tokio::test]
    async fn test_exchange_rate_from_cached_prices() {
        let oracle = oracle();
        oracle
            .seed_price(Token::Apt, 5.0, Duration::from_secs(0))
            .await;
        oracle
            .seed_price(Token::Usdc, 1.0, Duration::from_secs(0))
            .await;

        let rate = oracle.exchange_rate(Token::Apt, Token::Usdc).await;
        assert_eq!(rate, 5.0);
        assert_eq!(oracle.outbound_calls(), 0);

        // Second read comes from the rate cache
        let again = oracle.exchange_rate(Token::Apt, Token::Usdc).await;
        assert_eq!(again, 5.0);
        assert_eq!(oracle.outbound_calls(), 0);
    }
}
