//! Panora swap aggregator client
//!
//! The aggregator ranks routes across venues itself and, when it can,
//! pre-builds the swap transaction. Its quotes are trusted as-ranked;
//! any failure on this side collapses to "no quotes" so the resolver can
//! fall through to its own routing.

use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::resolver::format_amount;

const DEFAULT_BASE_URL: &str = "https://api.panora.exchange";

/// One ranked quote from the aggregator
#[derive(Debug, Clone)]
pub struct AggregatorQuote {
    /// Output amount as the aggregator reported it (decimal string)
    pub output_amount: String,
    /// Price impact in percent
    pub price_impact: f64,
    /// Venue the aggregator picked for the top of the route, if reported
    pub dex: Option<String>,
    /// Token addresses along the aggregator's route
    pub path: Vec<String>,
    /// Opaque pre-built transaction payload, passed through untouched
    pub tx_data: Option<Value>,
}

impl AggregatorQuote {
    pub fn output(&self) -> f64 {
        self.output_amount.parse().unwrap_or(0.0)
    }

    /// A quote is usable when it carries a non-empty, non-zero output
    pub fn is_usable(&self) -> bool {
        !self.output_amount.is_empty() && self.output() > 0.0
    }
}

/// Ranked aggregator quotes for a pair.
#[async_trait]
pub trait AggregatorSource: Send + Sync {
    /// Quotes best-first, or empty when the aggregator has nothing.
    /// Transport and parse failures are treated identically to "no
    /// quotes found".
    async fn quotes(&self, from_address: &str, to_address: &str, amount: f64)
        -> Vec<AggregatorQuote>;

    /// Display name used as the route's protocol label
    fn display_name(&self) -> &'static str {
        "Panora"
    }
}

#[derive(Debug, Deserialize)]
struct PanoraQuoteResponse {
    #[serde(default)]
    quotes: Vec<PanoraQuote>,
}

#[derive(Debug, Deserialize)]
struct PanoraQuote {
    #[serde(rename = "toTokenAmount")]
    to_token_amount: String,
    // The API reports impact as a bare string like "0.3"; tolerate a
    // number as well and treat anything else as zero.
    #[serde(rename = "priceImpact", default)]
    price_impact: Option<Value>,
    #[serde(default)]
    route: Option<PanoraRoute>,
    #[serde(rename = "txData", default)]
    tx_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct PanoraRoute {
    #[serde(default)]
    dex: Option<String>,
    #[serde(default)]
    path: Option<Vec<String>>,
}

fn impact_to_percent(raw: &Option<Value>) -> f64 {
    match raw {
        Some(Value::String(s)) => s.parse().unwrap_or(0.0),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// HTTP client over the Panora quote endpoint
pub struct PanoraClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl PanoraClient {
    pub fn new(http: Client, api_key: Option<String>) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL, api_key)
    }

    pub fn with_base_url(
        http: Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key,
        }
    }

    async fn fetch_quotes(
        &self,
        from_address: &str,
        to_address: &str,
        amount: f64,
    ) -> Result<Vec<AggregatorQuote>> {
        let amount_str = format_amount(amount);
        let url = format!("{}/swap/quote", self.base_url);

        let mut request = self.http.get(&url).query(&[
            ("fromTokenAddress", from_address),
            ("toTokenAddress", to_address),
            ("fromTokenAmount", amount_str.as_str()),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            bail!("aggregator returned status {}", response.status());
        }

        let body: PanoraQuoteResponse = response.json().await?;
        debug!("aggregator returned {} quote(s)", body.quotes.len());

        Ok(body
            .quotes
            .into_iter()
            .map(|q| AggregatorQuote {
                output_amount: q.to_token_amount,
                price_impact: impact_to_percent(&q.price_impact),
                dex: q.route.as_ref().and_then(|r| r.dex.clone()),
                path: q
                    .route
                    .and_then(|r| r.path)
                    .unwrap_or_default(),
                tx_data: q.tx_data,
            })
            .collect())
    }
}

#[async_trait]
impl AggregatorSource for PanoraClient {
    async fn quotes(
        &self,
        from_address: &str,
        to_address: &str,
        amount: f64,
    ) -> Vec<AggregatorQuote> {
        match self.fetch_quotes(from_address, to_address, amount).await {
            Ok(quotes) => quotes,
            Err(e) => {
                warn!("aggregator quote failed: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_impact_parses_string_and_number() {
        assert_eq!(impact_to_percent(&Some(json!("0.3"))), 0.3);
        assert_eq!(impact_to_percent(&Some(json!(1.25))), 1.25);
        assert_eq!(impact_to_percent(&Some(json!("garbage"))), 0.0);
        assert_eq!(impact_to_percent(&None), 0.0);
    }

    #[test]
    fn test_usable_quote_requires_positive_output() {
        let mut quote = AggregatorQuote {
            output_amount: "67.5".to_string(),
            price_impact: 0.3,
            dex: None,
            path: vec![],
            tx_data: None,
        };
        assert!(quote.is_usable());

        quote.output_amount = "0".to_string();
        assert!(!quote.is_usable());

        quote.output_amount = String::new();
        assert!(!quote.is_usable());
    }

    #[test]
    fn test_response_parsing_tolerates_missing_fields() {
        let raw = json!({
            "quotes": [
                { "toTokenAmount": "67.5", "priceImpact": "0.3" },
                {
                    "toTokenAmount": "66.9",
                    "route": { "dex": "Liquidswap", "path": ["0x1::a::A", "0x2::b::B"] },
                    "txData": { "function": "0x1::router::swap" }
                }
            ]
        });

        let parsed: PanoraQuoteResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.quotes.len(), 2);
        assert!(parsed.quotes[0].route.is_none());
        assert_eq!(
            parsed.quotes[1].route.as_ref().unwrap().dex.as_deref(),
            Some("Liquidswap")
        );
        assert!(parsed.quotes[1].tx_data.is_some());
    }
}
