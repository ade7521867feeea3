//! DEX venue quote client
//!
//! Asks every configured venue independently for a direct quote on a pair
//! and normalizes the answers into one shape. A venue that errors, times
//! out, or has no pool for the pair is simply absent from the candidate
//! set; nothing here aborts the overall resolution and nothing retries.

use anyhow::{bail, Result};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::resolver::format_amount;
use super::tokens::{token_address, Network, Token};

/// Liquidity venues queried for direct quotes, in configured order.
/// The order is also the tie-break: equal outputs keep the earlier venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DexVenue {
    Liquidswap,
    Pancakeswap,
    Thala,
}

impl DexVenue {
    pub fn all() -> &'static [DexVenue] {
        &[DexVenue::Liquidswap, DexVenue::Pancakeswap, DexVenue::Thala]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DexVenue::Liquidswap => "Liquidswap",
            DexVenue::Pancakeswap => "PancakeSwap",
            DexVenue::Thala => "Thala",
        }
    }

    /// User-facing app URL for manual verification of the quote
    pub fn swap_url(&self) -> &'static str {
        match self {
            DexVenue::Liquidswap => "https://liquidswap.com",
            DexVenue::Pancakeswap => "https://aptos.pancakeswap.finance/swap",
            DexVenue::Thala => "https://app.thala.fi/swap",
        }
    }

    /// Flat pool fee the venue advertises, in percent
    fn fee_percent(&self) -> f64 {
        match self {
            DexVenue::Liquidswap => 0.3,
            DexVenue::Pancakeswap => 0.25,
            DexVenue::Thala => 0.3,
        }
    }
}

/// Uniform quote shape produced for every venue
#[derive(Debug, Clone, Serialize)]
pub struct DexQuote {
    pub dex: DexVenue,
    pub dex_name: String,
    /// Output amount as a fixed 6-decimal string
    pub output_amount: String,
    /// Price impact in percent
    pub price_impact: f64,
    /// Venue fee in percent
    pub fee: f64,
    pub gas_estimate: Option<u64>,
    pub dex_url: String,
}

impl DexQuote {
    pub fn output(&self) -> f64 {
        self.output_amount.parse().unwrap_or(0.0)
    }
}

/// Highest output wins; ties keep the earlier venue
pub fn best_quote(quotes: Vec<DexQuote>) -> Option<DexQuote> {
    quotes.into_iter().fold(None, |best, candidate| match best {
        Some(current) if candidate.output() <= current.output() => Some(current),
        _ => Some(candidate),
    })
}

/// Direct per-venue quotes for a token pair.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// One quote per venue that has a usable pool; failed venues are
    /// silently absent.
    async fn all_quotes(
        &self,
        token_in: Token,
        token_out: Token,
        amount: f64,
        network: Network,
    ) -> Vec<DexQuote>;
}

#[derive(Debug, Deserialize)]
struct LiquidswapQuoteResponse {
    #[serde(rename = "amountOut")]
    amount_out: String,
    #[serde(rename = "priceImpact", default)]
    price_impact: f64,
    #[serde(rename = "gasUnits", default)]
    gas_units: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PancakeQuoteResponse {
    #[serde(rename = "outputAmount")]
    output_amount: String,
    #[serde(rename = "priceImpactPct", default)]
    price_impact_pct: f64,
}

#[derive(Debug, Deserialize)]
struct ThalaQuoteResponse {
    #[serde(rename = "amountOut")]
    amount_out: f64,
    #[serde(rename = "priceImpact", default)]
    price_impact: f64,
}

/// HTTP client over the venue quote APIs
pub struct DexQuoteClient {
    http: Client,
    liquidswap_base: String,
    pancake_base: String,
    thala_base: String,
}

impl DexQuoteClient {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            liquidswap_base: "https://api.liquidswap.com".to_string(),
            pancake_base: "https://routing-api.pancakeswap.com".to_string(),
            thala_base: "https://app.thala.fi/api".to_string(),
        }
    }

    async fn venue_quote(
        &self,
        venue: DexVenue,
        from_address: &str,
        to_address: &str,
        amount: f64,
    ) -> Result<DexQuote> {
        let amount_str = format_amount(amount);
        let (output_amount, price_impact, gas_estimate) = match venue {
            DexVenue::Liquidswap => {
                let url = format!("{}/v1/quotes", self.liquidswap_base);
                let response = self
                    .http
                    .get(&url)
                    .query(&[
                        ("from", from_address),
                        ("to", to_address),
                        ("amount", amount_str.as_str()),
                    ])
                    .send()
                    .await?;
                if !response.status().is_success() {
                    bail!("Liquidswap quote failed with status {}", response.status());
                }
                let body: LiquidswapQuoteResponse = response.json().await?;
                let output: f64 = body.amount_out.parse()?;
                (output, body.price_impact, body.gas_units)
            }
            DexVenue::Pancakeswap => {
                let url = format!("{}/aptos/quote", self.pancake_base);
                let response = self
                    .http
                    .get(&url)
                    .query(&[
                        ("inputCoin", from_address),
                        ("outputCoin", to_address),
                        ("amount", amount_str.as_str()),
                    ])
                    .send()
                    .await?;
                if !response.status().is_success() {
                    bail!("PancakeSwap quote failed with status {}", response.status());
                }
                let body: PancakeQuoteResponse = response.json().await?;
                let output: f64 = body.output_amount.parse()?;
                (output, body.price_impact_pct, None)
            }
            DexVenue::Thala => {
                let url = format!("{}/router/quote", self.thala_base);
                let response = self
                    .http
                    .get(&url)
                    .query(&[
                        ("fromCoin", from_address),
                        ("toCoin", to_address),
                        ("amountIn", amount_str.as_str()),
                    ])
                    .send()
                    .await?;
                if !response.status().is_success() {
                    bail!("Thala quote failed with status {}", response.status());
                }
                let body: ThalaQuoteResponse = response.json().await?;
                (body.amount_out, body.price_impact, None)
            }
        };

        if output_amount <= 0.0 {
            bail!("{} returned empty quote", venue.display_name());
        }

        Ok(DexQuote {
            dex: venue,
            dex_name: venue.display_name().to_string(),
            output_amount: format_amount(output_amount),
            price_impact,
            fee: venue.fee_percent(),
            gas_estimate,
            dex_url: venue.swap_url().to_string(),
        })
    }
}

#[async_trait]
impl QuoteSource for DexQuoteClient {
    async fn all_quotes(
        &self,
        token_in: Token,
        token_out: Token,
        amount: f64,
        network: Network,
    ) -> Vec<DexQuote> {
        let (from_address, to_address) =
            match (token_address(token_in, network), token_address(token_out, network)) {
                (Ok(from), Ok(to)) => (from, to),
                (Err(e), _) | (_, Err(e)) => {
                    warn!("skipping venue quotes: {}", e);
                    return Vec::new();
                }
            };

        let calls = DexVenue::all()
            .iter()
            .map(|venue| self.venue_quote(*venue, from_address, to_address, amount));

        join_all(calls)
            .await
            .into_iter()
            .zip(DexVenue::all())
            .filter_map(|(result, venue)| match result {
                Ok(quote) => Some(quote),
                Err(e) => {
                    debug!(
                        "{} has no quote for {} -> {}: {}",
                        venue.display_name(),
                        token_in,
                        token_out,
                        e
                    );
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(venue: DexVenue, output: &str) -> DexQuote {
        DexQuote {
            dex: venue,
            dex_name: venue.display_name().to_string(),
            output_amount: output.to_string(),
            price_impact: 0.5,
            fee: 0.3,
            gas_estimate: None,
            dex_url: venue.swap_url().to_string(),
        }
    }

    #[test]
    fn test_best_quote_picks_highest_output() {
        let best = best_quote(vec![
            quote(DexVenue::Liquidswap, "95.000000"),
            quote(DexVenue::Pancakeswap, "101.250000"),
            quote(DexVenue::Thala, "100.000000"),
        ])
        .unwrap();
        assert_eq!(best.dex, DexVenue::Pancakeswap);
    }

    #[test]
    fn test_best_quote_tie_keeps_earlier_venue() {
        let best = best_quote(vec![
            quote(DexVenue::Liquidswap, "100.000000"),
            quote(DexVenue::Thala, "100.000000"),
        ])
        .unwrap();
        assert_eq!(best.dex, DexVenue::Liquidswap);
    }

    #[test]
    fn test_best_quote_empty() {
        assert!(best_quote(vec![]).is_none());
    }

    #[test]
    fn test_unparseable_output_treated_as_zero() {
        let q = quote(DexVenue::Thala, "not-a-number");
        assert_eq!(q.output(), 0.0);
    }
}
