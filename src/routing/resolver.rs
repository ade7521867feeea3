//! Best-route resolution
//!
//! Ordered fallback chain, first success wins:
//! 1. direct aggregator quote
//! 2. two-hop route through the native token (APT)
//! 3. two-hop route through a stablecoin bridge
//! 4. pure price-ratio estimate
//!
//! Each stage only runs when the previous one produced nothing usable,
//! and the last stage cannot fail, so callers always get a route object
//! back. The one fatal error is an unconfigured token/network pair.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::aggregator::AggregatorSource;
use super::dex_quotes::{best_quote, DexQuote, QuoteSource};
use super::price_oracle::PriceSource;
use super::tokens::{descriptor, ConfigurationError, Network, Token, TokenDescriptor};

/// Gas units assumed for one swap leg when the venue reports no estimate
const DEFAULT_SWAP_GAS_UNITS: u64 = 1_000;

/// Protocol label for routes derived purely from price ratios
const SYNTHETIC_PROTOCOL: &str = "Price Estimate";

const SYNTHETIC_WARNING: &str = "No live liquidity route was found for this pair. The output \
     amount is a price-ratio estimate and actual execution may differ. Verify the pair on an \
     explorer before swapping.";

/// Serialize amounts the way the HTTP boundary expects them
pub fn format_amount(value: f64) -> String {
    format!("{value:.6}")
}

/// One leg of a resolved route
#[derive(Debug, Clone, Serialize)]
pub struct RouteHop {
    pub venue: String,
    pub token_in: Token,
    pub token_out: Token,
    /// Venue fee in percent
    pub fee: f64,
}

/// Lower-ranked candidate kept for display next to the chosen route
#[derive(Debug, Clone, Serialize)]
pub struct AlternativeRoute {
    pub protocol: String,
    pub expected_output: String,
    pub price_impact: f64,
}

/// The resolved answer to "how do I best convert `amount` of one token
/// into another". Built fresh per request and never cached.
#[derive(Debug, Clone, Serialize)]
pub struct SwapRoute {
    pub from_token: TokenDescriptor,
    pub to_token: TokenDescriptor,
    /// Input amount as submitted
    pub amount: String,
    /// Expected output as a fixed 6-decimal string
    pub expected_output: String,
    /// Venue name, or a composite label like `"Liquidswap → Thala"`
    pub protocol: String,
    /// Price impact in percent; summed across hops for multi-hop routes
    pub price_impact: f64,
    pub gas_estimate: u64,
    pub hops: Vec<RouteHop>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<AlternativeRoute>,
    /// Aggregator-built transaction, carried through for execution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap_payload: Option<serde_json::Value>,
    pub is_multi_hop: bool,
    /// True when the output is a price-ratio estimate, not a real quote
    pub synthetic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl SwapRoute {
    /// Human-readable path, e.g. `"APT -> Liquidswap -> USDC"`
    pub fn route_label(&self) -> String {
        if self.hops.is_empty() {
            return format!(
                "{} -> {} -> {}",
                self.from_token.symbol, self.protocol, self.to_token.symbol
            );
        }
        let mut label = self.from_token.symbol.to_string();
        for hop in &self.hops {
            label.push_str(&format!(" -> {} -> {}", hop.venue, hop.token_out));
        }
        label
    }
}

/// The three external collaborators the resolver orchestrates.
/// Constructed once at startup and threaded through by handle; no hidden
/// global instances.
#[derive(Clone)]
pub struct RoutingServices {
    pub prices: Arc<dyn PriceSource>,
    pub dex_quotes: Arc<dyn QuoteSource>,
    pub aggregator: Arc<dyn AggregatorSource>,
}

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

pub struct RouteResolver {
    network: Network,
    services: RoutingServices,
}

impl RouteResolver {
    pub fn new(network: Network, services: RoutingServices) -> Self {
        Self { network, services }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Resolve the best route for converting `amount` of `token_in` into
    /// `token_out`. Always returns a route; quality degrades through the
    /// fallback chain instead of failing.
    pub async fn get_best_swap_route(
        &self,
        token_in: Token,
        token_out: Token,
        amount: f64,
    ) -> Result<SwapRoute, RouteError> {
        let from = descriptor(token_in, self.network)?;
        let to = descriptor(token_out, self.network)?;

        if let Some(route) = self.direct_aggregator_route(from, to, amount).await {
            return Ok(route);
        }

        if token_in != Token::Apt && token_out != Token::Apt {
            if let Some(route) = self.two_hop_route(from, to, Token::Apt, amount).await {
                return Ok(route);
            }
        }

        for bridge in Token::stable_bridges() {
            if *bridge == token_in || *bridge == token_out {
                continue;
            }
            if let Some(route) = self.two_hop_route(from, to, *bridge, amount).await {
                return Ok(route);
            }
        }

        Ok(self.synthetic_route(from, to, amount).await)
    }

    /// Stage 1: take the aggregator's top-ranked quote as-is
    async fn direct_aggregator_route(
        &self,
        from: TokenDescriptor,
        to: TokenDescriptor,
        amount: f64,
    ) -> Option<SwapRoute> {
        let quotes = self
            .services
            .aggregator
            .quotes(from.address, to.address, amount)
            .await;

        let mut usable = quotes.into_iter().filter(|q| q.is_usable());
        let best = usable.next()?;

        let protocol = best
            .dex
            .clone()
            .unwrap_or_else(|| self.services.aggregator.display_name().to_string());

        let alternatives = usable
            .take(3)
            .map(|q| AlternativeRoute {
                protocol: q
                    .dex
                    .clone()
                    .unwrap_or_else(|| self.services.aggregator.display_name().to_string()),
                expected_output: format_amount(q.output()),
                price_impact: q.price_impact,
            })
            .collect();

        info!(
            "direct route {} -> {}: {} out via {}",
            from.symbol, to.symbol, best.output_amount, protocol
        );

        Some(SwapRoute {
            from_token: from,
            to_token: to,
            amount: format_amount(amount),
            expected_output: format_amount(best.output()),
            protocol: protocol.clone(),
            price_impact: best.price_impact,
            gas_estimate: DEFAULT_SWAP_GAS_UNITS,
            hops: vec![RouteHop {
                venue: protocol,
                token_in: from.symbol,
                token_out: to.symbol,
                fee: 0.0,
            }],
            alternatives,
            swap_payload: best.tx_data,
            is_multi_hop: false,
            synthetic: false,
            warning: None,
        })
    }

    /// Stages 2 and 3: two independent best-of-venue legs through a
    /// bridge token, composed when both legs quote
    async fn two_hop_route(
        &self,
        from: TokenDescriptor,
        to: TokenDescriptor,
        bridge: Token,
        amount: f64,
    ) -> Option<SwapRoute> {
        // An unconfigured bridge on this network is skipped, not fatal
        if descriptor(bridge, self.network).is_err() {
            return None;
        }

        let leg_in = best_quote(
            self.services
                .dex_quotes
                .all_quotes(from.symbol, bridge, amount, self.network)
                .await,
        )?;
        let bridged_amount = leg_in.output();
        if bridged_amount <= 0.0 {
            return None;
        }

        let leg_out = best_quote(
            self.services
                .dex_quotes
                .all_quotes(bridge, to.symbol, bridged_amount, self.network)
                .await,
        )?;
        let output = leg_out.output();
        if output <= 0.0 {
            return None;
        }

        let protocol = format!("{} → {}", leg_in.dex_name, leg_out.dex_name);
        info!(
            "two-hop route {} -> {} via {}: {} out ({})",
            from.symbol, to.symbol, bridge, output, protocol
        );

        Some(SwapRoute {
            from_token: from,
            to_token: to,
            amount: format_amount(amount),
            expected_output: format_amount(output),
            protocol,
            price_impact: leg_in.price_impact + leg_out.price_impact,
            gas_estimate: hop_gas(&leg_in) + hop_gas(&leg_out),
            hops: vec![
                RouteHop {
                    venue: leg_in.dex_name.clone(),
                    token_in: from.symbol,
                    token_out: bridge,
                    fee: leg_in.fee,
                },
                RouteHop {
                    venue: leg_out.dex_name.clone(),
                    token_in: bridge,
                    token_out: to.symbol,
                    fee: leg_out.fee,
                },
            ],
            alternatives: Vec::new(),
            swap_payload: None,
            is_multi_hop: true,
            synthetic: false,
            warning: None,
        })
    }

    /// Stage 4: price-ratio estimate. Cannot fail; the oracle degrades to
    /// hard-coded constants internally.
    async fn synthetic_route(
        &self,
        from: TokenDescriptor,
        to: TokenDescriptor,
        amount: f64,
    ) -> SwapRoute {
        let price_in = self.services.prices.usd_price(from.symbol).await;
        let price_out = self.services.prices.usd_price(to.symbol).await;
        let expected = if price_out > 0.0 {
            amount * price_in / price_out
        } else {
            0.0
        };

        warn!(
            "no live route for {} -> {}; estimating from prices {}/{}",
            from.symbol, to.symbol, price_in, price_out
        );

        SwapRoute {
            from_token: from,
            to_token: to,
            amount: format_amount(amount),
            expected_output: format_amount(expected),
            protocol: SYNTHETIC_PROTOCOL.to_string(),
            price_impact: 0.0,
            gas_estimate: DEFAULT_SWAP_GAS_UNITS,
            hops: Vec::new(),
            alternatives: Vec::new(),
            swap_payload: None,
            is_multi_hop: false,
            synthetic: true,
            warning: Some(SYNTHETIC_WARNING.to_string()),
        }
    }
}

fn hop_gas(quote: &DexQuote) -> u64 {
    quote.gas_estimate.unwrap_or(DEFAULT_SWAP_GAS_UNITS)
}
