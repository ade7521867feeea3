//! Swap execution payload builder
//!
//! Re-resolves the route at execution time (a caller-supplied route could
//! carry stale pricing) and either passes the aggregator-built transaction
//! through untouched or assembles the router entry-function call for the
//! active network. Nothing here signs or submits; the wallet does that.

use std::sync::Arc;

use anyhow::{bail, Result};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::resolver::{RouteResolver, SwapRoute};
use super::tokens::{Network, Token};

/// Router contracts publishing `router::swap_exact_input`
const MAINNET_ROUTER: &str =
    "0x890812a6bbe27dd59188ade3bbdbe40a544e6e104319b7ebc6617d3eb947ac07";
const TESTNET_ROUTER: &str =
    "0x6b3720cd988adeaf721ed9d4730da4324d52364871a68eac62b46d21e4d2fa99";

/// Nominal minimum output used on testnet, where thin pools would make a
/// real slippage floor fail constantly
const TESTNET_MIN_OUTPUT: u64 = 1;

pub fn router_address(network: Network) -> &'static str {
    match network {
        Network::Mainnet => MAINNET_ROUTER,
        Network::Testnet => TESTNET_ROUTER,
    }
}

/// Outcome of a swap execution request. Failures are part of the result,
/// never an exception surface.
#[derive(Debug, Clone, Serialize)]
pub struct SwapExecution {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wallet-submittable transaction payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// The route the payload was built from, for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<SwapRoute>,
}

impl SwapExecution {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            tx_hash: None,
            error: Some(error.into()),
            payload: None,
            route: None,
        }
    }
}

pub struct SwapExecutor {
    resolver: Arc<RouteResolver>,
}

impl SwapExecutor {
    pub fn new(resolver: Arc<RouteResolver>) -> Self {
        Self { resolver }
    }

    /// Resolve a fresh route and build its transaction payload.
    ///
    /// `deadline_secs` is accepted for wallet-side use; the known router's
    /// entry function takes no deadline argument.
    pub async fn execute_swap(
        &self,
        wallet_address: &str,
        token_in: Token,
        token_out: Token,
        amount: f64,
        slippage_percent: f64,
        _deadline_secs: u64,
    ) -> SwapExecution {
        if wallet_address.trim().is_empty() {
            return SwapExecution::failure("wallet address required");
        }

        let route = match self
            .resolver
            .get_best_swap_route(token_in, token_out, amount)
            .await
        {
            Ok(route) => route,
            Err(e) => return SwapExecution::failure(e.to_string()),
        };

        // Aggregator-built transactions go through untouched
        if let Some(payload) = route.swap_payload.clone() {
            info!(
                "passing through aggregator payload for {} -> {}",
                token_in, token_out
            );
            return SwapExecution {
                success: true,
                tx_hash: None,
                error: None,
                payload: Some(payload),
                route: Some(route),
            };
        }

        match build_router_payload(&route, self.resolver.network(), amount, slippage_percent) {
            Ok(payload) => SwapExecution {
                success: true,
                tx_hash: None,
                error: None,
                payload: Some(payload),
                route: Some(route),
            },
            Err(e) => {
                warn!(
                    "payload construction failed for {} -> {}: {}",
                    token_in, token_out, e
                );
                SwapExecution::failure(e.to_string())
            }
        }
    }
}

/// Entry-function call for the known router contract. The argument shape
/// must match the chain's expected format exactly.
fn build_router_payload(
    route: &SwapRoute,
    network: Network,
    amount: f64,
    slippage_percent: f64,
) -> Result<Value> {
    let from = route.from_token;
    let to = route.to_token;

    let amount_in_units = to_smallest_unit(amount, from.decimals)?;

    let min_output = if network.is_testnet() {
        TESTNET_MIN_OUTPUT
    } else {
        let expected: f64 = route.expected_output.parse()?;
        let floor = expected * (1.0 - slippage_percent / 100.0);
        to_smallest_unit(floor, to.decimals)?
    };

    Ok(json!({
        "type": "entry_function_payload",
        "function": format!("{}::router::swap_exact_input", router_address(network)),
        "type_arguments": [from.address, to.address],
        "arguments": [amount_in_units.to_string(), min_output.to_string()],
    }))
}

fn to_smallest_unit(amount: f64, decimals: u8) -> Result<u64> {
    if !amount.is_finite() || amount < 0.0 {
        bail!("invalid amount {}", amount);
    }
    let scaled = amount * 10f64.powi(decimals as i32);
    if scaled > u64::MAX as f64 {
        bail!("amount {} overflows the smallest-unit range", amount);
    }
    Ok(scaled.round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::aggregator::{AggregatorQuote, AggregatorSource};
    use crate::routing::dex_quotes::{DexQuote, QuoteSource};
    use crate::routing::price_oracle::PriceSource;
    use crate::routing::resolver::RoutingServices;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct StubAggregator {
        quotes: Vec<AggregatorQuote>,
    }

    #[async_trait]
    impl AggregatorSource for StubAggregator {
        async fn quotes(&self, _from: &str, _to: &str, _amount: f64) -> Vec<AggregatorQuote> {
            self.quotes.clone()
        }
    }

    struct NoDex;

    #[async_trait]
    impl QuoteSource for NoDex {
        async fn all_quotes(
            &self,
            _token_in: Token,
            _token_out: Token,
            _amount: f64,
            _network: Network,
        ) -> Vec<DexQuote> {
            Vec::new()
        }
    }

    struct StubPrices {
        prices: HashMap<Token, f64>,
    }

    #[async_trait]
    impl PriceSource for StubPrices {
        async fn usd_price(&self, token: Token) -> f64 {
            self.prices
                .get(&token)
                .copied()
                .unwrap_or_else(|| token.fallback_usd_price())
        }
    }

    fn executor(network: Network, aggregator_quotes: Vec<AggregatorQuote>) -> SwapExecutor {
        let mut prices = HashMap::new();
        prices.insert(Token::Apt, 5.0);
        prices.insert(Token::Usdc, 1.0);

        let resolver = Arc::new(RouteResolver::new(
            network,
            RoutingServices {
                prices: Arc::new(StubPrices { prices }),
                dex_quotes: Arc::new(NoDex),
                aggregator: Arc::new(StubAggregator {
                    quotes: aggregator_quotes,
                }),
            },
        ));
        SwapExecutor::new(resolver)
    }

    fn payload_quote() -> AggregatorQuote {
        AggregatorQuote {
            output_amount: "49.5".to_string(),
            price_impact: 0.2,
            dex: None,
            path: vec![],
            tx_data: Some(json!({
                "type": "entry_function_payload",
                "function": "0xaggregator::router::swap",
                "type_arguments": [],
                "arguments": ["123"]
            })),
        }
    }

    #[tokio::test]
    async fn test_aggregator_payload_passed_through_unmodified() {
        let executor = executor(Network::Mainnet, vec![payload_quote()]);

        let result = executor
            .execute_swap("0xwallet", Token::Apt, Token::Usdc, 10.0, 0.5, 1200)
            .await;

        assert!(result.success);
        assert_eq!(result.payload, payload_quote().tx_data);
        // No router entry-function was substituted for the aggregator's
        assert_eq!(
            result.payload.as_ref().unwrap()["function"],
            "0xaggregator::router::swap"
        );
    }

    #[tokio::test]
    async fn test_mainnet_router_payload_shape() {
        // No aggregator quotes: the resolver lands on a synthetic route
        // (2 APT * $5 / $1 = 10 USDC expected) and the executor builds
        // the router call itself.
        let executor = executor(Network::Mainnet, vec![]);

        let result = executor
            .execute_swap("0xwallet", Token::Apt, Token::Usdc, 2.0, 1.0, 1200)
            .await;

        assert!(result.success);
        let payload = result.payload.unwrap();
        assert_eq!(payload["type"], "entry_function_payload");
        assert_eq!(
            payload["function"],
            format!("{}::router::swap_exact_input", MAINNET_ROUTER)
        );
        assert_eq!(payload["type_arguments"][0], "0x1::aptos_coin::AptosCoin");
        // 2 APT at 8 decimals
        assert_eq!(payload["arguments"][0], "200000000");
        // 10 USDC minus 1% slippage, at 6 decimals
        assert_eq!(payload["arguments"][1], "9900000");
    }

    #[tokio::test]
    async fn test_testnet_uses_nominal_minimum_output() {
        let executor = executor(Network::Testnet, vec![]);

        let result = executor
            .execute_swap("0xwallet", Token::Apt, Token::Usdc, 1.0, 0.5, 1200)
            .await;

        assert!(result.success);
        let payload = result.payload.unwrap();
        assert_eq!(
            payload["function"],
            format!("{}::router::swap_exact_input", TESTNET_ROUTER)
        );
        assert_eq!(payload["arguments"][1], "1");
    }

    #[tokio::test]
    async fn test_missing_wallet_is_a_result_not_a_panic() {
        let executor = executor(Network::Mainnet, vec![]);

        let result = executor
            .execute_swap("  ", Token::Apt, Token::Usdc, 1.0, 0.5, 1200)
            .await;

        assert!(!result.success);
        assert!(result.error.is_some());
        assert!(result.payload.is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_token_reported_as_error_result() {
        let executor = executor(Network::Testnet, vec![]);

        let result = executor
            .execute_swap("0xwallet", Token::Weth, Token::Usdc, 1.0, 0.5, 1200)
            .await;

        assert!(!result.success);
        assert!(result
            .error
            .as_deref()
            .is_some_and(|e| e.contains("WETH")));
    }

    #[test]
    fn test_to_smallest_unit() {
        assert_eq!(to_smallest_unit(1.0, 8).unwrap(), 100_000_000);
        assert_eq!(to_smallest_unit(0.000001, 6).unwrap(), 1);
        assert!(to_smallest_unit(-1.0, 6).is_err());
        assert!(to_smallest_unit(f64::NAN, 6).is_err());
    }
}
