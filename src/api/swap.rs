//! Swap quote and execution endpoints
//!
//! Thin validation layer over the route resolver and executor. Routing
//! degradation is invisible here; only malformed requests and
//! configuration gaps become HTTP errors.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::routing::executor::SwapExecution;
use crate::routing::resolver::{RouteError, SwapRoute};
use crate::routing::tokens::{Network, Token};
use crate::types::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub from_token: String,
    pub to_token: String,
    /// Decimal amount in human units, e.g. "10" or "0.5"
    pub amount: String,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub success: bool,
    pub network: Network,
    pub route_label: String,
    pub message: String,
    pub route: SwapRoute,
}

#[derive(Debug, Deserialize)]
pub struct SwapRequest {
    pub wallet_address: String,
    pub from_token: String,
    pub to_token: String,
    pub amount: String,
    #[serde(default = "default_slippage")]
    pub slippage_percent: f64,
    #[serde(default = "default_deadline")]
    pub deadline_secs: u64,
}

fn default_slippage() -> f64 {
    0.5
}

fn default_deadline() -> u64 {
    1200
}

fn parse_token(raw: &str) -> Result<Token, ApiError> {
    Token::from_str(raw).ok_or_else(|| ApiError::UnsupportedToken(raw.to_string()))
}

fn parse_amount(raw: &str) -> Result<f64, ApiError> {
    let amount: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid amount: {}", raw)))?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ApiError::BadRequest("Amount must be positive".into()));
    }
    Ok(amount)
}

fn parse_pair(from: &str, to: &str) -> Result<(Token, Token), ApiError> {
    let from = parse_token(from)?;
    let to = parse_token(to)?;
    if from == to {
        return Err(ApiError::BadRequest("Cannot swap same token".into()));
    }
    Ok((from, to))
}

/// POST /api/swap/quote - Resolve the best route without executing
pub async fn get_quote(
    State(state): State<AppState>,
    Json(req): Json<QuoteRequest>,
) -> ApiResult<Json<QuoteResponse>> {
    let (from, to) = parse_pair(&req.from_token, &req.to_token)?;
    let amount = parse_amount(&req.amount)?;

    let route = state
        .resolver
        .get_best_swap_route(from, to, amount)
        .await
        .map_err(|e| match e {
            // Friendly wording: the pair cannot be addressed on this
            // network, which reads as "no route" to the user
            RouteError::Configuration(_) => ApiError::NoRoute(e.to_string()),
        })?;

    let message = if route.synthetic {
        format!(
            "Estimated {} {} for {} {} from market prices. {}",
            route.expected_output,
            to,
            route.amount,
            from,
            route.warning.as_deref().unwrap_or_default()
        )
    } else {
        format!(
            "Best route: {} {} -> {} {} via {} ({:.2}% price impact)",
            route.amount, from, route.expected_output, to, route.protocol, route.price_impact
        )
    };

    Ok(Json(QuoteResponse {
        success: true,
        network: state.network,
        route_label: route.route_label(),
        message,
        route,
    }))
}

/// POST /api/swap - Build a wallet-submittable swap transaction
pub async fn execute_swap(
    State(state): State<AppState>,
    Json(req): Json<SwapRequest>,
) -> ApiResult<Json<SwapExecution>> {
    let (from, to) = parse_pair(&req.from_token, &req.to_token)?;
    let amount = parse_amount(&req.amount)?;

    if !(0.0..=50.0).contains(&req.slippage_percent) {
        return Err(ApiError::BadRequest(
            "slippage_percent must be between 0 and 50".into(),
        ));
    }

    let result = state
        .executor
        .execute_swap(
            &req.wallet_address,
            from,
            to,
            amount,
            req.slippage_percent,
            req.deadline_secs,
        )
        .await;

    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair_rejects_same_token() {
        assert!(parse_pair("APT", "USDC").is_ok());
        assert!(parse_pair("APT", "apt").is_err());
        assert!(parse_pair("APT", "DOGE").is_err());
    }

    #[test]
    fn test_parse_amount_rejects_junk() {
        assert_eq!(parse_amount("10").unwrap(), 10.0);
        assert_eq!(parse_amount(" 0.5 ").unwrap(), 0.5);
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("-3").is_err());
        assert!(parse_amount("NaN").is_err());
        assert!(parse_amount("ten").is_err());
    }
}
