//! Token listing and price endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::api::AppState;
use crate::routing::price_oracle::PriceSource;
use crate::routing::tokens::{descriptor, Network, Token, TokenDescriptor};
use crate::types::{ApiError, ApiResult};

#[derive(Debug, Serialize)]
pub struct TokenListResponse {
    pub network: Network,
    pub tokens: Vec<TokenDescriptor>,
}

/// GET /api/tokens - Tokens routable on the active network
pub async fn list_tokens(State(state): State<AppState>) -> Json<TokenListResponse> {
    let tokens = Token::all()
        .iter()
        .filter_map(|token| descriptor(*token, state.network).ok())
        .collect();

    Json(TokenListResponse {
        network: state.network,
        tokens,
    })
}

#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub symbol: Token,
    pub usd: f64,
}

/// GET /api/price/:symbol - Best-effort USD price via the oracle
pub async fn get_price(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<Json<PriceResponse>> {
    let token = Token::from_str(&symbol).ok_or_else(|| ApiError::UnsupportedToken(symbol))?;

    let usd = state.oracle.usd_price(token).await;

    Ok(Json(PriceResponse { symbol: token, usd }))
}
