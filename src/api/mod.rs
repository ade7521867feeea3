//! API endpoints for route resolution and swap execution

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub mod swap;
pub mod tokens;

use crate::routing::executor::SwapExecutor;
use crate::routing::price_oracle::PriceOracle;
use crate::routing::resolver::RouteResolver;
use crate::routing::tokens::Network;

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub network: Network,
    pub resolver: Arc<RouteResolver>,
    pub executor: Arc<SwapExecutor>,
    pub oracle: Arc<PriceOracle>,
}

/// Create the API router with all endpoints
pub fn router(state: AppState) -> Router {
    Router::new()
        // Swap operations
        .route("/swap/quote", post(swap::get_quote))
        .route("/swap", post(swap::execute_swap))
        // Token configuration and pricing
        .route("/tokens", get(tokens::list_tokens))
        .route("/price/:symbol", get(tokens::get_price))
        .with_state(state)
}
