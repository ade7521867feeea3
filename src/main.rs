//! Aptos Swap Routing Backend
//!
//! HTTP API server that resolves best swap routes via the Panora
//! aggregator with multi-hop and price-estimate fallbacks, and builds
//! wallet-submittable transaction payloads.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aptos_swap_backend::api::{self, AppState};
use aptos_swap_backend::routing::aggregator::PanoraClient;
use aptos_swap_backend::routing::dex_quotes::DexQuoteClient;
use aptos_swap_backend::routing::executor::SwapExecutor;
use aptos_swap_backend::routing::price_oracle::PriceOracle;
use aptos_swap_backend::routing::resolver::{RouteResolver, RoutingServices};
use aptos_swap_backend::routing::tokens::Network;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let network = std::env::var("APTOS_NETWORK")
        .ok()
        .and_then(|v| Network::from_str(&v))
        .unwrap_or(Network::Mainnet);
    tracing::info!("Active network: {}", network);

    let panora_api_key = std::env::var("PANORA_API_KEY").ok();
    if panora_api_key.is_none() {
        tracing::warn!("PANORA_API_KEY not set - aggregator quotes may be rejected");
    }

    // One HTTP client with a request timeout, shared by every outbound call
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("failed to build HTTP client");

    let oracle = Arc::new(PriceOracle::new(http.clone()));
    let services = RoutingServices {
        prices: oracle.clone(),
        dex_quotes: Arc::new(DexQuoteClient::new(http.clone())),
        aggregator: Arc::new(PanoraClient::new(http, panora_api_key)),
    };
    let resolver = Arc::new(RouteResolver::new(network, services));
    let executor = Arc::new(SwapExecutor::new(resolver.clone()));
    tracing::info!("Route resolver ready");

    let state = AppState {
        network,
        resolver,
        executor,
        oracle,
    };

    // Build router
    let app = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api::router(state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start server
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  GET  /health            - Health check");
    tracing::info!("  POST /api/swap/quote    - Resolve best swap route");
    tracing::info!("  POST /api/swap          - Build swap transaction payload");
    tracing::info!("  GET  /api/tokens        - List supported tokens");
    tracing::info!("  GET  /api/price/:symbol - USD price via the oracle");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn health_check() -> &'static str {
    "ok"
}
