//! Swap route resolution
//!
//! The core of the service. Handles:
//! - Static token/network configuration tables
//! - USD pricing with a TTL cache and hard fallback constants
//! - Direct quotes from DEX venues and the Panora aggregator
//! - Best-route resolution with an ordered fallback chain
//! - Building wallet-submittable entry-function payloads

pub mod aggregator;
pub mod dex_quotes;
pub mod executor;
pub mod price_oracle;
pub mod resolver;
pub mod tokens;
