//! Token and network configuration tables
//!
//! A token symbol only becomes routable once it has an on-chain coin type
//! and decimal precision for the active network. Lookups against an
//! unconfigured symbol/network combination are the one fatal error in the
//! routing layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Supported token symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Token {
    Apt,
    Usdc,
    Usdt,
    Weth,
    Cake,
    Thl,
}

impl Token {
    pub fn as_str(&self) -> &'static str {
        match self {
            Token::Apt => "APT",
            Token::Usdc => "USDC",
            Token::Usdt => "USDT",
            Token::Weth => "WETH",
            Token::Cake => "CAKE",
            Token::Thl => "THL",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "APT" | "APTOS" => Some(Token::Apt),
            "USDC" => Some(Token::Usdc),
            "USDT" => Some(Token::Usdt),
            "WETH" | "ETH" => Some(Token::Weth),
            "CAKE" => Some(Token::Cake),
            "THL" => Some(Token::Thl),
            _ => None,
        }
    }

    pub fn all() -> &'static [Token] {
        &[
            Token::Apt,
            Token::Usdc,
            Token::Usdt,
            Token::Weth,
            Token::Cake,
            Token::Thl,
        ]
    }

    /// Identifier the external price API uses for this token
    pub fn price_provider_id(&self) -> &'static str {
        match self {
            Token::Apt => "aptos",
            Token::Usdc => "usd-coin",
            Token::Usdt => "tether",
            Token::Weth => "weth",
            Token::Cake => "pancakeswap-token",
            Token::Thl => "thala",
        }
    }

    /// Hard-coded USD price used when the price API and cache both fail.
    /// Stables pin to 1.0; the rest are coarse order-of-magnitude anchors
    /// that keep synthetic estimates from collapsing to zero.
    pub fn fallback_usd_price(&self) -> f64 {
        match self {
            Token::Apt => 10.0,
            Token::Usdc | Token::Usdt => 1.0,
            Token::Weth => 3500.0,
            Token::Cake => 2.5,
            Token::Thl => 0.45,
        }
    }

    pub fn is_stable(&self) -> bool {
        matches!(self, Token::Usdc | Token::Usdt)
    }

    /// Stablecoins tried as bridge tokens, in preference order
    pub fn stable_bridges() -> &'static [Token] {
        &[Token::Usdc, Token::Usdt]
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network selector. A pure configuration value passed into every call
/// that needs a contract address, never mutable shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" | "main" => Some(Network::Mainnet),
            "testnet" | "test" => Some(Network::Testnet),
            _ => None,
        }
    }

    pub fn is_testnet(&self) -> bool {
        matches!(self, Network::Testnet)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-chain identity of a token on one network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenDescriptor {
    pub symbol: Token,
    /// Fully qualified Aptos coin type
    pub address: &'static str,
    pub decimals: u8,
}

/// Requested token has no address mapping on the requested network
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("token {symbol} has no address configured on {network}")]
pub struct ConfigurationError {
    pub symbol: Token,
    pub network: Network,
}

/// Resolve the descriptor for a symbol on a network.
///
/// Testnet only carries APT and the mock stablecoin faucet coins; every
/// other symbol is mainnet-only.
pub fn descriptor(symbol: Token, network: Network) -> Result<TokenDescriptor, ConfigurationError> {
    let entry: Option<(&'static str, u8)> = match (network, symbol) {
        (_, Token::Apt) => Some(("0x1::aptos_coin::AptosCoin", 8)),
        (Network::Mainnet, Token::Usdc) => Some((
            "0xf22bede237a07e121b56d91a491eb7bcdfd1f5907926a9e58338f964a01b17fa::asset::USDC",
            6,
        )),
        (Network::Mainnet, Token::Usdt) => Some((
            "0xf22bede237a07e121b56d91a491eb7bcdfd1f5907926a9e58338f964a01b17fa::asset::USDT",
            6,
        )),
        (Network::Mainnet, Token::Weth) => Some((
            "0xf22bede237a07e121b56d91a491eb7bcdfd1f5907926a9e58338f964a01b17fa::asset::WETH",
            6,
        )),
        (Network::Mainnet, Token::Cake) => Some((
            "0x159df6b7689437016108a019fd5bef736bac692b6d4a1f10c941f6fbb9a74ca6::oft::CakeOFT",
            8,
        )),
        (Network::Mainnet, Token::Thl) => Some((
            "0x7fd500c11216f0fe3095d0c4b8aa4d64a4e2e04f83758462f2b127255643615::thl_coin::THL",
            8,
        )),
        (Network::Testnet, Token::Usdc) => Some((
            "0x8c805723ebc0a7fc5b7d3e7b75d567918e806b3461cb9fa21941a9edc0220bf9::devnet_coins::DevnetUSDC",
            6,
        )),
        (Network::Testnet, Token::Usdt) => Some((
            "0x8c805723ebc0a7fc5b7d3e7b75d567918e806b3461cb9fa21941a9edc0220bf9::devnet_coins::DevnetUSDT",
            6,
        )),
        (Network::Testnet, _) => None,
    };

    entry
        .map(|(address, decimals)| TokenDescriptor {
            symbol,
            address,
            decimals,
        })
        .ok_or(ConfigurationError { symbol, network })
}

/// Pure address lookup against the static table
pub fn token_address(symbol: Token, network: Network) -> Result<&'static str, ConfigurationError> {
    descriptor(symbol, network).map(|d| d.address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_round_trip() {
        for token in Token::all() {
            assert_eq!(Token::from_str(token.as_str()), Some(*token));
        }
        assert_eq!(Token::from_str("aptos"), Some(Token::Apt));
        assert_eq!(Token::from_str("DOGE"), None);
    }

    #[test]
    fn test_every_token_configured_on_mainnet() {
        for token in Token::all() {
            let d = descriptor(*token, Network::Mainnet).unwrap();
            assert!(d.address.starts_with("0x"));
            assert!(d.decimals > 0);
        }
    }

    #[test]
    fn test_testnet_gaps_are_configuration_errors() {
        assert!(descriptor(Token::Apt, Network::Testnet).is_ok());
        assert!(descriptor(Token::Usdc, Network::Testnet).is_ok());

        let err = descriptor(Token::Weth, Network::Testnet).unwrap_err();
        assert_eq!(err.symbol, Token::Weth);
        assert_eq!(err.network, Network::Testnet);
    }

    #[test]
    fn test_stable_bridges_are_stables() {
        for bridge in Token::stable_bridges() {
            assert!(bridge.is_stable());
        }
    }

    #[test]
    fn test_mainnet_stables_share_bridge_package() {
        let usdc = token_address(Token::Usdc, Network::Mainnet).unwrap();
        let usdt = token_address(Token::Usdt, Network::Mainnet).unwrap();
        let package = usdc.split("::").next().unwrap();
        assert!(usdt.starts_with(package));
    }
}
