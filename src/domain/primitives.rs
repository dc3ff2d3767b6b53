//! Domain primitives: Timestamp, ChainId, TokenId, Token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::amount::{self, NumericError};
use alloy_primitives::U256;

/// Time in seconds since Unix epoch (the resolution of on-chain block times).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Create a Timestamp from Unix seconds.
    pub fn new(secs: i64) -> Self {
        Timestamp(secs)
    }

    /// Get the underlying seconds value.
    pub fn as_secs(&self) -> i64 {
        self.0
    }

    /// RFC 3339 rendering, or `None` when the value is outside chrono's range.
    pub fn to_rfc3339(&self) -> Option<String> {
        DateTime::<Utc>::from_timestamp(self.0, 0).map(|dt| dt.to_rfc3339())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// EVM chain identifier (e.g. 1 for Ethereum mainnet, 10 for Optimism).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    pub fn new(id: u64) -> Self {
        ChainId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token contract address, normalized to lowercase so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenId(String);

impl TokenId {
    /// Create a TokenId from an address string.
    pub fn new(address: impl AsRef<str>) -> Self {
        TokenId(address.as_ref().trim().to_lowercase())
    }

    /// Get the address as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A token together with its on-chain decimal precision.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub id: TokenId,
    pub decimals: u8,
}

impl Token {
    pub fn new(id: TokenId, decimals: u8) -> Self {
        Self { id, decimals }
    }

    /// The decimal factor `10^decimals`.
    pub fn scale(&self) -> Result<U256, NumericError> {
        amount::scale(self.decimals)
    }
}

/// Everything that stays fixed for one replay: the chain and the token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionContext {
    pub chain: ChainId,
    /// The token being sold on every swap.
    pub from: Token,
    /// The token being bought on every swap.
    pub to: Token,
}

impl PositionContext {
    pub fn new(chain: ChainId, from: Token, to: Token) -> Self {
        Self { chain, from, to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_id_is_lowercased() {
        let id = TokenId::new(" 0xA0b86991C6218b36c1d19D4a2e9Eb0cE3606eB48 ");
        assert_eq!(id.as_str(), "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
        assert_eq!(id, TokenId::new("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"));
    }

    #[test]
    fn test_timestamp_ordering_and_display() {
        let t1 = Timestamp::new(1000);
        let t2 = Timestamp::new(2000);
        assert!(t1 < t2);
        assert_eq!(t2.to_string(), "2000");
    }

    #[test]
    fn test_timestamp_rfc3339() {
        let ts = Timestamp::new(1_700_000_000);
        assert_eq!(ts.to_rfc3339().unwrap(), "2023-11-14T22:13:20+00:00");
    }

    #[test]
    fn test_token_scale() {
        let usdc = Token::new(TokenId::new("0xusdc"), 6);
        assert_eq!(usdc.scale().unwrap(), U256::from(1_000_000u64));
    }

    #[test]
    fn test_timestamp_serializes_as_number() {
        let json = serde_json::to_string(&Timestamp::new(42)).unwrap();
        assert_eq!(json, "42");
    }
}
