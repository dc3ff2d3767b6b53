//! Historical price lookups consumed by the profit engine.

use crate::domain::{ChainId, Decimal, Timestamp, TokenId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

pub mod defillama;
pub mod mock;

pub use defillama::DefiLlamaPriceSource;
pub use mock::MockPriceSource;

/// Source of historical USD prices.
///
/// Implementations own their retry/backoff policy; the engine never retries.
#[async_trait]
pub trait PriceSource: Send + Sync + fmt::Debug {
    /// Fetch the USD price of each token at a point in time.
    ///
    /// # Arguments
    /// * `tokens` - Token addresses to price
    /// * `at` - Unix timestamp (seconds)
    /// * `chain` - Chain the tokens live on
    ///
    /// # Returns
    /// A map keyed by token. Tokens without a known price are absent; a
    /// price may be zero for an illiquid token.
    async fn historical_prices(
        &self,
        tokens: &[TokenId],
        at: Timestamp,
        chain: ChainId,
    ) -> Result<HashMap<TokenId, Decimal>, PriceSourceError>;
}

/// Error type for price lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 404 unknown coin, 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Rate limit exceeded and retries exhausted
    RateLimited,
    /// The chain has no known mapping in this source
    UnsupportedChain(ChainId),
    /// Other error
    Other(String),
}

impl fmt::Display for PriceSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            PriceSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            PriceSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            PriceSourceError::RateLimited => write!(f, "Rate limited"),
            PriceSourceError::UnsupportedChain(chain) => {
                write!(f, "Unsupported chain: {}", chain)
            }
            PriceSourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for PriceSourceError {}
