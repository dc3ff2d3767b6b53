//! In-memory price source for tests and offline replays.

use super::{PriceSource, PriceSourceError};
use crate::domain::{ChainId, Decimal, Timestamp, TokenId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Price source serving predefined prices.
///
/// A price registered for a specific timestamp wins over the token's
/// time-independent price.
#[derive(Debug, Default)]
pub struct MockPriceSource {
    prices: HashMap<TokenId, Decimal>,
    prices_at: HashMap<(TokenId, Timestamp), Decimal>,
    failures: HashSet<Timestamp>,
    latency: Option<Duration>,
    calls: AtomicUsize,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Price returned for `token` at any timestamp.
    pub fn with_price(mut self, token: TokenId, price: Decimal) -> Self {
        self.prices.insert(token, price);
        self
    }

    /// Price returned for `token` at exactly `at`.
    pub fn with_price_at(mut self, token: TokenId, at: Timestamp, price: Decimal) -> Self {
        self.prices_at.insert((token, at), price);
        self
    }

    /// Make every lookup at `at` fail with a network error.
    pub fn with_failure_at(mut self, at: Timestamp) -> Self {
        self.failures.insert(at);
        self
    }

    /// Delay every lookup, to exercise cancellation.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of lookups issued so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    async fn historical_prices(
        &self,
        tokens: &[TokenId],
        at: Timestamp,
        _chain: ChainId,
    ) -> Result<HashMap<TokenId, Decimal>, PriceSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.failures.contains(&at) {
            return Err(PriceSourceError::NetworkError(format!(
                "simulated failure at {}",
                at
            )));
        }

        Ok(tokens
            .iter()
            .filter_map(|token| {
                self.prices_at
                    .get(&(token.clone(), at))
                    .or_else(|| self.prices.get(token))
                    .map(|price| (token.clone(), *price))
            })
            .collect())
    }
}
