use alloy_primitives::U256;
use futures::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument};

use crate::datasource::PriceSource;
use crate::domain::{PositionContext, PositionEvent, PositionHistory, Timestamp, TokenId};

use super::{locked_rate, EngineError, EventProcessor, ProfitSeries, ProfitSeriesBuilder};

/// Drives event replays, looking up historical prices as events require them.
///
/// Each replay owns its own ledger, so one engine can serve many positions
/// concurrently.
#[derive(Debug, Clone)]
pub struct ProfitEngine {
    prices: Arc<dyn PriceSource>,
}

impl ProfitEngine {
    pub fn new(prices: Arc<dyn PriceSource>) -> Self {
        Self { prices }
    }

    /// Replay one position's events into its profit series.
    pub async fn replay(
        &self,
        context: &PositionContext,
        events: &[PositionEvent],
    ) -> Result<ProfitSeries, EngineError> {
        self.run(context, events, None).await
    }

    /// Like [`replay`](Self::replay), but stops issuing price lookups once
    /// `cancel` fires and returns [`EngineError::Cancelled`].
    pub async fn replay_cancellable(
        &self,
        context: &PositionContext,
        events: &[PositionEvent],
        cancel: &CancellationToken,
    ) -> Result<ProfitSeries, EngineError> {
        self.run(context, events, Some(cancel)).await
    }

    /// Replay independent positions concurrently. Results keep input order.
    pub async fn replay_many(
        &self,
        positions: &[PositionHistory],
    ) -> Vec<Result<ProfitSeries, EngineError>> {
        join_all(
            positions
                .iter()
                .map(|position| self.replay(&position.context, &position.events)),
        )
        .await
    }

    async fn run(
        &self,
        context: &PositionContext,
        events: &[PositionEvent],
        cancel: Option<&CancellationToken>,
    ) -> Result<ProfitSeries, EngineError> {
        let span = info_span!(
            "replay",
            chain = %context.chain,
            from = %context.from.id,
            to = %context.to.id,
            events = events.len()
        );

        self.replay_events(context, events, cancel)
            .instrument(span)
            .await
    }

    async fn replay_events(
        &self,
        context: &PositionContext,
        events: &[PositionEvent],
        cancel: Option<&CancellationToken>,
    ) -> Result<ProfitSeries, EngineError> {
        let mut processor = EventProcessor::new(context.clone())?;

        for event in events {
            // Reject before spending a lookup on an event we would refuse anyway.
            processor.check_order(event.timestamp())?;

            let rate = if processor.requires_price(event)? {
                Some(self.resolve_locked_rate(context, event.timestamp(), cancel).await?)
            } else {
                None
            };
            processor.apply(event, rate)?;
        }

        let mut builder = ProfitSeriesBuilder::new(context.to.decimals);
        for sample in processor.finish() {
            builder.push(sample);
        }
        let series = builder.build()?;

        debug!(
            points = series.len(),
            has_swap_history = series.has_swap_history(),
            "replay finished"
        );
        Ok(series)
    }

    async fn resolve_locked_rate(
        &self,
        context: &PositionContext,
        timestamp: Timestamp,
        cancel: Option<&CancellationToken>,
    ) -> Result<U256, EngineError> {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(EngineError::Cancelled);
        }

        let tokens = [context.from.id.clone(), context.to.id.clone()];
        let lookup = self
            .prices
            .historical_prices(&tokens, timestamp, context.chain);

        let result = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(EngineError::Cancelled),
                    result = lookup => result,
                }
            }
            None => lookup.await,
        };

        // the pair is fetched in one call; a failed call leaves the deposit unpriced
        let prices = result.map_err(|e| EngineError::PriceUnavailable {
            token: context.from.id.clone(),
            timestamp,
            reason: e.to_string(),
        })?;

        let price_of = |id: &TokenId| {
            prices
                .get(id)
                .copied()
                .ok_or_else(|| EngineError::PriceUnavailable {
                    token: id.clone(),
                    timestamp,
                    reason: "missing from price response".to_string(),
                })
        };
        let price_from = price_of(&context.from.id)?;
        let price_to = price_of(&context.to.id)?;

        if price_to.is_zero() {
            return Err(EngineError::PriceUnavailable {
                token: context.to.id.clone(),
                timestamp,
                reason: "zero price".to_string(),
            });
        }

        Ok(locked_rate(price_from, price_to, context.to.decimals)?)
    }
}
