use alloy_primitives::U256;
use tracing::{debug, warn};

use crate::domain::amount::{self, NumericError, PRICE_DECIMALS};
use crate::domain::event::funds;
use crate::domain::{Decimal, PositionContext, PositionEvent, Timestamp};

use super::{EngineError, LotLedger, ProfitSample, SampleKind};

/// From->to rate implied by two USD prices, in to-token units per whole
/// from-token: `price_from * 10^to_decimals / price_to`.
pub fn locked_rate(
    price_from: Decimal,
    price_to: Decimal,
    to_decimals: u8,
) -> Result<U256, NumericError> {
    let from_fixed = amount::to_fixed(price_from, PRICE_DECIMALS)?;
    let to_fixed = amount::to_fixed(price_to, PRICE_DECIMALS)?;
    amount::mul_div(from_fixed, amount::scale(to_decimals)?, to_fixed)
}

/// Replays position events against a lot ledger and records profit samples.
///
/// Purely synchronous: price-dependent events receive their locked rate from
/// the caller, which is responsible for looking prices up in event order.
#[derive(Debug)]
pub struct EventProcessor {
    context: PositionContext,
    from_scale: U256,
    to_scale: U256,
    ledger: LotLedger,
    swapped_if_lump_sum: U256,
    swapped_if_dca: U256,
    last_timestamp: Option<Timestamp>,
    samples: Vec<ProfitSample>,
}

impl EventProcessor {
    pub fn new(context: PositionContext) -> Result<Self, EngineError> {
        let from_scale = context.from.scale()?;
        let to_scale = context.to.scale()?;
        Ok(Self {
            context,
            from_scale,
            to_scale,
            ledger: LotLedger::new(),
            swapped_if_lump_sum: U256::ZERO,
            swapped_if_dca: U256::ZERO,
            last_timestamp: None,
            samples: Vec::new(),
        })
    }

    pub fn context(&self) -> &PositionContext {
        &self.context
    }

    pub fn ledger(&self) -> &LotLedger {
        &self.ledger
    }

    pub fn samples(&self) -> &[ProfitSample] {
        &self.samples
    }

    pub fn swapped_if_lump_sum(&self) -> U256 {
        self.swapped_if_lump_sum
    }

    pub fn swapped_if_dca(&self) -> U256 {
        self.swapped_if_dca
    }

    /// Whether `event` needs historical prices before it can be applied.
    pub fn requires_price(&self, event: &PositionEvent) -> Result<bool, EngineError> {
        match event {
            PositionEvent::Created { .. } => Ok(true),
            PositionEvent::Increased {
                old_rate,
                old_remaining_swaps,
                new_rate,
                new_remaining_swaps,
                ..
            } => Ok(funds(*new_rate, *new_remaining_swaps)?
                > funds(*old_rate, *old_remaining_swaps)?),
            PositionEvent::Reduced { .. }
            | PositionEvent::Swapped { .. }
            | PositionEvent::Terminated { .. } => Ok(false),
        }
    }

    /// Fail if `timestamp` would move the replay backwards.
    pub fn check_order(&self, timestamp: Timestamp) -> Result<(), EngineError> {
        match self.last_timestamp {
            Some(previous) if timestamp < previous => Err(EngineError::OutOfOrderEvents {
                previous,
                found: timestamp,
            }),
            _ => Ok(()),
        }
    }

    /// Apply one event. `locked_rate` must be present when
    /// [`requires_price`](Self::requires_price) says so.
    pub fn apply(
        &mut self,
        event: &PositionEvent,
        locked_rate: Option<U256>,
    ) -> Result<(), EngineError> {
        let timestamp = event.timestamp();
        self.check_order(timestamp)?;
        debug!(kind = %event.kind(), %timestamp, lots = self.ledger.len(), "applying event");

        match event {
            PositionEvent::Created {
                rate,
                remaining_swaps,
                ..
            } => {
                let locked_rate = self.require_rate(timestamp, locked_rate)?;
                self.apply_created(timestamp, *rate, *remaining_swaps, locked_rate)?;
            }
            PositionEvent::Increased {
                old_rate,
                old_remaining_swaps,
                new_rate,
                new_remaining_swaps,
                ..
            } => {
                let old_funds = funds(*old_rate, *old_remaining_swaps)?;
                let new_funds = funds(*new_rate, *new_remaining_swaps)?;
                if new_funds > old_funds {
                    let locked_rate = self.require_rate(timestamp, locked_rate)?;
                    self.ledger.append(new_funds - old_funds, locked_rate);
                }
            }
            PositionEvent::Reduced {
                old_rate,
                old_remaining_swaps,
                new_rate,
                new_remaining_swaps,
                ..
            } => {
                let old_funds = funds(*old_rate, *old_remaining_swaps)?;
                let new_funds = funds(*new_rate, *new_remaining_swaps)?;
                if new_funds < old_funds {
                    self.apply_reduction(timestamp, old_funds - new_funds);
                }
            }
            PositionEvent::Swapped { rate, swapped, .. } => {
                self.apply_swapped(timestamp, *rate, *swapped)?;
            }
            PositionEvent::Terminated { .. } => {
                self.ledger.clear();
            }
        }

        self.last_timestamp = Some(timestamp);
        Ok(())
    }

    fn require_rate(
        &self,
        timestamp: Timestamp,
        locked_rate: Option<U256>,
    ) -> Result<U256, EngineError> {
        locked_rate.ok_or_else(|| EngineError::PriceUnavailable {
            token: self.context.from.id.clone(),
            timestamp,
            reason: format!(
                "no locked rate resolved for {} -> {}",
                self.context.from.id, self.context.to.id
            ),
        })
    }

    fn apply_created(
        &mut self,
        timestamp: Timestamp,
        rate: U256,
        remaining_swaps: u32,
        locked_rate: U256,
    ) -> Result<(), EngineError> {
        let deposit = funds(rate, remaining_swaps)?;
        self.ledger.append(deposit, locked_rate);

        self.samples.push(ProfitSample {
            timestamp,
            kind: SampleKind::Origin,
            swapped_if_lump_sum: U256::ZERO,
            swapped_if_dca: U256::ZERO,
            ratio: U256::ZERO,
        });
        Ok(())
    }

    fn apply_reduction(&mut self, timestamp: Timestamp, amount: U256) {
        let removed = self.ledger.reduce_from_newest(amount);
        if removed < amount {
            warn!(
                %timestamp,
                requested = %amount,
                removed = %removed,
                "reduction exceeds open capital; excess dropped"
            );
        }
    }

    fn apply_swapped(
        &mut self,
        timestamp: Timestamp,
        rate: U256,
        swapped: U256,
    ) -> Result<(), EngineError> {
        if self.ledger.total_remaining()?.is_zero() {
            warn!(%timestamp, "swap with no open capital; lump-sum side unchanged");
        } else {
            let consumption = self.ledger.consume_pro_rata(rate, self.from_scale)?;
            self.swapped_if_lump_sum =
                amount::checked_add(self.swapped_if_lump_sum, consumption.lump_sum)?;
        }
        self.swapped_if_dca = amount::checked_add(self.swapped_if_dca, swapped)?;

        let ratio = if self.swapped_if_lump_sum.is_zero() {
            U256::ZERO
        } else {
            amount::mul_div(self.swapped_if_dca, self.to_scale, self.swapped_if_lump_sum)?
        };

        self.samples.push(ProfitSample {
            timestamp,
            kind: SampleKind::Swap,
            swapped_if_lump_sum: self.swapped_if_lump_sum,
            swapped_if_dca: self.swapped_if_dca,
            ratio,
        });
        Ok(())
    }

    /// Consume the processor, yielding the samples in emission order.
    pub fn finish(self) -> Vec<ProfitSample> {
        self.samples
    }
}
