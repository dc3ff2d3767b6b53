//! Position lifecycle events, as replayed by the profit engine.

use alloy_primitives::U256;

use super::amount::{self, NumericError};
use super::{PositionContext, Timestamp};

/// One historical action on a DCA position.
///
/// Rates are in the from-token's smallest unit per swap. `swapped` on a
/// [`PositionEvent::Swapped`] is the realized output, in the to-token's
/// smallest unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionEvent {
    Created {
        timestamp: Timestamp,
        rate: U256,
        remaining_swaps: u32,
    },
    Increased {
        timestamp: Timestamp,
        old_rate: U256,
        old_remaining_swaps: u32,
        new_rate: U256,
        new_remaining_swaps: u32,
    },
    Reduced {
        timestamp: Timestamp,
        old_rate: U256,
        old_remaining_swaps: u32,
        new_rate: U256,
        new_remaining_swaps: u32,
    },
    Swapped {
        timestamp: Timestamp,
        rate: U256,
        swapped: U256,
    },
    /// The owner closed the position and withdrew whatever was left unswapped.
    Terminated { timestamp: Timestamp },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Created,
    Increased,
    Reduced,
    Swapped,
    Terminated,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventKind::Created => "created",
            EventKind::Increased => "increased",
            EventKind::Reduced => "reduced",
            EventKind::Swapped => "swapped",
            EventKind::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Funds committed by a rate/duration pair: `rate * swaps`.
pub fn funds(rate: U256, swaps: u32) -> Result<U256, NumericError> {
    amount::checked_mul(rate, U256::from(swaps))
}

impl PositionEvent {
    /// Classify a raw rate/duration modification.
    ///
    /// Funds going up is an increase; anything else (including no change) is a
    /// reduction, which leaves the ledger untouched when the funds are equal.
    pub fn modified(
        timestamp: Timestamp,
        old_rate: U256,
        old_remaining_swaps: u32,
        new_rate: U256,
        new_remaining_swaps: u32,
    ) -> Result<Self, NumericError> {
        let old_funds = funds(old_rate, old_remaining_swaps)?;
        let new_funds = funds(new_rate, new_remaining_swaps)?;

        Ok(if new_funds > old_funds {
            PositionEvent::Increased {
                timestamp,
                old_rate,
                old_remaining_swaps,
                new_rate,
                new_remaining_swaps,
            }
        } else {
            PositionEvent::Reduced {
                timestamp,
                old_rate,
                old_remaining_swaps,
                new_rate,
                new_remaining_swaps,
            }
        })
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            PositionEvent::Created { timestamp, .. }
            | PositionEvent::Increased { timestamp, .. }
            | PositionEvent::Reduced { timestamp, .. }
            | PositionEvent::Swapped { timestamp, .. }
            | PositionEvent::Terminated { timestamp } => *timestamp,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            PositionEvent::Created { .. } => EventKind::Created,
            PositionEvent::Increased { .. } => EventKind::Increased,
            PositionEvent::Reduced { .. } => EventKind::Reduced,
            PositionEvent::Swapped { .. } => EventKind::Swapped,
            PositionEvent::Terminated { .. } => EventKind::Terminated,
        }
    }
}

/// A full event log for one position, ready to be replayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionHistory {
    pub context: PositionContext,
    /// Non-decreasing by timestamp; same-timestamp events keep their order.
    pub events: Vec<PositionEvent>,
}

impl PositionHistory {
    pub fn new(context: PositionContext, events: Vec<PositionEvent>) -> Self {
        Self { context, events }
    }
}
