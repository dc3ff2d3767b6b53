//! Lot accounting and DCA-vs-lump-sum profit replay.

use alloy_primitives::U256;
use thiserror::Error;

use crate::domain::{NumericError, Timestamp, TokenId};

pub mod ledger;
pub mod processor;
pub mod replay;
pub mod series;

pub use ledger::{Consumption, Lot, LotLedger};
pub use processor::{locked_rate, EventProcessor};
pub use replay::ProfitEngine;
pub use series::{ProfitPoint, ProfitSeries, ProfitSeriesBuilder};

/// A raw point emitted by the processor, amounts in to-token smallest units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfitSample {
    pub timestamp: Timestamp,
    pub kind: SampleKind,
    pub swapped_if_lump_sum: U256,
    pub swapped_if_dca: U256,
    /// `swapped_if_dca / swapped_if_lump_sum`, fixed point scaled by the
    /// to-token's decimal factor.
    pub ratio: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    /// Zero-valued point at position creation.
    Origin,
    Swap,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("price unavailable for {token} at {timestamp}: {reason}")]
    PriceUnavailable {
        token: TokenId,
        timestamp: Timestamp,
        reason: String,
    },
    #[error("events out of order: {found} after {previous}")]
    OutOfOrderEvents {
        previous: Timestamp,
        found: Timestamp,
    },
    #[error(transparent)]
    Numeric(#[from] NumericError),
    #[error("replay cancelled")]
    Cancelled,
}
