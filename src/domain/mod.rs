//! Domain types for DCA position replay.
//!
//! This module provides:
//! - Fixed-point helpers over `U256` raw amounts
//! - A Decimal wrapper for USD prices and display values
//! - Primitives: Timestamp, ChainId, TokenId, Token, PositionContext
//! - The PositionEvent sum type replayed by the engine

pub mod amount;
pub mod decimal;
pub mod event;
pub mod primitives;

pub use amount::NumericError;
pub use decimal::Decimal;
pub use event::{EventKind, PositionEvent, PositionHistory};
pub use primitives::{ChainId, PositionContext, Timestamp, Token, TokenId};
