use alloy_primitives::U256;

use crate::domain::amount::{self, NumericError};

/// A tranche of deposited capital that has not been swapped yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lot {
    /// Unswapped balance, in the from-token's smallest unit. Never zero while
    /// the lot is in a ledger.
    pub remaining: U256,
    /// From->to rate at the lot's creation time: to-token units (smallest
    /// unit) received for one whole from-token.
    pub locked_rate: U256,
}

/// Result of spreading one swap across the open lots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Consumption {
    /// What the spend would have bought at each lot's locked rate.
    pub lump_sum: U256,
    /// Sum of the per-lot depletions actually applied.
    pub consumed: U256,
}

/// Open lots, oldest first.
///
/// Deposits append at the end; withdrawals drain from the end (LIFO).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LotLedger {
    lots: Vec<Lot>,
}

impl LotLedger {
    pub fn new() -> Self {
        Self { lots: Vec::new() }
    }

    pub fn lots(&self) -> &[Lot] {
        &self.lots
    }

    pub fn len(&self) -> usize {
        self.lots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    /// Add a new lot at the newest end. Zero amounts are not recorded.
    pub fn append(&mut self, amount: U256, locked_rate: U256) {
        if amount.is_zero() {
            return;
        }
        self.lots.push(Lot {
            remaining: amount,
            locked_rate,
        });
    }

    /// Withdraw `amount`, emptying the newest lots first.
    ///
    /// Returns the amount actually removed. Anything beyond the ledger's total
    /// is dropped, leaving the ledger empty.
    pub fn reduce_from_newest(&mut self, amount: U256) -> U256 {
        let mut outstanding = amount;

        while !outstanding.is_zero() {
            let Some(newest) = self.lots.last_mut() else {
                break;
            };

            if newest.remaining <= outstanding {
                outstanding -= newest.remaining;
                self.lots.pop();
            } else {
                newest.remaining -= outstanding;
                outstanding = U256::ZERO;
            }
        }

        amount - outstanding
    }

    pub fn total_remaining(&self) -> Result<U256, NumericError> {
        self.lots
            .iter()
            .try_fold(U256::ZERO, |acc, lot| amount::checked_add(acc, lot.remaining))
    }

    /// Spread `spend` across all lots in proportion to their balances.
    ///
    /// Each lot is depleted by its share rounded up, so the total consumed is
    /// never below `spend` and small lots still reach zero. The lump-sum value
    /// of lot `i` is `spend * remaining_i * locked_rate_i / total / from_scale`.
    /// The ledger is left untouched when any product overflows.
    pub fn consume_pro_rata(
        &mut self,
        spend: U256,
        from_scale: U256,
    ) -> Result<Consumption, NumericError> {
        let total = self.total_remaining()?;
        if total.is_zero() || spend.is_zero() {
            return Ok(Consumption::default());
        }
        if from_scale.is_zero() {
            return Err(NumericError::DivisionByZero);
        }

        let mut shares = Vec::with_capacity(self.lots.len());
        let mut lump_sum = U256::ZERO;
        for lot in self.lots.iter().rev() {
            let share = amount::mul_div_ceil(spend, lot.remaining, total)?.min(lot.remaining);
            let weighted = amount::checked_mul(
                amount::checked_mul(spend, lot.remaining)?,
                lot.locked_rate,
            )?;
            lump_sum = amount::checked_add(lump_sum, weighted / total / from_scale)?;
            shares.push(share);
        }

        let mut consumed = U256::ZERO;
        for (lot, share) in self.lots.iter_mut().rev().zip(shares) {
            lot.remaining -= share;
            // shares never exceed their lot, so this stays below `total`
            consumed += share;
        }
        self.lots.retain(|lot| !lot.remaining.is_zero());

        Ok(Consumption { lump_sum, consumed })
    }

    pub fn clear(&mut self) {
        self.lots.clear();
    }
}
