use serde::Serialize;
use tracing::warn;

use crate::domain::amount::{self, NumericError};
use crate::domain::{Decimal, Timestamp};

use super::{ProfitSample, SampleKind};

/// One display-ready point of a position's profit chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitPoint {
    pub timestamp: Timestamp,
    /// Output the spent capital would have bought at deposit-time prices.
    pub swapped_if_lump_sum: Decimal,
    /// Output actually received from the executed swaps.
    pub swapped_if_dca: Decimal,
    /// `swapped_if_dca / swapped_if_lump_sum`, or 0.
    pub ratio: Decimal,
    /// DCA outperformance over the lump sum, in percent.
    pub percentage: Decimal,
}

/// Finished profit series for one position. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitSeries {
    points: Vec<ProfitPoint>,
    has_swap_history: bool,
}

impl ProfitSeries {
    pub fn points(&self) -> &[ProfitPoint] {
        &self.points
    }

    /// False when no swap was ever replayed: the chart has only its origin.
    pub fn has_swap_history(&self) -> bool {
        self.has_swap_history
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&ProfitPoint> {
        self.points.last()
    }
}

/// Collects raw samples and converts them to display units.
#[derive(Debug, Clone)]
pub struct ProfitSeriesBuilder {
    to_decimals: u8,
    samples: Vec<ProfitSample>,
}

impl ProfitSeriesBuilder {
    pub fn new(to_decimals: u8) -> Self {
        Self {
            to_decimals,
            samples: Vec::new(),
        }
    }

    pub fn push(&mut self, sample: ProfitSample) {
        self.samples.push(sample);
    }

    pub fn build(self) -> Result<ProfitSeries, NumericError> {
        let has_swap_history = self
            .samples
            .iter()
            .any(|sample| sample.kind == SampleKind::Swap);

        let points = self
            .samples
            .iter()
            .map(|sample| self.to_point(sample))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ProfitSeries {
            points,
            has_swap_history,
        })
    }

    fn to_point(&self, sample: &ProfitSample) -> Result<ProfitPoint, NumericError> {
        let swapped_if_lump_sum = amount::to_display(sample.swapped_if_lump_sum, self.to_decimals)?;
        let swapped_if_dca = amount::to_display(sample.swapped_if_dca, self.to_decimals)?;
        let ratio = amount::to_display(sample.ratio, self.to_decimals)?;

        Ok(ProfitPoint {
            timestamp: sample.timestamp,
            swapped_if_lump_sum,
            swapped_if_dca,
            ratio,
            percentage: percentage(sample.timestamp, swapped_if_dca, swapped_if_lump_sum),
        })
    }
}

/// `(dca / lump_sum - 1) * 100`, or 0 when there is no lump-sum baseline.
///
/// The quotient is bounded below by -100 but not above; a result too large
/// for a decimal saturates at `Decimal::max()`.
fn percentage(timestamp: Timestamp, dca: Decimal, lump_sum: Decimal) -> Decimal {
    if lump_sum.is_zero() {
        return Decimal::zero();
    }
    dca.checked_div(lump_sum)
        .and_then(|r| r.checked_sub(Decimal::one()))
        .and_then(|r| r.checked_mul(Decimal::hundred()))
        .unwrap_or_else(|| {
            warn!(%timestamp, %dca, %lump_sum, "percentage out of range, saturating");
            Decimal::max()
        })
}
