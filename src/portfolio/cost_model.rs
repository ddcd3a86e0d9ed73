//! Transaction cost modeling.

/// Models transaction costs for a simulated futures account.
///
/// Every trade, open or close, pays `notional × rate` (see
/// [`Trade::cost`](crate::Trade::cost)). The reservation is a haircut on
/// NAV before sizing targets, leaving headroom for those costs.
///
/// ```
/// use futsim::CostModel;
///
/// let model = CostModel { rate: 0.0005, reservation: 0.05 };
/// // 1,050,000 of NAV sizes targets from 1,000,000
/// assert!((model.capital_base(1_050_000.0) - 1_000_000.0).abs() < 1e-6);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CostModel {
    /// Cost as a fraction of traded notional
    pub rate: f64,
    /// Fraction of NAV held back when sizing targets
    pub reservation: f64,
}

impl CostModel {
    /// A zero-cost model (no fees, no reservation).
    pub fn zero() -> Self {
        Self {
            rate: 0.0,
            reservation: 0.0,
        }
    }

    /// Capital available for sizing: `nav / (1 + reservation)`.
    pub fn capital_base(&self, nav: f64) -> f64 {
        nav / (1.0 + self.reservation)
    }

    /// Both knobs must be finite and non-negative.
    pub fn is_valid(&self) -> bool {
        self.rate.is_finite() && self.rate >= 0.0 && self.reservation.is_finite() && self.reservation >= 0.0
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::zero()
    }
}
