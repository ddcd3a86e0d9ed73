//! Trade representation

use std::fmt;

use crate::types::{Offset, PositionKey};

/// An open or close instruction against one slot of the book.
///
/// Trades are derived, never hand-built: they come out of
/// [`Position::cal_trade_from_target`](crate::Position::cal_trade_from_target),
/// [`Position::convert_as_trade`](crate::Position::convert_as_trade) or the
/// rebalance/rollover generators in [`rebalance`](crate::rebalance). Once
/// applied to the book a trade is discarded.
#[derive(Clone, Debug, PartialEq)]
pub struct Trade {
    key: PositionKey,
    offset: Offset,
    quantity: u64,
    multiplier: f64,
    exe_price: f64,
}

impl Trade {
    pub(crate) fn new(
        key: PositionKey,
        offset: Offset,
        quantity: u64,
        multiplier: f64,
        exe_price: f64,
    ) -> Self {
        Self {
            key,
            offset,
            quantity,
            multiplier,
            exe_price,
        }
    }

    #[inline]
    pub fn key(&self) -> &PositionKey {
        &self.key
    }

    #[inline]
    pub fn offset(&self) -> Offset {
        self.offset
    }

    /// Lots traded. Zero only for a diff between equal positions; callers
    /// drop those before the trade reaches the book.
    #[inline]
    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    #[inline]
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    #[inline]
    pub fn exe_price(&self) -> f64 {
        self.exe_price
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.quantity == 0
    }

    /// Traded notional: price × multiplier × quantity.
    #[inline]
    pub fn notional(&self) -> f64 {
        self.exe_price * self.multiplier * self.quantity as f64
    }

    /// Transaction cost at `cost_rate`, charged on opens and closes alike.
    #[inline]
    pub fn cost(&self, cost_rate: f64) -> f64 {
        self.notional() * cost_rate
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} @ {:.4}",
            self.offset, self.key, self.quantity, self.exe_price
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Contract, Direction};

    fn key() -> PositionKey {
        PositionKey::new(Contract::new("CU.SHF", "CU2506.SHF"), Direction::Long)
    }

    #[test]
    fn cost_is_notional_times_rate() {
        let trade = Trade::new(key(), Offset::Open, 5, 10.0, 100.0);
        assert_eq!(trade.notional(), 5000.0);
        assert!((trade.cost(0.0005) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn close_costs_the_same_as_open() {
        let open = Trade::new(key(), Offset::Open, 5, 10.0, 110.0);
        let close = Trade::new(key(), Offset::Close, 5, 10.0, 110.0);
        assert_eq!(open.cost(0.0005), close.cost(0.0005));
    }

    #[test]
    fn empty_trade() {
        let trade = Trade::new(key(), Offset::Open, 0, 10.0, 100.0);
        assert!(trade.is_empty());
        assert_eq!(trade.cost(0.01), 0.0);
    }

    #[test]
    fn display() {
        let trade = Trade::new(key(), Offset::Close, 3, 10.0, 101.5);
        assert_eq!(format!("{trade}"), "CLOSE CU2506.SHF/LONG 3 @ 101.5000");
    }
}
