//! Position tracking for a single contract and direction.

use std::fmt;

use crate::error::{Error, Result};
use crate::trade::Trade;
use crate::types::{Offset, PositionKey};

/// What applying one trade did to the ledger.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TradeOutcome {
    /// Realized PnL of the closed lots (zero for opens)
    pub realized_pnl: f64,
    /// Transaction cost of the trade
    pub cost: f64,
}

/// A directional holding in one contract.
///
/// Quantity is a non-negative lot count; the direction lives in the key.
/// A position whose quantity drops to zero is pruned from the book at the
/// end of the day.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    /// Contract and direction
    pub key: PositionKey,
    /// Lots held, never negative
    pub quantity: u64,
    /// Money per unit of price per lot
    pub multiplier: f64,
    /// Volume-weighted average entry price
    pub cost_price: f64,
    /// Most recent mark
    pub last_price: f64,
}

impl Position {
    /// Create an empty position for the given key.
    pub fn new(key: PositionKey, multiplier: f64) -> Self {
        Self {
            key,
            quantity: 0,
            multiplier,
            cost_price: 0.0,
            last_price: 0.0,
        }
    }

    /// A position of `quantity` lots with no cost basis, used for targets.
    pub fn target(key: PositionKey, quantity: u64, multiplier: f64) -> Self {
        Self {
            quantity,
            ..Self::new(key, multiplier)
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.quantity == 0
    }

    /// (last - cost) × multiplier × quantity × direction sign.
    #[inline]
    pub fn unrealized_pnl(&self) -> f64 {
        (self.last_price - self.cost_price)
            * self.multiplier
            * self.quantity as f64
            * self.key.direction.sign()
    }

    /// Unsigned notional at the last mark.
    #[inline]
    pub fn market_value(&self) -> f64 {
        self.last_price * self.multiplier * self.quantity as f64
    }

    /// The trade that moves this position to `target`.
    ///
    /// OPEN when the target is at least as large, CLOSE otherwise, for
    /// `|target - current|` lots. When the two quantities are equal the
    /// trade has zero quantity: this never returns "no trade", so the
    /// caller must drop trades with `quantity() == 0` before applying them.
    pub fn cal_trade_from_target(&self, target: &Position, exe_price: f64) -> Trade {
        debug_assert_eq!(self.key, target.key);
        let offset = if self.quantity <= target.quantity {
            Offset::Open
        } else {
            Offset::Close
        };
        Trade::new(
            self.key.clone(),
            offset,
            self.quantity.abs_diff(target.quantity),
            self.multiplier,
            exe_price,
        )
    }

    /// The whole position as one trade: OPEN for a target with no live
    /// counterpart, CLOSE for a live position no longer wanted.
    pub fn convert_as_trade(&self, exe_price: f64, offset: Offset) -> Trade {
        Trade::new(
            self.key.clone(),
            offset,
            self.quantity,
            self.multiplier,
            exe_price,
        )
    }

    /// Apply a trade to this position.
    ///
    /// Opens re-average the cost price and realize nothing. Closes realize
    /// `(exe - cost) × multiplier × qty × sign` and leave the cost price
    /// untouched. Cost is charged on both.
    ///
    /// Closing more than is held is a bookkeeping bug upstream and fails
    /// with [`Error::CloseExceedsPosition`]; the position is left unchanged.
    pub fn update_from_trade(&mut self, trade: &Trade, cost_rate: f64) -> Result<TradeOutcome> {
        debug_assert_eq!(&self.key, trade.key());
        let cost = trade.cost(cost_rate);
        let realized_pnl = match trade.offset() {
            Offset::Open => {
                let sum_qty = self.quantity + trade.quantity();
                if sum_qty > 0 {
                    let sum_amt = self.cost_price * self.quantity as f64
                        + trade.exe_price() * trade.quantity() as f64;
                    self.cost_price = sum_amt / sum_qty as f64;
                }
                self.quantity = sum_qty;
                0.0
            }
            Offset::Close => {
                if trade.quantity() > self.quantity {
                    return Err(Error::CloseExceedsPosition {
                        key: self.key.clone(),
                        trade_qty: trade.quantity(),
                        position_qty: self.quantity,
                    });
                }
                self.quantity -= trade.quantity();
                (trade.exe_price() - self.cost_price)
                    * self.multiplier
                    * trade.quantity() as f64
                    * self.key.direction.sign()
            }
        };
        Ok(TradeOutcome { realized_pnl, cost })
    }

    /// Set the mark. Callers skip this when the upstream price is missing so
    /// the previous mark is retained.
    #[inline]
    pub fn update_from_market(&mut self, last_price: f64) {
        self.last_price = last_price;
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: qty={} cost={:.4} last={:.4} upnl={:.2}",
            self.key,
            self.quantity,
            self.cost_price,
            self.last_price,
            self.unrealized_pnl()
        )
    }
}
