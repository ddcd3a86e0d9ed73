//! Cash/PnL ledger and the per-run record types.

use crate::portfolio::{Book, Position};
use crate::portfolio::position::TradeOutcome;
use crate::trade::Trade;
use crate::types::{Direction, Offset, TradeDate};

/// One row of the NAV table, taken at the end of every simulated day.
///
/// `nav == init_cash + cumulative_realized_pnl - cumulative_cost
/// + cumulative_unrealized_pnl` holds for every row.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NavSnapshot {
    pub trade_date: TradeDate,
    pub init_cash: f64,
    /// Realized PnL of all closes so far, before costs
    pub cumulative_realized_pnl: f64,
    /// Costs of all trades so far
    pub cumulative_cost: f64,
    pub day_realized_pnl: f64,
    pub day_cost: f64,
    /// Unrealized PnL of the book as marked today
    pub cumulative_unrealized_pnl: f64,
    /// NAV of the previous day, the sizing base for this day
    pub last_nav: f64,
    pub nav: f64,
    pub navps: f64,
    pub day_return: f64,
    pub long_qty: u64,
    pub short_qty: u64,
    pub long_value: f64,
    pub short_value: f64,
    pub n_positions: usize,
}

/// One applied trade.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TradeRecord {
    pub trade_date: TradeDate,
    pub instrument: String,
    pub contract: String,
    pub direction: Direction,
    pub offset: Offset,
    pub quantity: u64,
    pub executed_price: f64,
    pub cost: f64,
    pub realized_pnl: f64,
}

impl TradeRecord {
    pub fn new(trade_date: TradeDate, trade: &Trade, outcome: TradeOutcome) -> Self {
        let key = trade.key();
        Self {
            trade_date,
            instrument: key.contract.instrument.clone(),
            contract: key.contract.code.clone(),
            direction: key.direction,
            offset: trade.offset(),
            quantity: trade.quantity(),
            executed_price: trade.exe_price(),
            cost: outcome.cost,
            realized_pnl: outcome.realized_pnl,
        }
    }
}

/// One live position at the end of a day.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PositionRecord {
    pub trade_date: TradeDate,
    pub instrument: String,
    pub contract: String,
    pub direction: Direction,
    pub quantity: u64,
    pub cost_price: f64,
    pub last_price: f64,
    pub market_value: f64,
    pub unrealized_pnl: f64,
}

impl PositionRecord {
    pub fn new(trade_date: TradeDate, pos: &Position) -> Self {
        Self {
            trade_date,
            instrument: pos.key.contract.instrument.clone(),
            contract: pos.key.contract.code.clone(),
            direction: pos.key.direction,
            quantity: pos.quantity,
            cost_price: pos.cost_price,
            last_price: pos.last_price,
            market_value: pos.market_value(),
            unrealized_pnl: pos.unrealized_pnl(),
        }
    }
}

/// Book-wide exposure aggregates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BookTotals {
    pub long_qty: u64,
    pub short_qty: u64,
    pub long_value: f64,
    pub short_value: f64,
    pub n_positions: usize,
}

impl BookTotals {
    pub fn of(book: &Book) -> Self {
        book.values().fold(Self::default(), |mut acc, pos| {
            match pos.key.direction {
                Direction::Long => {
                    acc.long_qty += pos.quantity;
                    acc.long_value += pos.market_value();
                }
                Direction::Short => {
                    acc.short_qty += pos.quantity;
                    acc.short_value += pos.market_value();
                }
            }
            acc.n_positions += 1;
            acc
        })
    }
}

/// Running PnL ledger of one simulation.
#[derive(Clone, Debug)]
pub struct Account {
    init_cash: f64,
    cum_realized_pnl: f64,
    cum_cost: f64,
    unrealized_pnl: f64,
    last_nav: f64,
    snapshots: Vec<NavSnapshot>,
}

impl Account {
    pub fn new(init_cash: f64) -> Self {
        Self {
            init_cash,
            cum_realized_pnl: 0.0,
            cum_cost: 0.0,
            unrealized_pnl: 0.0,
            last_nav: init_cash,
            snapshots: Vec::new(),
        }
    }

    #[inline]
    pub fn init_cash(&self) -> f64 {
        self.init_cash
    }

    /// NAV of the last closed day (initial cash before the first day).
    #[inline]
    pub fn last_nav(&self) -> f64 {
        self.last_nav
    }

    #[inline]
    pub fn cum_realized_pnl(&self) -> f64 {
        self.cum_realized_pnl
    }

    #[inline]
    pub fn cum_cost(&self) -> f64 {
        self.cum_cost
    }

    #[inline]
    pub fn unrealized_pnl(&self) -> f64 {
        self.unrealized_pnl
    }

    #[inline]
    pub fn nav(&self) -> f64 {
        self.init_cash + self.cum_realized_pnl - self.cum_cost + self.unrealized_pnl
    }

    #[inline]
    pub fn navps(&self) -> f64 {
        self.nav() / self.init_cash
    }

    #[inline]
    pub fn day_return(&self) -> f64 {
        self.nav() / self.last_nav - 1.0
    }

    pub fn snapshots(&self) -> &[NavSnapshot] {
        &self.snapshots
    }

    /// Book the day's realized PnL and cost; replace the unrealized PnL.
    pub fn update_pnl(&mut self, day_realized_pnl: f64, day_cost: f64, unrealized_pnl: f64) {
        self.cum_realized_pnl += day_realized_pnl;
        self.cum_cost += day_cost;
        self.unrealized_pnl = unrealized_pnl;
    }

    /// Append the day's row and roll `last_nav` forward.
    pub fn close_day(
        &mut self,
        trade_date: TradeDate,
        day_realized_pnl: f64,
        day_cost: f64,
        totals: BookTotals,
    ) -> &NavSnapshot {
        let snapshot = NavSnapshot {
            trade_date,
            init_cash: self.init_cash,
            cumulative_realized_pnl: self.cum_realized_pnl,
            cumulative_cost: self.cum_cost,
            day_realized_pnl,
            day_cost,
            cumulative_unrealized_pnl: self.unrealized_pnl,
            last_nav: self.last_nav,
            nav: self.nav(),
            navps: self.navps(),
            day_return: self.day_return(),
            long_qty: totals.long_qty,
            short_qty: totals.short_qty,
            long_value: totals.long_value,
            short_value: totals.short_value,
            n_positions: totals.n_positions,
        };
        self.last_nav = snapshot.nav;
        self.snapshots.push(snapshot);
        &self.snapshots[self.snapshots.len() - 1]
    }

    pub fn into_snapshots(self) -> Vec<NavSnapshot> {
        self.snapshots
    }
}
