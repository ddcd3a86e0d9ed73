//! Portfolio state: the live book, its PnL ledger, and the daily update.
//!
//! A [`Portfolio`] advances one trading day at a time through
//! [`Portfolio::run_day`]:
//!
//! 1. targets are built from the previous day's signals (rebalance days)
//!    or the book is checked against the major-contract table (rollover
//!    days);
//! 2. the resulting trades are priced with the execution field of today;
//! 3. trades are applied, emptied positions pruned, survivors marked;
//! 4. the account books the day's PnL and takes a NAV snapshot.
//!
//! The day is staged on a copy of the book. If any step fails the
//! portfolio is left exactly as it was before the call.
//!
//! # Example
//!
//! ```
//! use futsim::portfolio::{DayPlan, Feeds, Portfolio};
//! use futsim::{
//!     Bar, CostModel, MemoryInstruments, MemoryMajorContracts, MemoryMarketData,
//!     MemorySignals, PriceFields,
//! };
//! use chrono::NaiveDate;
//!
//! let t0 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
//! let t1 = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
//!
//! let mut market = MemoryMarketData::new();
//! market.insert(t0, "CU2503.SHF", Bar { close: 100.0, ..Bar::default() });
//! market.insert(t1, "CU2503.SHF", Bar { open: 100.0, close: 102.0, ..Bar::default() });
//! let mut major = MemoryMajorContracts::new();
//! major.insert("CU.SHF", t0, "CU2503.SHF");
//! major.insert("CU.SHF", t1, "CU2503.SHF");
//! let instruments: MemoryInstruments = [("CU.SHF".to_string(), 10.0)].into_iter().collect();
//! let mut signals = MemorySignals::new();
//! signals.push(t0, "CU.SHF", 1.0);
//!
//! let feeds = Feeds::new(&market, &major, &instruments, &signals);
//! let mut portfolio = Portfolio::new("demo", 100_000.0, CostModel::zero(), PriceFields::default());
//! let snap = portfolio.run_day(t1, DayPlan::Rebalance { sig_date: t0 }, &feeds).unwrap();
//!
//! // 100,000 / 100 / 10 = 100 lots, marked up 2 points
//! assert_eq!(snap.long_qty, 100);
//! assert!((snap.nav - 102_000.0).abs() < 1e-6);
//! ```

pub mod account;
pub mod cost_model;
pub mod metrics;
pub mod position;
#[cfg(feature = "parallel")]
pub mod sweep;

pub use account::{Account, BookTotals, NavSnapshot, PositionRecord, TradeRecord};
pub use cost_model::CostModel;
pub use metrics::{AnnualMethod, NavMetrics, evaluate_nav};
pub use position::{Position, TradeOutcome};

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::contracts::{Instruments, MajorContracts};
use crate::error::{Error, Result};
use crate::market::MarketData;
use crate::rebalance::{rollover_trades, signal_trades};
use crate::signal::Signals;
use crate::target::build_targets;
use crate::trade::Trade;
use crate::types::{Contract, Offset, PriceField, TradeDate};

/// Positions keyed by (contract, direction), iterated in key order.
pub type Book = BTreeMap<crate::types::PositionKey, Position>;

/// The read-only data a simulation pulls from.
#[derive(Clone, Copy)]
pub struct Feeds<'a> {
    pub market: &'a (dyn MarketData + Sync),
    pub major: &'a (dyn MajorContracts + Sync),
    pub instruments: &'a (dyn Instruments + Sync),
    pub signals: &'a (dyn Signals + Sync),
}

impl<'a> Feeds<'a> {
    pub fn new(
        market: &'a (dyn MarketData + Sync),
        major: &'a (dyn MajorContracts + Sync),
        instruments: &'a (dyn Instruments + Sync),
        signals: &'a (dyn Signals + Sync),
    ) -> Self {
        Self {
            market,
            major,
            instruments,
            signals,
        }
    }

    /// Same data, different signal source.
    pub fn with_signals(self, signals: &'a (dyn Signals + Sync)) -> Self {
        Self { signals, ..self }
    }
}

/// Which price field each step of the day reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PriceFields {
    /// Sizing reference, read on the signal date
    pub sig: PriceField,
    /// Execution price, read on the execution date
    pub exe: PriceField,
    /// End-of-day mark, read on the execution date
    pub settle: PriceField,
}

impl Default for PriceFields {
    fn default() -> Self {
        Self {
            sig: PriceField::Close,
            exe: PriceField::Open,
            settle: PriceField::Close,
        }
    }
}

/// What a day does before marking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DayPlan {
    /// Move the book onto targets built from the signals of `sig_date`
    Rebalance { sig_date: TradeDate },
    /// Follow live positions onto their instrument's new major contract
    Rollover,
}

/// A simulated futures account.
#[derive(Clone, Debug)]
pub struct Portfolio {
    id: String,
    account: Account,
    positions: Book,
    cost_model: CostModel,
    prices: PriceFields,
    trades: Vec<TradeRecord>,
    position_history: Vec<PositionRecord>,
}

impl Portfolio {
    pub fn new(id: impl Into<String>, init_cash: f64, cost_model: CostModel, prices: PriceFields) -> Self {
        Self {
            id: id.into(),
            account: Account::new(init_cash),
            positions: Book::new(),
            cost_model,
            prices,
            trades: Vec::new(),
            position_history: Vec::new(),
        }
    }

    // === Queries ===

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn account(&self) -> &Account {
        &self.account
    }

    #[inline]
    pub fn cost_model(&self) -> &CostModel {
        &self.cost_model
    }

    /// Live positions in key order.
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn book(&self) -> &Book {
        &self.positions
    }

    /// Every trade applied so far.
    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    /// End-of-day positions of every day so far.
    pub fn position_history(&self) -> &[PositionRecord] {
        &self.position_history
    }

    /// Consume the portfolio into its NAV rows, trades, and position history.
    pub fn into_records(self) -> (Vec<NavSnapshot>, Vec<TradeRecord>, Vec<PositionRecord>) {
        (self.account.into_snapshots(), self.trades, self.position_history)
    }

    // === Daily update ===

    /// Run one trading day and return its NAV snapshot.
    ///
    /// On error nothing is committed: positions, ledger, and history are
    /// those of the previous day.
    pub fn run_day(&mut self, date: TradeDate, plan: DayPlan, feeds: &Feeds<'_>) -> Result<&NavSnapshot> {
        let mut book = self.positions.clone();

        let exe_field = self.prices.exe;
        let market = feeds.market;
        let exe_price = |contract: &Contract| -> Result<f64> {
            let price = market.price(date, &contract.code, exe_field);
            if price.is_finite() && price > 0.0 {
                Ok(price)
            } else {
                Err(Error::MissingExecutionPrice {
                    contract: contract.code.clone(),
                    date,
                })
            }
        };

        let trades = match plan {
            DayPlan::Rebalance { sig_date } => {
                let capital = self.cost_model.capital_base(self.account.last_nav());
                let targets = build_targets(
                    feeds.signals.signal(sig_date),
                    capital,
                    sig_date,
                    self.prices.sig,
                    feeds.market,
                    feeds.major,
                    feeds.instruments,
                )?;
                signal_trades(&book, &targets, exe_price)?
            }
            DayPlan::Rollover => rollover_trades(&book, date, feeds.major, exe_price)?,
        };

        debug!("[{}] {date} {plan:?}: {} trades", self.id, trades.len());
        let applied = apply_trades(&mut book, &trades, self.cost_model.rate)?;
        book.retain(|_, pos| !pos.is_empty());
        let unrealized = mark_to_market(&mut book, date, feeds.market, self.prices.settle);

        // Commit
        let (day_realized, day_cost) = applied
            .iter()
            .fold((0.0, 0.0), |(pnl, cost), (_, o)| (pnl + o.realized_pnl, cost + o.cost));
        self.trades
            .extend(applied.iter().map(|(t, o)| TradeRecord::new(date, t, *o)));
        self.position_history
            .extend(book.values().map(|p| PositionRecord::new(date, p)));
        for pos in book.values() {
            debug!("[{}] {date} {pos}", self.id);
        }
        let totals = BookTotals::of(&book);
        self.positions = book;
        self.account.update_pnl(day_realized, day_cost, unrealized);
        Ok(self.account.close_day(date, day_realized, day_cost, totals))
    }
}

/// Apply trades in order. An OPEN on an unseen key creates the position,
/// starting its mark at the execution price; a CLOSE on an unseen key is
/// fatal.
fn apply_trades(book: &mut Book, trades: &[Trade], cost_rate: f64) -> Result<Vec<(Trade, TradeOutcome)>> {
    let mut applied = Vec::with_capacity(trades.len());
    for trade in trades {
        let key = trade.key();
        let pos = match book.get_mut(key) {
            Some(pos) => pos,
            None => {
                if trade.offset() == Offset::Close {
                    return Err(Error::CloseMissingPosition(key.clone()));
                }
                let mut fresh = Position::new(key.clone(), trade.multiplier());
                fresh.update_from_market(trade.exe_price());
                book.entry(key.clone()).or_insert(fresh)
            }
        };
        let outcome = pos.update_from_trade(trade, cost_rate)?;
        applied.push((trade.clone(), outcome));
    }
    Ok(applied)
}

/// Mark every position with `field` of `date` and return total unrealized
/// PnL. A missing price keeps the previous mark.
fn mark_to_market(book: &mut Book, date: TradeDate, market: &(dyn MarketData + Sync), field: PriceField) -> f64 {
    let mut unrealized = 0.0;
    for pos in book.values_mut() {
        let price = market.price(date, &pos.key.contract.code, field);
        if price.is_nan() {
            warn!(
                "no {field} price for {} on {date}, keeping mark {:.4}",
                pos.key.contract, pos.last_price
            );
        } else {
            pos.update_from_market(price);
        }
        unrealized += pos.unrealized_pnl();
    }
    unrealized
}
