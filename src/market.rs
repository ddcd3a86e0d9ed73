//! Market data: per-contract daily bars.
//!
//! The simulator only ever asks for one number at a time through
//! [`MarketData::price`]. Missing data is reported as NaN, never as an
//! error, so the mark-to-market step can keep the previous mark.

use rustc_hash::FxHashMap;

use crate::types::{PriceField, TradeDate};

/// Lookup of daily price fields by (trade date, contract code).
pub trait MarketData {
    /// The requested field, or NaN when the row or the value is missing.
    fn price(&self, date: TradeDate, contract: &str, field: PriceField) -> f64;
}

impl<M: MarketData + ?Sized> MarketData for &M {
    fn price(&self, date: TradeDate, contract: &str, field: PriceField) -> f64 {
        (**self).price(date, contract, field)
    }
}

/// One day of one contract. Missing values are NaN.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bar {
    pub pre_close: f64,
    pub pre_settle: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub settle: f64,
    pub volume: f64,
    pub amount: f64,
    pub oi: f64,
}

impl Default for Bar {
    fn default() -> Self {
        Self {
            pre_close: f64::NAN,
            pre_settle: f64::NAN,
            open: f64::NAN,
            high: f64::NAN,
            low: f64::NAN,
            close: f64::NAN,
            settle: f64::NAN,
            volume: f64::NAN,
            amount: f64::NAN,
            oi: f64::NAN,
        }
    }
}

impl Bar {
    pub fn get(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Open => self.open,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Close => self.close,
            PriceField::Settle => self.settle,
            PriceField::PreClose => self.pre_close,
            PriceField::PreSettle => self.pre_settle,
            PriceField::Volume => self.volume,
            PriceField::Amount => self.amount,
            PriceField::Oi => self.oi,
        }
    }

    /// Fill gaps backwards along open <- close <- settle.
    ///
    /// A bar with no close but a settle gets the settle as close; a bar with
    /// no open then takes the (possibly filled) close.
    pub fn backfill(mut self) -> Self {
        if self.close.is_nan() {
            self.close = self.settle;
        }
        if self.open.is_nan() {
            self.open = self.close;
        }
        self
    }
}

/// Market data preloaded in memory for the whole simulation range.
#[derive(Clone, Debug, Default)]
pub struct MemoryMarketData {
    bars: FxHashMap<String, FxHashMap<TradeDate, Bar>>,
}

impl MemoryMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a bar. The bar is back-filled on the way in.
    pub fn insert(&mut self, date: TradeDate, contract: impl Into<String>, bar: Bar) {
        self.bars
            .entry(contract.into())
            .or_default()
            .insert(date, bar.backfill());
    }

    pub fn bar(&self, date: TradeDate, contract: &str) -> Option<&Bar> {
        self.bars.get(contract).and_then(|by_date| by_date.get(&date))
    }

    /// Number of (date, contract) bars held.
    pub fn len(&self) -> usize {
        self.bars.values().map(FxHashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

impl MarketData for MemoryMarketData {
    fn price(&self, date: TradeDate, contract: &str, field: PriceField) -> f64 {
        self.bar(date, contract)
            .map(|b| b.get(field))
            .unwrap_or(f64::NAN)
    }
}
