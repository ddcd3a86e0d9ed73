//! Signals: desired signed weight per instrument per date.

use std::collections::BTreeMap;

use crate::types::TradeDate;

/// One row of a signal snapshot.
///
/// The sign of `weight` is the direction, its magnitude the fraction of
/// allocatable capital. Weights of a date need not sum to one.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalRow {
    pub instrument: String,
    pub weight: f64,
}

impl SignalRow {
    pub fn new(instrument: impl Into<String>, weight: f64) -> Self {
        Self {
            instrument: instrument.into(),
            weight,
        }
    }
}

/// Source of signal snapshots.
pub trait Signals {
    /// Rows for `date`. A date without a snapshot yields an empty slice,
    /// meaning "no positions wanted".
    fn signal(&self, date: TradeDate) -> &[SignalRow];
}

impl<S: Signals + ?Sized> Signals for &S {
    fn signal(&self, date: TradeDate) -> &[SignalRow] {
        (**self).signal(date)
    }
}

/// Signal snapshots preloaded in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySignals {
    by_date: BTreeMap<TradeDate, Vec<SignalRow>>,
}

impl MemorySignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, date: TradeDate, instrument: impl Into<String>, weight: f64) {
        self.by_date
            .entry(date)
            .or_default()
            .push(SignalRow::new(instrument, weight));
    }

    /// Dates that carry a snapshot, ascending.
    pub fn dates(&self) -> impl Iterator<Item = &TradeDate> {
        self.by_date.keys()
    }
}

impl Signals for MemorySignals {
    fn signal(&self, date: TradeDate) -> &[SignalRow] {
        self.by_date.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }
}
