//! Instrument metadata and major-contract resolution.

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::types::TradeDate;

/// Resolves a rolling instrument to its active (major) contract on a date.
///
/// Must be defined for every (instrument, date) the simulation asks about;
/// a missing mapping is fatal.
pub trait MajorContracts {
    fn active_contract(&self, date: TradeDate, instrument: &str) -> Result<String>;
}

impl<M: MajorContracts + ?Sized> MajorContracts for &M {
    fn active_contract(&self, date: TradeDate, instrument: &str) -> Result<String> {
        (**self).active_contract(date, instrument)
    }
}

/// Static instrument metadata.
pub trait Instruments {
    /// Money per unit of price per lot.
    fn multiplier(&self, instrument: &str) -> Result<f64>;
}

impl<I: Instruments + ?Sized> Instruments for &I {
    fn multiplier(&self, instrument: &str) -> Result<f64> {
        (**self).multiplier(instrument)
    }
}

/// Major-contract table preloaded in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryMajorContracts {
    by_instrument: FxHashMap<String, FxHashMap<TradeDate, String>>,
}

impl MemoryMajorContracts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        instrument: impl Into<String>,
        date: TradeDate,
        contract: impl Into<String>,
    ) {
        self.by_instrument
            .entry(instrument.into())
            .or_default()
            .insert(date, contract.into());
    }

    /// Number of instruments with at least one mapping.
    pub fn instruments(&self) -> usize {
        self.by_instrument.len()
    }
}

impl MajorContracts for MemoryMajorContracts {
    fn active_contract(&self, date: TradeDate, instrument: &str) -> Result<String> {
        self.by_instrument
            .get(instrument)
            .and_then(|m| m.get(&date))
            .cloned()
            .ok_or_else(|| Error::MissingContract {
                instrument: instrument.to_string(),
                date,
            })
    }
}

/// Contract multipliers by instrument.
#[derive(Clone, Debug, Default)]
pub struct MemoryInstruments {
    multipliers: FxHashMap<String, f64>,
}

impl MemoryInstruments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instrument: impl Into<String>, multiplier: f64) {
        self.multipliers.insert(instrument.into(), multiplier);
    }
}

impl FromIterator<(String, f64)> for MemoryInstruments {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self {
            multipliers: iter.into_iter().collect(),
        }
    }
}

impl Instruments for MemoryInstruments {
    fn multiplier(&self, instrument: &str) -> Result<f64> {
        match self.multipliers.get(instrument) {
            Some(&m) if m.is_finite() && m > 0.0 => Ok(m),
            _ => Err(Error::UnknownInstrument(instrument.to_string())),
        }
    }
}
