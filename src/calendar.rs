//! Trading calendar: an ordered list of trading dates.

use crate::error::{Error, Result};
use crate::types::TradeDate;

/// Sorted, de-duplicated trading dates.
#[derive(Clone, Debug, Default)]
pub struct Calendar {
    dates: Vec<TradeDate>,
}

impl Calendar {
    /// Build a calendar from dates in any order.
    pub fn new(mut dates: Vec<TradeDate>) -> Self {
        dates.sort_unstable();
        dates.dedup();
        Self { dates }
    }

    #[inline]
    pub fn dates(&self) -> &[TradeDate] {
        &self.dates
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first_date(&self) -> Option<TradeDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<TradeDate> {
        self.dates.last().copied()
    }

    pub fn contains(&self, date: TradeDate) -> bool {
        self.dates.binary_search(&date).is_ok()
    }

    /// Trading dates in `[bgn, stp)`, ascending.
    pub fn iter_dates(&self, bgn: TradeDate, stp: TradeDate) -> &[TradeDate] {
        let lo = self.dates.partition_point(|d| *d < bgn);
        let hi = self.dates.partition_point(|d| *d < stp);
        &self.dates[lo..hi.max(lo)]
    }

    /// Move `shift` trading days from `date` (negative = into the past).
    ///
    /// `date` itself must be a trading date.
    pub fn shift(&self, date: TradeDate, shift: i64) -> Result<TradeDate> {
        let sn = self
            .dates
            .binary_search(&date)
            .map_err(|_| Error::NotTradingDate(date))?;
        let target = sn as i64 + shift;
        if target < 0 || target >= self.dates.len() as i64 {
            return Err(Error::CalendarExhausted { date, shift });
        }
        Ok(self.dates[target as usize])
    }

    /// The trading date right after `date`.
    pub fn next_date(&self, date: TradeDate) -> Result<TradeDate> {
        self.shift(date, 1)
    }
}
