//! Error types for the simulator.
//!
//! Every variant is fatal for the run that produced it: the driver aborts,
//! nothing of the failing day is committed. Data-quality problems that the
//! simulation can live with (a NaN mark price, a continuity gap on append)
//! are logged instead and never surface here.

use chrono::NaiveDate;

use crate::types::PositionKey;

/// All errors that can abort a simulation run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("trade qty {trade_qty} > pos qty {position_qty} for {key}")]
    CloseExceedsPosition {
        key: PositionKey,
        trade_qty: u64,
        position_qty: u64,
    },

    #[error("try to close a position not in account: {0}")]
    CloseMissingPosition(PositionKey),

    #[error("no active contract for {instrument} on {date}")]
    MissingContract {
        instrument: String,
        date: NaiveDate,
    },

    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("invalid weight {weight} for {instrument}")]
    InvalidWeight { instrument: String, weight: f64 },

    #[error("invalid reference price {price} for {contract} on {date}")]
    InvalidReferencePrice {
        contract: String,
        date: NaiveDate,
        price: f64,
    },

    #[error("missing execution price for {contract} on {date}")]
    MissingExecutionPrice { contract: String, date: NaiveDate },

    #[error("{0} is not a trading date")]
    NotTradingDate(NaiveDate),

    #[error("cannot shift {date} by {shift} trading days: calendar exhausted")]
    CalendarExhausted { date: NaiveDate, shift: i64 },

    #[error("no trading dates in [{bgn}, {stp})")]
    EmptyRange { bgn: NaiveDate, stp: NaiveDate },

    #[error("invalid simulation config: {0}")]
    Config(String),

    #[error("run aborted at {date}: {source}")]
    DayFailed {
        date: NaiveDate,
        #[source]
        source: Box<Error>,
    },

    #[cfg(feature = "persistence")]
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "persistence")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap an error raised while simulating `date`.
    pub fn at(self, date: NaiveDate) -> Self {
        match self {
            already @ Error::DayFailed { .. } => already,
            other => Error::DayFailed {
                date,
                source: Box::new(other),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Contract, Direction};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn display_close_exceeds() {
        let key = PositionKey::new(Contract::new("CU.SHF", "CU2506.SHF"), Direction::Long);
        let err = Error::CloseExceedsPosition {
            key,
            trade_qty: 7,
            position_qty: 5,
        };
        assert_eq!(err.to_string(), "trade qty 7 > pos qty 5 for CU2506.SHF/LONG");
    }

    #[test]
    fn at_wraps_once() {
        let err = Error::UnknownInstrument("XX.SHF".into()).at(d(2024, 3, 1));
        let err = err.at(d(2024, 3, 4));
        match &err {
            Error::DayFailed { date, source } => {
                assert_eq!(*date, d(2024, 3, 1));
                assert!(matches!(**source, Error::UnknownInstrument(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(err.to_string().starts_with("run aborted at 2024-03-01"));
    }
}
