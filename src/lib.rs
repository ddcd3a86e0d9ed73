//! # futsim
//!
//! A deterministic end-of-day futures portfolio simulator with position and
//! trade accounting.
//!
//! ## Features
//!
//! - **Signal-driven rebalancing**: signed weights observed on T-1 become
//!   target lots executed on T
//! - **Major-contract rollover**: positions follow their instrument's
//!   active contract on non-rebalance days
//! - **Full ledger**: realized/unrealized PnL, costs on every trade, daily
//!   NAV snapshots, trade ledger, and position history
//! - **All-or-nothing days**: a failing day leaves the book untouched and
//!   aborts the run with the date attached
//! - **Deterministic**: books are ordered maps, so every ledger comes out
//!   in the same order on every run
//!
//! ## Quick Start
//!
//! ```
//! use futsim::{
//!     Bar, Calendar, Feeds, MemoryInstruments, MemoryMajorContracts, MemoryMarketData,
//!     MemorySignals, SimConfig, Simulation,
//! };
//! use chrono::NaiveDate;
//!
//! let dates: Vec<NaiveDate> = (2..=6).map(|d| NaiveDate::from_ymd_opt(2024, 9, d).unwrap()).collect();
//! let calendar = Calendar::new(dates.clone());
//!
//! let mut market = MemoryMarketData::new();
//! let mut major = MemoryMajorContracts::new();
//! let mut signals = MemorySignals::new();
//! for (i, date) in dates.iter().enumerate() {
//!     let px = 100.0 + i as f64;
//!     market.insert(*date, "CU2511.SHF", Bar { open: px, close: px, ..Bar::default() });
//!     major.insert("CU.SHF", *date, "CU2511.SHF");
//!     signals.push(*date, "CU.SHF", 0.8);
//! }
//! let instruments: MemoryInstruments = [("CU.SHF".to_string(), 10.0)].into_iter().collect();
//!
//! let feeds = Feeds::new(&market, &major, &instruments, &signals);
//! let config = SimConfig::new("demo", dates[1], dates[4], 1_000_000.0);
//! let result = Simulation::new(config, &calendar, feeds).unwrap().run().unwrap();
//!
//! assert_eq!(result.nav.len(), 3);
//! assert!(result.final_nav().unwrap() > 1_000_000.0);
//! ```
//!
//! ## Money and quantities
//!
//! Prices and money are `f64`; quantities are whole lots (`u64`) and the
//! direction of a position lives in its key, never in the sign of the
//! quantity. Lot counts are rounded half away from zero.
//!
//! ## Cargo features
//!
//! | Feature | Enables |
//! |---------|---------|
//! | `serde` | `Serialize`/`Deserialize` on value types and records |
//! | `persistence` (default) | JSON Lines export with NAV continuity checks |
//! | `parallel` | [`portfolio::sweep::run_many`] on a rayon pool |

pub mod calendar;
pub mod contracts;
mod error;
pub mod market;
#[cfg(feature = "persistence")]
pub mod persistence;
pub mod portfolio;
pub mod rebalance;
pub mod signal;
pub mod simulation;
pub mod target;
mod trade;
mod types;

// Re-export public API
pub use calendar::Calendar;
pub use contracts::{Instruments, MajorContracts, MemoryInstruments, MemoryMajorContracts};
pub use error::{Error, Result};
pub use market::{Bar, MarketData, MemoryMarketData};
pub use portfolio::{
    Account, AnnualMethod, Book, CostModel, DayPlan, Feeds, NavMetrics, NavSnapshot, Portfolio,
    Position, PositionRecord, PriceFields, TradeOutcome, TradeRecord, evaluate_nav,
};
pub use signal::{MemorySignals, SignalRow, Signals};
pub use simulation::{SimConfig, Simulation, SimulationResult};
pub use trade::Trade;
pub use types::{Contract, Direction, Offset, PositionKey, PriceField, TradeDate};
