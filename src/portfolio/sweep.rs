//! Independent portfolio runs in parallel.
//!
//! Each job owns its config and signal source; market data, the
//! major-contract table, instruments, and the calendar are shared
//! read-only. No state crosses jobs, so results come back in job order.

use crate::calendar::Calendar;
use crate::error::Result;
use crate::portfolio::Feeds;
use crate::signal::Signals;
use crate::simulation::{SimConfig, Simulation, SimulationResult};

/// One portfolio to simulate.
pub struct Job<'a> {
    pub config: SimConfig,
    pub signals: &'a (dyn Signals + Sync),
}

impl<'a> Job<'a> {
    pub fn new(config: SimConfig, signals: &'a (dyn Signals + Sync)) -> Self {
        Self { config, signals }
    }
}

/// Run every job on the rayon pool.
///
/// `shared` supplies market data, major contracts, and instruments; its
/// signal source is replaced by each job's own. A failing job does not
/// stop the others.
///
/// # Example
///
/// ```ignore
/// use futsim::portfolio::sweep::{Job, run_many};
///
/// let jobs = vec![Job::new(cfg_a, &signals_a), Job::new(cfg_b, &signals_b)];
/// for result in run_many(&jobs, &calendar, feeds) {
///     println!("{:?}", result.map(|r| r.final_nav()));
/// }
/// ```
pub fn run_many(jobs: &[Job<'_>], calendar: &Calendar, shared: Feeds<'_>) -> Vec<Result<SimulationResult>> {
    use rayon::prelude::*;

    jobs.par_iter()
        .map(|job| {
            let feeds = shared.with_signals(job.signals);
            Simulation::new(job.config.clone(), calendar, feeds)?.run()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{MemoryInstruments, MemoryMajorContracts};
    use crate::error::Error;
    use crate::market::{Bar, MemoryMarketData};
    use crate::signal::MemorySignals;
    use crate::types::TradeDate;

    fn d(day: u32) -> TradeDate {
        TradeDate::from_ymd_opt(2024, 7, day).unwrap()
    }

    #[test]
    fn jobs_run_independently() {
        let cal = Calendar::new((1..=10).map(d).collect());
        let mut market = MemoryMarketData::new();
        let mut major = MemoryMajorContracts::new();
        let mut long = MemorySignals::new();
        let mut short = MemorySignals::new();
        for (i, date) in cal.dates().iter().enumerate() {
            let px = 100.0 + i as f64;
            market.insert(*date, "CU2509.SHF", Bar { open: px, close: px, ..Bar::default() });
            major.insert("CU.SHF", *date, "CU2509.SHF");
            long.push(*date, "CU.SHF", 0.5);
            short.push(*date, "CU.SHF", -0.5);
        }
        let instruments: MemoryInstruments = [("CU.SHF".to_string(), 10.0)].into_iter().collect();
        let empty = MemorySignals::new();
        let shared = Feeds::new(&market, &major, &instruments, &empty);

        let mut bad = SimConfig::new("bad", d(2), d(10), 1e6);
        bad.hold_period = 0;
        let jobs = vec![
            Job::new(SimConfig::new("long", d(2), d(10), 1e6), &long),
            Job::new(SimConfig::new("short", d(2), d(10), 1e6), &short),
            Job::new(bad, &long),
        ];
        let results = run_many(&jobs, &cal, shared);
        assert_eq!(results.len(), 3);

        let long_nav = results[0].as_ref().unwrap().final_nav().unwrap();
        let short_nav = results[1].as_ref().unwrap().final_nav().unwrap();
        assert!(long_nav > 1e6);
        assert!(short_nav < 1e6);
        assert_eq!(results[0].as_ref().unwrap().id, "long");
        assert!(matches!(results[2], Err(Error::Config(_))));
    }

    #[test]
    fn no_jobs() {
        let cal = Calendar::default();
        let market = MemoryMarketData::new();
        let major = MemoryMajorContracts::new();
        let instruments = MemoryInstruments::new();
        let signals = MemorySignals::new();
        let shared = Feeds::new(&market, &major, &instruments, &signals);
        assert!(run_many(&[], &cal, shared).is_empty());
    }
}
