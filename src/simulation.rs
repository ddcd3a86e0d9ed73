//! Simulation driver: one portfolio over a range of trading dates.
//!
//! The driver pairs every execution date T in `[bgn, stp)` with the
//! trading date before it as the signal date, decides for each day whether
//! it rebalances or only checks rollovers, and runs the portfolio's daily
//! update in chronological order.

use log::info;

use crate::calendar::Calendar;
use crate::error::{Error, Result};
use crate::portfolio::{
    AnnualMethod, CostModel, DayPlan, Feeds, NavMetrics, NavSnapshot, Portfolio, PositionRecord,
    PriceFields, TradeRecord, evaluate_nav,
};
use crate::types::TradeDate;

/// Parameters of one simulation run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimConfig {
    /// Portfolio id, used in logs and output file names
    pub id: String,
    /// First execution date (inclusive)
    pub bgn_date: TradeDate,
    /// Stop date (exclusive)
    pub stp_date: TradeDate,
    pub init_cash: f64,
    pub cost_model: CostModel,
    /// Rebalance every `hold_period` trading days
    pub hold_period: usize,
    /// Offset of the rebalance cycle, in trading days
    pub start_delay: usize,
    pub prices: PriceFields,
}

impl SimConfig {
    /// A config with zero costs, daily rebalancing, and default price fields.
    pub fn new(id: impl Into<String>, bgn_date: TradeDate, stp_date: TradeDate, init_cash: f64) -> Self {
        Self {
            id: id.into(),
            bgn_date,
            stp_date,
            init_cash,
            cost_model: CostModel::zero(),
            hold_period: 1,
            start_delay: 0,
            prices: PriceFields::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.init_cash.is_finite() && self.init_cash > 0.0) {
            return Err(Error::Config(format!("init_cash must be > 0, got {}", self.init_cash)));
        }
        if !self.cost_model.is_valid() {
            return Err(Error::Config(format!(
                "cost rate and reservation must be >= 0, got {} / {}",
                self.cost_model.rate, self.cost_model.reservation
            )));
        }
        if self.hold_period == 0 {
            return Err(Error::Config("hold_period must be >= 1".into()));
        }
        if self.bgn_date >= self.stp_date {
            return Err(Error::Config(format!(
                "bgn_date {} must be before stp_date {}",
                self.bgn_date, self.stp_date
            )));
        }
        Ok(())
    }

    pub fn schedule(&self) -> Schedule {
        Schedule::new(self.hold_period, self.start_delay)
    }
}

/// Rebalance periodicity: day `i` rebalances when
/// `(i - start_delay) mod hold_period == 0`, the modulo taken non-negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schedule {
    hold_period: usize,
    start_delay: usize,
}

impl Schedule {
    pub fn new(hold_period: usize, start_delay: usize) -> Self {
        Self {
            hold_period: hold_period.max(1),
            start_delay,
        }
    }

    #[inline]
    pub fn is_rebalance_day(&self, day_index: usize) -> bool {
        (day_index as i64 - self.start_delay as i64).rem_euclid(self.hold_period as i64) == 0
    }

    pub fn plan(&self, day_index: usize, sig_date: TradeDate) -> DayPlan {
        if self.is_rebalance_day(day_index) {
            DayPlan::Rebalance { sig_date }
        } else {
            DayPlan::Rollover
        }
    }
}

/// `(signal date, execution date)` pairs for every trading date in
/// `[bgn, stp)`. The first execution date needs a trading date before it.
pub fn date_pairs(calendar: &Calendar, bgn: TradeDate, stp: TradeDate) -> Result<Vec<(TradeDate, TradeDate)>> {
    let exe_dates = calendar.iter_dates(bgn, stp);
    let Some(&first) = exe_dates.first() else {
        return Err(Error::EmptyRange { bgn, stp });
    };
    let mut sig = calendar.shift(first, -1)?;
    let mut pairs = Vec::with_capacity(exe_dates.len());
    for &exe in exe_dates {
        pairs.push((sig, exe));
        sig = exe;
    }
    Ok(pairs)
}

/// Everything a finished run produced.
#[derive(Clone, Debug)]
pub struct SimulationResult {
    pub id: String,
    pub nav: Vec<NavSnapshot>,
    pub trades: Vec<TradeRecord>,
    pub positions: Vec<PositionRecord>,
}

impl SimulationResult {
    pub fn final_nav(&self) -> Option<f64> {
        self.nav.last().map(|s| s.nav)
    }

    pub fn navps(&self) -> Vec<f64> {
        self.nav.iter().map(|s| s.navps).collect()
    }

    pub fn evaluate(&self, annual_factor: f64, annual_rf: f64, method: AnnualMethod) -> Option<NavMetrics> {
        evaluate_nav(&self.navps(), annual_factor, annual_rf, method)
    }
}

/// A validated run, ready to go.
pub struct Simulation<'a> {
    config: SimConfig,
    calendar: &'a Calendar,
    feeds: Feeds<'a>,
}

impl<'a> Simulation<'a> {
    pub fn new(config: SimConfig, calendar: &'a Calendar, feeds: Feeds<'a>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            calendar,
            feeds,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Run every day of the range. The first failing day aborts the run
    /// with [`Error::DayFailed`].
    pub fn run(&self) -> Result<SimulationResult> {
        let cfg = &self.config;
        let pairs = date_pairs(self.calendar, cfg.bgn_date, cfg.stp_date)?;
        info!(
            "[{}] simulating {} trading days in [{}, {})",
            cfg.id,
            pairs.len(),
            cfg.bgn_date,
            cfg.stp_date
        );

        let schedule = cfg.schedule();
        let mut portfolio = Portfolio::new(cfg.id.clone(), cfg.init_cash, cfg.cost_model, cfg.prices);
        for (ti, &(sig_date, exe_date)) in pairs.iter().enumerate() {
            portfolio
                .run_day(exe_date, schedule.plan(ti, sig_date), &self.feeds)
                .map_err(|e| e.at(exe_date))?;
        }

        let (nav, trades, positions) = portfolio.into_records();
        if let Some(last) = nav.last() {
            info!(
                "[{}] finished at {}: nav {:.2}, navps {:.4}, {} trades",
                cfg.id,
                last.trade_date,
                last.nav,
                last.navps,
                trades.len()
            );
        }
        Ok(SimulationResult {
            id: cfg.id.clone(),
            nav,
            trades,
            positions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{MemoryInstruments, MemoryMajorContracts};
    use crate::market::{Bar, MemoryMarketData};
    use crate::signal::MemorySignals;

    fn d(day: u32) -> TradeDate {
        TradeDate::from_ymd_opt(2024, 4, day).unwrap()
    }

    fn calendar() -> Calendar {
        Calendar::new(vec![d(1), d(2), d(3), d(8), d(9), d(10), d(11)])
    }

    #[test]
    fn schedule_rem_euclid() {
        let s = Schedule::new(3, 1);
        let days: Vec<bool> = (0..7).map(|i| s.is_rebalance_day(i)).collect();
        assert_eq!(days, vec![false, true, false, false, true, false, false]);

        let daily = Schedule::new(1, 0);
        assert!((0..5).all(|i| daily.is_rebalance_day(i)));

        // delay larger than the period still cycles
        let s = Schedule::new(2, 3);
        assert!(s.is_rebalance_day(1));
        assert!(!s.is_rebalance_day(0));
    }

    #[test]
    fn pairs_lag_one_trading_day() {
        let cal = calendar();
        let pairs = date_pairs(&cal, d(3), d(10)).unwrap();
        assert_eq!(pairs, vec![(d(2), d(3)), (d(3), d(8)), (d(8), d(9))]);
    }

    #[test]
    fn pairs_need_a_predecessor() {
        let cal = calendar();
        assert!(matches!(
            date_pairs(&cal, d(1), d(3)),
            Err(Error::CalendarExhausted { .. })
        ));
        assert!(matches!(
            date_pairs(&cal, d(4), d(8)),
            Err(Error::EmptyRange { .. })
        ));
    }

    #[test]
    fn config_validation() {
        let ok = SimConfig::new("p", d(2), d(10), 1e6);
        assert!(ok.validate().is_ok());

        let mut bad = ok.clone();
        bad.init_cash = 0.0;
        assert!(matches!(bad.validate(), Err(Error::Config(_))));

        let mut bad = ok.clone();
        bad.hold_period = 0;
        assert!(bad.validate().is_err());

        let mut bad = ok.clone();
        bad.cost_model.rate = -0.001;
        assert!(bad.validate().is_err());

        let mut bad = ok;
        bad.stp_date = d(2);
        assert!(bad.validate().is_err());
    }

    struct World {
        market: MemoryMarketData,
        major: MemoryMajorContracts,
        instruments: MemoryInstruments,
        signals: MemorySignals,
    }

    fn world() -> World {
        let mut w = World {
            market: MemoryMarketData::new(),
            major: MemoryMajorContracts::new(),
            instruments: [("CU.SHF".to_string(), 10.0)].into_iter().collect(),
            signals: MemorySignals::new(),
        };
        for (i, date) in calendar().dates().iter().enumerate() {
            let px = 100.0 + i as f64;
            w.market.insert(
                *date,
                "CU2506.SHF",
                Bar {
                    open: px,
                    close: px,
                    ..Bar::default()
                },
            );
            w.major.insert("CU.SHF", *date, "CU2506.SHF");
            w.signals.push(*date, "CU.SHF", 0.5);
        }
        w
    }

    #[test]
    fn run_produces_one_snapshot_per_day() {
        let w = world();
        let cal = calendar();
        let feeds = Feeds::new(&w.market, &w.major, &w.instruments, &w.signals);
        let mut cfg = SimConfig::new("p", d(2), d(11), 1e6);
        cfg.hold_period = 2;
        let result = Simulation::new(cfg, &cal, feeds).unwrap().run().unwrap();

        let dates: Vec<TradeDate> = result.nav.iter().map(|s| s.trade_date).collect();
        assert_eq!(dates, vec![d(2), d(3), d(8), d(9), d(10)]);
        assert!(result.nav.iter().all(|s| s.long_qty > 0));
        assert!(result.final_nav().unwrap() > 1e6);
        for pair in result.nav.windows(2) {
            assert_eq!(pair[1].last_nav, pair[0].nav);
        }
        assert!(result.evaluate(250.0, 0.0, AnnualMethod::Linear).is_some());
    }

    #[test]
    fn failure_reports_the_day() {
        let mut w = world();
        // no mapping on the 9th: rollover lookup fails
        w.major = MemoryMajorContracts::new();
        for date in [d(1), d(2), d(3), d(8)] {
            w.major.insert("CU.SHF", date, "CU2506.SHF");
        }
        let cal = calendar();
        let feeds = Feeds::new(&w.market, &w.major, &w.instruments, &w.signals);
        let mut cfg = SimConfig::new("p", d(2), d(11), 1e6);
        cfg.hold_period = 5;
        let err = Simulation::new(cfg, &cal, feeds).unwrap().run().unwrap_err();
        match err {
            Error::DayFailed { date, source } => {
                assert_eq!(date, d(9));
                assert!(matches!(*source, Error::MissingContract { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
