//! Orchestration: load inputs → simulate every portfolio → export → evaluate.

use std::path::Path;

use futsim::persistence::{Continuity, NavStore, export_run};
use futsim::portfolio::metrics::period_returns;
use futsim::portfolio::sweep::{Job, run_many};
use futsim::{Feeds, MemorySignals, NavMetrics, evaluate_nav};
use log::{error, info, warn};

use crate::config::{Config, PortfolioConfig};
use crate::data::{Inputs, load_signals};
use crate::error::{Error, Result};
use crate::export::{EvalRow, write_eval_csv, write_nav_csv};

/// Options for a simulation run.
#[derive(Debug, Default)]
pub struct RunOptions {
    /// Run only this portfolio id
    pub only: Option<String>,
    /// Simulate without writing any output
    pub dry_run: bool,
}

/// What happened to one portfolio.
#[derive(Debug)]
pub struct RunSummary {
    pub id: String,
    pub days: usize,
    pub trades: usize,
    pub final_nav: Option<f64>,
    /// `None` on a dry run
    pub continuity: Option<Continuity>,
}

impl RunSummary {
    pub fn refused(&self) -> bool {
        matches!(self.continuity, Some(c) if !c.is_continuous())
    }
}

fn select<'a>(config: &'a Config, only: Option<&str>) -> Result<Vec<&'a PortfolioConfig>> {
    match only {
        None => Ok(config.portfolios.iter().collect()),
        Some(id) => config
            .portfolio(id)
            .map(|p| vec![p])
            .ok_or_else(|| Error::Config(format!("no portfolio with id {id}"))),
    }
}

/// Simulate the selected portfolios in parallel and export each result.
///
/// Successful portfolios are exported even when another one failed; the
/// first failure is returned after that.
pub fn run(config: &Config, opts: &RunOptions) -> Result<Vec<RunSummary>> {
    let inputs = Inputs::load(config)?;
    let selected = select(config, opts.only.as_deref())?;

    let signals = selected
        .iter()
        .map(|p| load_signals(&config.data_path(&p.signals)))
        .collect::<Result<Vec<MemorySignals>>>()?;
    let jobs: Vec<Job<'_>> = selected
        .iter()
        .zip(&signals)
        .map(|(p, s)| Job::new(config.sim_config(p), s))
        .collect();

    let no_signals = MemorySignals::new();
    let shared = Feeds::new(&inputs.market, &inputs.major, &inputs.instruments, &no_signals);
    info!("running {} portfolio(s)", jobs.len());
    let results = run_many(&jobs, &inputs.calendar, shared);

    let out_dir = &config.output.dir;
    let mut summaries = Vec::with_capacity(results.len());
    let mut first_err = None;
    for (job, result) in jobs.iter().zip(results) {
        let result = match result {
            Ok(r) => r,
            Err(e) => {
                error!("[{}] {e}", job.config.id);
                first_err.get_or_insert(e);
                continue;
            }
        };

        let continuity = if opts.dry_run {
            None
        } else {
            let c = export_run(&result, out_dir, &inputs.calendar)?;
            if c.is_continuous() && config.output.nav_csv {
                let stored = NavStore::in_dir(out_dir, &result.id).load()?;
                write_nav_csv(&stored, &out_dir.join(format!("{}.nav.csv", result.id)))?;
            }
            Some(c)
        };

        summaries.push(RunSummary {
            id: result.id.clone(),
            days: result.nav.len(),
            trades: result.trades.len(),
            final_nav: result.final_nav(),
            continuity,
        });
    }

    match first_err {
        Some(e) => Err(e.into()),
        None => Ok(summaries),
    }
}

/// Evaluate the stored NAV of the selected portfolios and write
/// `evaluation.csv` to the output dir.
pub fn evaluate(config: &Config, only: Option<&str>) -> Result<Vec<(String, NavMetrics)>> {
    let ev = &config.evaluation;
    let out_dir = &config.output.dir;
    let mut evaluated = Vec::new();
    let mut returns = Vec::new();
    for p in select(config, only)? {
        let navps: Vec<f64> = NavStore::in_dir(out_dir, &p.id)
            .load()?
            .iter()
            .map(|s| s.navps)
            .collect();
        let Some(metrics) = evaluate_nav(&navps, ev.annual_factor, ev.annual_rf, ev.method) else {
            return Err(Error::NoNav(p.id.clone()));
        };
        returns.push(period_returns(&navps));
        evaluated.push((p.id.clone(), metrics));
    }

    let rows: Vec<EvalRow<'_>> = evaluated
        .iter()
        .zip(&returns)
        .map(|((id, metrics), rets)| EvalRow {
            id,
            metrics,
            returns: rets,
        })
        .collect();
    std::fs::create_dir_all(out_dir)?;
    write_eval_csv(&rows, &ev.quantiles, &out_dir.join("evaluation.csv"))?;
    Ok(evaluated)
}

/// Load every input table and signal file without simulating.
pub fn check(config: &Config) -> Result<()> {
    let inputs = Inputs::load(config)?;
    for p in &config.portfolios {
        let path = config.data_path(&p.signals);
        let signals = load_signals(&path)?;
        let n = signals.dates().count();
        if n == 0 {
            warn!("[{}] {} has no signal rows", p.id, path.display());
        }
        info!("[{}] {} signal dates", p.id, n);
    }
    let range = inputs
        .calendar
        .iter_dates(config.simulation.bgn_date, config.simulation.stp_date)
        .len();
    info!("{range} trading dates in the simulation range");
    Ok(())
}

/// The first portfolio whose NAV append was refused, as an error.
pub fn ensure_continuous(summaries: &[RunSummary]) -> Result<()> {
    match summaries.iter().find(|s| s.refused()) {
        Some(RunSummary {
            id,
            continuity: Some(c),
            ..
        }) => Err(Error::Discontinuous {
            id: id.clone(),
            detail: c.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Print a per-portfolio summary table.
pub fn print_summary(summaries: &[RunSummary], out_dir: &Path) {
    println!("\n{:<16} {:>6} {:>8} {:>18}  output", "portfolio", "days", "trades", "final nav");
    for s in summaries {
        let nav = s.final_nav.map(|v| format!("{v:.2}")).unwrap_or_default();
        let status = match s.continuity {
            None => "dry run".to_string(),
            Some(Continuity::Continuous) => format!("written to {}", out_dir.display()),
            Some(other) => format!("NOT appended ({other})"),
        };
        println!("{:<16} {:>6} {:>8} {:>18}  {status}", s.id, s.days, s.trades, nav);
    }
}
