//! CSV export of NAV tables and evaluation reports.

use std::path::Path;

use futsim::portfolio::metrics::percentile;
use futsim::{NavMetrics, NavSnapshot};

use crate::error::{Error, Result};

/// Write a NAV table as CSV, replacing the file.
///
/// Columns: trade_date, init_cash, cumulative_realized_pnl,
/// cumulative_cost, day_realized_pnl, day_cost, cumulative_unrealized_pnl,
/// last_nav, nav, navps, day_return, long_qty, short_qty, long_value,
/// short_value, n_positions
pub fn write_nav_csv(rows: &[NavSnapshot], path: &Path) -> Result<()> {
    let export_err = |source: csv::Error| Error::Export {
        path: path.to_path_buf(),
        source,
    };
    let mut wtr = csv::Writer::from_path(path).map_err(export_err)?;
    wtr.write_record([
        "trade_date",
        "init_cash",
        "cumulative_realized_pnl",
        "cumulative_cost",
        "day_realized_pnl",
        "day_cost",
        "cumulative_unrealized_pnl",
        "last_nav",
        "nav",
        "navps",
        "day_return",
        "long_qty",
        "short_qty",
        "long_value",
        "short_value",
        "n_positions",
    ])
    .map_err(export_err)?;

    for s in rows {
        wtr.write_record([
            &s.trade_date.format("%Y%m%d").to_string(),
            &format!("{:.2}", s.init_cash),
            &format!("{:.2}", s.cumulative_realized_pnl),
            &format!("{:.2}", s.cumulative_cost),
            &format!("{:.2}", s.day_realized_pnl),
            &format!("{:.2}", s.day_cost),
            &format!("{:.2}", s.cumulative_unrealized_pnl),
            &format!("{:.2}", s.last_nav),
            &format!("{:.2}", s.nav),
            &format!("{:.8}", s.navps),
            &format!("{:.8}", s.day_return),
            &s.long_qty.to_string(),
            &s.short_qty.to_string(),
            &format!("{:.2}", s.long_value),
            &format!("{:.2}", s.short_value),
            &s.n_positions.to_string(),
        ])
        .map_err(export_err)?;
    }
    wtr.flush()?;
    Ok(())
}

/// One evaluated portfolio.
pub struct EvalRow<'a> {
    pub id: &'a str,
    pub metrics: &'a NavMetrics,
    /// Per-period returns, for the percentile columns
    pub returns: &'a [f64],
}

/// Write one row of metrics per portfolio, with a `qNN` column for every
/// requested return percentile.
pub fn write_eval_csv(rows: &[EvalRow<'_>], quantiles: &[f64], path: &Path) -> Result<()> {
    let export_err = |source: csv::Error| Error::Export {
        path: path.to_path_buf(),
        source,
    };
    let mut wtr = csv::Writer::from_path(path).map_err(export_err)?;

    let mut header: Vec<String> = [
        "id", "obs", "return_mean", "return_std", "hold_period_return", "annual_return",
        "annual_volatility", "sharpe", "max_drawdown", "calmar", "score", "ldd", "lrd",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend(quantiles.iter().map(|q| format!("q{q:02}")));
    wtr.write_record(&header).map_err(export_err)?;

    for row in rows {
        let m = row.metrics;
        let mut record = vec![
            row.id.to_string(),
            m.obs.to_string(),
            format!("{:.6}", m.return_mean),
            format!("{:.6}", m.return_std),
            format!("{:.6}", m.hold_period_return),
            format!("{:.6}", m.annual_return),
            format!("{:.6}", m.annual_volatility),
            format!("{:.4}", m.sharpe),
            format!("{:.6}", m.max_drawdown),
            format!("{:.4}", m.calmar),
            format!("{:.4}", m.score),
            m.longest_drawdown_duration.to_string(),
            m.longest_recover_duration.to_string(),
        ];
        record.extend(
            quantiles
                .iter()
                .map(|&q| percentile(row.returns, q).map(|v| format!("{v:.6}")).unwrap_or_default()),
        );
        wtr.write_record(&record).map_err(export_err)?;
    }
    wtr.flush()?;
    Ok(())
}
