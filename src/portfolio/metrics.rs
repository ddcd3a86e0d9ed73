//! Performance evaluation of a NAV series.

/// How [`NavMetrics::annual_return`] is annualized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AnnualMethod {
    /// `mean(return) × factor`
    #[default]
    Linear,
    /// `nav_last ^ (factor / obs) - 1`
    Compound,
}

/// Computed performance metrics for a NAV series.
///
/// The series is normalized to start at 1; the return of the first
/// observation is taken as zero. Index fields are positions in the input
/// slice.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NavMetrics {
    /// Number of observations
    pub obs: usize,
    /// Mean per-period return
    pub return_mean: f64,
    /// Sample standard deviation of per-period returns
    pub return_std: f64,
    /// Last normalized NAV minus one
    pub hold_period_return: f64,
    pub annual_return: f64,
    /// `return_std × sqrt(factor)`
    pub annual_volatility: f64,
    /// Annualized Sharpe ratio of returns in excess of the per-period risk-free rate
    pub sharpe: f64,
    /// Largest `1 - nav / running_max`, as a positive fraction
    pub max_drawdown: f64,
    pub max_drawdown_idx: usize,
    /// annual_return / max_drawdown
    pub calmar: f64,
    /// sharpe + calmar
    pub score: f64,
    /// Longest span, in periods, from a running high to the deepest point after it
    pub longest_drawdown_duration: usize,
    pub longest_drawdown_idx: usize,
    /// Longest span, in periods, spent below a running high
    pub longest_recover_duration: usize,
    pub longest_recover_idx: usize,
}

impl std::fmt::Display for NavMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "NAV Evaluation ({} obs)", self.obs)?;
        writeln!(f, "  Return mean:     {:>8.3}%", self.return_mean * 100.0)?;
        writeln!(f, "  Return std:      {:>8.3}%", self.return_std * 100.0)?;
        writeln!(f, "  Hold period:     {:>8.2}%", self.hold_period_return * 100.0)?;
        writeln!(f, "  Annual return:   {:>8.2}%", self.annual_return * 100.0)?;
        writeln!(f, "  Annual vol:      {:>8.2}%", self.annual_volatility * 100.0)?;
        writeln!(f, "  Sharpe:          {:>8.3}", self.sharpe)?;
        writeln!(f, "  Max drawdown:    {:>8.3}%", self.max_drawdown * 100.0)?;
        writeln!(f, "  Calmar:          {:>8.3}", self.calmar)?;
        writeln!(f, "  Score:           {:>8.3}", self.score)?;
        writeln!(f, "  Longest dd:      {:>8}", self.longest_drawdown_duration)?;
        write!(f, "  Longest recover: {:>8}", self.longest_recover_duration)
    }
}

/// Evaluate a NAV (or NAV-per-share) series.
///
/// # Arguments
///
/// * `nav`: NAV observations, one per period; need not start at 1
/// * `annual_factor`: periods per year (250 for daily, 50 for weekly)
/// * `annual_rf`: annualized risk-free rate
/// * `method`: annualization of the mean return
///
/// Returns `None` if `nav` is empty or its first value is not a positive
/// finite number. Ratios with a zero denominator are reported as 0.
pub fn evaluate_nav(nav: &[f64], annual_factor: f64, annual_rf: f64, method: AnnualMethod) -> Option<NavMetrics> {
    let first = *nav.first()?;
    if !(first.is_finite() && first > 0.0) {
        return None;
    }
    let obs = nav.len();
    let norm: Vec<f64> = nav.iter().map(|v| v / first).collect();
    let returns = period_returns(&norm);

    let return_mean = mean(&returns);
    let return_std = sample_std(&returns);
    let hold_period_return = norm[obs - 1] - 1.0;

    let annual_return = match method {
        AnnualMethod::Linear => return_mean * annual_factor,
        AnnualMethod::Compound => norm[obs - 1].powf(annual_factor / obs as f64) - 1.0,
    };
    let annual_volatility = return_std * annual_factor.sqrt();

    let rf = annual_rf / annual_factor;
    let excess: Vec<f64> = returns.iter().map(|r| r - rf).collect();
    let excess_sd = sample_std(&excess);
    let sharpe = if excess_sd > 0.0 {
        mean(&excess) / excess_sd * annual_factor.sqrt()
    } else {
        0.0
    };

    let (max_drawdown, max_drawdown_idx) = max_drawdown(&norm);
    let calmar = if max_drawdown > 0.0 {
        annual_return / max_drawdown
    } else {
        0.0
    };

    let (longest_drawdown_duration, longest_drawdown_idx) = longest_drawdown(&norm);
    let (longest_recover_duration, longest_recover_idx) = longest_recover(&norm);

    Some(NavMetrics {
        obs,
        return_mean,
        return_std,
        hold_period_return,
        annual_return,
        annual_volatility,
        sharpe,
        max_drawdown,
        max_drawdown_idx,
        calmar,
        score: sharpe + calmar,
        longest_drawdown_duration,
        longest_drawdown_idx,
        longest_recover_duration,
        longest_recover_idx,
    })
}

/// Percentile `q` (0..=100) of `values`, linearly interpolated between
/// closest ranks. Returns `None` for an empty slice.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Per-period returns of a NAV series; the first period is 0.
pub fn period_returns(nav: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(nav.len());
    if nav.is_empty() {
        return out;
    }
    out.push(0.0);
    out.extend(nav.windows(2).map(|w| w[1] / w[0] - 1.0));
    out
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

fn sample_std(xs: &[f64]) -> f64 {
    let n = xs.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(xs);
    (xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
}

fn max_drawdown(nav: &[f64]) -> (f64, usize) {
    let mut peak = f64::MIN;
    let mut worst = (0.0, 0);
    for (i, &v) in nav.iter().enumerate() {
        peak = peak.max(v);
        let dd = 1.0 - v / peak;
        if dd > worst.0 {
            worst = (dd, i);
        }
    }
    worst
}

fn longest_drawdown(nav: &[f64]) -> (usize, usize) {
    let mut high = nav[0];
    let mut high_loc = 0usize;
    let mut deepest = 0.0;
    let mut deepest_loc = 0usize;
    let mut best = (0, 0);
    for (i, &v) in nav.iter().enumerate() {
        if v > high {
            high = v;
            high_loc = i;
            deepest = 0.0;
        }
        let dd = 1.0 - v / high;
        if dd > deepest {
            deepest = dd;
            deepest_loc = i;
        }
        let span = deepest_loc.saturating_sub(high_loc);
        if span > best.0 {
            best = (span, i);
        }
    }
    best
}

fn longest_recover(nav: &[f64]) -> (usize, usize) {
    let mut high = nav[0];
    let mut high_loc = 0usize;
    let mut best = (0, 0);
    for (i, &v) in nav.iter().enumerate() {
        if v > high {
            high = v;
            high_loc = i;
            continue;
        }
        let span = i - high_loc;
        if span > best.0 {
            best = (span, i);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_or_bad_start() {
        assert!(evaluate_nav(&[], 250.0, 0.0, AnnualMethod::Linear).is_none());
        assert!(evaluate_nav(&[0.0, 1.0], 250.0, 0.0, AnnualMethod::Linear).is_none());
        assert!(evaluate_nav(&[f64::NAN], 250.0, 0.0, AnnualMethod::Linear).is_none());
    }

    #[test]
    fn normalizes_to_first() {
        let m = evaluate_nav(&[2.0, 2.2, 2.42], 250.0, 0.0, AnnualMethod::Linear).unwrap();
        assert_eq!(m.obs, 3);
        assert!((m.hold_period_return - 0.21).abs() < 1e-12);
        // returns [0, 0.1, 0.1]
        assert!((m.return_mean - 0.2 / 3.0).abs() < 1e-12);
        assert!((m.annual_return - 250.0 * 0.2 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn compound_annual_return() {
        let nav = [1.0, 1.01, 1.0201, 1.030301];
        let m = evaluate_nav(&nav, 4.0, 0.0, AnnualMethod::Compound).unwrap();
        // 1.030301 ^ (4/4) - 1
        assert!((m.annual_return - 0.030301).abs() < 1e-12);
    }

    #[test]
    fn max_drawdown_and_calmar() {
        // 1.0 -> 1.1 -> 0.88 -> 0.924
        let nav = [1.0, 1.1, 0.88, 0.924];
        let m = evaluate_nav(&nav, 250.0, 0.0, AnnualMethod::Linear).unwrap();
        assert!((m.max_drawdown - 0.2).abs() < 1e-12);
        assert_eq!(m.max_drawdown_idx, 2);
        assert!((m.calmar - m.annual_return / m.max_drawdown).abs() < 1e-12);
        assert!((m.score - (m.sharpe + m.calmar)).abs() < 1e-12);
    }

    #[test]
    fn flat_series_has_zero_ratios() {
        let m = evaluate_nav(&[1.0; 5], 250.0, 0.0, AnnualMethod::Linear).unwrap();
        assert_eq!(m.sharpe, 0.0);
        assert_eq!(m.calmar, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
    }

    #[test]
    fn sharpe_sign_follows_returns() {
        let up = [1.0, 1.01, 1.015, 1.03, 1.035];
        let m = evaluate_nav(&up, 250.0, 0.0, AnnualMethod::Linear).unwrap();
        assert!(m.sharpe > 0.0);
        let m_rf = evaluate_nav(&up, 250.0, 0.5, AnnualMethod::Linear).unwrap();
        assert!(m_rf.sharpe < m.sharpe);
    }

    #[test]
    fn durations() {
        // high at 1, trough at 4, back above the high at 6
        let nav = [1.0, 1.2, 1.1, 1.0, 0.9, 1.1, 1.3];
        let m = evaluate_nav(&nav, 250.0, 0.0, AnnualMethod::Linear).unwrap();
        assert_eq!(m.longest_drawdown_duration, 3);
        assert_eq!(m.longest_drawdown_idx, 4);
        assert_eq!(m.longest_recover_duration, 4);
        assert_eq!(m.longest_recover_idx, 5);
    }

    #[test]
    fn percentile_interpolates() {
        let xs = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(percentile(&xs, 0.0), Some(1.0));
        assert_eq!(percentile(&xs, 100.0), Some(4.0));
        assert!((percentile(&xs, 50.0).unwrap() - 2.5).abs() < 1e-12);
        assert!(percentile(&[], 5.0).is_none());
    }

    #[test]
    fn display_format() {
        let m = evaluate_nav(&[1.0, 1.01, 0.99], 250.0, 0.0, AnnualMethod::Linear).unwrap();
        let s = format!("{m}");
        assert!(s.contains("Sharpe:"));
        assert!(s.contains("Max drawdown:"));
        assert!(s.contains("Longest recover:"));
    }
}
