//! TOML configuration loading and validation.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use futsim::{AnnualMethod, CostModel, PriceField, PriceFields, SimConfig};
use rustc_hash::FxHashSet;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(rename = "portfolio")]
    pub portfolios: Vec<PortfolioConfig>,
}

/// Settings shared by every portfolio unless overridden.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    pub bgn_date: NaiveDate,
    /// Exclusive
    pub stp_date: NaiveDate,
    #[serde(default = "default_init_cash")]
    pub init_cash: f64,
    #[serde(default)]
    pub cost_rate: f64,
    #[serde(default)]
    pub cost_reservation: f64,
    #[serde(default = "default_hold_period")]
    pub hold_period: usize,
    #[serde(default)]
    pub start_delay: usize,
    #[serde(default = "default_sig_price")]
    pub sig_price: PriceField,
    #[serde(default = "default_exe_price")]
    pub exe_price: PriceField,
    #[serde(default = "default_settle_price")]
    pub settle_price: PriceField,
}

fn default_init_cash() -> f64 {
    10_000_000.0
}
fn default_hold_period() -> usize {
    1
}
fn default_sig_price() -> PriceField {
    PriceField::Close
}
fn default_exe_price() -> PriceField {
    PriceField::Open
}
fn default_settle_price() -> PriceField {
    PriceField::Close
}

/// Where the input tables live. File names are relative to `dir`.
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_calendar")]
    pub calendar: String,
    #[serde(default = "default_market")]
    pub market: String,
    #[serde(default = "default_major")]
    pub major: String,
    #[serde(default = "default_instruments")]
    pub instruments: String,
}

fn default_data_dir() -> PathBuf {
    "./data".into()
}
fn default_calendar() -> String {
    "calendar.csv".into()
}
fn default_market() -> String {
    "market.csv".into()
}
fn default_major() -> String {
    "major.csv".into()
}
fn default_instruments() -> String {
    "instruments.csv".into()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            calendar: default_calendar(),
            market: default_market(),
            major: default_major(),
            instruments: default_instruments(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Also write `{id}.nav.csv` next to the JSONL files
    #[serde(default = "default_true")]
    pub nav_csv: bool,
}

fn default_output_dir() -> PathBuf {
    "./output".into()
}
fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            nav_csv: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default = "default_annual_factor")]
    pub annual_factor: f64,
    #[serde(default)]
    pub annual_rf: f64,
    #[serde(default)]
    pub method: AnnualMethod,
    /// Return percentiles to report, in 0..=100
    #[serde(default)]
    pub quantiles: Vec<f64>,
}

fn default_annual_factor() -> f64 {
    250.0
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            annual_factor: default_annual_factor(),
            annual_rf: 0.0,
            method: AnnualMethod::Linear,
            quantiles: Vec::new(),
        }
    }
}

/// One portfolio: an id, its signal file, and optional overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioConfig {
    pub id: String,
    /// Signal CSV, relative to the data dir
    pub signals: String,
    pub hold_period: Option<usize>,
    pub start_delay: Option<usize>,
    pub cost_rate: Option<f64>,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    pub fn validate(&self) -> Result<()> {
        if self.portfolios.is_empty() {
            return Err(Error::Config("at least one [[portfolio]] is required".into()));
        }
        let mut seen = FxHashSet::default();
        for p in &self.portfolios {
            if p.id.is_empty() {
                return Err(Error::Config("portfolio id must not be empty".into()));
            }
            if !seen.insert(p.id.as_str()) {
                return Err(Error::Config(format!("duplicate portfolio id {}", p.id)));
            }
            self.sim_config(p).validate()?;
        }
        if !(self.evaluation.annual_factor > 0.0) {
            return Err(Error::Config("annual_factor must be > 0".into()));
        }
        if self.evaluation.quantiles.iter().any(|q| !(0.0..=100.0).contains(q)) {
            return Err(Error::Config("quantiles must be in [0, 100]".into()));
        }
        Ok(())
    }

    /// The library config of one portfolio, overrides applied.
    pub fn sim_config(&self, p: &PortfolioConfig) -> SimConfig {
        let s = &self.simulation;
        SimConfig {
            id: p.id.clone(),
            bgn_date: s.bgn_date,
            stp_date: s.stp_date,
            init_cash: s.init_cash,
            cost_model: CostModel {
                rate: p.cost_rate.unwrap_or(s.cost_rate),
                reservation: s.cost_reservation,
            },
            hold_period: p.hold_period.unwrap_or(s.hold_period),
            start_delay: p.start_delay.unwrap_or(s.start_delay),
            prices: PriceFields {
                sig: s.sig_price,
                exe: s.exe_price,
                settle: s.settle_price,
            },
        }
    }

    pub fn portfolio(&self, id: &str) -> Option<&PortfolioConfig> {
        self.portfolios.iter().find(|p| p.id == id)
    }

    /// Path of an input file named in `[data]` or `[[portfolio]]`.
    pub fn data_path(&self, name: &str) -> PathBuf {
        self.data.dir.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_toml() -> &'static str {
        r#"
[simulation]
bgn_date = "2024-01-03"
stp_date = "2024-07-01"
init_cash = 1000000.0
cost_rate = 0.0005
cost_reservation = 0.05
hold_period = 5
exe_price = "open"
settle_price = "settle"

[data]
dir = "./data"

[output]
dir = "./out"

[evaluation]
method = "compound"
quantiles = [1.0, 5.0]

[[portfolio]]
id = "trend"
signals = "signals/trend.csv"

[[portfolio]]
id = "carry"
signals = "signals/carry.csv"
hold_period = 10
cost_rate = 0.0
"#
    }

    #[test]
    fn parse_example_config() {
        let config: Config = toml::from_str(example_toml()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.portfolios.len(), 2);
        assert_eq!(config.simulation.settle_price, PriceField::Settle);
        assert_eq!(config.simulation.sig_price, PriceField::Close);
        assert_eq!(config.evaluation.method, AnnualMethod::Compound);
        assert_eq!(config.evaluation.annual_factor, 250.0);
        assert!(config.output.nav_csv);
        assert_eq!(config.data.calendar, "calendar.csv");
    }

    #[test]
    fn shipped_example_config_is_valid() {
        let config: Config = toml::from_str(include_str!("../config.example.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.portfolios.len(), 2);
        assert_eq!(config.portfolio("carry").unwrap().hold_period, Some(5));
    }

    #[test]
    fn overrides_apply_per_portfolio() {
        let config: Config = toml::from_str(example_toml()).unwrap();
        let trend = config.sim_config(&config.portfolios[0]);
        let carry = config.sim_config(&config.portfolios[1]);
        assert_eq!(trend.hold_period, 5);
        assert_eq!(trend.cost_model.rate, 0.0005);
        assert_eq!(carry.hold_period, 10);
        assert_eq!(carry.cost_model.rate, 0.0);
        assert_eq!(carry.cost_model.reservation, 0.05);
        assert_eq!(carry.prices.exe, PriceField::Open);
    }

    #[test]
    fn data_path_joins_dir() {
        let config: Config = toml::from_str(example_toml()).unwrap();
        assert_eq!(
            config.data_path("signals/trend.csv"),
            PathBuf::from("./data/signals/trend.csv")
        );
    }

    #[test]
    fn validate_catches_duplicate_ids() {
        let mut config: Config = toml::from_str(example_toml()).unwrap();
        config.portfolios[1].id = "trend".into();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn validate_catches_bad_simulation() {
        let mut config: Config = toml::from_str(example_toml()).unwrap();
        config.simulation.hold_period = 0;
        assert!(matches!(config.validate(), Err(Error::Sim(_))));

        let mut config: Config = toml::from_str(example_toml()).unwrap();
        config.simulation.stp_date = config.simulation.bgn_date;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_bad_evaluation() {
        let mut config: Config = toml::from_str(example_toml()).unwrap();
        config.evaluation.quantiles.push(101.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_price_field_rejected() {
        let toml = example_toml().replace("\"settle\"", "\"vwap\"");
        assert!(toml::from_str::<Config>(&toml).is_err());
    }
}
