//! CSV input tables loaded into the in-memory collaborators.
//!
//! | File | Columns |
//! |------|---------|
//! | calendar | `trade_date` |
//! | market | `trade_date, contract, open, high, low, close, settle, pre_close, pre_settle, volume, amount, oi` |
//! | major | `trade_date, instrument, contract` |
//! | instruments | `instrument, multiplier` |
//! | signals | `trade_date, instrument, weight` |
//!
//! Dates are `YYYY-MM-DD` or `YYYYMMDD`. Empty or absent market fields
//! load as missing.

use std::path::Path;

use chrono::NaiveDate;
use futsim::{Bar, Calendar, MemoryInstruments, MemoryMajorContracts, MemoryMarketData, MemorySignals};
use log::info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::config::Config;
use crate::error::{Error, Result};

/// Parse `YYYY-MM-DD` or `YYYYMMDD`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
        .ok()
}

fn de_date<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<NaiveDate, D::Error> {
    let s = String::deserialize(d)?;
    parse_date(&s).ok_or_else(|| serde::de::Error::custom(format!("bad trade date {s:?}")))
}

#[derive(Debug, Deserialize)]
struct CalendarRow {
    #[serde(deserialize_with = "de_date")]
    trade_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct MarketRow {
    #[serde(deserialize_with = "de_date")]
    trade_date: NaiveDate,
    contract: String,
    #[serde(default)]
    open: Option<f64>,
    #[serde(default)]
    high: Option<f64>,
    #[serde(default)]
    low: Option<f64>,
    #[serde(default)]
    close: Option<f64>,
    #[serde(default)]
    settle: Option<f64>,
    #[serde(default)]
    pre_close: Option<f64>,
    #[serde(default)]
    pre_settle: Option<f64>,
    #[serde(default)]
    volume: Option<f64>,
    #[serde(default)]
    amount: Option<f64>,
    #[serde(default)]
    oi: Option<f64>,
}

impl MarketRow {
    fn bar(&self) -> Bar {
        let v = |x: Option<f64>| x.unwrap_or(f64::NAN);
        Bar {
            pre_close: v(self.pre_close),
            pre_settle: v(self.pre_settle),
            open: v(self.open),
            high: v(self.high),
            low: v(self.low),
            close: v(self.close),
            settle: v(self.settle),
            volume: v(self.volume),
            amount: v(self.amount),
            oi: v(self.oi),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MajorRow {
    #[serde(deserialize_with = "de_date")]
    trade_date: NaiveDate,
    instrument: String,
    contract: String,
}

#[derive(Debug, Deserialize)]
struct InstrumentRow {
    instrument: String,
    multiplier: f64,
}

#[derive(Debug, Deserialize)]
struct SignalCsvRow {
    #[serde(deserialize_with = "de_date")]
    trade_date: NaiveDate,
    instrument: String,
    weight: f64,
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let read_err = |source: csv::Error| Error::DataRead {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = csv::Reader::from_path(path).map_err(read_err)?;
    rdr.deserialize().map(|row| row.map_err(read_err)).collect()
}

pub fn load_calendar(path: &Path) -> Result<Calendar> {
    let rows: Vec<CalendarRow> = read_rows(path)?;
    let calendar = Calendar::new(rows.into_iter().map(|r| r.trade_date).collect());
    if calendar.is_empty() {
        return Err(Error::Data {
            path: path.to_path_buf(),
            msg: "no trading dates".into(),
        });
    }
    Ok(calendar)
}

pub fn load_market(path: &Path) -> Result<MemoryMarketData> {
    let mut market = MemoryMarketData::new();
    for row in read_rows::<MarketRow>(path)? {
        let bar = row.bar();
        market.insert(row.trade_date, row.contract, bar);
    }
    Ok(market)
}

pub fn load_major(path: &Path) -> Result<MemoryMajorContracts> {
    let mut major = MemoryMajorContracts::new();
    for row in read_rows::<MajorRow>(path)? {
        major.insert(row.instrument, row.trade_date, row.contract);
    }
    Ok(major)
}

pub fn load_instruments(path: &Path) -> Result<MemoryInstruments> {
    let mut instruments = MemoryInstruments::new();
    for row in read_rows::<InstrumentRow>(path)? {
        if !(row.multiplier.is_finite() && row.multiplier > 0.0) {
            return Err(Error::Data {
                path: path.to_path_buf(),
                msg: format!("multiplier of {} must be > 0, got {}", row.instrument, row.multiplier),
            });
        }
        instruments.insert(row.instrument, row.multiplier);
    }
    Ok(instruments)
}

pub fn load_signals(path: &Path) -> Result<MemorySignals> {
    let mut signals = MemorySignals::new();
    for row in read_rows::<SignalCsvRow>(path)? {
        signals.push(row.trade_date, row.instrument, row.weight);
    }
    Ok(signals)
}

/// Tables shared by every portfolio of a run.
pub struct Inputs {
    pub calendar: Calendar,
    pub market: MemoryMarketData,
    pub major: MemoryMajorContracts,
    pub instruments: MemoryInstruments,
}

impl Inputs {
    pub fn load(config: &Config) -> Result<Self> {
        let data = &config.data;
        let calendar = load_calendar(&config.data_path(&data.calendar))?;
        let market = load_market(&config.data_path(&data.market))?;
        let major = load_major(&config.data_path(&data.major))?;
        let instruments = load_instruments(&config.data_path(&data.instruments))?;
        info!(
            "loaded {} trading dates, {} bars, {} instruments with major contracts",
            calendar.len(),
            market.len(),
            major.instruments()
        );
        Ok(Self {
            calendar,
            market,
            major,
            instruments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futsim::{Instruments, MajorContracts, MarketData, PriceField, Signals};

    fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn both_date_formats() {
        assert_eq!(parse_date("2024-01-03"), parse_date("20240103"));
        assert!(parse_date("03/01/2024").is_none());
    }

    #[test]
    fn calendar_sorted_and_nonempty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "cal.csv", "trade_date\n20240104\n20240103\n");
        let cal = load_calendar(&path).unwrap();
        assert_eq!(cal.first_date(), Some(d("2024-01-03")));

        let empty = write(dir.path(), "empty.csv", "trade_date\n");
        assert!(matches!(load_calendar(&empty), Err(Error::Data { .. })));
    }

    #[test]
    fn market_missing_fields_backfill() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "md.csv",
            "trade_date,contract,open,close,settle\n\
             2024-01-03,CU2503.SHF,,,70000\n\
             2024-01-04,CU2503.SHF,70100,70200,70150\n",
        );
        let md = load_market(&path).unwrap();
        assert_eq!(md.len(), 2);
        assert_eq!(md.price(d("2024-01-03"), "CU2503.SHF", PriceField::Open), 70000.0);
        assert_eq!(md.price(d("2024-01-04"), "CU2503.SHF", PriceField::Close), 70200.0);
        assert!(md.price(d("2024-01-04"), "CU2503.SHF", PriceField::High).is_nan());
    }

    #[test]
    fn major_and_instruments() {
        let dir = tempfile::tempdir().unwrap();
        let major = write(
            dir.path(),
            "major.csv",
            "trade_date,instrument,contract\n2024-01-03,CU.SHF,CU2503.SHF\n",
        );
        let major = load_major(&major).unwrap();
        assert_eq!(major.active_contract(d("2024-01-03"), "CU.SHF").unwrap(), "CU2503.SHF");

        let ins = write(dir.path(), "ins.csv", "instrument,multiplier\nCU.SHF,5\n");
        assert_eq!(load_instruments(&ins).unwrap().multiplier("CU.SHF").unwrap(), 5.0);

        let bad = write(dir.path(), "bad.csv", "instrument,multiplier\nCU.SHF,0\n");
        assert!(matches!(load_instruments(&bad), Err(Error::Data { .. })));
    }

    #[test]
    fn signals_grouped_by_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "sig.csv",
            "trade_date,instrument,weight\n\
             2024-01-03,CU.SHF,0.4\n\
             2024-01-03,AL.SHF,-0.2\n\
             2024-01-04,CU.SHF,0.5\n",
        );
        let sig = load_signals(&path).unwrap();
        assert_eq!(sig.signal(d("2024-01-03")).len(), 2);
        assert_eq!(sig.signal(d("2024-01-04")).len(), 1);
        assert!(sig.signal(d("2024-01-05")).is_empty());
    }

    #[test]
    fn missing_file_and_bad_row() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_signals(&dir.path().join("nope.csv")),
            Err(Error::DataRead { .. })
        ));
        let path = write(dir.path(), "bad.csv", "trade_date,instrument,weight\n2024-13-01,CU.SHF,1\n");
        assert!(matches!(load_signals(&path), Err(Error::DataRead { .. })));
    }
}
