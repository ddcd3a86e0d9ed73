//! File-based persistence via JSON Lines.
//!
//! Records are stored as one JSON object per line (`.jsonl` format).
//! A run is exported as three files per portfolio id:
//!
//! - `{id}.nav.jsonl`: the NAV table, append-only and continuity-checked
//! - `{id}.trades.jsonl`: the trade ledger
//! - `{id}.positions.jsonl`: end-of-day position history
//!
//! # Usage
//!
//! ```ignore
//! use futsim::persistence::{export_run, Continuity};
//!
//! match export_run(&result, Path::new("out"), &calendar)? {
//!     Continuity::Continuous => {}
//!     other => eprintln!("not appended: {other}"),
//! }
//! ```

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use log::warn;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::calendar::Calendar;
use crate::error::{Error, Result};
use crate::portfolio::NavSnapshot;
use crate::simulation::SimulationResult;
use crate::types::TradeDate;

/// Save records to a file in JSON Lines format, replacing it.
pub fn save_records<T: Serialize>(records: &[T], path: &Path) -> Result<()> {
    write_lines(records, File::create(path)?)
}

/// Append records to a JSON Lines file, creating it if needed.
pub fn append_records<T: Serialize>(records: &[T], path: &Path) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    write_lines(records, file)
}

fn write_lines<T: Serialize>(records: &[T], file: File) -> Result<()> {
    let mut writer = io::BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Load records from a JSON Lines file.
///
/// Empty lines are skipped. A line that does not parse fails the whole
/// load with its line number.
pub fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let reader = io::BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record = serde_json::from_str(line).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("line {}: {}", line_num + 1, e))
        })?;
        records.push(record);
    }
    Ok(records)
}

/// How an incoming block of dates lines up with what is already stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Continuity {
    /// Store is empty, or the block starts on the next expected date
    Continuous,
    /// The block starts after the expected date
    Gap { expected: TradeDate, incoming: TradeDate },
    /// The block starts on or before the last stored date
    Overlap { last: TradeDate, incoming: TradeDate },
}

impl Continuity {
    pub fn is_continuous(&self) -> bool {
        matches!(self, Continuity::Continuous)
    }
}

impl fmt::Display for Continuity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Continuity::Continuous => f.write_str("continuous"),
            Continuity::Gap { expected, incoming } => {
                write!(f, "gap: expected {expected}, incoming {incoming}")
            }
            Continuity::Overlap { last, incoming } => {
                write!(f, "overlap: last stored {last}, incoming {incoming}")
            }
        }
    }
}

/// Compare the first incoming date with the trading date after the last
/// stored one.
///
/// A repeat of stored dates is an overlap even when `last` is the final
/// calendar date. An incoming date that is not on the calendar after
/// `last` is an error, as is a `last` that is not a trading date.
pub fn check_continuity(last: Option<TradeDate>, incoming: TradeDate, calendar: &Calendar) -> Result<Continuity> {
    let Some(last) = last else {
        return Ok(Continuity::Continuous);
    };
    if !calendar.contains(last) {
        return Err(Error::NotTradingDate(last));
    }
    if incoming <= last {
        return Ok(Continuity::Overlap { last, incoming });
    }
    let expected = match calendar.next_date(last) {
        Ok(expected) => expected,
        Err(Error::CalendarExhausted { .. }) => return Err(Error::NotTradingDate(incoming)),
        Err(e) => return Err(e),
    };
    if incoming < expected {
        return Err(Error::NotTradingDate(incoming));
    }
    Ok(if incoming == expected {
        Continuity::Continuous
    } else {
        Continuity::Gap { expected, incoming }
    })
}

/// An append-only NAV table on disk.
#[derive(Clone, Debug)]
pub struct NavStore {
    path: PathBuf,
}

impl NavStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The NAV table of portfolio `id` inside `dir`.
    pub fn in_dir(dir: &Path, id: &str) -> Self {
        Self::new(dir.join(format!("{id}.nav.jsonl")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored row; a store that does not exist yet is empty.
    pub fn load(&self) -> Result<Vec<NavSnapshot>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        load_records(&self.path)
    }

    pub fn last_date(&self) -> Result<Option<TradeDate>> {
        Ok(self.load()?.last().map(|s| s.trade_date))
    }

    /// Append `rows` if they continue the stored table.
    ///
    /// A gap or overlap is logged and returned; nothing is written then.
    pub fn append(&self, rows: &[NavSnapshot], calendar: &Calendar) -> Result<Continuity> {
        let Some(first) = rows.first() else {
            return Ok(Continuity::Continuous);
        };
        let last = self.last_date()?;
        let continuity = check_continuity(last, first.trade_date, calendar)?;
        if continuity.is_continuous() {
            append_records(rows, &self.path)?;
        } else {
            self.refuse(last, continuity);
        }
        Ok(continuity)
    }

    fn refuse(&self, last: Option<TradeDate>, continuity: Continuity) {
        warn!(
            "{}: last stored {}, {continuity}; append refused",
            self.path.display(),
            last.map(|d| d.to_string()).unwrap_or_default()
        );
    }
}

/// Write one run's NAV, trades, and positions under `dir`.
///
/// Continuity is checked against the stored NAV first. Trades and
/// positions are appended before the NAV rows, so a stored NAV date
/// always has its trades and positions on disk.
pub fn export_run(result: &SimulationResult, dir: &Path, calendar: &Calendar) -> Result<Continuity> {
    std::fs::create_dir_all(dir)?;
    let store = NavStore::in_dir(dir, &result.id);
    let Some(first) = result.nav.first() else {
        return Ok(Continuity::Continuous);
    };
    let last = store.last_date()?;
    let continuity = check_continuity(last, first.trade_date, calendar)?;
    if !continuity.is_continuous() {
        store.refuse(last, continuity);
        return Ok(continuity);
    }
    append_records(&result.trades, &dir.join(format!("{}.trades.jsonl", result.id)))?;
    append_records(&result.positions, &dir.join(format!("{}.positions.jsonl", result.id)))?;
    append_records(&result.nav, store.path())?;
    Ok(continuity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::{Account, BookTotals};

    fn d(day: u32) -> TradeDate {
        TradeDate::from_ymd_opt(2024, 8, day).unwrap()
    }

    fn calendar() -> Calendar {
        Calendar::new(vec![d(1), d(2), d(5), d(6), d(7)])
    }

    fn rows(dates: &[TradeDate]) -> Vec<NavSnapshot> {
        let mut acc = Account::new(1e6);
        for (i, &date) in dates.iter().enumerate() {
            acc.update_pnl(i as f64 * 10.0, 1.0, 0.0);
            acc.close_day(date, i as f64 * 10.0, 1.0, BookTotals::default());
        }
        acc.into_snapshots()
    }

    #[test]
    fn continuity_cases() {
        let cal = calendar();
        assert_eq!(check_continuity(None, d(5), &cal).unwrap(), Continuity::Continuous);
        assert_eq!(check_continuity(Some(d(2)), d(5), &cal).unwrap(), Continuity::Continuous);
        assert_eq!(
            check_continuity(Some(d(1)), d(5), &cal).unwrap(),
            Continuity::Gap {
                expected: d(2),
                incoming: d(5)
            }
        );
        assert_eq!(
            check_continuity(Some(d(5)), d(5), &cal).unwrap(),
            Continuity::Overlap {
                last: d(5),
                incoming: d(5)
            }
        );
        assert!(matches!(
            check_continuity(Some(d(3)), d(5), &cal),
            Err(Error::NotTradingDate(_))
        ));
    }

    #[test]
    fn repeat_at_calendar_end_is_an_overlap() {
        let cal = calendar();
        assert_eq!(
            check_continuity(Some(d(7)), d(7), &cal).unwrap(),
            Continuity::Overlap {
                last: d(7),
                incoming: d(7)
            }
        );
        assert_eq!(
            check_continuity(Some(d(7)), d(2), &cal).unwrap(),
            Continuity::Overlap {
                last: d(7),
                incoming: d(2)
            }
        );
        // Nothing on the calendar follows the 7th.
        assert!(matches!(
            check_continuity(Some(d(7)), d(8), &cal),
            Err(Error::NotTradingDate(date)) if date == d(8)
        ));
    }

    #[test]
    fn incoming_between_trading_dates_is_an_error() {
        let cal = calendar();
        assert!(matches!(
            check_continuity(Some(d(2)), d(3), &cal),
            Err(Error::NotTradingDate(date)) if date == d(3)
        ));
    }

    #[test]
    fn store_refuses_repeat_of_final_block() {
        let dir = tempfile::tempdir().unwrap();
        let cal = calendar();
        let store = NavStore::in_dir(dir.path(), "p1");
        let block = rows(&[d(5), d(6), d(7)]);

        assert!(store.append(&block, &cal).unwrap().is_continuous());
        let again = store.append(&block, &cal).unwrap();
        assert_eq!(
            again,
            Continuity::Overlap {
                last: d(7),
                incoming: d(5)
            }
        );
        assert_eq!(store.load().unwrap().len(), 3);
    }

    #[test]
    fn records_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nav.jsonl");
        let original = rows(&[d(1), d(2)]);
        save_records(&original, &path).unwrap();
        let loaded: Vec<NavSnapshot> = load_records(&path).unwrap();
        assert_eq!(original, loaded);
    }

    #[test]
    fn bad_line_reports_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jsonl");
        std::fs::write(&path, "\n{\"not\": \"a snapshot\"}\n").unwrap();
        let err = load_records::<NavSnapshot>(&path).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn store_appends_only_continuous_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let cal = calendar();
        let store = NavStore::in_dir(dir.path(), "p1");
        assert!(store.load().unwrap().is_empty());

        assert!(store.append(&rows(&[d(1), d(2)]), &cal).unwrap().is_continuous());
        assert!(store.append(&rows(&[d(5)]), &cal).unwrap().is_continuous());
        assert_eq!(store.last_date().unwrap(), Some(d(5)));

        let gap = store.append(&rows(&[d(7)]), &cal).unwrap();
        assert!(matches!(gap, Continuity::Gap { .. }));
        let overlap = store.append(&rows(&[d(2), d(5)]), &cal).unwrap();
        assert!(matches!(overlap, Continuity::Overlap { .. }));

        let stored = store.load().unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored.last().unwrap().trade_date, d(5));
    }
}
