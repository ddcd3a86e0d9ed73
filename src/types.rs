//! Core types: Direction, Offset, Contract, PositionKey, PriceField

use std::fmt;

/// Trading date. Dates are calendar days; the [`Calendar`](crate::Calendar)
/// decides which of them are trading days.
pub type TradeDate = chrono::NaiveDate;

/// Direction of a position book: long or short.
///
/// The same contract may be held long and short at the same time; the two
/// books are distinct [`PositionKey`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    /// Direction implied by a signed weight. `None` for zero weight.
    pub fn of_weight(weight: f64) -> Option<Self> {
        if weight > 0.0 {
            Some(Direction::Long)
        } else if weight < 0.0 {
            Some(Direction::Short)
        } else {
            None
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// Whether a trade increases (open) or decreases (close) a position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Offset {
    Open,
    Close,
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offset::Open => write!(f, "OPEN"),
            Offset::Close => write!(f, "CLOSE"),
        }
    }
}

/// A tradable futures contract and the rolling instrument it belongs to.
///
/// `Contract::new("CU.SHF", "CU2506.SHF")`
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Contract {
    pub instrument: String,
    pub code: String,
}

impl Contract {
    pub fn new(instrument: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            instrument: instrument.into(),
            code: code.into(),
        }
    }

    /// Another contract of the same instrument.
    pub fn sibling(&self, code: impl Into<String>) -> Self {
        Self {
            instrument: self.instrument.clone(),
            code: code.into(),
        }
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

/// Identifies one slot of the book: a contract held in one direction.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PositionKey {
    pub contract: Contract,
    pub direction: Direction,
}

impl PositionKey {
    pub fn new(contract: Contract, direction: Direction) -> Self {
        Self {
            contract,
            direction,
        }
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.contract, self.direction)
    }
}

/// A column of the daily market data table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Settle,
    PreClose,
    PreSettle,
    Volume,
    Amount,
    Oi,
}

impl PriceField {
    pub fn as_str(self) -> &'static str {
        match self {
            PriceField::Open => "open",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Close => "close",
            PriceField::Settle => "settle",
            PriceField::PreClose => "pre_close",
            PriceField::PreSettle => "pre_settle",
            PriceField::Volume => "volume",
            PriceField::Amount => "amount",
            PriceField::Oi => "oi",
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
