//! Target positions from a signal snapshot.
//!
//! Sizing uses prices observed on the signal date, so a target computed
//! from the T-1 snapshot only relies on data available before T opens.

use crate::contracts::{Instruments, MajorContracts};
use crate::error::{Error, Result};
use crate::market::MarketData;
use crate::portfolio::{Book, Position};
use crate::signal::SignalRow;
use crate::types::{Contract, Direction, PositionKey, PriceField, TradeDate};

/// Lots for a capital allocation: `round(capital / price / multiplier)`.
///
/// Rounds half away from zero.
#[inline]
pub fn lots_for(capital: f64, price: f64, multiplier: f64) -> u64 {
    let raw = (capital / price / multiplier).round();
    if raw.is_finite() && raw > 0.0 {
        raw as u64
    } else {
        0
    }
}

/// Build target positions for `sig_date` from a capital base.
///
/// For each row: resolve the active contract on `sig_date`, size it with
/// the `ref_field` price of that date, and keep it when it rounds to at
/// least one lot. Zero weights are skipped; non-finite weights are fatal.
/// Two rows landing on the same key (duplicate instrument) accumulate.
pub fn build_targets<M, C, I>(
    rows: &[SignalRow],
    capital_base: f64,
    sig_date: TradeDate,
    ref_field: PriceField,
    market: &M,
    major: &C,
    instruments: &I,
) -> Result<Book>
where
    M: MarketData + ?Sized,
    C: MajorContracts + ?Sized,
    I: Instruments + ?Sized,
{
    let mut targets = Book::new();
    for row in rows {
        if !row.weight.is_finite() {
            return Err(Error::InvalidWeight {
                instrument: row.instrument.clone(),
                weight: row.weight,
            });
        }
        let Some(direction) = Direction::of_weight(row.weight) else {
            continue;
        };

        let multiplier = instruments.multiplier(&row.instrument)?;
        let code = major.active_contract(sig_date, &row.instrument)?;
        let ref_price = market.price(sig_date, &code, ref_field);
        if !(ref_price.is_finite() && ref_price > 0.0) {
            return Err(Error::InvalidReferencePrice {
                contract: code,
                date: sig_date,
                price: ref_price,
            });
        }

        let qty = lots_for(capital_base * row.weight.abs(), ref_price, multiplier);
        if qty == 0 {
            continue;
        }
        let key = PositionKey::new(Contract::new(row.instrument.clone(), code), direction);
        targets
            .entry(key.clone())
            .and_modify(|p| p.quantity += qty)
            .or_insert_with(|| Position::target(key, qty, multiplier));
    }
    Ok(targets)
}
