//! LIVE→TARGET diff engine and major-contract rollover.
//!
//! Both generators take an `exe_price` lookup that attaches the execution
//! price to every trade they derive; a missing execution price is fatal.

use crate::contracts::MajorContracts;
use crate::error::Result;
use crate::portfolio::{Book, Position};
use crate::trade::Trade;
use crate::types::{Contract, Offset, PositionKey, TradeDate};

/// Trades that move the live book onto the targets.
///
/// Targets are walked first: a key with no live position becomes a full
/// OPEN, a key with one is diffed into a single netted trade. Live keys
/// missing from the targets are then CLOSEd in full. Each key of the union
/// yields at most one trade and zero-quantity diffs are dropped here.
pub fn signal_trades<F>(live: &Book, targets: &Book, mut exe_price: F) -> Result<Vec<Trade>>
where
    F: FnMut(&Contract) -> Result<f64>,
{
    let mut trades = Vec::new();

    // 1. Enter or resize every target
    for (key, target) in targets {
        let trade = match live.get(key) {
            None => target.convert_as_trade(exe_price(&key.contract)?, Offset::Open),
            Some(current) => {
                if current.quantity == target.quantity {
                    continue;
                }
                current.cal_trade_from_target(target, exe_price(&key.contract)?)
            }
        };
        if !trade.is_empty() {
            trades.push(trade);
        }
    }

    // 2. Exit positions no longer wanted
    for (key, current) in live {
        if targets.contains_key(key) || current.is_empty() {
            continue;
        }
        trades.push(current.convert_as_trade(exe_price(&key.contract)?, Offset::Close));
    }

    Ok(trades)
}

/// Trades that follow each live position onto its instrument's new major
/// contract.
///
/// A position whose contract is no longer the active one on `date` becomes
/// two trades, in this order: CLOSE the old contract, OPEN the same
/// quantity and direction on the new one. Costs are paid on both legs.
pub fn rollover_trades<C, F>(
    live: &Book,
    date: TradeDate,
    major: &C,
    mut exe_price: F,
) -> Result<Vec<Trade>>
where
    C: MajorContracts + ?Sized,
    F: FnMut(&Contract) -> Result<f64>,
{
    let mut trades = Vec::new();
    for (key, current) in live {
        if current.is_empty() {
            continue;
        }
        let active = major.active_contract(date, &key.contract.instrument)?;
        if active == key.contract.code {
            continue;
        }

        let close_old = current.convert_as_trade(exe_price(&key.contract)?, Offset::Close);

        let new_key = PositionKey::new(key.contract.sibling(active), key.direction);
        let new_price = exe_price(&new_key.contract)?;
        let open_new = Position::target(new_key, current.quantity, current.multiplier)
            .convert_as_trade(new_price, Offset::Open);

        trades.push(close_old);
        trades.push(open_new);
    }
    Ok(trades)
}
