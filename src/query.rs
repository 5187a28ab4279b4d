//! Read-only aggregation over the trade store and event log
//!
//! Holds its own clones of the storage components (they share the one
//! database handle) and never mutates. Each query decodes whole records
//! out of single reads, so an individual trade is never observed torn.

use crate::error::LedgerError;
use crate::event_log::{EventLog, TradeEvent};
use crate::store::TradeStore;
use crate::trade::{Side, Trade, TradeStatus};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Net settled exposure for one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolPosition {
    pub symbol: String,
    pub net_quantity: i64,
    pub net_notional: Decimal,
}

#[derive(Clone)]
pub struct QueryEngine {
    store: TradeStore,
    log: EventLog,
}

impl QueryEngine {
    pub fn new(store: TradeStore, log: EventLog) -> Self {
        Self { store, log }
    }

    /// Trades settling on `date` that are still in flight (EXECUTED or
    /// CONFIRMED), largest notional first.
    pub fn pending_settlements(&self, date: NaiveDate) -> Result<Vec<Trade>, LedgerError> {
        let mut trades: Vec<Trade> = self
            .store
            .trades_settling_on(date)?
            .into_iter()
            .filter(|t| matches!(t.status, TradeStatus::Executed | TradeStatus::Confirmed))
            .collect();
        trades.sort_by(|a, b| b.notional().cmp(&a.notional()));

        Ok(trades)
    }

    /// Net position per symbol over SETTLED trades only, ordered by
    /// absolute net notional descending. Buys count positive, sells
    /// negative.
    pub fn net_position_by_symbol(&self) -> Result<Vec<SymbolPosition>, LedgerError> {
        let mut by_symbol: BTreeMap<String, (i64, Decimal)> = BTreeMap::new();

        for trade in self.store.trades_with_status(TradeStatus::Settled)? {
            let entry = by_symbol
                .entry(trade.symbol.clone())
                .or_insert((0, Decimal::ZERO));
            match trade.side {
                Side::Buy => {
                    entry.0 += trade.quantity as i64;
                    entry.1 += trade.notional();
                }
                Side::Sell => {
                    entry.0 -= trade.quantity as i64;
                    entry.1 -= trade.notional();
                }
            }
        }

        let mut positions: Vec<SymbolPosition> = by_symbol
            .into_iter()
            .map(|(symbol, (net_quantity, net_notional))| SymbolPosition {
                symbol,
                net_quantity,
                net_notional,
            })
            .collect();
        positions.sort_by(|a, b| b.net_notional.abs().cmp(&a.net_notional.abs()));

        Ok(positions)
    }

    /// FAILED trades with their captured error reason, most recent
    /// execution first.
    pub fn failed_trades(&self) -> Result<Vec<Trade>, LedgerError> {
        let mut trades = self.store.trades_with_status(TradeStatus::Failed)?;
        trades.sort_by(|a, b| b.executed_at.cmp(&a.executed_at));

        Ok(trades)
    }

    /// Full audit history for one trade, in sequence order.
    pub fn history(
        &self,
        trade_id: &str,
    ) -> impl Iterator<Item = Result<TradeEvent, LedgerError>> + '_ {
        self.log.history_for(trade_id)
    }
}
