//! Keyed trade storage with schema-level enforcement
//!
//! Records live in the default sled tree under `trades/<id>`, with two
//! index namespaces maintained alongside every record write:
//! `idx/status/<STATUS>/<id>` and `idx/settle/<YYYY-MM-DD>/<id>`.
//! Writes are staged into a caller-supplied [`sled::Batch`] so the service
//! can land a record mutation and its audit event as one unit.

use crate::error::{LedgerError, ValidationError};
use crate::trade::{NewTrade, TimeStamp, Trade, TradeStatus};
use crate::utils::{self, from_cbor, to_cbor};
use chrono::{Days, NaiveDate, Utc};
use sled::Batch;
use std::sync::Arc;

const TRADE_PREFIX: &str = "trades/";
const STATUS_IDX_PREFIX: &str = "idx/status/";
const SETTLE_IDX_PREFIX: &str = "idx/settle/";

#[derive(Clone)]
pub struct TradeStore {
    db: Arc<sled::Db>,
}

impl TradeStore {
    pub fn new(db: Arc<sled::Db>) -> Self {
        Self { db }
    }

    fn trade_key(trade_id: &str) -> Vec<u8> {
        format!("{TRADE_PREFIX}{trade_id}").into_bytes()
    }

    fn status_key(status: TradeStatus, trade_id: &str) -> Vec<u8> {
        format!("{STATUS_IDX_PREFIX}{}/{trade_id}", status.as_str()).into_bytes()
    }

    fn settle_key(date: NaiveDate, trade_id: &str) -> Vec<u8> {
        format!("{SETTLE_IDX_PREFIX}{}/{trade_id}", date.format("%Y-%m-%d")).into_bytes()
    }

    /// Validate the request and stage a fresh EXECUTED trade into `batch`.
    ///
    /// The identifier is minted here and the settlement date is fixed at
    /// creation time plus the requested number of calendar days.
    pub fn create(&self, batch: &mut Batch, req: NewTrade) -> Result<Trade, LedgerError> {
        req.validate()?;

        let executed_at = TimeStamp::new();
        let settlement_date = executed_at
            .to_datetime_utc()
            .date_naive()
            .checked_add_days(Days::new(u64::from(req.settlement_days)))
            .ok_or(ValidationError::SettlementOutOfRange)?;

        let trade = Trade {
            id: utils::new_uuid_to_bech32("trade")?,
            symbol: req.symbol,
            side: req.side,
            quantity: req.quantity,
            price: req.price,
            counterparty: req.counterparty,
            status: TradeStatus::Executed,
            settlement_date,
            executed_at,
            confirmed_at: None,
            settled_at: None,
            error_reason: None,
        };

        batch.insert(Self::trade_key(&trade.id), to_cbor(&trade)?);
        batch.insert(Self::status_key(trade.status, &trade.id), Vec::<u8>::new());
        batch.insert(
            Self::settle_key(trade.settlement_date, &trade.id),
            Vec::<u8>::new(),
        );

        Ok(trade)
    }

    /// Load a trade by identifier.
    pub fn get(&self, trade_id: &str) -> Result<Trade, LedgerError> {
        let bytes = self
            .db
            .get(Self::trade_key(trade_id))?
            .ok_or_else(|| LedgerError::NotFound {
                trade_id: trade_id.to_owned(),
            })?;

        from_cbor(&bytes)
    }

    /// Stage a status change for a loaded trade, stamping the phase
    /// timestamp where one applies (first CONFIRMED, SETTLED).
    ///
    /// No transition-legality validation happens here; that is the
    /// validator's job, run by the service before this call.
    pub fn set_status(
        &self,
        batch: &mut Batch,
        trade: &mut Trade,
        new_status: TradeStatus,
        stamp: Option<TimeStamp<Utc>>,
    ) -> Result<(), LedgerError> {
        batch.remove(Self::status_key(trade.status, &trade.id));

        trade.status = new_status;
        match new_status {
            TradeStatus::Confirmed => {
                // set exactly once; a retry after FAILED keeps the original
                if trade.confirmed_at.is_none() {
                    trade.confirmed_at = stamp;
                }
            }
            TradeStatus::Settled => {
                if trade.settled_at.is_none() {
                    trade.settled_at = stamp;
                }
            }
            _ => {}
        }

        batch.insert(Self::trade_key(&trade.id), to_cbor(trade)?);
        batch.insert(Self::status_key(new_status, &trade.id), Vec::<u8>::new());

        Ok(())
    }

    /// All trades currently carrying `status`, via the status index.
    pub fn trades_with_status(&self, status: TradeStatus) -> Result<Vec<Trade>, LedgerError> {
        let prefix = format!("{STATUS_IDX_PREFIX}{}/", status.as_str());
        self.collect_indexed(prefix.as_bytes())
    }

    /// All trades settling on `date`, via the settlement-date index.
    pub fn trades_settling_on(&self, date: NaiveDate) -> Result<Vec<Trade>, LedgerError> {
        let prefix = format!("{SETTLE_IDX_PREFIX}{}/", date.format("%Y-%m-%d"));
        self.collect_indexed(prefix.as_bytes())
    }

    fn collect_indexed(&self, prefix: &[u8]) -> Result<Vec<Trade>, LedgerError> {
        let mut trades = Vec::new();
        for entry in self.db.scan_prefix(prefix) {
            let (key, _) = entry?;
            let trade_id = std::str::from_utf8(&key[prefix.len()..])
                .map_err(|e| LedgerError::Codec(e.to_string()))?;
            trades.push(self.get(trade_id)?);
        }

        Ok(trades)
    }
}
