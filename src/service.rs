//! Service layer API for trade lifecycle operations
//!
//! The sole owner of the write path. Every operation lands its record
//! mutation and its audit event in one [`sled::Batch`], applied inside the
//! trade's critical section, so readers never see one without the other.

use crate::error::LedgerError;
use crate::event_log::EventLog;
use crate::store::TradeStore;
use crate::trade::{NewTrade, TimeStamp, Trade, TradeStatus};
use crate::transitions;
use dashmap::DashMap;
use sled::Batch;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

/// Actor recorded on events the service originates itself.
pub const SYSTEM_ACTOR: &str = "SYSTEM";

pub struct LedgerService {
    instance: Arc<sled::Db>,
    store: TradeStore,
    log: EventLog,
    // one mutex per trade id; entries live for the process lifetime
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl LedgerService {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self {
            store: TradeStore::new(Arc::clone(&instance)),
            log: EventLog::new(Arc::clone(&instance)),
            locks: DashMap::new(),
            instance,
        }
    }

    pub fn store(&self) -> &TradeStore {
        &self.store
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    fn lock_for(&self, trade_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(trade_id.to_owned())
            .or_default()
            .value()
            .clone()
    }

    /// Create a trade and its creation event as one observable unit.
    ///
    /// The identifier is freshly minted, so no competing writer can hold
    /// it yet and no critical section is needed here.
    pub fn create_trade(&self, req: NewTrade) -> Result<Trade, LedgerError> {
        let mut batch = Batch::default();

        let trade = self.store.create(&mut batch, req)?;
        self.log.append(
            &mut batch,
            &trade.id,
            None,
            TradeStatus::Executed,
            SYSTEM_ACTOR,
            Some("Trade created".to_owned()),
        )?;
        self.instance.apply_batch(batch)?;

        info!(trade_id = %trade.id, symbol = %trade.symbol, "trade created");

        Ok(trade)
    }

    /// Drive a trade to `requested` on behalf of `actor`.
    ///
    /// Read, validation, mutation and event append all happen under the
    /// trade's critical section; a rejected transition leaves the trade
    /// unchanged and writes nothing.
    pub fn transition(
        &self,
        trade_id: &str,
        requested: TradeStatus,
        actor: &str,
        note: Option<&str>,
    ) -> Result<Trade, LedgerError> {
        let lock = self.lock_for(trade_id);
        let _held = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut trade = self.store.get(trade_id)?;
        if let Err(err) = transitions::validate(trade_id, trade.status, requested) {
            warn!(trade_id, current = %trade.status, %requested, "transition rejected");
            return Err(err);
        }

        let old_status = trade.status;
        let mut batch = Batch::default();

        // the error reason lives on the record only while the trade is
        // FAILED; the failing event's note preserves it afterwards
        trade.error_reason = match requested {
            TradeStatus::Failed => note.map(str::to_owned),
            _ => None,
        };
        let stamp = match requested {
            TradeStatus::Confirmed | TradeStatus::Settled => Some(TimeStamp::new()),
            _ => None,
        };

        self.store
            .set_status(&mut batch, &mut trade, requested, stamp)?;
        let event = self.log.append(
            &mut batch,
            trade_id,
            Some(old_status),
            requested,
            actor,
            note.map(str::to_owned),
        )?;
        self.instance.apply_batch(batch)?;

        info!(trade_id, from = %old_status, to = %requested, seq = event.seq, "trade transitioned");

        Ok(trade)
    }
}
