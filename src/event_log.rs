//! Append-only audit log of status transitions
//!
//! Events live under `events/<trade_id>/<seq>` with a zero-padded decimal
//! sequence number, so a prefix scan yields a trade's history in order.
//! There is no update or delete path; once applied, an event is permanent.

use crate::error::LedgerError;
use crate::trade::{TimeStamp, TradeStatus};
use crate::utils::{from_cbor, to_cbor};
use chrono::Utc;
use sled::Batch;
use std::sync::Arc;

const EVENT_PREFIX: &str = "events/";

/// One audit record per status change.
///
/// `old_status` is `None` only for the creation event. `digest` chains
/// over the previous event's digest, making the per-trade trail
/// tamper-evident.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct TradeEvent {
    #[n(0)]
    pub seq: u64,
    #[n(1)]
    pub trade_id: String,
    #[n(2)]
    pub old_status: Option<TradeStatus>,
    #[n(3)]
    pub new_status: TradeStatus,
    #[n(4)]
    pub actor: String,
    #[n(5)]
    pub at: TimeStamp<Utc>,
    #[n(6)]
    pub note: Option<String>,
    #[n(7)]
    pub digest: String,
}

impl TradeEvent {
    // digest over the previous digest plus this event's payload, with the
    // digest field itself zeroed out
    fn chain_digest(&self, prev_digest: &str) -> Result<String, LedgerError> {
        let mut body = Vec::from(prev_digest.as_bytes());
        let mut core = self.clone();
        core.digest = String::new();
        body.extend(to_cbor(&core)?);

        Ok(sha256::digest(&body))
    }
}

#[derive(Clone)]
pub struct EventLog {
    db: Arc<sled::Db>,
}

impl EventLog {
    pub fn new(db: Arc<sled::Db>) -> Self {
        Self { db }
    }

    fn key(trade_id: &str, seq: u64) -> Vec<u8> {
        format!("{EVENT_PREFIX}{trade_id}/{seq:020}").into_bytes()
    }

    fn prefix(trade_id: &str) -> Vec<u8> {
        format!("{EVENT_PREFIX}{trade_id}/").into_bytes()
    }

    /// Stage a new event into `batch` with a server-assigned timestamp.
    ///
    /// The sequence number comes from the database's monotonic id
    /// generator, so ordering stays stable even when two events share a
    /// clock reading. Each service operation appends one event per batch,
    /// inside the trade's critical section, which keeps the head lookup
    /// consistent.
    pub fn append(
        &self,
        batch: &mut Batch,
        trade_id: &str,
        old_status: Option<TradeStatus>,
        new_status: TradeStatus,
        actor: &str,
        note: Option<String>,
    ) -> Result<TradeEvent, LedgerError> {
        let seq = self.db.generate_id()?;
        let prev_digest = self
            .head(trade_id)?
            .map(|ev| ev.digest)
            .unwrap_or_default();

        let mut event = TradeEvent {
            seq,
            trade_id: trade_id.to_owned(),
            old_status,
            new_status,
            actor: actor.to_owned(),
            at: TimeStamp::new(),
            note,
            digest: String::new(),
        };
        event.digest = event.chain_digest(&prev_digest)?;

        batch.insert(Self::key(trade_id, seq), to_cbor(&event)?);

        Ok(event)
    }

    /// Events for one trade in sequence order. Lazy and restartable;
    /// re-querying yields the same result unless new events were appended.
    pub fn history_for(
        &self,
        trade_id: &str,
    ) -> impl Iterator<Item = Result<TradeEvent, LedgerError>> + '_ {
        self.db.scan_prefix(Self::prefix(trade_id)).map(|entry| {
            let (_, value) = entry?;
            from_cbor(&value)
        })
    }

    /// Recompute the digest chain for one trade, returning the number of
    /// verified events or the first corrupt sequence number.
    pub fn verify_chain(&self, trade_id: &str) -> Result<u64, LedgerError> {
        let mut prev_digest = String::new();
        let mut verified = 0u64;

        for event in self.history_for(trade_id) {
            let event = event?;
            if event.chain_digest(&prev_digest)? != event.digest {
                return Err(LedgerError::Codec(format!(
                    "audit chain broken at sequence {}",
                    event.seq
                )));
            }
            prev_digest = event.digest;
            verified += 1;
        }

        Ok(verified)
    }

    fn head(&self, trade_id: &str) -> Result<Option<TradeEvent>, LedgerError> {
        match self.db.scan_prefix(Self::prefix(trade_id)).next_back() {
            Some(entry) => {
                let (_, value) = entry?;
                Ok(Some(from_cbor(&value)?))
            }
            None => Ok(None),
        }
    }
}
