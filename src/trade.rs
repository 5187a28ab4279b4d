//! Core trade record, status domain, and CBOR codecs
use crate::error::{LedgerError, ValidationError};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    #[n(0)]
    Buy,
    #[n(1)]
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(ValidationError::UnknownSide(other.to_owned())),
        }
    }
}

/// Lifecycle status of a trade. SETTLED and CANCELLED are terminal.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeStatus {
    #[n(0)]
    Executed,
    #[n(1)]
    Confirmed,
    #[n(2)]
    Settled,
    #[n(3)]
    Failed,
    #[n(4)]
    Cancelled,
}

impl TradeStatus {
    /// True when no further transition is permitted from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TradeStatus::Settled | TradeStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Executed => "EXECUTED",
            TradeStatus::Confirmed => "CONFIRMED",
            TradeStatus::Settled => "SETTLED",
            TradeStatus::Failed => "FAILED",
            TradeStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EXECUTED" => Ok(TradeStatus::Executed),
            "CONFIRMED" => Ok(TradeStatus::Confirmed),
            "SETTLED" => Ok(TradeStatus::Settled),
            "FAILED" => Ok(TradeStatus::Failed),
            "CANCELLED" => Ok(TradeStatus::Cancelled),
            other => Err(LedgerError::InvalidState {
                value: other.to_owned(),
            }),
        }
    }
}

pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl std::fmt::Debug for TimeStamp<Utc> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TimeStamp").field(&self.0).finish()
    }
}

impl Clone for TimeStamp<Utc> {
    fn clone(&self) -> Self {
        *self
    }
}

impl Copy for TimeStamp<Utc> {}

impl PartialEq for TimeStamp<Utc> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for TimeStamp<Utc> {}

impl PartialOrd for TimeStamp<Utc> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeStamp<Utc> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// minicbor codec for [`rust_decimal::Decimal`], stored as its 16-byte
/// packed representation.
pub mod decimal_cbor {
    use rust_decimal::Decimal;

    pub fn encode<C, W: minicbor::encode::Write>(
        v: &Decimal,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.bytes(&v.serialize())?.ok()
    }

    pub fn decode<'b, C>(
        d: &mut minicbor::Decoder<'b>,
        _: &mut C,
    ) -> Result<Decimal, minicbor::decode::Error> {
        let raw: [u8; 16] = d
            .bytes()?
            .try_into()
            .map_err(|_| minicbor::decode::Error::message("decimal must be 16 bytes"))?;

        Ok(Decimal::deserialize(raw))
    }
}

/// minicbor codec for [`chrono::NaiveDate`], stored as a day count from the
/// common era.
pub mod date_cbor {
    use chrono::{Datelike, NaiveDate};

    pub fn encode<C, W: minicbor::encode::Write>(
        v: &NaiveDate,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.i32(v.num_days_from_ce())?.ok()
    }

    pub fn decode<'b, C>(
        d: &mut minicbor::Decoder<'b>,
        _: &mut C,
    ) -> Result<NaiveDate, minicbor::decode::Error> {
        let days = d.i32()?;

        NaiveDate::from_num_days_from_ce_opt(days).ok_or(minicbor::decode::Error::message(
            "day count out of range for a calendar date",
        ))
    }
}

/// Creation request for a trade. The record itself is built by the store.
#[derive(Debug, Clone)]
pub struct NewTrade {
    pub symbol: String,
    pub side: Side,
    pub quantity: u64,
    pub price: Decimal,
    pub counterparty: String,
    pub settlement_days: u32,
}

impl NewTrade {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.symbol.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        if self.counterparty.is_empty() {
            return Err(ValidationError::EmptyCounterparty);
        }
        if self.quantity == 0 {
            return Err(ValidationError::ZeroQuantity);
        }
        if self.price <= Decimal::ZERO {
            return Err(ValidationError::NonPositivePrice(self.price));
        }

        Ok(())
    }
}

/// A single executed transaction tracked through settlement.
///
/// Phase timestamps are present exactly when the trade has passed through
/// the phase; `error_reason` is present exactly when the status is FAILED.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Trade {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub symbol: String,
    #[n(2)]
    pub side: Side,
    #[n(3)]
    pub quantity: u64,
    #[cbor(n(4), with = "decimal_cbor")]
    pub price: Decimal,
    #[n(5)]
    pub counterparty: String,
    #[n(6)]
    pub status: TradeStatus,
    #[cbor(n(7), with = "date_cbor")]
    pub settlement_date: NaiveDate,
    #[n(8)]
    pub executed_at: TimeStamp<Utc>,
    #[n(9)]
    pub confirmed_at: Option<TimeStamp<Utc>>,
    #[n(10)]
    pub settled_at: Option<TimeStamp<Utc>>,
    #[n(11)]
    pub error_reason: Option<String>,
}

impl Trade {
    /// Monetary value of the trade, recomputed from its inputs so it can
    /// never drift from `quantity * price`.
    pub fn notional(&self) -> Decimal {
        Decimal::from(self.quantity) * self.price
    }
}
