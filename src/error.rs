//! Error taxonomy for the trade lifecycle store

use crate::trade::TradeStatus;
use rust_decimal::Decimal;

/// Rejections of malformed creation input. Surfaced to the caller
/// immediately, never retried.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol must not be empty")]
    EmptySymbol,
    #[error("counterparty must not be empty")]
    EmptyCounterparty,
    #[error("quantity must be a positive integer")]
    ZeroQuantity,
    #[error("price must be positive, got {0}")]
    NonPositivePrice(Decimal),
    #[error("unknown trade side: {0}")]
    UnknownSide(String),
    #[error("settlement date out of calendar range")]
    SettlementOutOfRange,
}

#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("trade not found: {trade_id}")]
    NotFound { trade_id: String },

    /// Rejected by the transition table. The trade is left unchanged and
    /// no event is written.
    #[error("trade {trade_id}: cannot move {current} -> {requested}")]
    InvalidTransition {
        trade_id: String,
        current: TradeStatus,
        requested: TradeStatus,
    },

    /// A status value outside the defined set. Fatal for the operation.
    #[error("status outside the known set: {value}")]
    InvalidState { value: String },

    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("codec error: {0}")]
    Codec(String),
}

impl From<minicbor::decode::Error> for LedgerError {
    fn from(err: minicbor::decode::Error) -> Self {
        LedgerError::Codec(err.to_string())
    }
}

impl<E: std::fmt::Display> From<minicbor::encode::Error<E>> for LedgerError {
    fn from(err: minicbor::encode::Error<E>) -> Self {
        LedgerError::Codec(err.to_string())
    }
}
