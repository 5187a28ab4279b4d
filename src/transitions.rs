//! Pure transition rules for the trade status machine
//!
//! No state, no storage. The service consults this module before any
//! status mutation.

use crate::error::LedgerError;
use crate::trade::TradeStatus;

/// Allowed next statuses for each current status.
///
/// FAILED keeps a path back to CONFIRMED so a remediated trade can be
/// re-attempted. SETTLED and CANCELLED admit nothing.
pub fn allowed_from(current: TradeStatus) -> &'static [TradeStatus] {
    match current {
        TradeStatus::Executed => &[TradeStatus::Confirmed, TradeStatus::Cancelled],
        TradeStatus::Confirmed => &[TradeStatus::Settled, TradeStatus::Failed],
        TradeStatus::Failed => &[TradeStatus::Confirmed],
        TradeStatus::Settled | TradeStatus::Cancelled => &[],
    }
}

pub fn is_allowed(current: TradeStatus, requested: TradeStatus) -> bool {
    allowed_from(current).contains(&requested)
}

/// Check one edge, or fail with the offending trade, its current status
/// and the attempted status.
pub fn validate(
    trade_id: &str,
    current: TradeStatus,
    requested: TradeStatus,
) -> Result<(), LedgerError> {
    if is_allowed(current, requested) {
        Ok(())
    } else {
        Err(LedgerError::InvalidTransition {
            trade_id: trade_id.to_owned(),
            current,
            requested,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executed_can_confirm_or_cancel() {
        assert!(is_allowed(TradeStatus::Executed, TradeStatus::Confirmed));
        assert!(is_allowed(TradeStatus::Executed, TradeStatus::Cancelled));
        assert!(!is_allowed(TradeStatus::Executed, TradeStatus::Settled));
        assert!(!is_allowed(TradeStatus::Executed, TradeStatus::Failed));
    }

    #[test]
    fn confirmed_can_settle_or_fail() {
        assert!(is_allowed(TradeStatus::Confirmed, TradeStatus::Settled));
        assert!(is_allowed(TradeStatus::Confirmed, TradeStatus::Failed));
        assert!(!is_allowed(TradeStatus::Confirmed, TradeStatus::Cancelled));
    }

    #[test]
    fn failed_can_retry_confirmation() {
        assert!(is_allowed(TradeStatus::Failed, TradeStatus::Confirmed));
        assert!(!is_allowed(TradeStatus::Failed, TradeStatus::Settled));
        assert!(!is_allowed(TradeStatus::Failed, TradeStatus::Cancelled));
    }

    #[test]
    fn terminal_statuses_admit_nothing() {
        for terminal in [TradeStatus::Settled, TradeStatus::Cancelled] {
            assert!(terminal.is_terminal());
            assert!(allowed_from(terminal).is_empty());
        }
    }

    #[test]
    fn validate_reports_the_offending_edge() {
        let err = validate("trade1abc", TradeStatus::Settled, TradeStatus::Confirmed).unwrap_err();

        match err {
            LedgerError::InvalidTransition {
                trade_id,
                current,
                requested,
            } => {
                assert_eq!(trade_id, "trade1abc");
                assert_eq!(current, TradeStatus::Settled);
                assert_eq!(requested, TradeStatus::Confirmed);
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
    }
}
