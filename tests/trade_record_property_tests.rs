//! Property-based tests for trade records and their CBOR codecs
//!
//! These verify the schema invariants that must hold for all well-formed
//! inputs - exact notional arithmetic, creation validation, and lossless
//! serialization of every field the persistence layer touches.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use trade_ledger::{
    event_log::TradeEvent,
    trade::{NewTrade, Side, TimeStamp, Trade, TradeStatus},
};

const ALL_STATUSES: [TradeStatus; 5] = [
    TradeStatus::Executed,
    TradeStatus::Confirmed,
    TradeStatus::Settled,
    TradeStatus::Failed,
    TradeStatus::Cancelled,
];

fn side_strategy() -> impl Strategy<Value = Side> {
    prop::bool::ANY.prop_map(|b| if b { Side::Buy } else { Side::Sell })
}

fn status_strategy() -> impl Strategy<Value = TradeStatus> {
    (0usize..ALL_STATUSES.len()).prop_map(|i| ALL_STATUSES[i])
}

/// Strategy to generate positive quantities with room for exact notional
/// arithmetic checks
fn quantity_strategy() -> impl Strategy<Value = u64> {
    1u64..=1_000_000
}

/// Strategy to generate positive prices as (mantissa, scale) pairs, up to
/// four decimal places
fn price_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..=100_000_000, 0u32..=4).prop_map(|(mantissa, scale)| Decimal::new(mantissa, scale))
}

fn timestamp_strategy() -> impl Strategy<Value = TimeStamp<chrono::Utc>> {
    (2020i32..=2030, 1u32..=12, 1u32..=28, 0u32..=23, 0u32..=59)
        .prop_map(|(y, mo, d, h, mi)| TimeStamp::new_with(y, mo, d, h, mi, 0))
}

fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (2020i32..=2030, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn symbol_strategy() -> impl Strategy<Value = String> {
    "[A-Z]{1,5}"
}

fn trade_strategy() -> impl Strategy<Value = Trade> {
    (
        symbol_strategy(),
        side_strategy(),
        quantity_strategy(),
        price_strategy(),
        status_strategy(),
        date_strategy(),
        timestamp_strategy(),
        prop::option::of(timestamp_strategy()),
        prop::option::of(timestamp_strategy()),
        prop::option::of("[a-z ]{1,30}"),
    )
        .prop_map(
            |(
                symbol,
                side,
                quantity,
                price,
                status,
                settlement_date,
                executed_at,
                confirmed_at,
                settled_at,
                error_reason,
            )| Trade {
                id: format!("trade1{}", quantity),
                symbol,
                side,
                quantity,
                price,
                counterparty: "GOLDMAN".to_owned(),
                status,
                settlement_date,
                executed_at,
                confirmed_at,
                settled_at,
                error_reason,
            },
        )
}

proptest! {
    /// Property: notional is exactly quantity * price, checked against an
    /// independent integer computation on the decimal mantissa.
    #[test]
    fn prop_notional_is_exact(
        quantity in quantity_strategy(),
        (mantissa, scale) in (1i64..=100_000_000, 0u32..=4),
    ) {
        let price = Decimal::new(mantissa, scale);
        let trade = Trade {
            id: "trade1prop".to_owned(),
            symbol: "AAPL".to_owned(),
            side: Side::Buy,
            quantity,
            price,
            counterparty: "GOLDMAN".to_owned(),
            status: TradeStatus::Executed,
            settlement_date: NaiveDate::from_ymd_opt(2026, 8, 10).unwrap(),
            executed_at: TimeStamp::new_with(2026, 8, 7, 12, 0, 0),
            confirmed_at: None,
            settled_at: None,
            error_reason: None,
        };

        let expected =
            Decimal::from_i128_with_scale(i128::from(quantity) * i128::from(mantissa), scale);

        prop_assert_eq!(trade.notional(), expected);
        prop_assert!(trade.notional() > Decimal::ZERO);
    }

    /// Property: any well-formed creation request passes validation.
    #[test]
    fn prop_well_formed_requests_validate(
        symbol in symbol_strategy(),
        side in side_strategy(),
        quantity in quantity_strategy(),
        price in price_strategy(),
        counterparty in "[A-Z]{2,10}",
        settlement_days in 0u32..=5,
    ) {
        let req = NewTrade {
            symbol,
            side,
            quantity,
            price,
            counterparty,
            settlement_days,
        };

        prop_assert!(req.validate().is_ok());
    }

    /// Property: a non-positive price fails validation no matter what the
    /// other fields look like.
    #[test]
    fn prop_non_positive_price_always_fails(
        symbol in symbol_strategy(),
        side in side_strategy(),
        quantity in quantity_strategy(),
        mantissa in 0i64..=100_000,
    ) {
        let req = NewTrade {
            symbol,
            side,
            quantity,
            price: Decimal::new(-mantissa, 2),
            counterparty: "GOLDMAN".to_owned(),
            settlement_days: 1,
        };

        prop_assert!(req.validate().is_err());
    }

    /// Property: CBOR round-trip preserves every field of a trade record,
    /// including the derived notional.
    #[test]
    fn prop_trade_cbor_roundtrip(trade in trade_strategy()) {
        let encoded = minicbor::to_vec(&trade).expect("encoding should succeed");
        let decoded: Trade = minicbor::decode(&encoded).expect("decoding should succeed");

        prop_assert_eq!(&decoded, &trade);
        prop_assert_eq!(decoded.notional(), trade.notional());
    }

    /// Property: CBOR round-trip preserves every field of an audit event.
    #[test]
    fn prop_event_cbor_roundtrip(
        seq in any::<u64>(),
        old_status in prop::option::of(status_strategy()),
        new_status in status_strategy(),
        actor in "[a-z_]{1,12}",
        at in timestamp_strategy(),
        note in prop::option::of("[a-z ]{1,30}"),
        digest in "[0-9a-f]{64}",
    ) {
        let event = TradeEvent {
            seq,
            trade_id: "trade1prop".to_owned(),
            old_status,
            new_status,
            actor,
            at,
            note,
            digest,
        };

        let encoded = minicbor::to_vec(&event).expect("encoding should succeed");
        let decoded: TradeEvent = minicbor::decode(&encoded).expect("decoding should succeed");

        prop_assert_eq!(decoded, event);
    }
}

/// Deeper exploration for the arithmetic invariant - it backs every
/// position and pending-settlement aggregation.
#[cfg(test)]
mod extensive_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1000))]

        /// Property: decimal notional arithmetic is commutative and scales
        /// linearly with quantity.
        #[test]
        fn prop_notional_scales_linearly(
            quantity in 1u64..=100_000,
            price in price_strategy(),
        ) {
            let single = Decimal::from(1u64) * price;
            let full = Decimal::from(quantity) * price;

            prop_assert_eq!(single, price);
            prop_assert_eq!(full, price * Decimal::from(quantity));
        }
    }
}
