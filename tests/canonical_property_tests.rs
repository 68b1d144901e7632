//! Property-based tests for canonical identity and event ordering
//!
//! Canonicalization is the sole definition of transaction identity, so
//! these properties pin the behaviors everything else leans on: equal
//! content means equal intent id regardless of construction order or
//! decimal spelling, and the scheduler's ordering key is a total order.

use ledger_kernel::{
    Amount, Event, Move, PendingTransaction, PendingTransactionBuilder, Scheduler, StateValue,
    TimeStamp, UnitState, UnitStateChange, SYSTEM_WALLET,
};
use proptest::prelude::*;

fn t0() -> TimeStamp {
    TimeStamp::new_with(2024, 1, 1, 0, 0, 0)
}

fn pending_with_state(quantity: &str, state: UnitState) -> PendingTransaction {
    PendingTransactionBuilder::new("prop")
        .add_move(Move::new(quantity.parse().unwrap(), "USD", SYSTEM_WALLET, "alice").unwrap())
        .change_state(UnitStateChange::new("USD", UnitState::new(), state).unwrap())
        .proposed_at(t0())
        .finalise()
        .unwrap()
}

// PROPERTY TEST STRATEGIES

/// Strategy to generate map entries: short keys to distinct-ish values
fn entries_strategy() -> impl Strategy<Value = Vec<(String, i64)>> {
    prop::collection::vec(("[a-z]{1,6}", any::<i64>()), 1..=8)
}

/// Strategy to generate a decimal spelling and a trailing-zero-padded
/// spelling of the same value
fn padded_decimal_strategy() -> impl Strategy<Value = (String, String)> {
    (0u64..=1_000_000_000, 0u32..=4, 1usize..=5).prop_map(|(raw, scale, zeros)| {
        let plain = if scale == 0 {
            raw.to_string()
        } else {
            let divisor = 10u64.pow(scale);
            format!("{}.{:0width$}", raw / divisor, raw % divisor, width = scale as usize)
        };
        let padded = if plain.contains('.') {
            format!("{}{}", plain, "0".repeat(zeros))
        } else {
            format!("{}.{}", plain, "0".repeat(zeros))
        };
        (plain, padded)
    })
}

/// Strategy to generate a batch of events over a few symbols
fn events_strategy() -> impl Strategy<Value = Vec<Event>> {
    prop::collection::vec(
        (0u32..=50, -2i64..=2, prop_oneof![Just("AAA"), Just("BBB"), Just("CCC")], any::<i64>()),
        1..=16,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .map(|(offset, priority, symbol, tag)| {
                let mut params = UnitState::new();
                params.insert("tag".to_string(), StateValue::Int(tag));
                Event::new(
                    "poll",
                    symbol,
                    TimeStamp::new_with(2024, 1, 1, 0, 0, offset),
                    priority,
                    params,
                )
                .unwrap()
            })
            .collect()
    })
}

// PROPERTY TESTS
proptest! {
    /// Property: map key insertion order never shifts identity
    #[test]
    fn prop_insertion_order_is_irrelevant(entries in entries_strategy()) {
        let mut forward = UnitState::new();
        for (key, value) in &entries {
            forward.insert(key.clone(), StateValue::Int(*value));
        }
        let mut backward = UnitState::new();
        for (key, value) in entries.iter().rev() {
            backward.insert(key.clone(), StateValue::Int(*value));
        }

        let a = pending_with_state("100", forward);
        let b = pending_with_state("100", backward);
        prop_assert_eq!(a.intent_id(), b.intent_id());
    }

    /// Property: trailing zeros in a quantity never shift identity
    #[test]
    fn prop_trailing_zeros_do_not_shift_identity((plain, padded) in padded_decimal_strategy()) {
        let a = pending_with_state(&plain, UnitState::new());
        let b = pending_with_state(&padded, UnitState::new());
        prop_assert_eq!(a.intent_id(), b.intent_id());
    }

    /// Property: the canonical string parses back to an equal value,
    /// and canonicalizing is a fixed point
    #[test]
    fn prop_canonical_string_round_trips((plain, padded) in padded_decimal_strategy()) {
        let value: Amount = padded.parse().unwrap();
        let canon = value.canonical();

        let reparsed: Amount = canon.parse().unwrap();
        prop_assert_eq!(&reparsed, &value);
        prop_assert_eq!(reparsed.canonical(), canon.clone());

        // both spellings collapse to one canonical form
        let other: Amount = plain.parse().unwrap();
        prop_assert_eq!(other.canonical(), canon);
    }

    /// Property: get_due returns every due event exactly once, in the
    /// (trigger_time, priority, symbol, event_id) total order
    #[test]
    fn prop_get_due_respects_the_total_order(events in events_strategy()) {
        let mut scheduler = Scheduler::new();
        let mut unique = std::collections::BTreeSet::new();
        for event in &events {
            scheduler.schedule(event.clone());
            unique.insert(event.event_id().to_string());
        }

        let due = scheduler.get_due(TimeStamp::new_with(2024, 1, 1, 0, 1, 0));
        prop_assert_eq!(due.len(), unique.len());
        prop_assert!(scheduler.is_empty());

        for pair in due.windows(2) {
            let a = (
                pair[0].trigger_time(),
                pair[0].priority(),
                pair[0].symbol().to_string(),
                pair[0].event_id().to_string(),
            );
            let b = (
                pair[1].trigger_time(),
                pair[1].priority(),
                pair[1].symbol().to_string(),
                pair[1].event_id().to_string(),
            );
            prop_assert!(a < b, "events out of order: {:?} then {:?}", a, b);
        }
    }

    /// Property: re-scheduling an already queued batch adds nothing
    #[test]
    fn prop_schedule_is_idempotent(events in events_strategy()) {
        let mut scheduler = Scheduler::new();
        for event in &events {
            scheduler.schedule(event.clone());
        }
        let len = scheduler.len();
        for event in &events {
            prop_assert!(!scheduler.schedule(event.clone()));
        }
        prop_assert_eq!(scheduler.len(), len);
    }
}
