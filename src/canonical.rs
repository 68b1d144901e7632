//! Canonical byte forms and content-addressed identifiers.
//!
//! Every allowed state value maps to exactly one byte sequence, and that
//! sequence is the *only* thing fed into identity hashes. Nothing here
//! may depend on hash-map iteration order, `Debug` output or platform
//! formatting; ordered maps and the fixed renderings below are the whole
//! story.
//!
//! Strings and map keys are length-prefixed (`s:<len>:<bytes>`) so that
//! delimiter bytes inside them cannot collide with the structural
//! delimiters.

use crate::config::HashBits;
use crate::transaction::TimeStamp;
use crate::types::{Move, Origin, Unit, UnitState, UnitStateChange};

/// Render one state value into `out`.
fn push_value(out: &mut String, value: &crate::types::StateValue) {
    use crate::types::StateValue::*;

    match value {
        Null => out.push_str("null"),
        Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Int(i) => out.push_str(&i.to_string()),
        Amount(a) => out.push_str(&a.canonical()),
        Text(s) => push_str_prefixed(out, s),
        Map(m) => {
            out.push('{');
            let mut first = true;
            for (key, val) in m {
                if !first {
                    out.push(';');
                }
                first = false;
                push_str_prefixed(out, key);
                out.push('=');
                push_value(out, val);
            }
            out.push('}');
        }
        List(items) => {
            out.push('[');
            let mut first = true;
            for item in items {
                if !first {
                    out.push(',');
                }
                first = false;
                push_value(out, item);
            }
            out.push(']');
        }
    }
}

fn push_str_prefixed(out: &mut String, s: &str) {
    out.push_str("s:");
    out.push_str(&s.len().to_string());
    out.push(':');
    out.push_str(s);
}

/// Canonical form of a single state value.
pub fn canon_value(value: &crate::types::StateValue) -> String {
    let mut out = String::new();
    push_value(&mut out, value);
    out
}

/// Canonical form of a whole state mapping. `BTreeMap` iteration is
/// already byte-wise key order, which is the order the form mandates.
pub fn canon_state(state: &UnitState) -> String {
    let mut out = String::new();
    out.push('{');
    let mut first = true;
    for (key, val) in state {
        if !first {
            out.push(';');
        }
        first = false;
        push_str_prefixed(&mut out, key);
        out.push('=');
        push_value(&mut out, val);
    }
    out.push('}');
    out
}

fn render_move(mv: &Move) -> String {
    let mut out = String::from("mv:");
    push_str_prefixed(&mut out, mv.unit_symbol());
    out.push('|');
    push_str_prefixed(&mut out, mv.source());
    out.push('|');
    push_str_prefixed(&mut out, mv.dest());
    out.push('|');
    push_str_prefixed(&mut out, mv.contract_id().unwrap_or(""));
    out.push('|');
    out.push_str(&mv.quantity().canonical());
    out
}

fn render_state_change(sc: &UnitStateChange) -> String {
    let mut out = String::from("sc:");
    push_str_prefixed(&mut out, sc.unit_symbol());
    out.push('|');
    out.push_str(&canon_state(sc.old_state()));
    out.push('|');
    out.push_str(&canon_state(sc.new_state()));
    out
}

// Declarative fields only. Execution state is mutable and must not
// shift a registration's identity.
fn render_unit(unit: &Unit) -> String {
    let mut out = String::from("un:");
    push_str_prefixed(&mut out, unit.symbol());
    out.push('|');
    push_str_prefixed(&mut out, unit.name());
    out.push('|');
    push_str_prefixed(&mut out, unit.unit_type());
    out.push('|');
    out.push_str(&unit.min_balance().canonical());
    out.push('|');
    out.push_str(&unit.max_balance().canonical());
    out.push('|');
    match unit.decimal_places() {
        Some(dp) => out.push_str(&dp.to_string()),
        None => out.push_str("null"),
    }
    out
}

fn render_origin(origin: &Origin) -> String {
    let mut out = String::from("or:{");
    push_str_prefixed(&mut out, "inputs");
    out.push('=');
    out.push_str(&canon_state(origin.inputs()));
    out.push(';');
    push_str_prefixed(&mut out, "seed");
    out.push('=');
    match origin.seed() {
        Some(seed) => out.push_str(&seed.to_string()),
        None => out.push_str("null"),
    }
    out.push(';');
    push_str_prefixed(&mut out, "source");
    out.push('=');
    push_str_prefixed(&mut out, origin.source());
    out.push('}');
    out
}

/// The exact byte sequence hashed into an intent id.
///
/// Moves are sorted by `(unit_symbol, source, dest, contract_id,
/// canonical quantity)`; state changes and unit registrations arrive
/// pre-sorted by symbol from the builder but are re-sorted here so the
/// digest input never depends on the caller.
pub fn intent_digest_input(
    moves: &[Move],
    state_changes: &[UnitStateChange],
    units_to_create: &[Unit],
    origin: &Origin,
    proposed_timestamp: TimeStamp,
) -> String {
    let mut sorted_moves: Vec<&Move> = moves.iter().collect();
    sorted_moves.sort_by(|a, b| {
        (
            a.unit_symbol(),
            a.source(),
            a.dest(),
            a.contract_id().unwrap_or(""),
            a.quantity().canonical(),
        )
            .cmp(&(
                b.unit_symbol(),
                b.source(),
                b.dest(),
                b.contract_id().unwrap_or(""),
                b.quantity().canonical(),
            ))
    });

    let mut sorted_changes: Vec<&UnitStateChange> = state_changes.iter().collect();
    sorted_changes.sort_by(|a, b| a.unit_symbol().cmp(b.unit_symbol()));

    let mut sorted_units: Vec<&Unit> = units_to_create.iter().collect();
    sorted_units.sort_by(|a, b| a.symbol().cmp(b.symbol()));

    let mut lines = Vec::new();
    lines.extend(sorted_moves.iter().map(|m| render_move(m)));
    lines.extend(sorted_changes.iter().map(|sc| render_state_change(sc)));
    lines.extend(sorted_units.iter().map(|u| render_unit(u)));
    lines.push(format!("ts:{}", proposed_timestamp.canonical()));
    lines.push(render_origin(origin));
    lines.join("\n")
}

/// Content-addressed transaction identity.
pub fn intent_id(
    moves: &[Move],
    state_changes: &[UnitStateChange],
    units_to_create: &[Unit],
    origin: &Origin,
    proposed_timestamp: TimeStamp,
    bits: HashBits,
) -> String {
    let input = intent_digest_input(moves, state_changes, units_to_create, origin, proposed_timestamp);
    truncate_digest(sha256::digest(input.as_bytes()), bits)
}

/// Deterministic execution id: a function of the ledger name, the
/// claimed sequence number and the intent.
pub fn derive_exec_id(ledger_name: &str, sequence: u64, intent_id: &str, bits: HashBits) -> String {
    let mut input = String::from("exec:");
    push_str_prefixed(&mut input, ledger_name);
    input.push('|');
    input.push_str(&sequence.to_string());
    input.push('|');
    input.push_str(intent_id);
    truncate_digest(sha256::digest(input.as_bytes()), bits)
}

/// Canonical event identity over `(action, symbol, trigger_time, params)`.
pub fn derive_event_id(
    action: &str,
    symbol: &str,
    trigger_time: TimeStamp,
    params: &UnitState,
    bits: HashBits,
) -> String {
    let mut input = String::from("ev:");
    push_str_prefixed(&mut input, action);
    input.push('|');
    push_str_prefixed(&mut input, symbol);
    input.push('|');
    input.push_str(&trigger_time.canonical());
    input.push('|');
    input.push_str(&canon_state(params));
    truncate_digest(sha256::digest(input.as_bytes()), bits)
}

// sha256 hands back 64 lowercase hex chars; the 128-bit form keeps the
// first 16 bytes, round-tripped through hex so a malformed digest can
// never slip through silently.
fn truncate_digest(digest_hex: String, bits: HashBits) -> String {
    match bits {
        HashBits::B256 => digest_hex,
        HashBits::B128 => match hex::decode(&digest_hex) {
            Ok(bytes) => hex::encode(&bytes[..16]),
            Err(_) => digest_hex,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Amount;
    use crate::types::StateValue;
    use std::collections::BTreeMap;

    fn amt(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[test]
    fn scalar_forms() {
        assert_eq!(canon_value(&StateValue::Null), "null");
        assert_eq!(canon_value(&StateValue::Bool(true)), "true");
        assert_eq!(canon_value(&StateValue::Int(-7)), "-7");
        assert_eq!(canon_value(&StateValue::Int(0)), "0");
        assert_eq!(canon_value(&StateValue::Amount(amt("100.00"))), "100");
        assert_eq!(canon_value(&StateValue::from("a=b;c")), "s:5:a=b;c");
    }

    #[test]
    fn map_keys_come_out_sorted() {
        let mut inner = BTreeMap::new();
        inner.insert("y".to_string(), StateValue::Int(2));
        inner.insert("x".to_string(), StateValue::Int(1));
        assert_eq!(
            canon_value(&StateValue::Map(inner)),
            "{s:1:x=1;s:1:y=2}"
        );
    }

    #[test]
    fn list_order_is_preserved() {
        let list = StateValue::List(vec![StateValue::Int(3), StateValue::Int(1)]);
        assert_eq!(canon_value(&list), "[3,1]");
    }

    #[test]
    fn intent_id_ignores_move_order() {
        let ts = TimeStamp::new_with(2024, 1, 1, 0, 0, 0);
        let origin = Origin::new("test");
        let a = Move::new(amt("5"), "USD", "alice", "bob").unwrap();
        let b = Move::new(amt("3"), "EUR", "carol", "dan").unwrap();

        let forward = intent_id(
            &[a.clone(), b.clone()],
            &[],
            &[],
            &origin,
            ts,
            HashBits::B128,
        );
        let reversed = intent_id(&[b, a], &[], &[], &origin, ts, HashBits::B128);

        assert_eq!(forward, reversed);
        assert_eq!(forward.len(), 32);
    }

    #[test]
    fn intent_id_sees_quantity_value_not_spelling() {
        let ts = TimeStamp::new_with(2024, 1, 1, 0, 0, 0);
        let origin = Origin::new("test");
        let plain = Move::new(amt("100"), "USD", "alice", "bob").unwrap();
        let padded = Move::new(amt("100.00"), "USD", "alice", "bob").unwrap();

        assert_eq!(
            intent_id(&[plain], &[], &[], &origin, ts, HashBits::B128),
            intent_id(&[padded], &[], &[], &origin, ts, HashBits::B128),
        );
    }

    #[test]
    fn timestamp_shifts_identity() {
        let origin = Origin::new("test");
        let mv = Move::new(amt("1"), "USD", "alice", "bob").unwrap();
        let t1 = TimeStamp::new_with(2024, 1, 1, 0, 0, 0);
        let t2 = TimeStamp::new_with(2024, 1, 1, 0, 0, 1);

        assert_ne!(
            intent_id(&[mv.clone()], &[], &[], &origin, t1, HashBits::B128),
            intent_id(&[mv], &[], &[], &origin, t2, HashBits::B128),
        );
    }

    #[test]
    fn full_width_digest_is_64_chars() {
        let ts = TimeStamp::new_with(2024, 1, 1, 0, 0, 0);
        let origin = Origin::new("test");
        let mv = Move::new(amt("1"), "USD", "alice", "bob").unwrap();

        let wide = intent_id(&[mv], &[], &[], &origin, ts, HashBits::B256);
        assert_eq!(wide.len(), 64);
    }

    #[test]
    fn exec_id_depends_on_sequence() {
        let a = derive_exec_id("sim", 0, "abc", HashBits::B128);
        let b = derive_exec_id("sim", 1, "abc", HashBits::B128);
        assert_ne!(a, b);
    }
}
