//! Builder for [`PendingTransaction`], the only way to make one.
//!
//! Finalisation sorts, validates and then derives the `intent_id`, so a
//! `PendingTransaction` that exists is internally consistent and
//! content-addressed.

use crate::canonical;
use crate::config::HashBits;
use crate::error::BuildError;
use crate::transaction::{PendingTransaction, TimeStamp};
use crate::types::{Move, Origin, StateValue, Unit, UnitStateChange};

pub struct PendingTransactionBuilder {
    moves: Vec<Move>,
    state_changes: Vec<UnitStateChange>,
    units_to_create: Vec<Unit>,
    origin: Origin,
    proposed_timestamp: Option<TimeStamp>,
    hash_bits: HashBits,
}

impl PendingTransactionBuilder {
    /// Start a draft. `origin_source` tags where the proposal came from
    /// (a contract name, a handler, a fixture).
    pub fn new(origin_source: &str) -> Self {
        Self {
            moves: Vec::new(),
            state_changes: Vec::new(),
            units_to_create: Vec::new(),
            origin: Origin::new(origin_source),
            proposed_timestamp: None,
            hash_bits: HashBits::default(),
        }
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn add_move(mut self, mv: Move) -> Self {
        self.moves.push(mv);
        self
    }

    pub fn change_state(mut self, change: UnitStateChange) -> Self {
        self.state_changes.push(change);
        self
    }

    pub fn create_unit(mut self, unit: Unit) -> Self {
        self.units_to_create.push(unit);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.origin = self.origin.with_seed(seed);
        self
    }

    pub fn input(mut self, key: &str, value: StateValue) -> Self {
        self.origin = self.origin.with_input(key, value);
        self
    }

    pub fn proposed_at(mut self, timestamp: TimeStamp) -> Self {
        self.proposed_timestamp = Some(timestamp);
        self
    }

    pub fn hash_bits(mut self, bits: HashBits) -> Self {
        self.hash_bits = bits;
        self
    }

    /// Validate, sort and seal the draft under its content hash.
    pub fn finalise(self) -> Result<PendingTransaction, BuildError> {
        let proposed_timestamp = self.proposed_timestamp.ok_or(BuildError::MissingTimestamp)?;

        if self.moves.is_empty() && self.state_changes.is_empty() && self.units_to_create.is_empty()
        {
            return Err(BuildError::EmptyTransaction);
        }

        let mut state_changes = self.state_changes;
        state_changes.sort_by(|a, b| a.unit_symbol().cmp(b.unit_symbol()));
        for pair in state_changes.windows(2) {
            if pair[0].unit_symbol() == pair[1].unit_symbol() {
                return Err(BuildError::DuplicateEntry {
                    kind: "state change",
                    symbol: pair[0].unit_symbol().to_string(),
                });
            }
        }

        let mut units_to_create = self.units_to_create;
        units_to_create.sort_by(|a, b| a.symbol().cmp(b.symbol()));
        for pair in units_to_create.windows(2) {
            if pair[0].symbol() == pair[1].symbol() {
                return Err(BuildError::DuplicateEntry {
                    kind: "unit registration",
                    symbol: pair[0].symbol().to_string(),
                });
            }
        }

        let intent_id = canonical::intent_id(
            &self.moves,
            &state_changes,
            &units_to_create,
            &self.origin,
            proposed_timestamp,
            self.hash_bits,
        );

        Ok(PendingTransaction::from_parts(
            self.moves,
            state_changes,
            units_to_create,
            self.origin,
            proposed_timestamp,
            intent_id,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Amount;
    use crate::types::UnitState;

    fn amt(s: &str) -> Amount {
        s.parse().unwrap()
    }

    fn ts() -> TimeStamp {
        TimeStamp::new_with(2024, 1, 1, 0, 0, 0)
    }

    #[test]
    fn finalise_requires_a_timestamp() {
        let mv = Move::new(amt("1"), "USD", "alice", "bob").unwrap();
        let err = PendingTransactionBuilder::new("test")
            .add_move(mv)
            .finalise()
            .unwrap_err();
        assert_eq!(err, BuildError::MissingTimestamp);
    }

    #[test]
    fn finalise_rejects_empty_drafts() {
        let err = PendingTransactionBuilder::new("test")
            .proposed_at(ts())
            .finalise()
            .unwrap_err();
        assert_eq!(err, BuildError::EmptyTransaction);
    }

    #[test]
    fn state_changes_come_out_sorted() {
        let zeta = UnitStateChange::new("ZETA", UnitState::new(), UnitState::new()).unwrap();
        let alpha = UnitStateChange::new("ALPHA", UnitState::new(), UnitState::new()).unwrap();

        let pending = PendingTransactionBuilder::new("test")
            .change_state(zeta)
            .change_state(alpha)
            .proposed_at(ts())
            .finalise()
            .unwrap();

        let symbols: Vec<&str> = pending
            .state_changes()
            .iter()
            .map(|sc| sc.unit_symbol())
            .collect();
        assert_eq!(symbols, vec!["ALPHA", "ZETA"]);
    }

    #[test]
    fn duplicate_state_changes_are_rejected() {
        let a = UnitStateChange::new("USD", UnitState::new(), UnitState::new()).unwrap();
        let b = UnitStateChange::new("USD", UnitState::new(), UnitState::new()).unwrap();

        let err = PendingTransactionBuilder::new("test")
            .change_state(a)
            .change_state(b)
            .proposed_at(ts())
            .finalise()
            .unwrap_err();
        assert!(matches!(err, BuildError::DuplicateEntry { .. }));
    }

    #[test]
    fn equal_content_yields_equal_intent_id() {
        let build = || {
            PendingTransactionBuilder::new("test")
                .add_move(Move::new(amt("10"), "USD", "alice", "bob").unwrap())
                .input("k", StateValue::Int(1))
                .proposed_at(ts())
                .finalise()
                .unwrap()
        };

        assert_eq!(build().intent_id(), build().intent_id());
    }

    #[test]
    fn origin_changes_identity() {
        let mv = || Move::new(amt("10"), "USD", "alice", "bob").unwrap();
        let a = PendingTransactionBuilder::new("test")
            .add_move(mv())
            .proposed_at(ts())
            .finalise()
            .unwrap();
        let b = PendingTransactionBuilder::new("test")
            .add_move(mv())
            .seed(42)
            .proposed_at(ts())
            .finalise()
            .unwrap();

        assert_ne!(a.intent_id(), b.intent_id());
    }
}
