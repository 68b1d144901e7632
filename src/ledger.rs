//! The ledger: state, the single mutation point, and time travel.
//!
//! `execute` is the only way state changes. Validation never writes
//! (beyond a tentative unit set it rolls back), apply never fails, and
//! everything the apply does is recorded completely enough that
//! [`Ledger::clone_at`] can walk the log backwards to any earlier
//! moment.

use std::collections::{BTreeMap, BTreeSet};

use crate::builder::PendingTransactionBuilder;
use crate::canonical;
use crate::config::{LedgerConfig, StaleMode};
use crate::decimal::Amount;
use crate::error::{ExecuteResult, LedgerError, RejectReason, StaleNotice};
use crate::transaction::{PendingTransaction, TimeStamp, Transaction};
use crate::types::{Move, StateValue, Unit, UnitState, SYSTEM_WALLET};
use crate::view::LedgerView;

/// Net balance deltas of one transaction: `(wallet, unit) -> Amount`.
type NetDeltas = BTreeMap<(String, String), Amount>;

/// A deterministic, single-writer double-entry ledger.
///
/// Not for concurrent use: one instance belongs to one thread. Parallel
/// simulation clones the ledger and drives each copy independently.
#[derive(Debug, Clone)]
pub struct Ledger {
    config: LedgerConfig,
    balances: BTreeMap<(String, String), Amount>,
    units: BTreeMap<String, Unit>,
    wallets: BTreeSet<String>,
    log: Vec<Transaction>,
    seen_intent_ids: BTreeMap<String, String>,
    positions: BTreeMap<String, BTreeMap<String, Amount>>,
    current_time: TimeStamp,
    next_sequence: u64,
    stale_notices: Vec<StaleNotice>,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Result<Self, LedgerError> {
        config.validate()?;

        Ok(Self {
            current_time: config.initial_time,
            config,
            balances: BTreeMap::new(),
            units: BTreeMap::new(),
            wallets: BTreeSet::new(),
            log: Vec::new(),
            seen_intent_ids: BTreeMap::new(),
            positions: BTreeMap::new(),
            next_sequence: 0,
            stale_notices: Vec::new(),
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Register a wallet. Idempotent; not a logged transaction.
    pub fn register_wallet(&mut self, name: &str) -> Result<(), LedgerError> {
        if name.is_empty() {
            return Err(crate::error::BuildError::EmptyIdentifier { field: "wallet" }.into());
        }
        self.wallets.insert(name.to_string());
        Ok(())
    }

    /// Register a unit directly. Idempotent for identical definitions;
    /// a different definition under an existing symbol is a conflict.
    ///
    /// Initial registrations live in current state, not the log; a
    /// caller who wants the registration recorded (and unwindable)
    /// submits it through `units_to_create` on a pending transaction.
    pub fn register_unit(&mut self, unit: Unit) -> Result<(), LedgerError> {
        match self.units.get(unit.symbol()) {
            None => {
                self.units.insert(unit.symbol().to_string(), unit);
                Ok(())
            }
            Some(existing) if existing.same_definition(&unit) => Ok(()),
            Some(_) => Err(LedgerError::UnitConflict {
                symbol: unit.symbol().to_string(),
            }),
        }
    }

    /// Validate and atomically apply one pending transaction.
    pub fn execute(&mut self, pending: &PendingTransaction) -> ExecuteResult {
        if let Some(exec_id) = self.seen_intent_ids.get(pending.intent_id()) {
            return ExecuteResult::AlreadyApplied {
                exec_id: exec_id.clone(),
            };
        }

        // Tentative registration: units the transaction brings along
        // become visible to the rest of validation, and are rolled back
        // wholesale if anything rejects.
        let mut registered = Vec::new();
        for unit in pending.units_to_create() {
            match self.units.get(unit.symbol()) {
                None => {
                    self.units.insert(unit.symbol().to_string(), unit.clone());
                    registered.push(unit.symbol().to_string());
                }
                Some(existing) if existing.same_definition(unit) => {}
                Some(_) => {
                    self.roll_back_units(&registered);
                    return ExecuteResult::Rejected(RejectReason::UnitConflict {
                        symbol: unit.symbol().to_string(),
                    });
                }
            }
        }

        match self.validate(pending) {
            Err(reason) => {
                self.roll_back_units(&registered);
                ExecuteResult::Rejected(reason)
            }
            Ok(net) => self.apply(pending, net, registered),
        }
    }

    fn roll_back_units(&mut self, registered: &[String]) {
        for symbol in registered {
            self.units.remove(symbol);
        }
    }

    fn validate(&mut self, pending: &PendingTransaction) -> Result<NetDeltas, RejectReason> {
        for mv in pending.moves() {
            if !self.units.contains_key(mv.unit_symbol()) {
                return Err(RejectReason::UnknownUnit {
                    symbol: mv.unit_symbol().to_string(),
                });
            }
            for wallet in [mv.source(), mv.dest()] {
                if wallet != SYSTEM_WALLET && !self.wallets.contains(wallet) {
                    return Err(RejectReason::UnknownWallet {
                        wallet: wallet.to_string(),
                    });
                }
            }
        }
        for change in pending.state_changes() {
            if !self.units.contains_key(change.unit_symbol()) {
                return Err(RejectReason::UnknownUnit {
                    symbol: change.unit_symbol().to_string(),
                });
            }
        }

        let net = self.accumulate_net(pending.moves())?;

        for ((wallet, unit_symbol), delta) in &net {
            if wallet == SYSTEM_WALLET {
                continue;
            }
            let Some(unit) = self.units.get(unit_symbol) else {
                continue;
            };
            let proposed = &self.balance_of(wallet, unit_symbol) + delta;
            if proposed < *unit.min_balance() || proposed > *unit.max_balance() {
                return Err(RejectReason::BalanceOutOfRange {
                    wallet: wallet.clone(),
                    unit: unit_symbol.clone(),
                    proposed,
                    min: unit.min_balance().clone(),
                    max: unit.max_balance().clone(),
                });
            }
        }

        for mv in pending.moves() {
            let rule = self
                .units
                .get(mv.unit_symbol())
                .and_then(|unit| unit.transfer_rule());
            if let Some(rule) = rule {
                rule.check(&*self, mv)
                    .map_err(|violation| RejectReason::TransferRuleViolation {
                        unit: mv.unit_symbol().to_string(),
                        message: violation.message,
                    })?;
            }
        }

        if pending.proposed_timestamp() < self.current_time {
            return Err(RejectReason::InvalidTimestamp {
                proposed: pending.proposed_timestamp(),
                current: self.current_time,
            });
        }

        self.check_stale_state(pending)?;

        Ok(net)
    }

    fn accumulate_net(&self, moves: &[Move]) -> Result<NetDeltas, RejectReason> {
        let mut net = NetDeltas::new();
        for mv in moves {
            if mv.quantity().is_zero() {
                return Err(RejectReason::DegenerateMove {
                    detail: "zero quantity".to_string(),
                });
            }
            if mv.source() == mv.dest() {
                return Err(RejectReason::DegenerateMove {
                    detail: format!("source and destination are both {:?}", mv.source()),
                });
            }

            *net.entry((mv.dest().to_string(), mv.unit_symbol().to_string()))
                .or_insert_with(Amount::zero) += mv.quantity();
            *net.entry((mv.source().to_string(), mv.unit_symbol().to_string()))
                .or_insert_with(Amount::zero) -= mv.quantity();
        }

        // Precision caps round the accumulated net per wallet, never an
        // individual move; callers supply pre-rounded quantities.
        for ((_, unit_symbol), delta) in net.iter_mut() {
            if let Some(places) = self
                .units
                .get(unit_symbol)
                .and_then(|unit| unit.decimal_places())
            {
                *delta = delta.round_dp(places as i64);
            }
        }

        Ok(net)
    }

    // Runs last in validation: in warn mode a notice here means the
    // transaction is definitely about to apply.
    fn check_stale_state(&mut self, pending: &PendingTransaction) -> Result<(), RejectReason> {
        for change in pending.state_changes() {
            let current_state = self
                .units
                .get(change.unit_symbol())
                .map(|unit| unit.state().clone())
                .unwrap_or_default();

            let mut keys: BTreeSet<&String> = change.old_state().keys().collect();
            keys.extend(current_state.keys());

            for key in keys {
                let expected = change.old_state().get(key);
                let actual = current_state.get(key);
                if expected == actual {
                    continue;
                }
                match self.config.stale_mode {
                    StaleMode::Reject => {
                        return Err(RejectReason::StaleState {
                            unit: change.unit_symbol().to_string(),
                            key: key.clone(),
                            expected: expected.cloned(),
                            actual: actual.cloned(),
                        });
                    }
                    StaleMode::Warn => {
                        log::warn!(
                            "stale state on {:?} key {:?} in intent {}",
                            change.unit_symbol(),
                            key,
                            pending.intent_id(),
                        );
                        self.stale_notices.push(StaleNotice {
                            unit_symbol: change.unit_symbol().to_string(),
                            key: key.clone(),
                            expected: expected.cloned(),
                            actual: actual.cloned(),
                            intent_id: pending.intent_id().to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn apply(
        &mut self,
        pending: &PendingTransaction,
        net: NetDeltas,
        registered_units: Vec<String>,
    ) -> ExecuteResult {
        for ((wallet, unit_symbol), delta) in net {
            if delta.is_zero() {
                continue;
            }
            self.shift_balance(&wallet, &unit_symbol, &delta);
        }

        for change in pending.state_changes() {
            if let Some(unit) = self.units.get_mut(change.unit_symbol()) {
                *unit = unit.replace_state(change.new_state().clone());
            }
        }

        let exec_id = canonical::derive_exec_id(
            &self.config.name,
            self.next_sequence,
            pending.intent_id(),
            self.config.hash_bits,
        );
        let execution_time = self.current_time.max(pending.proposed_timestamp());
        let tx = Transaction::new(
            pending.clone(),
            exec_id.clone(),
            self.config.name.clone(),
            execution_time,
            self.next_sequence,
            registered_units,
        );

        self.log.push(tx.clone());
        self.seen_intent_ids
            .insert(pending.intent_id().to_string(), exec_id);
        self.next_sequence += 1;
        self.current_time = execution_time;

        ExecuteResult::Applied(tx)
    }

    // Balances and the positions index never hold zero entries, so
    // structural equality of two ledgers is value equality.
    fn shift_balance(&mut self, wallet: &str, unit_symbol: &str, delta: &Amount) {
        let key = (wallet.to_string(), unit_symbol.to_string());
        let next = &self.balance_of(wallet, unit_symbol) + delta;

        if next.is_zero() {
            self.balances.remove(&key);
            if let Some(holders) = self.positions.get_mut(unit_symbol) {
                holders.remove(wallet);
                if holders.is_empty() {
                    self.positions.remove(unit_symbol);
                }
            }
        } else {
            self.balances.insert(key, next.clone());
            self.positions
                .entry(unit_symbol.to_string())
                .or_default()
                .insert(wallet.to_string(), next);
        }
    }

    fn balance_of(&self, wallet: &str, unit_symbol: &str) -> Amount {
        self.balances
            .get(&(wallet.to_string(), unit_symbol.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Advance the logical clock. Equal targets are fine; going
    /// backward is not.
    pub fn advance_time(&mut self, target: TimeStamp) -> Result<(), LedgerError> {
        if target < self.current_time {
            return Err(LedgerError::TimeReversal {
                target,
                current: self.current_time,
            });
        }
        self.current_time = target;
        Ok(())
    }

    /// Sum of all balances in a unit. Exactly zero for every unit on
    /// every reachable ledger; callers use it as a self-check.
    pub fn total_supply(&self, unit_symbol: &str) -> Amount {
        let mut total = Amount::zero();
        for ((_, unit), balance) in &self.balances {
            if unit == unit_symbol {
                total += balance;
            }
        }
        total
    }

    pub fn log_iter(&self) -> impl Iterator<Item = &Transaction> {
        self.log.iter()
    }

    pub fn log_len(&self) -> usize {
        self.log.len()
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn seen_count(&self) -> usize {
        self.seen_intent_ids.len()
    }

    pub fn get_unit(&self, symbol: &str) -> Option<&Unit> {
        self.units.get(symbol)
    }

    pub fn list_units(&self) -> Vec<String> {
        self.units.keys().cloned().collect()
    }

    /// Symbols of every unit with the given type tag, sorted.
    pub fn units_of_type(&self, unit_type: &str) -> Vec<String> {
        self.units
            .values()
            .filter(|unit| unit.unit_type() == unit_type)
            .map(|unit| unit.symbol().to_string())
            .collect()
    }

    /// Raw balances map, for equality checks and diagnostics.
    pub fn balances(&self) -> &BTreeMap<(String, String), Amount> {
        &self.balances
    }

    /// Raw units map, for equality checks and diagnostics.
    pub fn units(&self) -> &BTreeMap<String, Unit> {
        &self.units
    }

    /// Drain the stale-state advisories accumulated since the last call.
    pub fn drain_stale_notices(&mut self) -> Vec<StaleNotice> {
        std::mem::take(&mut self.stale_notices)
    }

    /// Fixture-only direct balance write. Builds a synthetic
    /// `SYSTEM_WALLET` move and routes it through `execute`; never
    /// bypasses validation or the log.
    pub fn set_balance(
        &mut self,
        wallet: &str,
        unit_symbol: &str,
        target: Amount,
    ) -> Result<ExecuteResult, LedgerError> {
        if !self.config.test_mode {
            return Err(LedgerError::TestModeRequired);
        }

        let delta = &target - &self.balance_of(wallet, unit_symbol);
        if delta.is_zero() {
            return Ok(ExecuteResult::Rejected(RejectReason::DegenerateMove {
                detail: "balance already at target".to_string(),
            }));
        }

        let mv = Move::new(delta, unit_symbol, SYSTEM_WALLET, wallet)?;
        let pending = PendingTransactionBuilder::new("set_balance")
            .hash_bits(self.config.hash_bits)
            .add_move(mv)
            .input("wallet", StateValue::from(wallet))
            .input("unit", StateValue::from(unit_symbol))
            .input("target", StateValue::Amount(target))
            .proposed_at(self.current_time)
            .finalise()?;

        Ok(self.execute(&pending))
    }

    /// Reconstruct the ledger as of `target`: clone the present, then
    /// walk the log backwards undoing every transaction executed after
    /// that moment. Replaying forward from empty would miss balances
    /// and registrations that predate the log; walking backward cannot.
    pub fn clone_at(&self, target: TimeStamp) -> Ledger {
        let mut snapshot = self.clone();

        while snapshot
            .log
            .last()
            .is_some_and(|tx| tx.execution_time() > target)
        {
            if let Some(tx) = snapshot.log.pop() {
                snapshot.unwind_transaction(&tx);
            }
        }

        snapshot.current_time = target;
        snapshot.next_sequence = snapshot
            .log
            .last()
            .map(|tx| tx.sequence_number() + 1)
            .unwrap_or(0);
        snapshot.seen_intent_ids = snapshot
            .log
            .iter()
            .map(|tx| (tx.intent_id().to_string(), tx.exec_id().to_string()))
            .collect();
        snapshot.stale_notices.clear();

        snapshot
    }

    fn unwind_transaction(&mut self, tx: &Transaction) {
        for mv in tx.moves() {
            self.shift_balance(mv.source(), mv.unit_symbol(), mv.quantity());
            self.shift_balance(mv.dest(), mv.unit_symbol(), &-mv.quantity());
        }

        for change in tx.state_changes().iter().rev() {
            if let Some(unit) = self.units.get_mut(change.unit_symbol()) {
                *unit = unit.replace_state(change.old_state().clone());
            }
        }

        for symbol in tx.registered_units() {
            self.units.remove(symbol);
        }
    }
}

impl LedgerView for Ledger {
    fn get_balance(&self, wallet: &str, unit_symbol: &str) -> Amount {
        self.balance_of(wallet, unit_symbol)
    }

    fn get_unit_state(&self, unit_symbol: &str) -> Option<UnitState> {
        self.units.get(unit_symbol).map(|unit| unit.state().clone())
    }

    fn get_positions(&self, unit_symbol: &str) -> BTreeMap<String, Amount> {
        self.positions.get(unit_symbol).cloned().unwrap_or_default()
    }

    fn list_wallets(&self) -> BTreeSet<String> {
        self.wallets.clone()
    }

    fn current_time(&self) -> TimeStamp {
        self.current_time
    }
}
