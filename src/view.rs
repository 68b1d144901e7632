//! Read-only ledger surface handed to pure code.

use std::collections::{BTreeMap, BTreeSet};

use crate::decimal::Amount;
use crate::transaction::TimeStamp;
use crate::types::UnitState;

/// Price map passed into every lifecycle step and contract call. The
/// kernel never reads prices from anywhere else.
pub type Prices = BTreeMap<String, Amount>;

/// Snapshot reads over a ledger.
///
/// Every return value is an owned copy: it stays valid (and unchanged)
/// after the ledger mutates. The view a handler or contract receives is
/// only guaranteed for the duration of that call.
pub trait LedgerView {
    /// Balance of `wallet` in `unit_symbol`; missing entries are zero.
    fn get_balance(&self, wallet: &str, unit_symbol: &str) -> Amount;

    /// Current state mapping of a unit, `None` if unregistered.
    fn get_unit_state(&self, unit_symbol: &str) -> Option<UnitState>;

    /// Non-zero holders of a unit, in wallet order.
    fn get_positions(&self, unit_symbol: &str) -> BTreeMap<String, Amount>;

    /// Registered wallets. `SYSTEM_WALLET` is implicit and not listed.
    fn list_wallets(&self) -> BTreeSet<String>;

    fn current_time(&self) -> TimeStamp;
}
