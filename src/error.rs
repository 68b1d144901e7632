//! Error and result taxonomies.
//!
//! Validation failures are values: `execute` returns [`ExecuteResult`]
//! and never panics or throws past the caller. Handler and contract
//! failures are genuinely exceptional and travel through
//! [`LedgerError::Handler`] untouched.

use crate::decimal::Amount;
use crate::transaction::{TimeStamp, Transaction};
use crate::types::StateValue;

/// Construction-time failures for value types and builders.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("invalid quantity {value:?}: {detail}")]
    InvalidQuantity { value: String, detail: String },
    #[error("move source and destination are both {wallet:?}")]
    SameWallet { wallet: String },
    #[error("{field} must be non-empty")]
    EmptyIdentifier { field: &'static str },
    #[error("min_balance {min} exceeds max_balance {max}")]
    InvertedBounds { min: Amount, max: Amount },
    #[error("duplicate {kind} for {symbol:?}")]
    DuplicateEntry { kind: &'static str, symbol: String },
    #[error("transaction has no moves, state changes or unit registrations")]
    EmptyTransaction,
    #[error("proposed timestamp was never set")]
    MissingTimestamp,
}

/// Why a `PendingTransaction` was not applied.
///
/// Stable and programmatic: every variant carries enough context to
/// diagnose without logs, and tests assert on the variant itself.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RejectReason {
    #[error("intent {intent_id} was already executed")]
    DuplicateIntent { intent_id: String },
    #[error("unit {symbol:?} is not registered")]
    UnknownUnit { symbol: String },
    #[error("unit {symbol:?} is already registered with a different definition")]
    UnitConflict { symbol: String },
    #[error("wallet {wallet:?} is not registered")]
    UnknownWallet { wallet: String },
    #[error(
        "balance of {wallet:?} in {unit:?} would become {proposed}, outside [{min}, {max}]"
    )]
    BalanceOutOfRange {
        wallet: String,
        unit: String,
        proposed: Amount,
        min: Amount,
        max: Amount,
    },
    #[error("transfer rule on {unit:?} rejected the move: {message}")]
    TransferRuleViolation { unit: String, message: String },
    #[error("stale state on {unit:?} key {key:?}: expected {expected:?}, found {actual:?}")]
    StaleState {
        unit: String,
        key: String,
        expected: Option<StateValue>,
        actual: Option<StateValue>,
    },
    #[error("proposed timestamp {proposed} precedes ledger time {current}")]
    InvalidTimestamp {
        proposed: TimeStamp,
        current: TimeStamp,
    },
    #[error("degenerate move: {detail}")]
    DegenerateMove { detail: String },
}

/// Outcome of [`crate::ledger::Ledger::execute`].
#[derive(Debug, Clone, PartialEq)]
pub enum ExecuteResult {
    /// Validated and applied; the executed record is returned.
    Applied(Transaction),
    /// The intent was seen before; the ledger is unchanged.
    AlreadyApplied { exec_id: String },
    /// Validation failed; the ledger is unchanged.
    Rejected(RejectReason),
}

impl ExecuteResult {
    pub fn is_applied(&self) -> bool {
        matches!(self, ExecuteResult::Applied(_))
    }

    pub fn applied(self) -> Option<Transaction> {
        match self {
            ExecuteResult::Applied(tx) => Some(tx),
            _ => None,
        }
    }
}

/// Advisory record emitted when a state change's `old_state` disagrees
/// with the unit state found at execution time.
#[derive(Debug, Clone, PartialEq)]
pub struct StaleNotice {
    pub unit_symbol: String,
    pub key: String,
    pub expected: Option<StateValue>,
    pub actual: Option<StateValue>,
    pub intent_id: String,
}

/// Operational failures of the ledger and lifecycle engine.
#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error("time cannot move backward: target {target} precedes current {current}")]
    TimeReversal {
        target: TimeStamp,
        current: TimeStamp,
    },
    #[error("cascade did not settle within {passes} passes")]
    UnboundedCascade { passes: u32 },
    #[error("no handler registered for action {action:?}")]
    UnknownAction { action: String },
    #[error("invalid ledger configuration: {detail}")]
    InvalidConfig { detail: String },
    #[error("unit {symbol:?} is already registered with a different definition")]
    UnitConflict { symbol: String },
    #[error("set_balance requires test_mode")]
    TestModeRequired,
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

/// Failures of the optional persisted-log layer.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sled::Error),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error(
        "stored transaction {sequence} fails its identity check: stored {stored}, recomputed {recomputed}"
    )]
    IdentityMismatch {
        sequence: u64,
        stored: String,
        recomputed: String,
    },
    #[error("replay rejected transaction {sequence}: {reason}")]
    ReplayRejected { sequence: u64, reason: String },
}
