//! Pluggable validation and lifecycle seams.
//!
//! Transfer rules veto individual moves during validation. Smart
//! contracts and event handlers produce transactions during lifecycle
//! steps. All three see the ledger only through [`LedgerView`] and must
//! be deterministic: no clocks, no ambient randomness, no hidden state.

use crate::scheduler::Event;
use crate::transaction::{PendingTransaction, TimeStamp};
use crate::types::Move;
use crate::view::{LedgerView, Prices};

/// A transfer rule's only legal complaint. Anything else a rule does
/// wrong (panic, logic error) propagates; the execution core catches
/// exactly this.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct Violation {
    pub message: String,
}

impl Violation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Per-unit move predicate, attached at registration time.
pub trait TransferRule: Send + Sync {
    fn check(&self, view: &dyn LedgerView, mv: &Move) -> Result<(), Violation>;
}

/// Instrument lifecycle logic, registered by `unit_type`. Polled once
/// per symbol per cascade pass; `None` means nothing to do.
pub trait SmartContract {
    fn check_lifecycle(
        &self,
        view: &dyn LedgerView,
        symbol: &str,
        timestamp: TimeStamp,
        prices: &Prices,
    ) -> anyhow::Result<Option<PendingTransaction>>;
}

/// What an event handler wants done: optionally a transaction, plus any
/// follow-up events. Handlers never touch the scheduler directly; the
/// engine schedules `follow_ups` after the handler returns, which keeps
/// the same-pass visibility rules intact.
#[derive(Debug, Default)]
pub struct HandlerOutcome {
    pub pending: Option<PendingTransaction>,
    pub follow_ups: Vec<Event>,
}

impl HandlerOutcome {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn transact(pending: PendingTransaction) -> Self {
        Self {
            pending: Some(pending),
            follow_ups: Vec::new(),
        }
    }

    pub fn with_follow_up(mut self, event: Event) -> Self {
        self.follow_ups.push(event);
        self
    }
}

/// Scheduled-event logic, registered by action name. An event whose
/// action has no registered handler is a programming error and aborts
/// the step.
pub trait EventHandler {
    fn handle(
        &self,
        event: &Event,
        view: &dyn LedgerView,
        prices: &Prices,
    ) -> anyhow::Result<HandlerOutcome>;
}
