//! A deterministic, in-memory double-entry ledger kernel.
//!
//! One mutation point ([`Ledger::execute`]) validates and atomically
//! applies content-addressed transactions; a lifecycle engine drives
//! scheduled events and contract polling with bounded cascades; and any
//! historical state can be rebuilt by walking the log backwards
//! ([`Ledger::clone_at`]). Everything is deterministic: no wall clock,
//! no ambient randomness, no floats, no hash-order dependence.

pub mod builder;
pub mod canonical;
pub mod config;
pub mod decimal;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod rules;
pub mod scheduler;
pub mod store;
pub mod transaction;
pub mod types;
pub mod utils;
pub mod view;

pub use builder::PendingTransactionBuilder;
pub use config::{HashBits, LedgerConfig, StaleMode};
pub use decimal::Amount;
pub use error::{BuildError, ExecuteResult, LedgerError, RejectReason, StaleNotice, StoreError};
pub use ledger::Ledger;
pub use lifecycle::LifecycleEngine;
pub use rules::{EventHandler, HandlerOutcome, SmartContract, TransferRule, Violation};
pub use scheduler::{Event, Scheduler};
pub use store::LogStore;
pub use transaction::{PendingTransaction, TimeStamp, Transaction};
pub use types::{Move, Origin, StateValue, Unit, UnitState, UnitStateChange, SYSTEM_WALLET};
pub use view::{LedgerView, Prices};
