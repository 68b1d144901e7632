//! Per-step lifecycle orchestration: scheduled events, contract
//! polling, and cascade resolution with bounded passes.

use std::collections::BTreeMap;

use crate::error::{ExecuteResult, LedgerError};
use crate::ledger::Ledger;
use crate::rules::{EventHandler, SmartContract};
use crate::scheduler::Scheduler;
use crate::transaction::{TimeStamp, Transaction};
use crate::view::Prices;

/// Drives a ledger forward one timestamp at a time.
///
/// Registries are ordered maps, so handler dispatch and contract
/// polling visit entries in one deterministic order every run.
#[derive(Default)]
pub struct LifecycleEngine {
    scheduler: Scheduler,
    handlers: BTreeMap<String, Box<dyn EventHandler>>,
    contracts: BTreeMap<String, Box<dyn SmartContract>>,
}

impl LifecycleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_handler(&mut self, action: &str, handler: Box<dyn EventHandler>) {
        self.handlers.insert(action.to_string(), handler);
    }

    pub fn register_contract(&mut self, unit_type: &str, contract: Box<dyn SmartContract>) {
        self.contracts.insert(unit_type.to_string(), contract);
    }

    /// The event queue, for pre-scheduling and inspection.
    pub fn scheduler(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Advance the ledger to `timestamp`, then run cascade passes until
    /// a pass makes no progress: due events first (in queue order),
    /// then contract polling (unit types sorted, symbols sorted).
    ///
    /// Follow-up events due at `timestamp` surface in the next pass of
    /// this same step; later ones wait for a future step. A step that
    /// is still progressing after `max_cascade_passes` passes is an
    /// unbounded cascade and fails fatally.
    pub fn step(
        &mut self,
        ledger: &mut Ledger,
        timestamp: TimeStamp,
        prices: &Prices,
    ) -> Result<Vec<Transaction>, LedgerError> {
        ledger.advance_time(timestamp)?;

        let max_passes = ledger.config().max_cascade_passes;
        let mut executed = Vec::new();
        let mut pass = 0u32;

        loop {
            pass += 1;
            if pass > max_passes {
                return Err(LedgerError::UnboundedCascade { passes: max_passes });
            }
            let mut progress = false;

            for event in self.scheduler.get_due(timestamp) {
                let handler =
                    self.handlers
                        .get(event.action())
                        .ok_or_else(|| LedgerError::UnknownAction {
                            action: event.action().to_string(),
                        })?;

                let outcome = handler.handle(&event, &*ledger, prices)?;

                if let Some(pending) = outcome.pending {
                    if let ExecuteResult::Applied(tx) = ledger.execute(&pending) {
                        executed.push(tx);
                        progress = true;
                    }
                    self.scheduler.mark_executed(event.event_id());
                }
                for follow_up in outcome.follow_ups {
                    self.scheduler.schedule(follow_up);
                }
            }

            for (unit_type, contract) in &self.contracts {
                for symbol in ledger.units_of_type(unit_type) {
                    let produced =
                        contract.check_lifecycle(&*ledger, &symbol, timestamp, prices)?;
                    if let Some(pending) = produced {
                        if let ExecuteResult::Applied(tx) = ledger.execute(&pending) {
                            executed.push(tx);
                            progress = true;
                        }
                    }
                }
            }

            log::debug!(
                "lifecycle pass {pass}: {} executed so far, progress={progress}",
                executed.len(),
            );

            if !progress {
                break;
            }
        }

        Ok(executed)
    }
}
