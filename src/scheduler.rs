//! Ordered scheduled-event queue with content-addressed dedup.
//!
//! Events are totally ordered by `(trigger_time, priority, symbol,
//! event_id)`; the id is a canonical hash of the event's content, so the
//! final tie-break is deterministic across runs and processes.

use std::collections::{BTreeMap, BTreeSet};

use crate::canonical;
use crate::config::HashBits;
use crate::error::BuildError;
use crate::transaction::TimeStamp;
use crate::types::UnitState;

/// A scheduled lifecycle event. Identity is content: two events with
/// the same action, symbol, trigger time and params are one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    action: String,
    symbol: String,
    trigger_time: TimeStamp,
    priority: i64,
    params: UnitState,
    event_id: String,
}

impl Event {
    pub fn new(
        action: &str,
        symbol: &str,
        trigger_time: TimeStamp,
        priority: i64,
        params: UnitState,
    ) -> Result<Self, BuildError> {
        if action.is_empty() {
            return Err(BuildError::EmptyIdentifier { field: "action" });
        }
        if symbol.is_empty() {
            return Err(BuildError::EmptyIdentifier { field: "symbol" });
        }

        let event_id =
            canonical::derive_event_id(action, symbol, trigger_time, &params, HashBits::B128);

        Ok(Self {
            action: action.to_string(),
            symbol: symbol.to_string(),
            trigger_time,
            priority,
            params,
            event_id,
        })
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn trigger_time(&self) -> TimeStamp {
        self.trigger_time
    }

    pub fn priority(&self) -> i64 {
        self.priority
    }

    pub fn params(&self) -> &UnitState {
        &self.params
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct EventKey {
    trigger_time: TimeStamp,
    priority: i64,
    symbol: String,
    event_id: String,
}

impl EventKey {
    fn of(event: &Event) -> Self {
        Self {
            trigger_time: event.trigger_time,
            priority: event.priority,
            symbol: event.symbol.clone(),
            event_id: event.event_id.clone(),
        }
    }
}

/// Priority queue over [`Event`] with dedup against both the queue and
/// the executed set.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    queue: BTreeMap<EventKey, Event>,
    queued_ids: BTreeSet<String>,
    executed_ids: BTreeSet<String>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue unless the same event id is already queued or already
    /// executed. Returns whether the event was actually added.
    pub fn schedule(&mut self, event: Event) -> bool {
        if self.queued_ids.contains(&event.event_id) || self.executed_ids.contains(&event.event_id)
        {
            return false;
        }

        self.queued_ids.insert(event.event_id.clone());
        self.queue.insert(EventKey::of(&event), event);
        true
    }

    /// Pop every event with `trigger_time <= as_of`, in ordering-key
    /// order.
    pub fn get_due(&mut self, as_of: TimeStamp) -> Vec<Event> {
        let due_keys: Vec<EventKey> = self
            .queue
            .keys()
            .take_while(|key| key.trigger_time <= as_of)
            .cloned()
            .collect();

        let mut due = Vec::with_capacity(due_keys.len());
        for key in due_keys {
            if let Some(event) = self.queue.remove(&key) {
                self.queued_ids.remove(&event.event_id);
                due.push(event);
            }
        }
        due
    }

    /// Record an id as executed; future `schedule` calls with it no-op.
    pub fn mark_executed(&mut self, event_id: &str) {
        self.executed_ids.insert(event_id.to_string());
    }

    pub fn is_executed(&self, event_id: &str) -> bool {
        self.executed_ids.contains(event_id)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Trigger time of the next queued event, if any.
    pub fn next_trigger(&self) -> Option<TimeStamp> {
        self.queue.keys().next().map(|key| key.trigger_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(sec: u32) -> TimeStamp {
        TimeStamp::new_with(2024, 1, 1, 0, 0, sec)
    }

    fn ev(action: &str, symbol: &str, at: TimeStamp, priority: i64) -> Event {
        Event::new(action, symbol, at, priority, UnitState::new()).unwrap()
    }

    #[test]
    fn due_events_come_out_in_key_order() {
        let mut sched = Scheduler::new();
        sched.schedule(ev("coupon", "BOND-2", ts(5), 0));
        sched.schedule(ev("coupon", "BOND-1", ts(5), 0));
        sched.schedule(ev("expiry", "OPT-1", ts(1), 0));
        sched.schedule(ev("coupon", "BOND-3", ts(5), -1));

        let due = sched.get_due(ts(10));
        let symbols: Vec<&str> = due.iter().map(|e| e.symbol()).collect();
        assert_eq!(symbols, vec!["OPT-1", "BOND-3", "BOND-1", "BOND-2"]);
        assert!(sched.is_empty());
    }

    #[test]
    fn future_events_stay_queued() {
        let mut sched = Scheduler::new();
        sched.schedule(ev("expiry", "OPT-1", ts(30), 0));

        assert!(sched.get_due(ts(10)).is_empty());
        assert_eq!(sched.len(), 1);
        assert_eq!(sched.next_trigger(), Some(ts(30)));
    }

    #[test]
    fn schedule_dedupes_by_content() {
        let mut sched = Scheduler::new();
        assert!(sched.schedule(ev("coupon", "BOND-1", ts(5), 0)));
        assert!(!sched.schedule(ev("coupon", "BOND-1", ts(5), 0)));
        assert_eq!(sched.len(), 1);
    }

    #[test]
    fn executed_events_cannot_be_rescheduled() {
        let mut sched = Scheduler::new();
        let event = ev("coupon", "BOND-1", ts(5), 0);
        let id = event.event_id().to_string();

        sched.schedule(event.clone());
        sched.get_due(ts(5));
        sched.mark_executed(&id);

        assert!(!sched.schedule(event));
        assert!(sched.is_empty());
    }

    #[test]
    fn different_params_are_different_events() {
        let mut params = UnitState::new();
        params.insert("n".to_string(), crate::types::StateValue::Int(1));

        let a = ev("coupon", "BOND-1", ts(5), 0);
        let b = Event::new("coupon", "BOND-1", ts(5), 0, params).unwrap();
        assert_ne!(a.event_id(), b.event_id());

        let mut sched = Scheduler::new();
        assert!(sched.schedule(a));
        assert!(sched.schedule(b));
        assert_eq!(sched.len(), 2);
    }
}
