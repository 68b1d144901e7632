//! Timestamps and the pending/executed transaction pair.
//!
//! A [`PendingTransaction`] is identified by its content: the
//! `intent_id` is a hash over the canonical form of every field, so two
//! equal proposals collapse to one identity no matter where or when
//! they were built. A [`Transaction`] is the same content plus the
//! fields the ledger assigns on apply.

use chrono::{DateTime, TimeZone, Utc};

use crate::types::{Move, Origin, Unit, UnitStateChange};

/// Logical ledger time. The kernel never observes the wall clock;
/// [`TimeStamp::now`] exists for callers and fixtures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeStamp(DateTime<Utc>);

impl TimeStamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }

    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }

    /// Canonical ISO-8601 form at fixed microsecond precision. This is
    /// the rendering hashed into intent ids, so it must never vary.
    pub fn canonical(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
    }
}

impl From<DateTime<Utc>> for TimeStamp {
    fn from(value: DateTime<Utc>) -> Self {
        TimeStamp(value)
    }
}

impl std::fmt::Display for TimeStamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl<C> minicbor::Encode<C> for TimeStamp {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// A validated proposal for one atomic ledger change.
///
/// Only [`crate::builder::PendingTransactionBuilder`] produces these, so
/// the ordering invariants (state changes and unit registrations sorted
/// by symbol) and the content/identity coupling always hold.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct PendingTransaction {
    #[n(0)]
    moves: Vec<Move>,
    #[n(1)]
    state_changes: Vec<UnitStateChange>,
    #[n(2)]
    units_to_create: Vec<Unit>,
    #[n(3)]
    origin: Origin,
    #[n(4)]
    proposed_timestamp: TimeStamp,
    #[n(5)]
    intent_id: String,
}

impl PendingTransaction {
    pub(crate) fn from_parts(
        moves: Vec<Move>,
        state_changes: Vec<UnitStateChange>,
        units_to_create: Vec<Unit>,
        origin: Origin,
        proposed_timestamp: TimeStamp,
        intent_id: String,
    ) -> Self {
        Self {
            moves,
            state_changes,
            units_to_create,
            origin,
            proposed_timestamp,
            intent_id,
        }
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn state_changes(&self) -> &[UnitStateChange] {
        &self.state_changes
    }

    pub fn units_to_create(&self) -> &[Unit] {
        &self.units_to_create
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn proposed_timestamp(&self) -> TimeStamp {
        self.proposed_timestamp
    }

    pub fn intent_id(&self) -> &str {
        &self.intent_id
    }
}

/// An executed record: pending content plus the ledger-assigned fields.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct Transaction {
    #[n(0)]
    pending: PendingTransaction,
    #[n(1)]
    exec_id: String,
    #[n(2)]
    ledger_name: String,
    #[n(3)]
    execution_time: TimeStamp,
    #[n(4)]
    sequence_number: u64,
    /// Symbols this transaction actually first-registered. Recorded so
    /// the unwind removes exactly these and nothing re-registered as a
    /// no-op.
    #[n(5)]
    registered_units: Vec<String>,
}

impl Transaction {
    pub(crate) fn new(
        pending: PendingTransaction,
        exec_id: String,
        ledger_name: String,
        execution_time: TimeStamp,
        sequence_number: u64,
        registered_units: Vec<String>,
    ) -> Self {
        Self {
            pending,
            exec_id,
            ledger_name,
            execution_time,
            sequence_number,
            registered_units,
        }
    }

    pub fn pending(&self) -> &PendingTransaction {
        &self.pending
    }

    pub fn moves(&self) -> &[Move] {
        self.pending.moves()
    }

    pub fn state_changes(&self) -> &[UnitStateChange] {
        self.pending.state_changes()
    }

    pub fn units_to_create(&self) -> &[Unit] {
        self.pending.units_to_create()
    }

    pub fn origin(&self) -> &Origin {
        self.pending.origin()
    }

    pub fn proposed_timestamp(&self) -> TimeStamp {
        self.pending.proposed_timestamp()
    }

    pub fn intent_id(&self) -> &str {
        self.pending.intent_id()
    }

    pub fn exec_id(&self) -> &str {
        &self.exec_id
    }

    pub fn ledger_name(&self) -> &str {
        &self.ledger_name
    }

    pub fn execution_time(&self) -> TimeStamp {
        self.execution_time
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn registered_units(&self) -> &[String] {
        &self.registered_units
    }
}
