//! Per-ledger configuration. Immutable once the ledger is built.

use crate::decimal::MIN_PRECISION;
use crate::error::LedgerError;
use crate::transaction::TimeStamp;

/// What to do when a state change's `old_state` disagrees with reality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StaleMode {
    /// Record a [`crate::error::StaleNotice`] and apply anyway.
    #[default]
    Warn,
    /// Reject the transaction with `RejectReason::StaleState`.
    Reject,
}

/// Width of content-hash identifiers (intent ids, exec ids).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashBits {
    /// 32 hex chars. Collisions are improbable short of extreme scale.
    #[default]
    B128,
    /// The full 64 hex chars of SHA-256.
    B256,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    pub name: String,
    pub initial_time: TimeStamp,
    pub stale_mode: StaleMode,
    pub max_cascade_passes: u32,
    pub decimal_precision: u64,
    pub hash_bits: HashBits,
    pub test_mode: bool,
}

impl LedgerConfig {
    pub fn new(name: &str, initial_time: TimeStamp) -> Self {
        Self {
            name: name.to_string(),
            initial_time,
            stale_mode: StaleMode::default(),
            max_cascade_passes: 10,
            decimal_precision: MIN_PRECISION,
            hash_bits: HashBits::default(),
            test_mode: false,
        }
    }

    pub fn stale_mode(mut self, mode: StaleMode) -> Self {
        self.stale_mode = mode;
        self
    }

    pub fn max_cascade_passes(mut self, passes: u32) -> Self {
        self.max_cascade_passes = passes;
        self
    }

    pub fn decimal_precision(mut self, precision: u64) -> Self {
        self.decimal_precision = precision;
        self
    }

    pub fn hash_bits(mut self, bits: HashBits) -> Self {
        self.hash_bits = bits;
        self
    }

    pub fn test_mode(mut self, enabled: bool) -> Self {
        self.test_mode = enabled;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), LedgerError> {
        if self.name.is_empty() {
            return Err(LedgerError::InvalidConfig {
                detail: "ledger name must be non-empty".to_string(),
            });
        }
        if self.max_cascade_passes < 1 {
            return Err(LedgerError::InvalidConfig {
                detail: "max_cascade_passes must be at least 1".to_string(),
            });
        }
        if self.decimal_precision < MIN_PRECISION {
            return Err(LedgerError::InvalidConfig {
                detail: format!("decimal_precision must be at least {MIN_PRECISION}"),
            });
        }
        Ok(())
    }
}
