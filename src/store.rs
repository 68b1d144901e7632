//! Optional persisted form of the transaction log.
//!
//! The kernel itself makes no durability promises; callers who want one
//! serialize the log and lean on the deterministic replay contract.
//! `LogStore` is that caller-side layer: CBOR records in a sled tree,
//! keyed by big-endian sequence number so the tree iterates in
//! execution order.

use crate::canonical;
use crate::config::HashBits;
use crate::error::{ExecuteResult, StoreError};
use crate::ledger::Ledger;
use crate::transaction::Transaction;
use crate::types::SYSTEM_WALLET;

pub struct LogStore {
    db: sled::Db,
}

impl LogStore {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, StoreError> {
        Ok(Self {
            db: sled::open(path)?,
        })
    }

    pub fn new(db: sled::Db) -> Self {
        Self { db }
    }

    /// Persist one executed transaction under its sequence number.
    pub fn append(&self, tx: &Transaction) -> Result<(), StoreError> {
        let cbor = minicbor::to_vec(tx).map_err(|err| StoreError::Encode(err.to_string()))?;
        self.db
            .insert(tx.sequence_number().to_be_bytes(), cbor)?;
        Ok(())
    }

    pub fn append_all<'a>(
        &self,
        txs: impl IntoIterator<Item = &'a Transaction>,
    ) -> Result<(), StoreError> {
        for tx in txs {
            self.append(tx)?;
        }
        self.db.flush()?;
        Ok(())
    }

    /// Decode the stored log in sequence order. Every entry is verified:
    /// re-canonicalizing the decoded content must reproduce the stored
    /// `intent_id`, or the record has been corrupted or tampered with.
    pub fn load_log(&self) -> Result<Vec<Transaction>, StoreError> {
        let mut log = Vec::new();
        for entry in self.db.iter() {
            let (_, bytes) = entry?;
            let tx: Transaction =
                minicbor::decode(&bytes).map_err(|err| StoreError::Decode(err.to_string()))?;
            verify_identity(&tx)?;
            log.push(tx);
        }
        log::debug!("loaded {} transactions from store", log.len());
        Ok(log)
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Drop every stored record.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.db.clear()?;
        Ok(())
    }
}

fn verify_identity(tx: &Transaction) -> Result<(), StoreError> {
    let bits = match tx.intent_id().len() {
        64 => HashBits::B256,
        _ => HashBits::B128,
    };
    let recomputed = canonical::intent_id(
        tx.moves(),
        tx.state_changes(),
        tx.units_to_create(),
        tx.origin(),
        tx.proposed_timestamp(),
        bits,
    );

    if recomputed != tx.intent_id() {
        return Err(StoreError::IdentityMismatch {
            sequence: tx.sequence_number(),
            stored: tx.intent_id().to_string(),
            recomputed,
        });
    }
    Ok(())
}

/// Rebuild ledger state by feeding a decoded log back through the
/// normal execute path. Wallets referenced by moves are registered
/// first; transfer rules must be re-attached by the caller before
/// replaying if their vetoes should apply again.
pub fn replay(ledger: &mut Ledger, log: &[Transaction]) -> Result<(), StoreError> {
    for tx in log {
        for mv in tx.moves() {
            for wallet in [mv.source(), mv.dest()] {
                if wallet != SYSTEM_WALLET {
                    ledger
                        .register_wallet(wallet)
                        .map_err(|err| StoreError::ReplayRejected {
                            sequence: tx.sequence_number(),
                            reason: err.to_string(),
                        })?;
                }
            }
        }
    }

    for tx in log {
        match ledger.execute(tx.pending()) {
            ExecuteResult::Applied(_) | ExecuteResult::AlreadyApplied { .. } => {}
            ExecuteResult::Rejected(reason) => {
                return Err(StoreError::ReplayRejected {
                    sequence: tx.sequence_number(),
                    reason: reason.to_string(),
                });
            }
        }
    }
    Ok(())
}
