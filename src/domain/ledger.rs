//! Audit Ledger domain types (component C2, spec.md §4.2).
//!
//! The ledger itself — segment files, the sequence index, durability —
//! is infrastructure (`infrastructure::ledger`). This module defines what
//! gets recorded and the hash-chaining math that both sides depend on.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::account::AccountId;
use crate::domain::order::ClientOrderId;
use crate::domain::week::WeekType;

/// Every category of fact the ledger can hold. This is the single source
/// of truth; every other store (positions, accounts, orders) is a
/// derived view rebuilt by replaying this stream (spec.md §3 "Ownership").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LedgerRecord {
    AccountOpened {
        account_id: AccountId,
        opening_capital: rust_decimal::Decimal,
    },
    OrderSubmitted {
        client_order_id: ClientOrderId,
        limit_price: rust_decimal::Decimal,
    },
    OrderFilled {
        client_order_id: ClientOrderId,
        fill_price: rust_decimal::Decimal,
        quantity: i64,
    },
    OrderCancelled {
        client_order_id: ClientOrderId,
        reason: String,
    },
    PositionOpened {
        account_id: AccountId,
        position_id: uuid::Uuid,
    },
    PositionClosed {
        account_id: AccountId,
        position_id: uuid::Uuid,
        realised_pnl: rust_decimal::Decimal,
    },
    StateTransition {
        account_id: AccountId,
        from: String,
        to: String,
    },
    Fork {
        parent_id: AccountId,
        child_id: AccountId,
        capital_transferred: rust_decimal::Decimal,
    },
    Merge {
        child_id: AccountId,
        root_id: AccountId,
        capital_transferred: rust_decimal::Decimal,
    },
    ReinvestmentApplied {
        account_id: AccountId,
        tax_reserved: rust_decimal::Decimal,
        contracts_share: rust_decimal::Decimal,
        leap_share: rust_decimal::Decimal,
    },
    SafeModeEntered {
        account_id: Option<AccountId>,
        reason: String,
    },
    /// Recorded once per weekly cycle at the RECONCILING transition,
    /// from that week's accumulated `WeekSignals` (spec.md §4.11).
    WeekClassification {
        account_id: AccountId,
        week_type: WeekType,
    },
}

/// A single chained ledger entry: `hash_i = H(hash_{i-1} || record_i)`
/// (spec.md §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub seq: u64,
    pub record: LedgerRecord,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
    pub prev_hash: [u8; 32],
    pub hash: [u8; 32],
}

pub const GENESIS_HASH: [u8; 32] = [0u8; 32];

/// Computes `H(prev_hash || canonical_record_bytes)`. The canonical byte
/// form is the `serde_json` encoding of the record plus its sequence
/// number and timestamp, so two independently-serialised copies of the
/// same logical entry always hash identically.
pub fn compute_entry_hash(prev_hash: [u8; 32], seq: u64, recorded_at: chrono::DateTime<chrono::Utc>, record: &LedgerRecord) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash);
    hasher.update(seq.to_be_bytes());
    hasher.update(recorded_at.timestamp_nanos_opt().unwrap_or_default().to_be_bytes());
    let payload = serde_json::to_vec(record).expect("LedgerRecord always serialises");
    hasher.update(&payload);
    hasher.finalize().into()
}

impl LedgerEntry {
    pub fn new(seq: u64, prev_hash: [u8; 32], record: LedgerRecord, recorded_at: chrono::DateTime<chrono::Utc>) -> Self {
        let hash = compute_entry_hash(prev_hash, seq, recorded_at, &record);
        Self {
            seq,
            record,
            recorded_at,
            prev_hash,
            hash,
        }
    }

    /// Verifies this entry's hash was computed correctly from its own
    /// fields; does not check linkage to a neighbour (see
    /// `verify_chain`).
    pub fn verify_self(&self) -> bool {
        compute_entry_hash(self.prev_hash, self.seq, self.recorded_at, &self.record) == self.hash
    }
}

/// P4 (spec.md §8): walks a full entry stream and confirms the hash
/// chain is unbroken. Returns the first broken link, if any.
pub fn verify_chain(entries: &[LedgerEntry]) -> Result<(), (u64, [u8; 32], [u8; 32])> {
    let mut expected_prev = GENESIS_HASH;
    for entry in entries {
        if entry.prev_hash != expected_prev || !entry.verify_self() {
            return Err((entry.seq, expected_prev, entry.prev_hash));
        }
        expected_prev = entry.hash;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_record() -> LedgerRecord {
        LedgerRecord::AccountOpened {
            account_id: AccountId::new(),
            opening_capital: dec!(300000),
        }
    }

    #[test]
    fn entry_self_verifies_after_construction() {
        let entry = LedgerEntry::new(1, GENESIS_HASH, sample_record(), chrono::Utc::now());
        assert!(entry.verify_self());
    }

    #[test]
    fn chain_of_three_verifies() {
        let mut entries = Vec::new();
        let mut prev = GENESIS_HASH;
        for seq in 1..=3u64 {
            let entry = LedgerEntry::new(seq, prev, sample_record(), chrono::Utc::now());
            prev = entry.hash;
            entries.push(entry);
        }
        assert!(verify_chain(&entries).is_ok());
    }

    #[test]
    fn tampered_entry_breaks_the_chain() {
        let mut entries = Vec::new();
        let mut prev = GENESIS_HASH;
        for seq in 1..=3u64 {
            let entry = LedgerEntry::new(seq, prev, sample_record(), chrono::Utc::now());
            prev = entry.hash;
            entries.push(entry);
        }
        entries[1].record = LedgerRecord::SafeModeEntered {
            account_id: None,
            reason: "tampered".to_string(),
        };
        assert!(verify_chain(&entries).is_err());
    }
}
