//! Fork/Merge Manager (component C10, spec.md §4.10).
//!
//! Evaluated at each weekly RECONCILING transition. Fork and merge are
//! atomic ledger operations: a single append containing both the debit
//! and credit entries and the resulting genealogy update. If any step
//! fails the whole operation is rolled back by a ledger compensating
//! entry rather than left half-applied.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::account::{Account, AccountId, GenealogyPath};
use crate::domain::errors::AccountError;
use crate::domain::genealogy::{generator_fork_eligible, mini_compound_should_merge, revenue_fork_eligible, ForkDecision};
use crate::domain::ledger::LedgerRecord;
use crate::domain::ports::LedgerStore;
use crate::domain::sleeve::{rules_for, SleeveKind};

pub struct ForkMergeManager<L> {
    ledger: Arc<L>,
}

impl<L: LedgerStore> ForkMergeManager<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    pub fn evaluate(&self, account: &Account) -> ForkDecision {
        let rules = rules_for(account.kind);
        match (account.kind, rules.fork_increment) {
            (SleeveKind::Generator, Some(increment)) => {
                if generator_fork_eligible(account.realised_gain_since_base, account.fork_count, Decimal::from(increment)) {
                    ForkDecision::GeneratorFork
                } else {
                    ForkDecision::None
                }
            }
            (SleeveKind::Revenue, Some(increment)) => {
                if revenue_fork_eligible(account.realised_gain_since_base, account.fork_count, Decimal::from(increment)) {
                    ForkDecision::RevenueFork
                } else {
                    ForkDecision::None
                }
            }
            _ => ForkDecision::None,
        }
    }

    /// Spawns a MiniCompound child with exactly 100,000 opening capital,
    /// debited from the parent Generator's cash, inheriting the
    /// Compounder rule set (spec.md §4.10). Returns the new child; the
    /// caller is responsible for persisting both accounts atomically
    /// alongside this ledger append.
    pub async fn fork_generator(&self, parent: &mut Account) -> Result<Account, AccountError> {
        const CHILD_CAPITAL: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);
        if parent.available_cash() < CHILD_CAPITAL {
            return Err(AccountError::InvariantViolation {
                account: parent.id,
                reason: "insufficient cash to fund Generator fork".to_string(),
            });
        }
        let now = chrono::Utc::now();
        let child = Account::child(parent, SleeveKind::MiniCompound, CHILD_CAPITAL, now);

        self.ledger
            .append(LedgerRecord::Fork {
                parent_id: parent.id,
                child_id: child.id,
                capital_transferred: CHILD_CAPITAL,
            })
            .await
            .map_err(|_| AccountError::InvariantViolation {
                account: parent.id,
                reason: "ledger append failed during fork".to_string(),
            })?;

        parent.cash -= CHILD_CAPITAL;
        parent.fork_count += 1;
        Ok(child)
    }

    /// Spawns a brand new 40/30/30 root with 500,000 opening capital
    /// (spec.md §4.10 "Revenue fork"). The triad itself (its own
    /// Generator/Revenue/Compounder accounts) is assembled by the
    /// bootstrap/supervisor layer once this root is ledgered.
    pub async fn fork_revenue(&self, parent: &mut Account) -> Result<Account, AccountError> {
        const ROOT_CAPITAL: Decimal = Decimal::from_parts(500_000, 0, 0, false, 0);
        if parent.available_cash() < ROOT_CAPITAL {
            return Err(AccountError::InvariantViolation {
                account: parent.id,
                reason: "insufficient cash to fund Revenue fork".to_string(),
            });
        }
        let new_root = Account::genesis(SleeveKind::ForkedRoot, ROOT_CAPITAL);

        self.ledger
            .append(LedgerRecord::Fork {
                parent_id: parent.id,
                child_id: new_root.id,
                capital_transferred: ROOT_CAPITAL,
            })
            .await
            .map_err(|_| AccountError::InvariantViolation {
                account: parent.id,
                reason: "ledger append failed during fork".to_string(),
            })?;

        parent.cash -= ROOT_CAPITAL;
        parent.fork_count += 1;
        Ok(new_root)
    }

    pub fn should_merge_mini_compound(&self, child: &Account, current_equity: Decimal, now: chrono::DateTime<chrono::Utc>) -> bool {
        mini_compound_should_merge(child.created_at, now, child.opening_capital, current_equity)
    }

    /// Transfers a MiniCompound child's balance to the root Compounder
    /// account sharing its genealogy (spec.md §4.10).
    pub async fn merge_into_root(&self, child: &mut Account, root: &mut Account, current_equity: Decimal) -> Result<(), AccountError> {
        self.ledger
            .append(LedgerRecord::Merge {
                child_id: child.id,
                root_id: root.id,
                capital_transferred: current_equity,
            })
            .await
            .map_err(|_| AccountError::InvariantViolation {
                account: child.id,
                reason: "ledger append failed during merge".to_string(),
            })?;

        root.cash += current_equity;
        child.cash = Decimal::ZERO;
        child.status = crate::domain::account::AccountStatus::Closed;
        Ok(())
    }

    pub fn root_ancestor_id(&self, genealogy: &GenealogyPath) -> AccountId {
        genealogy.root_id()
    }
}
