//! Account entity (spec.md §3 "Account").

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::sleeve::SleeveKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub uuid::Uuid);

impl AccountId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    Active,
    Paused,
    SafeMode,
    Merging,
    Closed,
}

/// Forward-only genealogy path: the sequence of ancestor account ids from
/// the tree root to this account, inclusive of this account as the last
/// element. Rebuilt from Fork/Merge ledger entries at startup — never a
/// cyclic object graph (spec.md §9 "Cyclic data").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenealogyPath(pub Vec<AccountId>);

impl GenealogyPath {
    pub fn root(id: AccountId) -> Self {
        Self(vec![id])
    }

    pub fn child_of(parent: &GenealogyPath, child: AccountId) -> Self {
        let mut path = parent.0.clone();
        path.push(child);
        Self(path)
    }

    pub fn root_id(&self) -> AccountId {
        self.0[0]
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub kind: SleeveKind,
    pub parent_id: Option<AccountId>,
    pub genealogy: GenealogyPath,
    pub opening_capital: Decimal,
    pub cash: Decimal,
    pub reserved_cash: Decimal,
    pub tax_reserve: Decimal,
    pub open_position_ids: Vec<uuid::Uuid>,
    pub open_order_ids: Vec<String>,
    pub status: AccountStatus,
    pub cumulative_realised_pnl: Decimal,
    pub quarter_to_date_realised_gains: Decimal,
    /// Realised gain accumulated since the last fork, the quantity that
    /// drives the fork threshold comparison (spec.md §4.10).
    pub realised_gain_since_base: Decimal,
    pub fork_count: u32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Account {
    pub fn genesis(kind: SleeveKind, opening_capital: Decimal) -> Self {
        let id = AccountId::new();
        Self {
            id,
            kind,
            parent_id: None,
            genealogy: GenealogyPath::root(id),
            opening_capital,
            cash: opening_capital,
            reserved_cash: Decimal::ZERO,
            tax_reserve: Decimal::ZERO,
            open_position_ids: Vec::new(),
            open_order_ids: Vec::new(),
            status: AccountStatus::Active,
            cumulative_realised_pnl: Decimal::ZERO,
            quarter_to_date_realised_gains: Decimal::ZERO,
            realised_gain_since_base: Decimal::ZERO,
            fork_count: 0,
            created_at: chrono::Utc::now(),
        }
    }

    pub fn child(
        parent: &Account,
        kind: SleeveKind,
        opening_capital: Decimal,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        let id = AccountId::new();
        Self {
            id,
            kind,
            parent_id: Some(parent.id),
            genealogy: GenealogyPath::child_of(&parent.genealogy, id),
            opening_capital,
            cash: opening_capital,
            reserved_cash: Decimal::ZERO,
            tax_reserve: Decimal::ZERO,
            open_position_ids: Vec::new(),
            open_order_ids: Vec::new(),
            status: AccountStatus::Active,
            cumulative_realised_pnl: Decimal::ZERO,
            quarter_to_date_realised_gains: Decimal::ZERO,
            realised_gain_since_base: Decimal::ZERO,
            fork_count: 0,
            created_at,
        }
    }

    /// P1: `cash >= collateral_reserved + tax_reserve`.
    pub fn check_cash_invariant(&self) -> bool {
        self.cash >= self.reserved_cash + self.tax_reserve
    }

    pub fn available_cash(&self) -> Decimal {
        self.cash - self.reserved_cash - self.tax_reserve
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn genesis_account_starts_active_with_full_cash() {
        let acc = Account::genesis(SleeveKind::Generator, dec!(120000));
        assert_eq!(acc.cash, dec!(120000));
        assert_eq!(acc.status, AccountStatus::Active);
        assert_eq!(acc.genealogy.depth(), 1);
        assert_eq!(acc.genealogy.root_id(), acc.id);
    }

    #[test]
    fn child_extends_genealogy_path() {
        let parent = Account::genesis(SleeveKind::Generator, dec!(120000));
        let child = Account::child(&parent, SleeveKind::MiniCompound, dec!(100000), chrono::Utc::now());
        assert_eq!(child.genealogy.depth(), 2);
        assert_eq!(child.genealogy.root_id(), parent.id);
        assert_eq!(child.parent_id, Some(parent.id));
    }

    #[test]
    fn cash_invariant_flags_under_reserved_cash() {
        let mut acc = Account::genesis(SleeveKind::Generator, dec!(10000));
        acc.reserved_cash = dec!(5000);
        acc.tax_reserve = dec!(2000);
        assert!(acc.check_cash_invariant());
        acc.cash = dec!(1000);
        assert!(!acc.check_cash_invariant());
    }
}
