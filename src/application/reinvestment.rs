//! Reinvestment & Tax Reserver (component C12, spec.md §4.12).
//!
//! Triggered at the last RECONCILING of a calendar quarter, for Revenue
//! and Compounder accounts only — a Generator account accumulates
//! towards its fork threshold instead (spec.md §4.12).

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::account::Account;
use crate::domain::errors::AccountError;
use crate::domain::ledger::LedgerRecord;
use crate::domain::ports::LedgerStore;
use crate::domain::sleeve::SleeveKind;

pub const TAX_RESERVE_PCT: Decimal = Decimal::from_parts(30, 0, 0, false, 2);
pub const CONTRACTS_SHARE_PCT: Decimal = Decimal::from_parts(75, 0, 0, false, 2);
pub const LEAP_SHARE_PCT: Decimal = Decimal::from_parts(25, 0, 0, false, 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReinvestmentPlan {
    pub tax_reserved: Decimal,
    pub contracts_share: Decimal,
    pub leap_share: Decimal,
}

pub fn eligible(kind: SleeveKind) -> bool {
    matches!(kind, SleeveKind::Revenue | SleeveKind::Compounder | SleeveKind::MiniCompound | SleeveKind::ForkedRoot)
}

/// spec.md §4.12 steps (a)-(c): 30% tax reserve off the top, then the
/// remaining 70% split 75/25 between additional contract deployment and
/// the LEAP ladder.
pub fn plan_reinvestment(quarterly_realised_gain: Decimal) -> ReinvestmentPlan {
    let tax_reserved = quarterly_realised_gain * TAX_RESERVE_PCT;
    let remainder = quarterly_realised_gain - tax_reserved;
    ReinvestmentPlan {
        tax_reserved,
        contracts_share: remainder * CONTRACTS_SHARE_PCT,
        leap_share: remainder * LEAP_SHARE_PCT,
    }
}

pub struct ReinvestmentManager<L> {
    ledger: Arc<L>,
}

impl<L: LedgerStore> ReinvestmentManager<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Applies the plan atomically: reserves the tax sub-balance into
    /// the account's non-deployable `tax_reserve`, and ledgers the
    /// contracts/LEAP split for the next cycle's managers to pick up.
    pub async fn apply(&self, account: &mut Account, plan: ReinvestmentPlan) -> Result<(), AccountError> {
        if !eligible(account.kind) {
            return Ok(());
        }
        self.ledger
            .append(LedgerRecord::ReinvestmentApplied {
                account_id: account.id,
                tax_reserved: plan.tax_reserved,
                contracts_share: plan.contracts_share,
                leap_share: plan.leap_share,
            })
            .await
            .map_err(|_| AccountError::InvariantViolation {
                account: account.id,
                reason: "ledger append failed during reinvestment".to_string(),
            })?;

        account.tax_reserve += plan.tax_reserved;
        account.quarter_to_date_realised_gains = Decimal::ZERO;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn splits_thirty_seventy_seventyfive_twentyfive() {
        let plan = plan_reinvestment(dec!(10000));
        assert_eq!(plan.tax_reserved, dec!(3000));
        assert_eq!(plan.contracts_share, dec!(5250));
        assert_eq!(plan.leap_share, dec!(1750));
    }

    #[test]
    fn generator_is_not_eligible() {
        assert!(!eligible(SleeveKind::Generator));
        assert!(eligible(SleeveKind::Revenue));
        assert!(eligible(SleeveKind::Compounder));
    }
}
