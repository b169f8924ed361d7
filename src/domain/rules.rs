//! Rules Engine domain types (component C5, spec.md §4.5).
//!
//! The validator trait and accumulating pipeline that consume these
//! types live in `application::rules_engine`: every validator runs
//! regardless of earlier rejections, since spec.md §4.5 requires "no
//! partial approval" — a candidate is either fully compliant or
//! reported with every rule it violated, never short-circuited on the
//! first hit. This module only defines what a candidate action is and
//! what a validation can conclude.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::account::AccountId;
use crate::domain::order::OrderIntent;

/// Enumerated reject kinds (spec.md §4.5, exact set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    OutsideEntryWindow,
    SymbolNotPermitted,
    DeltaOutOfBand,
    DteOutOfBand,
    EarningsThisWeek,
    LiquidityInsufficient,
    CapitalExceeded,
    PerSymbolExposureExceeded,
    DuplicateOrder,
    SlippageExceeded,
    SystemSafeMode,
}

/// Result of a validation run: `validate(action) -> Approve | Reject(reason[])`
/// (spec.md §4.5). Every checklist item must pass; there is no partial
/// approval, so all accumulated rejections are reported together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationOutcome {
    Approve,
    Reject(Vec<RejectReason>),
}

impl ValidationOutcome {
    pub fn is_approved(&self) -> bool {
        matches!(self, ValidationOutcome::Approve)
    }

    pub fn reasons(&self) -> &[RejectReason] {
        match self {
            ValidationOutcome::Approve => &[],
            ValidationOutcome::Reject(reasons) => reasons,
        }
    }
}

/// A proposed action awaiting Rules Engine sign-off: a new entry, a roll
/// replacement, a LEAP ladder action, or a close. Carries just enough to
/// validate against the constitution without needing the full Position
/// or Order entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateAction {
    pub account_id: AccountId,
    pub intent: OrderIntent,
    pub symbol: String,
    pub expiry: chrono::NaiveDate,
    pub strike: Decimal,
    pub delta: f64,
    pub quantity: i64,
    pub limit_price: Decimal,
    pub chain_mid_at_decision: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approve_has_no_reasons() {
        assert!(ValidationOutcome::Approve.reasons().is_empty());
        assert!(ValidationOutcome::Approve.is_approved());
    }

    #[test]
    fn reject_carries_all_accumulated_reasons() {
        let outcome = ValidationOutcome::Reject(vec![RejectReason::DeltaOutOfBand, RejectReason::DteOutOfBand]);
        assert!(!outcome.is_approved());
        assert_eq!(outcome.reasons().len(), 2);
    }
}
