//! LEAP Ladder Manager (component C9, spec.md §4.9).
//!
//! Every ladder action — opening a new rung, rolling one forward, or
//! closing a hedge put early — is itself a `CandidateAction` that flows
//! through the Rules Engine and Order Lifecycle Manager like any other
//! trade; this manager only decides *when* such an action is due.

use crate::domain::leap::{satisfies_stagger, should_close_hedge_early, LeapKind, LeapRung};

#[derive(Debug, Clone, PartialEq)]
pub enum LadderAction {
    None,
    RollForward,
    CloseHedgeEarly,
}

pub struct LeapLadderManager;

impl LeapLadderManager {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate_rung(&self, rung: &LeapRung, today: chrono::NaiveDate, vix: f64, any_l2_plus_escalation: bool) -> LadderAction {
        if rung.kind == LeapKind::Hedge && should_close_hedge_early(vix, any_l2_plus_escalation) {
            return LadderAction::CloseHedgeEarly;
        }
        if rung.needs_roll(today) {
            return LadderAction::RollForward;
        }
        LadderAction::None
    }

    /// Whether a new candidate expiry satisfies the >=3 month stagger
    /// discipline against every existing rung of the same kind for the
    /// symbol (spec.md §4.9 "Ladder discipline").
    pub fn can_open_new_rung(&self, existing: &[LeapRung], candidate_expiry: chrono::NaiveDate, kind: LeapKind) -> bool {
        satisfies_stagger(existing, candidate_expiry, kind)
    }
}

impl Default for LeapLadderManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn growth_rung(expiry: chrono::NaiveDate) -> LeapRung {
        LeapRung {
            symbol: "MSFT".to_string(),
            kind: LeapKind::Growth,
            expiry,
            strike: dec!(350),
            delta_at_last_refresh: 0.30,
            opened_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn rolls_forward_when_short_dated() {
        let manager = LeapLadderManager::new();
        let today = chrono::NaiveDate::from_ymd_opt(2026, 7, 26).unwrap();
        let rung = growth_rung(today + chrono::Duration::days(60));
        assert_eq!(manager.evaluate_rung(&rung, today, 18.0, false), LadderAction::RollForward);
    }

    #[test]
    fn holds_when_within_band_and_long_dated() {
        let manager = LeapLadderManager::new();
        let today = chrono::NaiveDate::from_ymd_opt(2026, 7, 26).unwrap();
        let rung = growth_rung(today + chrono::Duration::days(400));
        assert_eq!(manager.evaluate_rung(&rung, today, 18.0, false), LadderAction::None);
    }

    #[test]
    fn closes_hedge_early_under_low_vix() {
        let manager = LeapLadderManager::new();
        let today = chrono::NaiveDate::from_ymd_opt(2026, 7, 26).unwrap();
        let mut rung = growth_rung(today + chrono::Duration::days(400));
        rung.kind = LeapKind::Hedge;
        assert_eq!(manager.evaluate_rung(&rung, today, 15.0, false), LadderAction::CloseHedgeEarly);
    }
}
