//! LEAP Ladder Manager domain types (component C9, spec.md §4.9).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeapKind {
    /// Long calls, 0.25-0.35 delta, 12-18 months to expiry.
    Growth,
    /// Long puts, 10-20% OTM, 6-12 months to expiry.
    Hedge,
}

impl LeapKind {
    pub fn delta_band(self) -> std::ops::RangeInclusive<f64> {
        match self {
            LeapKind::Growth => 0.25..=0.35,
            LeapKind::Hedge => -0.20..=-0.10,
        }
    }

    pub fn tte_months_range(self) -> std::ops::RangeInclusive<i64> {
        match self {
            LeapKind::Growth => 12..=18,
            LeapKind::Hedge => 6..=12,
        }
    }
}

/// One rung of the ladder: a single LEAP position plus the ladder
/// bookkeeping (its symbol-local stagger slot).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeapRung {
    pub symbol: String,
    pub kind: LeapKind,
    pub expiry: chrono::NaiveDate,
    pub strike: Decimal,
    pub delta_at_last_refresh: f64,
    pub opened_at: chrono::DateTime<chrono::Utc>,
}

impl LeapRung {
    pub fn tte_months(&self, today: chrono::NaiveDate) -> f64 {
        (self.expiry - today).num_days() as f64 / 30.4375
    }

    /// spec.md §4.9 roll rule: TTE <=3 months, or delta drifted outside
    /// the 0.2-0.5 maintenance band (applies to growth rungs; hedge
    /// rungs are governed by the early-close rule instead).
    pub fn needs_roll(&self, today: chrono::NaiveDate) -> bool {
        self.tte_months(today) <= 3.0 || !(0.2..=0.5).contains(&self.delta_at_last_refresh.abs())
    }
}

/// Ladder discipline: within one symbol, rungs of the same kind must be
/// staggered by at least 3 months of expiry separation (spec.md §4.9).
pub fn satisfies_stagger(existing: &[LeapRung], candidate_expiry: chrono::NaiveDate, kind: LeapKind) -> bool {
    existing
        .iter()
        .filter(|r| r.kind == kind)
        .all(|r| (r.expiry - candidate_expiry).num_days().abs() >= 90)
}

/// spec.md §4.9: close hedge puts early when VIX <20 and there is no
/// active L2+ escalation anywhere in the portfolio.
pub fn should_close_hedge_early(vix: f64, any_l2_plus_escalation: bool) -> bool {
    vix < 20.0 && !any_l2_plus_escalation
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rung(expiry: chrono::NaiveDate, kind: LeapKind) -> LeapRung {
        LeapRung {
            symbol: "AAPL".to_string(),
            kind,
            expiry,
            strike: dec!(200),
            delta_at_last_refresh: 0.30,
            opened_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn needs_roll_when_short_dated() {
        let today = chrono::NaiveDate::from_ymd_opt(2026, 7, 26).unwrap();
        let r = rung(today + chrono::Duration::days(60), LeapKind::Growth);
        assert!(r.needs_roll(today));
    }

    #[test]
    fn stagger_rejects_rung_within_ninety_days() {
        let today = chrono::NaiveDate::from_ymd_opt(2026, 7, 26).unwrap();
        let existing = vec![rung(today + chrono::Duration::days(365), LeapKind::Growth)];
        let candidate = today + chrono::Duration::days(400);
        assert!(!satisfies_stagger(&existing, candidate, LeapKind::Growth));
        let candidate_ok = today + chrono::Duration::days(470);
        assert!(satisfies_stagger(&existing, candidate_ok, LeapKind::Growth));
    }

    #[test]
    fn hedge_closes_early_only_under_low_vix_and_no_escalation() {
        assert!(should_close_hedge_early(15.0, false));
        assert!(!should_close_hedge_early(15.0, true));
        assert!(!should_close_hedge_early(25.0, false));
    }
}
