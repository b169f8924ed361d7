//! Protocol types and pure classification math (component C8, spec.md §4.8).
//!
//! This module holds only the deterministic math: level classification,
//! roll-economics rejection, the early-assignment estimator, and the
//! system-wide circuit breaker thresholds. The engine that *acts* on these
//! (rolling, closing, escalating an account to SafeMode) lives in
//! `application::protocol_engine` where it has access to the order
//! lifecycle manager and the ledger.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProtocolLevel {
    L0,
    L1,
    L2,
    L3,
}

impl ProtocolLevel {
    pub fn monitoring_period(self) -> Duration {
        match self {
            ProtocolLevel::L0 => Duration::from_secs(300),
            ProtocolLevel::L1 => Duration::from_secs(60),
            ProtocolLevel::L2 => Duration::from_secs(30),
            ProtocolLevel::L3 => Duration::from_secs(1),
        }
    }
}

/// Per-symbol ATR-distance thresholds published by the ATR Service
/// (spec.md §4.4). `l1`/`l2`/`l3` are absolute price levels computed from
/// the reference strike and the daily-frozen ATR(5); symmetric for CC
/// (threshold on the upside instead of the downside).
#[derive(Debug, Clone, Copy)]
pub struct ProtocolThresholds {
    pub l1: Decimal,
    pub l2: Decimal,
    pub l3: Decimal,
}

impl ProtocolThresholds {
    /// CSP side: L1 = strike − 1·ATR, L2 = strike − 2·ATR, L3 = strike − 3·ATR.
    pub fn for_csp(strike: Decimal, atr: Decimal) -> Self {
        Self {
            l1: strike - atr,
            l2: strike - atr * Decimal::from(2),
            l3: strike - atr * Decimal::from(3),
        }
    }

    /// CC side: symmetric, thresholds above the strike.
    pub fn for_cc(strike: Decimal, atr: Decimal) -> Self {
        Self {
            l1: strike + atr,
            l2: strike + atr * Decimal::from(2),
            l3: strike + atr * Decimal::from(3),
        }
    }

    /// Classify current spot against these thresholds for a short put
    /// (breach = spot falls through a threshold).
    pub fn classify_put(&self, spot: Decimal) -> ProtocolLevel {
        if spot <= self.l3 {
            ProtocolLevel::L3
        } else if spot <= self.l2 {
            ProtocolLevel::L2
        } else if spot <= self.l1 {
            ProtocolLevel::L1
        } else {
            ProtocolLevel::L0
        }
    }

    /// Classify current spot against these thresholds for a short call
    /// (breach = spot rises through a threshold).
    pub fn classify_call(&self, spot: Decimal) -> ProtocolLevel {
        if spot >= self.l3 {
            ProtocolLevel::L3
        } else if spot >= self.l2 {
            ProtocolLevel::L2
        } else if spot >= self.l1 {
            ProtocolLevel::L1
        } else {
            ProtocolLevel::L0
        }
    }
}

/// A candidate roll replacement, scored by the Protocol Engine's
/// deterministic tie-break (spec.md §4.8 "Roll economics").
#[derive(Debug, Clone)]
pub struct RollCandidate {
    pub expiry: chrono::NaiveDate,
    pub strike: Decimal,
    pub delta: f64,
    pub debit: Decimal,
}

/// Roll economics gate: rejected if net debit exceeds 50% of the opening
/// credit (spec.md §4.8). Caller escalates L2→L3 on rejection.
pub fn roll_debit_acceptable(candidate_debit: Decimal, opening_credit: Decimal) -> bool {
    candidate_debit <= opening_credit * Decimal::new(5, 1)
}

/// Deterministic tie-break among roll candidates that all satisfy the
/// sleeve's delta band and DTE range: (1) lowest debit, (2) closest delta
/// to band midpoint, (3) earliest expiry satisfying DTE >= lower bound.
pub fn pick_best_roll_candidate(
    candidates: &[RollCandidate],
    delta_band_mid: f64,
) -> Option<&RollCandidate> {
    candidates.iter().min_by(|a, b| {
        a.debit
            .cmp(&b.debit)
            .then_with(|| {
                let da = (a.delta - delta_band_mid).abs();
                let db = (b.delta - delta_band_mid).abs();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.expiry.cmp(&b.expiry))
    })
}

/// Covered-call decay-based close triggers (spec.md §4.8 "CC protocol
/// variants"): close at >=65% decay or <=1 DTE.
pub fn cc_should_close_on_decay(opening_credit: Decimal, current_mark: Decimal, dte: i64) -> bool {
    if dte <= 1 {
        return true;
    }
    if opening_credit <= Decimal::ZERO {
        return false;
    }
    let decay = (opening_credit - current_mark) / opening_credit;
    decay >= Decimal::new(65, 2)
}

/// Deterministic early-assignment probability estimator: intrinsic/mark
/// decomposition (spec.md §9 Open Question — calibration fixed here).
/// `is_call` selects which side is in-the-money.
pub fn early_assignment_probability(spot: Decimal, strike: Decimal, mark: Decimal, is_call: bool) -> f64 {
    if mark <= Decimal::ZERO {
        return 0.0;
    }
    let intrinsic = if is_call {
        (spot - strike).max(Decimal::ZERO)
    } else {
        (strike - spot).max(Decimal::ZERO)
    };
    let ratio = (intrinsic / mark).to_f64().unwrap_or(0.0);
    ratio.clamp(0.0, 1.0)
}

/// CC variant: close at >=30% decay if early-assignment probability exceeds
/// 80% (spec.md §4.8).
pub fn cc_should_close_on_early_assignment_risk(
    opening_credit: Decimal,
    current_mark: Decimal,
    assignment_probability: f64,
) -> bool {
    if assignment_probability <= 0.80 {
        return false;
    }
    if opening_credit <= Decimal::ZERO {
        return false;
    }
    let decay = (opening_credit - current_mark) / opening_credit;
    decay >= Decimal::new(30, 2)
}

/// System-wide circuit breaker state, driven by VIX (spec.md §4.8
/// "System-wide circuit breakers"). Evaluated before per-position logic;
/// can only restrict account behaviour, never enable it (spec.md §9 Open
/// Question resolution).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemMode {
    Normal,
    /// VIX >= hedge threshold: deployment halved, defensive rolls only.
    Hedged,
    /// VIX >= safe threshold: no new entries system-wide.
    SafeMode,
    /// VIX >= kill threshold: cancel all working orders, cease new orders,
    /// force every state machine to SAFE.
    Kill,
}

#[derive(Debug, Clone, Copy)]
pub struct VixThresholds {
    pub hedge: f64,
    pub safe: f64,
    pub kill: f64,
}

impl Default for VixThresholds {
    fn default() -> Self {
        Self {
            hedge: 50.0,
            safe: 65.0,
            kill: 80.0,
        }
    }
}

pub fn classify_system_mode(vix: f64, thresholds: VixThresholds) -> SystemMode {
    if vix >= thresholds.kill {
        SystemMode::Kill
    } else if vix >= thresholds.safe {
        SystemMode::SafeMode
    } else if vix >= thresholds.hedge {
        SystemMode::Hedged
    } else {
        SystemMode::Normal
    }
}

/// Hedge basket budget on any L2 escalation with no hedge leg active:
/// max(5% of trailing quarterly gains, 1% of sleeve equity) (spec.md §4.8).
pub fn hedge_budget(trailing_quarterly_gains: Decimal, sleeve_equity: Decimal) -> Decimal {
    let from_gains = trailing_quarterly_gains * Decimal::new(5, 2);
    let from_equity = sleeve_equity * Decimal::new(1, 2);
    from_gains.max(from_equity)
}
