//! The constitution: per-sleeve trading parameters (spec.md §4.5.1).
//!
//! Each `SleeveKind` carries a fixed, non-negotiable rule set. These are not
//! user-configurable beyond the handful of keys spec.md §6 calls out
//! (`capital_deployment_pct`, `per_symbol_exposure_cap`, fork thresholds);
//! the delta bands, DTE ranges, entry weekdays, and permitted symbol lists
//! are the Constitution itself.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SleeveKind {
    Generator,
    Revenue,
    Compounder,
    /// A Generator fork: trades under the Compounder rule set but carries
    /// an age cap and a multiple cap (spec.md §4.10).
    MiniCompound,
    /// A Revenue fork: a brand new 40/30/30 root account.
    ForkedRoot,
}

impl SleeveKind {
    /// The rule set a sleeve actually trades under — `MiniCompound` and
    /// `ForkedRoot` both ultimately defer to one of the three base sleeves'
    /// checklists. A `ForkedRoot` trades under the Generator checklist
    /// until its own Generator/Revenue/Compounder triad is assembled
    /// (spec.md §4.10).
    pub fn rule_basis(self) -> SleeveKind {
        match self {
            SleeveKind::MiniCompound => SleeveKind::Compounder,
            SleeveKind::ForkedRoot => SleeveKind::Generator,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyAtEntry {
    CspOnly,
    /// CSP at entry, pivots to CC after assignment.
    CspThenCc,
    CcOnly,
}

/// The fixed per-sleeve constitution (spec.md §4.5.1 table).
#[derive(Debug, Clone)]
pub struct SleeveRules {
    pub strategy: StrategyAtEntry,
    pub dte_range: RangeInclusive<i64>,
    /// Stress-mode alternate DTE range (Generator only: 1-3 instead of 0-1).
    pub dte_range_stress: Option<RangeInclusive<i64>>,
    pub delta_band: RangeInclusive<f64>,
    pub permitted_symbols: &'static [&'static str],
    pub capital_deployment_pct: RangeInclusive<f64>,
    pub per_symbol_exposure_cap: f64,
    pub earnings_filter: EarningsFilter,
    pub fork_increment: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarningsFilter {
    /// Skip the symbol entirely for the week.
    Skip,
    /// Reduce CC coverage to at most this fraction of normal.
    ReduceCoverage(u8),
}

pub fn rules_for(kind: SleeveKind) -> SleeveRules {
    match kind.rule_basis() {
        SleeveKind::Generator => SleeveRules {
            strategy: StrategyAtEntry::CspThenCc,
            dte_range: 0..=1,
            dte_range_stress: Some(1..=3),
            delta_band: 0.40..=0.45,
            permitted_symbols: &["AAPL", "MSFT", "AMZN", "GOOG", "SPY", "QQQ", "IWM"],
            capital_deployment_pct: 0.95..=1.00,
            per_symbol_exposure_cap: 0.25,
            earnings_filter: EarningsFilter::Skip,
            fork_increment: Some(100_000),
        },
        SleeveKind::Revenue => SleeveRules {
            strategy: StrategyAtEntry::CspThenCc,
            dte_range: 3..=5,
            dte_range_stress: None,
            delta_band: 0.30..=0.35,
            permitted_symbols: &["NVDA", "TSLA"],
            capital_deployment_pct: 0.95..=1.00,
            per_symbol_exposure_cap: 0.25,
            earnings_filter: EarningsFilter::Skip,
            fork_increment: Some(500_000),
        },
        SleeveKind::Compounder => SleeveRules {
            strategy: StrategyAtEntry::CcOnly,
            dte_range: 5..=5,
            dte_range_stress: None,
            delta_band: 0.20..=0.25,
            permitted_symbols: &["AAPL", "MSFT", "AMZN", "GOOGL", "NVDA", "TSLA", "META"],
            capital_deployment_pct: 0.95..=1.00,
            per_symbol_exposure_cap: 0.25,
            earnings_filter: EarningsFilter::ReduceCoverage(50),
            fork_increment: None,
        },
        SleeveKind::MiniCompound | SleeveKind::ForkedRoot => unreachable!(
            "rule_basis() maps forked kinds onto a base sleeve before this match"
        ),
    }
}

/// Child account lifecycle caps for Generator-spawned MiniCompound accounts
/// (spec.md §4.10).
pub const MINI_COMPOUND_AGE_CAP_YEARS: i64 = 3;
pub const MINI_COMPOUND_MULTIPLE_CAP: u32 = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_rules_match_constitution() {
        let r = rules_for(SleeveKind::Generator);
        assert_eq!(r.dte_range, 0..=1);
        assert_eq!(*r.delta_band.start(), 0.40);
        assert_eq!(*r.delta_band.end(), 0.45);
        assert_eq!(r.fork_increment, Some(100_000));
    }

    #[test]
    fn mini_compound_defers_to_compounder() {
        let r = rules_for(SleeveKind::MiniCompound);
        assert_eq!(r.strategy, StrategyAtEntry::CcOnly);
        assert_eq!(r.dte_range, 5..=5);
    }

    #[test]
    fn forked_root_defers_to_generator_until_its_triad_is_assembled() {
        assert_eq!(SleeveKind::ForkedRoot.rule_basis(), SleeveKind::Generator);
        let r = rules_for(SleeveKind::ForkedRoot);
        assert_eq!(r.dte_range, 0..=1);
        assert_eq!(r.fork_increment, Some(100_000));
    }

    #[test]
    fn compounder_has_no_fork_increment() {
        let r = rules_for(SleeveKind::Compounder);
        assert!(r.fork_increment.is_none());
    }
}
