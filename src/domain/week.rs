//! Weekly classification, recorded at every RECONCILING transition
//! (spec.md §4.11, §8 scenario narration).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeekType {
    /// No escalation past L0, all positions expired or closed for a gain.
    CalmIncome,
    /// At least one position rolled (L1/L2 handled without a stop-loss).
    Roll,
    /// At least one position was assigned.
    Assignment,
    /// An L3 stop-loss close occurred, or the account entered SafeMode.
    Preservation,
    /// System-wide Hedged Week circuit breaker was active at any point.
    Hedged,
    /// Earnings filter suppressed entry for one or more permitted symbols.
    EarningsFiltered,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WeekSignals {
    pub any_rolled: bool,
    pub any_assigned: bool,
    pub any_stop_loss: bool,
    pub hedged_week_active: bool,
    pub earnings_filtered: bool,
}

/// Deterministic classification from the week's accumulated signals.
/// Preservation dominates (a bad week is never reclassified as calm),
/// followed by assignment, roll, hedged, earnings, then calm-income as
/// the default.
pub fn classify_week(signals: WeekSignals) -> WeekType {
    if signals.any_stop_loss {
        WeekType::Preservation
    } else if signals.any_assigned {
        WeekType::Assignment
    } else if signals.any_rolled {
        WeekType::Roll
    } else if signals.hedged_week_active {
        WeekType::Hedged
    } else if signals.earnings_filtered {
        WeekType::EarningsFiltered
    } else {
        WeekType::CalmIncome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_loss_dominates_every_other_signal() {
        let signals = WeekSignals {
            any_stop_loss: true,
            any_assigned: true,
            any_rolled: true,
            ..Default::default()
        };
        assert_eq!(classify_week(signals), WeekType::Preservation);
    }

    #[test]
    fn default_signals_classify_as_calm() {
        assert_eq!(classify_week(WeekSignals::default()), WeekType::CalmIncome);
    }

    #[test]
    fn roll_without_assignment_or_stop_loss() {
        let signals = WeekSignals {
            any_rolled: true,
            ..Default::default()
        };
        assert_eq!(classify_week(signals), WeekType::Roll);
    }
}
