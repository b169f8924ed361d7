//! Protocol Engine orchestration (component C8, spec.md §4.8).
//!
//! Per open position, once per monitoring tick: compute the position's
//! current level from live spot and strike/ATR thresholds, then act.
//! The pure classification and roll-economics math lives in
//! `domain::protocol`; this module sequences it against the ports
//! (market data, broker, ledger) and decides what to do about a level
//! change.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::account::AccountId;
use crate::domain::errors::ProtocolError;
use crate::domain::ledger::LedgerRecord;
use crate::domain::ports::{LedgerStore, MarketDataService};
use crate::domain::position::{Position, PositionStatus};
use crate::domain::protocol::{
    cc_should_close_on_decay, cc_should_close_on_early_assignment_risk, classify_system_mode, early_assignment_probability,
    hedge_budget, pick_best_roll_candidate, roll_debit_acceptable, ProtocolLevel, ProtocolThresholds, RollCandidate, SystemMode,
    VixThresholds,
};

/// What the engine decided to do about one position this tick.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolAction {
    Hold,
    ComputeRollCandidates,
    ExecuteRoll { debit: Decimal, new_strike: Decimal, new_expiry: chrono::NaiveDate },
    StopLossClose,
    CloseForDecay,
    CloseForEarlyAssignmentRisk,
}

pub struct ProtocolEngine<M, L> {
    market: Arc<M>,
    ledger: Arc<L>,
    vix_thresholds: VixThresholds,
}

impl<M, L> ProtocolEngine<M, L>
where
    M: MarketDataService,
    L: LedgerStore,
{
    pub fn new(market: Arc<M>, ledger: Arc<L>) -> Self {
        Self {
            market,
            ledger,
            vix_thresholds: VixThresholds::default(),
        }
    }

    /// spec.md §4.8 "System-wide circuit breakers", evaluated before any
    /// per-position logic.
    pub async fn system_mode(&self) -> SystemMode {
        match self.market.vix().await {
            Some(vix) => classify_system_mode(vix, self.vix_thresholds),
            // No VIX reading is itself a data failure; treat conservatively.
            None => SystemMode::SafeMode,
        }
    }

    /// Classifies a position's current protocol level from a live spot
    /// price and its frozen ATR thresholds.
    pub fn classify_level(&self, position: &Position, spot: Decimal, thresholds: &ProtocolThresholds) -> ProtocolLevel {
        if position.kind == crate::domain::position::PositionKind::Cc {
            thresholds.classify_call(spot)
        } else {
            thresholds.classify_put(spot)
        }
    }

    /// Decides the action for one position given its newly classified
    /// level and (if any) the best available roll candidate.
    pub fn decide(
        &self,
        position: &Position,
        new_level: ProtocolLevel,
        dte: i64,
        best_roll: Option<&RollCandidate>,
        assignment_prob: f64,
    ) -> Result<ProtocolAction, ProtocolError> {
        use crate::domain::position::PositionKind;

        if position.kind == PositionKind::Cc {
            if cc_should_close_on_decay(position.opening_credit_debit, position.current_mark, dte) {
                return Ok(ProtocolAction::CloseForDecay);
            }
            if cc_should_close_on_early_assignment_risk(position.opening_credit_debit, position.current_mark, assignment_prob) {
                return Ok(ProtocolAction::CloseForEarlyAssignmentRisk);
            }
        }

        match new_level {
            ProtocolLevel::L0 => Ok(ProtocolAction::Hold),
            ProtocolLevel::L1 => Ok(ProtocolAction::ComputeRollCandidates),
            ProtocolLevel::L2 => {
                let candidate = best_roll.ok_or(ProtocolError::NoRollCandidate)?;
                if !roll_debit_acceptable(candidate.debit, position.opening_credit_debit) {
                    return Err(ProtocolError::RollDebitExceeded {
                        debit: candidate.debit,
                        credit: position.opening_credit_debit,
                    });
                }
                Ok(ProtocolAction::ExecuteRoll {
                    debit: candidate.debit,
                    new_strike: candidate.strike,
                    new_expiry: candidate.expiry,
                })
            }
            ProtocolLevel::L3 => Ok(ProtocolAction::StopLossClose),
        }
    }

    pub fn pick_roll(&self, candidates: &[RollCandidate], delta_band_mid: f64) -> Option<&RollCandidate> {
        pick_best_roll_candidate(candidates, delta_band_mid)
    }

    pub fn estimate_assignment_probability(&self, spot: Decimal, position: &Position) -> f64 {
        let is_call = position.kind == crate::domain::position::PositionKind::Cc;
        early_assignment_probability(spot, position.strike, position.current_mark, is_call)
    }

    /// spec.md §4.8 "Hedging": budget for a new hedge basket on L2
    /// escalation with no hedge leg active.
    pub fn hedge_budget(&self, trailing_quarterly_gains: Decimal, sleeve_equity: Decimal) -> Decimal {
        hedge_budget(trailing_quarterly_gains, sleeve_equity)
    }

    pub async fn record_escalation(&self, account_id: AccountId, from: ProtocolLevel, to: ProtocolLevel) -> Result<u64, crate::domain::errors::LedgerError> {
        self.ledger
            .append(LedgerRecord::StateTransition {
                account_id,
                from: format!("{from:?}"),
                to: format!("{to:?}"),
            })
            .await
    }

    pub fn position_is_escalated(&self, position: &Position) -> bool {
        !matches!(position.current_protocol_level, ProtocolLevel::L0) && position.status == PositionStatus::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_position(mark: Decimal, credit: Decimal) -> Position {
        Position {
            id: Default::default(),
            account_id: Default::default(),
            symbol: "NVDA".to_string(),
            kind: crate::domain::position::PositionKind::Csp,
            strike: dec!(420),
            expiry: chrono::NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
            quantity: -3,
            opening_credit_debit: credit,
            current_mark: mark,
            delta_at_last_refresh: 0.33,
            entry_protocol_level: ProtocolLevel::L0,
            current_protocol_level: ProtocolLevel::L0,
            status: PositionStatus::Open,
            opened_at: chrono::Utc::now(),
        }
    }

    struct NoopMarket;
    struct NoopLedger;

    #[async_trait::async_trait]
    impl MarketDataService for NoopMarket {
        async fn quote(&self, _symbol: &str) -> Option<crate::domain::market::Quote> {
            None
        }
        async fn option_chain(&self, _symbol: &str) -> Option<crate::domain::market::OptionChain> {
            None
        }
        async fn vix(&self) -> Option<f64> {
            Some(22.0)
        }
        async fn atr5(&self, _symbol: &str) -> Option<Decimal> {
            Some(dec!(4))
        }
    }

    #[async_trait::async_trait]
    impl LedgerStore for NoopLedger {
        async fn append(&self, _record: LedgerRecord) -> Result<u64, crate::domain::errors::LedgerError> {
            Ok(1)
        }
        async fn read_since(&self, _seq: u64) -> Result<Vec<crate::domain::ledger::LedgerEntry>, crate::domain::errors::LedgerError> {
            Ok(vec![])
        }
        async fn snapshot_hash(&self) -> Result<[u8; 32], crate::domain::errors::LedgerError> {
            Ok([0u8; 32])
        }
    }

    fn engine() -> ProtocolEngine<NoopMarket, NoopLedger> {
        ProtocolEngine::new(Arc::new(NoopMarket), Arc::new(NoopLedger))
    }

    #[test]
    fn l0_holds() {
        let e = engine();
        let pos = sample_position(dec!(0.80), dec!(0.80));
        let action = e.decide(&pos, ProtocolLevel::L0, 5, None, 0.0).unwrap();
        assert_eq!(action, ProtocolAction::Hold);
    }

    #[test]
    fn l2_without_candidate_errors() {
        let e = engine();
        let pos = sample_position(dec!(1.20), dec!(0.80));
        let err = e.decide(&pos, ProtocolLevel::L2, 5, None, 0.0).unwrap_err();
        assert!(matches!(err, ProtocolError::NoRollCandidate));
    }

    #[test]
    fn l2_with_acceptable_roll_executes() {
        let e = engine();
        let pos = sample_position(dec!(1.20), dec!(0.80));
        let candidate = RollCandidate {
            expiry: chrono::NaiveDate::from_ymd_opt(2026, 8, 14).unwrap(),
            strike: dec!(410),
            delta: 0.32,
            debit: dec!(0.30),
        };
        let action = e.decide(&pos, ProtocolLevel::L2, 5, Some(&candidate), 0.0).unwrap();
        assert!(matches!(action, ProtocolAction::ExecuteRoll { .. }));
    }

    #[test]
    fn l3_stops_out() {
        let e = engine();
        let pos = sample_position(dec!(2.50), dec!(0.80));
        let action = e.decide(&pos, ProtocolLevel::L3, 5, None, 0.0).unwrap();
        assert_eq!(action, ProtocolAction::StopLossClose);
    }

    #[tokio::test]
    async fn system_mode_normal_under_low_vix() {
        let e = engine();
        assert_eq!(e.system_mode().await, SystemMode::Normal);
    }
}
