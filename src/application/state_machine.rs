//! Account State Machine (component C11, spec.md §4.11).
//!
//! One instance per account, strictly single-tasked: at most one state
//! handler runs for a given account at any moment (spec.md §5). Every
//! transition is append-logged before it takes effect, so a restart can
//! resume at the last logged state rather than re-deciding anything
//! already committed (the resume contract in spec.md §4.11).

use std::sync::Arc;

use crate::domain::account::{Account, AccountId};
use crate::domain::errors::AccountError;
use crate::domain::ledger::LedgerRecord;
use crate::domain::ports::LedgerStore;
use crate::domain::week::{classify_week, WeekSignals};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountState {
    Safe,
    Scanning,
    Analyzing,
    Ordering,
    Monitoring,
    Closing,
    Reconciling,
    Emergency,
}

impl std::fmt::Display for AccountState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The facts the machine needs to decide a transition; gathered by the
/// caller from the other engines/ports each cycle rather than owned here,
/// so this type stays a pure decision function.
#[derive(Debug, Clone, Default)]
pub struct TransitionInputs {
    pub market_open: bool,
    pub system_kill: bool,
    pub system_safe_mode: bool,
    pub ledger_healthy: bool,
    pub snapshot_fresh_for_all_permitted_symbols: bool,
    pub has_candidate_action: bool,
    pub entry_window_open: bool,
    pub all_entry_orders_terminal: bool,
    pub profit_take_met: bool,
    pub dte_at_or_below_one: bool,
    pub l3_escalation: bool,
    pub circuit_breaker_escalation: bool,
    pub no_working_orders: bool,
    pub positions_reconciled: bool,
    pub broker_outage_minutes: u32,
    pub invariant_violation: bool,
    /// spec.md §4.11: RECONCILING->SAFE is additionally gated on the
    /// week having been classified this cycle.
    pub week_classified: bool,
    pub week_signals: WeekSignals,
}

/// Decides the next state from the current one and this cycle's facts.
/// `None` means "stay put" (the precondition for every outbound edge is
/// unmet). Mirrors the diagram in spec.md §4.11 exactly.
pub fn next_state(current: AccountState, inputs: &TransitionInputs) -> Option<AccountState> {
    if inputs.invariant_violation || inputs.system_kill || inputs.broker_outage_minutes > 5 || !inputs.ledger_healthy {
        if current == AccountState::Emergency {
            return None;
        }
        return Some(AccountState::Emergency);
    }

    match current {
        AccountState::Safe => {
            (inputs.market_open && !inputs.system_kill && !inputs.system_safe_mode && inputs.ledger_healthy).then_some(AccountState::Scanning)
        }
        AccountState::Scanning => inputs.snapshot_fresh_for_all_permitted_symbols.then_some(AccountState::Analyzing),
        AccountState::Analyzing => {
            if inputs.has_candidate_action && inputs.entry_window_open {
                Some(AccountState::Ordering)
            } else {
                Some(AccountState::Monitoring)
            }
        }
        AccountState::Ordering => inputs.all_entry_orders_terminal.then_some(AccountState::Monitoring),
        AccountState::Monitoring => {
            (inputs.profit_take_met || inputs.dte_at_or_below_one || inputs.l3_escalation || inputs.circuit_breaker_escalation)
                .then_some(AccountState::Closing)
        }
        AccountState::Closing => (inputs.no_working_orders && inputs.positions_reconciled).then_some(AccountState::Reconciling),
        AccountState::Reconciling => inputs.week_classified.then_some(AccountState::Safe),
        AccountState::Emergency => None,
    }
}

pub struct AccountStateMachine<L> {
    ledger: Arc<L>,
    account_id: AccountId,
    state: AccountState,
    paused: bool,
}

impl<L: LedgerStore> AccountStateMachine<L> {
    pub fn new(ledger: Arc<L>, account_id: AccountId) -> Self {
        Self {
            ledger,
            account_id,
            state: AccountState::Safe,
            paused: false,
        }
    }

    pub fn current(&self) -> AccountState {
        self.state
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Advances the machine one step, append-logging the transition
    /// before returning it. A paused machine never advances out of SAFE.
    pub async fn advance(&mut self, inputs: &TransitionInputs) -> Result<Option<AccountState>, AccountError> {
        if self.paused && self.state == AccountState::Safe {
            return Ok(None);
        }
        let Some(to) = next_state(self.state, inputs) else {
            return Ok(None);
        };
        let from = self.state;
        self.ledger
            .append(LedgerRecord::StateTransition {
                account_id: self.account_id,
                from: from.to_string(),
                to: to.to_string(),
            })
            .await
            .map_err(|_| AccountError::InvariantViolation {
                account: self.account_id,
                reason: "ledger append failed during state transition".to_string(),
            })?;

        if from == AccountState::Reconciling && to == AccountState::Safe {
            self.ledger
                .append(LedgerRecord::WeekClassification {
                    account_id: self.account_id,
                    week_type: classify_week(inputs.week_signals),
                })
                .await
                .map_err(|_| AccountError::InvariantViolation {
                    account: self.account_id,
                    reason: "ledger append failed during week classification".to_string(),
                })?;
        }

        self.state = to;
        Ok(Some(to))
    }

    /// Resume contract step 7 (spec.md §4.11): after replay rebuilds the
    /// derived stores, the machine resumes exactly at the last logged
    /// state rather than SAFE.
    pub fn resume_at(&mut self, state: AccountState) {
        self.state = state;
    }
}

/// Converts an account's persisted status into its initial resumed
/// state, used during the startup replay described in spec.md §4.11.
pub fn resume_state_for(account: &Account) -> AccountState {
    use crate::domain::account::AccountStatus;
    match account.status {
        AccountStatus::SafeMode | AccountStatus::Closed => AccountState::Safe,
        AccountStatus::Merging => AccountState::Reconciling,
        AccountStatus::Paused | AccountStatus::Active => AccountState::Safe,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_inputs() -> TransitionInputs {
        TransitionInputs {
            ledger_healthy: true,
            ..Default::default()
        }
    }

    #[test]
    fn safe_advances_to_scanning_when_market_open() {
        let mut inputs = base_inputs();
        inputs.market_open = true;
        assert_eq!(next_state(AccountState::Safe, &inputs), Some(AccountState::Scanning));
    }

    #[test]
    fn safe_stays_put_when_market_closed() {
        let inputs = base_inputs();
        assert_eq!(next_state(AccountState::Safe, &inputs), None);
    }

    #[test]
    fn analyzing_skips_to_monitoring_with_no_candidate() {
        let inputs = base_inputs();
        assert_eq!(next_state(AccountState::Analyzing, &inputs), Some(AccountState::Monitoring));
    }

    #[test]
    fn analyzing_goes_to_ordering_with_candidate_in_window() {
        let mut inputs = base_inputs();
        inputs.has_candidate_action = true;
        inputs.entry_window_open = true;
        assert_eq!(next_state(AccountState::Analyzing, &inputs), Some(AccountState::Ordering));
    }

    #[test]
    fn any_state_escalates_to_emergency_on_invariant_violation() {
        let mut inputs = base_inputs();
        inputs.invariant_violation = true;
        assert_eq!(next_state(AccountState::Monitoring, &inputs), Some(AccountState::Emergency));
    }

    #[test]
    fn emergency_is_a_sink_state() {
        let mut inputs = base_inputs();
        inputs.invariant_violation = true;
        assert_eq!(next_state(AccountState::Emergency, &inputs), None);
    }

    #[test]
    fn reconciling_returns_to_safe_once_the_week_is_classified() {
        let mut inputs = base_inputs();
        inputs.week_classified = true;
        assert_eq!(next_state(AccountState::Reconciling, &inputs), Some(AccountState::Safe));
    }

    #[test]
    fn reconciling_stays_put_until_the_week_is_classified() {
        let inputs = base_inputs();
        assert_eq!(next_state(AccountState::Reconciling, &inputs), None);
    }
}
