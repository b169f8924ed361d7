//! Command abstraction for the per-account state machine (spec.md §4.11).
//!
//! Mirrors the `RiskCommand` dispatch pattern: every external event and
//! internal timer tick funnels through one enum so `run()` stays a
//! single `tokio::select!` over a handful of channels and intervals.

use crate::domain::order::{ClientOrderId, OrderStatus};
use crate::domain::rules::CandidateAction;

#[derive(Debug)]
pub enum AccountCommand {
    /// A monitoring-cadence tick fired by the account's interval timer;
    /// cadence itself is driven by the account's current protocol level.
    MonitoringTick,
    /// Weekly entry-window tick: advance SAFE -> SCANNING.
    EntryWindowOpen,
    /// Broker pushed a status change for one of this account's orders.
    OrderUpdate {
        client_order_id: ClientOrderId,
        status: OrderStatus,
    },
    /// A candidate action cleared the Rules Engine and is ready to submit.
    SubmitApproved(CandidateAction),
    /// Operator-issued pause; account finishes its current state then
    /// parks in SAFE until resumed.
    Pause,
    Resume,
    /// System-wide Kill circuit breaker: cancel all working orders, force
    /// SAFE, refuse further commands until manually resumed.
    ForceSafeMode(String),
    /// Weekly RECONCILING reached: evaluate fork/merge and reinvestment.
    Reconcile,
}

impl AccountCommand {
    pub fn name(&self) -> &'static str {
        match self {
            AccountCommand::MonitoringTick => "MonitoringTick",
            AccountCommand::EntryWindowOpen => "EntryWindowOpen",
            AccountCommand::OrderUpdate { .. } => "OrderUpdate",
            AccountCommand::SubmitApproved(_) => "SubmitApproved",
            AccountCommand::Pause => "Pause",
            AccountCommand::Resume => "Resume",
            AccountCommand::ForceSafeMode(_) => "ForceSafeMode",
            AccountCommand::Reconcile => "Reconcile",
        }
    }
}
