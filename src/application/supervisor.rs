//! Per-account task supervisor (spec.md §5 "Scheduling model").
//!
//! Cooperative task-per-account: each account's state machine is
//! strictly single-tasked, advanced by one `tokio::select!` loop whose
//! only suspension points are broker I/O, market-data fetch, ledger
//! append acknowledgement, and the bounded sleep between monitoring
//! ticks. Independent accounts run on separate tokio tasks and advance
//! in parallel; the ledger serialises writes but stays lock-free for
//! reads (spec.md §5 "Cross-account parallelism").

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::mpsc::{Receiver, Sender};
use tracing::{debug, error, info, warn};

use crate::application::commands::AccountCommand;
use crate::application::fork_merge::ForkMergeManager;
use crate::application::order_lifecycle::OrderLifecycleManager;
use crate::application::protocol_engine::ProtocolEngine;
use crate::application::reinvestment::{self, ReinvestmentManager};
use crate::application::rules_engine::{RulesEngine, ValidationContext};
use crate::application::state_machine::{AccountState, AccountStateMachine, TransitionInputs};
use crate::domain::account::Account;
use crate::domain::clock::{entry_window_for, ClockService};
use crate::domain::genealogy::ForkDecision;
use crate::domain::order::ClientOrderId;
use crate::domain::ports::{BrokerService, LedgerStore, MarketDataService};
use crate::domain::protocol::{ProtocolLevel, SystemMode};
use crate::domain::rules::CandidateAction;
use crate::domain::week::WeekSignals;

/// One account's worker: owns the engines that need the shared ports,
/// its own command queue, and its monitoring cadence. Built by
/// `bootstrap` and handed to `tokio::spawn`.
pub struct AccountWorker<C, L, M, B> {
    pub account: Account,
    clock: Arc<C>,
    state_machine: AccountStateMachine<L>,
    protocol_engine: ProtocolEngine<M, L>,
    order_lifecycle: OrderLifecycleManager<B, L>,
    fork_merge: ForkMergeManager<L>,
    reinvestment: ReinvestmentManager<L>,
    rules_engine: RulesEngine,
    cmd_rx: Receiver<AccountCommand>,
    current_level: ProtocolLevel,
    /// A candidate proposed by the scanning layer, awaiting this
    /// account's next Analyzing tick for Rules Engine validation.
    pending_candidate: Option<CandidateAction>,
    /// A candidate that cleared validation this cycle and is waiting
    /// for the Ordering tick to submit it.
    approved_candidate: Option<CandidateAction>,
    /// Accumulated across the week's ticks, consumed and reset at the
    /// RECONCILING transition (spec.md §4.11).
    week_signals: WeekSignals,
    /// Newly-spawned accounts from this tick's fork evaluation, handed
    /// back to the caller so `bootstrap` can stand up their own workers.
    pub spawned: Vec<Account>,
}

impl<C, L, M, B> AccountWorker<C, L, M, B>
where
    C: ClockService + 'static,
    L: LedgerStore + 'static,
    M: MarketDataService + 'static,
    B: BrokerService + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(account: Account, clock: Arc<C>, ledger: Arc<L>, market: Arc<M>, broker: Arc<B>, cmd_rx: Receiver<AccountCommand>, stress_mode: bool) -> Self {
        let account_id = account.id;
        Self {
            state_machine: AccountStateMachine::new(ledger.clone(), account_id),
            protocol_engine: ProtocolEngine::new(market.clone(), ledger.clone()),
            order_lifecycle: OrderLifecycleManager::new(broker, ledger.clone()),
            fork_merge: ForkMergeManager::new(ledger.clone()),
            reinvestment: ReinvestmentManager::new(ledger),
            rules_engine: RulesEngine::standard(stress_mode),
            account,
            clock,
            cmd_rx,
            current_level: ProtocolLevel::L0,
            pending_candidate: None,
            approved_candidate: None,
            week_signals: WeekSignals::default(),
            spawned: Vec::new(),
        }
    }

    fn handle_command(&mut self, cmd: AccountCommand) {
        debug!(account = %self.account.id, command = cmd.name(), "dispatching account command");
        match cmd {
            AccountCommand::Pause => self.state_machine.pause(),
            AccountCommand::Resume => self.state_machine.resume(),
            AccountCommand::ForceSafeMode(reason) => {
                warn!(account = %self.account.id, %reason, "forcing account to SAFE");
                self.state_machine.resume_at(AccountState::Safe);
                self.state_machine.pause();
            }
            AccountCommand::OrderUpdate { client_order_id, status } => {
                debug!(account = %self.account.id, %client_order_id, ?status, "order update observed");
            }
            AccountCommand::SubmitApproved(candidate) => {
                self.pending_candidate = Some(candidate);
            }
            AccountCommand::MonitoringTick | AccountCommand::EntryWindowOpen | AccountCommand::Reconcile => {
                // Handled by the dedicated async paths in `tick`; routed here
                // only when delivered out of band (e.g. a manual nudge).
            }
        }
    }

    /// One cycle of work: evaluate system mode, drive whichever engine
    /// this account's current state calls for — candidate validation in
    /// Analyzing, submission in Ordering, fork/reinvestment/week
    /// classification in Reconciling — and advance the account state
    /// machine by whatever facts are now true. Returns the new state if
    /// one was reached.
    pub async fn tick(&mut self) -> Option<AccountState> {
        let market_open = self.clock.is_market_open().await.unwrap_or(false);
        let system_mode = self.protocol_engine.system_mode().await;
        let system_kill = matches!(system_mode, SystemMode::Kill);
        let system_safe_mode = matches!(system_mode, SystemMode::SafeMode | SystemMode::Kill);
        if matches!(system_mode, SystemMode::Hedged) {
            self.week_signals.hedged_week_active = true;
        }

        let mut inputs = TransitionInputs {
            market_open,
            system_kill,
            system_safe_mode,
            ledger_healthy: true,
            no_working_orders: self.order_lifecycle.working_count() == 0,
            ..Default::default()
        };

        match self.state_machine.current() {
            AccountState::Scanning => {
                // A fresh market-open read this same tick is the snapshot
                // freshness evidence the Scanning->Analyzing edge needs.
                inputs.snapshot_fresh_for_all_permitted_symbols = market_open;
            }
            AccountState::Analyzing => self.analyze(&mut inputs, system_safe_mode).await,
            AccountState::Ordering => self.order(&mut inputs).await,
            AccountState::Monitoring => {
                inputs.l3_escalation = self.current_level == ProtocolLevel::L3;
                inputs.circuit_breaker_escalation = system_safe_mode;
                if inputs.l3_escalation {
                    self.week_signals.any_stop_loss = true;
                }
            }
            AccountState::Closing => {
                inputs.positions_reconciled = inputs.no_working_orders;
            }
            AccountState::Reconciling => self.reconcile_week(&mut inputs).await,
            _ => {}
        }

        match self.state_machine.advance(&inputs).await {
            Ok(new_state) => new_state,
            Err(e) => {
                error!(account = %self.account.id, error = %e, "state machine advance failed");
                None
            }
        }
    }

    /// Validates any candidate the scanning layer proposed against the
    /// Rules Engine; an approved candidate is queued for the Ordering
    /// tick, a rejected one is dropped and logged (spec.md §4.5 "no
    /// partial approval" — either fully compliant or discarded).
    async fn analyze(&mut self, inputs: &mut TransitionInputs, system_safe_mode: bool) {
        let window = entry_window_for(self.account.kind);
        let now = self.clock.now();
        inputs.entry_window_open = window.contains(now);

        let Some(candidate) = self.pending_candidate.take() else {
            return;
        };
        let ctx = ValidationContext {
            account: &self.account,
            action: &candidate,
            option_chain: None,
            now,
            has_earnings_this_week: None,
            system_safe_mode,
            sleeve_notional: self.account.opening_capital,
            existing_symbol_exposure: Decimal::ZERO,
            duplicate_order_pending: false,
        };
        let outcome = self.rules_engine.validate(&ctx).await;
        if outcome.is_approved() {
            inputs.has_candidate_action = true;
            self.approved_candidate = Some(candidate);
        } else {
            debug!(account = %self.account.id, reasons = ?outcome.reasons(), "candidate rejected by rules engine");
        }
    }

    /// Submits an approved candidate through the Order Lifecycle
    /// Manager; Ordering->Monitoring waits for it to reach a terminal
    /// status (spec.md §4.7).
    async fn order(&mut self, inputs: &mut TransitionInputs) {
        if let Some(candidate) = self.approved_candidate.take() {
            let client_order_id = ClientOrderId {
                account_id: self.account.id,
                intent: candidate.intent,
                symbol: candidate.symbol.clone(),
                expiry: candidate.expiry,
                strike: candidate.strike,
                version: 1,
            };
            if let Err(e) = self.order_lifecycle.submit(client_order_id, candidate.limit_price, candidate.quantity).await {
                warn!(account = %self.account.id, error = %e, "candidate submission failed");
            }
        }
        inputs.all_entry_orders_terminal = self.order_lifecycle.working_count() == 0;
    }

    /// Weekly RECONCILING work: fork/merge evaluation, reinvestment
    /// application, and classifying the week from its accumulated
    /// signals (spec.md §4.10, §4.11, §4.12).
    async fn reconcile_week(&mut self, inputs: &mut TransitionInputs) {
        match self.fork_merge.evaluate(&self.account) {
            ForkDecision::GeneratorFork => match self.fork_merge.fork_generator(&mut self.account).await {
                Ok(child) => {
                    info!(parent = %self.account.id, child = %child.id, "generator fork spawned");
                    self.spawned.push(child);
                }
                Err(e) => error!(account = %self.account.id, error = %e, "generator fork failed"),
            },
            ForkDecision::RevenueFork => match self.fork_merge.fork_revenue(&mut self.account).await {
                Ok(child) => {
                    info!(parent = %self.account.id, child = %child.id, "revenue fork spawned");
                    self.spawned.push(child);
                }
                Err(e) => error!(account = %self.account.id, error = %e, "revenue fork failed"),
            },
            ForkDecision::None => {}
        }

        if reinvestment::eligible(self.account.kind) && !self.account.quarter_to_date_realised_gains.is_zero() {
            let plan = reinvestment::plan_reinvestment(self.account.quarter_to_date_realised_gains);
            if let Err(e) = self.reinvestment.apply(&mut self.account, plan).await {
                error!(account = %self.account.id, error = %e, "reinvestment application failed");
            }
        }

        inputs.week_classified = true;
        inputs.week_signals = self.week_signals;
        self.week_signals = WeekSignals::default();
    }

    /// The account's main loop. Cadence of the monitoring tick follows
    /// the account's current protocol level (spec.md §4.8 table); a
    /// command arriving off the control channel is handled immediately
    /// rather than waiting for the next tick.
    pub async fn run(mut self) {
        info!(account = %self.account.id, "account worker started");
        let mut interval = tokio::time::interval(self.current_level.monitoring_period());

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Some(new_state) = self.tick().await {
                        debug!(account = %self.account.id, state = %new_state, "account advanced");
                    }
                }
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd),
                        None => {
                            info!(account = %self.account.id, "command channel closed, shutting down worker");
                            break;
                        }
                    }
                }
            }
        }
    }
}

/// Builds a fresh command channel and the worker that consumes it. The
/// caller keeps the returned `Sender` to route commands; the account
/// advances independently of its siblings once spawned onto its own
/// task (spec.md §5 "Cross-account parallelism").
#[allow(clippy::too_many_arguments)]
pub fn build_account_worker<C, L, M, B>(account: Account, clock: Arc<C>, ledger: Arc<L>, market: Arc<M>, broker: Arc<B>, stress_mode: bool) -> (AccountWorker<C, L, M, B>, Sender<AccountCommand>)
where
    C: ClockService + 'static,
    L: LedgerStore + 'static,
    M: MarketDataService + 'static,
    B: BrokerService + 'static,
{
    let (tx, rx) = tokio::sync::mpsc::channel(64);
    (AccountWorker::new(account, clock, ledger, market, broker, rx, stress_mode), tx)
}

/// Spawns an already-built `AccountWorker` onto its own task.
pub fn spawn_account_worker<C, L, M, B>(worker: AccountWorker<C, L, M, B>)
where
    C: ClockService + 'static,
    L: LedgerStore + 'static,
    M: MarketDataService + 'static,
    B: BrokerService + 'static,
{
    tokio::spawn(worker.run());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::MarketHours;
    use crate::domain::errors::LedgerError;
    use crate::domain::errors::OrderLifecycleError;
    use crate::domain::ledger::{LedgerEntry, LedgerRecord};
    use crate::domain::market::{OptionChain, Quote};
    use crate::domain::order::{ClientOrderId, OrderStatus};
    use crate::domain::ports::OrderAck;
    use crate::domain::sleeve::SleeveKind;
    use async_trait::async_trait;
    use rust_decimal::Decimal;

    struct FixedClock;

    #[async_trait]
    impl ClockService for FixedClock {
        fn now(&self) -> chrono::DateTime<chrono::Utc> {
            chrono::Utc::now()
        }
        async fn is_market_open(&self) -> Option<bool> {
            Some(true)
        }
        async fn next_entry_window(&self, _kind: SleeveKind) -> Option<(chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>)> {
            None
        }
        async fn has_earnings(&self, _symbol: &str, _iso_week: (i32, u32)) -> Option<bool> {
            Some(false)
        }
        async fn is_safe_holiday(&self) -> Option<bool> {
            Some(false)
        }
        async fn market_hours(&self, _date: chrono::NaiveDate) -> Option<MarketHours> {
            None
        }
    }

    struct NoopLedger;

    #[async_trait]
    impl LedgerStore for NoopLedger {
        async fn append(&self, _record: LedgerRecord) -> Result<u64, LedgerError> {
            Ok(1)
        }
        async fn read_since(&self, _seq: u64) -> Result<Vec<LedgerEntry>, LedgerError> {
            Ok(vec![])
        }
        async fn snapshot_hash(&self) -> Result<[u8; 32], LedgerError> {
            Ok([0u8; 32])
        }
    }

    struct NoopMarket;

    #[async_trait]
    impl MarketDataService for NoopMarket {
        async fn quote(&self, _symbol: &str) -> Option<Quote> {
            None
        }
        async fn option_chain(&self, _symbol: &str) -> Option<OptionChain> {
            None
        }
        async fn vix(&self) -> Option<f64> {
            Some(18.0)
        }
        async fn atr5(&self, _symbol: &str) -> Option<Decimal> {
            None
        }
    }

    struct NoopBroker;

    #[async_trait]
    impl BrokerService for NoopBroker {
        async fn submit(&self, _client_order_id: &ClientOrderId, _limit_price: Decimal, _quantity: i64) -> Result<OrderAck, OrderLifecycleError> {
            Ok(OrderAck { accepted: true })
        }
        async fn cancel(&self, _client_order_id: &ClientOrderId) -> Result<(), OrderLifecycleError> {
            Ok(())
        }
        async fn status(&self, _client_order_id: &ClientOrderId) -> Option<OrderStatus> {
            None
        }
        async fn open_orders(&self) -> Vec<ClientOrderId> {
            vec![]
        }
    }

    fn account() -> Account {
        Account::genesis(SleeveKind::Generator, rust_decimal_macros::dec!(100000))
    }

    #[tokio::test]
    async fn tick_advances_safe_to_scanning_when_market_open() {
        let (_tx, rx) = tokio::sync::mpsc::channel(4);
        let mut worker = AccountWorker::new(account(), Arc::new(FixedClock), Arc::new(NoopLedger), Arc::new(NoopMarket), Arc::new(NoopBroker), rx, false);
        let new_state = worker.tick().await;
        assert_eq!(new_state, Some(AccountState::Scanning));
    }
}
