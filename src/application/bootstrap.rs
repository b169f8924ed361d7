//! Wiring: turns a `Config` into a running fleet of account workers
//! (spec.md §3 "three-sleeve account hierarchy", §5 "Scheduling model").
//! Mirrors the teacher's `PersistenceBootstrap`/`ServicesBootstrap`/
//! `AgentsBootstrap` split, collapsed to this crate's smaller surface:
//! one persistence handle, one set of shared adapters, one set of
//! account workers.

use std::sync::Arc;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tokio::sync::mpsc::Sender;
use tracing::info;

use crate::application::commands::AccountCommand;
use crate::application::supervisor::{build_account_worker, spawn_account_worker};
use crate::config::Config;
use crate::domain::account::{Account, AccountId};
use crate::domain::ledger::LedgerRecord;
use crate::domain::ports::LedgerStore;
use crate::domain::sleeve::SleeveKind;
use crate::infrastructure::ledger::SqliteLedgerStore;
use crate::infrastructure::mock::{MockBrokerService, MockClock, MockMarketDataService};
use crate::infrastructure::observability::LedgerReporter;

/// Opening capital split across the three root sleeves (spec.md §3): 40%
/// Generator, 30% Revenue, 30% Compounder.
const GENERATOR_SHARE: Decimal = Decimal::from_parts(40, 0, 0, false, 2);
const REVENUE_SHARE: Decimal = Decimal::from_parts(30, 0, 0, false, 2);
const COMPOUNDER_SHARE: Decimal = Decimal::from_parts(30, 0, 0, false, 2);

pub struct PersistenceHandle {
    pub ledger: Arc<SqliteLedgerStore>,
}

impl PersistenceHandle {
    pub async fn init(config: &Config) -> Result<Self> {
        info!(db_url = %config.database_url, "initializing ledger store");
        let ledger = SqliteLedgerStore::connect(&config.database_url)
            .await
            .context("failed to initialize audit ledger")?;
        Ok(Self { ledger: Arc::new(ledger) })
    }
}

/// The mock adapters a paper-trading run uses for every root capability.
/// A live `Mode` would substitute a real broker/feed here; this crate
/// only ships the mock side (spec.md's Non-goals exclude a concrete
/// broker integration).
pub struct ServicesHandle {
    pub clock: Arc<MockClock>,
    pub market: Arc<MockMarketDataService>,
    pub broker: Arc<MockBrokerService>,
}

impl ServicesHandle {
    pub fn init() -> Self {
        Self {
            clock: Arc::new(MockClock),
            market: Arc::new(MockMarketDataService::new()),
            broker: Arc::new(MockBrokerService::new()),
        }
    }
}

/// One sender per live account worker, so a CLI command can reach a
/// specific account by id.
pub struct AccountsHandle {
    pub command_senders: Vec<(AccountId, Sender<AccountCommand>)>,
}

impl AccountsHandle {
    pub async fn init(config: &Config, persistence: &PersistenceHandle, services: &ServicesHandle) -> Result<Self> {
        let roots = [
            (SleeveKind::Generator, GENERATOR_SHARE),
            (SleeveKind::Revenue, REVENUE_SHARE),
            (SleeveKind::Compounder, COMPOUNDER_SHARE),
        ];

        let mut command_senders = Vec::with_capacity(roots.len());
        for (kind, share) in roots {
            let capital = config.opening_capital * share;
            let account = Account::genesis(kind, capital);
            let account_id = account.id;

            persistence
                .ledger
                .append(LedgerRecord::AccountOpened {
                    account_id,
                    opening_capital: capital,
                })
                .await
                .context("failed to ledger account genesis")?;

            // Stress mode tightens the Rules Engine's delta/DTE bands; it is
            // driven at runtime by the Protocol Engine's VIX reading, not a
            // static startup flag, so every worker starts in the normal band.
            let (worker, tx) = build_account_worker(account, services.clock.clone(), persistence.ledger.clone(), services.market.clone(), services.broker.clone(), false);
            spawn_account_worker(worker);
            command_senders.push((account_id, tx));
            info!(%account_id, ?kind, %capital, "account worker online");
        }

        Ok(Self { command_senders })
    }
}

/// Everything a running process needs to keep alive: the fleet of
/// account workers plus the background observability reporter.
pub struct Application {
    pub persistence: PersistenceHandle,
    pub services: ServicesHandle,
    pub accounts: AccountsHandle,
}

impl Application {
    pub async fn build(config: &Config) -> Result<Self> {
        let persistence = PersistenceHandle::init(config).await?;
        let services = ServicesHandle::init();
        let accounts = AccountsHandle::init(config, &persistence, &services).await?;

        tokio::spawn(LedgerReporter::new(persistence.ledger.clone(), config.observability_interval_secs).run());

        Ok(Self {
            persistence,
            services,
            accounts,
        })
    }

    /// Broadcasts a command to every live account (e.g. the CLI's
    /// `pause-account --all` / `kill-all`).
    pub async fn broadcast(&self, cmd_factory: impl Fn() -> AccountCommand) {
        for (account_id, tx) in &self.accounts.command_senders {
            if tx.send(cmd_factory()).await.is_err() {
                tracing::warn!(%account_id, "account worker no longer listening for commands");
            }
        }
    }
}
