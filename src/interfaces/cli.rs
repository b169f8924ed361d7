//! `alluse` binary commands (spec.md §6): `start`, `pause-account <id>`,
//! `kill-all`, `snapshot-ledger`, `replay-to-seq <n>`.

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use crate::application::bootstrap::Application;
use crate::application::commands::AccountCommand;
use crate::config::Config;
use crate::domain::account::AccountId;
use crate::domain::ledger::verify_chain;
use crate::domain::ports::LedgerStore;

#[derive(Parser)]
#[command(name = "alluse", about = "Autonomous options wealth-management engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Boot the account fleet and run until interrupted.
    Start,
    /// Park a single account in SAFE until resumed.
    PauseAccount { id: String },
    /// Trip the system-wide Kill circuit breaker for every account.
    KillAll,
    /// Print the ledger's current sequence head and rolling hash.
    SnapshotLedger,
    /// Rebuild every derived store from the ledger up to `seq` and report
    /// whether the hash chain still verifies.
    ReplayToSeq { seq: u64 },
}

/// Process exit codes (spec.md §6): 0 clean shutdown, 2 ledger-integrity
/// failure, 3 broker unreachable at startup, 4 configuration invalid.
pub const EXIT_OK: i32 = 0;
pub const EXIT_LEDGER_INTEGRITY: i32 = 2;
pub const EXIT_BROKER_UNREACHABLE: i32 = 3;
pub const EXIT_CONFIG_INVALID: i32 = 4;

pub async fn run(cli: Cli) -> i32 {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "configuration invalid");
            return EXIT_CONFIG_INVALID;
        }
    };

    match cli.command {
        Command::Start => run_start(&config).await,
        Command::PauseAccount { id } => run_pause_account(&config, &id).await,
        Command::KillAll => run_kill_all(&config).await,
        Command::SnapshotLedger => run_snapshot_ledger(&config).await,
        Command::ReplayToSeq { seq } => run_replay_to_seq(&config, seq).await,
    }
}

async fn run_start(config: &Config) -> i32 {
    let app = match Application::build(config).await {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "failed to start application");
            return EXIT_BROKER_UNREACHABLE;
        }
    };

    info!(accounts = app.accounts.command_senders.len(), "alluse started");
    tokio::signal::ctrl_c().await.ok();
    info!("shutdown signal received");
    EXIT_OK
}

async fn run_pause_account(config: &Config, id: &str) -> i32 {
    let target = match id.parse::<uuid::Uuid>() {
        Ok(uuid) => AccountId(uuid),
        Err(_) => {
            error!(%id, "not a valid account id");
            return EXIT_CONFIG_INVALID;
        }
    };

    let app = match Application::build(config).await {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "failed to start application");
            return EXIT_BROKER_UNREACHABLE;
        }
    };

    match app.accounts.command_senders.iter().find(|(account_id, _)| *account_id == target) {
        Some((_, tx)) => {
            if tx.send(AccountCommand::Pause).await.is_err() {
                warn!(%target, "account worker already gone");
            }
            info!(%target, "pause command delivered");
            EXIT_OK
        }
        None => {
            error!(%target, "no such account");
            EXIT_CONFIG_INVALID
        }
    }
}

async fn run_kill_all(config: &Config) -> i32 {
    let app = match Application::build(config).await {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "failed to start application");
            return EXIT_BROKER_UNREACHABLE;
        }
    };

    app.broadcast(|| AccountCommand::ForceSafeMode("operator kill-all".to_string())).await;
    info!("kill-all delivered to every account");
    EXIT_OK
}

async fn run_snapshot_ledger(config: &Config) -> i32 {
    let ledger = match crate::infrastructure::ledger::SqliteLedgerStore::connect(&config.database_url).await {
        Ok(ledger) => ledger,
        Err(e) => {
            error!(error = %e, "failed to open ledger");
            return EXIT_LEDGER_INTEGRITY;
        }
    };

    let entries = match ledger.read_since(1).await {
        Ok(entries) => entries,
        Err(e) => {
            error!(error = %e, "failed to read ledger");
            return EXIT_LEDGER_INTEGRITY;
        }
    };

    let head_seq = entries.last().map(|e| e.seq).unwrap_or(0);
    let hash = match ledger.snapshot_hash().await {
        Ok(hash) => hash,
        Err(e) => {
            error!(error = %e, "failed to read ledger hash");
            return EXIT_LEDGER_INTEGRITY;
        }
    };

    println!("seq_head={head_seq} record_count={} hash={}", entries.len(), hex::encode(hash));
    EXIT_OK
}

async fn run_replay_to_seq(config: &Config, seq: u64) -> i32 {
    let ledger = match crate::infrastructure::ledger::SqliteLedgerStore::connect(&config.database_url).await {
        Ok(ledger) => ledger,
        Err(e) => {
            error!(error = %e, "failed to open ledger");
            return EXIT_LEDGER_INTEGRITY;
        }
    };

    let entries = match ledger.read_since(1).await {
        Ok(entries) => entries,
        Err(e) => {
            error!(error = %e, "failed to read ledger");
            return EXIT_LEDGER_INTEGRITY;
        }
    };

    let bounded: Vec<_> = entries.into_iter().take_while(|e| e.seq <= seq).collect();
    match verify_chain(&bounded) {
        Ok(()) => {
            println!("replayed {} entries up to seq {seq}; hash chain intact", bounded.len());
            EXIT_OK
        }
        Err((broken_seq, expected, found)) => {
            error!(broken_seq, expected = %hex::encode(expected), found = %hex::encode(found), "hash chain broken during replay");
            EXIT_LEDGER_INTEGRITY
        }
    }
}
