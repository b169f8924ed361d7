//! Push-based observability: structured logs only, no inbound HTTP server
//! or scrape endpoint (spec.md's Non-goals exclude a metrics dashboard,
//! but the ambient stack still gets structured logging and a periodic
//! snapshot, the way the teacher wires `tracing_subscriber` + a JSON
//! reporter).

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::prelude::*;

use crate::domain::ports::LedgerStore;

/// Installs the global `tracing` subscriber: pretty stdout output, level
/// driven by `RUST_LOG`/`ALLUSE_LOG` and defaulting to `info`.
pub fn init_tracing() {
    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter = tracing_subscriber::EnvFilter::try_from_env("ALLUSE_LOG")
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(Level::INFO.to_string()));

    tracing_subscriber::registry().with(filter).with(stdout_layer).init();
}

#[derive(Serialize)]
struct LedgerSnapshot {
    timestamp: String,
    uptime_seconds: u64,
    version: &'static str,
    ledger_seq_head: u64,
    ledger_hash: String,
}

/// Periodically emits a ledger snapshot as a `METRICS_JSON:`-prefixed log
/// line, so log aggregators can scrape progress without a scrape
/// endpoint (spec.md §4.2's durability guarantee makes `snapshot_hash`
/// cheap to poll).
pub struct LedgerReporter<L> {
    ledger: Arc<L>,
    start_time: Instant,
    interval: Duration,
}

impl<L: LedgerStore> LedgerReporter<L> {
    pub fn new(ledger: Arc<L>, interval_seconds: u64) -> Self {
        Self {
            ledger,
            start_time: Instant::now(),
            interval: Duration::from_secs(interval_seconds),
        }
    }

    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "ledger reporter starting");
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            let head = self.ledger.read_since(0).await.map(|entries| entries.len() as u64).unwrap_or(0);
            let hash = self.ledger.snapshot_hash().await.map(hex::encode).unwrap_or_default();

            let snapshot = LedgerSnapshot {
                timestamp: chrono::Utc::now().to_rfc3339(),
                uptime_seconds: self.start_time.elapsed().as_secs(),
                version: env!("CARGO_PKG_VERSION"),
                ledger_seq_head: head,
                ledger_hash: hash,
            };

            if let Ok(json) = serde_json::to_string(&snapshot) {
                println!("METRICS_JSON:{json}");
            }
        }
    }
}
