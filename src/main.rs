//! ALL-USE headless engine — no UI, no HTTP server. Metrics are pushed as
//! structured JSON log lines; operator control goes through the CLI
//! subcommands (spec.md §6 "Operational surface").

use alluse_core::infrastructure::observability::init_tracing;
use alluse_core::interfaces::cli::{self, Cli};
use clap::Parser;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let exit_code = cli::run(cli).await;
    std::process::exit(exit_code);
}
