//! Error taxonomy. One `thiserror` enum per concern, following the same
//! split the domain model itself uses (account / order / ledger / rules /
//! protocol), so callers can match on the concern without a catch-all.

use thiserror::Error;

use crate::domain::account::AccountId;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("account {0} not found")]
    NotFound(AccountId),

    #[error("account {account} invariant violated: {reason}")]
    InvariantViolation { account: AccountId, reason: String },

    #[error("account {0} kind is immutable after creation")]
    KindImmutable(AccountId),

    #[error("account {0} is not active")]
    NotActive(AccountId),
}

#[derive(Debug, Error)]
pub enum OrderLifecycleError {
    #[error("duplicate order submission: {client_order_id} version {version}")]
    DuplicateSubmission { client_order_id: String, version: u32 },

    #[error("order {0} not found")]
    NotFound(String),

    #[error("order {0} already in a terminal status")]
    AlreadyTerminal(String),

    #[error("acknowledgement timeout for order {0}")]
    AckTimeout(String),

    #[error("fill price outside slippage cap: {reason}")]
    SlippageExceeded { reason: String },

    #[error("broker rejected order {client_order_id}: {reason}")]
    BrokerRejected { client_order_id: String, reason: String },
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("hash chain broken at sequence {seq}: expected {expected}, found {found}")]
    ChainBroken {
        seq: u64,
        expected: String,
        found: String,
    },

    #[error("unreadable ledger entry at sequence {0}")]
    UnreadableEntry(u64),

    #[error("ledger append did not durably persist within deadline")]
    DurabilityTimeout,

    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("outside entry window")]
    OutsideEntryWindow,
    #[error("symbol {0} not permitted for this sleeve")]
    SymbolNotPermitted(String),
    #[error("delta {delta} out of band [{lo}, {hi}]")]
    DeltaOutOfBand { delta: f64, lo: f64, hi: f64 },
    #[error("dte {dte} out of band [{lo}, {hi}]")]
    DteOutOfBand { dte: i64, lo: i64, hi: i64 },
    #[error("earnings scheduled this week for {0}")]
    EarningsThisWeek(String),
    #[error("liquidity insufficient: {0}")]
    LiquidityInsufficient(String),
    #[error("capital deployment would exceed sleeve capital")]
    CapitalExceeded,
    #[error("per-symbol exposure would exceed cap for {0}")]
    PerSymbolExposureExceeded(String),
    #[error("duplicate order for client id {0}")]
    DuplicateOrder(String),
    #[error("slippage exceeded cap: {0}")]
    SlippageExceeded(String),
    #[error("system is in SafeMode or Kill")]
    SystemSafeMode,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("no roll candidate satisfies sleeve rules")]
    NoRollCandidate,
    #[error("roll debit {debit} exceeds 50% of opening credit {credit}")]
    RollDebitExceeded { debit: rust_decimal::Decimal, credit: rust_decimal::Decimal },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
