//! External collaborators the core depends on only through traits
//! (spec.md §4.2 Audit Ledger, §4.3 Market Snapshot Cache, §4.7 Order
//! Lifecycle Manager). Mock implementations live in
//! `infrastructure::mock`; production adapters would live alongside them.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::errors::{LedgerError, OrderLifecycleError};
use crate::domain::ledger::{LedgerEntry, LedgerRecord};
use crate::domain::market::{OptionChain, Quote};
use crate::domain::order::{ClientOrderId, OrderStatus};

/// Component C2: the append-only chained ledger. Writes are atomically
/// durable before the originating operation is considered committed
/// (spec.md §4.2).
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn append(&self, record: LedgerRecord) -> Result<u64, LedgerError>;
    async fn read_since(&self, seq: u64) -> Result<Vec<LedgerEntry>, LedgerError>;
    async fn snapshot_hash(&self) -> Result<[u8; 32], LedgerError>;
}

/// Component C3: last quote and option chain per symbol, with staleness
/// tracking owned by the `Quote`/`OptionChain` types themselves
/// (spec.md §4.3).
#[async_trait]
pub trait MarketDataService: Send + Sync {
    async fn quote(&self, symbol: &str) -> Option<Quote>;
    async fn option_chain(&self, symbol: &str) -> Option<OptionChain>;
    async fn vix(&self) -> Option<f64>;
    /// Raw ATR(5) computed from the last five sessions, if the feed has
    /// enough history; `None` drives the Protocol Engine's fallback
    /// ladder (spec.md §4.4).
    async fn atr5(&self, symbol: &str) -> Option<Decimal>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderAck {
    pub accepted: bool,
}

/// Component C7's broker-facing half: submission, status polling, and
/// cancel-replace. The Order Lifecycle Manager in `application` owns the
/// timeout/versioning policy; this trait is the thin wire boundary
/// (spec.md §4.7).
#[async_trait]
pub trait BrokerService: Send + Sync {
    async fn submit(&self, client_order_id: &ClientOrderId, limit_price: Decimal, quantity: i64) -> Result<OrderAck, OrderLifecycleError>;
    async fn cancel(&self, client_order_id: &ClientOrderId) -> Result<(), OrderLifecycleError>;
    async fn status(&self, client_order_id: &ClientOrderId) -> Option<OrderStatus>;
    /// Every order the broker currently has live, for reconciliation on
    /// reconnect (spec.md §4.7, §4.11 resume contract).
    async fn open_orders(&self) -> Vec<ClientOrderId>;
}
