//! In-memory adapters for the four core ports, used by the headless CLI's
//! `run --paper` mode and by integration tests (spec.md §4.3/§4.7 "mock
//! adapters"). Each mirrors the shape of a production adapter without
//! touching a real broker, data feed, or calendar.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::clock::{ClockService, MarketHours};
use crate::domain::errors::OrderLifecycleError;
use crate::domain::market::{OptionChain, Quote};
use crate::domain::order::{ClientOrderId, OrderStatus};
use crate::domain::ports::{BrokerService, MarketDataService, OrderAck};
use crate::domain::sleeve::SleeveKind;

/// Always reports the market open and every calendar question answered
/// favourably — suitable for paper-trading demos, not for exercising the
/// "unknown data" abort paths (those are covered directly in
/// `domain::clock` unit tests via hand-written mocks).
pub struct MockClock;

#[async_trait]
impl ClockService for MockClock {
    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::Utc::now()
    }

    async fn is_market_open(&self) -> Option<bool> {
        Some(true)
    }

    async fn next_entry_window(&self, kind: SleeveKind) -> Option<(chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>)> {
        let _ = crate::domain::clock::entry_window_for(kind);
        let now = self.now();
        Some((now, now + chrono::Duration::minutes(75)))
    }

    async fn has_earnings(&self, _symbol: &str, _iso_week: (i32, u32)) -> Option<bool> {
        Some(false)
    }

    async fn is_safe_holiday(&self) -> Option<bool> {
        Some(false)
    }

    async fn market_hours(&self, date: chrono::NaiveDate) -> Option<MarketHours> {
        let open = date.and_hms_opt(13, 30, 0)?.and_utc();
        let close = date.and_hms_opt(20, 0, 0)?.and_utc();
        Some(MarketHours { open, close })
    }
}

/// Holds whatever quotes/chains/VIX a test or demo has pushed into it;
/// `atr5` is derived from a configurable override so Protocol Engine
/// fallback-ladder tests can force each rung.
#[derive(Default)]
pub struct MockMarketDataService {
    quotes: RwLock<HashMap<String, Quote>>,
    chains: RwLock<HashMap<String, OptionChain>>,
    atr: RwLock<HashMap<String, Decimal>>,
    vix: RwLock<Option<f64>>,
}

impl MockMarketDataService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_quote(&self, quote: Quote) {
        self.quotes.write().await.insert(quote.symbol.clone(), quote);
    }

    pub async fn set_chain(&self, chain: OptionChain) {
        self.chains.write().await.insert(chain.symbol.clone(), chain);
    }

    pub async fn set_atr(&self, symbol: &str, value: Decimal) {
        self.atr.write().await.insert(symbol.to_string(), value);
    }

    pub async fn set_vix(&self, value: f64) {
        *self.vix.write().await = Some(value);
    }
}

#[async_trait]
impl MarketDataService for MockMarketDataService {
    async fn quote(&self, symbol: &str) -> Option<Quote> {
        self.quotes.read().await.get(symbol).cloned()
    }

    async fn option_chain(&self, symbol: &str) -> Option<OptionChain> {
        self.chains.read().await.get(symbol).cloned()
    }

    async fn vix(&self) -> Option<f64> {
        *self.vix.read().await
    }

    async fn atr5(&self, symbol: &str) -> Option<Decimal> {
        self.atr.read().await.get(symbol).copied()
    }
}

/// Accepts every submission, tracks working orders in memory, and fills
/// them when the caller drives it with `fill`. There is no simulated
/// latency or rejection path here; those are exercised through
/// `application::order_lifecycle`'s own unit tests against purpose-built
/// mocks.
pub struct MockBrokerService {
    orders: Arc<RwLock<HashMap<String, OrderStatus>>>,
}

impl MockBrokerService {
    pub fn new() -> Self {
        Self {
            orders: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn fill(&self, client_order_id: &ClientOrderId) {
        self.orders.write().await.insert(client_order_id.to_string(), OrderStatus::Filled);
    }
}

impl Default for MockBrokerService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerService for MockBrokerService {
    async fn submit(&self, client_order_id: &ClientOrderId, limit_price: Decimal, quantity: i64) -> Result<OrderAck, OrderLifecycleError> {
        debug!(%client_order_id, %limit_price, quantity, "mock broker accepted order");
        self.orders.write().await.insert(client_order_id.to_string(), OrderStatus::Working);
        Ok(OrderAck { accepted: true })
    }

    async fn cancel(&self, client_order_id: &ClientOrderId) -> Result<(), OrderLifecycleError> {
        self.orders.write().await.insert(client_order_id.to_string(), OrderStatus::Cancelled);
        Ok(())
    }

    async fn status(&self, client_order_id: &ClientOrderId) -> Option<OrderStatus> {
        self.orders.read().await.get(&client_order_id.to_string()).copied()
    }

    async fn open_orders(&self) -> Vec<ClientOrderId> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn market_data_returns_what_was_set() {
        let svc = MockMarketDataService::new();
        svc.set_vix(22.5).await;
        svc.set_atr("AAPL", dec!(3.10)).await;
        assert_eq!(svc.vix().await, Some(22.5));
        assert_eq!(svc.atr5("AAPL").await, Some(dec!(3.10)));
        assert_eq!(svc.atr5("MSFT").await, None);
    }

    #[tokio::test]
    async fn broker_tracks_submission_and_fill() {
        let broker = MockBrokerService::new();
        let id = ClientOrderId {
            account_id: crate::domain::account::AccountId::new(),
            intent: crate::domain::order::OrderIntent::OpenCsp,
            symbol: "AAPL".to_string(),
            expiry: chrono::NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
            strike: dec!(178),
            version: 1,
        };
        broker.submit(&id, dec!(0.80), 5).await.unwrap();
        assert_eq!(broker.status(&id).await, Some(OrderStatus::Working));
        broker.fill(&id).await;
        assert_eq!(broker.status(&id).await, Some(OrderStatus::Filled));
    }

    #[tokio::test]
    async fn clock_reports_market_always_open() {
        let clock = MockClock;
        assert_eq!(clock.is_market_open().await, Some(true));
        assert_eq!(clock.is_safe_holiday().await, Some(false));
    }
}
