//! Order Lifecycle Manager (component C7, spec.md §4.7).
//!
//! Owns client order id assignment, submission, the 3-second
//! acknowledgement timeout, cancel-replace, and duplicate detection.
//! Broker-facing I/O goes through `domain::ports::BrokerService`;
//! everything decided here is append-logged via `LedgerStore` before the
//! caller may treat it as committed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::domain::errors::OrderLifecycleError;
use crate::domain::ledger::LedgerRecord;
use crate::domain::order::{ClientOrderId, Order, OrderStatus};
use crate::domain::ports::{BrokerService, LedgerStore};

pub const ACK_TIMEOUT: Duration = Duration::from_secs(3);

/// In-memory tracking table, rebuilt by ledger replay at startup
/// (spec.md §4.6 "Position & Account Store" applies equally to orders:
/// this is a derived view, not the source of truth).
pub struct OrderLifecycleManager<B, L> {
    broker: Arc<B>,
    ledger: Arc<L>,
    working: HashMap<String, Order>,
}

impl<B, L> OrderLifecycleManager<B, L>
where
    B: BrokerService,
    L: LedgerStore,
{
    pub fn new(broker: Arc<B>, ledger: Arc<L>) -> Self {
        Self {
            broker,
            ledger,
            working: HashMap::new(),
        }
    }

    /// Rejects outright if the exact id+version is already tracked
    /// (spec.md §4.7 "detect duplicate submissions").
    pub async fn submit(&mut self, client_order_id: ClientOrderId, limit_price: Decimal, quantity: i64) -> Result<(), OrderLifecycleError> {
        let key = client_order_id.to_string();
        if self.working.contains_key(&key) {
            return Err(OrderLifecycleError::DuplicateSubmission {
                client_order_id: key,
                version: client_order_id.version,
            });
        }

        let order = Order::new_root(client_order_id.clone(), limit_price, limit_price, quantity);
        self.ledger
            .append(LedgerRecord::OrderSubmitted {
                client_order_id: client_order_id.clone(),
                limit_price,
            })
            .await
            .map_err(|_| OrderLifecycleError::BrokerRejected {
                client_order_id: key.clone(),
                reason: "ledger append failed before submission".to_string(),
            })?;

        let ack = tokio::time::timeout(ACK_TIMEOUT, self.broker.submit(&client_order_id, limit_price, quantity)).await;
        match ack {
            Ok(Ok(ack)) if ack.accepted => {
                let mut working = order;
                working.status = OrderStatus::Working;
                self.working.insert(key, working);
                Ok(())
            }
            Ok(Ok(_)) => Err(OrderLifecycleError::BrokerRejected {
                client_order_id: key,
                reason: "broker declined order".to_string(),
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!(client_order_id = %key, "acknowledgement timed out, cancelling");
                Err(OrderLifecycleError::AckTimeout(key))
            }
        }
    }

    /// Cancel-replace: bumps the version suffix and resubmits at a new
    /// limit price (spec.md §4.5.3 slippage discipline's retry path, and
    /// §4.7's timeout path).
    pub async fn cancel_replace(&mut self, prior: &ClientOrderId, new_limit: Decimal) -> Result<(), OrderLifecycleError> {
        let prior_key = prior.to_string();
        let quantity = self
            .working
            .get(&prior_key)
            .map(|o| o.quantity)
            .ok_or_else(|| OrderLifecycleError::NotFound(prior_key.clone()))?;

        let _ = self.broker.cancel(prior).await;
        self.working.remove(&prior_key);
        self.ledger
            .append(LedgerRecord::OrderCancelled {
                client_order_id: prior.clone(),
                reason: "cancel-replace".to_string(),
            })
            .await
            .ok();

        let next = prior.next_version();
        self.submit(next, new_limit, quantity).await
    }

    /// Accepts a fill only if the realised price satisfies the slippage
    /// discipline: <= mid*1.05 for debits, >= mid*0.95 for credits
    /// (spec.md §4.5.3). Otherwise the order is cancelled rather than
    /// accepted at a bad price.
    pub async fn apply_fill(&mut self, client_order_id: &ClientOrderId, fill_price: Decimal, quantity: i64, reference_mid: Decimal, is_debit: bool) -> Result<(), OrderLifecycleError> {
        let key = client_order_id.to_string();
        if let Some(existing) = self.working.get(&key) {
            if existing.status.is_terminal() {
                return Err(OrderLifecycleError::AlreadyTerminal(key));
            }
        }
        let acceptable = if is_debit {
            fill_price <= reference_mid * Decimal::new(105, 2)
        } else {
            fill_price >= reference_mid * Decimal::new(95, 2)
        };
        if !acceptable {
            self.broker.cancel(client_order_id).await.ok();
            self.working.remove(&key);
            return Err(OrderLifecycleError::SlippageExceeded {
                reason: format!("fill {fill_price} outside 5% band of mid {reference_mid}"),
            });
        }

        self.ledger
            .append(LedgerRecord::OrderFilled {
                client_order_id: client_order_id.clone(),
                fill_price,
                quantity,
            })
            .await
            .map_err(|_| OrderLifecycleError::NotFound(key.clone()))?;

        if let Some(order) = self.working.get_mut(&key) {
            order.status = OrderStatus::Filled;
            order.last_updated_at = chrono::Utc::now();
        }
        info!(client_order_id = %key, %fill_price, "order filled");
        Ok(())
    }

    /// spec.md §4.7: on broker disconnect outstanding orders move to
    /// Unknown; on reconnect, reconcile by client id. Orphans (present at
    /// broker, absent locally — the case after a restart finds an order
    /// that was working at the moment of a prior crash) are adopted into
    /// `working` so they remain subject to the same terminal-event
    /// guard as any other tracked order; stale locals (absent at broker)
    /// are marked Rejected.
    pub async fn reconcile(&mut self) -> (Vec<String>, Vec<String>) {
        let broker_open: HashMap<String, ClientOrderId> = self.broker.open_orders().await.into_iter().map(|id| (id.to_string(), id)).collect();
        let local_open: std::collections::HashSet<String> = self.working.keys().cloned().collect();
        let broker_keys: std::collections::HashSet<String> = broker_open.keys().cloned().collect();

        let orphans: Vec<String> = broker_keys.difference(&local_open).cloned().collect();
        let ghosts: Vec<String> = local_open.difference(&broker_keys).cloned().collect();

        for ghost in &ghosts {
            if let Some(order) = self.working.get_mut(ghost) {
                order.status = OrderStatus::Rejected;
            }
        }
        for orphan in &orphans {
            if let Some(client_order_id) = broker_open.get(orphan) {
                let mut order = Order::new_root(client_order_id.clone(), Decimal::ZERO, Decimal::ZERO, 0);
                order.status = OrderStatus::Working;
                self.working.insert(orphan.clone(), order);
            }
        }
        (orphans, ghosts)
    }

    pub fn is_terminal(&self, client_order_id: &ClientOrderId) -> bool {
        self.working
            .get(&client_order_id.to_string())
            .map(|o| o.status.is_terminal())
            .unwrap_or(true)
    }

    pub fn working_count(&self) -> usize {
        self.working.values().filter(|o| !o.status.is_terminal()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::AccountId;
    use crate::domain::order::OrderIntent;
    use crate::domain::ports::{OrderAck};
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    struct MockBroker {
        accept: bool,
        open: Mutex<Vec<ClientOrderId>>,
    }

    #[async_trait::async_trait]
    impl BrokerService for MockBroker {
        async fn submit(&self, client_order_id: &ClientOrderId, _limit_price: Decimal, _quantity: i64) -> Result<OrderAck, OrderLifecycleError> {
            if self.accept {
                self.open.lock().unwrap().push(client_order_id.clone());
            }
            Ok(OrderAck { accepted: self.accept })
        }
        async fn cancel(&self, client_order_id: &ClientOrderId) -> Result<(), OrderLifecycleError> {
            self.open.lock().unwrap().retain(|id| id != client_order_id);
            Ok(())
        }
        async fn status(&self, _client_order_id: &ClientOrderId) -> Option<OrderStatus> {
            None
        }
        async fn open_orders(&self) -> Vec<ClientOrderId> {
            self.open.lock().unwrap().clone()
        }
    }

    struct MockLedger;

    #[async_trait::async_trait]
    impl LedgerStore for MockLedger {
        async fn append(&self, _record: LedgerRecord) -> Result<u64, crate::domain::errors::LedgerError> {
            Ok(1)
        }
        async fn read_since(&self, _seq: u64) -> Result<Vec<crate::domain::ledger::LedgerEntry>, crate::domain::errors::LedgerError> {
            Ok(vec![])
        }
        async fn snapshot_hash(&self) -> Result<[u8; 32], crate::domain::errors::LedgerError> {
            Ok([0u8; 32])
        }
    }

    fn sample_id(version: u32) -> ClientOrderId {
        ClientOrderId {
            account_id: AccountId::new(),
            intent: OrderIntent::OpenCsp,
            symbol: "AAPL".to_string(),
            expiry: chrono::NaiveDate::from_ymd_opt(2026, 7, 31).unwrap(),
            strike: dec!(178),
            version,
        }
    }

    #[tokio::test]
    async fn submit_accepted_moves_to_working() {
        let broker = Arc::new(MockBroker { accept: true, open: Mutex::new(vec![]) });
        let ledger = Arc::new(MockLedger);
        let mut manager = OrderLifecycleManager::new(broker, ledger);
        let id = sample_id(1);
        manager.submit(id.clone(), dec!(0.80), 5).await.unwrap();
        assert!(!manager.is_terminal(&id));
    }

    #[tokio::test]
    async fn duplicate_submission_rejected_outright() {
        let broker = Arc::new(MockBroker { accept: true, open: Mutex::new(vec![]) });
        let ledger = Arc::new(MockLedger);
        let mut manager = OrderLifecycleManager::new(broker, ledger);
        let id = sample_id(1);
        manager.submit(id.clone(), dec!(0.80), 5).await.unwrap();
        let err = manager.submit(id.clone(), dec!(0.80), 5).await.unwrap_err();
        assert!(matches!(err, OrderLifecycleError::DuplicateSubmission { .. }));
    }

    #[tokio::test]
    async fn fill_outside_slippage_band_is_rejected() {
        let broker = Arc::new(MockBroker { accept: true, open: Mutex::new(vec![]) });
        let ledger = Arc::new(MockLedger);
        let mut manager = OrderLifecycleManager::new(broker, ledger);
        let id = sample_id(1);
        manager.submit(id.clone(), dec!(0.80), 5).await.unwrap();
        // Credit fill at 0.70 vs mid 0.80 is outside the 5% band (needs >= 0.76).
        let err = manager.apply_fill(&id, dec!(0.70), 5, dec!(0.80), false).await.unwrap_err();
        assert!(matches!(err, OrderLifecycleError::SlippageExceeded { .. }));
    }

    #[tokio::test]
    async fn cancel_replace_bumps_version() {
        let broker = Arc::new(MockBroker { accept: true, open: Mutex::new(vec![]) });
        let ledger = Arc::new(MockLedger);
        let mut manager = OrderLifecycleManager::new(broker, ledger);
        let id = sample_id(1);
        manager.submit(id.clone(), dec!(0.80), 5).await.unwrap();
        manager.cancel_replace(&id, dec!(0.75)).await.unwrap();
        let next = id.next_version();
        assert!(!manager.is_terminal(&next));
    }
}
