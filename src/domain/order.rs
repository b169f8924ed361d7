//! Order entity and client order id scheme (spec.md §3 "Order").

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::account::AccountId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderIntent {
    OpenCsp,
    OpenCc,
    CloseCsp,
    CloseCc,
    RollCsp,
    RollCc,
    OpenLeap,
    RollLeap,
    CloseLeap,
}

impl fmt::Display for OrderIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderIntent::OpenCsp => "OpenCSP",
            OrderIntent::OpenCc => "OpenCC",
            OrderIntent::CloseCsp => "CloseCSP",
            OrderIntent::CloseCc => "CloseCC",
            OrderIntent::RollCsp => "RollCSP",
            OrderIntent::RollCc => "RollCC",
            OrderIntent::OpenLeap => "OpenLEAP",
            OrderIntent::RollLeap => "RollLEAP",
            OrderIntent::CloseLeap => "CloseLEAP",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Working,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected)
    }
}

/// Client-assigned order id: `<account>:<intent>:<symbol>:<expiry>:<strike>:<version>`
/// (spec.md §3 "Order"). Version numbers strictly increase per cancel-replace
/// chain, guaranteeing the broker never sees two live orders with the same
/// base id (spec.md §5 ordering guarantee iii).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientOrderId {
    pub account_id: AccountId,
    pub intent: OrderIntent,
    pub symbol: String,
    pub expiry: chrono::NaiveDate,
    pub strike: Decimal,
    pub version: u32,
}

impl ClientOrderId {
    pub fn base(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            self.account_id, self.intent, self.symbol, self.expiry, self.strike
        )
    }

    pub fn next_version(&self) -> Self {
        Self {
            version: self.version + 1,
            ..self.clone()
        }
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.base(), self.version)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub client_order_id: ClientOrderId,
    pub limit_price: Decimal,
    pub reference_mid_at_submission: Decimal,
    pub quantity: i64,
    pub broker_order_id: Option<String>,
    pub status: OrderStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_updated_at: chrono::DateTime<chrono::Utc>,
    pub parent_order_id: Option<String>,
}

impl Order {
    pub fn new_root(client_order_id: ClientOrderId, limit_price: Decimal, reference_mid: Decimal, quantity: i64) -> Self {
        let now = chrono::Utc::now();
        Self {
            client_order_id,
            limit_price,
            reference_mid_at_submission: reference_mid,
            quantity,
            broker_order_id: None,
            status: OrderStatus::Pending,
            created_at: now,
            last_updated_at: now,
            parent_order_id: None,
        }
    }

    pub fn cancel_replace(&self, new_limit: Decimal) -> Self {
        let now = chrono::Utc::now();
        Self {
            client_order_id: self.client_order_id.next_version(),
            limit_price: new_limit,
            reference_mid_at_submission: self.reference_mid_at_submission,
            quantity: self.quantity,
            broker_order_id: None,
            status: OrderStatus::Pending,
            created_at: now,
            last_updated_at: now,
            parent_order_id: Some(self.client_order_id.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_id() -> ClientOrderId {
        ClientOrderId {
            account_id: AccountId::new(),
            intent: OrderIntent::OpenCsp,
            symbol: "AAPL".to_string(),
            expiry: chrono::NaiveDate::from_ymd_opt(2026, 7, 31).unwrap(),
            strike: dec!(178),
            version: 1,
        }
    }

    #[test]
    fn next_version_increments_and_preserves_base() {
        let id = sample_id();
        let next = id.next_version();
        assert_eq!(next.version, 2);
        assert_eq!(id.base(), next.base());
    }

    #[test]
    fn cancel_replace_bumps_version_and_links_parent() {
        let id = sample_id();
        let order = Order::new_root(id.clone(), dec!(0.80), dec!(0.80), 5);
        let replaced = order.cancel_replace(dec!(0.75));
        assert_eq!(replaced.client_order_id.version, 2);
        assert_eq!(replaced.parent_order_id, Some(id.to_string()));
        assert_eq!(replaced.status, OrderStatus::Pending);
    }

    #[test]
    fn terminal_status_classification() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(!OrderStatus::Working.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::PartiallyFilled.is_terminal());
    }
}
