//! Position entity (spec.md §3 "Position").

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::account::AccountId;
use crate::domain::protocol::ProtocolLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionId(pub uuid::Uuid);

impl PositionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for PositionId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionKind {
    Csp,
    Cc,
    LongShares,
    LeapCall,
    LeapPut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Open,
    RollPending,
    Closed,
    Assigned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub account_id: AccountId,
    pub symbol: String,
    pub kind: PositionKind,
    pub strike: Decimal,
    pub expiry: chrono::NaiveDate,
    /// Positive = long, negative = short.
    pub quantity: i64,
    pub opening_credit_debit: Decimal,
    pub current_mark: Decimal,
    /// Delta expressed as a positive magnitude in the sleeve's configured
    /// band, regardless of the position being a put or a call
    /// (spec.md §3 Position invariants).
    pub delta_at_last_refresh: f64,
    pub entry_protocol_level: ProtocolLevel,
    pub current_protocol_level: ProtocolLevel,
    pub status: PositionStatus,
    pub opened_at: chrono::DateTime<chrono::Utc>,
}

impl Position {
    /// CSP collateral reservation: strike * 100 * |qty|.
    pub fn csp_collateral(&self) -> Decimal {
        debug_assert_eq!(self.kind, PositionKind::Csp);
        self.strike * Decimal::from(100) * Decimal::from(self.quantity.unsigned_abs())
    }

    pub fn is_short_option(&self) -> bool {
        matches!(self.kind, PositionKind::Csp | PositionKind::Cc) && self.quantity < 0
    }

    pub fn dte(&self, today: chrono::NaiveDate) -> i64 {
        (self.expiry - today).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_csp() -> Position {
        Position {
            id: PositionId::new(),
            account_id: AccountId::new(),
            symbol: "AAPL".to_string(),
            kind: PositionKind::Csp,
            strike: dec!(178),
            expiry: chrono::NaiveDate::from_ymd_opt(2026, 7, 31).unwrap(),
            quantity: -5,
            opening_credit_debit: dec!(0.80),
            current_mark: dec!(0.80),
            delta_at_last_refresh: 0.42,
            entry_protocol_level: ProtocolLevel::L0,
            current_protocol_level: ProtocolLevel::L0,
            status: PositionStatus::Open,
            opened_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn csp_collateral_is_strike_times_100_times_qty() {
        let pos = sample_csp();
        assert_eq!(pos.csp_collateral(), dec!(89000));
    }

    #[test]
    fn dte_computes_days_to_expiry() {
        let pos = sample_csp();
        let today = chrono::NaiveDate::from_ymd_opt(2026, 7, 30).unwrap();
        assert_eq!(pos.dte(today), 1);
    }
}
