//! Market Snapshot Cache domain types (component C3, spec.md §4.3).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const STALENESS_THRESHOLD_SECS: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub bid: Decimal,
    pub ask: Decimal,
    pub last: Decimal,
    pub as_of: chrono::DateTime<chrono::Utc>,
}

impl Quote {
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::from(2)
    }

    pub fn spread_pct(&self) -> Decimal {
        let mid = self.mid();
        if mid.is_zero() {
            return Decimal::ZERO;
        }
        (self.ask - self.bid) / mid
    }

    pub fn age(&self, now: chrono::DateTime<chrono::Utc>) -> chrono::Duration {
        now - self.as_of
    }

    /// spec.md §4.3: staleness >30s marks an entry unusable for new entries.
    pub fn is_stale(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.age(now).num_seconds() > STALENESS_THRESHOLD_SECS
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionContractQuote {
    pub symbol: String,
    pub expiry: chrono::NaiveDate,
    pub strike: Decimal,
    pub is_call: bool,
    pub bid: Decimal,
    pub ask: Decimal,
    pub delta: f64,
    pub open_interest: i64,
    pub daily_volume: i64,
    pub avg_daily_volume_20d: i64,
    pub as_of: chrono::DateTime<chrono::Utc>,
}

impl OptionContractQuote {
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::from(2)
    }

    pub fn spread_pct(&self) -> Decimal {
        let mid = self.mid();
        if mid.is_zero() {
            return Decimal::ZERO;
        }
        (self.ask - self.bid) / mid
    }

    pub fn is_stale(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        (now - self.as_of).num_seconds() > STALENESS_THRESHOLD_SECS
    }
}

/// One symbol's option chain as of a snapshot tick. An empty chain means
/// the upstream feed returned nothing for this symbol this cycle; callers
/// must skip candidate entry for the symbol rather than treat it as zero
/// liquidity (spec.md §4.3 "missing option chain").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionChain {
    pub symbol: String,
    pub contracts: Vec<OptionContractQuote>,
}

impl OptionChain {
    pub fn contract(&self, expiry: chrono::NaiveDate, strike: Decimal, is_call: bool) -> Option<&OptionContractQuote> {
        self.contracts
            .iter()
            .find(|c| c.expiry == expiry && c.strike == strike && c.is_call == is_call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote_at(seconds_ago: i64) -> Quote {
        let now = chrono::Utc::now();
        Quote {
            symbol: "AAPL".to_string(),
            bid: dec!(179.95),
            ask: dec!(180.05),
            last: dec!(180.00),
            as_of: now - chrono::Duration::seconds(seconds_ago),
        }
    }

    #[test]
    fn mid_is_bid_ask_average() {
        let q = quote_at(0);
        assert_eq!(q.mid(), dec!(180.00));
    }

    #[test]
    fn staleness_threshold_is_thirty_seconds() {
        let fresh = quote_at(10);
        let stale = quote_at(45);
        let now = chrono::Utc::now();
        assert!(!fresh.is_stale(now));
        assert!(stale.is_stale(now));
    }

    #[test]
    fn missing_contract_in_chain_returns_none() {
        let chain = OptionChain {
            symbol: "AAPL".to_string(),
            contracts: vec![],
        };
        assert!(chain
            .contract(chrono::NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(), dec!(180), false)
            .is_none());
    }
}
