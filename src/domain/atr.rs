//! ATR Service domain types (component C4, spec.md §4.4).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::protocol::ProtocolThresholds;

/// A daily-frozen ATR(5) reading for one symbol, computed at 09:30 local
/// market time and held fixed intraday.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtrReading {
    pub symbol: String,
    pub value: Decimal,
    pub computed_at: chrono::DateTime<chrono::Utc>,
    pub source: AtrSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AtrSource {
    Computed,
    /// Fallback (a): last valid ATR x 1.1.
    StaleCarryForward,
    /// Fallback (b): 2% of current spot.
    SpotPercentage,
}

/// Resolves the three-rung fallback ladder spec.md §4.4 mandates when a
/// fresh ATR(5) cannot be computed: (a) scale the last valid reading, (b)
/// fall back to a spot-based proxy, (c) give up and mark the symbol
/// unusable. Returns `None` only when
/// every rung is exhausted (symbol becomes unusable for the day).
pub fn resolve_atr_for(
    symbol: &str,
    fresh: Option<Decimal>,
    last_valid: Option<Decimal>,
    current_spot: Option<Decimal>,
    now: chrono::DateTime<chrono::Utc>,
) -> Option<AtrReading> {
    if let Some(value) = fresh {
        return Some(AtrReading {
            symbol: symbol.to_string(),
            value,
            computed_at: now,
            source: AtrSource::Computed,
        });
    }
    if let Some(last) = last_valid {
        return Some(AtrReading {
            symbol: symbol.to_string(),
            value: last * Decimal::new(11, 1),
            computed_at: now,
            source: AtrSource::StaleCarryForward,
        });
    }
    if let Some(spot) = current_spot {
        return Some(AtrReading {
            symbol: symbol.to_string(),
            value: spot * Decimal::new(2, 2),
            computed_at: now,
            source: AtrSource::SpotPercentage,
        });
    }
    None
}

impl AtrReading {
    pub fn csp_thresholds(&self, strike: Decimal) -> ProtocolThresholds {
        ProtocolThresholds::for_csp(strike, self.value)
    }

    pub fn cc_thresholds(&self, strike: Decimal) -> ProtocolThresholds {
        ProtocolThresholds::for_cc(strike, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn now() -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::parse_from_rfc3339("2026-07-23T13:30:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc)
    }

    #[test]
    fn prefers_fresh_computation() {
        let r = resolve_atr_for("AAPL", Some(dec!(3.2)), Some(dec!(3.0)), Some(dec!(180)), now()).unwrap();
        assert_eq!(r.source, AtrSource::Computed);
        assert_eq!(r.value, dec!(3.2));
    }

    #[test]
    fn falls_back_to_stale_carry_forward() {
        let r = resolve_atr_for("AAPL", None, Some(dec!(3.0)), Some(dec!(180)), now()).unwrap();
        assert_eq!(r.source, AtrSource::StaleCarryForward);
        assert_eq!(r.value, dec!(3.30));
    }

    #[test]
    fn falls_back_to_spot_percentage() {
        let r = resolve_atr_for("AAPL", None, None, Some(dec!(180)), now()).unwrap();
        assert_eq!(r.source, AtrSource::SpotPercentage);
        assert_eq!(r.value, dec!(3.60));
    }

    #[test]
    fn symbol_unusable_when_every_rung_exhausted() {
        assert!(resolve_atr_for("AAPL", None, None, None, now()).is_none());
    }
}
