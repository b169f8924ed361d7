//! Runtime configuration, loaded from the environment (spec.md §6
//! "Configuration surface", following the teacher's `Config::from_env`
//! convention).

use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::errors::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// All ports backed by in-memory mocks; no external broker or feed.
    Paper,
    /// Real adapters; not implemented by this crate, reserved for a
    /// future broker integration.
    Live,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "paper" => Ok(Mode::Paper),
            "live" => Ok(Mode::Live),
            other => anyhow::bail!("invalid ALLUSE_MODE '{other}', expected 'paper' or 'live'"),
        }
    }
}

/// `sleeve_split.gen/rev/com` (spec.md §6 config table).
#[derive(Debug, Clone, Copy)]
pub struct SleeveSplit {
    pub generator: Decimal,
    pub revenue: Decimal,
    pub compounder: Decimal,
}

/// `monitor_interval.l0/l1/l2/l3`, seconds per protocol level.
#[derive(Debug, Clone, Copy)]
pub struct MonitorIntervalSeconds {
    pub l0: u64,
    pub l1: u64,
    pub l2: u64,
    pub l3: u64,
}

/// `vix_thresholds.hedge/safe/kill`.
#[derive(Debug, Clone, Copy)]
pub struct VixThresholdConfig {
    pub hedge: f64,
    pub safe: f64,
    pub kill: f64,
}

/// `fork_thresholds.gen/rev`.
#[derive(Debug, Clone, Copy)]
pub struct ForkThresholdConfig {
    pub generator: Decimal,
    pub revenue: Decimal,
}

/// `reinvest.tax_reserve/contracts/leaps`.
#[derive(Debug, Clone, Copy)]
pub struct ReinvestSplit {
    pub tax_reserve: Decimal,
    pub contracts: Decimal,
    pub leaps: Decimal,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub database_url: String,
    pub opening_capital: Decimal,
    pub sleeve_split: SleeveSplit,
    pub capital_deployment_pct: Decimal,
    pub per_symbol_exposure_cap: Decimal,
    pub slippage_cap_pct: Decimal,
    pub ack_timeout_seconds: u64,
    pub monitor_interval: MonitorIntervalSeconds,
    pub atr_period: u32,
    pub vix_thresholds: VixThresholdConfig,
    pub fork_thresholds: ForkThresholdConfig,
    pub reinvest: ReinvestSplit,
    pub observability_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mode_str = env::var("ALLUSE_MODE").unwrap_or_else(|_| "paper".to_string());
        let mode = Mode::from_str(&mode_str)?;

        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://alluse.db".to_string());

        let opening_capital = parse_env_decimal("ALLUSE_OPENING_CAPITAL", dec!(300000))?;

        let sleeve_split = SleeveSplit {
            generator: parse_env_decimal("ALLUSE_SLEEVE_SPLIT_GEN", dec!(0.40))?,
            revenue: parse_env_decimal("ALLUSE_SLEEVE_SPLIT_REV", dec!(0.30))?,
            compounder: parse_env_decimal("ALLUSE_SLEEVE_SPLIT_COM", dec!(0.30))?,
        };

        let capital_deployment_pct = parse_env_decimal("ALLUSE_CAPITAL_DEPLOYMENT_PCT", dec!(1.00))?;
        let per_symbol_exposure_cap = parse_env_decimal("ALLUSE_PER_SYMBOL_EXPOSURE_CAP", dec!(0.25))?;
        let slippage_cap_pct = parse_env_decimal("ALLUSE_SLIPPAGE_CAP_PCT", dec!(0.05))?;

        let ack_timeout_seconds = parse_env_u64("ALLUSE_ACK_TIMEOUT_SECONDS", 3)?;

        let monitor_interval = MonitorIntervalSeconds {
            l0: parse_env_u64("ALLUSE_MONITOR_INTERVAL_L0", 300)?,
            l1: parse_env_u64("ALLUSE_MONITOR_INTERVAL_L1", 60)?,
            l2: parse_env_u64("ALLUSE_MONITOR_INTERVAL_L2", 30)?,
            l3: parse_env_u64("ALLUSE_MONITOR_INTERVAL_L3", 1)?,
        };

        let atr_period = parse_env_u64("ALLUSE_ATR_PERIOD", 5)? as u32;

        let vix_thresholds = VixThresholdConfig {
            hedge: parse_env_f64("ALLUSE_VIX_THRESHOLD_HEDGE", 50.0)?,
            safe: parse_env_f64("ALLUSE_VIX_THRESHOLD_SAFE", 65.0)?,
            kill: parse_env_f64("ALLUSE_VIX_THRESHOLD_KILL", 80.0)?,
        };

        let fork_thresholds = ForkThresholdConfig {
            generator: parse_env_decimal("ALLUSE_FORK_THRESHOLD_GEN", dec!(100000))?,
            revenue: parse_env_decimal("ALLUSE_FORK_THRESHOLD_REV", dec!(500000))?,
        };

        let reinvest = ReinvestSplit {
            tax_reserve: parse_env_decimal("ALLUSE_REINVEST_TAX_RESERVE", dec!(0.30))?,
            contracts: parse_env_decimal("ALLUSE_REINVEST_CONTRACTS", dec!(0.525))?,
            leaps: parse_env_decimal("ALLUSE_REINVEST_LEAPS", dec!(0.175))?,
        };

        let observability_interval_secs = parse_env_u64("ALLUSE_OBSERVABILITY_INTERVAL_SECS", 60)?;

        let config = Self {
            mode,
            database_url,
            opening_capital,
            sleeve_split,
            capital_deployment_pct,
            per_symbol_exposure_cap,
            slippage_cap_pct,
            ack_timeout_seconds,
            monitor_interval,
            atr_period,
            vix_thresholds,
            fork_thresholds,
            reinvest,
            observability_interval_secs,
        };
        config.validate().map_err(anyhow::Error::from)?;
        Ok(config)
    }

    /// spec.md §7 "Configuration invalid: refuse to start; exit code 4."
    pub fn validate(&self) -> Result<(), ConfigError> {
        let split_sum = self.sleeve_split.generator + self.sleeve_split.revenue + self.sleeve_split.compounder;
        if (split_sum - Decimal::ONE).abs() > dec!(0.0001) {
            return Err(ConfigError::Invalid(format!("sleeve_split fractions must sum to 1.0, got {split_sum}")));
        }

        if !(dec!(0.95)..=dec!(1.00)).contains(&self.capital_deployment_pct) {
            return Err(ConfigError::Invalid(format!(
                "capital_deployment_pct must lie in [0.95, 1.00], got {}",
                self.capital_deployment_pct
            )));
        }

        let reinvest_sum = self.reinvest.tax_reserve + self.reinvest.contracts + self.reinvest.leaps;
        if (reinvest_sum - Decimal::ONE).abs() > dec!(0.0001) {
            return Err(ConfigError::Invalid(format!("reinvest splits must sum to 1.0, got {reinvest_sum}")));
        }

        if self.vix_thresholds.hedge >= self.vix_thresholds.safe || self.vix_thresholds.safe >= self.vix_thresholds.kill {
            return Err(ConfigError::Invalid("vix_thresholds must satisfy hedge < safe < kill".to_string()));
        }

        Ok(())
    }
}

fn parse_env_decimal(key: &str, default: Decimal) -> Result<Decimal> {
    match env::var(key) {
        Ok(raw) => raw.parse::<Decimal>().with_context(|| format!("{key} must be a decimal amount")),
        Err(_) => Ok(default),
    }
}

fn parse_env_u64(key: &str, default: u64) -> Result<u64> {
    match env::var(key) {
        Ok(raw) => raw.parse::<u64>().with_context(|| format!("{key} must be an integer")),
        Err(_) => Ok(default),
    }
}

fn parse_env_f64(key: &str, default: f64) -> Result<f64> {
    match env::var(key) {
        Ok(raw) => raw.parse::<f64>().with_context(|| format!("{key} must be a number")),
        Err(_) => Ok(default),
    }
}
