//! TOML configuration loading and validation.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub exchange: ExchangeConfig,
    pub account: AccountConfig,
    pub execution: ExecutionConfig,
    pub cost: CostConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    pub kind: ExchangeKind,
    #[serde(default)]
    pub testnet: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    Mock,
    Binance,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub id: String,
    /// Reference currency for portfolio valuation (the "base" in
    /// spec.md's glossary sense), e.g. `"USDT"`.
    #[serde(default = "default_base_asset")]
    pub base_asset: String,
}

fn default_base_asset() -> String {
    "USDT".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Market,
    Limit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_mode")]
    pub mode: ExecutionMode,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_max_orders")]
    pub max_orders_per_run: usize,
    /// Asset that absorbs any weight mass the target spec leaves
    /// unallocated.
    #[serde(default = "default_padding_asset")]
    pub padding_asset: String,
    /// Limit executor's per-round sleep, in seconds.
    #[serde(default = "default_time_delta_secs")]
    pub time_delta_secs: u64,
    /// Limit executor's per-pair retry budget before giving up on an order.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

fn default_mode() -> ExecutionMode {
    ExecutionMode::Market
}
fn default_max_orders() -> usize {
    50
}
fn default_padding_asset() -> String {
    "BTC".into()
}
fn default_time_delta_secs() -> u64 {
    30
}
fn default_max_retries() -> usize {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct CostConfig {
    #[serde(default = "default_taker_fee")]
    pub default_taker_fee: f64,
    #[serde(default = "default_maker_fee")]
    pub default_maker_fee: f64,
}

fn default_taker_fee() -> f64 {
    0.001
}
fn default_maker_fee() -> f64 {
    0.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        if self.account.id.is_empty() {
            return Err(Error::Config("account id must not be empty".into()));
        }
        if self.account.base_asset.is_empty() {
            return Err(Error::Config("base_asset must not be empty".into()));
        }
        if self.execution.padding_asset.is_empty() {
            return Err(Error::Config("padding_asset must not be empty".into()));
        }
        if self.execution.max_orders_per_run == 0 {
            return Err(Error::Config("max_orders_per_run must be > 0".into()));
        }
        if self.execution.time_delta_secs == 0 {
            return Err(Error::Config("time_delta_secs must be > 0".into()));
        }
        if !(0.0..1.0).contains(&self.cost.default_taker_fee) {
            return Err(Error::Config("default_taker_fee must be in [0.0, 1.0)".into()));
        }
        if !(0.0..1.0).contains(&self.cost.default_maker_fee) {
            return Err(Error::Config("default_maker_fee must be in [0.0, 1.0)".into()));
        }
        if self.exchange.kind == ExchangeKind::Binance
            && (self.exchange.api_key.is_none() || self.exchange.secret_key.is_none())
        {
            return Err(Error::Config(
                "binance exchange requires api_key and secret_key".into(),
            ));
        }
        Ok(())
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> std::path::PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }
}
