//! Engine configuration
//!
//! Loaded once at startup from a JSON file. Every field has a default, so
//! a file naming only the symbol and its instrument constraints is enough:
//!
//! ```json
//! {
//!   "symbol": "BTCUSDT",
//!   "tickSize": "0.1",
//!   "qtyStep": "0.001",
//!   "minQty": "0.001",
//!   "quote": { "base_spread_bps": "6" }
//! }
//! ```

use keel_core::{SpecError, SymbolSpec};
use keel_gateway::{FeedError, InstrumentInfo};
use keel_risk_manager::RiskLimits;
use keel_strategy::{FlowConfig, GateConfig, QuoteConfig};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("[{0}] no tick size / qty step configured and no instrument file given")]
    MissingInstrument(String),
    #[error("Failed to load instrument info: {0}")]
    Instrument(#[from] FeedError),
    #[error("[{expected}] instrument file describes {got}")]
    InstrumentMismatch { expected: String, got: String },
    #[error(transparent)]
    Spec(#[from] SpecError),
}

/// Risk section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSection {
    pub max_position_notional: Decimal,
    pub kill_switch_loss_notional: Decimal,
    pub near_cap_ratio: Decimal,
    pub max_leverage: Decimal,
}

impl Default for RiskSection {
    fn default() -> Self {
        let limits = RiskLimits::default();
        Self {
            max_position_notional: limits.max_position_notional,
            kill_switch_loss_notional: limits.kill_switch_loss_notional,
            near_cap_ratio: limits.near_cap_ratio,
            max_leverage: dec!(10),
        }
    }
}

/// Outbound request rate limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSection {
    /// Token bucket capacity
    pub capacity: u32,
    /// Tokens added per second
    pub refill_per_sec: f64,
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            capacity: 15,
            refill_per_sec: 7.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub symbol: String,
    /// Wallet updates for other coins are ignored
    #[serde(default = "default_quote_coin")]
    pub quote_coin: String,

    /// Instrument constraints, when not loaded from `instrument_path`
    #[serde(default)]
    pub tick_size: Option<Decimal>,
    #[serde(default)]
    pub qty_step: Option<Decimal>,
    #[serde(default)]
    pub min_qty: Option<Decimal>,
    #[serde(default)]
    pub instrument_path: Option<PathBuf>,

    #[serde(default)]
    pub quote: QuoteConfig,
    #[serde(default)]
    pub flow: FlowConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub risk: RiskSection,
    #[serde(default)]
    pub execution: ExecutionSection,

    /// Quoting tick period
    #[serde(default = "default_loop_interval_ms")]
    pub loop_interval_ms: u64,
    /// Inbound event queue depth
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_quote_coin() -> String {
    "USDT".to_string()
}

fn default_loop_interval_ms() -> u64 {
    500
}

fn default_channel_capacity() -> usize {
    10_000
}

impl EngineConfig {
    /// Minimal config for `symbol` with explicit instrument constraints
    pub fn new(symbol: impl Into<String>, tick_size: Decimal, qty_step: Decimal, min_qty: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            quote_coin: default_quote_coin(),
            tick_size: Some(tick_size),
            qty_step: Some(qty_step),
            min_qty: Some(min_qty),
            instrument_path: None,
            quote: QuoteConfig::default(),
            flow: FlowConfig::default(),
            gate: GateConfig::default(),
            risk: RiskSection::default(),
            execution: ExecutionSection::default(),
            loop_interval_ms: default_loop_interval_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn loop_interval(&self) -> Duration {
        Duration::from_millis(self.loop_interval_ms.max(1))
    }

    pub fn risk_limits(&self, spec: &SymbolSpec) -> RiskLimits {
        RiskLimits::from_spec(spec, self.risk.near_cap_ratio)
    }

    /// Build the session's `SymbolSpec`, reading the instrument file if one
    /// is configured. Explicit values in the config win over the file.
    pub fn symbol_spec(&self) -> Result<SymbolSpec, ConfigError> {
        let info = match &self.instrument_path {
            Some(path) => Some(InstrumentInfo::from_file(path)?),
            None => None,
        };
        self.resolve_symbol_spec(info.as_ref())
    }

    pub fn resolve_symbol_spec(&self, info: Option<&InstrumentInfo>) -> Result<SymbolSpec, ConfigError> {
        if let Some(info) = info {
            if info.symbol != self.symbol {
                return Err(ConfigError::InstrumentMismatch {
                    expected: self.symbol.clone(),
                    got: info.symbol.clone(),
                });
            }
        }

        let tick_size = self.tick_size.or(info.map(|i| i.tick_size));
        let qty_step = self.qty_step.or(info.map(|i| i.qty_step));
        let (Some(tick_size), Some(qty_step)) = (tick_size, qty_step) else {
            return Err(ConfigError::MissingInstrument(self.symbol.clone()));
        };
        let min_qty = self
            .min_qty
            .or(info.map(|i| i.min_order_qty))
            .unwrap_or(qty_step);
        let max_leverage = info.map_or(self.risk.max_leverage, |i| i.max_leverage);

        Ok(SymbolSpec::new(
            self.symbol.clone(),
            tick_size,
            qty_step,
            min_qty,
            self.risk.max_position_notional,
            self.risk.kill_switch_loss_notional,
            max_leverage,
        )?)
    }
}
