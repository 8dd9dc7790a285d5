// =============================================================================
// Engine Configuration - tunable settings with atomic save
// =============================================================================
//
// Central configuration hub for the Aurum engine. Every tunable parameter
// lives here so the engine can be re-parameterised without a rebuild.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbol() -> String {
    "XAUUSD".to_string()
}

fn default_interval() -> String {
    "M15".to_string()
}

fn default_window_bars() -> usize {
    200
}

fn default_lot_size() -> f64 {
    0.1
}

fn default_point_size() -> f64 {
    0.01
}

fn default_journal_path() -> String {
    "logs/trades.jsonl".to_string()
}

fn default_rsi_oversold() -> f64 {
    10.0
}

fn default_rsi_overbought() -> f64 {
    90.0
}

fn default_structure_lookback() -> usize {
    20
}

fn default_bollinger_period() -> usize {
    21
}

fn default_bollinger_std() -> f64 {
    2.0
}

fn default_volatility_ceiling_pct() -> f64 {
    2.0
}

fn default_stop_loss_points() -> f64 {
    150.0
}

fn default_take_profit_points() -> f64 {
    300.0
}

fn default_trailing_distance_points() -> f64 {
    100.0
}

fn default_max_holding_minutes() -> f64 {
    90.0
}

fn default_exit_probability_floor() -> f64 {
    0.35
}

// =============================================================================
// SignalParams
// =============================================================================

/// Tunable parameters for the directional signal strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalParams {
    /// RSI(2) level below which the momentum strategy votes long.
    #[serde(default = "default_rsi_oversold")]
    pub rsi_oversold: f64,

    /// RSI(2) level above which the momentum strategy votes short.
    #[serde(default = "default_rsi_overbought")]
    pub rsi_overbought: f64,

    /// Number of prior bars scanned for structure breakout highs/lows.
    #[serde(default = "default_structure_lookback")]
    pub structure_lookback: usize,

    /// Bollinger Band look-back period.
    #[serde(default = "default_bollinger_period")]
    pub bollinger_period: usize,

    /// Bollinger Band standard-deviation multiplier.
    #[serde(default = "default_bollinger_std")]
    pub bollinger_std: f64,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            rsi_oversold: default_rsi_oversold(),
            rsi_overbought: default_rsi_overbought(),
            structure_lookback: default_structure_lookback(),
            bollinger_period: default_bollinger_period(),
            bollinger_std: default_bollinger_std(),
        }
    }
}

// =============================================================================
// GateParams
// =============================================================================

/// Tunable parameters for the pre-trade statistical gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateParams {
    /// Maximum acceptable next-period volatility forecast, as a percentage
    /// standard deviation. Forecasts above this ceiling veto all entries.
    #[serde(default = "default_volatility_ceiling_pct")]
    pub volatility_ceiling_pct: f64,
}

impl Default for GateParams {
    fn default() -> Self {
        Self {
            volatility_ceiling_pct: default_volatility_ceiling_pct(),
        }
    }
}

// =============================================================================
// ExitParams
// =============================================================================

/// Tunable parameters for position exits: hard levels, trailing stop,
/// time box, and the ML early-exit floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitParams {
    /// Initial stop-loss distance in points (points * point_size = price).
    #[serde(default = "default_stop_loss_points")]
    pub stop_loss_points: f64,

    /// Take-profit distance in points.
    #[serde(default = "default_take_profit_points")]
    pub take_profit_points: f64,

    /// Trailing stop distance in points.
    #[serde(default = "default_trailing_distance_points")]
    pub trailing_distance_points: f64,

    /// Whether a trailing candidate may seed a position whose stop is unset
    /// (zero). Off by default: stops only ever tighten.
    #[serde(default)]
    pub allow_seed_when_unset: bool,

    /// Maximum holding time in minutes before the time box closes the trade.
    #[serde(default = "default_max_holding_minutes")]
    pub max_holding_minutes: f64,

    /// Force-close when the predicted probability of reaching TP before SL
    /// falls below this floor.
    #[serde(default = "default_exit_probability_floor")]
    pub exit_probability_floor: f64,
}

impl Default for ExitParams {
    fn default() -> Self {
        Self {
            stop_loss_points: default_stop_loss_points(),
            take_profit_points: default_take_profit_points(),
            trailing_distance_points: default_trailing_distance_points(),
            allow_seed_when_unset: false,
            max_holding_minutes: default_max_holding_minutes(),
            exit_probability_floor: default_exit_probability_floor(),
        }
    }
}

// =============================================================================
// EngineConfig
// =============================================================================

/// Top-level configuration for the Aurum engine.
///
/// Every field has a serde default so that older JSON files missing new
/// fields will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Instrument the engine trades (one position at a time).
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Bar interval, e.g. "M15".
    #[serde(default = "default_interval")]
    pub interval: String,

    /// Size of the rolling bar window used for all analysis.
    #[serde(default = "default_window_bars")]
    pub window_bars: usize,

    /// Position size in lots.
    #[serde(default = "default_lot_size")]
    pub lot_size: f64,

    /// Price value of a single point (0.01 means 100 points = 1.00).
    #[serde(default = "default_point_size")]
    pub point_size: f64,

    /// Path of the append-only trade journal file.
    #[serde(default = "default_journal_path")]
    pub journal_path: String,

    #[serde(default)]
    pub signals: SignalParams,

    #[serde(default)]
    pub gate: GateParams,

    #[serde(default)]
    pub exit: ExitParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            interval: default_interval(),
            window_bars: default_window_bars(),
            lot_size: default_lot_size(),
            point_size: default_point_size(),
            journal_path: default_journal_path(),
            signals: SignalParams::default(),
            gate: GateParams::default(),
            exit: ExitParams::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbol = %config.symbol,
            interval = %config.interval,
            "engine config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise engine config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "engine config saved (atomic)");
        Ok(())
    }

    /// Length of one bar interval in seconds.
    ///
    /// Unknown interval strings fall back to 15 minutes with a warning so
    /// that a typo in the config never stalls the cycle loop.
    pub fn interval_secs(&self) -> u64 {
        match self.interval.to_uppercase().as_str() {
            "M1" => 60,
            "M5" => 300,
            "M15" => 900,
            "M30" => 1800,
            "H1" => 3600,
            "H4" => 14400,
            other => {
                warn!(interval = other, "unknown bar interval, assuming M15");
                900
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.symbol, "XAUUSD");
        assert_eq!(cfg.interval, "M15");
        assert_eq!(cfg.window_bars, 200);
        assert!((cfg.lot_size - 0.1).abs() < f64::EPSILON);
        assert!((cfg.point_size - 0.01).abs() < f64::EPSILON);
        assert!((cfg.signals.rsi_oversold - 10.0).abs() < f64::EPSILON);
        assert!((cfg.signals.rsi_overbought - 90.0).abs() < f64::EPSILON);
        assert_eq!(cfg.signals.structure_lookback, 20);
        assert!((cfg.gate.volatility_ceiling_pct - 2.0).abs() < f64::EPSILON);
        assert!((cfg.exit.max_holding_minutes - 90.0).abs() < f64::EPSILON);
        assert!((cfg.exit.exit_probability_floor - 0.35).abs() < f64::EPSILON);
        assert!(!cfg.exit.allow_seed_when_unset);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.symbol, "XAUUSD");
        assert_eq!(cfg.window_bars, 200);
        assert!((cfg.exit.trailing_distance_points - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "symbol": "EURUSD", "exit": { "max_holding_minutes": 120.0 } }"#;
        let cfg: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.symbol, "EURUSD");
        assert!((cfg.exit.max_holding_minutes - 120.0).abs() < f64::EPSILON);
        // Untouched fields keep defaults.
        assert!((cfg.exit.stop_loss_points - 150.0).abs() < f64::EPSILON);
        assert_eq!(cfg.interval, "M15");
    }

    #[test]
    fn roundtrip_serialisation() {
        let cfg = EngineConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let cfg2: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.symbol, cfg2.symbol);
        assert_eq!(cfg.window_bars, cfg2.window_bars);
        assert!((cfg.exit.exit_probability_floor - cfg2.exit.exit_probability_floor).abs() < f64::EPSILON);
    }

    #[test]
    fn interval_secs_mapping() {
        let mut cfg = EngineConfig::default();
        assert_eq!(cfg.interval_secs(), 900);
        cfg.interval = "M1".to_string();
        assert_eq!(cfg.interval_secs(), 60);
        cfg.interval = "h1".to_string();
        assert_eq!(cfg.interval_secs(), 3600);
        cfg.interval = "weird".to_string();
        assert_eq!(cfg.interval_secs(), 900);
    }
}
