//! Engine configuration.
//!
//! Every tunable of the decision engine lives in one [`EngineConfig`]. Each
//! key has a default, so an empty INI file yields the stock engine; values
//! read from a [`ConfigPort`] override the defaults per key. Range checks live
//! in [`crate::domain::config_validation`].

use crate::domain::error::EngineError;
use crate::ports::config_port::ConfigPort;

/// Five-minute bars, traded around the clock.
pub const FIVE_MINUTE_PERIODS_PER_YEAR: f64 = 365.0 * 24.0 * 12.0;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub momentum_short: usize,
    pub momentum_mid: usize,
    pub momentum_long: usize,
    pub ma_period: usize,
    pub bollinger_period: usize,
    pub bollinger_multiplier: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub volatility_lookback: usize,
    pub volume_lookback: usize,
    pub trend_lookback: usize,
    pub full_strength_slope: f64,
    pub periods_per_year: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            momentum_short: 5,
            momentum_mid: 10,
            momentum_long: 20,
            ma_period: 20,
            bollinger_period: 20,
            bollinger_multiplier: 2.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            volatility_lookback: 20,
            volume_lookback: 20,
            trend_lookback: 20,
            full_strength_slope: 0.002,
            periods_per_year: FIVE_MINUTE_PERIODS_PER_YEAR,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegimeConfig {
    pub high_volatility: f64,
    pub low_volatility: f64,
    pub trend_strength_min: f64,
    pub trend_threshold: f64,
    pub with_trend_multiplier: f64,
    pub counter_trend_multiplier: f64,
    pub ranging_multiplier: f64,
    pub high_volatility_multiplier: f64,
    pub low_volatility_multiplier: f64,
    pub trending_return_scale: f64,
    pub high_volatility_return_scale: f64,
    pub kelly_trending_up: f64,
    pub kelly_trending_down: f64,
    pub kelly_ranging: f64,
    pub kelly_high_volatility: f64,
    pub kelly_low_volatility: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            high_volatility: 0.8,
            low_volatility: 0.1,
            trend_strength_min: 0.6,
            trend_threshold: 0.005,
            with_trend_multiplier: 1.5,
            counter_trend_multiplier: 0.7,
            ranging_multiplier: 0.8,
            high_volatility_multiplier: 0.6,
            low_volatility_multiplier: 1.0,
            trending_return_scale: 1.5,
            high_volatility_return_scale: 2.0,
            kelly_trending_up: 1.2,
            kelly_trending_down: 1.0,
            kelly_ranging: 0.8,
            kelly_high_volatility: 0.5,
            kelly_low_volatility: 1.0,
        }
    }
}

/// RSI buy/sell band: oversold below `buy`, overbought above `sell`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiBand {
    pub buy: f64,
    pub sell: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorWeights {
    pub rsi: f64,
    pub momentum: f64,
    pub macd: f64,
    pub bollinger: f64,
    pub volume: f64,
    pub spread: f64,
}

impl FactorWeights {
    pub fn total(&self) -> f64 {
        self.rsi + self.momentum + self.macd + self.bollinger + self.volume + self.spread
    }
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            rsi: 0.25,
            momentum: 0.20,
            macd: 0.15,
            bollinger: 0.20,
            volume: 0.10,
            spread: 0.10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalConfig {
    pub threshold: f64,
    pub max_spread_bps: f64,
    pub max_expected_return: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub protective_exits: bool,
    pub rsi_trending_up: RsiBand,
    pub rsi_trending_down: RsiBand,
    pub rsi_default: RsiBand,
    pub weights: FactorWeights,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            max_spread_bps: 8.0,
            max_expected_return: 0.02,
            stop_loss_pct: 0.02,
            take_profit_pct: 0.04,
            protective_exits: true,
            rsi_trending_up: RsiBand { buy: 40.0, sell: 80.0 },
            rsi_trending_down: RsiBand { buy: 20.0, sell: 60.0 },
            rsi_default: RsiBand { buy: 30.0, sell: 70.0 },
            weights: FactorWeights::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SizingConfig {
    pub expected_loss: f64,
    pub safety_factor: f64,
    pub min_kelly: f64,
    pub max_kelly: f64,
    pub target_volatility: f64,
    pub volatility_floor: f64,
    pub max_volatility_adjustment: f64,
    pub min_trade_value: f64,
    /// Fraction of cash held back from entries to cover fees and slippage.
    pub cash_reserve: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            expected_loss: 0.015,
            safety_factor: 0.5,
            min_kelly: 0.01,
            max_kelly: 0.25,
            target_volatility: 0.2,
            volatility_floor: 0.1,
            max_volatility_adjustment: 2.0,
            min_trade_value: 10.0,
            cash_reserve: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    pub max_var_95: f64,
    pub max_var_99: f64,
    pub max_daily_drawdown: f64,
    pub max_total_drawdown: f64,
    pub max_position_fraction: f64,
    pub max_liquidity_risk: f64,
    pub halt_liquidity_risk: f64,
    pub var_halt_multiplier: f64,
    pub daily_trade_limit: u32,
    pub history_capacity: usize,
    pub min_history: usize,
    pub var_lookback: usize,
    pub periods_per_year: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_var_95: 0.02,
            max_var_99: 0.04,
            max_daily_drawdown: 0.05,
            max_total_drawdown: 0.15,
            max_position_fraction: 0.25,
            max_liquidity_risk: 0.8,
            halt_liquidity_risk: 0.9,
            var_halt_multiplier: 1.5,
            daily_trade_limit: 8,
            history_capacity: 1000,
            min_history: 30,
            var_lookback: 100,
            periods_per_year: FIVE_MINUTE_PERIODS_PER_YEAR,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub instrument: String,
    pub initial_cash: f64,
    pub window_capacity: usize,
    pub indicators: IndicatorConfig,
    pub regime: RegimeConfig,
    pub signal: SignalConfig,
    pub sizing: SizingConfig,
    pub risk: RiskConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instrument: "BTC/USD".to_string(),
            initial_cash: 10_000.0,
            window_capacity: 50,
            indicators: IndicatorConfig::default(),
            regime: RegimeConfig::default(),
            signal: SignalConfig::default(),
            sizing: SizingConfig::default(),
            risk: RiskConfig::default(),
        }
    }
}

fn read_usize(port: &dyn ConfigPort, section: &str, key: &str, default: usize) -> Result<usize, EngineError> {
    port.get_usize(section, key, default)
        .map_err(|raw| EngineError::invalid(section, key, format!("{raw} must be non-negative")))
}

impl EngineConfig {
    /// Build a config from INI sections, falling back to defaults per key.
    pub fn from_port(port: &dyn ConfigPort) -> Result<Self, EngineError> {
        let d = EngineConfig::default();

        let ind = &d.indicators;
        let indicators = IndicatorConfig {
            rsi_period: read_usize(port, "indicators", "rsi_period", ind.rsi_period)?,
            momentum_short: read_usize(port, "indicators", "momentum_short", ind.momentum_short)?,
            momentum_mid: read_usize(port, "indicators", "momentum_mid", ind.momentum_mid)?,
            momentum_long: read_usize(port, "indicators", "momentum_long", ind.momentum_long)?,
            ma_period: read_usize(port, "indicators", "ma_period", ind.ma_period)?,
            bollinger_period: read_usize(port, "indicators", "bollinger_period", ind.bollinger_period)?,
            bollinger_multiplier: port.get_double("indicators", "bollinger_multiplier", ind.bollinger_multiplier),
            macd_fast: read_usize(port, "indicators", "macd_fast", ind.macd_fast)?,
            macd_slow: read_usize(port, "indicators", "macd_slow", ind.macd_slow)?,
            macd_signal: read_usize(port, "indicators", "macd_signal", ind.macd_signal)?,
            volatility_lookback: read_usize(port, "indicators", "volatility_lookback", ind.volatility_lookback)?,
            volume_lookback: read_usize(port, "indicators", "volume_lookback", ind.volume_lookback)?,
            trend_lookback: read_usize(port, "indicators", "trend_lookback", ind.trend_lookback)?,
            full_strength_slope: port.get_double("indicators", "full_strength_slope", ind.full_strength_slope),
            periods_per_year: port.get_double("indicators", "periods_per_year", ind.periods_per_year),
        };

        let reg = &d.regime;
        let regime = RegimeConfig {
            high_volatility: port.get_double("regime", "high_volatility", reg.high_volatility),
            low_volatility: port.get_double("regime", "low_volatility", reg.low_volatility),
            trend_strength_min: port.get_double("regime", "trend_strength_min", reg.trend_strength_min),
            trend_threshold: port.get_double("regime", "trend_threshold", reg.trend_threshold),
            with_trend_multiplier: port.get_double("regime", "with_trend_multiplier", reg.with_trend_multiplier),
            counter_trend_multiplier: port.get_double("regime", "counter_trend_multiplier", reg.counter_trend_multiplier),
            ranging_multiplier: port.get_double("regime", "ranging_multiplier", reg.ranging_multiplier),
            high_volatility_multiplier: port.get_double("regime", "high_volatility_multiplier", reg.high_volatility_multiplier),
            low_volatility_multiplier: port.get_double("regime", "low_volatility_multiplier", reg.low_volatility_multiplier),
            trending_return_scale: port.get_double("regime", "trending_return_scale", reg.trending_return_scale),
            high_volatility_return_scale: port.get_double("regime", "high_volatility_return_scale", reg.high_volatility_return_scale),
            kelly_trending_up: port.get_double("regime", "kelly_trending_up", reg.kelly_trending_up),
            kelly_trending_down: port.get_double("regime", "kelly_trending_down", reg.kelly_trending_down),
            kelly_ranging: port.get_double("regime", "kelly_ranging", reg.kelly_ranging),
            kelly_high_volatility: port.get_double("regime", "kelly_high_volatility", reg.kelly_high_volatility),
            kelly_low_volatility: port.get_double("regime", "kelly_low_volatility", reg.kelly_low_volatility),
        };

        let sig = &d.signal;
        let band = |prefix: &str, default: RsiBand| RsiBand {
            buy: port.get_double("signal", &format!("{prefix}_buy"), default.buy),
            sell: port.get_double("signal", &format!("{prefix}_sell"), default.sell),
        };
        let signal = SignalConfig {
            threshold: port.get_double("signal", "threshold", sig.threshold),
            max_spread_bps: port.get_double("signal", "max_spread_bps", sig.max_spread_bps),
            max_expected_return: port.get_double("signal", "max_expected_return", sig.max_expected_return),
            stop_loss_pct: port.get_double("signal", "stop_loss_pct", sig.stop_loss_pct),
            take_profit_pct: port.get_double("signal", "take_profit_pct", sig.take_profit_pct),
            protective_exits: port.get_bool("signal", "protective_exits", sig.protective_exits),
            rsi_trending_up: band("rsi_trending_up", sig.rsi_trending_up),
            rsi_trending_down: band("rsi_trending_down", sig.rsi_trending_down),
            rsi_default: band("rsi_default", sig.rsi_default),
            weights: FactorWeights {
                rsi: port.get_double("signal", "weight_rsi", sig.weights.rsi),
                momentum: port.get_double("signal", "weight_momentum", sig.weights.momentum),
                macd: port.get_double("signal", "weight_macd", sig.weights.macd),
                bollinger: port.get_double("signal", "weight_bollinger", sig.weights.bollinger),
                volume: port.get_double("signal", "weight_volume", sig.weights.volume),
                spread: port.get_double("signal", "weight_spread", sig.weights.spread),
            },
        };

        let siz = &d.sizing;
        let sizing = SizingConfig {
            expected_loss: port.get_double("sizing", "expected_loss", siz.expected_loss),
            safety_factor: port.get_double("sizing", "safety_factor", siz.safety_factor),
            min_kelly: port.get_double("sizing", "min_kelly", siz.min_kelly),
            max_kelly: port.get_double("sizing", "max_kelly", siz.max_kelly),
            target_volatility: port.get_double("sizing", "target_volatility", siz.target_volatility),
            volatility_floor: port.get_double("sizing", "volatility_floor", siz.volatility_floor),
            max_volatility_adjustment: port.get_double("sizing", "max_volatility_adjustment", siz.max_volatility_adjustment),
            min_trade_value: port.get_double("sizing", "min_trade_value", siz.min_trade_value),
            cash_reserve: port.get_double("sizing", "cash_reserve", siz.cash_reserve),
        };

        let rk = &d.risk;
        let trade_limit = read_usize(port, "risk", "daily_trade_limit", rk.daily_trade_limit as usize)?;
        let risk = RiskConfig {
            max_var_95: port.get_double("risk", "max_var_95", rk.max_var_95),
            max_var_99: port.get_double("risk", "max_var_99", rk.max_var_99),
            max_daily_drawdown: port.get_double("risk", "max_daily_drawdown", rk.max_daily_drawdown),
            max_total_drawdown: port.get_double("risk", "max_total_drawdown", rk.max_total_drawdown),
            max_position_fraction: port.get_double("risk", "max_position_fraction", rk.max_position_fraction),
            max_liquidity_risk: port.get_double("risk", "max_liquidity_risk", rk.max_liquidity_risk),
            halt_liquidity_risk: port.get_double("risk", "halt_liquidity_risk", rk.halt_liquidity_risk),
            var_halt_multiplier: port.get_double("risk", "var_halt_multiplier", rk.var_halt_multiplier),
            daily_trade_limit: u32::try_from(trade_limit)
                .map_err(|_| EngineError::invalid("risk", "daily_trade_limit", "too large"))?,
            history_capacity: read_usize(port, "risk", "history_capacity", rk.history_capacity)?,
            min_history: read_usize(port, "risk", "min_history", rk.min_history)?,
            var_lookback: read_usize(port, "risk", "var_lookback", rk.var_lookback)?,
            periods_per_year: port.get_double("risk", "periods_per_year", rk.periods_per_year),
        };

        Ok(EngineConfig {
            instrument: port
                .get_string("engine", "instrument")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(d.instrument),
            initial_cash: port.get_double("engine", "initial_cash", d.initial_cash),
            window_capacity: read_usize(port, "engine", "window_capacity", d.window_capacity)?,
            indicators,
            regime,
            signal,
            sizing,
            risk,
        })
    }
}
