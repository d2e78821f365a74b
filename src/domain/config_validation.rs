//! Engine configuration validation.
//!
//! Runs once before the engine is built; every check names the INI section
//! and key that carries the offending value.

use crate::domain::config::{EngineConfig, RsiBand};
use crate::domain::error::EngineError;

const WEIGHT_TOLERANCE: f64 = 1e-6;

pub fn validate_engine_config(config: &EngineConfig) -> Result<(), EngineError> {
    validate_engine(config)?;
    validate_indicators(config)?;
    validate_regime(config)?;
    validate_signal(config)?;
    validate_sizing(config)?;
    validate_risk(config)?;
    Ok(())
}

fn positive(section: &str, key: &str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::invalid(section, key, format!("{key} must be positive")))
    }
}

fn non_negative(section: &str, key: &str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::invalid(section, key, format!("{key} must be non-negative")))
    }
}

fn fraction(section: &str, key: &str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(EngineError::invalid(section, key, format!("{key} must be in (0, 1]")))
    }
}

fn validate_engine(config: &EngineConfig) -> Result<(), EngineError> {
    if config.instrument.trim().is_empty() {
        return Err(EngineError::ConfigMissing {
            section: "engine".to_string(),
            key: "instrument".to_string(),
        });
    }
    positive("engine", "initial_cash", config.initial_cash)?;
    if config.window_capacity < 2 {
        return Err(EngineError::invalid(
            "engine",
            "window_capacity",
            "window_capacity must be at least 2",
        ));
    }
    Ok(())
}

fn validate_indicators(config: &EngineConfig) -> Result<(), EngineError> {
    let ind = &config.indicators;
    let capacity = config.window_capacity;

    // (key, period, samples the indicator needs); MACD and volatility
    // run on whatever history the window holds, so they carry no minimum.
    let periods = [
        ("rsi_period", ind.rsi_period, ind.rsi_period + 1),
        ("momentum_short", ind.momentum_short, ind.momentum_short),
        ("momentum_mid", ind.momentum_mid, ind.momentum_mid),
        ("momentum_long", ind.momentum_long, ind.momentum_long),
        ("ma_period", ind.ma_period, ind.ma_period),
        ("bollinger_period", ind.bollinger_period, ind.bollinger_period),
        ("macd_fast", ind.macd_fast, 0),
        ("macd_slow", ind.macd_slow, 0),
        ("macd_signal", ind.macd_signal, 0),
        ("volatility_lookback", ind.volatility_lookback, 0),
        ("volume_lookback", ind.volume_lookback, 0),
        ("trend_lookback", ind.trend_lookback, ind.trend_lookback),
    ];
    for (key, period, needed) in periods {
        if period == 0 {
            return Err(EngineError::invalid("indicators", key, format!("{key} must be at least 1")));
        }
        if needed > capacity {
            return Err(EngineError::invalid(
                "indicators",
                key,
                format!("{key} needs {needed} samples but window_capacity is {capacity}"),
            ));
        }
    }
    if ind.macd_fast >= ind.macd_slow {
        return Err(EngineError::invalid(
            "indicators",
            "macd_fast",
            "macd_fast must be shorter than macd_slow",
        ));
    }
    if !(ind.momentum_short <= ind.momentum_mid && ind.momentum_mid <= ind.momentum_long) {
        return Err(EngineError::invalid(
            "indicators",
            "momentum_mid",
            "momentum periods must satisfy short <= mid <= long",
        ));
    }

    positive("indicators", "bollinger_multiplier", ind.bollinger_multiplier)?;
    positive("indicators", "full_strength_slope", ind.full_strength_slope)?;
    positive("indicators", "periods_per_year", ind.periods_per_year)?;
    Ok(())
}

fn validate_regime(config: &EngineConfig) -> Result<(), EngineError> {
    let r = &config.regime;
    positive("regime", "high_volatility", r.high_volatility)?;
    non_negative("regime", "low_volatility", r.low_volatility)?;
    if r.low_volatility >= r.high_volatility {
        return Err(EngineError::invalid(
            "regime",
            "low_volatility",
            "low_volatility must be below high_volatility",
        ));
    }
    fraction("regime", "trend_strength_min", r.trend_strength_min)?;
    non_negative("regime", "trend_threshold", r.trend_threshold)?;

    let multipliers = [
        ("with_trend_multiplier", r.with_trend_multiplier),
        ("counter_trend_multiplier", r.counter_trend_multiplier),
        ("ranging_multiplier", r.ranging_multiplier),
        ("high_volatility_multiplier", r.high_volatility_multiplier),
        ("low_volatility_multiplier", r.low_volatility_multiplier),
        ("trending_return_scale", r.trending_return_scale),
        ("high_volatility_return_scale", r.high_volatility_return_scale),
        ("kelly_trending_up", r.kelly_trending_up),
        ("kelly_trending_down", r.kelly_trending_down),
        ("kelly_ranging", r.kelly_ranging),
        ("kelly_high_volatility", r.kelly_high_volatility),
        ("kelly_low_volatility", r.kelly_low_volatility),
    ];
    for (key, value) in multipliers {
        positive("regime", key, value)?;
    }
    Ok(())
}

fn validate_band(prefix: &str, band: &RsiBand) -> Result<(), EngineError> {
    let key = format!("{prefix}_buy");
    if !(0.0..=100.0).contains(&band.buy) || !(0.0..=100.0).contains(&band.sell) {
        return Err(EngineError::invalid("signal", &key, "RSI bands must be within [0, 100]"));
    }
    if band.buy >= band.sell {
        return Err(EngineError::invalid(
            "signal",
            &key,
            format!("{prefix} buy level must be below its sell level"),
        ));
    }
    Ok(())
}

fn validate_signal(config: &EngineConfig) -> Result<(), EngineError> {
    let s = &config.signal;
    fraction("signal", "threshold", s.threshold)?;
    positive("signal", "max_spread_bps", s.max_spread_bps)?;
    positive("signal", "max_expected_return", s.max_expected_return)?;
    fraction("signal", "stop_loss_pct", s.stop_loss_pct)?;
    positive("signal", "take_profit_pct", s.take_profit_pct)?;

    validate_band("rsi_trending_up", &s.rsi_trending_up)?;
    validate_band("rsi_trending_down", &s.rsi_trending_down)?;
    validate_band("rsi_default", &s.rsi_default)?;

    let w = &s.weights;
    for (key, value) in [
        ("weight_rsi", w.rsi),
        ("weight_momentum", w.momentum),
        ("weight_macd", w.macd),
        ("weight_bollinger", w.bollinger),
        ("weight_volume", w.volume),
        ("weight_spread", w.spread),
    ] {
        non_negative("signal", key, value)?;
    }
    let total = w.total();
    if (total - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(EngineError::invalid(
            "signal",
            "weight_rsi",
            format!("factor weights must sum to 1.0, got {total:.4}"),
        ));
    }
    Ok(())
}

fn validate_sizing(config: &EngineConfig) -> Result<(), EngineError> {
    let s = &config.sizing;
    positive("sizing", "expected_loss", s.expected_loss)?;
    fraction("sizing", "safety_factor", s.safety_factor)?;
    non_negative("sizing", "min_kelly", s.min_kelly)?;
    fraction("sizing", "max_kelly", s.max_kelly)?;
    if s.min_kelly > s.max_kelly {
        return Err(EngineError::invalid(
            "sizing",
            "min_kelly",
            "min_kelly must not exceed max_kelly",
        ));
    }
    positive("sizing", "target_volatility", s.target_volatility)?;
    positive("sizing", "volatility_floor", s.volatility_floor)?;
    positive("sizing", "max_volatility_adjustment", s.max_volatility_adjustment)?;
    non_negative("sizing", "min_trade_value", s.min_trade_value)?;
    if !(0.0..1.0).contains(&s.cash_reserve) {
        return Err(EngineError::invalid(
            "sizing",
            "cash_reserve",
            "cash_reserve must be in [0, 1)",
        ));
    }
    Ok(())
}

fn validate_risk(config: &EngineConfig) -> Result<(), EngineError> {
    let r = &config.risk;
    fraction("risk", "max_var_95", r.max_var_95)?;
    fraction("risk", "max_var_99", r.max_var_99)?;
    fraction("risk", "max_daily_drawdown", r.max_daily_drawdown)?;
    fraction("risk", "max_total_drawdown", r.max_total_drawdown)?;
    fraction("risk", "max_position_fraction", r.max_position_fraction)?;
    fraction("risk", "max_liquidity_risk", r.max_liquidity_risk)?;
    fraction("risk", "halt_liquidity_risk", r.halt_liquidity_risk)?;
    if r.halt_liquidity_risk < r.max_liquidity_risk {
        return Err(EngineError::invalid(
            "risk",
            "halt_liquidity_risk",
            "halt_liquidity_risk must not be below max_liquidity_risk",
        ));
    }
    if !(r.var_halt_multiplier.is_finite() && r.var_halt_multiplier >= 1.0) {
        return Err(EngineError::invalid(
            "risk",
            "var_halt_multiplier",
            "var_halt_multiplier must be at least 1.0",
        ));
    }
    if r.daily_trade_limit == 0 {
        return Err(EngineError::invalid(
            "risk",
            "daily_trade_limit",
            "daily_trade_limit must be at least 1",
        ));
    }
    if r.history_capacity == 0 {
        return Err(EngineError::invalid(
            "risk",
            "history_capacity",
            "history_capacity must be at least 1",
        ));
    }
    if r.min_history < 2 || r.min_history > r.history_capacity {
        return Err(EngineError::invalid(
            "risk",
            "min_history",
            "min_history must be between 2 and history_capacity",
        ));
    }
    if r.var_lookback == 0 {
        return Err(EngineError::invalid(
            "risk",
            "var_lookback",
            "var_lookback must be at least 1",
        ));
    }
    positive("risk", "periods_per_year", r.periods_per_year)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid(config: &EngineConfig, section: &str, key: &str) {
        match validate_engine_config(config) {
            Err(EngineError::ConfigInvalid { section: s, key: k, .. }) => {
                assert_eq!((s.as_str(), k.as_str()), (section, key));
            }
            other => panic!("expected ConfigInvalid for {section}.{key}, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_engine_config(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn weights_must_sum_to_one() {
        let mut config = EngineConfig::default();
        config.signal.weights.rsi = 0.5;
        assert_invalid(&config, "signal", "weight_rsi");
    }

    #[test]
    fn period_longer_than_window_rejected() {
        let mut config = EngineConfig::default();
        config.indicators.bollinger_period = 60;
        assert_invalid(&config, "indicators", "bollinger_period");
    }

    #[test]
    fn macd_may_exceed_window() {
        let mut config = EngineConfig::default();
        config.window_capacity = 20;
        assert!(validate_engine_config(&config).is_ok());
    }

    #[test]
    fn rsi_needs_one_extra_sample() {
        let mut config = EngineConfig::default();
        config.indicators.rsi_period = config.window_capacity;
        assert_invalid(&config, "indicators", "rsi_period");
    }

    #[test]
    fn kelly_bounds_ordered() {
        let mut config = EngineConfig::default();
        config.sizing.min_kelly = 0.3;
        config.sizing.max_kelly = 0.2;
        assert_invalid(&config, "sizing", "min_kelly");
    }

    #[test]
    fn non_positive_cash_rejected() {
        let mut config = EngineConfig::default();
        config.initial_cash = 0.0;
        assert_invalid(&config, "engine", "initial_cash");
    }

    #[test]
    fn inverted_rsi_band_rejected() {
        let mut config = EngineConfig::default();
        config.signal.rsi_default = RsiBand { buy: 70.0, sell: 30.0 };
        assert_invalid(&config, "signal", "rsi_default_buy");
    }

    #[test]
    fn zero_trade_limit_rejected() {
        let mut config = EngineConfig::default();
        config.risk.daily_trade_limit = 0;
        assert_invalid(&config, "risk", "daily_trade_limit");
    }

    #[test]
    fn missing_instrument() {
        let config = EngineConfig {
            instrument: "  ".to_string(),
            ..EngineConfig::default()
        };
        assert!(matches!(
            validate_engine_config(&config),
            Err(EngineError::ConfigMissing { .. })
        ));
    }
}
