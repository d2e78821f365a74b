//! Market regime classification.
//!
//! A regime is a pure function of one [`IndicatorSnapshot`]; nothing carries
//! over between ticks. The regime then selects the RSI band, the score
//! multiplier, the expected-return scale and the Kelly multiplier used
//! further down the pipeline.

use std::fmt;

use crate::domain::config::{RegimeConfig, RsiBand, SignalConfig};
use crate::domain::indicator::IndicatorSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum MarketRegime {
    TrendingUp,
    TrendingDown,
    #[default]
    Ranging,
    HighVolatility,
    LowVolatility,
}

impl MarketRegime {
    pub const ALL: [MarketRegime; 5] = [
        MarketRegime::TrendingUp,
        MarketRegime::TrendingDown,
        MarketRegime::Ranging,
        MarketRegime::HighVolatility,
        MarketRegime::LowVolatility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketRegime::TrendingUp => "trending_up",
            MarketRegime::TrendingDown => "trending_down",
            MarketRegime::Ranging => "ranging",
            MarketRegime::HighVolatility => "high_volatility",
            MarketRegime::LowVolatility => "low_volatility",
        }
    }

    pub fn is_trending(&self) -> bool {
        matches!(self, MarketRegime::TrendingUp | MarketRegime::TrendingDown)
    }

    pub fn rsi_band(&self, config: &SignalConfig) -> RsiBand {
        match self {
            MarketRegime::TrendingUp => config.rsi_trending_up,
            MarketRegime::TrendingDown => config.rsi_trending_down,
            _ => config.rsi_default,
        }
    }

    /// Score multiplier for a signal pointing up (`bullish`) or down.
    pub fn score_multiplier(&self, config: &RegimeConfig, bullish: bool) -> f64 {
        match (self, bullish) {
            (MarketRegime::TrendingUp, true) | (MarketRegime::TrendingDown, false) => {
                config.with_trend_multiplier
            }
            (MarketRegime::TrendingUp, false) | (MarketRegime::TrendingDown, true) => {
                config.counter_trend_multiplier
            }
            (MarketRegime::Ranging, _) => config.ranging_multiplier,
            (MarketRegime::HighVolatility, _) => config.high_volatility_multiplier,
            (MarketRegime::LowVolatility, _) => config.low_volatility_multiplier,
        }
    }

    pub fn expected_return_scale(&self, config: &RegimeConfig) -> f64 {
        match self {
            MarketRegime::TrendingUp | MarketRegime::TrendingDown => config.trending_return_scale,
            MarketRegime::HighVolatility => config.high_volatility_return_scale,
            _ => 1.0,
        }
    }

    pub fn kelly_multiplier(&self, config: &RegimeConfig) -> f64 {
        match self {
            MarketRegime::TrendingUp => config.kelly_trending_up,
            MarketRegime::TrendingDown => config.kelly_trending_down,
            MarketRegime::Ranging => config.kelly_ranging,
            MarketRegime::HighVolatility => config.kelly_high_volatility,
            MarketRegime::LowVolatility => config.kelly_low_volatility,
        }
    }
}

impl fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a snapshot. Trend checks run before the low-volatility check so
/// a smooth, steady trend is not mistaken for a quiet market.
pub fn classify(snapshot: &IndicatorSnapshot, config: &RegimeConfig) -> MarketRegime {
    if snapshot.insufficient_data {
        return MarketRegime::Ranging;
    }
    if snapshot.volatility > config.high_volatility {
        return MarketRegime::HighVolatility;
    }
    if snapshot.trend_strength > config.trend_strength_min {
        if snapshot.momentum_long > config.trend_threshold {
            return MarketRegime::TrendingUp;
        }
        if snapshot.momentum_long < -config.trend_threshold {
            return MarketRegime::TrendingDown;
        }
    }
    if snapshot.volatility < config.low_volatility {
        return MarketRegime::LowVolatility;
    }
    MarketRegime::Ranging
}
