//! Technical indicators over the market window.
//!
//! Each submodule is a pure function over a price slice. [`compute`] runs all
//! of them over a [`MarketWindow`] and folds the results into one
//! [`IndicatorSnapshot`]. While the window is still filling, price-derived
//! values are replaced by neutral sentinels and `insufficient_data` is set;
//! callers must check the flag instead of inferring it from the numbers.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod momentum;
pub mod rsi;
pub mod stddev;
pub mod trend;

use crate::domain::config::IndicatorConfig;
use crate::domain::window::MarketWindow;

use bollinger::NEUTRAL_POSITION;
use rsi::NEUTRAL_RSI;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub price: f64,
    pub rsi: f64,
    pub momentum_short: f64,
    pub momentum_mid: f64,
    pub momentum_long: f64,
    pub sma: f64,
    pub ema: f64,
    pub bb_upper: f64,
    pub bb_middle: f64,
    pub bb_lower: f64,
    pub bb_position: f64,
    pub macd_line: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
    pub volatility: f64,
    pub spread_bps: f64,
    pub volume_ratio: f64,
    pub trend_strength: f64,
    pub insufficient_data: bool,
    pub samples: usize,
    pub required: usize,
}

impl IndicatorSnapshot {
    /// Neutral snapshot for an empty window.
    pub fn neutral() -> Self {
        Self {
            price: 0.0,
            rsi: NEUTRAL_RSI,
            momentum_short: 0.0,
            momentum_mid: 0.0,
            momentum_long: 0.0,
            sma: 0.0,
            ema: 0.0,
            bb_upper: 0.0,
            bb_middle: 0.0,
            bb_lower: 0.0,
            bb_position: NEUTRAL_POSITION,
            macd_line: 0.0,
            macd_signal: 0.0,
            macd_histogram: 0.0,
            volatility: 0.0,
            spread_bps: 0.0,
            volume_ratio: 1.0,
            trend_strength: 0.0,
            insufficient_data: true,
            samples: 0,
            required: 0,
        }
    }

    /// Momentum blend used by the scorer: 0.5 short, 0.3 mid, 0.2 long.
    pub fn blended_momentum(&self) -> f64 {
        self.momentum_short * 0.5 + self.momentum_mid * 0.3 + self.momentum_long * 0.2
    }
}

/// Latest volume over the mean of the trailing `lookback` volumes.
pub fn volume_ratio(volumes: &[f64], lookback: usize) -> f64 {
    let Some(&latest) = volumes.last() else {
        return 1.0;
    };
    let start = volumes.len().saturating_sub(lookback.max(1));
    let avg = stddev::mean(&volumes[start..]);
    if avg <= 0.0 {
        return 1.0;
    }
    latest / avg
}

pub fn compute(window: &MarketWindow, config: &IndicatorConfig) -> IndicatorSnapshot {
    let mut snap = IndicatorSnapshot::neutral();
    snap.samples = window.len();
    snap.required = window.capacity();

    let Some(latest) = window.latest() else {
        return snap;
    };
    snap.price = latest.price;
    snap.spread_bps = latest.spread_bps();

    let volumes = window.volumes();
    snap.volume_ratio = volume_ratio(&volumes, config.volume_lookback);

    if !window.is_full() {
        return snap;
    }

    let prices = window.prices();
    snap.insufficient_data = false;

    snap.rsi = rsi::rsi(&prices, config.rsi_period).unwrap_or(NEUTRAL_RSI);
    snap.momentum_short = momentum::momentum(&prices, config.momentum_short).unwrap_or(0.0);
    snap.momentum_mid = momentum::momentum(&prices, config.momentum_mid).unwrap_or(0.0);
    snap.momentum_long = momentum::momentum(&prices, config.momentum_long).unwrap_or(0.0);

    snap.sma = ema::sma(&prices, config.ma_period).unwrap_or(latest.price);
    snap.ema = ema::ema(&prices[prices.len().saturating_sub(config.ma_period)..], config.ma_period)
        .unwrap_or(latest.price);

    if let Some(bands) =
        bollinger::bollinger(&prices, config.bollinger_period, config.bollinger_multiplier)
    {
        snap.bb_upper = bands.upper;
        snap.bb_middle = bands.middle;
        snap.bb_lower = bands.lower;
        snap.bb_position = bands.position(latest.price);
    }

    if let Some(m) = macd::macd(&prices, config.macd_fast, config.macd_slow, config.macd_signal) {
        snap.macd_line = m.line;
        snap.macd_signal = m.signal;
        snap.macd_histogram = m.histogram;
    }

    let returns = stddev::simple_returns(&prices);
    snap.volatility =
        stddev::annualized_volatility(&returns, config.volatility_lookback, config.periods_per_year);

    snap.trend_strength =
        trend::trend_strength(&prices, config.trend_lookback, config.full_strength_slope)
            .unwrap_or(0.0);

    snap
}
