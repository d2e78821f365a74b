//! Signal generation.
//!
//! Factor scores in [0, 1] are produced by a [`FactorScorer`], combined with
//! fixed weights into a buy and a sell score, scaled by the regime, and turned
//! into exactly one [`Signal`] per tick. The spread gate overrides everything:
//! a wide spread always yields HOLD.

use std::collections::BTreeMap;
use std::fmt;

use crate::domain::config::{FactorWeights, RegimeConfig, SignalConfig};
use crate::domain::indicator::IndicatorSnapshot;
use crate::domain::regime::MarketRegime;
use crate::domain::sample::PriceSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Factor {
    RsiOversold,
    RsiOverbought,
    MomentumBullish,
    MomentumBearish,
    MacdBullish,
    MacdBearish,
    BbOversold,
    BbOverbought,
    HighVolume,
    TightSpread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorSide {
    Buy,
    Sell,
    Both,
}

impl Factor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Factor::RsiOversold => "rsi_oversold",
            Factor::RsiOverbought => "rsi_overbought",
            Factor::MomentumBullish => "momentum_bullish",
            Factor::MomentumBearish => "momentum_bearish",
            Factor::MacdBullish => "macd_bullish",
            Factor::MacdBearish => "macd_bearish",
            Factor::BbOversold => "bb_oversold",
            Factor::BbOverbought => "bb_overbought",
            Factor::HighVolume => "high_volume",
            Factor::TightSpread => "tight_spread",
        }
    }

    pub fn side(&self) -> FactorSide {
        match self {
            Factor::RsiOversold | Factor::MomentumBullish | Factor::MacdBullish | Factor::BbOversold => {
                FactorSide::Buy
            }
            Factor::RsiOverbought
            | Factor::MomentumBearish
            | Factor::MacdBearish
            | Factor::BbOverbought => FactorSide::Sell,
            Factor::HighVolume | Factor::TightSpread => FactorSide::Both,
        }
    }

    pub fn weight(&self, weights: &FactorWeights) -> f64 {
        match self {
            Factor::RsiOversold | Factor::RsiOverbought => weights.rsi,
            Factor::MomentumBullish | Factor::MomentumBearish => weights.momentum,
            Factor::MacdBullish | Factor::MacdBearish => weights.macd,
            Factor::BbOversold | Factor::BbOverbought => weights.bollinger,
            Factor::HighVolume => weights.volume,
            Factor::TightSpread => weights.spread,
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type FactorScores = BTreeMap<Factor, f64>;

/// Why a signal came out as HOLD.
#[derive(Debug, Clone, PartialEq)]
pub enum HoldReason {
    InsufficientData { samples: usize, required: usize },
    SpreadTooWide { spread_bps: f64, max_bps: f64 },
    BelowThreshold { score: f64, threshold: f64 },
}

impl fmt::Display for HoldReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HoldReason::InsufficientData { samples, required } => {
                write!(f, "insufficient data ({samples}/{required} samples)")
            }
            HoldReason::SpreadTooWide { spread_bps, max_bps } => {
                write!(f, "spread too wide: {spread_bps:.1} bps >= {max_bps:.1} bps")
            }
            HoldReason::BelowThreshold { score, threshold } => {
                write!(f, "signal too weak: {score:.3} <= {threshold:.3}")
            }
        }
    }
}

/// Position facts the generator needs to pick a side.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Exposure {
    pub quantity: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl Exposure {
    pub fn is_flat(&self) -> bool {
        self.quantity <= 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub action: Action,
    pub confidence: f64,
    pub factors: FactorScores,
    pub buy_score: f64,
    pub sell_score: f64,
    pub expected_return: f64,
    pub risk_score: f64,
    pub entry_price: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub regime: MarketRegime,
    pub hold_reason: Option<HoldReason>,
    pub protective: bool,
}

impl Signal {
    pub fn is_hold(&self) -> bool {
        self.action == Action::Hold
    }
}

/// Pluggable factor-scoring step. Implementations must return scores in [0, 1].
pub trait FactorScorer {
    fn name(&self) -> &str;
    fn score(&self, snapshot: &IndicatorSnapshot, regime: MarketRegime, config: &SignalConfig) -> FactorScores;
}

/// Rule-based scorer: each factor is a clamped normalization of one indicator.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicScorer;

impl HeuristicScorer {
    const MOMENTUM_DEADBAND: f64 = 0.01;
    const MOMENTUM_SCALE: f64 = 50.0;
    const MACD_FULL_SCALE: f64 = 0.001;
    const BB_EDGE: f64 = 0.1;
    const BB_SCALE: f64 = 10.0;
    const VOLUME_SURGE: f64 = 1.5;
    const VOLUME_SCALE: f64 = 2.0;
    const TIGHT_SPREAD_FRACTION: f64 = 0.7;
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

impl FactorScorer for HeuristicScorer {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn score(&self, snap: &IndicatorSnapshot, regime: MarketRegime, config: &SignalConfig) -> FactorScores {
        let mut factors = FactorScores::new();

        let band = regime.rsi_band(config);
        if snap.rsi < band.buy && band.buy > 0.0 {
            factors.insert(Factor::RsiOversold, unit((band.buy - snap.rsi) / band.buy));
        } else if snap.rsi > band.sell && band.sell < 100.0 {
            factors.insert(Factor::RsiOverbought, unit((snap.rsi - band.sell) / (100.0 - band.sell)));
        }

        let momentum = snap.blended_momentum();
        if momentum > Self::MOMENTUM_DEADBAND {
            factors.insert(Factor::MomentumBullish, unit(momentum * Self::MOMENTUM_SCALE));
        } else if momentum < -Self::MOMENTUM_DEADBAND {
            factors.insert(Factor::MomentumBearish, unit(-momentum * Self::MOMENTUM_SCALE));
        }

        if snap.price > 0.0 {
            let relative = snap.macd_histogram / snap.price;
            if relative > 0.0 {
                factors.insert(Factor::MacdBullish, unit(relative / Self::MACD_FULL_SCALE));
            } else if relative < 0.0 {
                factors.insert(Factor::MacdBearish, unit(-relative / Self::MACD_FULL_SCALE));
            }
        }

        if snap.bb_position < Self::BB_EDGE {
            factors.insert(Factor::BbOversold, unit((Self::BB_EDGE - snap.bb_position) * Self::BB_SCALE));
        } else if snap.bb_position > 1.0 - Self::BB_EDGE {
            factors.insert(
                Factor::BbOverbought,
                unit((snap.bb_position - (1.0 - Self::BB_EDGE)) * Self::BB_SCALE),
            );
        }

        if snap.volume_ratio > Self::VOLUME_SURGE {
            factors.insert(
                Factor::HighVolume,
                unit((snap.volume_ratio - Self::VOLUME_SURGE) * Self::VOLUME_SCALE),
            );
        }

        let tight = config.max_spread_bps * Self::TIGHT_SPREAD_FRACTION;
        if tight > 0.0 && snap.spread_bps < tight {
            factors.insert(Factor::TightSpread, unit((tight - snap.spread_bps) / tight));
        }

        factors
    }
}

/// Weighted sum of the factors that count toward one side.
pub fn side_score(factors: &FactorScores, weights: &FactorWeights, side: FactorSide) -> f64 {
    factors
        .iter()
        .filter(|(f, _)| f.side() == side || f.side() == FactorSide::Both)
        .map(|(f, score)| f.weight(weights) * score)
        .sum()
}

pub struct SignalGenerator {
    signal: SignalConfig,
    regime: RegimeConfig,
    scorer: Box<dyn FactorScorer>,
}

impl fmt::Debug for SignalGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalGenerator")
            .field("scorer", &self.scorer.name())
            .field("threshold", &self.signal.threshold)
            .finish()
    }
}

impl SignalGenerator {
    pub fn new(signal: SignalConfig, regime: RegimeConfig) -> Self {
        Self::with_scorer(signal, regime, Box::new(HeuristicScorer))
    }

    pub fn with_scorer(signal: SignalConfig, regime: RegimeConfig, scorer: Box<dyn FactorScorer>) -> Self {
        Self { signal, regime, scorer }
    }

    pub fn scorer_name(&self) -> &str {
        self.scorer.name()
    }

    pub fn config(&self) -> &SignalConfig {
        &self.signal
    }

    fn hold(&self, quote: &PriceSample, regime: MarketRegime, reason: HoldReason) -> Signal {
        Signal {
            action: Action::Hold,
            confidence: 0.0,
            factors: FactorScores::new(),
            buy_score: 0.0,
            sell_score: 0.0,
            expected_return: 0.0,
            risk_score: 0.0,
            entry_price: quote.price,
            stop_loss: None,
            take_profit: None,
            regime,
            hold_reason: Some(reason),
            protective: false,
        }
    }

    fn risk_score(&self, snap: &IndicatorSnapshot) -> f64 {
        let vol = if self.regime.high_volatility > 0.0 {
            (snap.volatility / self.regime.high_volatility).min(1.0)
        } else {
            1.0
        };
        let spread = if self.signal.max_spread_bps > 0.0 {
            (snap.spread_bps / self.signal.max_spread_bps).min(1.0)
        } else {
            1.0
        };
        unit(0.6 * vol + 0.4 * spread)
    }

    fn expected_return(&self, score: f64, regime: MarketRegime) -> f64 {
        score.min(1.0) * self.signal.max_expected_return * regime.expected_return_scale(&self.regime)
    }

    fn protective_exit(&self, quote: &PriceSample, position: &Exposure) -> bool {
        if !self.signal.protective_exits || position.is_flat() {
            return false;
        }
        let stop_hit = position.stop_loss.is_some_and(|stop| quote.bid <= stop);
        let target_hit = position.take_profit.is_some_and(|target| quote.bid >= target);
        stop_hit || target_hit
    }

    pub fn generate(
        &self,
        snap: &IndicatorSnapshot,
        regime: MarketRegime,
        quote: &PriceSample,
        position: &Exposure,
    ) -> Signal {
        if snap.insufficient_data {
            return self.hold(
                quote,
                regime,
                HoldReason::InsufficientData {
                    samples: snap.samples,
                    required: snap.required,
                },
            );
        }

        let factors = self.scorer.score(snap, regime, &self.signal);
        let weights = &self.signal.weights;
        let buy_score = side_score(&factors, weights, FactorSide::Buy) * regime.score_multiplier(&self.regime, true);
        let sell_score =
            side_score(&factors, weights, FactorSide::Sell) * regime.score_multiplier(&self.regime, false);
        let risk_score = self.risk_score(snap);

        let mut signal = Signal {
            action: Action::Hold,
            confidence: 0.0,
            factors,
            buy_score,
            sell_score,
            expected_return: 0.0,
            risk_score,
            entry_price: quote.price,
            stop_loss: None,
            take_profit: None,
            regime,
            hold_reason: None,
            protective: false,
        };

        if snap.spread_bps >= self.signal.max_spread_bps {
            signal.hold_reason = Some(HoldReason::SpreadTooWide {
                spread_bps: snap.spread_bps,
                max_bps: self.signal.max_spread_bps,
            });
            return signal;
        }

        if self.protective_exit(quote, position) {
            signal.action = Action::Sell;
            signal.confidence = 1.0;
            signal.entry_price = quote.bid;
            signal.protective = true;
            return signal;
        }

        let threshold = self.signal.threshold;
        if position.is_flat() && buy_score > threshold {
            signal.action = Action::Buy;
            signal.confidence = unit(buy_score);
            signal.expected_return = self.expected_return(buy_score, regime);
            signal.entry_price = quote.ask;
            signal.stop_loss = Some(quote.ask * (1.0 - self.signal.stop_loss_pct));
            signal.take_profit = Some(quote.ask * (1.0 + self.signal.take_profit_pct));
        } else if !position.is_flat() && sell_score > threshold {
            signal.action = Action::Sell;
            signal.confidence = unit(sell_score);
            signal.expected_return = self.expected_return(sell_score, regime);
            signal.entry_price = quote.bid;
        } else {
            let score = if position.is_flat() { buy_score } else { sell_score };
            signal.hold_reason = Some(HoldReason::BelowThreshold { score, threshold });
        }

        signal
    }
}
