//! Half-Kelly position sizing.
//!
//! f* = (p*b - q) / b with b = expected_return / expected_loss, scaled by a
//! safety factor and the regime's Kelly multiplier, then clamped to the
//! configured Kelly bounds. The dollar value is further scaled by a
//! volatility adjustment and the signal confidence, and hard-capped at the
//! max position fraction and at available cash. Sizes below the minimum trade
//! value become zero; they are never rounded up.

use crate::domain::config::SizingConfig;

/// Raw Kelly fraction. Returns `None` when there is no usable payoff ratio.
pub fn raw_kelly(win_probability: f64, expected_return: f64, expected_loss: f64) -> Option<f64> {
    if !(expected_return > 0.0 && expected_loss > 0.0) || !win_probability.is_finite() {
        return None;
    }
    let p = win_probability.clamp(0.0, 1.0);
    let q = 1.0 - p;
    let b = expected_return / expected_loss;
    Some((p * b - q) / b)
}

/// Kelly fraction after the safety factor and multiplier, clamped to
/// `[min, max]`. No edge (or invalid inputs) yields `min`.
pub fn bounded_kelly(
    win_probability: f64,
    expected_return: f64,
    expected_loss: f64,
    safety_factor: f64,
    multiplier: f64,
    min: f64,
    max: f64,
) -> f64 {
    match raw_kelly(win_probability, expected_return, expected_loss) {
        Some(f) if f > 0.0 => (f * safety_factor * multiplier).clamp(min, max),
        _ => min,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingRequest {
    pub confidence: f64,
    pub expected_return: f64,
    pub volatility: f64,
    pub regime_multiplier: f64,
    pub portfolio_value: f64,
    pub available_cash: f64,
    pub price: f64,
}

/// Which bound limited the final value, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeCap {
    PositionFraction,
    Cash,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSize {
    pub kelly_fraction: f64,
    pub volatility_adjustment: f64,
    /// Uncapped value before the minimum check.
    pub target_value: f64,
    pub value: f64,
    pub quantity: f64,
    pub capped_by: Option<SizeCap>,
}

impl PositionSize {
    pub fn is_zero(&self) -> bool {
        self.value <= 0.0 || self.quantity <= 0.0
    }
}

#[derive(Debug, Clone)]
pub struct PositionSizer {
    config: SizingConfig,
    max_position_fraction: f64,
}

impl PositionSizer {
    pub fn new(config: SizingConfig, max_position_fraction: f64) -> Self {
        Self {
            config,
            max_position_fraction,
        }
    }

    pub fn config(&self) -> &SizingConfig {
        &self.config
    }

    pub fn volatility_adjustment(&self, volatility: f64) -> f64 {
        let vol = if volatility.is_finite() { volatility } else { 0.0 };
        let floor = self.config.volatility_floor.max(f64::MIN_POSITIVE);
        (self.config.target_volatility / vol.max(floor)).min(self.config.max_volatility_adjustment)
    }

    pub fn kelly_fraction(&self, confidence: f64, expected_return: f64, regime_multiplier: f64) -> f64 {
        bounded_kelly(
            confidence,
            expected_return,
            self.config.expected_loss,
            self.config.safety_factor,
            regime_multiplier,
            self.config.min_kelly,
            self.config.max_kelly,
        )
    }

    pub fn size_entry(&self, req: &SizingRequest) -> PositionSize {
        let kelly_fraction = self.kelly_fraction(req.confidence, req.expected_return, req.regime_multiplier);
        let volatility_adjustment = self.volatility_adjustment(req.volatility);
        let confidence = req.confidence.clamp(0.0, 1.0);
        let portfolio = req.portfolio_value.max(0.0);

        let target_value = portfolio * kelly_fraction * volatility_adjustment * confidence;

        let mut value = target_value;
        let mut capped_by = None;
        let fraction_cap = portfolio * self.max_position_fraction;
        if value > fraction_cap {
            value = fraction_cap;
            capped_by = Some(SizeCap::PositionFraction);
        }
        let cash = req.available_cash.max(0.0);
        if value > cash {
            value = cash;
            capped_by = Some(SizeCap::Cash);
        }

        if value < self.config.min_trade_value || req.price <= 0.0 {
            value = 0.0;
        }

        PositionSize {
            kelly_fraction,
            volatility_adjustment,
            target_value,
            value,
            quantity: if value > 0.0 { value / req.price } else { 0.0 },
            capped_by,
        }
    }

    /// Exits always close the full holding.
    pub fn size_exit(&self, held_quantity: f64, price: f64) -> PositionSize {
        let quantity = held_quantity.max(0.0);
        PositionSize {
            kelly_fraction: 0.0,
            volatility_adjustment: 1.0,
            target_value: quantity * price,
            value: quantity * price,
            quantity,
            capped_by: None,
        }
    }
}
