//! Bollinger Bands.
//!
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//! Position = (price - lower) / (upper - lower), 0.5 when the bands collapse.
//!
//! Default parameters: period=20, multiplier=2.0

use super::stddev::population_stddev;

pub const NEUTRAL_POSITION: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bollinger {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl Bollinger {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn position(&self, price: f64) -> f64 {
        let width = self.width();
        if width <= 0.0 {
            return NEUTRAL_POSITION;
        }
        (price - self.lower) / width
    }
}

pub fn bollinger(prices: &[f64], period: usize, multiplier: f64) -> Option<Bollinger> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let window = &prices[prices.len() - period..];
    let middle = window.iter().sum::<f64>() / period as f64;
    let stddev = population_stddev(window);

    Some(Bollinger {
        upper: middle + multiplier * stddev,
        middle,
        lower: middle - multiplier * stddev,
    })
}
