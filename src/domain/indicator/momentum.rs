//! Momentum (rate of change) over a fixed lookback.
//!
//! MOMENTUM(n) = P[-1] / P[-n] - 1, where P[-n] is the n-th most recent price.
//! If P[-n] == 0: MOMENTUM = 0
//! Needs at least n prices.

pub fn momentum(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let base = prices[prices.len() - period];
    let last = prices[prices.len() - 1];
    if base == 0.0 {
        return Some(0.0);
    }
    Some(last / base - 1.0)
}
