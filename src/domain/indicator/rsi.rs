//! RSI (Relative Strength Index) over a rolling window of price changes.
//!
//! Uses simple averages of the last n gains and losses:
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100, unless avg_gain is also 0 (flat prices), then 50.
//!
//! Needs n + 1 prices (n deltas); returns `None` before that.

pub const NEUTRAL_RSI: f64 = 50.0;

pub fn rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let tail = &prices[prices.len() - (period + 1)..];
    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;
    for w in tail.windows(2) {
        let change = w[1] - w[0];
        if change > 0.0 {
            gain_sum += change;
        } else {
            loss_sum -= change;
        }
    }

    let avg_gain = gain_sum / period as f64;
    let avg_loss = loss_sum / period as f64;

    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            return Some(NEUTRAL_RSI);
        }
        return Some(100.0);
    }

    Some(100.0 - (100.0 / (1.0 + avg_gain / avg_loss)))
}
