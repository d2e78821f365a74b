//! Trend strength from a least-squares line through recent prices.
//!
//! slope is fitted against the sample index; its magnitude is normalized by
//! the mean price and by `full_strength_slope` (the per-sample relative slope
//! that counts as a full-strength trend), then weighted by the fit's R².
//! Result is in [0, 1].

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

pub fn linear_fit(values: &[f64]) -> Option<LinearFit> {
    let n = values.len();
    if n < 2 {
        return None;
    }

    let nf = n as f64;
    let x_mean = (nf - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / nf;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        let dy = y - y_mean;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    let slope = sxy / sxx;
    // No variance in y: the line explains nothing.
    let r_squared = if syy > 0.0 {
        (sxy * sxy / (sxx * syy)).clamp(0.0, 1.0)
    } else {
        0.0
    };

    Some(LinearFit {
        slope,
        intercept: y_mean - slope * x_mean,
        r_squared,
    })
}

pub fn trend_strength(prices: &[f64], lookback: usize, full_strength_slope: f64) -> Option<f64> {
    if lookback < 2 || prices.len() < lookback || full_strength_slope <= 0.0 {
        return None;
    }

    let window = &prices[prices.len() - lookback..];
    let fit = linear_fit(window)?;
    let mean = window.iter().sum::<f64>() / lookback as f64;
    if mean == 0.0 {
        return Some(0.0);
    }

    let normalized = (fit.slope.abs() / mean.abs() / full_strength_slope).min(1.0);
    Some(normalized * fit.r_squared)
}
