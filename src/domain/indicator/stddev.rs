//! Mean, population standard deviation and return volatility.
//!
//! STDDEV = sqrt(sum((x - mean)^2) / n), population form (divides by n).
//! Annualized volatility = STDDEV(returns) * sqrt(periods_per_year).

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn population_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values
        .iter()
        .map(|v| {
            let diff = v - m;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

/// Simple period-over-period returns; a zero previous value yields 0.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|w| if w[0] != 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

/// Annualized volatility of the last `lookback` returns.
pub fn annualized_volatility(returns: &[f64], lookback: usize, periods_per_year: f64) -> f64 {
    let start = returns.len().saturating_sub(lookback);
    population_stddev(&returns[start..]) * periods_per_year.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn stddev_constant_values() {
        assert!(population_stddev(&[100.0, 100.0, 100.0]).abs() < f64::EPSILON);
    }

    #[test]
    fn stddev_basic_calculation() {
        let sma: f64 = (10.0 + 20.0 + 30.0) / 3.0;
        let expected: f64 =
            (((10.0 - sma).powi(2) + (20.0 - sma).powi(2) + (30.0 - sma).powi(2)) / 3.0).sqrt();
        assert!((population_stddev(&[10.0, 20.0, 30.0]) - expected).abs() < 1e-10);
    }

    #[test]
    fn stddev_known_values() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((population_stddev(&v) - 2.0).abs() < 1e-10);
    }

    #[test]
    fn single_value_has_no_dispersion() {
        assert_eq!(population_stddev(&[42.0]), 0.0);
    }

    #[test]
    fn returns_between_prices() {
        let r = simple_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(r.len(), 2);
        assert!((r[0] - 0.10).abs() < 1e-12);
        assert!((r[1] - (-0.10)).abs() < 1e-12);
    }

    #[test]
    fn returns_skip_zero_base() {
        let r = simple_returns(&[0.0, 10.0]);
        assert_eq!(r, vec![0.0]);
    }

    #[test]
    fn volatility_uses_only_lookback() {
        // Only the trailing two returns are identical, so their stddev is zero.
        let returns = [0.05, -0.05, 0.01, 0.01];
        assert!(annualized_volatility(&returns, 2, 252.0).abs() < 1e-12);
        assert!(annualized_volatility(&returns, 4, 252.0) > 0.0);
    }

    #[test]
    fn volatility_scales_with_sqrt_periods() {
        let returns = [0.01, -0.01, 0.01, -0.01];
        let daily = annualized_volatility(&returns, 4, 1.0);
        let annual = annualized_volatility(&returns, 4, 252.0);
        assert!((annual - daily * 252.0_f64.sqrt()).abs() < 1e-12);
    }
}
