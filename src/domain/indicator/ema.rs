//! Simple and exponential moving averages.
//!
//! k = 2/(n+1), seeded with the first value of the input, then
//! EMA[i] = x[i]*k + EMA[i-1]*(1-k). Seeding with the first value lets the
//! average run over a window shorter than the period.

pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let tail = &values[values.len() - period..];
    Some(tail.iter().sum::<f64>() / period as f64)
}

pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.is_empty() {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut ema = values[0];
    out.push(ema);
    for &v in &values[1..] {
        ema = v * k + ema * (1.0 - k);
        out.push(ema);
    }
    out
}

pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    ema_series(values, period).last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_over_trailing_period() {
        let v = sma(&[1.0, 2.0, 3.0, 4.0], 2).unwrap();
        assert!((v - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn sma_needs_full_period() {
        assert_eq!(sma(&[1.0, 2.0], 3), None);
        assert_eq!(sma(&[1.0, 2.0], 0), None);
    }

    #[test]
    fn ema_period_1_tracks_input() {
        let series = ema_series(&[10.0, 20.0, 30.0], 1);
        assert_eq!(series, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn ema_seed_is_first_value() {
        let series = ema_series(&[10.0, 20.0, 30.0], 3);
        assert!((series[0] - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_recursive_calculation() {
        let series = ema_series(&[10.0, 20.0, 30.0], 3);
        let k = 2.0 / 4.0;
        let e1 = 20.0 * k + 10.0 * (1.0 - k);
        let e2 = 30.0 * k + e1 * (1.0 - k);
        assert!((series[1] - e1).abs() < f64::EPSILON);
        assert!((series[2] - e2).abs() < f64::EPSILON);
        assert!((ema(&[10.0, 20.0, 30.0], 3).unwrap() - e2).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_equal_prices() {
        for v in ema_series(&[100.0; 5], 3) {
            assert!((v - 100.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn ema_empty_and_zero_period() {
        assert!(ema_series(&[], 3).is_empty());
        assert!(ema_series(&[10.0, 20.0], 0).is_empty());
        assert_eq!(ema(&[], 3), None);
    }
}
