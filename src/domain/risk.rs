//! Portfolio risk monitoring, per-trade gating and halt decisions.
//!
//! The [`RiskManager`] owns the [`PortfolioState`] together with a bounded
//! history of per-tick portfolio returns and drawdowns. Metrics before
//! `min_history` returns fall back to conservative defaults. Limit breaches
//! reject individual entries; the stricter halt subset stops the loop.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Duration, Utc};

use super::config::RiskConfig;
use super::indicator::stddev::{mean, population_stddev};
use super::portfolio::PortfolioState;
use super::sizing::bounded_kelly;

const DEFAULT_VAR_95: f64 = 0.02;
const DEFAULT_VAR_99: f64 = 0.04;
const DEFAULT_VOLATILITY: f64 = 0.20;

const BASELINE_WIN_RATE: f64 = 0.55;
const BASELINE_WIN: f64 = 0.02;
const BASELINE_LOSS: f64 = 0.015;
const BASELINE_SAFETY: f64 = 0.5;
const BASELINE_MIN_KELLY: f64 = 0.01;
const BASELINE_MAX_KELLY: f64 = 0.25;
// Slack for an entry sized exactly at the position cap.
const CONCENTRATION_EPSILON: f64 = 1e-9;

fn trading_day() -> Duration {
    Duration::hours(24)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Extreme,
}

impl RiskLevel {
    pub fn from_points(points: u32) -> Self {
        match points {
            0..=1 => RiskLevel::Low,
            2..=3 => RiskLevel::Medium,
            4..=5 => RiskLevel::High,
            _ => RiskLevel::Extreme,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Extreme => "EXTREME",
        })
    }
}

/// Market-side inputs to the liquidity and Kelly estimates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketConditions {
    pub spread_bps: f64,
    pub volume_ratio: f64,
}

impl Default for MarketConditions {
    fn default() -> Self {
        Self {
            spread_bps: 0.0,
            volume_ratio: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskMetrics {
    pub portfolio_value: f64,
    pub var_95: f64,
    pub var_99: f64,
    pub current_drawdown: f64,
    pub daily_drawdown: f64,
    pub max_drawdown: f64,
    pub volatility_annual: f64,
    pub sharpe_ratio: f64,
    pub kelly_fraction: f64,
    pub risk_level: RiskLevel,
    pub concentration_risk: f64,
    pub liquidity_risk: f64,
    pub history_sufficient: bool,
    pub trades_today: u32,
    pub daily_trade_limit: u32,
}

impl fmt::Display for RiskMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(48);
        writeln!(f, "RISK REPORT")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Portfolio Value:    {:.2}", self.portfolio_value)?;
        writeln!(f, "VaR (95%):          {:.2}%", self.var_95 * 100.0)?;
        writeln!(f, "VaR (99%):          {:.2}%", self.var_99 * 100.0)?;
        writeln!(f, "Current Drawdown:   {:.2}%", self.current_drawdown * 100.0)?;
        writeln!(f, "Daily Drawdown:     {:.2}%", self.daily_drawdown * 100.0)?;
        writeln!(f, "Maximum Drawdown:   {:.2}%", self.max_drawdown * 100.0)?;
        writeln!(f, "Annual Volatility:  {:.1}%", self.volatility_annual * 100.0)?;
        writeln!(f, "Sharpe Ratio:       {:.2}", self.sharpe_ratio)?;
        writeln!(f, "Optimal Kelly:      {:.1}%", self.kelly_fraction * 100.0)?;
        writeln!(f, "Risk Level:         {}", self.risk_level)?;
        writeln!(f, "Concentration Risk: {:.1}%", self.concentration_risk * 100.0)?;
        writeln!(f, "Liquidity Risk:     {:.1}%", self.liquidity_risk * 100.0)?;
        writeln!(f, "Trades Today:       {}/{}", self.trades_today, self.daily_trade_limit)?;
        if !self.history_sufficient {
            writeln!(f, "(history warming up: VaR and volatility are defaults)")?;
        }
        write!(f, "{rule}")
    }
}

/// A single hard-limit breach.
#[derive(Debug, Clone, PartialEq)]
pub enum RiskViolation {
    Var95 { value: f64, limit: f64 },
    Var99 { value: f64, limit: f64 },
    DailyDrawdown { value: f64, limit: f64 },
    TotalDrawdown { value: f64, limit: f64 },
    Concentration { value: f64, limit: f64 },
    Liquidity { value: f64, limit: f64 },
    ExtremeRiskLevel,
    DailyTradeLimit { trades: u32, limit: u32 },
}

impl fmt::Display for RiskViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskViolation::Var95 { value, limit } => write!(
                f,
                "risk limit breach: 95% VaR {:.2}% > {:.2}%",
                value * 100.0,
                limit * 100.0
            ),
            RiskViolation::Var99 { value, limit } => write!(
                f,
                "risk limit breach: 99% VaR {:.2}% > {:.2}%",
                value * 100.0,
                limit * 100.0
            ),
            RiskViolation::DailyDrawdown { value, limit } => write!(
                f,
                "risk limit breach: daily drawdown {:.2}% > {:.2}%",
                value * 100.0,
                limit * 100.0
            ),
            RiskViolation::TotalDrawdown { value, limit } => write!(
                f,
                "risk limit breach: drawdown {:.2}% > {:.2}%",
                value * 100.0,
                limit * 100.0
            ),
            RiskViolation::Concentration { value, limit } => write!(
                f,
                "risk limit breach: concentration {:.1}% > {:.1}%",
                value * 100.0,
                limit * 100.0
            ),
            RiskViolation::Liquidity { value, limit } => {
                write!(f, "risk limit breach: liquidity risk {value:.2} > {limit:.2}")
            }
            RiskViolation::ExtremeRiskLevel => write!(f, "risk limit breach: extreme risk level"),
            RiskViolation::DailyTradeLimit { trades, limit } => {
                write!(f, "daily trade limit reached: {trades}/{limit}")
            }
        }
    }
}

/// Percentile with linear interpolation between closest ranks. `q` in [0, 100].
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Historical-simulation VaR: the loss at the given percentile, never negative.
pub fn historical_var(returns: &[f64], q: f64) -> f64 {
    percentile(returns, q).map(|p| (-p).max(0.0)).unwrap_or(0.0)
}

/// Blend of thin volume and wide spread, clamped to [0, 1].
pub fn liquidity_risk(market: &MarketConditions) -> f64 {
    let volume_risk = if market.volume_ratio < 1.5 {
        ((1.5 - market.volume_ratio) / 1.5).max(0.0)
    } else {
        0.0
    };
    let spread_risk = if market.spread_bps > 10.0 {
        (market.spread_bps - 10.0) / 40.0
    } else {
        0.0
    };
    (volume_risk + spread_risk).min(1.0)
}

/// Heuristic market Kelly: fixed baseline edge trimmed by market conditions.
pub fn market_kelly(market: &MarketConditions, volatility: f64) -> f64 {
    let mut multiplier = 1.0;
    if market.spread_bps > 15.0 {
        multiplier *= 0.5;
    }
    if market.volume_ratio < 1.0 {
        multiplier *= 0.7;
    }
    if volatility > 0.3 {
        multiplier *= 0.6;
    }
    bounded_kelly(
        BASELINE_WIN_RATE,
        BASELINE_WIN,
        BASELINE_LOSS,
        BASELINE_SAFETY,
        multiplier,
        BASELINE_MIN_KELLY,
        BASELINE_MAX_KELLY,
    )
}

#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
    portfolio: PortfolioState,
    returns: VecDeque<f64>,
    drawdowns: VecDeque<f64>,
    last_value: Option<f64>,
    max_drawdown: f64,
    session_start: Option<DateTime<Utc>>,
    day_started_at: Option<DateTime<Utc>>,
    day_resets: u64,
}

impl RiskManager {
    pub fn new(config: RiskConfig, initial_cash: f64) -> Self {
        Self {
            portfolio: PortfolioState::new(initial_cash),
            returns: VecDeque::with_capacity(config.history_capacity),
            drawdowns: VecDeque::with_capacity(config.history_capacity),
            config,
            last_value: None,
            max_drawdown: 0.0,
            session_start: None,
            day_started_at: None,
            day_resets: 0,
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn portfolio(&self) -> &PortfolioState {
        &self.portfolio
    }

    pub(crate) fn portfolio_mut(&mut self) -> &mut PortfolioState {
        &mut self.portfolio
    }

    pub fn return_history(&self) -> &VecDeque<f64> {
        &self.returns
    }

    pub fn drawdown_history(&self) -> &VecDeque<f64> {
        &self.drawdowns
    }

    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown
    }

    pub fn day_started_at(&self) -> Option<DateTime<Utc>> {
        self.day_started_at
    }

    pub fn day_resets(&self) -> u64 {
        self.day_resets
    }

    pub fn reset(&mut self, initial_cash: f64) {
        *self = RiskManager::new(self.config.clone(), initial_cash);
    }

    /// Advance the rolling 24h window measured from the first timestamp seen.
    /// Returns true when the daily counters were reset.
    pub fn roll_day(&mut self, now: DateTime<Utc>, current_value: f64) -> bool {
        let Some(start) = self.session_start else {
            self.session_start = Some(now);
            self.day_started_at = Some(now);
            return false;
        };
        let day_start = self.day_started_at.unwrap_or(start);
        if now - day_start < trading_day() {
            return false;
        }

        let elapsed_days = (now - start).num_seconds() / trading_day().num_seconds();
        self.day_started_at = Some(start + Duration::seconds(elapsed_days * trading_day().num_seconds()));
        self.portfolio.trades_today = 0;
        self.portfolio.daily_start_value = current_value;
        self.day_resets += 1;
        true
    }

    /// Record one portfolio valuation: peak, drawdown and return histories.
    pub fn track_value(&mut self, value: f64) -> f64 {
        if value > self.portfolio.peak_value {
            self.portfolio.peak_value = value;
        }
        let drawdown = drawdown(self.portfolio.peak_value, value);
        push_bounded(&mut self.drawdowns, drawdown, self.config.history_capacity);
        self.max_drawdown = self.max_drawdown.max(drawdown);

        match self.last_value {
            Some(last) if last > 0.0 => {
                push_bounded(&mut self.returns, value / last - 1.0, self.config.history_capacity);
            }
            _ => {}
        }
        self.last_value = Some(value);
        drawdown
    }

    /// Tick-level monitoring at the current price; always runs.
    pub fn monitor(&mut self, price: f64, market: &MarketConditions) -> RiskMetrics {
        let value = self.portfolio.total_value(price);
        self.track_value(value);
        self.evaluate(value, self.portfolio.position_value(price), market)
    }

    /// Metrics at the current price without touching history.
    pub fn metrics(&self, price: f64, market: &MarketConditions) -> RiskMetrics {
        self.evaluate(
            self.portfolio.total_value(price),
            self.portfolio.position_value(price),
            market,
        )
    }

    pub fn evaluate(&self, value: f64, position_value: f64, market: &MarketConditions) -> RiskMetrics {
        let peak = self.portfolio.peak_value.max(value);
        let current_drawdown = drawdown(peak, value);
        let daily_start = self.portfolio.daily_start_value;
        let daily_drawdown = if daily_start > 0.0 {
            ((daily_start - value) / daily_start).max(0.0)
        } else {
            0.0
        };
        let max_drawdown = self.max_drawdown.max(current_drawdown);

        let history_sufficient = self.returns.len() >= self.config.min_history.max(1);
        let (var_95, var_99, volatility_annual, sharpe_ratio) = if history_sufficient {
            let start = self.returns.len().saturating_sub(self.config.var_lookback.max(1));
            let recent: Vec<f64> = self.returns.iter().skip(start).copied().collect();
            let sd = population_stddev(&recent);
            let annualizer = self.config.periods_per_year.sqrt();
            let sharpe = if sd > 0.0 { mean(&recent) / sd * annualizer } else { 0.0 };
            (
                historical_var(&recent, 5.0),
                historical_var(&recent, 1.0),
                sd * annualizer,
                sharpe,
            )
        } else {
            (DEFAULT_VAR_95, DEFAULT_VAR_99, DEFAULT_VOLATILITY, 0.0)
        };

        let concentration_risk = if value > 0.0 { (position_value / value).max(0.0) } else { 0.0 };
        let liquidity_risk = liquidity_risk(market);

        let mut metrics = RiskMetrics {
            portfolio_value: value,
            var_95,
            var_99,
            current_drawdown,
            daily_drawdown,
            max_drawdown,
            volatility_annual,
            sharpe_ratio,
            kelly_fraction: market_kelly(market, volatility_annual),
            risk_level: RiskLevel::Low,
            concentration_risk,
            liquidity_risk,
            history_sufficient,
            trades_today: self.portfolio.trades_today,
            daily_trade_limit: self.config.daily_trade_limit,
        };
        metrics.risk_level = self.risk_level(&metrics);
        metrics
    }

    /// Pro-forma metrics for buying `entry_value` more of the instrument:
    /// concentration and risk level as if the entry were already held.
    pub fn with_entry(&self, m: &RiskMetrics, entry_value: f64) -> RiskMetrics {
        let mut pro_forma = m.clone();
        if m.portfolio_value > 0.0 {
            let held = m.concentration_risk * m.portfolio_value;
            pro_forma.concentration_risk = ((held + entry_value) / m.portfolio_value).max(0.0);
        }
        pro_forma.risk_level = self.risk_level(&pro_forma);
        pro_forma
    }

    fn risk_level(&self, m: &RiskMetrics) -> RiskLevel {
        let c = &self.config;
        let mut points = 0;

        if m.var_95 > c.max_var_95 * 0.8 {
            points += 2;
        } else if m.var_95 > c.max_var_95 * 0.5 {
            points += 1;
        }

        if m.daily_drawdown > c.max_daily_drawdown * 0.8 {
            points += 2;
        } else if m.daily_drawdown > c.max_daily_drawdown * 0.5 {
            points += 1;
        }

        if m.volatility_annual > 0.4 {
            points += 2;
        } else if m.volatility_annual > 0.25 {
            points += 1;
        }

        if m.concentration_risk > 0.4 {
            points += 1;
        }
        if m.liquidity_risk > 0.7 {
            points += 1;
        }

        RiskLevel::from_points(points)
    }

    pub fn check_risk_limits(&self, m: &RiskMetrics) -> (bool, Vec<RiskViolation>) {
        let c = &self.config;
        let mut violations = Vec::new();

        if m.var_95 > c.max_var_95 {
            violations.push(RiskViolation::Var95 {
                value: m.var_95,
                limit: c.max_var_95,
            });
        }
        if m.var_99 > c.max_var_99 {
            violations.push(RiskViolation::Var99 {
                value: m.var_99,
                limit: c.max_var_99,
            });
        }
        if m.daily_drawdown > c.max_daily_drawdown {
            violations.push(RiskViolation::DailyDrawdown {
                value: m.daily_drawdown,
                limit: c.max_daily_drawdown,
            });
        }
        let total = m.current_drawdown.max(m.max_drawdown);
        if total > c.max_total_drawdown {
            violations.push(RiskViolation::TotalDrawdown {
                value: total,
                limit: c.max_total_drawdown,
            });
        }
        if m.concentration_risk > c.max_position_fraction + CONCENTRATION_EPSILON {
            violations.push(RiskViolation::Concentration {
                value: m.concentration_risk,
                limit: c.max_position_fraction,
            });
        }
        if m.liquidity_risk > c.max_liquidity_risk {
            violations.push(RiskViolation::Liquidity {
                value: m.liquidity_risk,
                limit: c.max_liquidity_risk,
            });
        }
        if m.risk_level == RiskLevel::Extreme {
            violations.push(RiskViolation::ExtremeRiskLevel);
        }
        if m.trades_today >= c.daily_trade_limit {
            violations.push(RiskViolation::DailyTradeLimit {
                trades: m.trades_today,
                limit: c.daily_trade_limit,
            });
        }

        (violations.is_empty(), violations)
    }

    /// Emergency subset of the limits; any single one stops trading.
    pub fn halt_reasons(&self, m: &RiskMetrics) -> Vec<RiskViolation> {
        let c = &self.config;
        let mut reasons = Vec::new();

        if m.daily_drawdown > c.max_daily_drawdown {
            reasons.push(RiskViolation::DailyDrawdown {
                value: m.daily_drawdown,
                limit: c.max_daily_drawdown,
            });
        }
        let total = m.current_drawdown.max(m.max_drawdown);
        if total > c.max_total_drawdown {
            reasons.push(RiskViolation::TotalDrawdown {
                value: total,
                limit: c.max_total_drawdown,
            });
        }
        let var_halt = c.max_var_99 * c.var_halt_multiplier;
        if m.var_99 > var_halt {
            reasons.push(RiskViolation::Var99 {
                value: m.var_99,
                limit: var_halt,
            });
        }
        if m.risk_level == RiskLevel::Extreme {
            reasons.push(RiskViolation::ExtremeRiskLevel);
        }
        if m.liquidity_risk > c.halt_liquidity_risk {
            reasons.push(RiskViolation::Liquidity {
                value: m.liquidity_risk,
                limit: c.halt_liquidity_risk,
            });
        }
        reasons
    }

    pub fn should_halt_trading(&self, m: &RiskMetrics) -> bool {
        !self.halt_reasons(m).is_empty()
    }
}

fn drawdown(peak: f64, value: f64) -> f64 {
    if peak > 0.0 {
        ((peak - value) / peak).max(0.0)
    } else {
        0.0
    }
}

fn push_bounded(history: &mut VecDeque<f64>, value: f64, capacity: usize) {
    if capacity == 0 {
        return;
    }
    while history.len() >= capacity {
        history.pop_front();
    }
    history.push_back(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn manager(initial: f64) -> RiskManager {
        RiskManager::new(RiskConfig::default(), initial)
    }

    fn calm() -> MarketConditions {
        MarketConditions {
            spread_bps: 2.0,
            volume_ratio: 1.6,
        }
    }

    fn t(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hours)
    }

    #[test]
    fn percentile_linear_interpolation() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(percentile(&v, 0.0).unwrap(), 1.0);
        assert_relative_eq!(percentile(&v, 50.0).unwrap(), 3.0);
        assert_relative_eq!(percentile(&v, 100.0).unwrap(), 5.0);
        // rank = 0.05 * 4 = 0.2
        assert_relative_eq!(percentile(&v, 5.0).unwrap(), 1.2);
        assert_eq!(percentile(&[], 5.0), None);
    }

    #[test]
    fn entry_counts_toward_concentration() {
        let rm = manager(10_000.0);
        let flat = rm.evaluate(10_000.0, 0.0, &calm());
        assert_eq!(flat.concentration_risk, 0.0);

        let small = rm.with_entry(&flat, 2_000.0);
        assert_relative_eq!(small.concentration_risk, 0.2);
        assert!(rm.check_risk_limits(&small).0);

        let large = rm.with_entry(&flat, 3_000.0);
        assert_relative_eq!(large.concentration_risk, 0.3);
        let (ok, violations) = rm.check_risk_limits(&large);
        assert!(!ok);
        assert!(violations
            .iter()
            .any(|v| matches!(v, RiskViolation::Concentration { .. })));
    }

    #[test]
    fn var_is_floored_at_zero() {
        assert_eq!(historical_var(&[0.01, 0.02, 0.03], 5.0), 0.0);
        assert_relative_eq!(historical_var(&[-0.05, 0.01, 0.02], 0.0), 0.05);
    }

    #[test]
    fn liquidity_blend() {
        assert_eq!(liquidity_risk(&calm()), 0.0);
        let thin = MarketConditions {
            spread_bps: 30.0,
            volume_ratio: 0.75,
        };
        // 0.5 + 0.5
        assert_relative_eq!(liquidity_risk(&thin), 1.0);
        let wide = MarketConditions {
            spread_bps: 90.0,
            volume_ratio: 0.0,
        };
        assert_eq!(liquidity_risk(&wide), 1.0);
    }

    #[test]
    fn market_kelly_adjustments() {
        // (0.55 * 0.02 - 0.45 * 0.015) / 0.02 = 0.2125; half = 0.10625
        assert_relative_eq!(market_kelly(&calm(), 0.2), 0.10625, epsilon = 1e-12);
        let rough = MarketConditions {
            spread_bps: 20.0,
            volume_ratio: 0.5,
        };
        assert_relative_eq!(
            market_kelly(&rough, 0.5),
            0.10625 * 0.5 * 0.7 * 0.6,
            epsilon = 1e-12
        );
    }

    #[test]
    fn defaults_before_history() {
        let rm = manager(1000.0);
        let m = rm.metrics(100.0, &calm());
        assert!(!m.history_sufficient);
        assert_eq!(m.var_95, 0.02);
        assert_eq!(m.var_99, 0.04);
        assert_eq!(m.volatility_annual, 0.20);
        assert_eq!(m.sharpe_ratio, 0.0);
        assert_eq!(m.concentration_risk, 0.0);
        // default VaR alone scores two points
        assert_eq!(m.risk_level, RiskLevel::Medium);
        let (ok, violations) = rm.check_risk_limits(&m);
        assert!(ok, "{:?}", violations);
    }

    #[test]
    fn daily_drawdown_six_percent_halts() {
        let rm = manager(1000.0);
        let m = rm.evaluate(940.0, 0.0, &calm());
        assert_relative_eq!(m.daily_drawdown, 0.06, epsilon = 1e-12);
        assert!(rm.should_halt_trading(&m));
        assert!(matches!(
            rm.halt_reasons(&m)[0],
            RiskViolation::DailyDrawdown { .. }
        ));
    }

    #[test]
    fn total_drawdown_halts_regardless() {
        let mut rm = manager(1000.0);
        rm.track_value(2000.0);
        let mut m = rm.evaluate(1600.0, 0.0, &calm());
        // isolate the total drawdown condition
        m.daily_drawdown = 0.0;
        m.var_99 = 0.0;
        m.liquidity_risk = 0.0;
        m.risk_level = RiskLevel::Low;
        assert!(m.current_drawdown > 0.15);
        assert!(rm.should_halt_trading(&m));
    }

    #[test]
    fn peak_and_drawdown_tracking() {
        let mut rm = manager(100.0);
        assert_relative_eq!(rm.track_value(110.0), 0.0);
        assert_relative_eq!(rm.track_value(99.0), 0.1, epsilon = 1e-12);
        assert_relative_eq!(rm.track_value(104.5), 0.05, epsilon = 1e-12);
        assert_eq!(rm.portfolio().peak_value, 110.0);
        assert_relative_eq!(rm.max_drawdown(), 0.1, epsilon = 1e-12);
        assert_eq!(rm.drawdown_history().len(), 3);
        assert_eq!(rm.return_history().len(), 2);
    }

    #[test]
    fn histories_are_bounded() {
        let config = RiskConfig {
            history_capacity: 5,
            ..RiskConfig::default()
        };
        let mut rm = RiskManager::new(config, 100.0);
        for i in 0..20 {
            rm.track_value(100.0 + i as f64);
        }
        assert_eq!(rm.return_history().len(), 5);
        assert_eq!(rm.drawdown_history().len(), 5);
    }

    #[test]
    fn historical_metrics_after_min_history() {
        let config = RiskConfig {
            min_history: 5,
            periods_per_year: 1.0,
            ..RiskConfig::default()
        };
        let mut rm = RiskManager::new(config, 100.0);
        let mut v = 100.0;
        for r in [0.01, -0.03, 0.02, -0.01, 0.015, -0.02] {
            v *= 1.0 + r;
            rm.track_value(v);
        }
        let m = rm.evaluate(v, 0.0, &calm());
        assert!(m.history_sufficient);
        assert!(m.var_95 > 0.02 && m.var_95 < 0.03, "var_95 {}", m.var_95);
        assert!(m.var_99 >= m.var_95);
        assert!(m.volatility_annual > 0.0);
    }

    #[test]
    fn violations_collected() {
        let rm = manager(1000.0);
        let mut m = rm.evaluate(1000.0, 0.0, &calm());
        m.concentration_risk = 0.5;
        m.trades_today = 8;
        m.liquidity_risk = 0.85;
        let (ok, violations) = rm.check_risk_limits(&m);
        assert!(!ok);
        assert_eq!(violations.len(), 3);
        let text: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
        assert!(text.iter().any(|t| t.contains("daily trade limit reached")));
        assert!(text.iter().any(|t| t.contains("concentration")));
        // trade count alone never halts
        assert!(!rm.should_halt_trading(&m));
    }

    #[test]
    fn risk_level_points() {
        assert_eq!(RiskLevel::from_points(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_points(2), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_points(4), RiskLevel::High);
        assert_eq!(RiskLevel::from_points(6), RiskLevel::Extreme);
        assert_eq!(RiskLevel::from_points(8), RiskLevel::Extreme);
    }

    #[test]
    fn extreme_level_halts() {
        let rm = manager(1000.0);
        let stressed = MarketConditions {
            spread_bps: 60.0,
            volume_ratio: 0.1,
        };
        // default VaR 2, daily drawdown 4.5% 2, concentration 1, liquidity 1
        let m = rm.evaluate(955.0, 900.0, &stressed);
        assert_eq!(m.risk_level, RiskLevel::Extreme);
        assert!(rm.should_halt_trading(&m));
    }

    #[test]
    fn rolling_day_resets_once_per_window() {
        let mut rm = manager(1000.0);
        assert!(!rm.roll_day(t(0), 1000.0));
        rm.portfolio_mut().trades_today = 5;
        assert!(!rm.roll_day(t(23), 1000.0));
        assert_eq!(rm.portfolio().trades_today, 5);
        assert!(rm.roll_day(t(24), 990.0));
        assert_eq!(rm.portfolio().trades_today, 0);
        assert_eq!(rm.portfolio().daily_start_value, 990.0);
        assert!(!rm.roll_day(t(30), 990.0));
        // a long gap skips whole days but resets only once
        assert!(rm.roll_day(t(75), 980.0));
        assert_eq!(rm.day_started_at(), Some(t(72)));
        assert_eq!(rm.day_resets(), 2);
    }

    #[test]
    fn report_renders() {
        let rm = manager(1000.0);
        let text = rm.metrics(100.0, &calm()).to_string();
        assert!(text.contains("RISK REPORT"));
        assert!(text.contains("VaR (95%):          2.00%"));
        assert!(text.contains("Trades Today:       0/8"));
    }
}
