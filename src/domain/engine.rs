//! Single-instrument trading engine.
//!
//! One [`TradingEngine`] owns every piece of mutable state for one instrument:
//! the sample window, the latest regime and indicators, and the risk manager
//! (which in turn owns the portfolio). `tick` runs one evaluation cycle to
//! completion; there is no shared or global state.

use chrono::{DateTime, Utc};

use super::config::EngineConfig;
use super::config_validation::validate_engine_config;
use super::error::{DataGap, EngineError};
use super::indicator::{self, IndicatorSnapshot};
use super::portfolio::{PortfolioState, TradeRecord, TradeTicket};
use super::regime::{self, MarketRegime};
use super::risk::{MarketConditions, RiskManager, RiskMetrics, RiskViolation};
use super::sample::PriceSample;
use super::signal::{Action, FactorScorer, Signal, SignalGenerator};
use super::sizing::{PositionSize, PositionSizer, SizingRequest};
use super::window::MarketWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Running,
    /// A halt condition fired; only `reset` resumes evaluation.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderTarget {
    Quantity(f64),
    Notional(f64),
}

/// An approved order, already booked as an estimate under `trade_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRequest {
    pub trade_id: u64,
    pub action: Action,
    pub instrument: String,
    pub target: OrderTarget,
    pub limit_price_hint: Option<f64>,
    pub signal_confidence: f64,
    pub regime: MarketRegime,
}

/// Executor ground truth for a booked trade. A zero quantity cancels it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub trade_id: u64,
    pub filled_quantity: f64,
    pub fill_price: f64,
    pub fees: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Hold,
    Approved {
        request: ExecutionRequest,
        size: PositionSize,
    },
    Rejected {
        violations: Vec<RiskViolation>,
        size: PositionSize,
    },
    BelowMinimum {
        size: PositionSize,
        min_trade_value: f64,
    },
}

impl Decision {
    pub fn request(&self) -> Option<&ExecutionRequest> {
        match self {
            Decision::Approved { request, .. } => Some(request),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Gap(DataGap),
    Stopped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub timestamp: DateTime<Utc>,
    pub regime: MarketRegime,
    pub indicators: IndicatorSnapshot,
    pub signal: Signal,
    pub decision: Decision,
    pub metrics: RiskMetrics,
    /// Non-empty when this tick stopped the engine.
    pub halt_reasons: Vec<RiskViolation>,
}

impl TickReport {
    pub fn halted(&self) -> bool {
        !self.halt_reasons.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Skipped(SkipReason),
    Evaluated(Box<TickReport>),
}

/// Read-only view for observers. Taking one has no side effects.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub instrument: String,
    pub state: EngineState,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub regime: MarketRegime,
    pub indicators: IndicatorSnapshot,
    pub signal: Option<Signal>,
    pub metrics: RiskMetrics,
    pub portfolio: PortfolioState,
    pub halt_reasons: Vec<RiskViolation>,
}

#[derive(Debug)]
pub struct TradingEngine {
    config: EngineConfig,
    window: MarketWindow,
    generator: SignalGenerator,
    sizer: PositionSizer,
    risk: RiskManager,
    state: EngineState,
    regime: MarketRegime,
    indicators: IndicatorSnapshot,
    last_signal: Option<Signal>,
    last_metrics: RiskMetrics,
    last_timestamp: Option<DateTime<Utc>>,
    halt_reasons: Vec<RiskViolation>,
}

impl TradingEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let generator = SignalGenerator::new(config.signal.clone(), config.regime.clone());
        Self::build(config, generator)
    }

    /// Build an engine with a custom factor scorer in place of the heuristic one.
    pub fn with_scorer(config: EngineConfig, scorer: Box<dyn FactorScorer>) -> Result<Self, EngineError> {
        let generator = SignalGenerator::with_scorer(config.signal.clone(), config.regime.clone(), scorer);
        Self::build(config, generator)
    }

    fn build(config: EngineConfig, generator: SignalGenerator) -> Result<Self, EngineError> {
        validate_engine_config(&config)?;
        let risk = RiskManager::new(config.risk.clone(), config.initial_cash);
        let last_metrics = risk.evaluate(config.initial_cash, 0.0, &MarketConditions::default());
        tracing::info!(
            instrument = %config.instrument,
            initial_cash = config.initial_cash,
            scorer = generator.scorer_name(),
            "engine created"
        );
        Ok(Self {
            window: MarketWindow::new(config.window_capacity),
            sizer: PositionSizer::new(config.sizing.clone(), config.risk.max_position_fraction),
            generator,
            risk,
            state: EngineState::Running,
            regime: MarketRegime::default(),
            indicators: IndicatorSnapshot::neutral(),
            last_signal: None,
            last_metrics,
            last_timestamp: None,
            halt_reasons: Vec::new(),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn instrument(&self) -> &str {
        &self.config.instrument
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn regime(&self) -> MarketRegime {
        self.regime
    }

    pub fn window(&self) -> &MarketWindow {
        &self.window
    }

    pub fn portfolio(&self) -> &PortfolioState {
        self.risk.portfolio()
    }

    pub fn risk(&self) -> &RiskManager {
        &self.risk
    }

    pub fn metrics(&self) -> &RiskMetrics {
        &self.last_metrics
    }

    pub fn halt_reasons(&self) -> &[RiskViolation] {
        &self.halt_reasons
    }

    /// Return to the freshly constructed state, keeping the configuration.
    pub fn reset(&mut self) {
        self.window.clear();
        self.risk.reset(self.config.initial_cash);
        self.state = EngineState::Running;
        self.regime = MarketRegime::default();
        self.indicators = IndicatorSnapshot::neutral();
        self.last_signal = None;
        self.last_metrics = self
            .risk
            .evaluate(self.config.initial_cash, 0.0, &MarketConditions::default());
        self.last_timestamp = None;
        self.halt_reasons.clear();
        tracing::info!(instrument = %self.config.instrument, "engine reset");
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            instrument: self.config.instrument.clone(),
            state: self.state,
            last_timestamp: self.last_timestamp,
            regime: self.regime,
            indicators: self.indicators.clone(),
            signal: self.last_signal.clone(),
            metrics: self.last_metrics.clone(),
            portfolio: self.risk.portfolio().clone(),
            halt_reasons: self.halt_reasons.clone(),
        }
    }

    /// Skip a tick without touching the window, indicators or regime.
    pub fn skip(&mut self, gap: DataGap) -> TickOutcome {
        tracing::warn!(instrument = %self.config.instrument, "tick skipped: {}", gap);
        TickOutcome::Skipped(SkipReason::Gap(gap))
    }

    /// Run one evaluation cycle. `None` means the feed had no sample.
    pub fn tick(&mut self, sample: Option<PriceSample>) -> Result<TickOutcome, EngineError> {
        if self.state == EngineState::Stopped {
            return Ok(TickOutcome::Skipped(SkipReason::Stopped));
        }
        let Some(sample) = sample else {
            return Ok(self.skip(DataGap::Missing {
                reason: "feed returned no sample".to_string(),
            }));
        };

        sample.validate()?;
        if let Some(previous) = self.last_timestamp {
            if sample.timestamp < previous {
                return Err(EngineError::OutOfOrderSample {
                    previous,
                    received: sample.timestamp,
                });
            }
            if sample.timestamp == previous {
                return Ok(self.skip(DataGap::Stale {
                    timestamp: sample.timestamp,
                }));
            }
        }
        self.last_timestamp = Some(sample.timestamp);

        self.window.push(sample.clone());
        let snapshot = indicator::compute(&self.window, &self.config.indicators);
        let regime = regime::classify(&snapshot, &self.config.regime);
        if regime != self.regime {
            tracing::info!(from = %self.regime, to = %regime, "regime change");
        }
        self.regime = regime;

        let market = MarketConditions {
            spread_bps: snapshot.spread_bps,
            volume_ratio: snapshot.volume_ratio,
        };
        let current_value = self.risk.portfolio().total_value(sample.price);
        if self.risk.roll_day(sample.timestamp, current_value) {
            tracing::info!(value = current_value, "daily trade counter reset");
        }

        let exposure = self.risk.portfolio().exposure();
        let signal = self.generator.generate(&snapshot, regime, &sample, &exposure);
        tracing::debug!(
            ts = %sample.timestamp,
            price = sample.price,
            regime = %regime,
            action = %signal.action,
            buy = signal.buy_score,
            sell = signal.sell_score,
            "tick evaluated"
        );

        let decision = match signal.action {
            Action::Hold => Decision::Hold,
            Action::Buy => self.decide_entry(&sample, &signal, &snapshot, &market),
            Action::Sell => self.decide_exit(&sample, &signal),
        };

        let metrics = self.risk.monitor(sample.price, &market);
        let halt_reasons = self.risk.halt_reasons(&metrics);
        if !halt_reasons.is_empty() {
            self.state = EngineState::Stopped;
            for reason in &halt_reasons {
                tracing::error!(instrument = %self.config.instrument, "trading halted: {}", reason);
            }
        }

        self.indicators = snapshot.clone();
        self.last_signal = Some(signal.clone());
        self.last_metrics = metrics.clone();
        self.halt_reasons = halt_reasons.clone();

        Ok(TickOutcome::Evaluated(Box::new(TickReport {
            timestamp: sample.timestamp,
            regime,
            indicators: snapshot,
            signal,
            decision,
            metrics,
            halt_reasons,
        })))
    }

    fn decide_entry(
        &mut self,
        sample: &PriceSample,
        signal: &Signal,
        snapshot: &IndicatorSnapshot,
        market: &MarketConditions,
    ) -> Decision {
        let metrics = self.risk.metrics(sample.price, market);
        let portfolio = self.risk.portfolio();
        let request = SizingRequest {
            confidence: signal.confidence,
            expected_return: signal.expected_return,
            volatility: snapshot.volatility,
            regime_multiplier: signal.regime.kelly_multiplier(&self.config.regime),
            portfolio_value: metrics.portfolio_value,
            available_cash: portfolio.cash_balance * (1.0 - self.config.sizing.cash_reserve),
            price: signal.entry_price,
        };
        let size = self.sizer.size_entry(&request);
        if size.is_zero() {
            tracing::debug!(target_value = size.target_value, "entry below minimum trade value");
            return Decision::BelowMinimum {
                size,
                min_trade_value: self.config.sizing.min_trade_value,
            };
        }

        let metrics = self.risk.with_entry(&metrics, size.value);
        let (within_limits, violations) = self.risk.check_risk_limits(&metrics);
        if !within_limits {
            for violation in &violations {
                tracing::warn!(action = %signal.action, "entry rejected: {}", violation);
            }
            return Decision::Rejected { violations, size };
        }

        self.book(sample, signal, size)
    }

    fn decide_exit(&mut self, sample: &PriceSample, signal: &Signal) -> Decision {
        let held = self.risk.portfolio().position_quantity;
        let size = self.sizer.size_exit(held, signal.entry_price);
        if size.is_zero() {
            return Decision::BelowMinimum {
                size,
                min_trade_value: self.config.sizing.min_trade_value,
            };
        }
        self.book(sample, signal, size)
    }

    fn book(&mut self, sample: &PriceSample, signal: &Signal, size: PositionSize) -> Decision {
        let trade_id = self.risk.portfolio_mut().book_estimate(TradeTicket {
            timestamp: sample.timestamp,
            action: signal.action,
            quantity: size.quantity,
            price: signal.entry_price,
            regime: signal.regime,
            confidence: signal.confidence,
            protective: signal.protective,
            stop_loss: signal.stop_loss,
            take_profit: signal.take_profit,
        });
        tracing::info!(
            trade_id,
            action = %signal.action,
            quantity = size.quantity,
            price = signal.entry_price,
            value = size.value,
            confidence = signal.confidence,
            regime = %signal.regime,
            protective = signal.protective,
            "order approved"
        );
        Decision::Approved {
            request: ExecutionRequest {
                trade_id,
                action: signal.action,
                instrument: self.config.instrument.clone(),
                target: OrderTarget::Quantity(size.quantity),
                limit_price_hint: Some(signal.entry_price),
                signal_confidence: signal.confidence,
                regime: signal.regime,
            },
            size,
        }
    }

    /// Replace a booked estimate with the executor's fill.
    pub fn reconcile_fill(&mut self, fill: &Fill) -> Result<TradeRecord, EngineError> {
        let record = self
            .risk
            .portfolio_mut()
            .apply_fill(fill.trade_id, fill.filled_quantity, fill.fill_price, fill.fees)?
            .clone();
        tracing::info!(
            trade_id = record.id,
            status = ?record.status,
            quantity = record.quantity,
            price = record.price,
            fees = record.fees,
            pnl = ?record.realized_pnl,
            "fill reconciled"
        );
        self.refresh_metrics();
        Ok(record)
    }

    /// Re-evaluate metrics and halt conditions at the latest price after the
    /// portfolio changed outside a tick. History is left untouched.
    fn refresh_metrics(&mut self) {
        let Some(price) = self.window.latest().map(|s| s.price) else {
            return;
        };
        let market = MarketConditions {
            spread_bps: self.indicators.spread_bps,
            volume_ratio: self.indicators.volume_ratio,
        };
        let metrics = self.risk.metrics(price, &market);
        let halt_reasons = self.risk.halt_reasons(&metrics);
        if !halt_reasons.is_empty() {
            if self.state == EngineState::Running {
                for reason in &halt_reasons {
                    tracing::error!(instrument = %self.config.instrument, "trading halted after fill: {}", reason);
                }
            }
            self.state = EngineState::Stopped;
            self.halt_reasons = halt_reasons;
        }
        self.last_metrics = metrics;
    }

    /// Cancel a booked estimate, e.g. when the executor rejected the order.
    pub fn cancel_trade(&mut self, trade_id: u64) -> Result<TradeRecord, EngineError> {
        self.reconcile_fill(&Fill {
            trade_id,
            filled_quantity: 0.0,
            fill_price: 0.0,
            fees: 0.0,
        })
    }
}
