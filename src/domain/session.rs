//! Session loop: drives one engine from a feed to an executor.
//!
//! The stop signal is checked once per tick boundary, so a stop never leaves
//! a half-evaluated tick behind. Executor failures cancel the outstanding
//! estimate before the error is returned.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::engine::{Decision, EngineState, SkipReason, TickOutcome, TradingEngine};
use super::error::{DataGap, EngineError};
use super::portfolio::TradeStatus;
use super::regime::MarketRegime;
use super::risk::RiskViolation;
use super::signal::Action;
use crate::ports::config_port::ConfigPort;
use crate::ports::execution_port::ExecutionPort;
use crate::ports::market_data_port::{FeedEvent, MarketDataPort};
use crate::ports::snapshot_sink::SnapshotSink;

/// Cooperative stop flag shared with whoever may end the session.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Publish a snapshot every this many evaluated ticks; 0 disables.
    pub status_interval: u64,
    pub max_ticks: Option<u64>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            status_interval: 6,
            max_ticks: None,
        }
    }
}

impl SessionOptions {
    pub fn from_port(port: &dyn ConfigPort) -> Result<Self, EngineError> {
        let d = SessionOptions::default();
        let interval = port.get_int("session", "status_interval", d.status_interval as i64);
        let status_interval = u64::try_from(interval).map_err(|_| {
            EngineError::invalid("session", "status_interval", "status_interval must be non-negative")
        })?;
        let max_ticks = port.get_int("session", "max_ticks", 0);
        let max_ticks = match u64::try_from(max_ticks) {
            Ok(0) => None,
            Ok(n) => Some(n),
            Err(_) => {
                return Err(EngineError::invalid(
                    "session",
                    "max_ticks",
                    "max_ticks must be non-negative",
                ));
            }
        };
        Ok(Self {
            status_interval,
            max_ticks,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    FeedExhausted,
    StopRequested,
    MaxTicks,
    Halted(Vec<RiskViolation>),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::FeedExhausted => write!(f, "feed exhausted"),
            StopReason::StopRequested => write!(f, "stop requested"),
            StopReason::MaxTicks => write!(f, "tick limit reached"),
            StopReason::Halted(reasons) => {
                let joined: Vec<String> = reasons.iter().map(|r| r.to_string()).collect();
                write!(f, "halted ({})", joined.join("; "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub instrument: String,
    pub ticks: u64,
    pub evaluated: u64,
    pub skipped: u64,
    pub trades: u64,
    pub cancelled: u64,
    pub rejected: u64,
    pub below_minimum: u64,
    pub initial_value: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub realized_pnl: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub closed_trades: usize,
    pub win_rate: f64,
    pub trades_per_regime: BTreeMap<MarketRegime, u64>,
    pub stop_reason: StopReason,
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Session Results: {} ===", self.instrument)?;
        writeln!(
            f,
            "Ticks:            {} ({} evaluated, {} skipped)",
            self.ticks, self.evaluated, self.skipped
        )?;
        writeln!(f, "Final Value:      {:.2}", self.final_value)?;
        writeln!(f, "Total Return:     {:.2}%", self.total_return * 100.0)?;
        writeln!(f, "Realized P&L:     {:.2}", self.realized_pnl)?;
        writeln!(f, "Sharpe Ratio:     {:.2}", self.sharpe_ratio)?;
        writeln!(f, "Max Drawdown:     -{:.1}%", self.max_drawdown * 100.0)?;
        writeln!(
            f,
            "Trades:           {} filled, {} cancelled, {} rejected, {} below minimum",
            self.trades, self.cancelled, self.rejected, self.below_minimum
        )?;
        writeln!(
            f,
            "Win Rate:         {:.1}% of {} closed",
            self.win_rate * 100.0,
            self.closed_trades
        )?;
        for (regime, count) in &self.trades_per_regime {
            writeln!(f, "  {:<16}{}", regime.as_str(), count)?;
        }
        write!(f, "Stopped:          {}", self.stop_reason)
    }
}

#[derive(Default)]
struct Counters {
    ticks: u64,
    evaluated: u64,
    skipped: u64,
    trades: u64,
    cancelled: u64,
    rejected: u64,
    below_minimum: u64,
    per_regime: BTreeMap<MarketRegime, u64>,
}

pub fn run_session(
    engine: &mut TradingEngine,
    feed: &mut dyn MarketDataPort,
    executor: &mut dyn ExecutionPort,
    sink: &mut dyn SnapshotSink,
    stop: &StopSignal,
    options: &SessionOptions,
) -> Result<SessionReport, EngineError> {
    let mut counters = Counters::default();
    tracing::info!(instrument = engine.instrument(), "session started");

    let stop_reason = loop {
        if stop.is_stopped() {
            break StopReason::StopRequested;
        }
        if options.max_ticks.is_some_and(|max| counters.ticks >= max) {
            break StopReason::MaxTicks;
        }

        let outcome = match feed.next_event()? {
            FeedEvent::Sample(sample) => engine.tick(Some(sample))?,
            FeedEvent::Gap(reason) => engine.skip(DataGap::Missing { reason }),
            FeedEvent::Exhausted => break StopReason::FeedExhausted,
        };
        counters.ticks += 1;

        let report = match outcome {
            TickOutcome::Evaluated(report) => report,
            TickOutcome::Skipped(SkipReason::Gap(_)) => {
                counters.skipped += 1;
                continue;
            }
            TickOutcome::Skipped(SkipReason::Stopped) => {
                break StopReason::Halted(engine.halt_reasons().to_vec());
            }
        };
        counters.evaluated += 1;

        match &report.decision {
            Decision::Approved { request, .. } => {
                let fill = match executor.execute(request) {
                    Ok(fill) => fill,
                    Err(err) => {
                        engine.cancel_trade(request.trade_id)?;
                        return Err(err);
                    }
                };
                let record = engine.reconcile_fill(&fill)?;
                if record.status == TradeStatus::Cancelled {
                    counters.cancelled += 1;
                } else {
                    counters.trades += 1;
                    *counters.per_regime.entry(record.regime).or_default() += 1;
                }
            }
            Decision::Rejected { .. } => counters.rejected += 1,
            Decision::BelowMinimum { .. } => counters.below_minimum += 1,
            Decision::Hold => {}
        }

        if options.status_interval > 0 && counters.evaluated % options.status_interval == 0 {
            sink.publish(&engine.snapshot());
        }
        if report.halted() || engine.state() == EngineState::Stopped {
            break StopReason::Halted(engine.halt_reasons().to_vec());
        }
    };

    sink.publish(&engine.snapshot());
    let report = build_report(engine, counters, stop_reason);
    tracing::info!(
        instrument = %report.instrument,
        ticks = report.ticks,
        trades = report.trades,
        final_value = report.final_value,
        reason = %report.stop_reason,
        "session finished"
    );
    Ok(report)
}

fn build_report(engine: &TradingEngine, counters: Counters, stop_reason: StopReason) -> SessionReport {
    let portfolio = engine.portfolio();
    let initial_value = portfolio.initial_cash;
    let final_value = engine
        .window()
        .latest()
        .map(|s| portfolio.total_value(s.price))
        .unwrap_or(portfolio.cash_balance);
    let total_return = if initial_value > 0.0 {
        (final_value - initial_value) / initial_value
    } else {
        0.0
    };

    let closed: Vec<_> = portfolio
        .trade_history
        .iter()
        .filter(|t| t.action == Action::Sell && t.status == TradeStatus::Filled)
        .collect();
    let wins = closed.iter().filter(|t| t.is_win()).count();
    let win_rate = if closed.is_empty() {
        0.0
    } else {
        wins as f64 / closed.len() as f64
    };

    SessionReport {
        instrument: engine.instrument().to_string(),
        ticks: counters.ticks,
        evaluated: counters.evaluated,
        skipped: counters.skipped,
        trades: counters.trades,
        cancelled: counters.cancelled,
        rejected: counters.rejected,
        below_minimum: counters.below_minimum,
        initial_value,
        final_value,
        total_return,
        realized_pnl: portfolio.realized_pnl(),
        max_drawdown: engine.risk().max_drawdown(),
        sharpe_ratio: engine.metrics().sharpe_ratio,
        closed_trades: closed.len(),
        win_rate,
        trades_per_regime: counters.per_regime,
        stop_reason,
    }
}
