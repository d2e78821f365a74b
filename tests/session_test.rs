//! Session loop tests with in-memory feeds, executors and sinks.

mod common;

use adaptrader::adapters::csv_feed_adapter::CsvSampleFeed;
use adaptrader::adapters::paper_executor::PaperExecutor;
use adaptrader::domain::engine::EngineState;
use adaptrader::domain::error::EngineError;
use adaptrader::domain::portfolio::TradeStatus;
use adaptrader::domain::regime::MarketRegime;
use adaptrader::domain::session::{run_session, SessionOptions, StopReason, StopSignal};
use adaptrader::ports::market_data_port::FeedEvent;
use adaptrader::ports::snapshot_sink::NullSink;
use approx::assert_relative_eq;
use common::*;

fn options() -> SessionOptions {
    SessionOptions::default()
}

#[test]
fn runs_until_feed_exhausted() {
    let mut engine = engine();
    let mut feed = VecFeed::from_samples(samples(&[100.0; 12], 1.0));
    let mut executor = ExactExecutor::default();
    let mut sink = RecordingSink::default();

    let report = run_session(
        &mut engine,
        &mut feed,
        &mut executor,
        &mut sink,
        &StopSignal::new(),
        &options(),
    )
    .unwrap();

    assert_eq!(report.stop_reason, StopReason::FeedExhausted);
    assert_eq!(report.ticks, 12);
    assert_eq!(report.evaluated, 12);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.trades, 0);
    assert_relative_eq!(report.final_value, 10_000.0);
    assert_eq!(report.total_return, 0.0);
    // every 6 evaluated ticks plus the final snapshot
    assert_eq!(sink.snapshots.len(), 3);
}

#[test]
fn gaps_are_counted_and_skipped() {
    let mut events: Vec<FeedEvent> = samples(&[100.0; 4], 1.0)
        .into_iter()
        .map(FeedEvent::Sample)
        .collect();
    events.insert(2, FeedEvent::Gap("exchange timeout".to_string()));
    let mut engine = engine();

    let report = run_session(
        &mut engine,
        &mut VecFeed::new(events),
        &mut ExactExecutor::default(),
        &mut NullSink,
        &StopSignal::new(),
        &options(),
    )
    .unwrap();

    assert_eq!(report.ticks, 5);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.evaluated, 4);
    assert_eq!(engine.window().len(), 4);
}

#[test]
fn uptrend_trade_is_filled_and_counted_by_regime() {
    let mut engine = engine();
    let mut executor = ExactExecutor::default();

    let report = run_session(
        &mut engine,
        &mut VecFeed::from_samples(samples(&uptrend(20), 1.0)),
        &mut executor,
        &mut NullSink,
        &StopSignal::new(),
        &options(),
    )
    .unwrap();

    assert_eq!(report.trades, 1);
    assert_eq!(report.trades_per_regime.get(&MarketRegime::TrendingUp), Some(&1));
    assert_eq!(executor.requests.len(), 1);
    let id = executor.requests[0].trade_id;
    assert_eq!(engine.portfolio().trade(id).unwrap().status, TradeStatus::Filled);
    // nothing closed yet
    assert_eq!(report.closed_trades, 0);
    assert_eq!(report.win_rate, 0.0);
}

#[test]
fn stop_signal_checked_before_each_tick() {
    let stop = StopSignal::new();
    stop.stop();
    let mut engine = engine();

    let report = run_session(
        &mut engine,
        &mut VecFeed::from_samples(samples(&[100.0; 10], 1.0)),
        &mut ExactExecutor::default(),
        &mut NullSink,
        &stop,
        &options(),
    )
    .unwrap();

    assert_eq!(report.stop_reason, StopReason::StopRequested);
    assert_eq!(report.ticks, 0);
    assert!(engine.window().is_empty());
}

#[test]
fn stop_signal_clones_share_the_flag() {
    let stop = StopSignal::new();
    let remote = stop.clone();
    assert!(!stop.is_stopped());
    remote.stop();
    assert!(stop.is_stopped());
}

#[test]
fn max_ticks_limits_the_session() {
    let mut engine = engine();
    let options = SessionOptions {
        max_ticks: Some(3),
        ..SessionOptions::default()
    };
    let report = run_session(
        &mut engine,
        &mut VecFeed::from_samples(samples(&[100.0; 10], 1.0)),
        &mut ExactExecutor::default(),
        &mut NullSink,
        &StopSignal::new(),
        &options,
    )
    .unwrap();
    assert_eq!(report.stop_reason, StopReason::MaxTicks);
    assert_eq!(report.ticks, 3);
}

#[test]
fn halt_ends_the_session() {
    let mut prices = uptrend(20);
    prices.push(prices[19] * 0.6);
    prices.push(prices[19] * 0.6);
    let mut engine = engine();

    let report = run_session(
        &mut engine,
        &mut VecFeed::from_samples(samples(&prices, 1.0)),
        &mut ExactExecutor::default(),
        &mut NullSink,
        &StopSignal::new(),
        &options(),
    )
    .unwrap();

    assert!(matches!(report.stop_reason, StopReason::Halted(ref r) if !r.is_empty()));
    assert_eq!(report.ticks, 21);
    assert_eq!(engine.state(), EngineState::Stopped);
    // the protective exit closed the position at a loss
    assert_eq!(report.trades, 2);
    assert_eq!(report.closed_trades, 1);
    assert_eq!(report.win_rate, 0.0);
    assert!(report.realized_pnl < 0.0);
    assert!(report.total_return < -0.05);
    assert!(report.to_string().contains("halted"));
}

#[test]
fn executor_failure_cancels_estimate_and_propagates() {
    let mut engine = engine();
    let result = run_session(
        &mut engine,
        &mut VecFeed::from_samples(samples(&uptrend(20), 1.0)),
        &mut FailingExecutor,
        &mut NullSink,
        &StopSignal::new(),
        &options(),
    );
    assert!(matches!(result, Err(EngineError::Executor { .. })));
    let p = engine.portfolio();
    assert_eq!(p.trades_today, 0);
    assert!(p.position_quantity.abs() < 1e-9);
    assert_eq!(p.trade_history[0].status, TradeStatus::Cancelled);
}

#[test]
fn csv_replay_with_paper_executor() {
    let file = write_temp_file(&csv_for(&samples(&uptrend(20), 1.0)));
    let mut feed = CsvSampleFeed::from_path(file.path()).unwrap();
    let mut executor = PaperExecutor::default();
    let mut engine = engine();

    let report = run_session(
        &mut engine,
        &mut feed,
        &mut executor,
        &mut NullSink,
        &StopSignal::new(),
        &options(),
    )
    .unwrap();

    assert_eq!(report.ticks, 20);
    assert_eq!(report.trades, 1);
    assert_eq!(executor.fill_count(), 1);
    // fees are paid in cash
    assert!(engine.portfolio().cash_balance < 7_500.0);
}

#[test]
fn blank_volume_cell_is_a_gap_not_a_halt() {
    let csv = csv_for(&samples(&[100.0; 25], 1.0));
    let mut lines: Vec<String> = csv.lines().map(str::to_string).collect();
    // header is line 0, so this blanks the volume of the 22nd sample
    let mut fields: Vec<&str> = lines[22].split(',').collect();
    fields[3] = "";
    lines[22] = fields.join(",");
    let file = write_temp_file(&(lines.join("\n") + "\n"));

    let mut engine = engine();
    let report = run_session(
        &mut engine,
        &mut CsvSampleFeed::from_path(file.path()).unwrap(),
        &mut ExactExecutor::default(),
        &mut NullSink,
        &StopSignal::new(),
        &options(),
    )
    .unwrap();

    assert_eq!(report.stop_reason, StopReason::FeedExhausted);
    assert_eq!(report.ticks, 25);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.evaluated, 24);
    assert_eq!(engine.state(), EngineState::Running);
}

#[test]
fn slipped_fill_leaves_consistent_final_snapshot() {
    let mut engine = engine();
    let mut sink = RecordingSink::default();
    let report = run_session(
        &mut engine,
        &mut VecFeed::from_samples(samples(&uptrend(20), 1.0)),
        &mut PaperExecutor::new(0.01, 0.01),
        &mut sink,
        &StopSignal::new(),
        &options(),
    )
    .unwrap();

    assert_eq!(report.trades, 1);
    let last = sink.snapshots.last().unwrap();
    let price = engine.window().latest().unwrap().price;
    assert_relative_eq!(
        last.metrics.portfolio_value,
        last.portfolio.total_value(price),
        epsilon = 1e-9
    );
    assert_relative_eq!(last.metrics.portfolio_value, report.final_value, epsilon = 1e-9);
}
