#![allow(dead_code)]

use adaptrader::domain::config::EngineConfig;
use adaptrader::domain::engine::{EngineSnapshot, ExecutionRequest, Fill, TradingEngine};
use adaptrader::domain::error::EngineError;
use adaptrader::domain::sample::PriceSample;
use adaptrader::ports::execution_port::ExecutionPort;
use adaptrader::ports::market_data_port::{FeedEvent, MarketDataPort};
use adaptrader::ports::snapshot_sink::SnapshotSink;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::VecDeque;
use std::io::Write;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Five-minute bar timestamps.
pub fn ts(i: usize) -> DateTime<Utc> {
    t0() + Duration::minutes(5 * i as i64)
}

/// Quote around `mid` with the given spread in basis points.
pub fn quote_at(i: usize, mid: f64, spread_bps: f64, volume: f64) -> PriceSample {
    let half = mid * spread_bps / 20_000.0;
    PriceSample::from_quote(ts(i), mid - half, mid + half, volume, mid * 1.05, mid * 0.95)
}

pub fn samples(prices: &[f64], spread_bps: f64) -> Vec<PriceSample> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| quote_at(i, p, spread_bps, 10.0))
        .collect()
}

/// `n` prices rising 0.5% per sample from 100.
pub fn uptrend(n: usize) -> Vec<f64> {
    (0..n).map(|i| 100.0 * 1.005_f64.powi(i as i32)).collect()
}

/// Default config with a 20-sample window and 10k starting cash.
pub fn small_window_config() -> EngineConfig {
    EngineConfig {
        window_capacity: 20,
        ..EngineConfig::default()
    }
}

pub fn engine() -> TradingEngine {
    TradingEngine::new(small_window_config()).unwrap()
}

pub struct VecFeed {
    events: VecDeque<FeedEvent>,
}

impl VecFeed {
    pub fn new(events: Vec<FeedEvent>) -> Self {
        Self {
            events: events.into(),
        }
    }

    pub fn from_samples(samples: Vec<PriceSample>) -> Self {
        Self::new(samples.into_iter().map(FeedEvent::Sample).collect())
    }
}

impl MarketDataPort for VecFeed {
    fn next_event(&mut self) -> Result<FeedEvent, EngineError> {
        Ok(self.events.pop_front().unwrap_or(FeedEvent::Exhausted))
    }
}

/// Fills every order exactly at its hint with no fees.
#[derive(Default)]
pub struct ExactExecutor {
    pub requests: Vec<ExecutionRequest>,
}

impl ExecutionPort for ExactExecutor {
    fn execute(&mut self, request: &ExecutionRequest) -> Result<Fill, EngineError> {
        self.requests.push(request.clone());
        let quantity = match request.target {
            adaptrader::domain::engine::OrderTarget::Quantity(q) => q,
            adaptrader::domain::engine::OrderTarget::Notional(n) => n / request.limit_price_hint.unwrap(),
        };
        Ok(Fill {
            trade_id: request.trade_id,
            filled_quantity: quantity,
            fill_price: request.limit_price_hint.unwrap(),
            fees: 0.0,
        })
    }
}

pub struct FailingExecutor;

impl ExecutionPort for FailingExecutor {
    fn execute(&mut self, _request: &ExecutionRequest) -> Result<Fill, EngineError> {
        Err(EngineError::Executor {
            reason: "exchange unavailable".to_string(),
        })
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub snapshots: Vec<EngineSnapshot>,
}

impl SnapshotSink for RecordingSink {
    fn publish(&mut self, snapshot: &EngineSnapshot) {
        self.snapshots.push(snapshot.clone());
    }
}

pub fn write_temp_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub fn csv_for(samples: &[PriceSample]) -> String {
    let mut out = String::from("timestamp,bid,ask,volume,high_24h,low_24h\n");
    for s in samples {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            s.timestamp.to_rfc3339(),
            s.bid,
            s.ask,
            s.volume,
            s.high_24h,
            s.low_24h
        ));
    }
    out
}
