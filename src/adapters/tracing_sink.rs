//! Snapshot sink that writes status lines through `tracing`.

use crate::domain::engine::{EngineSnapshot, EngineState};
use crate::ports::snapshot_sink::SnapshotSink;

#[derive(Debug, Default)]
pub struct TracingSnapshotSink {
    published: u64,
}

impl TracingSnapshotSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> u64 {
        self.published
    }
}

impl SnapshotSink for TracingSnapshotSink {
    fn publish(&mut self, snapshot: &EngineSnapshot) {
        self.published += 1;
        let m = &snapshot.metrics;
        let p = &snapshot.portfolio;
        let action = snapshot
            .signal
            .as_ref()
            .map(|s| s.action.to_string())
            .unwrap_or_else(|| "-".to_string());

        tracing::info!(
            instrument = %snapshot.instrument,
            regime = %snapshot.regime,
            price = snapshot.indicators.price,
            rsi = snapshot.indicators.rsi,
            action = %action,
            value = m.portfolio_value,
            cash = p.cash_balance,
            position = p.position_quantity,
            drawdown = m.current_drawdown,
            risk_level = %m.risk_level,
            trades_today = p.trades_today,
            "status"
        );
        tracing::debug!("\n{}", m);
        if snapshot.state == EngineState::Stopped {
            tracing::warn!(instrument = %snapshot.instrument, "engine stopped");
        }
    }
}
