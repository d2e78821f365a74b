//! Paper-trading executor: fills every order at the price hint, moved
//! against the trader by a fixed slippage, and charges a proportional fee.

use crate::domain::engine::{ExecutionRequest, Fill, OrderTarget};
use crate::domain::error::EngineError;
use crate::domain::signal::Action;
use crate::ports::config_port::ConfigPort;
use crate::ports::execution_port::ExecutionPort;

pub const DEFAULT_FEE_RATE: f64 = 0.0016;
pub const DEFAULT_SLIPPAGE_PCT: f64 = 0.0005;

#[derive(Debug, Clone, PartialEq)]
pub struct PaperExecutor {
    slippage_pct: f64,
    fee_rate: f64,
    fill_ratio: f64,
    fill_count: u64,
    last_fill: Option<Fill>,
}

impl Default for PaperExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_SLIPPAGE_PCT, DEFAULT_FEE_RATE)
    }
}

impl PaperExecutor {
    pub fn new(slippage_pct: f64, fee_rate: f64) -> Self {
        Self {
            slippage_pct,
            fee_rate,
            fill_ratio: 1.0,
            fill_count: 0,
            last_fill: None,
        }
    }

    /// Fill only this share of each order; 0 rejects everything.
    pub fn with_fill_ratio(mut self, fill_ratio: f64) -> Self {
        self.fill_ratio = fill_ratio;
        self
    }

    pub fn from_port(port: &dyn ConfigPort) -> Result<Self, EngineError> {
        let slippage_pct = port.get_double("paper", "slippage_pct", DEFAULT_SLIPPAGE_PCT);
        let fee_rate = port.get_double("paper", "fee_rate", DEFAULT_FEE_RATE);
        let fill_ratio = port.get_double("paper", "fill_ratio", 1.0);

        if !(0.0..1.0).contains(&slippage_pct) {
            return Err(EngineError::invalid("paper", "slippage_pct", "slippage_pct must be in [0, 1)"));
        }
        if !(0.0..1.0).contains(&fee_rate) {
            return Err(EngineError::invalid("paper", "fee_rate", "fee_rate must be in [0, 1)"));
        }
        if !(0.0..=1.0).contains(&fill_ratio) {
            return Err(EngineError::invalid("paper", "fill_ratio", "fill_ratio must be in [0, 1]"));
        }
        Ok(Self::new(slippage_pct, fee_rate).with_fill_ratio(fill_ratio))
    }

    pub fn fill_count(&self) -> u64 {
        self.fill_count
    }

    pub fn last_fill(&self) -> Option<&Fill> {
        self.last_fill.as_ref()
    }
}

impl ExecutionPort for PaperExecutor {
    fn execute(&mut self, request: &ExecutionRequest) -> Result<Fill, EngineError> {
        let hint = request
            .limit_price_hint
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| EngineError::Executor {
                reason: format!("trade {} has no usable price hint", request.trade_id),
            })?;

        let fill_price = match request.action {
            Action::Buy => hint * (1.0 + self.slippage_pct),
            Action::Sell => hint * (1.0 - self.slippage_pct),
            Action::Hold => {
                return Err(EngineError::Executor {
                    reason: format!("trade {} is a HOLD", request.trade_id),
                });
            }
        };
        let requested = match request.target {
            OrderTarget::Quantity(q) => q,
            OrderTarget::Notional(n) => n / fill_price,
        };
        let filled_quantity = requested * self.fill_ratio;
        let fees = filled_quantity * fill_price * self.fee_rate;

        let fill = Fill {
            trade_id: request.trade_id,
            filled_quantity,
            fill_price,
            fees,
        };
        tracing::debug!(
            trade_id = fill.trade_id,
            quantity = fill.filled_quantity,
            price = fill.fill_price,
            fees = fill.fees,
            "paper fill"
        );
        self.fill_count += 1;
        self.last_fill = Some(fill);
        Ok(fill)
    }
}
