//! Portfolio state and trade bookkeeping for a single instrument.
//!
//! Approved trades are booked immediately as estimates at the hint price.
//! When the executor reports the real fill, the estimate is reversed and the
//! fill applied in its place; an empty fill cancels the trade.

use chrono::{DateTime, Utc};

use super::error::EngineError;
use super::regime::MarketRegime;
use super::signal::{Action, Exposure};

/// Quantities below this are treated as a closed position.
const DUST: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeStatus {
    Estimated,
    Filled,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub action: Action,
    pub requested_quantity: f64,
    pub quantity: f64,
    pub price: f64,
    pub fees: f64,
    pub notional: f64,
    pub status: TradeStatus,
    pub realized_pnl: Option<f64>,
    pub regime: MarketRegime,
    pub confidence: f64,
    pub protective: bool,
    /// Cost basis taken off the position by an exit.
    cost_released: f64,
}

impl TradeRecord {
    pub fn is_win(&self) -> bool {
        self.realized_pnl.is_some_and(|pnl| pnl > 0.0)
    }
}

/// Details of a trade to book as an estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeTicket {
    pub timestamp: DateTime<Utc>,
    pub action: Action,
    pub quantity: f64,
    pub price: f64,
    pub regime: MarketRegime,
    pub confidence: f64,
    pub protective: bool,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioState {
    pub initial_cash: f64,
    pub cash_balance: f64,
    pub position_quantity: f64,
    /// Total cost basis of the open position, fees included.
    pub position_cost: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub peak_value: f64,
    pub daily_start_value: f64,
    pub trades_today: u32,
    pub trade_history: Vec<TradeRecord>,
    next_trade_id: u64,
}

impl PortfolioState {
    pub fn new(initial_cash: f64) -> Self {
        PortfolioState {
            initial_cash,
            cash_balance: initial_cash,
            position_quantity: 0.0,
            position_cost: 0.0,
            stop_loss: None,
            take_profit: None,
            peak_value: initial_cash,
            daily_start_value: initial_cash,
            trades_today: 0,
            trade_history: Vec::new(),
            next_trade_id: 1,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.position_quantity <= DUST
    }

    pub fn position_value(&self, price: f64) -> f64 {
        self.position_quantity * price
    }

    pub fn total_value(&self, price: f64) -> f64 {
        self.cash_balance + self.position_value(price)
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.position_value(price) - self.position_cost
    }

    pub fn exposure(&self) -> Exposure {
        if self.is_flat() {
            return Exposure::default();
        }
        Exposure {
            quantity: self.position_quantity,
            stop_loss: self.stop_loss,
            take_profit: self.take_profit,
        }
    }

    pub fn trade(&self, id: u64) -> Option<&TradeRecord> {
        self.trade_history.iter().find(|t| t.id == id)
    }

    pub fn realized_pnl(&self) -> f64 {
        self.trade_history.iter().filter_map(|t| t.realized_pnl).sum()
    }

    /// Book an approved trade at its estimated price and count it for today.
    pub fn book_estimate(&mut self, ticket: TradeTicket) -> u64 {
        let id = self.next_trade_id;
        self.next_trade_id += 1;

        let mut record = TradeRecord {
            id,
            timestamp: ticket.timestamp,
            action: ticket.action,
            requested_quantity: ticket.quantity,
            quantity: ticket.quantity,
            price: ticket.price,
            fees: 0.0,
            notional: ticket.quantity * ticket.price,
            status: TradeStatus::Estimated,
            realized_pnl: None,
            regime: ticket.regime,
            confidence: ticket.confidence,
            protective: ticket.protective,
            cost_released: 0.0,
        };
        self.apply(&mut record);

        if ticket.action == Action::Buy {
            self.stop_loss = ticket.stop_loss;
            self.take_profit = ticket.take_profit;
        }
        self.trades_today += 1;
        self.trade_history.push(record);
        id
    }

    /// Replace an estimate with the executor's fill. A zero quantity cancels
    /// the trade and releases its slot in today's count.
    pub fn apply_fill(
        &mut self,
        id: u64,
        filled_quantity: f64,
        fill_price: f64,
        fees: f64,
    ) -> Result<&TradeRecord, EngineError> {
        let index = self
            .trade_history
            .iter()
            .position(|t| t.id == id)
            .ok_or(EngineError::UnknownTrade { id })?;

        let mismatch = |reason: String| EngineError::FillMismatch { id, reason };
        let mut record = self.trade_history[index].clone();
        if record.status != TradeStatus::Estimated {
            return Err(mismatch(format!("trade already {:?}", record.status)));
        }
        if !filled_quantity.is_finite() || filled_quantity < 0.0 {
            return Err(mismatch(format!("invalid quantity {filled_quantity}")));
        }
        if filled_quantity > record.requested_quantity * (1.0 + 1e-9) + DUST {
            return Err(mismatch(format!(
                "filled {filled_quantity} exceeds requested {}",
                record.requested_quantity
            )));
        }
        if filled_quantity > 0.0 && !(fill_price.is_finite() && fill_price > 0.0) {
            return Err(mismatch(format!("invalid price {fill_price}")));
        }
        if !fees.is_finite() || fees < 0.0 {
            return Err(mismatch(format!("invalid fees {fees}")));
        }

        self.reverse(&record);

        if filled_quantity <= 0.0 {
            record.quantity = 0.0;
            record.notional = 0.0;
            record.fees = 0.0;
            record.realized_pnl = None;
            record.cost_released = 0.0;
            record.status = TradeStatus::Cancelled;
            self.trades_today = self.trades_today.saturating_sub(1);
        } else {
            record.quantity = filled_quantity;
            record.price = fill_price;
            record.fees = fees;
            record.notional = filled_quantity * fill_price;
            self.apply(&mut record);
            record.status = TradeStatus::Filled;
        }

        self.trade_history[index] = record;
        Ok(&self.trade_history[index])
    }

    fn apply(&mut self, record: &mut TradeRecord) {
        match record.action {
            Action::Buy => {
                let cost = record.notional + record.fees;
                self.cash_balance -= cost;
                self.position_quantity += record.quantity;
                self.position_cost += cost;
                record.cost_released = 0.0;
                record.realized_pnl = None;
            }
            Action::Sell => {
                let quantity = record.quantity.min(self.position_quantity);
                let released = if self.position_quantity > 0.0 {
                    self.position_cost * quantity / self.position_quantity
                } else {
                    0.0
                };
                let proceeds = record.notional - record.fees;
                self.cash_balance += proceeds;
                self.position_quantity -= record.quantity;
                self.position_cost -= released;
                record.cost_released = released;
                record.realized_pnl = Some(proceeds - released);
            }
            Action::Hold => {}
        }
        self.settle_dust();
    }

    fn reverse(&mut self, record: &TradeRecord) {
        match record.action {
            Action::Buy => {
                let cost = record.notional + record.fees;
                self.cash_balance += cost;
                self.position_quantity -= record.quantity;
                self.position_cost -= cost;
            }
            Action::Sell => {
                self.cash_balance -= record.notional - record.fees;
                self.position_quantity += record.quantity;
                self.position_cost += record.cost_released;
            }
            Action::Hold => {}
        }
        self.settle_dust();
    }

    fn settle_dust(&mut self) {
        if self.position_quantity.abs() <= DUST {
            self.position_quantity = 0.0;
            self.position_cost = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap()
    }

    fn buy(quantity: f64, price: f64) -> TradeTicket {
        TradeTicket {
            timestamp: ts(),
            action: Action::Buy,
            quantity,
            price,
            regime: MarketRegime::TrendingUp,
            confidence: 0.7,
            protective: false,
            stop_loss: Some(price * 0.98),
            take_profit: Some(price * 1.04),
        }
    }

    fn sell(quantity: f64, price: f64) -> TradeTicket {
        TradeTicket {
            action: Action::Sell,
            stop_loss: None,
            take_profit: None,
            ..buy(quantity, price)
        }
    }

    #[test]
    fn new_portfolio() {
        let p = PortfolioState::new(1000.0);
        assert_eq!(p.cash_balance, 1000.0);
        assert_eq!(p.peak_value, 1000.0);
        assert_eq!(p.daily_start_value, 1000.0);
        assert!(p.is_flat());
        assert!(p.trade_history.is_empty());
        assert_eq!(p.exposure(), Exposure::default());
    }

    #[test]
    fn estimate_moves_cash_and_quantity() {
        let mut p = PortfolioState::new(1000.0);
        let id = p.book_estimate(buy(2.0, 100.0));
        assert_eq!(id, 1);
        assert_relative_eq!(p.cash_balance, 800.0);
        assert_relative_eq!(p.position_quantity, 2.0);
        assert_eq!(p.trades_today, 1);
        assert_eq!(p.trade(id).unwrap().status, TradeStatus::Estimated);
        assert_relative_eq!(p.total_value(110.0), 1020.0);
        let e = p.exposure();
        assert_relative_eq!(e.stop_loss.unwrap(), 98.0);
        assert_relative_eq!(e.take_profit.unwrap(), 104.0);
    }

    #[test]
    fn fill_replaces_estimate() {
        let mut p = PortfolioState::new(1000.0);
        let id = p.book_estimate(buy(2.0, 100.0));
        let record = p.apply_fill(id, 1.5, 101.0, 0.5).unwrap();
        assert_eq!(record.status, TradeStatus::Filled);
        assert_relative_eq!(record.notional, 151.5);
        assert_relative_eq!(p.cash_balance, 1000.0 - 151.5 - 0.5);
        assert_relative_eq!(p.position_quantity, 1.5);
        assert_relative_eq!(p.position_cost, 152.0);
        assert_eq!(p.trades_today, 1);
    }

    #[test]
    fn zero_fill_cancels_and_releases_count() {
        let mut p = PortfolioState::new(1000.0);
        let id = p.book_estimate(buy(2.0, 100.0));
        p.apply_fill(id, 0.0, 0.0, 0.0).unwrap();
        assert_eq!(p.trade(id).unwrap().status, TradeStatus::Cancelled);
        assert_relative_eq!(p.cash_balance, 1000.0);
        assert!(p.is_flat());
        assert_eq!(p.trades_today, 0);
        assert_eq!(p.trade_history.len(), 1);
    }

    #[test]
    fn round_trip_realizes_pnl() {
        let mut p = PortfolioState::new(1000.0);
        let b = p.book_estimate(buy(2.0, 100.0));
        p.apply_fill(b, 2.0, 100.0, 1.0).unwrap();
        let s = p.book_estimate(sell(2.0, 110.0));
        let record = p.apply_fill(s, 2.0, 110.0, 1.0).unwrap();
        // proceeds 219, cost 201
        assert_relative_eq!(record.realized_pnl.unwrap(), 18.0);
        assert!(record.is_win());
        assert!(p.is_flat());
        assert_relative_eq!(p.cash_balance, 1018.0);
        assert_relative_eq!(p.realized_pnl(), 18.0);
    }

    #[test]
    fn cancelled_exit_restores_position() {
        let mut p = PortfolioState::new(1000.0);
        let b = p.book_estimate(buy(2.0, 100.0));
        p.apply_fill(b, 2.0, 100.0, 0.0).unwrap();
        let s = p.book_estimate(sell(2.0, 90.0));
        assert!(p.is_flat());
        p.apply_fill(s, 0.0, 0.0, 0.0).unwrap();
        assert_relative_eq!(p.position_quantity, 2.0);
        assert_relative_eq!(p.position_cost, 200.0);
        assert_relative_eq!(p.cash_balance, 800.0);
        assert_relative_eq!(p.stop_loss.unwrap(), 98.0);
        assert_eq!(p.trade(s).unwrap().realized_pnl, None);
    }

    #[test]
    fn partial_exit_releases_proportional_cost() {
        let mut p = PortfolioState::new(1000.0);
        let b = p.book_estimate(buy(4.0, 100.0));
        p.apply_fill(b, 4.0, 100.0, 0.0).unwrap();
        let s = p.book_estimate(sell(4.0, 105.0));
        let record = p.apply_fill(s, 1.0, 105.0, 0.0).unwrap();
        assert_relative_eq!(record.realized_pnl.unwrap(), 5.0);
        assert_relative_eq!(p.position_quantity, 3.0);
        assert_relative_eq!(p.position_cost, 300.0);
    }

    #[test]
    fn unknown_trade_is_error() {
        let mut p = PortfolioState::new(1000.0);
        assert!(matches!(
            p.apply_fill(42, 1.0, 100.0, 0.0),
            Err(EngineError::UnknownTrade { id: 42 })
        ));
    }

    #[test]
    fn double_fill_is_mismatch() {
        let mut p = PortfolioState::new(1000.0);
        let id = p.book_estimate(buy(1.0, 100.0));
        p.apply_fill(id, 1.0, 100.0, 0.0).unwrap();
        assert!(matches!(
            p.apply_fill(id, 1.0, 100.0, 0.0),
            Err(EngineError::FillMismatch { .. })
        ));
    }

    #[test]
    fn overfill_is_mismatch() {
        let mut p = PortfolioState::new(1000.0);
        let id = p.book_estimate(buy(1.0, 100.0));
        assert!(matches!(
            p.apply_fill(id, 2.0, 100.0, 0.0),
            Err(EngineError::FillMismatch { .. })
        ));
        // rejected fill leaves the estimate untouched
        assert_relative_eq!(p.position_quantity, 1.0);
        assert_eq!(p.trade(id).unwrap().status, TradeStatus::Estimated);
    }

    #[test]
    fn negative_fees_rejected() {
        let mut p = PortfolioState::new(1000.0);
        let id = p.book_estimate(buy(1.0, 100.0));
        assert!(p.apply_fill(id, 1.0, 100.0, -1.0).is_err());
    }
}
