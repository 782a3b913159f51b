//! Single-instrument portfolio: position state, trade log and equity curve.

use chrono::NaiveDate;
use serde::Serialize;

use super::position::PositionState;
use super::signal::{Decision, ReasonCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "buy",
            TradeAction::Sell => "sell",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub date: NaiveDate,
    pub action: TradeAction,
    pub price: f64,
    pub shares_delta: f64,
    pub cash_delta: f64,
    pub reason: ReasonCode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub cash: f64,
    pub market_value: f64,
    pub total_equity: f64,
    /// `total_equity / initial_capital`.
    pub equity_nav: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub initial_capital: f64,
    pub position: PositionState,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            initial_capital,
            position: PositionState::new(initial_capital),
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    /// Apply `decision` at `nav` on `date`. Returns the appended trade, if
    /// the decision resulted in one.
    pub fn execute(&mut self, decision: &Decision, date: NaiveDate, nav: f64) -> Option<&TradeRecord> {
        let (action, fill, reason) = match *decision {
            Decision::Hold(_) => return None,
            Decision::Buy { amount, reason } => {
                (TradeAction::Buy, self.position.buy(amount, nav)?, reason)
            }
            Decision::Sell { fraction, reason } => {
                (TradeAction::Sell, self.position.sell(fraction, nav)?, reason)
            }
        };
        self.trades.push(TradeRecord {
            date,
            action,
            price: nav,
            shares_delta: fill.shares_delta,
            cash_delta: fill.cash_delta,
            reason,
        });
        self.trades.last()
    }

    pub fn record_equity(&mut self, date: NaiveDate, nav: f64) {
        let cash = self.position.cash;
        let market_value = self.position.market_value(nav);
        let total_equity = cash + market_value;
        let equity_nav = if self.initial_capital > 0.0 {
            total_equity / self.initial_capital
        } else {
            0.0
        };
        self.equity_curve.push(EquityPoint {
            date,
            cash,
            market_value,
            total_equity,
            equity_nav,
        });
    }
}
