//! Day-by-day simulation loop for one instrument.
//!
//! Indicators are computed causally over the whole loaded history, so days
//! before `start_date` only warm the indicators up. The portfolio is driven
//! over the days inside `[start_date, end_date]`, one pass, in date order.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use super::error::FundgridError;
use super::indicator::engine::IndicatorEngine;
use super::indicator::snapshot::IndicatorSnapshot;
use super::nav::NavSeries;
use super::portfolio::{EquityPoint, Portfolio, TradeRecord};
use super::position::PositionState;
use super::signal::{decide, Decision, HoldReason};
use super::strategy::StrategyParams;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub initial_capital: f64,
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            start_date: None,
            end_date: None,
            initial_capital: 100_000.0,
            risk_free_rate: 0.02,
        }
    }
}

/// Hold days broken down by why nothing was traded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HoldTally {
    pub no_signal: usize,
    pub trend_veto: usize,
    pub no_cash: usize,
}

impl HoldTally {
    fn count(&mut self, reason: HoldReason) {
        match reason {
            HoldReason::NoSignal => self.no_signal += 1,
            HoldReason::TrendVeto => self.trend_veto += 1,
            HoldReason::NoCash => self.no_cash += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestRun {
    pub code: String,
    pub initial_capital: f64,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
    pub final_position: PositionState,
    pub holds: HoldTally,
    /// Snapshot of the last simulated day.
    pub last_snapshot: Option<IndicatorSnapshot>,
}

pub fn run_backtest(
    series: &NavSeries,
    config: &BacktestConfig,
    params: &StrategyParams,
) -> Result<BacktestRun, FundgridError> {
    let window = series.window(config.start_date, config.end_date);
    if window.is_empty() {
        return Err(FundgridError::NoData {
            code: series.code().to_string(),
        });
    }

    let engine = IndicatorEngine::new(params.indicator_params());
    let snapshots = engine.compute_series(&series.points()[..window.end]);

    let mut portfolio = Portfolio::new(config.initial_capital);
    let mut holds = HoldTally::default();

    for snap in &snapshots[window.clone()] {
        portfolio.position.observe(snap.nav);
        let decision = decide(snap, &portfolio.position, params);
        if let Decision::Hold(reason) = decision {
            holds.count(reason);
        }
        if let Some(trade) = portfolio.execute(&decision, snap.date, snap.nav) {
            debug!(
                code = series.code(),
                date = %trade.date,
                action = trade.action.as_str(),
                reason = %trade.reason,
                price = trade.price,
                shares = trade.shares_delta,
                "trade"
            );
        }
        portfolio.record_equity(snap.date, snap.nav);
    }

    Ok(BacktestRun {
        code: series.code().to_string(),
        initial_capital: portfolio.initial_capital,
        equity_curve: portfolio.equity_curve,
        trades: portfolio.trades,
        final_position: portfolio.position,
        holds,
        last_snapshot: snapshots.get(window.end - 1).cloned(),
    })
}
