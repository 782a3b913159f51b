//! Performance statistics over a finished equity curve and trade log.

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use super::backtest::BacktestRun;
use super::portfolio::{EquityPoint, TradeAction, TradeRecord};
use super::signal::ReasonCode;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const CALENDAR_DAYS_PER_YEAR: f64 = 365.25;
/// Volatility at or below this is treated as zero risk.
const ZERO_RISK_EPSILON: f64 = 1e-12;

/// A risk-adjusted ratio, or the reason it has no value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RatioValue {
    Value(f64),
    /// The risk denominator is zero (flat curve, or no downside days).
    ZeroRisk,
    /// Too few observations to estimate risk.
    InsufficientData,
}

impl RatioValue {
    pub fn value(&self) -> Option<f64> {
        match self {
            RatioValue::Value(v) => Some(*v),
            _ => None,
        }
    }

    /// Table cell: the number, `zero_risk`, or empty.
    pub fn render(&self) -> String {
        match self {
            RatioValue::Value(v) => format!("{:.4}", v),
            RatioValue::ZeroRisk => "zero_risk".to_string(),
            RatioValue::InsufficientData => String::new(),
        }
    }
}

impl Serialize for RatioValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RatioValue::Value(v) => serializer.serialize_f64(*v),
            RatioValue::ZeroRisk => serializer.serialize_str("zero_risk"),
            RatioValue::InsufficientData => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Calendar days from the trough to the first day back at the prior peak.
    Days(i64),
    Unrecovered,
}

impl Recovery {
    pub fn render(&self) -> String {
        match self {
            Recovery::Days(d) => d.to_string(),
            Recovery::Unrecovered => "unrecovered".to_string(),
        }
    }
}

impl Serialize for Recovery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Recovery::Days(d) => serializer.serialize_i64(*d),
            Recovery::Unrecovered => serializer.serialize_str("unrecovered"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub days: usize,
    pub initial_capital: f64,
    pub final_equity: f64,
    pub total_return: f64,
    pub annualized_return: Option<f64>,
    pub max_drawdown: f64,
    pub drawdown_recovery_days: Recovery,
    pub annualized_volatility: Option<f64>,
    pub sharpe_ratio: RatioValue,
    pub sortino_ratio: RatioValue,
    pub win_rate: Option<f64>,
    pub buy_count: usize,
    pub sell_count: usize,
    pub take_profit_count: usize,
    pub stop_loss_count: usize,
    pub trailing_stop_count: usize,
}

impl BacktestResult {
    pub fn compute(run: &BacktestRun, risk_free_rate: f64) -> Self {
        analyze(&run.equity_curve, &run.trades, run.initial_capital, risk_free_rate)
    }
}

pub fn analyze(
    equity_curve: &[EquityPoint],
    trades: &[TradeRecord],
    initial_capital: f64,
    risk_free_rate: f64,
) -> BacktestResult {
    let final_equity = equity_curve
        .last()
        .map(|p| p.total_equity)
        .unwrap_or(initial_capital);

    let total_return = if initial_capital > 0.0 {
        final_equity / initial_capital - 1.0
    } else {
        0.0
    };

    let start_date = equity_curve.first().map(|p| p.date);
    let end_date = equity_curve.last().map(|p| p.date);
    let days_elapsed = match (start_date, end_date) {
        (Some(s), Some(e)) => (e - s).num_days(),
        _ => 0,
    };
    let annualized_return = annualize(total_return, days_elapsed);

    let (max_drawdown, drawdown_recovery_days) = drawdown(equity_curve);

    let returns = daily_returns(equity_curve);
    let annualized_volatility = sample_std(&returns).map(|s| s * TRADING_DAYS_PER_YEAR.sqrt());
    let (sharpe_ratio, sortino_ratio) =
        risk_adjusted(&returns, annualized_return, annualized_volatility, risk_free_rate);

    let buy_count = trades.iter().filter(|t| t.action == TradeAction::Buy).count();
    let sell_count = trades.iter().filter(|t| t.action == TradeAction::Sell).count();
    let take_profit_count = count_reason(trades, ReasonCode::TakeProfit);
    let stop_loss_count = count_reason(trades, ReasonCode::StopLoss);
    let trailing_stop_count = count_reason(trades, ReasonCode::TrailingStop);

    let exits = take_profit_count + stop_loss_count;
    let win_rate = if exits > 0 {
        Some(take_profit_count as f64 / exits as f64)
    } else {
        None
    };

    BacktestResult {
        start_date,
        end_date,
        days: equity_curve.len(),
        initial_capital,
        final_equity,
        total_return,
        annualized_return,
        max_drawdown,
        drawdown_recovery_days,
        annualized_volatility,
        sharpe_ratio,
        sortino_ratio,
        win_rate,
        buy_count,
        sell_count,
        take_profit_count,
        stop_loss_count,
        trailing_stop_count,
    }
}

fn count_reason(trades: &[TradeRecord], reason: ReasonCode) -> usize {
    trades.iter().filter(|t| t.reason == reason).count()
}

fn annualize(total_return: f64, days_elapsed: i64) -> Option<f64> {
    if days_elapsed <= 0 {
        return None;
    }
    let r = (1.0 + total_return).powf(CALENDAR_DAYS_PER_YEAR / days_elapsed as f64) - 1.0;
    r.is_finite().then_some(r)
}

/// Maximum drawdown against the running peak, and the time to recover from
/// its trough back to the peak that stood on the trough day.
pub fn drawdown(equity_curve: &[EquityPoint]) -> (f64, Recovery) {
    let Some(first) = equity_curve.first() else {
        return (0.0, Recovery::Days(0));
    };

    let mut peak = first.total_equity;
    let mut max_dd = 0.0_f64;
    let mut trough = 0usize;
    let mut trough_peak = peak;

    for (i, point) in equity_curve.iter().enumerate() {
        if point.total_equity > peak {
            peak = point.total_equity;
        }
        if peak > 0.0 {
            let dd = (peak - point.total_equity) / peak;
            if dd > max_dd {
                max_dd = dd;
                trough = i;
                trough_peak = peak;
            }
        }
    }

    if max_dd <= 0.0 {
        return (0.0, Recovery::Days(0));
    }

    let trough_date = equity_curve[trough].date;
    let recovery = equity_curve[trough..]
        .iter()
        .find(|p| p.total_equity >= trough_peak)
        .map(|p| Recovery::Days((p.date - trough_date).num_days()))
        .unwrap_or(Recovery::Unrecovered);

    (max_dd.min(1.0), recovery)
}

pub fn daily_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].total_equity;
            let curr = w[1].total_equity;
            if prev > 0.0 { (curr - prev) / prev } else { 0.0 }
        })
        .collect()
}

/// Sample standard deviation (n - 1); `None` below two observations.
fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = var.sqrt();
    std.is_finite().then_some(std)
}

fn risk_adjusted(
    returns: &[f64],
    annualized_return: Option<f64>,
    annualized_volatility: Option<f64>,
    risk_free_rate: f64,
) -> (RatioValue, RatioValue) {
    let (Some(ann), Some(vol)) = (annualized_return, annualized_volatility) else {
        return (RatioValue::InsufficientData, RatioValue::InsufficientData);
    };
    if vol <= ZERO_RISK_EPSILON {
        return (RatioValue::ZeroRisk, RatioValue::ZeroRisk);
    }

    let excess = ann - risk_free_rate;
    let sharpe = ratio(excess, vol);

    let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
    let has_downside = returns.iter().any(|&r| r < daily_rf);
    let sortino = if has_downside {
        let n = returns.len() as f64;
        let mean_sq = returns
            .iter()
            .map(|&r| (r - daily_rf).min(0.0).powi(2))
            .sum::<f64>()
            / n;
        ratio(excess, mean_sq.sqrt() * TRADING_DAYS_PER_YEAR.sqrt())
    } else {
        RatioValue::ZeroRisk
    };

    (sharpe, sortino)
}

fn ratio(numerator: f64, denominator: f64) -> RatioValue {
    if denominator <= ZERO_RISK_EPSILON {
        return RatioValue::ZeroRisk;
    }
    let v = numerator / denominator;
    if v.is_finite() {
        RatioValue::Value(v)
    } else {
        RatioValue::InsufficientData
    }
}
