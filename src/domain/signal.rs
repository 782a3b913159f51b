//! Priority-ordered grid decision table.
//!
//! Rules are evaluated top to bottom and the first match wins:
//! stop-loss, take-profit, trailing stop, trend veto (flat only),
//! grid buy, initial entry, hold. Threshold comparisons are inclusive
//! throughout, so a value exactly on a threshold triggers the rule.

use serde::Serialize;
use std::fmt;

use crate::domain::indicator::snapshot::IndicatorSnapshot;
use crate::domain::position::PositionState;
use crate::domain::strategy::StrategyParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    StopLoss,
    TakeProfit,
    TrailingStop,
    GridBuy,
    /// Grid buy with the long RSI also at its extreme level.
    GridBuyRsiResonance,
    InitialEntry,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::StopLoss => "stop_loss",
            ReasonCode::TakeProfit => "take_profit",
            ReasonCode::TrailingStop => "trailing_stop",
            ReasonCode::GridBuy => "grid_buy",
            ReasonCode::GridBuyRsiResonance => "grid_buy_rsi_resonance",
            ReasonCode::InitialEntry => "initial_entry",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldReason {
    NoSignal,
    TrendVeto,
    NoCash,
}

impl HoldReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            HoldReason::NoSignal => "no_signal",
            HoldReason::TrendVeto => "trend_veto",
            HoldReason::NoCash => "no_cash",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Hold(HoldReason),
    /// Invest a cash amount.
    Buy { amount: f64, reason: ReasonCode },
    /// Sell a fraction of the held shares, in (0, 1].
    Sell { fraction: f64, reason: ReasonCode },
}

impl Decision {
    pub fn is_hold(&self) -> bool {
        matches!(self, Decision::Hold(_))
    }

    pub fn reason(&self) -> Option<ReasonCode> {
        match self {
            Decision::Hold(_) => None,
            Decision::Buy { reason, .. } | Decision::Sell { reason, .. } => Some(*reason),
        }
    }
}

/// Decide today's action. Pure in its inputs.
pub fn decide(
    snapshot: &IndicatorSnapshot,
    position: &PositionState,
    params: &StrategyParams,
) -> Decision {
    let nav = snapshot.nav;

    if position.is_holding() {
        if let Some(exit) = exit_rule(nav, position, params) {
            return exit;
        }
        return grid_buy_rule(snapshot, position, params);
    }

    if snapshot.trend_vetoed(params.trend_health_threshold) {
        return Decision::Hold(HoldReason::TrendVeto);
    }

    let may_enter = position.entries == 0 || params.reenter_after_exit;
    if !may_enter {
        return Decision::Hold(HoldReason::NoSignal);
    }
    if position.cash <= 0.0 {
        return Decision::Hold(HoldReason::NoCash);
    }
    Decision::Buy {
        amount: params.buy_increment,
        reason: ReasonCode::InitialEntry,
    }
}

fn exit_rule(nav: f64, position: &PositionState, params: &StrategyParams) -> Option<Decision> {
    let roc = position.return_on_cost(nav);
    let reason = if roc <= -params.stop_loss_pct {
        ReasonCode::StopLoss
    } else if roc >= params.take_profit_pct {
        ReasonCode::TakeProfit
    } else if trailing_stop_hit(nav, position, params.trailing_stop_pct) {
        ReasonCode::TrailingStop
    } else {
        return None;
    };
    Some(Decision::Sell {
        fraction: 1.0,
        reason,
    })
}

fn trailing_stop_hit(nav: f64, position: &PositionState, trailing_stop_pct: f64) -> bool {
    trailing_stop_pct > 0.0
        && position.peak_nav_since_entry > 0.0
        && nav <= position.peak_nav_since_entry * (1.0 - trailing_stop_pct)
}

fn grid_buy_rule(
    snapshot: &IndicatorSnapshot,
    position: &PositionState,
    params: &StrategyParams,
) -> Decision {
    if position.drop_from_cost(snapshot.nav) < params.grid_step_pct {
        return Decision::Hold(HoldReason::NoSignal);
    }
    // an unknown RSI never counts as oversold
    let oversold = snapshot
        .rsi_short
        .is_some_and(|r| r <= params.oversold_threshold);
    if !oversold {
        return Decision::Hold(HoldReason::NoSignal);
    }
    if snapshot.trend_vetoed(params.trend_health_threshold) {
        return Decision::Hold(HoldReason::TrendVeto);
    }
    if params.require_trend_data && !snapshot.has_trend_data() {
        return Decision::Hold(HoldReason::NoSignal);
    }
    if position.cash <= 0.0 {
        return Decision::Hold(HoldReason::NoCash);
    }

    let resonance = snapshot
        .rsi_long
        .is_some_and(|r| r <= params.rsi_extreme_threshold);
    Decision::Buy {
        amount: params.buy_increment,
        reason: if resonance {
            ReasonCode::GridBuyRsiResonance
        } else {
            ReasonCode::GridBuy
        },
    }
}
