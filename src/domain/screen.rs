//! Latest-day screener: ranks instruments by how strongly the current
//! indicator picture calls for a grid entry.

use chrono::Months;
use serde::Serialize;
use std::cmp::Ordering;

use super::error::FundgridError;
use super::indicator::engine::IndicatorEngine;
use super::indicator::macd::MacdCross;
use super::indicator::snapshot::IndicatorSnapshot;
use super::nav::{NavPoint, NavSeries};
use super::strategy::StrategyParams;

/// One-month drawdown that arms the oscillation signals.
pub const MIN_MONTH_DRAWDOWN: f64 = 0.06;
pub const HIGH_ELASTICITY_DRAWDOWN: f64 = 0.15;
/// One-month drawdown above which the exit hint fires and buys are vetoed.
pub const STOP_DRAWDOWN: f64 = 0.10;
/// Single-day fall that counts as panic selling.
pub const PANIC_DAILY_DROP: f64 = 0.03;
pub const OVERBOUGHT_RSI: f64 = 70.0;
pub const MIN_BUY_SCORE: f64 = 3.7;
pub const MIN_DECLINE_STREAK: usize = 5;
pub const RECENT_DAYS: usize = 10;
/// Suggested trial entry sits this far under the latest NAV.
pub const TRIAL_BUY_DISCOUNT: f64 = 0.03;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSignal {
    /// RSI(14) extreme together with RSI(6) extreme.
    GridRsiResonance,
    /// RSI(14) extreme on a panic-drop day.
    GridRsiPanic,
    GridRsiExtreme,
    ConsecutiveDecline,
    BollingerLowerTouch,
    HighElasticity,
    Watch,
    WeakGoldenRebound,
    Overbought,
}

impl ActionSignal {
    pub fn score(&self) -> f64 {
        match self {
            ActionSignal::GridRsiResonance => 5.0,
            ActionSignal::GridRsiPanic | ActionSignal::GridRsiExtreme => 4.5,
            ActionSignal::BollingerLowerTouch => 4.0,
            ActionSignal::ConsecutiveDecline => 3.5,
            ActionSignal::WeakGoldenRebound => 3.0,
            ActionSignal::HighElasticity => 2.0,
            ActionSignal::Watch => 1.0,
            ActionSignal::Overbought => 0.0,
        }
    }

    pub fn is_grid_level(&self) -> bool {
        matches!(
            self,
            ActionSignal::GridRsiResonance | ActionSignal::GridRsiPanic | ActionSignal::GridRsiExtreme
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionSignal::GridRsiResonance => "grid_rsi_resonance",
            ActionSignal::GridRsiPanic => "grid_rsi_panic",
            ActionSignal::GridRsiExtreme => "grid_rsi_extreme",
            ActionSignal::ConsecutiveDecline => "consecutive_decline",
            ActionSignal::BollingerLowerTouch => "bollinger_lower_touch",
            ActionSignal::HighElasticity => "high_elasticity",
            ActionSignal::Watch => "watch",
            ActionSignal::WeakGoldenRebound => "weak_golden_rebound",
            ActionSignal::Overbought => "overbought_filter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitHint {
    Overbought,
    DeadCross,
    DrawdownStop,
}

impl ExitHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitHint::Overbought => "overbought",
            ExitHint::DeadCross => "dead_cross",
            ExitHint::DrawdownStop => "drawdown_stop",
        }
    }
}

/// Ranking group, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenTier {
    Buyable,
    StopLossVetoed,
    Watch,
    TrendUnhealthy,
    /// Month drawdown under the arming level.
    Quiet,
}

impl ScreenTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenTier::Buyable => "buyable",
            ScreenTier::StopLossVetoed => "stop_loss_vetoed",
            ScreenTier::Watch => "watch",
            ScreenTier::TrendUnhealthy => "trend_unhealthy",
            ScreenTier::Quiet => "quiet",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenRow {
    pub code: String,
    pub snapshot: IndicatorSnapshot,
    pub month_drawdown: f64,
    /// Trailing down-day streak over the whole history.
    pub consecutive_drops: usize,
    /// Trailing down-day streak within the last ten points.
    pub recent_consecutive_drops: usize,
    pub signals: Vec<ActionSignal>,
    pub exit_hints: Vec<ExitHint>,
    pub trend_healthy: bool,
    pub score: f64,
    pub tier: ScreenTier,
    pub trial_buy_price: f64,
}

pub fn screen(series: &NavSeries, params: &StrategyParams) -> Result<ScreenRow, FundgridError> {
    let points = series.points();
    let engine = IndicatorEngine::new(params.indicator_params());
    let snapshot = engine
        .compute(points)
        .ok_or_else(|| FundgridError::NoData {
            code: series.code().to_string(),
        })?;

    let month_drawdown = month_drawdown(points);
    let navs = series.navs();
    let consecutive_drops = trailing_drops(&navs);
    let recent_consecutive_drops = trailing_drops(&navs[navs.len().saturating_sub(RECENT_DAYS)..]);

    let signals = action_signals(&snapshot, month_drawdown, recent_consecutive_drops, params);
    let exit_hints = exit_hints(&snapshot, month_drawdown);
    let trend_healthy = !snapshot.trend_vetoed(params.trend_health_threshold);
    let score = signals.iter().map(ActionSignal::score).fold(0.0, f64::max);

    let tier = if month_drawdown < MIN_MONTH_DRAWDOWN {
        ScreenTier::Quiet
    } else if !trend_healthy {
        ScreenTier::TrendUnhealthy
    } else if score >= MIN_BUY_SCORE {
        if month_drawdown > STOP_DRAWDOWN {
            ScreenTier::StopLossVetoed
        } else {
            ScreenTier::Buyable
        }
    } else {
        ScreenTier::Watch
    };

    Ok(ScreenRow {
        code: series.code().to_string(),
        trial_buy_price: snapshot.nav * (1.0 - TRIAL_BUY_DISCOUNT),
        snapshot,
        month_drawdown,
        consecutive_drops,
        recent_consecutive_drops,
        signals,
        exit_hints,
        trend_healthy,
        score,
        tier,
    })
}

/// Order rows by tier, then score and month drawdown, both descending.
pub fn rank(rows: &mut [ScreenRow]) {
    rows.sort_by(|a, b| {
        a.tier
            .cmp(&b.tier)
            .then(b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
            .then(
                b.month_drawdown
                    .partial_cmp(&a.month_drawdown)
                    .unwrap_or(Ordering::Equal),
            )
            .then_with(|| a.code.cmp(&b.code))
    });
}

/// Max drawdown over the points dated within one calendar month of the last.
pub fn month_drawdown(points: &[NavPoint]) -> f64 {
    let Some(last) = points.last() else {
        return 0.0;
    };
    let Some(cutoff) = last.date.checked_sub_months(Months::new(1)) else {
        return 0.0;
    };
    let start = points.partition_point(|p| p.date < cutoff);
    let recent = &points[start..];
    if recent.len() < 2 {
        return 0.0;
    }

    let mut peak = f64::MIN;
    let mut max_dd = 0.0_f64;
    for p in recent {
        peak = peak.max(p.nav);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - p.nav) / peak);
        }
    }
    max_dd
}

/// Number of strictly falling steps at the end of `navs`.
pub fn trailing_drops(navs: &[f64]) -> usize {
    navs.windows(2)
        .rev()
        .take_while(|w| w[1] < w[0])
        .count()
}

fn action_signals(
    snap: &IndicatorSnapshot,
    month_drawdown: f64,
    recent_drops: usize,
    params: &StrategyParams,
) -> Vec<ActionSignal> {
    let mut sigs = Vec::new();

    if snap
        .rsi_long
        .is_some_and(|r| r <= params.rsi_extreme_threshold)
    {
        let short_extreme = snap
            .rsi_short
            .is_some_and(|r| r <= params.oversold_threshold);
        sigs.push(if short_extreme {
            ActionSignal::GridRsiResonance
        } else if snap.daily_return <= -PANIC_DAILY_DROP {
            ActionSignal::GridRsiPanic
        } else {
            ActionSignal::GridRsiExtreme
        });
    }

    if month_drawdown >= MIN_MONTH_DRAWDOWN {
        let has_grid = sigs.iter().any(ActionSignal::is_grid_level);
        if recent_drops >= MIN_DECLINE_STREAK && !has_grid {
            sigs.push(ActionSignal::ConsecutiveDecline);
        }
        if snap.bollinger_position.is_lower_touch() {
            sigs.push(ActionSignal::BollingerLowerTouch);
        } else if month_drawdown >= HIGH_ELASTICITY_DRAWDOWN {
            sigs.push(ActionSignal::HighElasticity);
        } else if sigs.is_empty() {
            sigs.push(ActionSignal::Watch);
        }
    }

    if snap.macd_cross == Some(MacdCross::GoldenWeak) {
        sigs.push(ActionSignal::WeakGoldenRebound);
    }
    if snap.rsi_long.is_some_and(|r| r > OVERBOUGHT_RSI) {
        sigs.push(ActionSignal::Overbought);
    }
    sigs
}

fn exit_hints(snap: &IndicatorSnapshot, month_drawdown: f64) -> Vec<ExitHint> {
    let mut hints = Vec::new();
    if snap.rsi_long.is_some_and(|r| r > OVERBOUGHT_RSI) {
        hints.push(ExitHint::Overbought);
    }
    if snap.macd_cross == Some(MacdCross::Dead) {
        hints.push(ExitHint::DeadCross);
    }
    if month_drawdown > STOP_DRAWDOWN {
        hints.push(ExitHint::DrawdownStop);
    }
    hints
}
