//! Grid strategy parameters and their named presets.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::domain::indicator::engine::IndicatorParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Grid backtest rule set: RSI(6) <= 30, 4% grid, MA ratio >= 0.95.
    GridV4,
    /// Screener rule set: RSI(6) <= 20, RSI(14) <= 29, MA ratio >= 0.90,
    /// 50-sample trend fit.
    ScreenV5,
}

impl Preset {
    pub const ALL: [Preset; 2] = [Preset::GridV4, Preset::ScreenV5];

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::GridV4 => "grid_v4",
            Preset::ScreenV5 => "screen_v5",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "grid_v4" => Ok(Preset::GridV4),
            "screen_v5" => Ok(Preset::ScreenV5),
            other => Err(format!("unknown preset '{}' (expected grid_v4 or screen_v5)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RsiWindows {
    pub long: usize,
    pub short: usize,
}

impl FromStr for RsiWindows {
    type Err = String;

    /// Parses a pair such as `"14,6"`. The pair is unordered: the larger
    /// window is the long one.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 2 {
            return Err("expected two comma-separated windows, e.g. 14,6".to_string());
        }
        let parse = |p: &str| {
            p.parse::<usize>()
                .map_err(|_| format!("'{}' is not a window length", p))
        };
        let (a, b) = (parse(parts[0])?, parse(parts[1])?);
        Ok(RsiWindows {
            long: a.max(b),
            short: a.min(b),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyParams {
    pub preset: Preset,
    pub rsi_windows: RsiWindows,
    /// Grid-buy quality gate on the short RSI.
    pub oversold_threshold: f64,
    /// Long RSI level that upgrades a grid buy to the resonance variant.
    pub rsi_extreme_threshold: f64,
    /// Minimum MA(short)/MA(long) before buying.
    pub trend_health_threshold: f64,
    pub trend_window: usize,
    pub trend_slope_threshold: f64,
    /// Retracement below average cost that arms a grid buy.
    pub grid_step_pct: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    /// Drop from the peak NAV since entry; 0 disables.
    pub trailing_stop_pct: f64,
    pub buy_increment: f64,
    /// Grid buys wait for a populated long trend.
    pub require_trend_data: bool,
    /// Allow a fresh initial entry after the position has been closed.
    pub reenter_after_exit: bool,
}

impl StrategyParams {
    pub fn preset(preset: Preset) -> Self {
        let grid = StrategyParams {
            preset: Preset::GridV4,
            rsi_windows: RsiWindows { long: 14, short: 6 },
            oversold_threshold: 30.0,
            rsi_extreme_threshold: 29.0,
            trend_health_threshold: 0.95,
            trend_window: 20,
            trend_slope_threshold: 0.001,
            grid_step_pct: 0.04,
            stop_loss_pct: 0.08,
            take_profit_pct: 0.15,
            trailing_stop_pct: 0.0,
            buy_increment: 10_000.0,
            require_trend_data: true,
            reenter_after_exit: false,
        };
        match preset {
            Preset::GridV4 => grid,
            Preset::ScreenV5 => StrategyParams {
                preset: Preset::ScreenV5,
                oversold_threshold: 20.0,
                trend_health_threshold: 0.90,
                trend_window: 50,
                trend_slope_threshold: 0.005,
                ..grid
            },
        }
    }

    pub fn indicator_params(&self) -> IndicatorParams {
        IndicatorParams {
            rsi_long: self.rsi_windows.long,
            rsi_short: self.rsi_windows.short,
            trend_window: self.trend_window,
            trend_slope_threshold: self.trend_slope_threshold,
            ..IndicatorParams::default()
        }
    }
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams::preset(Preset::GridV4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_grid_preset() {
        let s = StrategyParams::default();
        assert_eq!(s.preset, Preset::GridV4);
        assert_eq!(s.oversold_threshold, 30.0);
        assert_eq!(s.grid_step_pct, 0.04);
        assert_eq!(s.trend_health_threshold, 0.95);
        assert_eq!(s.stop_loss_pct, 0.08);
        assert_eq!(s.take_profit_pct, 0.15);
        assert_eq!(s.rsi_windows, RsiWindows { long: 14, short: 6 });
    }

    #[test]
    fn screen_preset_overrides() {
        let s = StrategyParams::preset(Preset::ScreenV5);
        assert_eq!(s.oversold_threshold, 20.0);
        assert_eq!(s.rsi_extreme_threshold, 29.0);
        assert_eq!(s.trend_health_threshold, 0.90);
        assert_eq!(s.trend_window, 50);
        assert_eq!(s.trend_slope_threshold, 0.005);
        assert_eq!(s.stop_loss_pct, 0.08);
    }

    #[test]
    fn preset_round_trips_through_str() {
        for p in Preset::ALL {
            assert_eq!(p.as_str().parse::<Preset>().unwrap(), p);
        }
        assert!("grid_v9".parse::<Preset>().is_err());
        assert_eq!(" GRID_V4 ".parse::<Preset>().unwrap(), Preset::GridV4);
    }

    #[test]
    fn rsi_windows_parse() {
        assert_eq!(
            "14, 6".parse::<RsiWindows>().unwrap(),
            RsiWindows { long: 14, short: 6 }
        );
        assert!("14".parse::<RsiWindows>().is_err());
        assert!("a,6".parse::<RsiWindows>().is_err());
    }

    #[test]
    fn rsi_windows_larger_is_long() {
        assert_eq!(
            "6,14".parse::<RsiWindows>().unwrap(),
            RsiWindows { long: 14, short: 6 }
        );
    }

    #[test]
    fn indicator_params_follow_strategy() {
        let s = StrategyParams::preset(Preset::ScreenV5);
        let p = s.indicator_params();
        assert_eq!(p.rsi_long, 14);
        assert_eq!(p.rsi_short, 6);
        assert_eq!(p.trend_window, 50);
        assert_eq!(p.trend_slope_threshold, 0.005);
        assert_eq!(p.ma_long, 250);
    }
}
